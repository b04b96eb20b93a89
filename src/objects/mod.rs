//! 对象类型：输入对象（击中、径迹、MC 粒子）与算法对象（簇、PFO、顶点）
//!
//! 每种对象的创建参数在构造前统一校验（非有限值、负能量 → InvalidParameter）。

pub mod calo_hit;
pub mod cluster;
pub mod mc_particle;
pub mod pfo;
pub mod track;
pub mod vertex;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::error::ensure_finite;
use crate::core::PflowResult;

pub use calo_hit::{CaloHit, CaloHitParameters, HitType};
pub use cluster::{Cluster, ClusterParameters};
pub use mc_particle::{McParticle, McParticleParameters};
pub use pfo::{ParticleFlowObject, PfoParameters};
pub use track::{Track, TrackParameters};
pub use vertex::{Vertex, VertexParameters};

/// 三维位置 / 动量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn validate(&self, field: &str) -> PflowResult<()> {
        ensure_finite(&format!("{field}.x"), self.x)?;
        ensure_finite(&format!("{field}.y"), self.y)?;
        ensure_finite(&format!("{field}.z"), self.z)
    }

    /// 依次比较 x、y、z
    pub fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
            .then_with(|| self.z.total_cmp(&other.z))
    }
}
