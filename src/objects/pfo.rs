//! 粒子流对象（PFO）：簇、径迹、顶点的容器

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::core::error::{ensure_finite, ensure_non_negative};
use crate::core::{ClusterId, PfoId, PflowError, PflowResult, TrackId, VertexId};
use crate::lists::ListOrdering;
use crate::objects::Position;

/// PFO 的创建参数：至少一个簇或一条径迹
#[derive(Debug, Clone, Default)]
pub struct PfoParameters {
    pub pdg_code: i32,
    pub charge: i32,
    pub mass: f32,
    pub energy: f32,
    pub momentum: Position,
    pub clusters: Vec<ClusterId>,
    pub tracks: Vec<TrackId>,
    pub vertices: Vec<VertexId>,
}

impl PfoParameters {
    pub fn validate(&self) -> PflowResult<()> {
        if self.clusters.is_empty() && self.tracks.is_empty() {
            return Err(PflowError::invalid("pfo requires at least one cluster or track"));
        }
        ensure_non_negative("mass", self.mass)?;
        ensure_finite("energy", self.energy)?;
        self.momentum.validate("momentum")
    }
}

#[derive(Debug, Clone)]
pub struct ParticleFlowObject {
    pub id: PfoId,
    pub pdg_code: i32,
    pub charge: i32,
    pub mass: f32,
    pub energy: f32,
    pub momentum: Position,
    pub clusters: BTreeSet<ClusterId>,
    pub tracks: BTreeSet<TrackId>,
    pub vertices: BTreeSet<VertexId>,
    pub parents: BTreeSet<PfoId>,
    pub daughters: BTreeSet<PfoId>,
}

impl ParticleFlowObject {
    pub(crate) fn new(id: PfoId, params: &PfoParameters) -> Self {
        Self {
            id,
            pdg_code: params.pdg_code,
            charge: params.charge,
            mass: params.mass,
            energy: params.energy,
            momentum: params.momentum,
            clusters: params.clusters.iter().copied().collect(),
            tracks: params.tracks.iter().copied().collect(),
            vertices: params.vertices.iter().copied().collect(),
            parents: BTreeSet::new(),
            daughters: BTreeSet::new(),
        }
    }

    /// 簇与径迹之和（顶点不计入）
    pub fn n_constituents(&self) -> usize {
        self.clusters.len() + self.tracks.len()
    }
}

impl ListOrdering for ParticleFlowObject {
    fn list_cmp(&self, other: &Self) -> Ordering {
        other.energy.total_cmp(&self.energy)
    }
}
