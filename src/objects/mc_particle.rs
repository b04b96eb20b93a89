//! 真值（MC）粒子

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::error::ensure_non_negative;
use crate::core::{McParticleId, PflowError, PflowResult, Uid};
use crate::lists::ListOrdering;
use crate::objects::Position;

/// MC 粒子的创建参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McParticleParameters {
    pub uid: Uid,
    pub energy: f32,
    #[serde(default)]
    pub momentum: Position,
    #[serde(default)]
    pub vertex: Position,
    #[serde(default)]
    pub endpoint: Position,
    pub pdg_code: i32,
}

impl McParticleParameters {
    pub fn new(uid: impl Into<Uid>, energy: f32, pdg_code: i32) -> Self {
        Self {
            uid: uid.into(),
            energy,
            momentum: Position::default(),
            vertex: Position::default(),
            endpoint: Position::default(),
            pdg_code,
        }
    }

    pub fn validate(&self) -> PflowResult<()> {
        ensure_non_negative("energy", self.energy)?;
        self.momentum.validate("momentum")?;
        self.vertex.validate("vertex")?;
        self.endpoint.validate("endpoint")
    }
}

#[derive(Debug, Clone)]
pub struct McParticle {
    pub id: McParticleId,
    pub uid: Uid,
    pub energy: f32,
    pub momentum: Position,
    pub vertex: Position,
    pub endpoint: Position,
    pub pdg_code: i32,
    pub parents: BTreeSet<McParticleId>,
    pub daughters: BTreeSet<McParticleId>,
    /// 目标选择后写入
    pub pfo_target: Option<McParticleId>,
}

impl McParticle {
    pub(crate) fn from_parameters(id: McParticleId, params: &McParticleParameters) -> Self {
        Self {
            id,
            uid: params.uid,
            energy: params.energy,
            momentum: params.momentum,
            vertex: params.vertex,
            endpoint: params.endpoint,
            pdg_code: params.pdg_code,
            parents: BTreeSet::new(),
            daughters: BTreeSet::new(),
            pfo_target: None,
        }
    }

    pub fn is_root_particle(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_pfo_target(&self) -> bool {
        self.pfo_target == Some(self.id)
    }

    pub fn pfo_target(&self) -> PflowResult<McParticleId> {
        self.pfo_target
            .ok_or_else(|| PflowError::not_initialized(format!("pfo target of {} not selected", self.id)))
    }
}

impl ListOrdering for McParticle {
    /// 能量降序
    fn list_cmp(&self, other: &Self) -> Ordering {
        other.energy.total_cmp(&self.energy)
    }
}
