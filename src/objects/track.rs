//! 径迹

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::error::{ensure_finite, ensure_non_negative};
use crate::core::{ClusterId, McParticleId, PflowError, PflowResult, TrackId, Uid};
use crate::lists::ListOrdering;
use crate::objects::Position;

/// 径迹的创建参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackParameters {
    pub uid: Uid,
    #[serde(default)]
    pub d0: f32,
    #[serde(default)]
    pub z0: f32,
    pub charge: i32,
    #[serde(default)]
    pub mass: f32,
    pub momentum_at_dca: Position,
    /// 最近接点处能量
    pub energy_at_dca: f32,
    /// 外推到量能器表面的位置
    pub position_at_calorimeter: Position,
    #[serde(default = "default_true")]
    pub reaches_calorimeter: bool,
    #[serde(default = "default_true")]
    pub can_form_pfo: bool,
}

fn default_true() -> bool {
    true
}

impl TrackParameters {
    pub fn new(uid: impl Into<Uid>, energy_at_dca: f32) -> Self {
        Self {
            uid: uid.into(),
            d0: 0.0,
            z0: 0.0,
            charge: 1,
            mass: 0.0,
            momentum_at_dca: Position::new(0.0, 0.0, energy_at_dca),
            energy_at_dca,
            position_at_calorimeter: Position::default(),
            reaches_calorimeter: true,
            can_form_pfo: true,
        }
    }

    pub fn validate(&self) -> PflowResult<()> {
        ensure_finite("d0", self.d0)?;
        ensure_finite("z0", self.z0)?;
        ensure_non_negative("mass", self.mass)?;
        ensure_non_negative("energy_at_dca", self.energy_at_dca)?;
        self.momentum_at_dca.validate("momentum_at_dca")?;
        self.position_at_calorimeter.validate("position_at_calorimeter")?;
        if !(-1..=1).contains(&self.charge) {
            return Err(PflowError::invalid(format!("track charge out of range: {}", self.charge)));
        }
        Ok(())
    }
}

/// 径迹对象；关系图字段只在关系解析阶段写入
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub uid: Uid,
    pub d0: f32,
    pub z0: f32,
    pub charge: i32,
    pub mass: f32,
    pub momentum_at_dca: Position,
    pub energy_at_dca: f32,
    pub position_at_calorimeter: Position,
    pub reaches_calorimeter: bool,
    pub can_form_pfo: bool,
    pub parents: BTreeSet<TrackId>,
    pub daughters: BTreeSet<TrackId>,
    pub siblings: BTreeSet<TrackId>,
    pub associated_cluster: Option<ClusterId>,
    pub available: bool,
    pub mc_weights: BTreeMap<McParticleId, f32>,
}

impl Track {
    pub(crate) fn from_parameters(id: TrackId, params: &TrackParameters) -> Self {
        Self {
            id,
            uid: params.uid,
            d0: params.d0,
            z0: params.z0,
            charge: params.charge,
            mass: params.mass,
            momentum_at_dca: params.momentum_at_dca,
            energy_at_dca: params.energy_at_dca,
            position_at_calorimeter: params.position_at_calorimeter,
            reaches_calorimeter: params.reaches_calorimeter,
            can_form_pfo: params.can_form_pfo,
            parents: BTreeSet::new(),
            daughters: BTreeSet::new(),
            siblings: BTreeSet::new(),
            associated_cluster: None,
            available: true,
            mc_weights: BTreeMap::new(),
        }
    }

    /// 关联簇；未关联时返回 NotInitialized
    pub fn associated_cluster(&self) -> PflowResult<ClusterId> {
        self.associated_cluster
            .ok_or_else(|| PflowError::not_initialized(format!("{} has no associated cluster", self.id)))
    }
}

impl ListOrdering for Track {
    /// 先按量能器投影位置，再按最近接点能量
    fn list_cmp(&self, other: &Self) -> Ordering {
        self.position_at_calorimeter
            .lexicographic_cmp(&other.position_at_calorimeter)
            .then_with(|| self.energy_at_dca.total_cmp(&other.energy_at_dca))
    }
}
