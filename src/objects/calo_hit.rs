//! 量能器击中

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{ensure_finite, ensure_non_negative};
use crate::core::{HitId, McParticleId, PflowResult, Uid};
use crate::lists::ListOrdering;
use crate::objects::Position;

/// 击中所在的子探测器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HitType {
    #[default]
    Ecal,
    Hcal,
    Muon,
    Other,
}

/// 击中的创建参数（客户端提供）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaloHitParameters {
    pub uid: Uid,
    pub position: Position,
    pub input_energy: f32,
    #[serde(default)]
    pub electromagnetic_energy: f32,
    #[serde(default)]
    pub hadronic_energy: f32,
    #[serde(default)]
    pub mip_equivalent_energy: f32,
    #[serde(default)]
    pub time: f32,
    #[serde(default)]
    pub pseudo_layer: u32,
    #[serde(default)]
    pub hit_type: HitType,
}

impl CaloHitParameters {
    pub fn new(uid: impl Into<Uid>, input_energy: f32) -> Self {
        Self {
            uid: uid.into(),
            position: Position::default(),
            input_energy,
            electromagnetic_energy: input_energy,
            hadronic_energy: input_energy,
            mip_equivalent_energy: 0.0,
            time: 0.0,
            pseudo_layer: 0,
            hit_type: HitType::Ecal,
        }
    }

    pub fn validate(&self) -> PflowResult<()> {
        self.position.validate("position")?;
        ensure_non_negative("input_energy", self.input_energy)?;
        ensure_non_negative("electromagnetic_energy", self.electromagnetic_energy)?;
        ensure_non_negative("hadronic_energy", self.hadronic_energy)?;
        ensure_non_negative("mip_equivalent_energy", self.mip_equivalent_energy)?;
        ensure_finite("time", self.time)
    }
}

/// 击中对象；由 CaloHitManager 独占所有与修改
#[derive(Debug, Clone)]
pub struct CaloHit {
    pub id: HitId,
    pub uid: Uid,
    pub position: Position,
    pub input_energy: f32,
    pub electromagnetic_energy: f32,
    pub hadronic_energy: f32,
    pub mip_equivalent_energy: f32,
    pub time: f32,
    pub pseudo_layer: u32,
    pub hit_type: HitType,
    /// 相对原始击中的能量份额（原始击中为 1）
    pub weight: f32,
    /// 拆分 / 合并谱系的原始击中
    pub origin: HitId,
    /// 已提交的可用性（未被簇使用）
    pub available: bool,
    /// PFO 目标 → 权重
    pub mc_weights: BTreeMap<McParticleId, f32>,
}

impl CaloHit {
    pub(crate) fn from_parameters(id: HitId, params: &CaloHitParameters) -> Self {
        Self {
            id,
            uid: params.uid,
            position: params.position,
            input_energy: params.input_energy,
            electromagnetic_energy: params.electromagnetic_energy,
            hadronic_energy: params.hadronic_energy,
            mip_equivalent_energy: params.mip_equivalent_energy,
            time: params.time,
            pseudo_layer: params.pseudo_layer,
            hit_type: params.hit_type,
            weight: 1.0,
            origin: id,
            available: true,
            mc_weights: BTreeMap::new(),
        }
    }

    /// 按份额缩放得到的碎片
    pub(crate) fn fragment(&self, id: HitId, fraction: f32) -> Self {
        Self {
            id,
            input_energy: self.input_energy * fraction,
            electromagnetic_energy: self.electromagnetic_energy * fraction,
            hadronic_energy: self.hadronic_energy * fraction,
            mip_equivalent_energy: self.mip_equivalent_energy * fraction,
            weight: self.weight * fraction,
            available: true,
            ..self.clone()
        }
    }

    /// 同谱系两个碎片的合并
    pub(crate) fn merged(id: HitId, a: &CaloHit, b: &CaloHit) -> Self {
        Self {
            id,
            input_energy: a.input_energy + b.input_energy,
            electromagnetic_energy: a.electromagnetic_energy + b.electromagnetic_energy,
            hadronic_energy: a.hadronic_energy + b.hadronic_energy,
            mip_equivalent_energy: a.mip_equivalent_energy + b.mip_equivalent_energy,
            weight: a.weight + b.weight,
            available: true,
            ..a.clone()
        }
    }
}

impl ListOrdering for CaloHit {
    /// 先按伪层，再按输入能量降序
    fn list_cmp(&self, other: &Self) -> Ordering {
        self.pseudo_layer
            .cmp(&other.pseudo_layer)
            .then_with(|| other.input_energy.total_cmp(&self.input_energy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ObjectKey, PflowError};

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut params = CaloHitParameters::new(1, 2.0);
        assert!(params.validate().is_ok());
        params.input_energy = -1.0;
        assert!(matches!(params.validate(), Err(PflowError::InvalidParameter(_))));
        params.input_energy = 1.0;
        params.position.x = f32::NAN;
        assert!(matches!(params.validate(), Err(PflowError::InvalidParameter(_))));
    }

    #[test]
    fn test_fragment_scales_energies() {
        let params = CaloHitParameters::new(1, 10.0);
        let hit = CaloHit::from_parameters(HitId::from_raw(0), &params);
        let piece = hit.fragment(HitId::from_raw(1), 0.25);
        assert!((piece.input_energy - 2.5).abs() < 1e-6);
        assert!((piece.weight - 0.25).abs() < 1e-6);
        assert_eq!(piece.origin, hit.id);
        assert_eq!(piece.id, HitId::from_raw(1));
    }

    #[test]
    fn test_ordering_by_layer_then_energy() {
        let mut p = CaloHitParameters::new(1, 1.0);
        let a = CaloHit::from_parameters(HitId::from_raw(0), &p);
        p.input_energy = 5.0;
        let b = CaloHit::from_parameters(HitId::from_raw(1), &p);
        p.pseudo_layer = 3;
        let c = CaloHit::from_parameters(HitId::from_raw(2), &p);
        assert_eq!(b.list_cmp(&a), Ordering::Less);
        assert_eq!(a.list_cmp(&c), Ordering::Less);
    }
}
