//! 输入事件文档
//!
//! 一个事件的全部输入（击中、径迹、MC 粒子及其关系、真值关联）以 JSON 描述，
//! 由 [`Managers::load_input_event`] 送入各工厂。

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{PflowError, PflowResult, Uid};
use crate::managers::Managers;
use crate::objects::{CaloHitParameters, McParticleParameters, TrackParameters};

/// 按客户端 Uid 给出的一对关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidPair {
    pub first: Uid,
    pub second: Uid,
}

/// 输入对象到 MC 粒子的加权关联
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McAssociation {
    pub object: Uid,
    pub mc: Uid,
    pub weight: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputEvent {
    #[serde(default)]
    pub calo_hits: Vec<CaloHitParameters>,
    #[serde(default)]
    pub tracks: Vec<TrackParameters>,
    #[serde(default)]
    pub mc_particles: Vec<McParticleParameters>,
    /// 径迹父子关系（first 为父）
    #[serde(default)]
    pub track_relationships: Vec<UidPair>,
    #[serde(default)]
    pub track_siblings: Vec<UidPair>,
    /// MC 粒子父子关系（first 为父）
    #[serde(default)]
    pub mc_relationships: Vec<UidPair>,
    #[serde(default)]
    pub hit_mc_associations: Vec<McAssociation>,
    #[serde(default)]
    pub track_mc_associations: Vec<McAssociation>,
}

impl InputEvent {
    pub fn from_json(json: &str) -> PflowResult<Self> {
        serde_json::from_str(json).map_err(|e| PflowError::invalid(format!("malformed input event: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> PflowResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PflowError::not_found(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// 创建前的整体校验：参数合法、同类对象 Uid 不重复
    pub fn validate(&self) -> PflowResult<()> {
        check_unique("calo hit", self.calo_hits.iter().map(|p| p.uid))?;
        check_unique("track", self.tracks.iter().map(|p| p.uid))?;
        check_unique("mc particle", self.mc_particles.iter().map(|p| p.uid))?;
        for params in &self.calo_hits {
            params.validate()?;
        }
        for params in &self.tracks {
            params.validate()?;
        }
        for params in &self.mc_particles {
            params.validate()?;
        }
        Ok(())
    }
}

fn check_unique(kind: &str, uids: impl Iterator<Item = Uid>) -> PflowResult<()> {
    let mut seen = BTreeSet::new();
    for uid in uids {
        if !seen.insert(uid) {
            return Err(PflowError::not_allowed(format!("duplicate {kind} {uid}")));
        }
    }
    Ok(())
}

impl Managers {
    /// 创建事件的全部输入对象，登记关系与关联，然后解析关系
    pub fn load_input_event(&mut self, event: &InputEvent) -> PflowResult<()> {
        event.validate()?;
        for params in &event.calo_hits {
            self.create_calo_hit(params)?;
        }
        for params in &event.tracks {
            self.create_track(params)?;
        }
        for params in &event.mc_particles {
            self.create_mc_particle(params)?;
        }
        for pair in &event.track_relationships {
            self.tracks.set_parent_daughter_relationship(pair.first, pair.second)?;
        }
        for pair in &event.track_siblings {
            self.tracks.set_sibling_relationship(pair.first, pair.second)?;
        }
        for pair in &event.mc_relationships {
            self.mc.set_parent_daughter_relationship(pair.first, pair.second)?;
        }
        for assoc in &event.hit_mc_associations {
            self.mc
                .set_calo_hit_to_mc_particle_relationship(assoc.object, assoc.mc, assoc.weight)?;
        }
        for assoc in &event.track_mc_associations {
            self.mc
                .set_track_to_mc_particle_relationship(assoc.object, assoc.mc, assoc.weight)?;
        }
        self.finalize_input()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PflowConfig;

    const EVENT: &str = r#"{
        "calo_hits": [
            {"uid": 1, "position": {"x": 0.0, "y": 0.0, "z": 0.0}, "input_energy": 2.0},
            {"uid": 2, "position": {"x": 1.0, "y": 0.0, "z": 0.0}, "input_energy": 3.0}
        ],
        "mc_particles": [
            {"uid": 10, "energy": 5.0, "pdg_code": 22},
            {"uid": 11, "energy": 2.0, "pdg_code": 11}
        ],
        "mc_relationships": [{"first": 10, "second": 11}],
        "hit_mc_associations": [{"object": 1, "mc": 11, "weight": 1.0}]
    }"#;

    #[test]
    fn test_load_input_event() {
        let event = InputEvent::from_json(EVENT).unwrap();
        let mut managers = Managers::new(PflowConfig::default());
        managers.prepare_event().unwrap();
        managers.load_input_event(&event).unwrap();

        assert_eq!(managers.calo_hits().arena().len(), 2);
        let parent = managers.mc_particles().find(Uid(10)).unwrap();
        let daughter = managers.mc_particles().find(Uid(11)).unwrap();
        assert!(managers.mc_particles().get(parent).unwrap().daughters.contains(&daughter));
    }

    #[test]
    fn test_duplicate_uid_rejected_before_creation() {
        let mut event = InputEvent::from_json(EVENT).unwrap();
        event.calo_hits.push(CaloHitParameters::new(1u64, 1.0));
        let mut managers = Managers::new(PflowConfig::default());
        managers.prepare_event().unwrap();
        assert!(matches!(managers.load_input_event(&event), Err(PflowError::NotAllowed(_))));
        assert!(managers.calo_hits().arena().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(InputEvent::from_json("{"), Err(PflowError::InvalidParameter(_))));
    }
}
