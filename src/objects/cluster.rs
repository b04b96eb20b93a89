//! 簇：击中的容器，可关联径迹

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::core::{ClusterId, HitId, PflowError, PflowResult, TrackId};
use crate::lists::ListOrdering;

/// 簇的创建参数：至少一个击中
#[derive(Debug, Clone, Default)]
pub struct ClusterParameters {
    pub hits: Vec<HitId>,
    pub isolated_hits: Vec<HitId>,
    /// 作为种子的径迹（创建后建立径迹-簇关联）
    pub track: Option<TrackId>,
}

impl ClusterParameters {
    pub fn from_hits(hits: impl IntoIterator<Item = HitId>) -> Self {
        Self {
            hits: hits.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_track(mut self, track: TrackId) -> Self {
        self.track = Some(track);
        self
    }

    pub fn validate(&self) -> PflowResult<()> {
        if self.hits.is_empty() {
            return Err(PflowError::invalid("cluster requires at least one hit"));
        }
        let all: BTreeSet<HitId> = self.hits.iter().chain(&self.isolated_hits).copied().collect();
        if all.len() != self.hits.len() + self.isolated_hits.len() {
            return Err(PflowError::invalid("cluster hits must be distinct"));
        }
        Ok(())
    }

    pub fn all_hits(&self) -> Vec<HitId> {
        self.hits.iter().chain(&self.isolated_hits).copied().collect()
    }
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub hits: BTreeSet<HitId>,
    pub isolated_hits: BTreeSet<HitId>,
    pub associated_tracks: BTreeSet<TrackId>,
    /// 击中输入能量之和（含孤立击中）
    pub energy: f32,
    /// 是否未被 PFO 使用
    pub available: bool,
}

impl Cluster {
    pub(crate) fn new(id: ClusterId, params: &ClusterParameters, energy: f32) -> Self {
        Self {
            id,
            hits: params.hits.iter().copied().collect(),
            isolated_hits: params.isolated_hits.iter().copied().collect(),
            associated_tracks: BTreeSet::new(),
            energy,
            available: true,
        }
    }

    pub fn n_hits(&self) -> usize {
        self.hits.len()
    }

    pub fn all_hits(&self) -> impl Iterator<Item = HitId> + '_ {
        self.hits.iter().chain(&self.isolated_hits).copied()
    }

    pub fn contains_hit(&self, hit: HitId) -> bool {
        self.hits.contains(&hit) || self.isolated_hits.contains(&hit)
    }
}

impl ListOrdering for Cluster {
    /// 击中数降序，再按能量降序
    fn list_cmp(&self, other: &Self) -> Ordering {
        other
            .hits
            .len()
            .cmp(&self.hits.len())
            .then_with(|| other.energy.total_cmp(&self.energy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectKey;

    #[test]
    fn test_parameters_validation() {
        assert!(ClusterParameters::default().validate().is_err());
        let hit = HitId::from_raw(1);
        assert!(ClusterParameters::from_hits([hit]).validate().is_ok());
        let dup = ClusterParameters {
            hits: vec![hit],
            isolated_hits: vec![hit],
            track: None,
        };
        assert!(matches!(dup.validate(), Err(PflowError::InvalidParameter(_))));
    }
}
