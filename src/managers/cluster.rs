//! 簇管理器：簇 arena 与转移语义的列表存储
//!
//! 这里只维护簇自身；击中可用性、径迹关联等跨类型的一致性由 `Managers` 负责。

use crate::config::PflowConfig;
use crate::core::{ClusterId, HitId, PflowError, PflowResult, TrackId};
use crate::lists::{ListManager, ObjectArena};
use crate::objects::{Cluster, ClusterParameters};

pub struct ClusterManager {
    arena: ObjectArena<ClusterId, Cluster>,
    lists: ListManager<ClusterId>,
}

impl ClusterManager {
    pub fn new(config: &PflowConfig) -> Self {
        Self {
            arena: ObjectArena::new("Cluster"),
            lists: ListManager::algorithm("Cluster", &config.lists),
        }
    }

    pub fn lists(&self) -> &ListManager<ClusterId> {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut ListManager<ClusterId> {
        &mut self.lists
    }

    pub fn arena(&self) -> &ObjectArena<ClusterId, Cluster> {
        &self.arena
    }

    pub fn get(&self, cluster: ClusterId) -> PflowResult<&Cluster> {
        self.arena.get(cluster)
    }

    pub fn create_initial_lists(&mut self) -> PflowResult<()> {
        self.lists.create_initial_lists()
    }

    pub fn erase_all_content(&mut self) {
        self.arena.clear();
        self.lists.erase_all_content();
    }

    pub fn reset_for_next_event(&mut self) -> PflowResult<()> {
        self.erase_all_content();
        self.lists.create_initial_lists()
    }

    /// 在当前（临时）列表中创建簇
    pub(crate) fn create(&mut self, params: &ClusterParameters, energy: f32) -> PflowResult<ClusterId> {
        params.validate()?;
        self.lists.ensure_can_make_new_objects()?;
        let id = self.arena.insert_with(|id| Cluster::new(id, params, energy));
        self.lists.add_to_current_list(&[id])?;
        Ok(id)
    }

    /// 含有该击中的簇
    pub fn clusters_containing(&self, hit: HitId) -> Vec<ClusterId> {
        self.arena
            .iter()
            .filter(|(_, cluster)| cluster.contains_hit(hit))
            .map(|(id, _)| id)
            .collect()
    }

    pub(crate) fn add_hit(&mut self, cluster: ClusterId, hit: HitId, energy: f32, isolated: bool) -> PflowResult<()> {
        let cluster = self.arena.get_mut(cluster)?;
        if cluster.contains_hit(hit) {
            return Err(PflowError::not_allowed(format!("{hit} already in {}", cluster.id)));
        }
        if isolated {
            cluster.isolated_hits.insert(hit);
        } else {
            cluster.hits.insert(hit);
        }
        cluster.energy += energy;
        Ok(())
    }

    /// 移除击中；不能移除最后一个（非孤立）击中
    pub(crate) fn remove_hit(&mut self, cluster: ClusterId, hit: HitId, energy: f32, isolated: bool) -> PflowResult<()> {
        let cluster = self.arena.get_mut(cluster)?;
        let set = if isolated {
            &mut cluster.isolated_hits
        } else {
            &mut cluster.hits
        };
        if !set.contains(&hit) {
            return Err(PflowError::not_found(format!("{hit} not in {}", cluster.id)));
        }
        if !isolated && set.len() == 1 {
            return Err(PflowError::not_allowed(format!("cannot remove the last hit of {}", cluster.id)));
        }
        set.remove(&hit);
        cluster.energy -= energy;
        Ok(())
    }

    /// 把 `delete` 的击中与径迹并入 `enlarge`，并删除 `delete`
    pub(crate) fn merge(&mut self, enlarge: ClusterId, delete: ClusterId) -> PflowResult<Cluster> {
        if enlarge == delete {
            return Err(PflowError::not_allowed(format!("cannot merge {enlarge} into itself")));
        }
        self.arena.ensure_live(&[enlarge, delete])?;
        let removed = self.remove(delete)?;
        let target = self.arena.get_mut(enlarge)?;
        target.hits.extend(removed.hits.iter().copied());
        target.isolated_hits.extend(removed.isolated_hits.iter().copied());
        target.associated_tracks.extend(removed.associated_tracks.iter().copied());
        target.energy += removed.energy;
        Ok(removed)
    }

    /// 从 arena 与所有列表中移除
    pub(crate) fn remove(&mut self, cluster: ClusterId) -> PflowResult<Cluster> {
        let removed = self
            .arena
            .remove(cluster)
            .ok_or_else(|| PflowError::not_found(format!("Cluster {cluster} is not live")))?;
        self.lists.remove_objects_everywhere(&[cluster]);
        Ok(removed)
    }

    pub(crate) fn add_track(&mut self, cluster: ClusterId, track: TrackId) -> PflowResult<()> {
        let cluster = self.arena.get_mut(cluster)?;
        if !cluster.associated_tracks.insert(track) {
            return Err(PflowError::not_allowed(format!("{track} already associated with {}", cluster.id)));
        }
        Ok(())
    }

    pub(crate) fn remove_track(&mut self, cluster: ClusterId, track: TrackId) -> PflowResult<()> {
        let cluster = self.arena.get_mut(cluster)?;
        if !cluster.associated_tracks.remove(&track) {
            return Err(PflowError::not_found(format!("{track} not associated with {}", cluster.id)));
        }
        Ok(())
    }

    pub fn is_available(&self, cluster: ClusterId) -> PflowResult<bool> {
        Ok(self.arena.get(cluster)?.available)
    }

    pub(crate) fn set_availability(&mut self, cluster: ClusterId, available: bool) -> PflowResult<()> {
        self.arena.get_mut(cluster)?.available = available;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlgorithmId, ObjectKey};

    fn hit(raw: u64) -> HitId {
        HitId::from_raw(raw)
    }

    fn manager_in_temporary_list() -> ClusterManager {
        let mut manager = ClusterManager::new(&PflowConfig::default());
        manager.create_initial_lists().unwrap();
        let alg = AlgorithmId::new(1);
        manager.lists_mut().register_algorithm(alg).unwrap();
        manager
            .lists_mut()
            .create_temporary_list_and_set_current(alg, Vec::new())
            .unwrap();
        manager
    }

    #[test]
    fn test_create_requires_temporary_list() {
        let mut manager = ClusterManager::new(&PflowConfig::default());
        manager.create_initial_lists().unwrap();
        let params = ClusterParameters::from_hits([hit(0)]);
        assert!(matches!(manager.create(&params, 1.0), Err(PflowError::NotAllowed(_))));

        let mut manager = manager_in_temporary_list();
        let id = manager.create(&params, 1.0).unwrap();
        assert!(manager.lists().current_list().unwrap().0.contains(&id));
        assert!(matches!(
            manager.create(&ClusterParameters::default(), 0.0),
            Err(PflowError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_cannot_remove_last_hit() {
        let mut manager = manager_in_temporary_list();
        let id = manager.create(&ClusterParameters::from_hits([hit(0), hit(1)]), 2.0).unwrap();
        manager.remove_hit(id, hit(0), 1.0, false).unwrap();
        assert!(matches!(manager.remove_hit(id, hit(1), 1.0, false), Err(PflowError::NotAllowed(_))));
        assert!(matches!(manager.remove_hit(id, hit(5), 1.0, false), Err(PflowError::NotFound(_))));
        let cluster = manager.get(id).unwrap();
        assert_eq!(cluster.n_hits(), 1);
        assert!((cluster.energy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_merge_moves_hits_and_tracks() {
        let mut manager = manager_in_temporary_list();
        let a = manager.create(&ClusterParameters::from_hits([hit(0)]), 1.0).unwrap();
        let b = manager.create(&ClusterParameters::from_hits([hit(1)]), 2.0).unwrap();
        manager.add_track(b, TrackId::from_raw(3)).unwrap();
        manager.merge(a, b).unwrap();
        let merged = manager.get(a).unwrap();
        assert_eq!(merged.n_hits(), 2);
        assert!(merged.associated_tracks.contains(&TrackId::from_raw(3)));
        assert!(manager.get(b).is_err());
        assert!(!manager.lists().contains_anywhere(b));
        assert!(matches!(manager.merge(a, a), Err(PflowError::NotAllowed(_))));
    }
}
