//! PFO 管理器

use crate::config::PflowConfig;
use crate::core::{ClusterId, PfoId, PflowError, PflowResult, TrackId, VertexId};
use crate::lists::{ListManager, ObjectArena};
use crate::objects::{ParticleFlowObject, PfoParameters};

pub struct PfoManager {
    arena: ObjectArena<PfoId, ParticleFlowObject>,
    lists: ListManager<PfoId>,
}

impl PfoManager {
    pub fn new(config: &PflowConfig) -> Self {
        Self {
            arena: ObjectArena::new("Pfo"),
            lists: ListManager::algorithm("Pfo", &config.lists),
        }
    }

    pub fn lists(&self) -> &ListManager<PfoId> {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut ListManager<PfoId> {
        &mut self.lists
    }

    pub fn arena(&self) -> &ObjectArena<PfoId, ParticleFlowObject> {
        &self.arena
    }

    pub fn get(&self, pfo: PfoId) -> PflowResult<&ParticleFlowObject> {
        self.arena.get(pfo)
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

    pub(crate) fn create(&mut self, params: &PfoParameters) -> PflowResult<PfoId> {
        params.validate()?;
        self.lists.ensure_can_make_new_objects()?;
        let id = self.arena.insert_with(|id| ParticleFlowObject::new(id, params));
        self.lists.add_to_current_list(&[id])?;
        Ok(id)
    }

    pub(crate) fn add_cluster(&mut self, pfo: PfoId, cluster: ClusterId) -> PflowResult<()> {
        let pfo = self.arena.get_mut(pfo)?;
        if !pfo.clusters.insert(cluster) {
            return Err(PflowError::not_allowed(format!("{cluster} already in {}", pfo.id)));
        }
        Ok(())
    }

    pub(crate) fn add_track(&mut self, pfo: PfoId, track: TrackId) -> PflowResult<()> {
        let pfo = self.arena.get_mut(pfo)?;
        if !pfo.tracks.insert(track) {
            return Err(PflowError::not_allowed(format!("{track} already in {}", pfo.id)));
        }
        Ok(())
    }

    /// 移除簇；PFO 不能因此变为空
    pub(crate) fn remove_cluster(&mut self, pfo: PfoId, cluster: ClusterId) -> PflowResult<()> {
        let pfo = self.arena.get_mut(pfo)?;
        if !pfo.clusters.contains(&cluster) {
            return Err(PflowError::not_found(format!("{cluster} not in {}", pfo.id)));
        }
        if pfo.n_constituents() == 1 {
            return Err(PflowError::not_allowed(format!("cannot remove the last constituent of {}", pfo.id)));
        }
        pfo.clusters.remove(&cluster);
        Ok(())
    }

    pub(crate) fn remove_track(&mut self, pfo: PfoId, track: TrackId) -> PflowResult<()> {
        let pfo = self.arena.get_mut(pfo)?;
        if !pfo.tracks.contains(&track) {
            return Err(PflowError::not_found(format!("{track} not in {}", pfo.id)));
        }
        if pfo.n_constituents() == 1 {
            return Err(PflowError::not_allowed(format!("cannot remove the last constituent of {}", pfo.id)));
        }
        pfo.tracks.remove(&track);
        Ok(())
    }

    pub(crate) fn add_vertex(&mut self, pfo: PfoId, vertex: VertexId) -> PflowResult<()> {
        let pfo = self.arena.get_mut(pfo)?;
        if !pfo.vertices.insert(vertex) {
            return Err(PflowError::not_allowed(format!("{vertex} already in {}", pfo.id)));
        }
        Ok(())
    }

    pub(crate) fn remove_vertex(&mut self, pfo: PfoId, vertex: VertexId) -> PflowResult<()> {
        let pfo = self.arena.get_mut(pfo)?;
        if !pfo.vertices.remove(&vertex) {
            return Err(PflowError::not_found(format!("{vertex} not in {}", pfo.id)));
        }
        Ok(())
    }

    /// 顶点被删除时从所有 PFO 中移除
    pub(crate) fn detach_vertex(&mut self, vertex: VertexId) {
        for pfo in self.arena.values_mut() {
            pfo.vertices.remove(&vertex);
        }
    }

    pub fn set_parent_daughter_relationship(&mut self, parent: PfoId, daughter: PfoId) -> PflowResult<()> {
        if parent == daughter {
            return Err(PflowError::not_allowed(format!("{parent} cannot be its own daughter")));
        }
        self.arena.ensure_live(&[parent, daughter])?;
        self.arena.get_mut(parent)?.daughters.insert(daughter);
        self.arena.get_mut(daughter)?.parents.insert(parent);
        Ok(())
    }

    pub fn remove_parent_daughter_relationship(&mut self, parent: PfoId, daughter: PfoId) -> PflowResult<()> {
        if !self.arena.get(parent)?.daughters.contains(&daughter) {
            return Err(PflowError::not_found(format!("{daughter} is not a daughter of {parent}")));
        }
        self.arena.get_mut(parent)?.daughters.remove(&daughter);
        if let Ok(pfo) = self.arena.get_mut(daughter) {
            pfo.parents.remove(&parent);
        }
        Ok(())
    }

    /// 删除 PFO 并解除其父子链接
    pub(crate) fn remove(&mut self, pfo: PfoId) -> PflowResult<ParticleFlowObject> {
        let removed = self
            .arena
            .remove(pfo)
            .ok_or_else(|| PflowError::not_found(format!("Pfo {pfo} is not live")))?;
        for other in self.arena.values_mut() {
            other.parents.remove(&pfo);
            other.daughters.remove(&pfo);
        }
        self.lists.remove_objects_everywhere(&[pfo]);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlgorithmId, ObjectKey};

    fn manager() -> PfoManager {
        let mut manager = PfoManager::new(&PflowConfig::default());
        manager.create_initial_lists().unwrap();
        let alg = AlgorithmId::new(1);
        manager.lists_mut().register_algorithm(alg).unwrap();
        manager
            .lists_mut()
            .create_temporary_list_and_set_current(alg, Vec::new())
            .unwrap();
        manager
    }

    fn params(clusters: &[u64], tracks: &[u64]) -> PfoParameters {
        PfoParameters {
            clusters: clusters.iter().map(|r| ClusterId::from_raw(*r)).collect(),
            tracks: tracks.iter().map(|r| TrackId::from_raw(*r)).collect(),
            ..PfoParameters::default()
        }
    }

    #[test]
    fn test_pfo_needs_a_constituent() {
        let mut manager = manager();
        assert!(matches!(manager.create(&params(&[], &[])), Err(PflowError::InvalidParameter(_))));
        let pfo = manager.create(&params(&[0], &[1])).unwrap();
        manager.remove_track(pfo, TrackId::from_raw(1)).unwrap();
        assert!(matches!(
            manager.remove_cluster(pfo, ClusterId::from_raw(0)),
            Err(PflowError::NotAllowed(_))
        ));
        assert_eq!(manager.get(pfo).unwrap().n_constituents(), 1);
    }

    #[test]
    fn test_remove_clears_links() {
        let mut manager = manager();
        let parent = manager.create(&params(&[0], &[])).unwrap();
        let daughter = manager.create(&params(&[1], &[])).unwrap();
        manager.set_parent_daughter_relationship(parent, daughter).unwrap();
        assert!(manager.set_parent_daughter_relationship(parent, parent).is_err());
        manager.remove(parent).unwrap();
        assert!(manager.get(daughter).unwrap().parents.is_empty());
        assert!(!manager.lists().contains_anywhere(parent));
    }
}
