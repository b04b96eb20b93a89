//! 顶点管理器

use crate::config::PflowConfig;
use crate::core::{PflowError, PflowResult, VertexId};
use crate::lists::{ListManager, ObjectArena};
use crate::objects::{Vertex, VertexParameters};

pub struct VertexManager {
    arena: ObjectArena<VertexId, Vertex>,
    lists: ListManager<VertexId>,
}

impl VertexManager {
    pub fn new(config: &PflowConfig) -> Self {
        Self {
            arena: ObjectArena::new("Vertex"),
            lists: ListManager::algorithm("Vertex", &config.lists),
        }
    }

    pub fn lists(&self) -> &ListManager<VertexId> {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut ListManager<VertexId> {
        &mut self.lists
    }

    pub fn arena(&self) -> &ObjectArena<VertexId, Vertex> {
        &self.arena
    }

    pub fn get(&self, vertex: VertexId) -> PflowResult<&Vertex> {
        self.arena.get(vertex)
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

    /// 在当前（临时）列表中创建顶点
    pub fn create(&mut self, params: &VertexParameters) -> PflowResult<VertexId> {
        params.validate()?;
        self.lists.ensure_can_make_new_objects()?;
        let id = self.arena.insert_with(|id| Vertex {
            id,
            position: params.position,
            available: true,
        });
        self.lists.add_to_current_list(&[id])?;
        Ok(id)
    }

    pub fn is_available(&self, vertex: VertexId) -> PflowResult<bool> {
        Ok(self.arena.get(vertex)?.available)
    }

    pub(crate) fn set_availability(&mut self, vertex: VertexId, available: bool) -> PflowResult<()> {
        self.arena.get_mut(vertex)?.available = available;
        Ok(())
    }

    pub(crate) fn remove(&mut self, vertex: VertexId) -> PflowResult<Vertex> {
        let removed = self
            .arena
            .remove(vertex)
            .ok_or_else(|| PflowError::not_found(format!("Vertex {vertex} is not live")))?;
        self.lists.remove_objects_everywhere(&[vertex]);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AlgorithmId;
    use crate::objects::Position;

    #[test]
    fn test_create_and_remove() {
        let mut manager = VertexManager::new(&PflowConfig::default());
        manager.create_initial_lists().unwrap();
        let params = VertexParameters {
            position: Position::new(0.0, 1.0, 2.0),
        };
        assert!(matches!(manager.create(&params), Err(PflowError::NotAllowed(_))));

        let alg = AlgorithmId::new(3);
        manager.lists_mut().register_algorithm(alg).unwrap();
        let temp = manager
            .lists_mut()
            .create_temporary_list_and_set_current(alg, Vec::new())
            .unwrap();
        let vertex = manager.create(&params).unwrap();
        manager.lists_mut().save_list("Vertices", &[vertex]).unwrap();
        assert!(manager.lists().get_list(&temp).unwrap().is_empty());

        manager.remove(vertex).unwrap();
        assert!(manager.get(vertex).is_err());
        assert!(manager.lists().get_list("Vertices").unwrap().is_empty());
    }
}
