//! 顶点

use std::cmp::Ordering;

use crate::core::{PflowResult, VertexId};
use crate::lists::ListOrdering;
use crate::objects::Position;

#[derive(Debug, Clone, Default)]
pub struct VertexParameters {
    pub position: Position,
}

impl VertexParameters {
    pub fn validate(&self) -> PflowResult<()> {
        self.position.validate("position")
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Position,
    pub available: bool,
}

impl ListOrdering for Vertex {
    fn list_cmp(&self, other: &Self) -> Ordering {
        self.position.lexicographic_cmp(&other.position)
    }
}
