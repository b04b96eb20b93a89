//! 具名列表存储层：对象 arena、对象列表、泛型列表管理器

pub mod arena;
pub mod manager;
pub mod object_list;

pub use arena::{ListOrdering, ObjectArena};
pub use manager::{ListManager, SavePolicy};
pub use object_list::ObjectList;
