//! 对象 arena：某一类型对象的唯一所有者
//!
//! 对象以稳定 id 寻址，删除后 id 不再复用；其它代码只持有 id。

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::core::{ObjectKey, PflowError, PflowResult};
use crate::lists::ObjectList;

/// 各对象类型的确定性排序规则（用于可复现的物理顺序遍历）
pub trait ListOrdering {
    fn list_cmp(&self, other: &Self) -> Ordering;
}

/// 单一类型对象的存储
#[derive(Debug)]
pub struct ObjectArena<I: ObjectKey, T> {
    kind: &'static str,
    objects: BTreeMap<I, T>,
    next_id: u64,
}

impl<I: ObjectKey, T> ObjectArena<I, T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            objects: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// 分配新 id 并插入由 `build` 构造的对象
    pub fn insert_with(&mut self, build: impl FnOnce(I) -> T) -> I {
        let id = I::from_raw(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, build(id));
        id
    }

    pub fn get(&self, id: I) -> PflowResult<&T> {
        self.objects
            .get(&id)
            .ok_or_else(|| PflowError::not_found(format!("{} {id} is not live", self.kind)))
    }

    pub fn get_mut(&mut self, id: I) -> PflowResult<&mut T> {
        let kind = self.kind;
        self.objects
            .get_mut(&id)
            .ok_or_else(|| PflowError::not_found(format!("{kind} {id} is not live")))
    }

    pub fn contains(&self, id: I) -> bool {
        self.objects.contains_key(&id)
    }

    /// 校验一组 id 均存活
    pub fn ensure_live(&self, ids: &[I]) -> PflowResult<()> {
        match ids.iter().find(|id| !self.objects.contains_key(id)) {
            Some(id) => Err(PflowError::not_found(format!("{} {id} is not live", self.kind))),
            None => Ok(()),
        }
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        self.objects.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.objects.iter().map(|(id, obj)| (*id, obj))
    }

    pub fn ids(&self) -> Vec<I> {
        self.objects.keys().copied().collect()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.objects.values_mut()
    }

    /// 清空对象（事件结束）；id 计数器不回退
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

impl<I: ObjectKey, T: ListOrdering> ObjectArena<I, T> {
    /// 按类型排序规则给出列表的遍历顺序；并列时按 id
    pub fn ordered(&self, list: &ObjectList<I>) -> Vec<I> {
        let mut ids: Vec<I> = list.iter().filter(|id| self.objects.contains_key(id)).collect();
        ids.sort_by(|a, b| {
            let (oa, ob) = (&self.objects[a], &self.objects[b]);
            oa.list_cmp(ob).then_with(|| a.cmp(b))
        });
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VertexId;

    struct Dummy(f32);

    impl ListOrdering for Dummy {
        fn list_cmp(&self, other: &Self) -> Ordering {
            other.0.total_cmp(&self.0)
        }
    }

    #[test]
    fn test_ids_are_stable_and_not_reused() {
        let mut arena: ObjectArena<VertexId, Dummy> = ObjectArena::new("Vertex");
        let a = arena.insert_with(|_| Dummy(1.0));
        let b = arena.insert_with(|_| Dummy(2.0));
        assert!(arena.remove(a).is_some());
        let c = arena.insert_with(|_| Dummy(3.0));
        assert_ne!(a, c);
        assert!(arena.get(a).is_err());
        assert!(arena.get(b).is_ok());
        assert!(matches!(arena.ensure_live(&[a, b]), Err(PflowError::NotFound(_))));
    }

    #[test]
    fn test_ordered_uses_comparator() {
        let mut arena: ObjectArena<VertexId, Dummy> = ObjectArena::new("Vertex");
        let low = arena.insert_with(|_| Dummy(1.0));
        let high = arena.insert_with(|_| Dummy(5.0));
        let list: ObjectList<VertexId> = [low, high].into_iter().collect();
        assert_eq!(arena.ordered(&list), vec![high, low]);
    }
}
