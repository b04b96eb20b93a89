//! 有序、无重复的对象 id 列表

use std::collections::BTreeSet;

use crate::core::ObjectKey;

/// 对象列表：只存 id（非拥有引用），按 id（即创建顺序）有序
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectList<I: ObjectKey> {
    ids: BTreeSet<I>,
}

impl<I: ObjectKey> Default for ObjectList<I> {
    fn default() -> Self {
        Self { ids: BTreeSet::new() }
    }
}

impl<I: ObjectKey> ObjectList<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &I) -> bool {
        self.ids.contains(id)
    }

    /// 插入；已存在时返回 false
    pub fn insert(&mut self, id: I) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &I) -> bool {
        self.ids.remove(id)
    }

    pub fn extend<It: IntoIterator<Item = I>>(&mut self, ids: It) {
        self.ids.extend(ids);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = I> + '_ {
        self.ids.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<I> {
        self.ids.iter().copied().collect()
    }

    pub fn contains_all(&self, ids: &[I]) -> bool {
        ids.iter().all(|id| self.ids.contains(id))
    }
}

impl<I: ObjectKey> FromIterator<I> for ObjectList<I> {
    fn from_iter<It: IntoIterator<Item = I>>(iter: It) -> Self {
        Self { ids: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HitId;

    #[test]
    fn test_duplicate_free_and_ordered() {
        let mut list = ObjectList::new();
        assert!(list.insert(HitId::from_raw(5)));
        assert!(list.insert(HitId::from_raw(1)));
        assert!(!list.insert(HitId::from_raw(5)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.to_vec(), vec![HitId::from_raw(1), HitId::from_raw(5)]);
        assert!(list.contains_all(&[HitId::from_raw(1)]));
        assert!(!list.contains_all(&[HitId::from_raw(2)]));
    }
}
