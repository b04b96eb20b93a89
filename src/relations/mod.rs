//! 关系图的两阶段构建
//!
//! 第一阶段：按客户端 Uid 登记父子 / 兄弟边，此时对象可能尚未创建；
//! 第二阶段：本事件所有输入对象创建完毕后一次性解析。解析先校验全部待处理边，
//! 任一 Uid 未知即返回 NotFound 且不修改任何状态；成功后清空队列，已解析的边不会重试。

use std::collections::HashMap;

use crate::core::{ObjectKey, PflowError, PflowResult, Uid};

/// 解析结果：对象 id 之间的边
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelations<I> {
    pub parent_daughter: Vec<(I, I)>,
    pub siblings: Vec<(I, I)>,
}

impl<I> Default for ResolvedRelations<I> {
    fn default() -> Self {
        Self {
            parent_daughter: Vec::new(),
            siblings: Vec::new(),
        }
    }
}

impl<I> ResolvedRelations<I> {
    pub fn is_empty(&self) -> bool {
        self.parent_daughter.is_empty() && self.siblings.is_empty()
    }
}

/// 待解析的边（按 Uid）
#[derive(Debug, Clone, Default)]
pub struct PendingRelations {
    parent_daughter: Vec<(Uid, Uid)>,
    siblings: Vec<(Uid, Uid)>,
}

impl PendingRelations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parent: Uid, daughter: Uid) -> PflowResult<()> {
        if parent == daughter {
            return Err(PflowError::not_allowed(format!("{parent} cannot be its own daughter")));
        }
        self.parent_daughter.push((parent, daughter));
        Ok(())
    }

    pub fn register_sibling(&mut self, first: Uid, second: Uid) -> PflowResult<()> {
        if first == second {
            return Err(PflowError::not_allowed(format!("{first} cannot be its own sibling")));
        }
        self.siblings.push((first, second));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parent_daughter.len() + self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.parent_daughter.clear();
        self.siblings.clear();
    }

    /// 用 Uid → id 映射解析全部待处理边
    pub fn resolve<I: ObjectKey>(&mut self, lookup: &HashMap<Uid, I>) -> PflowResult<ResolvedRelations<I>> {
        let find = |uid: &Uid| {
            lookup
                .get(uid)
                .copied()
                .ok_or_else(|| PflowError::not_found(format!("relationship refers to unknown {uid}")))
        };

        let mut resolved = ResolvedRelations::default();
        for (parent, daughter) in &self.parent_daughter {
            resolved.parent_daughter.push((find(parent)?, find(daughter)?));
        }
        for (first, second) in &self.siblings {
            resolved.siblings.push((find(first)?, find(second)?));
        }
        self.clear();
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TrackId;

    fn lookup(raw: &[u64]) -> HashMap<Uid, TrackId> {
        raw.iter().map(|r| (Uid(*r), TrackId::from_raw(*r))).collect()
    }

    #[test]
    fn test_resolve_drains_queue() {
        let mut pending = PendingRelations::new();
        pending.register(Uid(1), Uid(2)).unwrap();
        pending.register_sibling(Uid(2), Uid(3)).unwrap();
        let resolved = pending.resolve(&lookup(&[1, 2, 3])).unwrap();
        assert_eq!(resolved.parent_daughter, vec![(TrackId::from_raw(1), TrackId::from_raw(2))]);
        assert_eq!(resolved.siblings.len(), 1);
        assert!(pending.is_empty());
        assert!(pending.resolve(&lookup(&[1])).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_uid_keeps_queue() {
        let mut pending = PendingRelations::new();
        pending.register(Uid(1), Uid(2)).unwrap();
        pending.register(Uid(1), Uid(9)).unwrap();
        let err = pending.resolve(&lookup(&[1, 2])).unwrap_err();
        assert!(matches!(err, PflowError::NotFound(_)));
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_self_relation_not_allowed() {
        let mut pending = PendingRelations::new();
        assert!(matches!(pending.register(Uid(1), Uid(1)), Err(PflowError::NotAllowed(_))));
        assert!(matches!(pending.register_sibling(Uid(4), Uid(4)), Err(PflowError::NotAllowed(_))));
    }
}
