//! 事务上下文：重聚类与碎片化共用一个后进先出的栈

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{AlgorithmId, ClusterId, HitId};
use crate::managers::track::TrackSnapshot;

/// 一层重聚类
#[derive(Debug, Clone)]
pub struct ReclusterContext {
    pub alg: AlgorithmId,
    /// 保存输入簇的临时列表
    pub original: String,
    /// 每次聚类运行产生的候选簇列表
    pub candidates: Vec<String>,
    /// 初始化时的当前列表（结束时恢复）
    pub cluster_list: String,
    pub hit_list: String,
    pub track_list: String,
    /// 输入簇（原始列表名失效时据此归还）
    pub clusters: BTreeSet<ClusterId>,
    pub tracks: TrackSnapshot,
}

impl ReclusterContext {
    pub fn is_candidate(&self, name: &str) -> bool {
        self.original == name || self.candidates.iter().any(|c| c == name)
    }

    /// 除 `selected` 以外的全部候选（含原始列表）
    pub fn discarded<'a>(&'a self, selected: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        std::iter::once(&self.original)
            .chain(self.candidates.iter())
            .filter(move |name| name.as_str() != selected)
    }
}

/// 一层碎片化
#[derive(Debug, Clone)]
pub struct FragmentationContext {
    pub alg: AlgorithmId,
    pub original: String,
    pub fragments: String,
    pub cluster_list: String,
    pub clusters: BTreeSet<ClusterId>,
    /// 初始化前受影响击中的可用性
    pub hit_availability: BTreeMap<HitId, bool>,
}

#[derive(Debug, Clone)]
pub enum TransactionContext {
    Recluster(ReclusterContext),
    Fragmentation(FragmentationContext),
}

impl TransactionContext {
    pub fn alg(&self) -> AlgorithmId {
        match self {
            Self::Recluster(ctx) => ctx.alg,
            Self::Fragmentation(ctx) => ctx.alg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discarded_excludes_selected() {
        let ctx = ReclusterContext {
            alg: AlgorithmId::new(1),
            original: "orig".into(),
            candidates: vec!["a".into(), "b".into()],
            cluster_list: "Clusters".into(),
            hit_list: "Input".into(),
            track_list: "Input".into(),
            clusters: BTreeSet::new(),
            tracks: TrackSnapshot::new(),
        };
        let discarded: Vec<&String> = ctx.discarded("a").collect();
        assert_eq!(discarded, vec!["orig", "b"]);
        assert!(ctx.is_candidate("orig"));
        assert!(!ctx.is_candidate("c"));
    }
}
