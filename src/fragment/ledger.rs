//! 拆分 / 合并谱系账本

use std::collections::BTreeMap;

use crate::core::HitId;

/// 击中的来源方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentKind {
    /// 由拆分产生，`fraction` 为相对父击中的份额
    Split { fraction: f32 },
    /// 由同谱系两个碎片合并产生
    Merge,
}

/// 一条账本记录（以产生的击中为键）
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub kind: FragmentKind,
    pub parents: Vec<HitId>,
    /// 谱系的原始击中
    pub origin: HitId,
}

#[derive(Debug, Default)]
pub struct FragmentLedger {
    entries: BTreeMap<HitId, LedgerEntry>,
}

impl FragmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_split(&mut self, parent: HitId, origin: HitId, daughters: [HitId; 2], fraction: f32) {
        let fractions = [fraction, 1.0 - fraction];
        for (daughter, fraction) in daughters.into_iter().zip(fractions) {
            self.entries.insert(
                daughter,
                LedgerEntry {
                    kind: FragmentKind::Split { fraction },
                    parents: vec![parent],
                    origin,
                },
            );
        }
    }

    pub fn record_merge(&mut self, parents: [HitId; 2], origin: HitId, merged: HitId) {
        self.entries.insert(
            merged,
            LedgerEntry {
                kind: FragmentKind::Merge,
                parents: parents.to_vec(),
                origin,
            },
        );
    }

    pub fn entry(&self, hit: HitId) -> Option<&LedgerEntry> {
        self.entries.get(&hit)
    }

    /// 击中的原始击中；未拆分过的击中不在账本中
    pub fn origin(&self, hit: HitId) -> Option<HitId> {
        self.entries.get(&hit).map(|e| e.origin)
    }

    /// 丢弃候选产生的击中被删除时一并移除记录
    pub fn forget(&mut self, hits: &[HitId]) {
        for hit in hits {
            self.entries.remove(hit);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectKey;

    fn hit(raw: u64) -> HitId {
        HitId::from_raw(raw)
    }

    #[test]
    fn test_split_then_merge_records() {
        let mut ledger = FragmentLedger::new();
        ledger.record_split(hit(0), hit(0), [hit(1), hit(2)], 0.3);
        ledger.record_merge([hit(1), hit(2)], hit(0), hit(3));

        assert_eq!(ledger.origin(hit(2)), Some(hit(0)));
        match ledger.entry(hit(2)).map(|e| e.kind) {
            Some(FragmentKind::Split { fraction }) => assert!((fraction - 0.7).abs() < 1e-6),
            other => panic!("unexpected entry {other:?}"),
        }
        assert_eq!(ledger.entry(hit(3)).map(|e| e.parents.clone()), Some(vec![hit(1), hit(2)]));
        assert_eq!(ledger.origin(hit(0)), None);

        ledger.forget(&[hit(1), hit(2)]);
        assert_eq!(ledger.len(), 1);
    }
}
