//! 击中的重聚类元数据：每个候选一份试探性可用性与替换记录

use std::collections::BTreeMap;

use crate::core::{HitId, PflowError, PflowResult};

/// 一次拆分或合并：`old` 被 `new` 取代
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitReplacement {
    pub old: Vec<HitId>,
    pub new: Vec<HitId>,
}

/// 单个候选的击中视图
#[derive(Debug, Clone, Default)]
pub struct HitMetadata {
    availability: BTreeMap<HitId, bool>,
    replacements: Vec<HitReplacement>,
}

impl HitMetadata {
    pub fn with_hits(hits: &[HitId], available: bool) -> Self {
        Self {
            availability: hits.iter().map(|hit| (*hit, available)).collect(),
            replacements: Vec::new(),
        }
    }

    /// 击中是否在本候选的视图中
    pub fn tracks(&self, hit: HitId) -> bool {
        self.availability.contains_key(&hit)
    }

    pub fn is_available(&self, hit: HitId) -> Option<bool> {
        self.availability.get(&hit).copied()
    }

    pub fn set_availability(&mut self, hit: HitId, available: bool) -> PflowResult<()> {
        match self.availability.get_mut(&hit) {
            Some(flag) => {
                *flag = available;
                Ok(())
            }
            None => Err(PflowError::not_found(format!("{hit} is not tracked by the recluster candidate"))),
        }
    }

    /// 记录一次替换：旧击中退出视图，新击中以可用状态进入
    pub fn apply(&mut self, replacement: HitReplacement) {
        for hit in &replacement.old {
            self.availability.remove(hit);
        }
        for hit in &replacement.new {
            self.availability.insert(*hit, true);
        }
        self.replacements.push(replacement);
    }

    /// 合并内层被选中候选的结果（嵌套重聚类提交）
    pub fn absorb(&mut self, inner: HitMetadata) {
        for replacement in &inner.replacements {
            for hit in &replacement.old {
                self.availability.remove(hit);
            }
        }
        self.availability.extend(inner.availability);
        self.replacements.extend(inner.replacements);
    }

    pub fn availability(&self) -> &BTreeMap<HitId, bool> {
        &self.availability
    }

    pub fn replacements(&self) -> &[HitReplacement] {
        &self.replacements
    }

    /// 本候选试探性创建的全部击中（含已被再次替换的中间击中）
    pub fn created_hits(&self) -> Vec<HitId> {
        self.replacements.iter().flat_map(|r| r.new.iter().copied()).collect()
    }
}

/// 一层重聚类：初始击中集合与各候选的元数据
#[derive(Debug, Clone)]
pub struct ReclusterMetadata {
    hits: Vec<HitId>,
    candidates: BTreeMap<String, HitMetadata>,
    current: String,
}

impl ReclusterMetadata {
    /// 原始候选的击中都在输入簇中，试探性可用性为 false
    pub fn new(hits: Vec<HitId>, original: &str) -> Self {
        let mut candidates = BTreeMap::new();
        candidates.insert(original.to_string(), HitMetadata::with_hits(&hits, false));
        Self {
            hits,
            candidates,
            current: original.to_string(),
        }
    }

    pub fn hits(&self) -> &[HitId] {
        &self.hits
    }

    /// 新候选：全部重聚类击中试探性可用，并成为当前候选
    pub fn add_candidate(&mut self, name: &str) -> PflowResult<()> {
        if self.candidates.contains_key(name) {
            return Err(PflowError::not_allowed(format!("recluster candidate '{name}' already exists")));
        }
        self.candidates
            .insert(name.to_string(), HitMetadata::with_hits(&self.hits, true));
        self.current = name.to_string();
        Ok(())
    }

    pub fn has_candidate(&self, name: &str) -> bool {
        self.candidates.contains_key(name)
    }

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn current(&self) -> Option<&HitMetadata> {
        self.candidates.get(&self.current)
    }

    pub fn current_mut(&mut self) -> Option<&mut HitMetadata> {
        self.candidates.get_mut(&self.current)
    }

    /// 全部候选（放弃整层时使用）
    pub fn into_candidates(self) -> Vec<HitMetadata> {
        self.candidates.into_values().collect()
    }

    /// 拆出被选中的候选与其余候选
    pub fn into_selection(mut self, selected: &str) -> PflowResult<(HitMetadata, Vec<HitMetadata>)> {
        let chosen = self
            .candidates
            .remove(selected)
            .ok_or_else(|| PflowError::not_found(format!("recluster candidate '{selected}'")))?;
        Ok((chosen, self.candidates.into_values().collect()))
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
    fn test_candidates_start_with_expected_availability() {
        let mut metadata = ReclusterMetadata::new(vec![hit(0), hit(1)], "original");
        assert_eq!(metadata.current().and_then(|m| m.is_available(hit(0))), Some(false));
        metadata.add_candidate("cand").unwrap();
        assert_eq!(metadata.current_name(), "cand");
        assert_eq!(metadata.current().and_then(|m| m.is_available(hit(1))), Some(true));
        assert!(matches!(metadata.add_candidate("cand"), Err(PflowError::NotAllowed(_))));
    }

    #[test]
    fn test_apply_and_absorb() {
        let mut outer = HitMetadata::with_hits(&[hit(0), hit(1)], true);
        let mut inner = HitMetadata::with_hits(&[hit(0)], true);
        inner.apply(HitReplacement {
            old: vec![hit(0)],
            new: vec![hit(5), hit(6)],
        });
        inner.set_availability(hit(5), false).unwrap();
        assert!(inner.set_availability(hit(0), false).is_err());

        outer.absorb(inner);
        assert!(!outer.tracks(hit(0)));
        assert_eq!(outer.is_available(hit(5)), Some(false));
        assert_eq!(outer.is_available(hit(6)), Some(true));
        assert_eq!(outer.created_hits(), vec![hit(5), hit(6)]);
    }

    #[test]
    fn test_into_selection() {
        let mut metadata = ReclusterMetadata::new(vec![hit(0)], "original");
        metadata.add_candidate("a").unwrap();
        metadata.add_candidate("b").unwrap();
        let (chosen, others) = metadata.clone().into_selection("a").unwrap();
        assert_eq!(chosen.is_available(hit(0)), Some(true));
        assert_eq!(others.len(), 2);
        assert!(matches!(metadata.into_selection("zzz"), Err(PflowError::NotFound(_))));
    }
}
