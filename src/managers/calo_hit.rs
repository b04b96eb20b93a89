//! 击中管理器：击中 arena、输入列表、拆分 / 合并、重聚类期间的试探性可用性
//!
//! 重聚类期间（元数据栈非空）可用性读写与拆分 / 合并都落在栈顶的当前候选上，
//! 直到 `end_reclustering` 提交被选中的候选。

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{FragmentationSection, PflowConfig};
use crate::core::{AlgorithmId, HitId, PflowError, PflowResult, Uid};
use crate::fragment::{conserves_energy, is_valid_fraction, FragmentLedger};
use crate::lists::{ListManager, ObjectArena};
use crate::objects::{CaloHit, CaloHitParameters};
use crate::recluster::metadata::{HitReplacement, ReclusterMetadata};
use crate::truth::WeightMap;

pub struct CaloHitManager {
    arena: ObjectArena<HitId, CaloHit>,
    lists: ListManager<HitId>,
    uid_lookup: HashMap<Uid, HitId>,
    ledger: FragmentLedger,
    recluster: Vec<ReclusterMetadata>,
    tolerances: FragmentationSection,
}

impl CaloHitManager {
    pub fn new(config: &PflowConfig) -> Self {
        Self {
            arena: ObjectArena::new("CaloHit"),
            lists: ListManager::input("CaloHit", &config.lists),
            uid_lookup: HashMap::new(),
            ledger: FragmentLedger::new(),
            recluster: Vec::new(),
            tolerances: config.fragmentation.clone(),
        }
    }

    pub fn lists(&self) -> &ListManager<HitId> {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut ListManager<HitId> {
        &mut self.lists
    }

    pub fn arena(&self) -> &ObjectArena<HitId, CaloHit> {
        &self.arena
    }

    pub fn get(&self, hit: HitId) -> PflowResult<&CaloHit> {
        self.arena.get(hit)
    }

    pub fn ledger(&self) -> &FragmentLedger {
        &self.ledger
    }

    /// 客户端 Uid 对应的（未被拆分的）输入击中
    pub fn find(&self, uid: Uid) -> Option<HitId> {
        self.uid_lookup.get(&uid).copied().filter(|id| self.arena.contains(*id))
    }

    /// 工厂：校验参数后创建击中并追加到输入列表
    pub fn create(&mut self, params: &CaloHitParameters) -> PflowResult<HitId> {
        params.validate()?;
        if self.uid_lookup.contains_key(&params.uid) {
            return Err(PflowError::not_allowed(format!("calo hit with {} already exists", params.uid)));
        }
        let input = self.lists.input_list_name().unwrap_or_default().to_string();
        if !self.lists.has_list(&input) {
            return Err(PflowError::not_initialized("calo hit lists not created for this event"));
        }
        let id = self.arena.insert_with(|id| CaloHit::from_parameters(id, params));
        self.uid_lookup.insert(params.uid, id);
        self.lists.add_to_input_list(&[id])?;
        Ok(id)
    }

    pub fn create_initial_lists(&mut self) -> PflowResult<()> {
        self.lists.create_initial_lists()
    }

    pub fn erase_all_content(&mut self) {
        self.arena.clear();
        self.lists.erase_all_content();
        self.uid_lookup.clear();
        self.ledger.clear();
        self.recluster.clear();
    }

    pub fn reset_for_next_event(&mut self) -> PflowResult<()> {
        self.erase_all_content();
        self.lists.create_initial_lists()
    }

    // ---------- 可用性 ----------

    pub fn is_reclustering(&self) -> bool {
        !self.recluster.is_empty()
    }

    /// 重聚类期间读当前候选的试探性值；不在候选视图中的击中读已提交值
    pub fn is_available(&self, hit: HitId) -> PflowResult<bool> {
        let committed = self.arena.get(hit)?.available;
        Ok(self
            .recluster
            .last()
            .and_then(|metadata| metadata.current())
            .and_then(|candidate| candidate.is_available(hit))
            .unwrap_or(committed))
    }

    pub fn are_available(&self, hits: &[HitId]) -> PflowResult<bool> {
        for hit in hits {
            if !self.is_available(*hit)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 校验击中均存活、可用，且重聚类期间在当前候选视图中（之后的写入不会失败）
    pub fn ensure_available(&self, hits: &[HitId]) -> PflowResult<()> {
        self.arena.ensure_live(hits)?;
        for hit in hits {
            if !self.is_tracked(*hit) {
                return Err(PflowError::not_found(format!("{hit} is not tracked by the recluster candidate")));
            }
            if !self.is_available(*hit)? {
                return Err(PflowError::not_allowed(format!("{hit} is not available")));
            }
        }
        Ok(())
    }

    pub fn set_availability(&mut self, hit: HitId, available: bool) -> PflowResult<()> {
        self.arena.get(hit)?;
        match self.recluster.last_mut().and_then(|metadata| metadata.current_mut()) {
            Some(candidate) => candidate.set_availability(hit, available),
            None => {
                self.arena.get_mut(hit)?.available = available;
                Ok(())
            }
        }
    }

    pub(crate) fn set_availability_all(&mut self, hits: &[HitId], available: bool) -> PflowResult<()> {
        for hit in hits {
            self.set_availability(*hit, available)?;
        }
        Ok(())
    }

    /// 非重聚类期间恒为 true
    pub(crate) fn is_tracked(&self, hit: HitId) -> bool {
        match self.recluster.last().map(|metadata| metadata.current()) {
            Some(Some(candidate)) => candidate.tracks(hit),
            Some(None) => false,
            None => true,
        }
    }

    // ---------- 拆分 / 合并 ----------

    pub fn can_fragment(&self, hit: HitId, fraction: f32) -> bool {
        is_valid_fraction(fraction, self.tolerances.fraction_epsilon)
            && self.is_tracked(hit)
            && matches!(self.is_available(hit), Ok(true))
    }

    /// 按 `fraction` 与 `1 - fraction` 拆分；返回两个子击中
    pub(crate) fn fragment(&mut self, hit: HitId, fraction: f32) -> PflowResult<(HitId, HitId)> {
        if !self.can_fragment(hit, fraction) {
            return Err(PflowError::not_allowed(format!("cannot fragment {hit} with fraction {fraction}")));
        }
        let original = self.arena.get(hit)?.clone();
        let first = original.fragment(original.id, fraction);
        let second = original.fragment(original.id, 1.0 - fraction);
        if !conserves_energy(
            &[first.input_energy, second.input_energy],
            original.input_energy,
            self.tolerances.energy_tolerance,
        ) {
            return Err(PflowError::invalid(format!("fragmenting {hit} does not conserve energy")));
        }

        let d1 = self.arena.insert_with(|id| CaloHit { id, ..first });
        let d2 = self.arena.insert_with(|id| CaloHit { id, ..second });
        self.ledger.record_split(hit, original.origin, [d1, d2], fraction);
        self.commit_replacement(HitReplacement {
            old: vec![hit],
            new: vec![d1, d2],
        });
        tracing::debug!("fragmented {} into {} and {} (fraction {})", hit, d1, d2, fraction);
        Ok((d1, d2))
    }

    pub fn can_merge(&self, a: HitId, b: HitId) -> bool {
        if a == b || !self.is_tracked(a) || !self.is_tracked(b) {
            return false;
        }
        let (Ok(hit_a), Ok(hit_b)) = (self.arena.get(a), self.arena.get(b)) else {
            return false;
        };
        hit_a.origin == hit_b.origin && matches!(self.are_available(&[a, b]), Ok(true))
    }

    /// 合并同一原始击中的两个碎片
    pub(crate) fn merge(&mut self, a: HitId, b: HitId) -> PflowResult<HitId> {
        if !self.can_merge(a, b) {
            return Err(PflowError::not_allowed(format!("cannot merge {a} and {b}")));
        }
        let (hit_a, hit_b) = (self.arena.get(a)?.clone(), self.arena.get(b)?.clone());
        let merged = self.arena.insert_with(|id| CaloHit::merged(id, &hit_a, &hit_b));
        self.ledger.record_merge([a, b], hit_a.origin, merged);
        self.commit_replacement(HitReplacement {
            old: vec![a, b],
            new: vec![merged],
        });
        tracing::debug!("merged {} and {} into {}", a, b, merged);
        Ok(merged)
    }

    /// 重聚类期间只写入当前候选与当前列表；否则替换所有列表并删除旧击中
    fn commit_replacement(&mut self, replacement: HitReplacement) {
        match self.recluster.last_mut().and_then(|metadata| metadata.current_mut()) {
            Some(candidate) => {
                let current = self.lists.current_list_name().to_string();
                self.lists
                    .replace_objects_in_list(&current, &replacement.old, &replacement.new);
                candidate.apply(replacement);
            }
            None => {
                self.lists
                    .replace_objects_everywhere(&replacement.old, &replacement.new);
                self.delete_hits(&replacement.old);
            }
        }
    }

    fn delete_hits(&mut self, hits: &[HitId]) {
        self.lists.remove_objects_everywhere(hits);
        for hit in hits {
            self.arena.remove(*hit);
        }
    }

    // ---------- 重聚类 ----------

    /// 压入新一层元数据，并以重聚类击中创建临时列表设为当前
    pub(crate) fn initialize_reclustering(
        &mut self,
        alg: AlgorithmId,
        hits: Vec<HitId>,
        original: &str,
    ) -> PflowResult<String> {
        let name = self
            .lists
            .create_temporary_list_and_set_current(alg, hits.iter().copied())?;
        self.recluster.push(ReclusterMetadata::new(hits, original));
        Ok(name)
    }

    /// 为新的候选建立元数据与独立的击中临时列表
    pub(crate) fn prepare_for_clustering(&mut self, alg: AlgorithmId, candidate: &str) -> PflowResult<String> {
        let metadata = self
            .recluster
            .last()
            .ok_or_else(|| PflowError::not_allowed("no reclustering in progress"))?;
        if metadata.has_candidate(candidate) {
            return Err(PflowError::not_allowed(format!("recluster candidate '{candidate}' already exists")));
        }
        let seed = metadata.hits().to_vec();
        let name = self.lists.create_temporary_list_and_set_current(alg, seed)?;
        if let Some(metadata) = self.recluster.last_mut() {
            metadata.add_candidate(candidate)?;
        }
        Ok(name)
    }

    pub fn has_recluster_candidate(&self, name: &str) -> bool {
        self.recluster
            .last()
            .map(|metadata| metadata.has_candidate(name))
            .unwrap_or(false)
    }

    /// 提交被选中的候选：嵌套时并入外层当前候选，否则写入已提交状态并应用替换
    pub(crate) fn end_reclustering(&mut self, selected: &str, restore_list: &str) -> PflowResult<()> {
        if !self.has_recluster_candidate(selected) {
            return Err(PflowError::not_found(format!("recluster candidate '{selected}'")));
        }
        self.lists.get_list(restore_list)?;
        let Some(metadata) = self.recluster.pop() else {
            return Err(PflowError::not_allowed("no reclustering in progress"));
        };
        let (chosen, discarded) = metadata.into_selection(selected)?;

        for candidate in &discarded {
            let created = candidate.created_hits();
            self.delete_hits(&created);
            self.ledger.forget(&created);
        }

        if self.recluster.is_empty() {
            for replacement in chosen.replacements() {
                self.lists
                    .replace_objects_everywhere(&replacement.old, &replacement.new);
                self.delete_hits(&replacement.old);
            }
            for (hit, available) in chosen.availability() {
                if let Ok(hit) = self.arena.get_mut(*hit) {
                    hit.available = *available;
                }
            }
        } else {
            for replacement in chosen.replacements() {
                self.lists
                    .replace_objects_in_list(restore_list, &replacement.old, &replacement.new);
            }
            if let Some(outer) = self.recluster.last_mut().and_then(|metadata| metadata.current_mut()) {
                outer.absorb(chosen);
            }
        }
        self.lists.temporarily_replace_current_list(restore_list)
    }

    /// 放弃最内层重聚类：删除所有候选试探性创建的击中，已提交状态与外层候选不变
    pub(crate) fn abort_reclustering(&mut self, restore_list: &str) {
        let Some(metadata) = self.recluster.pop() else {
            return;
        };
        for candidate in metadata.into_candidates() {
            let created = candidate.created_hits();
            self.delete_hits(&created);
            self.ledger.forget(&created);
        }
        if let Err(err) = self.lists.temporarily_replace_current_list(restore_list) {
            tracing::warn!("CaloHit list not restored after aborted reclustering: {}", err);
        }
    }

    // ---------- 真值 ----------

    /// 写入每个击中的 PFO 目标权重；映射中没有对应击中的条目被忽略，返回忽略的条目数
    pub fn match_to_mc_targets(&mut self, targets: &BTreeMap<Uid, WeightMap>) -> usize {
        let mut matched = 0usize;
        let mut known = HashSet::new();
        for hit in self.arena.values_mut() {
            known.insert(hit.uid);
            if let Some(weights) = targets.get(&hit.uid) {
                hit.mc_weights = weights.clone();
                matched += 1;
            }
        }
        let ignored = targets.keys().filter(|uid| !known.contains(*uid)).count();
        if ignored > 0 {
            tracing::warn!("ignored {} calo hit associations with unknown uids", ignored);
        }
        tracing::debug!("matched {} calo hits to mc targets", matched);
        ignored
    }

    pub fn remove_all_mc_particle_relationships(&mut self) {
        for hit in self.arena.values_mut() {
            hit.mc_weights.clear();
        }
    }
}
