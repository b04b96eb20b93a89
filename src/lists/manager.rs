//! 具名列表存储（泛型）：名称 → 列表、当前列表、按算法的检查点
//!
//! 输入对象（击中、径迹、MC 粒子）与算法对象（簇、PFO、顶点）共用同一实现，
//! 差别只在 `SavePolicy`：输入对象保存时复制引用，算法对象保存时转移。
//!
//! 检查点：`register_algorithm` 记录进入时的当前列表作为父列表；
//! `reset_algorithm_info` 把当前列表恢复为父列表，并删除未被提升为已保存的临时列表。

use std::collections::{BTreeMap, BTreeSet};

use crate::config::ListsSection;
use crate::core::{AlgorithmId, ObjectKey, PflowError, PflowResult};
use crate::lists::ObjectList;

/// 保存语义
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SavePolicy {
    /// 复制引用，源列表不变（输入对象）
    Copy,
    /// 转移对象，源列表中移除（算法对象）
    Move,
}

/// 单个算法的检查点
#[derive(Clone, Debug, Default)]
struct AlgorithmInfo {
    /// 算法注册时的当前列表
    parent_list_name: String,
    /// 算法创建、尚未提升的临时列表
    temporary_list_names: BTreeSet<String>,
    /// 已创建的列表数（用于生成唯一名）
    number_of_lists_created: u32,
}

/// 泛型具名列表存储
#[derive(Debug)]
pub struct ListManager<I: ObjectKey> {
    kind: &'static str,
    policy: SavePolicy,
    null_list_name: String,
    input_list_name: Option<String>,
    name_to_list: BTreeMap<String, ObjectList<I>>,
    algorithm_info: BTreeMap<AlgorithmId, AlgorithmInfo>,
    current_list_name: String,
    saved_lists: BTreeSet<String>,
}

impl<I: ObjectKey> ListManager<I> {
    /// 输入对象存储：每个事件一个只追加的输入列表，保存时复制
    pub fn input(kind: &'static str, names: &ListsSection) -> Self {
        Self::with_policy(kind, SavePolicy::Copy, names, Some(names.input_list_name.clone()))
    }

    /// 算法对象存储：无输入列表，保存时转移
    pub fn algorithm(kind: &'static str, names: &ListsSection) -> Self {
        Self::with_policy(kind, SavePolicy::Move, names, None)
    }

    fn with_policy(kind: &'static str, policy: SavePolicy, names: &ListsSection, input_list_name: Option<String>) -> Self {
        Self {
            kind,
            policy,
            null_list_name: names.null_list_name.clone(),
            input_list_name,
            name_to_list: BTreeMap::new(),
            algorithm_info: BTreeMap::new(),
            current_list_name: names.null_list_name.clone(),
            saved_lists: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    pub fn null_list_name(&self) -> &str {
        &self.null_list_name
    }

    pub fn input_list_name(&self) -> Option<&str> {
        self.input_list_name.as_deref()
    }

    // ---------- 事件生命周期 ----------

    /// 事件开始：创建空列表（以及输入列表）并设为当前
    pub fn create_initial_lists(&mut self) -> PflowResult<()> {
        if !self.name_to_list.is_empty() || !self.saved_lists.is_empty() {
            return Err(PflowError::not_allowed(format!(
                "{} lists already initialized",
                self.kind
            )));
        }
        self.name_to_list.insert(self.null_list_name.clone(), ObjectList::new());
        self.current_list_name = self.null_list_name.clone();

        if let Some(input) = self.input_list_name.clone() {
            self.name_to_list.insert(input.clone(), ObjectList::new());
            self.saved_lists.insert(input.clone());
            self.current_list_name = input;
        }
        Ok(())
    }

    /// 事件结束：清空全部列表与检查点
    pub fn erase_all_content(&mut self) {
        self.name_to_list.clear();
        self.saved_lists.clear();
        self.algorithm_info.clear();
        self.current_list_name = self.null_list_name.clone();
    }

    pub fn reset_for_next_event(&mut self) -> PflowResult<()> {
        self.erase_all_content();
        self.create_initial_lists()
    }

    // ---------- 查询 ----------

    pub fn get_list(&self, name: &str) -> PflowResult<&ObjectList<I>> {
        self.name_to_list
            .get(name)
            .ok_or_else(|| PflowError::not_found(format!("{} list '{name}'", self.kind)))
    }

    /// 当前列表及其名称；列表尚未初始化时返回 NotInitialized
    pub fn current_list(&self) -> PflowResult<(&ObjectList<I>, &str)> {
        let list = self.name_to_list.get(&self.current_list_name).ok_or_else(|| {
            PflowError::not_initialized(format!("{} lists not created for this event", self.kind))
        })?;
        Ok((list, self.current_list_name.as_str()))
    }

    pub fn current_list_name(&self) -> &str {
        &self.current_list_name
    }

    pub fn has_list(&self, name: &str) -> bool {
        self.name_to_list.contains_key(name)
    }

    pub fn is_saved(&self, name: &str) -> bool {
        self.saved_lists.contains(name)
    }

    pub fn saved_list_names(&self) -> BTreeSet<String> {
        self.saved_lists.clone()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.name_to_list.keys().cloned().collect()
    }

    /// 是否为某个已注册算法的临时列表
    pub fn is_temporary(&self, name: &str) -> bool {
        self.algorithm_info
            .values()
            .any(|info| info.temporary_list_names.contains(name))
    }

    pub fn is_algorithm_registered(&self, alg: AlgorithmId) -> bool {
        self.algorithm_info.contains_key(&alg)
    }

    /// 算法输入列表（注册时的当前列表，或被替换后的列表）
    pub fn algorithm_input_list(&self, alg: AlgorithmId) -> PflowResult<(&ObjectList<I>, &str)> {
        let info = self.info(alg)?;
        let list = self.get_list(&info.parent_list_name)?;
        Ok((list, info.parent_list_name.as_str()))
    }

    pub fn contains_anywhere(&self, id: I) -> bool {
        self.name_to_list.values().any(|list| list.contains(&id))
    }

    /// 算法尚未提升的临时列表
    pub fn temporary_list_names(&self, alg: AlgorithmId) -> PflowResult<Vec<String>> {
        Ok(self.info(alg)?.temporary_list_names.iter().cloned().collect())
    }

    /// 算法临时列表中的全部对象（检查点回滚前用于找出将成为孤儿的对象）
    pub fn objects_in_temporary_lists(&self, alg: AlgorithmId) -> PflowResult<Vec<I>> {
        let mut objects = Vec::new();
        for name in &self.info(alg)?.temporary_list_names {
            if let Some(list) = self.name_to_list.get(name) {
                objects.extend(list.iter());
            }
        }
        objects.sort();
        objects.dedup();
        Ok(objects)
    }

    // ---------- 当前列表操作 ----------

    pub fn reset_current_list_to_algorithm_input_list(&mut self, alg: AlgorithmId) -> PflowResult<()> {
        let parent = self.info(alg)?.parent_list_name.clone();
        self.current_list_name = parent;
        Ok(())
    }

    /// 用已保存列表替换当前列表与算法输入列表
    pub fn replace_current_and_algorithm_input_lists(&mut self, alg: AlgorithmId, name: &str) -> PflowResult<()> {
        if !self.saved_lists.contains(name) {
            return Err(PflowError::not_found(format!(
                "{} list '{name}' is not a saved list",
                self.kind
            )));
        }
        let info = self.info_mut(alg)?;
        info.parent_list_name = name.to_string();
        self.current_list_name = name.to_string();
        Ok(())
    }

    /// 临时替换当前列表（不改变算法输入列表）
    pub fn temporarily_replace_current_list(&mut self, name: &str) -> PflowResult<()> {
        self.get_list(name)?;
        self.current_list_name = name.to_string();
        Ok(())
    }

    /// 丢弃当前列表：当前列表与算法输入列表均回到空列表
    pub fn drop_current_list(&mut self, alg: AlgorithmId) -> PflowResult<()> {
        let null = self.null_list_name.clone();
        let info = self.info_mut(alg)?;
        info.parent_list_name = null.clone();
        self.current_list_name = null;
        Ok(())
    }

    /// 重命名列表；临时列表重命名后即被提升为已保存
    pub fn rename_list(&mut self, old: &str, new: &str) -> PflowResult<()> {
        if self.is_protected(old) {
            return Err(PflowError::not_allowed(format!(
                "cannot rename protected {} list '{old}'",
                self.kind
            )));
        }
        if old == self.current_list_name {
            return Err(PflowError::not_allowed(format!(
                "cannot rename current {} list '{old}'",
                self.kind
            )));
        }
        if !self.name_to_list.contains_key(old) {
            return Err(PflowError::not_found(format!("{} list '{old}'", self.kind)));
        }
        if self.name_to_list.contains_key(new) {
            return Err(PflowError::not_allowed(format!(
                "{} list '{new}' already exists",
                self.kind
            )));
        }

        if let Some(list) = self.name_to_list.remove(old) {
            self.name_to_list.insert(new.to_string(), list);
        }
        self.saved_lists.remove(old);
        self.saved_lists.insert(new.to_string());
        for info in self.algorithm_info.values_mut() {
            info.temporary_list_names.remove(old);
            if info.parent_list_name == old {
                info.parent_list_name = new.to_string();
            }
        }
        tracing::debug!("{} list '{}' renamed to '{}'", self.kind, old, new);
        Ok(())
    }

    // ---------- 检查点 ----------

    pub fn register_algorithm(&mut self, alg: AlgorithmId) -> PflowResult<()> {
        if self.algorithm_info.contains_key(&alg) {
            return Err(PflowError::not_allowed(format!(
                "{alg} already registered with {} manager",
                self.kind
            )));
        }
        self.algorithm_info.insert(
            alg,
            AlgorithmInfo {
                parent_list_name: self.current_list_name.clone(),
                ..AlgorithmInfo::default()
            },
        );
        Ok(())
    }

    /// 恢复当前列表为父列表，删除未提升的临时列表；`finished` 时移除检查点
    pub fn reset_algorithm_info(&mut self, alg: AlgorithmId, finished: bool) -> PflowResult<()> {
        let info = self.info_mut(alg)?;
        let temporaries = std::mem::take(&mut info.temporary_list_names);
        let parent = info.parent_list_name.clone();

        for name in &temporaries {
            self.name_to_list.remove(name);
        }
        self.current_list_name = if self.name_to_list.contains_key(&parent) {
            parent
        } else {
            self.null_list_name.clone()
        };
        if finished {
            self.algorithm_info.remove(&alg);
        }
        if !temporaries.is_empty() {
            tracing::debug!(
                "{} manager: {} removed {} temporary lists",
                self.kind,
                alg,
                temporaries.len()
            );
        }
        Ok(())
    }

    /// 创建归属于 `alg` 的临时列表并设为当前
    pub fn create_temporary_list_and_set_current(
        &mut self,
        alg: AlgorithmId,
        seed: impl IntoIterator<Item = I>,
    ) -> PflowResult<String> {
        let kind = self.kind;
        let info = self
            .algorithm_info
            .get_mut(&alg)
            .ok_or_else(|| PflowError::not_found(format!("{alg} not registered with {kind} manager")))?;

        let mut name;
        loop {
            name = format!("{}_temp_{}_{}", kind, alg.raw(), info.number_of_lists_created);
            info.number_of_lists_created += 1;
            if !self.name_to_list.contains_key(&name) {
                break;
            }
        }
        info.temporary_list_names.insert(name.clone());
        self.name_to_list.insert(name.clone(), seed.into_iter().collect());
        self.current_list_name = name.clone();
        tracing::debug!("{} manager: {} created temporary list '{}'", kind, alg, name);
        Ok(name)
    }

    /// 把对象从 `source` 转移到新的临时列表并设为当前（仅 Move）
    pub fn move_objects_to_temporary_list_and_set_current(
        &mut self,
        alg: AlgorithmId,
        source: &str,
        objects: &[I],
    ) -> PflowResult<String> {
        self.ensure_policy(SavePolicy::Move)?;
        self.info(alg)?;
        let list = self.get_list(source)?;
        if let Some(missing) = objects.iter().find(|id| !list.contains(id)) {
            return Err(PflowError::not_found(format!(
                "{missing} not in {} list '{source}'",
                self.kind
            )));
        }
        let name = self.create_temporary_list_and_set_current(alg, objects.iter().copied())?;
        if let Some(list) = self.name_to_list.get_mut(source) {
            for id in objects {
                list.remove(id);
            }
        }
        Ok(name)
    }

    // ---------- 保存 / 增删 ----------

    /// 保存对象到 `target`（不存在则创建）；源为当前列表。
    /// Copy：对象须已在某个列表中，仅追加；Move：对象必须在当前列表中，并从当前列表移除
    pub fn save_list(&mut self, target: &str, objects: &[I]) -> PflowResult<()> {
        let source = self.current_list_name.clone();
        match self.policy {
            SavePolicy::Copy => {
                self.ensure_writable(target)?;
                self.ensure_listed(objects)?;
                self.append_saved(target, objects.iter().copied());
                Ok(())
            }
            SavePolicy::Move => self.save_objects(target, &source, Some(objects)),
        }
    }

    /// 从 `source` 保存 `subset`（缺省为整个源列表）到 `target`
    pub fn save_objects(&mut self, target: &str, source: &str, subset: Option<&[I]>) -> PflowResult<()> {
        self.ensure_writable(target)?;
        if target == source {
            return Err(PflowError::not_allowed(format!(
                "{} list '{target}' cannot be saved into itself",
                self.kind
            )));
        }
        let source_list = self.get_list(source)?;
        let objects: Vec<I> = match subset {
            Some(subset) => {
                if let Some(missing) = subset.iter().find(|id| !source_list.contains(id)) {
                    return Err(PflowError::not_found(format!(
                        "{missing} not in {} list '{source}'",
                        self.kind
                    )));
                }
                subset.to_vec()
            }
            None => source_list.to_vec(),
        };

        if self.policy == SavePolicy::Move {
            if self.is_protected(source) {
                return Err(PflowError::not_allowed(format!(
                    "cannot move objects out of protected {} list '{source}'",
                    self.kind
                )));
            }
            if let Some(list) = self.name_to_list.get_mut(source) {
                for id in &objects {
                    list.remove(id);
                }
            }
        }
        self.append_saved(target, objects);
        Ok(())
    }

    /// 向已存在的列表追加对象（仅 Copy，输入列表除外）
    pub fn add_objects_to_list(&mut self, name: &str, objects: &[I]) -> PflowResult<()> {
        self.ensure_policy(SavePolicy::Copy)?;
        self.ensure_writable(name)?;
        self.ensure_listed(objects)?;
        let kind = self.kind;
        let list = self
            .name_to_list
            .get_mut(name)
            .ok_or_else(|| PflowError::not_found(format!("{kind} list '{name}'")))?;
        list.extend(objects.iter().copied());
        Ok(())
    }

    /// 从列表移除对象；任一对象不在列表中时不做任何修改
    pub fn remove_objects_from_list(&mut self, name: &str, objects: &[I]) -> PflowResult<()> {
        self.ensure_writable(name)?;
        let kind = self.kind;
        let list = self
            .name_to_list
            .get_mut(name)
            .ok_or_else(|| PflowError::not_found(format!("{kind} list '{name}'")))?;
        if let Some(missing) = objects.iter().find(|id| !list.contains(id)) {
            return Err(PflowError::not_found(format!("{missing} not in {kind} list '{name}'")));
        }
        for id in objects {
            list.remove(id);
        }
        Ok(())
    }

    /// 工厂创建的输入对象追加到输入列表
    pub(crate) fn add_to_input_list(&mut self, objects: &[I]) -> PflowResult<()> {
        let input = self
            .input_list_name
            .clone()
            .ok_or_else(|| PflowError::not_allowed(format!("{} manager has no input list", self.kind)))?;
        let list = self.name_to_list.get_mut(&input).ok_or_else(|| {
            PflowError::not_initialized(format!("{} input list not created for this event", self.kind))
        })?;
        list.extend(objects.iter().copied());
        Ok(())
    }

    /// 算法新建的对象追加到当前列表；当前列表必须是临时列表
    pub(crate) fn add_to_current_list(&mut self, objects: &[I]) -> PflowResult<()> {
        self.ensure_can_make_new_objects()?;
        let current = self.current_list_name.clone();
        if let Some(list) = self.name_to_list.get_mut(&current) {
            list.extend(objects.iter().copied());
        }
        Ok(())
    }

    pub fn ensure_can_make_new_objects(&self) -> PflowResult<()> {
        if self.is_temporary(&self.current_list_name) {
            Ok(())
        } else {
            Err(PflowError::not_allowed(format!(
                "{} objects can only be created in a temporary list, current is '{}'",
                self.kind, self.current_list_name
            )))
        }
    }

    /// 从所有列表中移除对象（对象被删除时）
    pub(crate) fn remove_objects_everywhere(&mut self, objects: &[I]) {
        for list in self.name_to_list.values_mut() {
            for id in objects {
                list.remove(id);
            }
        }
    }

    /// 在所有包含旧对象的列表中，用新对象替换旧对象
    pub(crate) fn replace_objects_everywhere(&mut self, old: &[I], new: &[I]) {
        for list in self.name_to_list.values_mut() {
            if old.iter().any(|id| list.contains(id)) {
                for id in old {
                    list.remove(id);
                }
                list.extend(new.iter().copied());
            }
        }
    }

    /// 在两个已存在的列表之间转移对象，不改变保存状态（事务结束时归还对象）
    pub(crate) fn transfer_objects(&mut self, source: &str, target: &str, objects: &[I]) -> PflowResult<()> {
        if source == target {
            return Ok(());
        }
        if !objects.is_empty() {
            self.ensure_writable(target)?;
        }
        self.get_list(target)?;
        let source_list = self.get_list(source)?;
        if let Some(missing) = objects.iter().find(|id| !source_list.contains(id)) {
            return Err(PflowError::not_found(format!(
                "{missing} not in {} list '{source}'",
                self.kind
            )));
        }
        if let Some(list) = self.name_to_list.get_mut(source) {
            for id in objects {
                list.remove(id);
            }
        }
        if let Some(list) = self.name_to_list.get_mut(target) {
            list.extend(objects.iter().copied());
        }
        Ok(())
    }

    /// 把对象从所有临时列表中取出并放回 `target`（事务无法正常结束时归还输入对象）
    pub(crate) fn reclaim_objects(&mut self, target: &str, objects: &[I]) -> PflowResult<()> {
        self.get_list(target)?;
        let temporaries: BTreeSet<String> = self
            .algorithm_info
            .values()
            .flat_map(|info| info.temporary_list_names.iter().cloned())
            .collect();
        for name in &temporaries {
            if let Some(list) = self.name_to_list.get_mut(name) {
                for id in objects {
                    list.remove(id);
                }
            }
        }
        if let Some(list) = self.name_to_list.get_mut(target) {
            list.extend(objects.iter().copied());
        }
        Ok(())
    }

    /// 清空列表内容（列表存在时）
    pub(crate) fn clear_list(&mut self, name: &str) {
        if let Some(list) = self.name_to_list.get_mut(name) {
            list.clear();
        }
    }

    /// 只在指定列表中替换
    pub(crate) fn replace_objects_in_list(&mut self, name: &str, old: &[I], new: &[I]) {
        if let Some(list) = self.name_to_list.get_mut(name) {
            for id in old {
                list.remove(id);
            }
            list.extend(new.iter().copied());
        }
    }

    // ---------- 内部 ----------

    /// 已删除或从未创建的对象不在任何列表中
    fn ensure_listed(&self, objects: &[I]) -> PflowResult<()> {
        match objects.iter().find(|id| !self.contains_anywhere(**id)) {
            Some(missing) => Err(PflowError::not_found(format!("{} {missing} is not live", self.kind))),
            None => Ok(()),
        }
    }

    fn info(&self, alg: AlgorithmId) -> PflowResult<&AlgorithmInfo> {
        self.algorithm_info
            .get(&alg)
            .ok_or_else(|| PflowError::not_found(format!("{alg} not registered with {} manager", self.kind)))
    }

    fn info_mut(&mut self, alg: AlgorithmId) -> PflowResult<&mut AlgorithmInfo> {
        let kind = self.kind;
        self.algorithm_info
            .get_mut(&alg)
            .ok_or_else(|| PflowError::not_found(format!("{alg} not registered with {kind} manager")))
    }

    fn is_protected(&self, name: &str) -> bool {
        name == self.null_list_name || self.input_list_name.as_deref() == Some(name)
    }

    fn ensure_writable(&self, name: &str) -> PflowResult<()> {
        if self.is_protected(name) {
            Err(PflowError::not_allowed(format!(
                "{} list '{name}' cannot be modified",
                self.kind
            )))
        } else {
            Ok(())
        }
    }

    fn ensure_policy(&self, policy: SavePolicy) -> PflowResult<()> {
        if self.policy == policy {
            Ok(())
        } else {
            Err(PflowError::not_allowed(format!(
                "operation requires {:?} policy, {} manager uses {:?}",
                policy, self.kind, self.policy
            )))
        }
    }

    /// 追加并标记为已保存；若目标原为临时列表则提升
    fn append_saved(&mut self, target: &str, objects: impl IntoIterator<Item = I>) {
        self.name_to_list
            .entry(target.to_string())
            .or_default()
            .extend(objects);
        self.saved_lists.insert(target.to_string());
        for info in self.algorithm_info.values_mut() {
            info.temporary_list_names.remove(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ClusterId, HitId};

    fn names() -> ListsSection {
        ListsSection::default()
    }

    fn hits(raw: &[u64]) -> Vec<HitId> {
        raw.iter().map(|r| HitId::from_raw(*r)).collect()
    }

    fn input_manager() -> ListManager<HitId> {
        let mut m = ListManager::input("CaloHit", &names());
        m.create_initial_lists().unwrap();
        m.add_to_input_list(&hits(&[0, 1, 2, 3])).unwrap();
        m
    }

    fn algorithm_manager() -> ListManager<ClusterId> {
        let mut m = ListManager::algorithm("Cluster", &names());
        m.create_initial_lists().unwrap();
        m
    }

    #[test]
    fn test_initial_lists() {
        let m = input_manager();
        let (list, name) = m.current_list().unwrap();
        assert_eq!(name, "Input");
        assert_eq!(list.len(), 4);
        assert!(m.is_saved("Input"));

        let a = algorithm_manager();
        assert_eq!(a.current_list().unwrap().1, "NullList");
        assert!(a.current_list().unwrap().0.is_empty());
    }

    #[test]
    fn test_current_list_before_initialization() {
        let m: ListManager<HitId> = ListManager::input("CaloHit", &names());
        assert!(matches!(m.current_list(), Err(PflowError::NotInitialized(_))));
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut m = input_manager();
        let saved_before = m.saved_list_names();
        let current_before = m.current_list_name().to_string();

        let alg = AlgorithmId::new(1);
        m.register_algorithm(alg).unwrap();
        for _ in 0..3 {
            m.create_temporary_list_and_set_current(alg, hits(&[1])).unwrap();
        }
        assert_ne!(m.current_list_name(), current_before);
        m.reset_algorithm_info(alg, true).unwrap();

        assert_eq!(m.saved_list_names(), saved_before);
        assert_eq!(m.current_list_name(), current_before);
        assert_eq!(m.list_names().len(), 2);
        assert!(!m.is_algorithm_registered(alg));
    }

    #[test]
    fn test_temporary_names_are_unique() {
        let mut m = input_manager();
        let alg = AlgorithmId::new(7);
        m.register_algorithm(alg).unwrap();
        let a = m.create_temporary_list_and_set_current(alg, Vec::new()).unwrap();
        let b = m.create_temporary_list_and_set_current(alg, Vec::new()).unwrap();
        assert_ne!(a, b);
        assert_eq!(m.current_list_name(), b);
        assert!(m.is_temporary(&a));
    }

    #[test]
    fn test_unregistered_algorithm_not_found() {
        let mut m = input_manager();
        let err = m
            .create_temporary_list_and_set_current(AlgorithmId::new(9), Vec::new())
            .unwrap_err();
        assert!(matches!(err, PflowError::NotFound(_)));
        assert!(m.register_algorithm(AlgorithmId::new(9)).is_ok());
        assert!(matches!(
            m.register_algorithm(AlgorithmId::new(9)),
            Err(PflowError::NotAllowed(_))
        ));
    }

    #[test]
    fn test_copy_save_leaves_source() {
        let mut m = input_manager();
        m.save_list("Subset", &hits(&[1, 2])).unwrap();
        assert_eq!(m.get_list("Input").unwrap().len(), 4);
        assert_eq!(m.get_list("Subset").unwrap().to_vec(), hits(&[1, 2]));
        // 再次保存为追加
        m.save_list("Subset", &hits(&[3])).unwrap();
        assert_eq!(m.get_list("Subset").unwrap().len(), 3);
        assert!(matches!(m.save_list("Input", &hits(&[1])), Err(PflowError::NotAllowed(_))));
    }

    #[test]
    fn test_copy_save_rejects_unlisted_objects() {
        let mut m = input_manager();
        let err = m.save_list("Subset", &hits(&[1, 9])).unwrap_err();
        assert!(matches!(err, PflowError::NotFound(_)));
        assert!(!m.has_list("Subset"));

        m.save_list("Subset", &hits(&[1])).unwrap();
        assert!(matches!(
            m.add_objects_to_list("Subset", &hits(&[9])),
            Err(PflowError::NotFound(_))
        ));
        m.remove_objects_everywhere(&hits(&[2]));
        assert!(matches!(
            m.add_objects_to_list("Subset", &hits(&[2])),
            Err(PflowError::NotFound(_))
        ));
        assert_eq!(m.get_list("Subset").unwrap().to_vec(), hits(&[1]));
    }

    #[test]
    fn test_move_save_removes_from_source() {
        let mut m = algorithm_manager();
        let alg = AlgorithmId::new(1);
        m.register_algorithm(alg).unwrap();
        let temp = m.create_temporary_list_and_set_current(alg, Vec::new()).unwrap();
        let ids: Vec<ClusterId> = (0..4).map(ClusterId::from_raw).collect();
        m.add_to_current_list(&ids).unwrap();

        m.save_list("Clusters", &ids[..2]).unwrap();
        assert_eq!(m.get_list(&temp).unwrap().to_vec(), ids[2..].to_vec());
        assert_eq!(m.get_list("Clusters").unwrap().to_vec(), ids[..2].to_vec());

        // 不在源列表中的对象
        let err = m.save_list("Clusters", &ids[..1]).unwrap_err();
        assert!(matches!(err, PflowError::NotFound(_)));
        assert_eq!(m.get_list(&temp).unwrap().len(), 2);

        m.save_objects("Clusters", &temp, None).unwrap();
        assert!(m.get_list(&temp).unwrap().is_empty());
        assert_eq!(m.get_list("Clusters").unwrap().len(), 4);
    }

    #[test]
    fn test_replace_current_requires_saved() {
        let mut m = input_manager();
        let alg = AlgorithmId::new(1);
        m.register_algorithm(alg).unwrap();
        let temp = m.create_temporary_list_and_set_current(alg, Vec::new()).unwrap();
        assert!(matches!(
            m.replace_current_and_algorithm_input_lists(alg, &temp),
            Err(PflowError::NotFound(_))
        ));
        m.save_list("Saved", &hits(&[0])).unwrap();
        m.replace_current_and_algorithm_input_lists(alg, "Saved").unwrap();
        assert_eq!(m.algorithm_input_list(alg).unwrap().1, "Saved");
        m.reset_algorithm_info(alg, true).unwrap();
        assert_eq!(m.current_list_name(), "Saved");
    }

    #[test]
    fn test_rename_rules() {
        let mut m = input_manager();
        m.save_list("A", &hits(&[0])).unwrap();
        m.save_list("B", &hits(&[1])).unwrap();
        assert!(matches!(m.rename_list("Input", "X"), Err(PflowError::NotAllowed(_))));
        assert!(matches!(m.rename_list("A", "B"), Err(PflowError::NotAllowed(_))));
        assert!(matches!(m.rename_list("Missing", "C"), Err(PflowError::NotFound(_))));
        m.rename_list("A", "C").unwrap();
        assert!(m.is_saved("C"));
        assert!(!m.has_list("A"));

        let alg = AlgorithmId::new(2);
        m.register_algorithm(alg).unwrap();
        let temp = m.create_temporary_list_and_set_current(alg, hits(&[2])).unwrap();
        assert!(matches!(m.rename_list(&temp, "D"), Err(PflowError::NotAllowed(_))));
        m.temporarily_replace_current_list("C").unwrap();
        m.rename_list(&temp, "D").unwrap();
        m.reset_algorithm_info(alg, true).unwrap();
        // 被重命名（提升）的临时列表不会被回滚
        assert!(m.is_saved("D"));
    }

    #[test]
    fn test_save_promotes_temporary() {
        let mut m = input_manager();
        let alg = AlgorithmId::new(3);
        m.register_algorithm(alg).unwrap();
        let temp = m.create_temporary_list_and_set_current(alg, hits(&[0])).unwrap();
        m.save_list(&temp, &hits(&[1])).unwrap();
        m.reset_algorithm_info(alg, true).unwrap();
        assert_eq!(m.get_list(&temp).unwrap().len(), 2);
    }

    #[test]
    fn test_drop_current_list() {
        let mut m = input_manager();
        let alg = AlgorithmId::new(4);
        m.register_algorithm(alg).unwrap();
        m.drop_current_list(alg).unwrap();
        assert_eq!(m.current_list_name(), "NullList");
        m.reset_algorithm_info(alg, true).unwrap();
        assert_eq!(m.current_list_name(), "NullList");
    }

    #[test]
    fn test_remove_objects_is_atomic() {
        let mut m = input_manager();
        m.save_list("A", &hits(&[0, 1])).unwrap();
        let err = m.remove_objects_from_list("A", &hits(&[0, 3])).unwrap_err();
        assert!(matches!(err, PflowError::NotFound(_)));
        assert_eq!(m.get_list("A").unwrap().len(), 2);
        m.remove_objects_from_list("A", &hits(&[0])).unwrap();
        assert_eq!(m.get_list("A").unwrap().to_vec(), hits(&[1]));
        assert!(matches!(
            m.remove_objects_from_list("Input", &hits(&[0])),
            Err(PflowError::NotAllowed(_))
        ));
    }

    #[test]
    fn test_nested_algorithms_restore_parent_lists() {
        let mut m = input_manager();
        let parent = AlgorithmId::new(1);
        let daughter = AlgorithmId::new(2);
        m.register_algorithm(parent).unwrap();
        let parent_temp = m.create_temporary_list_and_set_current(parent, hits(&[0, 1])).unwrap();

        m.register_algorithm(daughter).unwrap();
        assert_eq!(m.algorithm_input_list(daughter).unwrap().1, parent_temp);
        m.create_temporary_list_and_set_current(daughter, hits(&[0])).unwrap();
        m.reset_algorithm_info(daughter, true).unwrap();
        assert_eq!(m.current_list_name(), parent_temp);

        m.reset_algorithm_info(parent, true).unwrap();
        assert_eq!(m.current_list_name(), "Input");
        assert!(!m.has_list(&parent_temp));
    }

    #[test]
    fn test_replace_objects_everywhere() {
        let mut m = input_manager();
        m.save_list("A", &hits(&[0, 1])).unwrap();
        m.save_list("B", &hits(&[2])).unwrap();
        m.replace_objects_everywhere(&hits(&[0]), &hits(&[7, 8]));
        assert_eq!(m.get_list("A").unwrap().to_vec(), hits(&[1, 7, 8]));
        assert_eq!(m.get_list("B").unwrap().to_vec(), hits(&[2]));
        assert!(m.get_list("Input").unwrap().contains(&HitId::from_raw(7)));
        assert!(!m.contains_anywhere(HitId::from_raw(0)));
    }
}
