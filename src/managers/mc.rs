//! MC 粒子管理器：粒子 arena、父子关系、击中 / 径迹关联与 PFO 目标

use std::collections::{BTreeMap, HashMap};

use crate::config::PflowConfig;
use crate::core::{McParticleId, PflowError, PflowResult, Uid};
use crate::lists::{ListManager, ObjectArena};
use crate::objects::{McParticle, McParticleParameters};
use crate::relations::PendingRelations;
use crate::truth::{select_targets, AssociationMap, TargetSelectionPolicy, WeightMap};

pub struct McManager {
    arena: ObjectArena<McParticleId, McParticle>,
    lists: ListManager<McParticleId>,
    uid_lookup: HashMap<Uid, McParticleId>,
    relations: PendingRelations,
    hit_associations: AssociationMap,
    track_associations: AssociationMap,
    /// 目标选择后填充；None 表示本事件尚未选择
    hit_targets: Option<BTreeMap<Uid, WeightMap>>,
    track_targets: BTreeMap<Uid, WeightMap>,
    selected_list_name: String,
}

impl McManager {
    pub fn new(config: &PflowConfig) -> Self {
        Self {
            arena: ObjectArena::new("MCParticle"),
            lists: ListManager::input("MCParticle", &config.lists),
            uid_lookup: HashMap::new(),
            relations: PendingRelations::new(),
            hit_associations: AssociationMap::new(),
            track_associations: AssociationMap::new(),
            hit_targets: None,
            track_targets: BTreeMap::new(),
            selected_list_name: config.lists.selected_mc_list_name.clone(),
        }
    }

    pub fn lists(&self) -> &ListManager<McParticleId> {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut ListManager<McParticleId> {
        &mut self.lists
    }

    pub fn arena(&self) -> &ObjectArena<McParticleId, McParticle> {
        &self.arena
    }

    pub fn get(&self, particle: McParticleId) -> PflowResult<&McParticle> {
        self.arena.get(particle)
    }

    pub fn find(&self, uid: Uid) -> Option<McParticleId> {
        self.uid_lookup.get(&uid).copied()
    }

    pub fn create(&mut self, params: &McParticleParameters) -> PflowResult<McParticleId> {
        params.validate()?;
        if self.uid_lookup.contains_key(&params.uid) {
            return Err(PflowError::not_allowed(format!("mc particle with {} already exists", params.uid)));
        }
        let input = self.lists.input_list_name().unwrap_or_default().to_string();
        if !self.lists.has_list(&input) {
            return Err(PflowError::not_initialized("mc particle lists not created for this event"));
        }
        let id = self.arena.insert_with(|id| McParticle::from_parameters(id, params));
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
        self.relations.clear();
        self.hit_associations.clear();
        self.track_associations.clear();
        self.hit_targets = None;
        self.track_targets.clear();
    }

    pub fn reset_for_next_event(&mut self) -> PflowResult<()> {
        self.erase_all_content();
        self.lists.create_initial_lists()
    }

    // ---------- 关系 ----------

    pub fn set_parent_daughter_relationship(&mut self, parent: Uid, daughter: Uid) -> PflowResult<()> {
        self.relations.register(parent, daughter)
    }

    pub fn pending_relationships(&self) -> usize {
        self.relations.len()
    }

    /// 解析待处理的父子关系
    pub fn add_mc_particle_relationships(&mut self) -> PflowResult<()> {
        let resolved = self.relations.resolve(&self.uid_lookup)?;
        for (parent, daughter) in &resolved.parent_daughter {
            self.arena.get_mut(*parent)?.daughters.insert(*daughter);
            self.arena.get_mut(*daughter)?.parents.insert(*parent);
        }
        tracing::debug!("resolved {} mc parent/daughter relationships", resolved.parent_daughter.len());
        Ok(())
    }

    pub fn set_calo_hit_to_mc_particle_relationship(&mut self, hit: Uid, mc: Uid, weight: f32) -> PflowResult<()> {
        self.hit_associations.associate(hit, mc, weight)
    }

    pub fn set_track_to_mc_particle_relationship(&mut self, track: Uid, mc: Uid, weight: f32) -> PflowResult<()> {
        self.track_associations.associate(track, mc, weight)
    }

    // ---------- PFO 目标 ----------

    pub fn targets_selected(&self) -> bool {
        self.hit_targets.is_some()
    }

    /// 每个事件一次：确定各粒子的目标、填充选中列表、把关联改写到目标上
    pub fn select_pfo_targets(&mut self, policy: &dyn TargetSelectionPolicy) -> PflowResult<()> {
        if self.targets_selected() {
            return Err(PflowError::not_allowed("pfo targets already selected for this event"));
        }
        let (targets, qualifying) = select_targets(&self.arena, policy);
        let hit_targets = self.hit_associations.to_targets(&self.uid_lookup, &targets)?;
        let track_targets = self.track_associations.to_targets(&self.uid_lookup, &targets)?;

        for (id, target) in &targets {
            self.arena.get_mut(*id)?.pfo_target = Some(*target);
        }
        let selected: Vec<McParticleId> = qualifying.into_iter().collect();
        let name = self.selected_list_name.clone();
        self.lists.clear_list(&name);
        self.lists.save_list(&name, &selected)?;

        tracing::info!(
            "selected {} mc pfo targets, {} hit and {} track associations",
            selected.len(),
            hit_targets.len(),
            track_targets.len()
        );
        self.hit_targets = Some(hit_targets);
        self.track_targets = track_targets;
        Ok(())
    }

    pub fn hit_targets(&self) -> PflowResult<&BTreeMap<Uid, WeightMap>> {
        self.hit_targets
            .as_ref()
            .ok_or_else(|| PflowError::not_initialized("pfo targets not selected"))
    }

    pub fn track_targets(&self) -> PflowResult<&BTreeMap<Uid, WeightMap>> {
        self.hit_targets()?;
        Ok(&self.track_targets)
    }

    /// 击中的目标 → 权重；无关联时为空
    pub fn targets_for_calo_hit(&self, hit: Uid) -> PflowResult<WeightMap> {
        Ok(self.hit_targets()?.get(&hit).cloned().unwrap_or_default())
    }

    pub fn targets_for_track(&self, track: Uid) -> PflowResult<WeightMap> {
        Ok(self.track_targets()?.get(&track).cloned().unwrap_or_default())
    }

    /// 清除关系图、关联、目标与选中列表
    pub fn remove_all_mc_particle_relationships(&mut self) {
        let selected = self.selected_list_name.clone();
        self.lists.clear_list(&selected);
        for particle in self.arena.values_mut() {
            particle.parents.clear();
            particle.daughters.clear();
            particle.pfo_target = None;
        }
        self.relations.clear();
        self.hit_associations.clear();
        self.track_associations.clear();
        self.hit_targets = None;
        self.track_targets.clear();
    }
}
