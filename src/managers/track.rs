//! 径迹管理器：径迹 arena、父子 / 兄弟关系、径迹-簇关联

use std::collections::{BTreeMap, HashMap};

use crate::config::PflowConfig;
use crate::core::{ClusterId, PflowError, PflowResult, TrackId, Uid};
use crate::lists::{ListManager, ObjectArena};
use crate::objects::{Track, TrackParameters};
use crate::relations::PendingRelations;
use crate::truth::WeightMap;

/// 重聚类前径迹的关联与可用性
pub type TrackSnapshot = BTreeMap<TrackId, (Option<ClusterId>, bool)>;

pub struct TrackManager {
    arena: ObjectArena<TrackId, Track>,
    lists: ListManager<TrackId>,
    uid_lookup: HashMap<Uid, TrackId>,
    relations: PendingRelations,
}

impl TrackManager {
    pub fn new(config: &PflowConfig) -> Self {
        Self {
            arena: ObjectArena::new("Track"),
            lists: ListManager::input("Track", &config.lists),
            uid_lookup: HashMap::new(),
            relations: PendingRelations::new(),
        }
    }

    pub fn lists(&self) -> &ListManager<TrackId> {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut ListManager<TrackId> {
        &mut self.lists
    }

    pub fn arena(&self) -> &ObjectArena<TrackId, Track> {
        &self.arena
    }

    pub fn get(&self, track: TrackId) -> PflowResult<&Track> {
        self.arena.get(track)
    }

    pub fn find(&self, uid: Uid) -> Option<TrackId> {
        self.uid_lookup.get(&uid).copied()
    }

    pub fn create(&mut self, params: &TrackParameters) -> PflowResult<TrackId> {
        params.validate()?;
        if self.uid_lookup.contains_key(&params.uid) {
            return Err(PflowError::not_allowed(format!("track with {} already exists", params.uid)));
        }
        let input = self.lists.input_list_name().unwrap_or_default().to_string();
        if !self.lists.has_list(&input) {
            return Err(PflowError::not_initialized("track lists not created for this event"));
        }
        let id = self.arena.insert_with(|id| Track::from_parameters(id, params));
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
    }

    pub fn reset_for_next_event(&mut self) -> PflowResult<()> {
        self.erase_all_content();
        self.lists.create_initial_lists()
    }

    // ---------- 关系 ----------

    pub fn set_parent_daughter_relationship(&mut self, parent: Uid, daughter: Uid) -> PflowResult<()> {
        self.relations.register(parent, daughter)
    }

    pub fn set_sibling_relationship(&mut self, first: Uid, second: Uid) -> PflowResult<()> {
        self.relations.register_sibling(first, second)
    }

    pub fn pending_relationships(&self) -> usize {
        self.relations.len()
    }

    /// 解析全部待处理关系；任一 Uid 未知时返回 NotFound，关系图与队列保持不变
    pub fn associate_tracks(&mut self) -> PflowResult<()> {
        let resolved = self.relations.resolve(&self.uid_lookup)?;
        for (parent, daughter) in &resolved.parent_daughter {
            self.arena.get_mut(*parent)?.daughters.insert(*daughter);
            self.arena.get_mut(*daughter)?.parents.insert(*parent);
        }
        for (first, second) in &resolved.siblings {
            self.arena.get_mut(*first)?.siblings.insert(*second);
            self.arena.get_mut(*second)?.siblings.insert(*first);
        }
        tracing::debug!(
            "resolved {} track parent/daughter and {} sibling relationships",
            resolved.parent_daughter.len(),
            resolved.siblings.len()
        );
        Ok(())
    }

    // ---------- 簇关联与可用性 ----------

    pub fn set_associated_cluster(&mut self, track: TrackId, cluster: ClusterId) -> PflowResult<()> {
        let track = self.arena.get_mut(track)?;
        if let Some(existing) = track.associated_cluster {
            return Err(PflowError::not_allowed(format!(
                "{} already associated with {existing}",
                track.id
            )));
        }
        track.associated_cluster = Some(cluster);
        Ok(())
    }

    pub fn remove_associated_cluster(&mut self, track: TrackId, cluster: ClusterId) -> PflowResult<()> {
        let track = self.arena.get_mut(track)?;
        if track.associated_cluster != Some(cluster) {
            return Err(PflowError::not_found(format!("{} is not associated with {cluster}", track.id)));
        }
        track.associated_cluster = None;
        Ok(())
    }

    /// 簇被删除时清除指向它的关联
    pub(crate) fn clear_associations_to(&mut self, cluster: ClusterId) {
        for track in self.arena.values_mut() {
            if track.associated_cluster == Some(cluster) {
                track.associated_cluster = None;
            }
        }
    }

    /// 簇合并后关联转移到保留的簇
    pub(crate) fn redirect_associations(&mut self, from: ClusterId, to: ClusterId) {
        for track in self.arena.values_mut() {
            if track.associated_cluster == Some(from) {
                track.associated_cluster = Some(to);
            }
        }
    }

    pub fn is_available(&self, track: TrackId) -> PflowResult<bool> {
        Ok(self.arena.get(track)?.available)
    }

    pub fn set_availability(&mut self, track: TrackId, available: bool) -> PflowResult<()> {
        self.arena.get_mut(track)?.available = available;
        Ok(())
    }

    /// 记录径迹的关联与可用性，然后清除关联
    pub(crate) fn snapshot_and_clear_associations(&mut self, tracks: &[TrackId]) -> PflowResult<TrackSnapshot> {
        self.arena.ensure_live(tracks)?;
        let mut snapshot = TrackSnapshot::new();
        for id in tracks {
            let track = self.arena.get_mut(*id)?;
            snapshot.insert(*id, (track.associated_cluster.take(), track.available));
        }
        Ok(snapshot)
    }

    pub(crate) fn restore(&mut self, snapshot: &TrackSnapshot) {
        for (id, (cluster, available)) in snapshot {
            if let Ok(track) = self.arena.get_mut(*id) {
                track.associated_cluster = *cluster;
                track.available = *available;
            }
        }
    }

    // ---------- 真值 ----------

    /// 返回被忽略（Uid 未知）的条目数
    pub fn match_to_mc_targets(&mut self, targets: &BTreeMap<Uid, WeightMap>) -> usize {
        let mut ignored = 0usize;
        for (uid, weights) in targets {
            match self.uid_lookup.get(uid).and_then(|id| self.arena.get_mut(*id).ok()) {
                Some(track) => track.mc_weights = weights.clone(),
                None => ignored += 1,
            }
        }
        if ignored > 0 {
            tracing::warn!("ignored {} track associations with unknown uids", ignored);
        }
        ignored
    }

    pub fn remove_all_mc_particle_relationships(&mut self) {
        for track in self.arena.values_mut() {
            track.mc_weights.clear();
        }
    }
}
