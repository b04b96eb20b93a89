//! 管理器集合：每种对象一个管理器，驱动事件生命周期与算法作用域
//!
//! 单个管理器只维护自身对象；跨类型的一致性（击中可用性、径迹-簇关联、
//! PFO 组成的可用性）在这里统一处理，且都遵循先校验、后修改。

pub mod calo_hit;
pub mod cluster;
pub mod mc;
pub mod pfo;
pub mod track;
pub mod vertex;

use std::collections::BTreeSet;

use crate::config::PflowConfig;
use crate::core::{AlgorithmId, ClusterId, HitId, McParticleId, PfoId, PflowError, PflowResult, TrackId, VertexId};
use crate::objects::{
    CaloHitParameters, ClusterParameters, McParticleParameters, PfoParameters, TrackParameters, VertexParameters,
};
use crate::recluster::context::TransactionContext;
use crate::truth::TargetSelectionPolicy;

pub use calo_hit::CaloHitManager;
pub use cluster::ClusterManager;
pub use mc::McManager;
pub use pfo::PfoManager;
pub use track::{TrackManager, TrackSnapshot};
pub use vertex::VertexManager;

pub struct Managers {
    config: PflowConfig,
    pub(crate) hits: CaloHitManager,
    pub(crate) tracks: TrackManager,
    pub(crate) mc: McManager,
    pub(crate) clusters: ClusterManager,
    pub(crate) pfos: PfoManager,
    pub(crate) vertices: VertexManager,
    pub(crate) contexts: Vec<TransactionContext>,
    next_algorithm: u64,
    event_open: bool,
}

impl Managers {
    pub fn new(config: PflowConfig) -> Self {
        Self {
            hits: CaloHitManager::new(&config),
            tracks: TrackManager::new(&config),
            mc: McManager::new(&config),
            clusters: ClusterManager::new(&config),
            pfos: PfoManager::new(&config),
            vertices: VertexManager::new(&config),
            contexts: Vec::new(),
            next_algorithm: 0,
            event_open: false,
            config,
        }
    }

    pub fn config(&self) -> &PflowConfig {
        &self.config
    }

    pub fn calo_hits(&self) -> &CaloHitManager {
        &self.hits
    }

    pub fn calo_hits_mut(&mut self) -> &mut CaloHitManager {
        &mut self.hits
    }

    pub fn tracks(&self) -> &TrackManager {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut TrackManager {
        &mut self.tracks
    }

    pub fn mc_particles(&self) -> &McManager {
        &self.mc
    }

    pub fn mc_particles_mut(&mut self) -> &mut McManager {
        &mut self.mc
    }

    pub fn clusters(&self) -> &ClusterManager {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut ClusterManager {
        &mut self.clusters
    }

    pub fn pfos(&self) -> &PfoManager {
        &self.pfos
    }

    pub fn pfos_mut(&mut self) -> &mut PfoManager {
        &mut self.pfos
    }

    pub fn vertices(&self) -> &VertexManager {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut VertexManager {
        &mut self.vertices
    }

    /// 打开的重聚类 / 碎片化上下文层数
    pub fn open_transactions(&self) -> usize {
        self.contexts.len()
    }

    // ---------- 事件生命周期 ----------

    /// 事件开始：为全部管理器创建初始列表
    pub fn prepare_event(&mut self) -> PflowResult<()> {
        if self.event_open {
            return Err(PflowError::not_allowed("event already prepared"));
        }
        self.hits.create_initial_lists()?;
        self.tracks.create_initial_lists()?;
        self.mc.create_initial_lists()?;
        self.clusters.create_initial_lists()?;
        self.pfos.create_initial_lists()?;
        self.vertices.create_initial_lists()?;
        self.event_open = true;
        tracing::info!("event prepared");
        Ok(())
    }

    /// 事件结束：清空全部对象、列表、检查点与事务上下文，并为下一个事件建立初始列表
    pub fn reset_for_next_event(&mut self) -> PflowResult<()> {
        self.contexts.clear();
        self.hits.reset_for_next_event()?;
        self.tracks.reset_for_next_event()?;
        self.mc.reset_for_next_event()?;
        self.clusters.reset_for_next_event()?;
        self.pfos.reset_for_next_event()?;
        self.vertices.reset_for_next_event()?;
        self.event_open = true;
        tracing::info!("managers reset for next event");
        Ok(())
    }

    // ---------- 输入对象 ----------

    pub fn create_calo_hit(&mut self, params: &CaloHitParameters) -> PflowResult<HitId> {
        self.hits.create(params)
    }

    pub fn create_track(&mut self, params: &TrackParameters) -> PflowResult<TrackId> {
        self.tracks.create(params)
    }

    pub fn create_mc_particle(&mut self, params: &McParticleParameters) -> PflowResult<McParticleId> {
        self.mc.create(params)
    }

    /// 输入对象创建完毕后解析全部关系
    pub fn finalize_input(&mut self) -> PflowResult<()> {
        self.tracks.associate_tracks()?;
        self.mc.add_mc_particle_relationships()?;
        tracing::info!(
            "input finalized: {} hits, {} tracks, {} mc particles",
            self.hits.arena().len(),
            self.tracks.arena().len(),
            self.mc.arena().len()
        );
        Ok(())
    }

    /// 选择 PFO 目标并把结果写入击中与径迹
    pub fn select_pfo_targets(&mut self, policy: &dyn TargetSelectionPolicy) -> PflowResult<()> {
        self.mc.select_pfo_targets(policy)?;
        let hit_targets = self.mc.hit_targets()?.clone();
        let track_targets = self.mc.track_targets()?.clone();
        self.hits.match_to_mc_targets(&hit_targets);
        self.tracks.match_to_mc_targets(&track_targets);
        Ok(())
    }

    pub fn remove_all_mc_particle_relationships(&mut self) {
        self.mc.remove_all_mc_particle_relationships();
        self.hits.remove_all_mc_particle_relationships();
        self.tracks.remove_all_mc_particle_relationships();
    }

    // ---------- 算法作用域 ----------

    pub fn next_algorithm_id(&mut self) -> AlgorithmId {
        let id = AlgorithmId::new(self.next_algorithm);
        self.next_algorithm += 1;
        id
    }

    /// 在所有管理器上打开检查点
    pub fn register_algorithm(&mut self, alg: AlgorithmId) -> PflowResult<()> {
        if self.clusters.lists().is_algorithm_registered(alg) {
            return Err(PflowError::not_allowed(format!("{alg} already registered")));
        }
        self.hits.lists_mut().register_algorithm(alg)?;
        self.tracks.lists_mut().register_algorithm(alg)?;
        self.mc.lists_mut().register_algorithm(alg)?;
        self.clusters.lists_mut().register_algorithm(alg)?;
        self.pfos.lists_mut().register_algorithm(alg)?;
        self.vertices.lists_mut().register_algorithm(alg)?;
        Ok(())
    }

    /// 回滚检查点；算法临时列表中因此不再被任何列表引用的算法对象一并删除
    pub fn reset_algorithm_info(&mut self, alg: AlgorithmId, finished: bool) -> PflowResult<()> {
        let pfos = self.pfos.lists().objects_in_temporary_lists(alg)?;
        let clusters = self.clusters.lists().objects_in_temporary_lists(alg)?;
        let vertices = self.vertices.lists().objects_in_temporary_lists(alg)?;

        self.hits.lists_mut().reset_algorithm_info(alg, finished)?;
        self.tracks.lists_mut().reset_algorithm_info(alg, finished)?;
        self.mc.lists_mut().reset_algorithm_info(alg, finished)?;
        self.clusters.lists_mut().reset_algorithm_info(alg, finished)?;
        self.pfos.lists_mut().reset_algorithm_info(alg, finished)?;
        self.vertices.lists_mut().reset_algorithm_info(alg, finished)?;

        let orphans = (
            pfos.into_iter()
                .filter(|id| !self.pfos.lists().contains_anywhere(*id))
                .collect::<Vec<_>>(),
            clusters
                .into_iter()
                .filter(|id| !self.clusters.lists().contains_anywhere(*id))
                .collect::<Vec<_>>(),
            vertices
                .into_iter()
                .filter(|id| !self.vertices.lists().contains_anywhere(*id))
                .collect::<Vec<_>>(),
        );
        for pfo in &orphans.0 {
            self.release_pfo(*pfo);
        }
        for cluster in &orphans.1 {
            self.release_cluster(*cluster, true);
        }
        for vertex in &orphans.2 {
            self.release_vertex(*vertex);
        }
        let deleted = orphans.0.len() + orphans.1.len() + orphans.2.len();
        if deleted > 0 {
            tracing::debug!("{} rollback deleted {} unsaved objects", alg, deleted);
        }
        Ok(())
    }

    /// 在 `alg` 的作用域内运行 `f`；无论成功与否都会关闭其遗留的事务并回滚检查点
    pub fn run_algorithm<T>(
        &mut self,
        alg: AlgorithmId,
        f: impl FnOnce(&mut Managers) -> PflowResult<T>,
    ) -> PflowResult<T> {
        self.register_algorithm(alg)?;
        tracing::debug!("running {}", alg);
        let result = f(self);
        self.close_transactions_owned_by(alg);
        let reset = self.reset_algorithm_info(alg, true);
        let value = result?;
        reset?;
        Ok(value)
    }

    // ---------- 簇 ----------

    /// 创建簇：击中必须存活且可用，创建后标记为不可用；可选的种子径迹建立关联
    pub fn create_cluster(&mut self, params: &ClusterParameters) -> PflowResult<ClusterId> {
        params.validate()?;
        let hits = params.all_hits();
        self.hits.ensure_available(&hits)?;
        if let Some(track) = params.track {
            if self.tracks.get(track)?.associated_cluster.is_some() {
                return Err(PflowError::not_allowed(format!("{track} already associated with a cluster")));
            }
        }
        let energy = self.hits_energy(&hits)?;
        let cluster = self.clusters.create(params, energy)?;
        self.hits.set_availability_all(&hits, false)?;
        if let Some(track) = params.track {
            self.add_track_cluster_association(track, cluster)?;
        }
        Ok(cluster)
    }

    pub fn add_to_cluster(&mut self, cluster: ClusterId, hit: HitId) -> PflowResult<()> {
        self.add_hit_to_cluster(cluster, hit, false)
    }

    pub fn add_isolated_to_cluster(&mut self, cluster: ClusterId, hit: HitId) -> PflowResult<()> {
        self.add_hit_to_cluster(cluster, hit, true)
    }

    pub fn remove_from_cluster(&mut self, cluster: ClusterId, hit: HitId) -> PflowResult<()> {
        self.remove_hit_from_cluster(cluster, hit, false)
    }

    pub fn remove_isolated_from_cluster(&mut self, cluster: ClusterId, hit: HitId) -> PflowResult<()> {
        self.remove_hit_from_cluster(cluster, hit, true)
    }

    fn add_hit_to_cluster(&mut self, cluster: ClusterId, hit: HitId, isolated: bool) -> PflowResult<()> {
        self.hits.ensure_available(&[hit])?;
        if self.clusters.get(cluster)?.contains_hit(hit) {
            return Err(PflowError::not_allowed(format!("{hit} already in {cluster}")));
        }
        let energy = self.hits.get(hit)?.input_energy;
        self.clusters.add_hit(cluster, hit, energy, isolated)?;
        self.hits.set_availability(hit, false)
    }

    fn remove_hit_from_cluster(&mut self, cluster: ClusterId, hit: HitId, isolated: bool) -> PflowResult<()> {
        let energy = self.hits.get(hit)?.input_energy;
        if !self.hits.is_tracked(hit) {
            return Err(PflowError::not_found(format!("{hit} is not tracked by the recluster candidate")));
        }
        self.clusters.remove_hit(cluster, hit, energy, isolated)?;
        self.hits.set_availability(hit, true)
    }

    /// 把 `delete` 并入 `enlarge` 后删除 `delete`；径迹关联转移到 `enlarge`
    pub fn merge_and_delete_clusters(&mut self, enlarge: ClusterId, delete: ClusterId) -> PflowResult<()> {
        if !self.clusters.is_available(delete)? || !self.clusters.is_available(enlarge)? {
            return Err(PflowError::not_allowed("clusters used by a pfo cannot be merged"));
        }
        self.clusters.merge(enlarge, delete)?;
        self.tracks.redirect_associations(delete, enlarge);
        tracing::debug!("merged {} into {}", delete, enlarge);
        Ok(())
    }

    /// 删除簇：释放其击中并清除径迹关联；被 PFO 使用的簇不能删除
    pub fn delete_cluster(&mut self, cluster: ClusterId) -> PflowResult<()> {
        self.ensure_deletable(cluster)?;
        self.release_cluster(cluster, true);
        Ok(())
    }

    /// 簇未被 PFO 使用，且其击中全部由当前重聚类候选跟踪
    fn ensure_deletable(&self, cluster: ClusterId) -> PflowResult<()> {
        let target = self.clusters.get(cluster)?;
        if !target.available {
            return Err(PflowError::not_allowed(format!("{cluster} is used by a pfo")));
        }
        if let Some(hit) = target.all_hits().find(|hit| !self.hits.is_tracked(*hit)) {
            return Err(PflowError::not_found(format!("{hit} is not tracked by the recluster candidate")));
        }
        Ok(())
    }

    /// 删除列表中的一组簇；任一簇不在列表中时不做任何修改
    pub fn delete_clusters(&mut self, list: &str, clusters: &[ClusterId]) -> PflowResult<()> {
        let source = self.clusters.lists().get_list(list)?;
        if let Some(missing) = clusters.iter().find(|c| !source.contains(c)) {
            return Err(PflowError::not_found(format!("{missing} not in cluster list '{list}'")));
        }
        for cluster in clusters {
            self.ensure_deletable(*cluster)?;
        }
        for cluster in clusters {
            self.release_cluster(*cluster, true);
        }
        Ok(())
    }

    /// 移除簇并清除所有反向引用；`free_hits` 时把击中标记为可用
    pub(crate) fn release_cluster(&mut self, cluster: ClusterId, free_hits: bool) {
        let Ok(removed) = self.clusters.remove(cluster) else {
            return;
        };
        self.tracks.clear_associations_to(cluster);
        if free_hits {
            for hit in removed.all_hits() {
                if self.hits.get(hit).is_ok() && self.hits.is_tracked(hit) {
                    if let Err(err) = self.hits.set_availability(hit, true) {
                        tracing::warn!("failed to free {} of {}: {}", hit, cluster, err);
                    }
                }
            }
        }
    }

    pub fn add_track_cluster_association(&mut self, track: TrackId, cluster: ClusterId) -> PflowResult<()> {
        self.clusters.get(cluster)?;
        self.tracks.set_associated_cluster(track, cluster)?;
        if let Err(err) = self.clusters.add_track(cluster, track) {
            self.tracks.remove_associated_cluster(track, cluster)?;
            return Err(err);
        }
        Ok(())
    }

    pub fn remove_track_cluster_association(&mut self, track: TrackId, cluster: ClusterId) -> PflowResult<()> {
        if !self.clusters.get(cluster)?.associated_tracks.contains(&track) {
            return Err(PflowError::not_found(format!("{track} not associated with {cluster}")));
        }
        self.tracks.remove_associated_cluster(track, cluster)?;
        self.clusters.remove_track(cluster, track)
    }

    fn hits_energy(&self, hits: &[HitId]) -> PflowResult<f32> {
        let mut energy = 0.0;
        for hit in hits {
            energy += self.hits.get(*hit)?.input_energy;
        }
        Ok(energy)
    }

    // ---------- PFO ----------

    /// 创建 PFO：组成对象必须存活且未被使用，创建后标记为已使用
    pub fn create_pfo(&mut self, params: &PfoParameters) -> PflowResult<PfoId> {
        params.validate()?;
        self.ensure_unused_constituents(&params.clusters, &params.tracks)?;
        self.vertices.arena().ensure_live(&params.vertices)?;
        let pfo = self.pfos.create(params)?;
        self.mark_constituents(&params.clusters, &params.tracks, false);
        for vertex in &params.vertices {
            self.vertices.set_availability(*vertex, false)?;
        }
        Ok(pfo)
    }

    pub fn add_cluster_to_pfo(&mut self, pfo: PfoId, cluster: ClusterId) -> PflowResult<()> {
        self.pfos.get(pfo)?;
        self.ensure_unused_constituents(&[cluster], &[])?;
        self.pfos.add_cluster(pfo, cluster)?;
        self.clusters.set_availability(cluster, false)
    }

    pub fn add_track_to_pfo(&mut self, pfo: PfoId, track: TrackId) -> PflowResult<()> {
        self.pfos.get(pfo)?;
        self.ensure_unused_constituents(&[], &[track])?;
        self.pfos.add_track(pfo, track)?;
        self.tracks.set_availability(track, false)
    }

    pub fn remove_cluster_from_pfo(&mut self, pfo: PfoId, cluster: ClusterId) -> PflowResult<()> {
        self.pfos.remove_cluster(pfo, cluster)?;
        self.clusters.set_availability(cluster, true)
    }

    pub fn remove_track_from_pfo(&mut self, pfo: PfoId, track: TrackId) -> PflowResult<()> {
        self.pfos.remove_track(pfo, track)?;
        self.tracks.set_availability(track, true)
    }

    pub fn add_vertex_to_pfo(&mut self, pfo: PfoId, vertex: VertexId) -> PflowResult<()> {
        self.vertices.get(vertex)?;
        self.pfos.add_vertex(pfo, vertex)?;
        self.vertices.set_availability(vertex, false)
    }

    pub fn remove_vertex_from_pfo(&mut self, pfo: PfoId, vertex: VertexId) -> PflowResult<()> {
        self.pfos.remove_vertex(pfo, vertex)?;
        let still_used = self.pfos.arena().iter().any(|(_, p)| p.vertices.contains(&vertex));
        self.vertices.set_availability(vertex, !still_used)
    }

    pub fn delete_pfo(&mut self, pfo: PfoId) -> PflowResult<()> {
        self.pfos.get(pfo)?;
        self.release_pfo(pfo);
        Ok(())
    }

    /// 删除列表中的一组 PFO；任一 PFO 不在列表中时不做任何修改
    pub fn delete_pfos(&mut self, list: &str, pfos: &[PfoId]) -> PflowResult<()> {
        let source = self.pfos.lists().get_list(list)?;
        if let Some(missing) = pfos.iter().find(|p| !source.contains(p)) {
            return Err(PflowError::not_found(format!("{missing} not in pfo list '{list}'")));
        }
        for pfo in pfos {
            self.release_pfo(*pfo);
        }
        Ok(())
    }

    pub(crate) fn release_pfo(&mut self, pfo: PfoId) {
        let Ok(removed) = self.pfos.remove(pfo) else {
            return;
        };
        let clusters: Vec<ClusterId> = removed.clusters.iter().copied().collect();
        let tracks: Vec<TrackId> = removed.tracks.iter().copied().collect();
        self.mark_constituents(&clusters, &tracks, true);
        for vertex in &removed.vertices {
            let still_used = self.pfos.arena().iter().any(|(_, p)| p.vertices.contains(vertex));
            if let Err(err) = self.vertices.set_availability(*vertex, !still_used) {
                tracing::warn!("failed to update {} after deleting {}: {}", vertex, pfo, err);
            }
        }
    }

    fn ensure_unused_constituents(&self, clusters: &[ClusterId], tracks: &[TrackId]) -> PflowResult<()> {
        for cluster in clusters {
            if !self.clusters.is_available(*cluster)? {
                return Err(PflowError::not_allowed(format!("{cluster} already used by a pfo")));
            }
        }
        for track in tracks {
            if !self.tracks.is_available(*track)? {
                return Err(PflowError::not_allowed(format!("{track} already used by a pfo")));
            }
        }
        let distinct: BTreeSet<&ClusterId> = clusters.iter().collect();
        if distinct.len() != clusters.len() {
            return Err(PflowError::invalid("pfo clusters must be distinct"));
        }
        Ok(())
    }

    fn mark_constituents(&mut self, clusters: &[ClusterId], tracks: &[TrackId], available: bool) {
        for cluster in clusters {
            if let Err(err) = self.clusters.set_availability(*cluster, available) {
                tracing::warn!("failed to mark {}: {}", cluster, err);
            }
        }
        for track in tracks {
            if let Err(err) = self.tracks.set_availability(*track, available) {
                tracing::warn!("failed to mark {}: {}", track, err);
            }
        }
    }

    // ---------- 顶点 ----------

    pub fn create_vertex(&mut self, params: &VertexParameters) -> PflowResult<VertexId> {
        self.vertices.create(params)
    }

    /// 删除顶点并从引用它的 PFO 中移除
    pub fn delete_vertex(&mut self, vertex: VertexId) -> PflowResult<()> {
        self.vertices.get(vertex)?;
        self.release_vertex(vertex);
        Ok(())
    }

    pub fn delete_vertices(&mut self, list: &str, vertices: &[VertexId]) -> PflowResult<()> {
        let source = self.vertices.lists().get_list(list)?;
        if let Some(missing) = vertices.iter().find(|v| !source.contains(v)) {
            return Err(PflowError::not_found(format!("{missing} not in vertex list '{list}'")));
        }
        for vertex in vertices {
            self.release_vertex(*vertex);
        }
        Ok(())
    }

    pub(crate) fn release_vertex(&mut self, vertex: VertexId) {
        if self.vertices.remove(vertex).is_ok() {
            self.pfos.detach_vertex(vertex);
        }
    }

    // ---------- 击中拆分 / 合并 ----------

    pub fn can_fragment_calo_hit(&self, hit: HitId, fraction: f32) -> bool {
        self.hits.can_fragment(hit, fraction) && self.is_free_outside_reclustering(hit)
    }

    pub fn fragment_calo_hit(&mut self, hit: HitId, fraction: f32) -> PflowResult<(HitId, HitId)> {
        if !self.is_free_outside_reclustering(hit) {
            return Err(PflowError::not_allowed(format!("{hit} belongs to a cluster")));
        }
        self.hits.fragment(hit, fraction)
    }

    pub fn can_merge_calo_hit_fragments(&self, a: HitId, b: HitId) -> bool {
        self.hits.can_merge(a, b) && self.is_free_outside_reclustering(a) && self.is_free_outside_reclustering(b)
    }

    pub fn merge_calo_hit_fragments(&mut self, a: HitId, b: HitId) -> PflowResult<HitId> {
        if !self.is_free_outside_reclustering(a) || !self.is_free_outside_reclustering(b) {
            return Err(PflowError::not_allowed(format!("{a} or {b} belongs to a cluster")));
        }
        self.hits.merge(a, b)
    }

    /// 非重聚类期间，被替换的击中会立即删除，因此不能属于任何簇
    fn is_free_outside_reclustering(&self, hit: HitId) -> bool {
        self.hits.is_reclustering() || self.clusters.clusters_containing(hit).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn managers_with_hits(n: u64) -> (Managers, Vec<HitId>) {
        let mut managers = Managers::new(PflowConfig::default());
        managers.prepare_event().unwrap();
        let hits = (0..n)
            .map(|uid| managers.create_calo_hit(&CaloHitParameters::new(uid, 1.0)).unwrap())
            .collect();
        (managers, hits)
    }

    #[test]
    fn test_prepare_event_once() {
        let (mut managers, _) = managers_with_hits(0);
        assert!(matches!(managers.prepare_event(), Err(PflowError::NotAllowed(_))));
        managers.reset_for_next_event().unwrap();
        assert_eq!(managers.calo_hits().lists().current_list_name(), "Input");
    }

    #[test]
    fn test_cluster_creation_outside_algorithm_not_allowed() {
        let (mut managers, hits) = managers_with_hits(1);
        let err = managers.create_cluster(&ClusterParameters::from_hits(hits.clone())).unwrap_err();
        assert!(matches!(err, PflowError::NotAllowed(_)));
        // 失败不修改击中可用性
        assert!(managers.calo_hits().is_available(hits[0]).unwrap());
    }

    #[test]
    fn test_run_algorithm_deletes_unsaved_clusters() {
        let (mut managers, hits) = managers_with_hits(2);
        let alg = managers.next_algorithm_id();
        let cluster = managers
            .run_algorithm(alg, |m| {
                m.clusters_mut()
                    .lists_mut()
                    .create_temporary_list_and_set_current(alg, Vec::new())?;
                m.create_cluster(&ClusterParameters::from_hits([hits[0]]))
            })
            .unwrap();
        assert!(managers.clusters().get(cluster).is_err());
        assert!(managers.calo_hits().is_available(hits[0]).unwrap());
        assert!(!managers.clusters().lists().is_algorithm_registered(alg));
    }

    #[test]
    fn test_saved_cluster_survives_and_uses_hits() {
        let (mut managers, hits) = managers_with_hits(2);
        let alg = managers.next_algorithm_id();
        let cluster = managers
            .run_algorithm(alg, |m| {
                m.clusters_mut()
                    .lists_mut()
                    .create_temporary_list_and_set_current(alg, Vec::new())?;
                let cluster = m.create_cluster(&ClusterParameters::from_hits(hits.clone()))?;
                m.clusters_mut().lists_mut().save_list("Clusters", &[cluster])?;
                Ok(cluster)
            })
            .unwrap();
        assert!((managers.clusters().get(cluster).unwrap().energy - 2.0).abs() < 1e-6);
        assert!(!managers.calo_hits().is_available(hits[1]).unwrap());
        assert!(matches!(
            managers.fragment_calo_hit(hits[0], 0.5),
            Err(PflowError::NotAllowed(_))
        ));

        managers.delete_cluster(cluster).unwrap();
        assert!(managers.calo_hits().is_available(hits[1]).unwrap());
        assert!(managers.clusters().lists().get_list("Clusters").unwrap().is_empty());
    }

    #[test]
    fn test_delete_pfos_is_atomic() {
        let (mut managers, hits) = managers_with_hits(1);
        let alg = managers.next_algorithm_id();
        managers
            .run_algorithm(alg, |m| {
                m.clusters_mut()
                    .lists_mut()
                    .create_temporary_list_and_set_current(alg, Vec::new())?;
                let cluster = m.create_cluster(&ClusterParameters::from_hits(hits.clone()))?;
                let list = m
                    .pfos_mut()
                    .lists_mut()
                    .create_temporary_list_and_set_current(alg, Vec::new())?;
                let pfo = m.create_pfo(&PfoParameters {
                    clusters: vec![cluster],
                    ..PfoParameters::default()
                })?;
                assert!(matches!(m.delete_pfos("Missing", &[pfo]), Err(PflowError::NotFound(_))));
                assert!(!m.clusters().is_available(cluster)?);
                m.delete_pfos(&list, &[pfo])?;
                assert!(m.pfos().get(pfo).is_err());
                assert!(m.clusters().is_available(cluster)?);
                Ok(())
            })
            .unwrap();
    }
}
