//! 重聚类 / 碎片化事务协议
//!
//! 每层事务都是栈上的一条记录，按后进先出结束：
//! - 碎片化：输入簇移入临时 "original" 列表、其击中暂时可用，算法在 "fragments" 列表中
//!   提出替代方案，结束时保留其一、删除另一个；
//! - 重聚类：输入簇移入 "original" 列表并记录径迹关联，每次聚类运行产生一个候选，
//!   击中的可用性与拆分 / 合并在候选之间相互隔离，结束时恰好提交一个候选。

pub mod context;
pub mod metadata;

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{AlgorithmId, ClusterId, HitId, PflowError, PflowResult, TrackId};
use crate::managers::{Managers, TrackSnapshot};

pub use context::{FragmentationContext, ReclusterContext, TransactionContext};
pub use metadata::{HitMetadata, HitReplacement, ReclusterMetadata};

impl Managers {
    // ---------- 碎片化 ----------

    /// 打开碎片化上下文，返回 (original, fragments) 两个临时簇列表名
    pub fn initialize_fragmentation(
        &mut self,
        alg: AlgorithmId,
        clusters: &[ClusterId],
    ) -> PflowResult<(String, String)> {
        if let Some(cluster) = clusters.iter().find(|c| self.in_open_fragmentation(**c)) {
            return Err(PflowError::not_allowed(format!(
                "{cluster} already belongs to an open fragmentation"
            )));
        }
        let cluster_list = self.checked_cluster_source(alg, clusters)?;
        let hits = self.hits_of(clusters)?;
        let mut hit_availability = BTreeMap::new();
        for hit in &hits {
            hit_availability.insert(*hit, self.hits.is_available(*hit)?);
        }

        let original = self
            .clusters
            .lists_mut()
            .move_objects_to_temporary_list_and_set_current(alg, &cluster_list, clusters)?;
        self.hits.set_availability_all(&hits, true)?;
        let fragments = self
            .clusters
            .lists_mut()
            .create_temporary_list_and_set_current(alg, Vec::new())?;

        self.contexts.push(TransactionContext::Fragmentation(FragmentationContext {
            alg,
            original: original.clone(),
            fragments: fragments.clone(),
            cluster_list,
            clusters: clusters.iter().copied().collect(),
            hit_availability,
        }));
        tracing::info!("{} opened fragmentation of {} clusters", alg, clusters.len());
        Ok((original, fragments))
    }

    /// 结束最内层碎片化：保留 `keep` 列表中的簇，删除 `discard` 列表中的簇
    pub fn end_fragmentation(&mut self, alg: AlgorithmId, keep: &str, discard: &str) -> PflowResult<()> {
        let ctx = match self.contexts.last() {
            Some(TransactionContext::Fragmentation(ctx)) => ctx,
            _ => return Err(PflowError::not_allowed("no fragmentation in progress")),
        };
        if ctx.alg != alg {
            return Err(PflowError::not_allowed(format!("fragmentation is owned by {}, not {alg}", ctx.alg)));
        }
        for name in [keep, discard] {
            if name != ctx.original && name != ctx.fragments {
                return Err(PflowError::not_found(format!("'{name}' is not part of the fragmentation")));
            }
        }
        if keep == discard {
            return Err(PflowError::not_allowed("keep and discard lists must differ"));
        }
        let kept = self.clusters.lists().get_list(keep)?.to_vec();
        let discarded = self.clusters.lists().get_list(discard)?.to_vec();
        self.clusters.lists().get_list(&ctx.cluster_list)?;

        let Some(TransactionContext::Fragmentation(ctx)) = self.contexts.pop() else {
            return Err(PflowError::not_allowed("no fragmentation in progress"));
        };
        for cluster in &discarded {
            self.release_cluster(*cluster, true);
        }
        if keep == ctx.original {
            for (hit, available) in &ctx.hit_availability {
                if self.hits.get(*hit).is_ok() && self.hits.is_tracked(*hit) {
                    self.hits.set_availability(*hit, *available)?;
                }
            }
        } else {
            let hits = self.hits_of(&kept)?;
            self.hits.set_availability_all(&hits, false)?;
        }
        self.clusters
            .lists_mut()
            .transfer_objects(keep, &ctx.cluster_list, &kept)?;
        self.clusters
            .lists_mut()
            .temporarily_replace_current_list(&ctx.cluster_list)?;
        tracing::info!(
            "{} ended fragmentation: kept {} clusters, deleted {}",
            alg,
            kept.len(),
            discarded.len()
        );
        Ok(())
    }

    // ---------- 重聚类 ----------

    /// 打开重聚类上下文，返回保存输入簇的临时列表名
    pub fn initialize_reclustering(
        &mut self,
        alg: AlgorithmId,
        tracks: &[TrackId],
        clusters: &[ClusterId],
    ) -> PflowResult<String> {
        self.tracks.arena().ensure_live(tracks)?;
        let cluster_list = self.checked_cluster_source(alg, clusters)?;
        if !self.tracks.lists().is_algorithm_registered(alg) {
            return Err(PflowError::not_found(format!("{alg} not registered with Track manager")));
        }
        let hits = self.hits_of(clusters)?;
        let hit_list = self.hits.lists().current_list_name().to_string();
        let track_list = self.tracks.lists().current_list_name().to_string();

        let original = self
            .clusters
            .lists_mut()
            .move_objects_to_temporary_list_and_set_current(alg, &cluster_list, clusters)?;
        self.hits.initialize_reclustering(alg, hits, &original)?;
        self.tracks
            .lists_mut()
            .create_temporary_list_and_set_current(alg, tracks.iter().copied())?;
        let snapshot = self.detach_tracks(tracks)?;

        self.contexts.push(TransactionContext::Recluster(ReclusterContext {
            alg,
            original: original.clone(),
            candidates: Vec::new(),
            cluster_list,
            hit_list,
            track_list,
            clusters: clusters.iter().copied().collect(),
            tracks: snapshot,
        }));
        tracing::info!(
            "{} opened reclustering of {} clusters and {} tracks (depth {})",
            alg,
            clusters.len(),
            tracks.len(),
            self.contexts.len()
        );
        Ok(original)
    }

    /// 为父算法创建临时簇列表，在子算法作用域内运行 `f`，返回该列表名；
    /// 重聚类期间该列表同时登记为一个候选
    pub fn run_clustering_algorithm(
        &mut self,
        parent: AlgorithmId,
        daughter: AlgorithmId,
        f: impl FnOnce(&mut Managers) -> PflowResult<()>,
    ) -> PflowResult<String> {
        let list = self
            .clusters
            .lists_mut()
            .create_temporary_list_and_set_current(parent, Vec::new())?;
        if matches!(self.contexts.last(), Some(TransactionContext::Recluster(_))) {
            self.hits.prepare_for_clustering(parent, &list)?;
            if let Some(TransactionContext::Recluster(ctx)) = self.contexts.last_mut() {
                ctx.candidates.push(list.clone());
            }
        }
        self.run_algorithm(daughter, f)?;
        Ok(list)
    }

    /// 结束最内层重聚类并提交 `selected`（原始列表或某个候选）
    pub fn end_reclustering(&mut self, alg: AlgorithmId, selected: &str) -> PflowResult<()> {
        let ctx = match self.contexts.last() {
            Some(TransactionContext::Recluster(ctx)) => ctx,
            _ => return Err(PflowError::not_allowed("no reclustering in progress")),
        };
        if ctx.alg != alg {
            return Err(PflowError::not_allowed(format!("reclustering is owned by {}, not {alg}", ctx.alg)));
        }
        if !ctx.is_candidate(selected) || !self.hits.has_recluster_candidate(selected) {
            return Err(PflowError::not_found(format!("recluster candidate '{selected}'")));
        }
        let chosen = self.clusters.lists().get_list(selected)?.to_vec();
        self.clusters.lists().get_list(&ctx.cluster_list)?;
        self.hits.lists().get_list(&ctx.hit_list)?;
        self.tracks.lists().get_list(&ctx.track_list)?;

        let Some(TransactionContext::Recluster(ctx)) = self.contexts.pop() else {
            return Err(PflowError::not_allowed("no reclustering in progress"));
        };
        let mut deleted = 0usize;
        for name in ctx.discarded(selected) {
            let doomed = self
                .clusters
                .lists()
                .get_list(name)
                .map(|list| list.to_vec())
                .unwrap_or_default();
            deleted += doomed.len();
            for cluster in doomed {
                self.release_cluster(cluster, false);
            }
        }

        self.hits.end_reclustering(selected, &ctx.hit_list)?;
        if selected == ctx.original {
            self.reattach_tracks(&ctx.tracks);
        }
        self.tracks
            .lists_mut()
            .temporarily_replace_current_list(&ctx.track_list)?;
        self.clusters
            .lists_mut()
            .transfer_objects(selected, &ctx.cluster_list, &chosen)?;
        self.clusters
            .lists_mut()
            .temporarily_replace_current_list(&ctx.cluster_list)?;
        tracing::info!(
            "{} ended reclustering: selected '{}' ({} clusters), deleted {} clusters",
            alg,
            selected,
            chosen.len(),
            deleted
        );
        Ok(())
    }

    /// 算法作用域结束时仍未关闭的事务一律回滚（选择原始列表）
    pub(crate) fn close_transactions_owned_by(&mut self, alg: AlgorithmId) {
        while let Some(top) = self.contexts.last() {
            if top.alg() != alg {
                break;
            }
            let result = match top {
                TransactionContext::Recluster(ctx) => {
                    let original = ctx.original.clone();
                    self.end_reclustering(alg, &original)
                }
                TransactionContext::Fragmentation(ctx) => {
                    let (original, fragments) = (ctx.original.clone(), ctx.fragments.clone());
                    self.end_fragmentation(alg, &original, &fragments)
                }
            };
            match result {
                Ok(()) => tracing::warn!("{} left a transaction open, rolled back", alg),
                Err(err) => {
                    tracing::warn!("{} failed to roll back open transaction: {}, aborting", alg, err);
                    match self.contexts.pop() {
                        Some(TransactionContext::Recluster(ctx)) => self.abort_reclustering(ctx),
                        Some(TransactionContext::Fragmentation(ctx)) => self.abort_fragmentation(ctx),
                        None => break,
                    }
                }
            }
        }
    }

    /// 不依赖临时列表名的回滚：删除候选簇与试探性击中，把输入簇归还到初始化时的列表
    fn abort_reclustering(&mut self, ctx: ReclusterContext) {
        for name in &ctx.candidates {
            let doomed = self
                .clusters
                .lists()
                .get_list(name)
                .map(|list| list.to_vec())
                .unwrap_or_default();
            for cluster in doomed {
                if !ctx.clusters.contains(&cluster) {
                    self.release_cluster(cluster, false);
                }
            }
        }
        self.hits.abort_reclustering(&ctx.hit_list);
        self.reattach_tracks(&ctx.tracks);
        if let Err(err) = self.tracks.lists_mut().temporarily_replace_current_list(&ctx.track_list) {
            tracing::warn!("{}: Track list not restored: {}", ctx.alg, err);
        }
        self.reclaim_clusters(ctx.alg, &ctx.cluster_list, &ctx.clusters);
    }

    fn abort_fragmentation(&mut self, ctx: FragmentationContext) {
        let doomed = self
            .clusters
            .lists()
            .get_list(&ctx.fragments)
            .map(|list| list.to_vec())
            .unwrap_or_default();
        for cluster in doomed {
            if !ctx.clusters.contains(&cluster) {
                self.release_cluster(cluster, true);
            }
        }
        for (hit, available) in &ctx.hit_availability {
            if self.hits.get(*hit).is_ok() && self.hits.is_tracked(*hit) {
                if let Err(err) = self.hits.set_availability(*hit, *available) {
                    tracing::warn!("{}: {} availability not restored: {}", ctx.alg, hit, err);
                }
            }
        }
        self.reclaim_clusters(ctx.alg, &ctx.cluster_list, &ctx.clusters);
    }

    fn reclaim_clusters(&mut self, alg: AlgorithmId, cluster_list: &str, clusters: &BTreeSet<ClusterId>) {
        let live: Vec<ClusterId> = clusters
            .iter()
            .copied()
            .filter(|cluster| self.clusters.get(*cluster).is_ok())
            .collect();
        let lists = self.clusters.lists_mut();
        if let Err(err) = lists
            .reclaim_objects(cluster_list, &live)
            .and_then(|()| lists.temporarily_replace_current_list(cluster_list))
        {
            tracing::warn!("{}: input clusters not returned to '{}': {}", alg, cluster_list, err);
        }
    }

    // ---------- 内部 ----------

    fn in_open_fragmentation(&self, cluster: ClusterId) -> bool {
        self.contexts.iter().any(|ctx| match ctx {
            TransactionContext::Fragmentation(ctx) => ctx.clusters.contains(&cluster),
            TransactionContext::Recluster(_) => false,
        })
    }

    /// 校验算法已注册、簇存活且都在当前簇列表中，返回当前簇列表名
    fn checked_cluster_source(&self, alg: AlgorithmId, clusters: &[ClusterId]) -> PflowResult<String> {
        for (kind, registered) in [
            ("Cluster", self.clusters.lists().is_algorithm_registered(alg)),
            ("CaloHit", self.hits.lists().is_algorithm_registered(alg)),
        ] {
            if !registered {
                return Err(PflowError::not_found(format!("{alg} not registered with {kind} manager")));
            }
        }
        self.clusters.arena().ensure_live(clusters)?;
        let (current, name) = self.clusters.lists().current_list()?;
        if name == self.clusters.lists().null_list_name() {
            return Err(PflowError::not_allowed("current cluster list is the null list"));
        }
        if let Some(missing) = clusters.iter().find(|c| !current.contains(c)) {
            return Err(PflowError::not_found(format!("{missing} not in current cluster list '{name}'")));
        }
        Ok(name.to_string())
    }

    /// 簇的全部击中（含孤立击中）；重聚类期间须都在当前候选视图中
    fn hits_of(&self, clusters: &[ClusterId]) -> PflowResult<Vec<HitId>> {
        let mut hits = BTreeSet::new();
        for cluster in clusters {
            hits.extend(self.clusters.get(*cluster)?.all_hits());
        }
        if let Some(hit) = hits.iter().find(|hit| !self.hits.is_tracked(**hit)) {
            return Err(PflowError::not_found(format!("{hit} is not tracked by the recluster candidate")));
        }
        Ok(hits.into_iter().collect())
    }

    /// 记录并清除径迹-簇关联（两侧）
    fn detach_tracks(&mut self, tracks: &[TrackId]) -> PflowResult<TrackSnapshot> {
        let snapshot = self.tracks.snapshot_and_clear_associations(tracks)?;
        for (track, (cluster, _)) in &snapshot {
            if let Some(cluster) = cluster {
                if let Err(err) = self.clusters.remove_track(*cluster, *track) {
                    tracing::warn!("{} not detached from {}: {}", track, cluster, err);
                }
            }
        }
        Ok(snapshot)
    }

    fn reattach_tracks(&mut self, snapshot: &TrackSnapshot) {
        self.tracks.restore(snapshot);
        for (track, (cluster, _)) in snapshot {
            if let Some(cluster) = cluster {
                let result = if self.clusters.get(*cluster).is_ok() {
                    self.clusters.add_track(*cluster, *track)
                } else {
                    self.tracks.remove_associated_cluster(*track, *cluster)
                };
                if let Err(err) = result {
                    tracing::warn!("{} not reattached to {}: {}", track, cluster, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PflowConfig;
    use crate::objects::{CaloHitParameters, ClusterParameters};

    /// 一个已保存到 "Clusters" 的簇（含两个击中），并把 "Clusters" 设为当前列表
    fn saved_cluster(m: &mut Managers, alg: AlgorithmId, hits: &[HitId]) -> PflowResult<ClusterId> {
        m.clusters_mut()
            .lists_mut()
            .create_temporary_list_and_set_current(alg, Vec::new())?;
        let cluster = m.create_cluster(&ClusterParameters::from_hits(hits.to_vec()))?;
        m.clusters_mut().lists_mut().save_list("Clusters", &[cluster])?;
        m.clusters_mut().lists_mut().temporarily_replace_current_list("Clusters")?;
        Ok(cluster)
    }

    fn setup() -> (Managers, Vec<HitId>) {
        let mut managers = Managers::new(PflowConfig::default());
        managers.prepare_event().unwrap();
        let hits = (0..2u64)
            .map(|uid| managers.create_calo_hit(&CaloHitParameters::new(uid, 1.0)).unwrap())
            .collect();
        (managers, hits)
    }

    #[test]
    fn test_fragmentation_keeps_fragments() {
        let (mut managers, hits) = setup();
        let alg = managers.next_algorithm_id();
        let (original, a, b) = managers
            .run_algorithm(alg, |m| {
                let cluster = saved_cluster(m, alg, &hits)?;
                let (original, fragments) = m.initialize_fragmentation(alg, &[cluster])?;
                assert!(m.calo_hits().is_available(hits[0])?);
                assert!(matches!(
                    m.initialize_fragmentation(alg, &[cluster]),
                    Err(PflowError::NotAllowed(_))
                ));
                let a = m.create_cluster(&ClusterParameters::from_hits([hits[0]]))?;
                let b = m.create_cluster(&ClusterParameters::from_hits([hits[1]]))?;
                assert!(matches!(
                    m.end_fragmentation(alg, &fragments, &fragments),
                    Err(PflowError::NotAllowed(_))
                ));
                assert!(matches!(
                    m.end_fragmentation(alg, "nope", &original),
                    Err(PflowError::NotFound(_))
                ));
                m.end_fragmentation(alg, &fragments, &original)?;
                Ok((cluster, a, b))
            })
            .unwrap();

        assert!(managers.clusters().get(original).is_err());
        let saved = managers.clusters().lists().get_list("Clusters").unwrap();
        assert!(saved.contains(&a) && saved.contains(&b));
        assert_eq!(saved.len(), 2);
        assert!(!managers.calo_hits().is_available(hits[0]).unwrap());
        assert!(!managers.calo_hits().is_available(hits[1]).unwrap());
        assert_eq!(managers.open_transactions(), 0);
    }

    #[test]
    fn test_open_fragmentation_rolled_back_at_algorithm_end() {
        let (mut managers, hits) = setup();
        let alg = managers.next_algorithm_id();
        let (original, fragment) = managers
            .run_algorithm(alg, |m| {
                let cluster = saved_cluster(m, alg, &hits)?;
                m.initialize_fragmentation(alg, &[cluster])?;
                let fragment = m.create_cluster(&ClusterParameters::from_hits([hits[0]]))?;
                Ok((cluster, fragment))
            })
            .unwrap();

        assert_eq!(managers.open_transactions(), 0);
        assert!(managers.clusters().get(fragment).is_err());
        assert!(managers.clusters().lists().get_list("Clusters").unwrap().contains(&original));
        assert!(!managers.calo_hits().is_available(hits[0]).unwrap());
    }

    #[test]
    fn test_end_reclustering_requires_open_context() {
        let (mut managers, _) = setup();
        let alg = managers.next_algorithm_id();
        let err = managers
            .run_algorithm(alg, |m| m.end_reclustering(alg, "anything"))
            .unwrap_err();
        assert!(matches!(err, PflowError::NotAllowed(_)));
    }
}
