//! 真值关联引擎：加权的击中 / 径迹 → MC 粒子映射，以及 PFO 目标的选择与传播
//!
//! 目标选择分两遍：
//! 1. 按策略给出的规则标记合格粒子，并为每个粒子确定目标：
//!    `FoldDirection::Up` 取祖先路径（含自身）上最顶端的合格粒子，
//!    `Down` 沿子粒子广度优先取最近的合格后代（含自身）；
//!    首选方向上没有合格粒子时退到另一方向上最近的合格粒子，两边都没有时粒子自身即目标。
//! 2. 把每条加权关联的键改写为其目标，落到同一目标上的权重相加。
//!
//! 具体的选择规则由调用方提供（`TargetSelectionPolicy`），这里只定义遍历约定。

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::core::{McParticleId, PflowError, PflowResult, Uid};
use crate::lists::ObjectArena;
use crate::objects::McParticle;

/// 目标 → 权重
pub type WeightMap = BTreeMap<McParticleId, f32>;

/// 折叠方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldDirection {
    /// 折叠到最顶端的合格祖先
    Up,
    /// 折叠到最近的合格后代
    Down,
}

/// 目标选择策略（由外部协作者提供）
pub trait TargetSelectionPolicy {
    fn direction(&self) -> FoldDirection;

    /// 粒子是否可作为 PFO 目标
    fn qualifies(&self, particle: &McParticle, particles: &ObjectArena<McParticleId, McParticle>) -> bool;
}

/// 用闭包实现的策略适配器
pub struct FnTargetPolicy<F> {
    direction: FoldDirection,
    predicate: F,
}

impl<F> FnTargetPolicy<F>
where
    F: Fn(&McParticle) -> bool,
{
    pub fn new(direction: FoldDirection, predicate: F) -> Self {
        Self { direction, predicate }
    }
}

impl<F> TargetSelectionPolicy for FnTargetPolicy<F>
where
    F: Fn(&McParticle) -> bool,
{
    fn direction(&self) -> FoldDirection {
        self.direction
    }

    fn qualifies(&self, particle: &McParticle, _particles: &ObjectArena<McParticleId, McParticle>) -> bool {
        (self.predicate)(particle)
    }
}

/// 第一遍：为每个粒子确定目标，返回 (粒子 → 目标, 合格粒子集合)
pub fn select_targets(
    particles: &ObjectArena<McParticleId, McParticle>,
    policy: &dyn TargetSelectionPolicy,
) -> (BTreeMap<McParticleId, McParticleId>, BTreeSet<McParticleId>) {
    let qualifying: BTreeSet<McParticleId> = particles
        .iter()
        .filter(|(_, particle)| policy.qualifies(particle, particles))
        .map(|(id, _)| id)
        .collect();

    let mut targets = BTreeMap::new();
    for (id, _) in particles.iter() {
        let upward = || {
            ancestor_path(particles, id)
                .into_iter()
                .filter(|p| qualifying.contains(p))
                .collect::<Vec<_>>()
        };
        let target = match policy.direction() {
            FoldDirection::Up => upward()
                .last()
                .copied()
                .or_else(|| nearest_descendant(particles, id, &qualifying)),
            FoldDirection::Down => nearest_descendant(particles, id, &qualifying)
                .or_else(|| upward().first().copied()),
        };
        targets.insert(id, target.unwrap_or(id));
    }
    (targets, qualifying)
}

/// 从粒子自身开始按子粒子广度优先搜索，同层按 id 升序，返回第一个合格粒子（防环）
fn nearest_descendant(
    particles: &ObjectArena<McParticleId, McParticle>,
    start: McParticleId,
    qualifying: &BTreeSet<McParticleId>,
) -> Option<McParticleId> {
    let mut queue = VecDeque::from([start]);
    let mut visited = BTreeSet::from([start]);
    while let Some(current) = queue.pop_front() {
        if qualifying.contains(&current) {
            return Some(current);
        }
        if let Ok(particle) = particles.get(current) {
            for daughter in &particle.daughters {
                if visited.insert(*daughter) {
                    queue.push_back(*daughter);
                }
            }
        }
    }
    None
}

/// 从粒子自身开始、沿最小 id 父粒子向上的路径（防环）
fn ancestor_path(particles: &ObjectArena<McParticleId, McParticle>, start: McParticleId) -> Vec<McParticleId> {
    let mut path = vec![start];
    let mut visited = BTreeSet::from([start]);
    let mut current = start;
    while let Some(parent) = particles
        .get(current)
        .ok()
        .and_then(|p| p.parents.iter().next().copied())
    {
        if !visited.insert(parent) {
            break;
        }
        path.push(parent);
        current = parent;
    }
    path
}

/// 对象 Uid → (MC Uid → 权重)
#[derive(Debug, Clone, Default)]
pub struct AssociationMap {
    relations: BTreeMap<Uid, BTreeMap<Uid, f32>>,
}

impl AssociationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一条关联；同一 (对象, MC) 对重复登记返回 NotAllowed
    pub fn associate(&mut self, object: Uid, mc: Uid, weight: f32) -> PflowResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(PflowError::invalid(format!("association weight must be non-negative, got {weight}")));
        }
        let entry = self.relations.entry(object).or_default();
        if entry.contains_key(&mc) {
            return Err(PflowError::not_allowed(format!("{object} already associated with mc {mc}")));
        }
        entry.insert(mc, weight);
        Ok(())
    }

    pub fn weights_for(&self, object: Uid) -> Option<&BTreeMap<Uid, f32>> {
        self.relations.get(&object)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn clear(&mut self) {
        self.relations.clear();
    }

    /// 第二遍：把键改写为目标并合并权重；任一 MC Uid 未知返回 NotFound
    pub fn to_targets(
        &self,
        mc_lookup: &HashMap<Uid, McParticleId>,
        targets: &BTreeMap<McParticleId, McParticleId>,
    ) -> PflowResult<BTreeMap<Uid, WeightMap>> {
        let mut result = BTreeMap::new();
        for (object, weights) in &self.relations {
            let mut by_target = WeightMap::new();
            for (mc_uid, weight) in weights {
                let mc = mc_lookup
                    .get(mc_uid)
                    .ok_or_else(|| PflowError::not_found(format!("{object} associated with unknown mc {mc_uid}")))?;
                let target = targets.get(mc).copied().unwrap_or(*mc);
                *by_target.entry(target).or_insert(0.0) += weight;
            }
            result.insert(*object, by_target);
        }
        Ok(result)
    }
}
