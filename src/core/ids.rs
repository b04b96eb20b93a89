//! 标识符：对象在各自 arena 中的稳定 id、客户端 Uid、算法 id
//!
//! 对象之间只通过 id 互相引用，id 在一次运行内单调递增、不复用，
//! 因此按 id 排序即为创建顺序，列表遍历顺序可复现。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 列表中存放的对象 id 需要满足的约束
pub trait ObjectKey: Copy + Ord + Eq + std::hash::Hash + fmt::Debug + fmt::Display {
    fn from_raw(raw: u64) -> Self;
    fn raw(self) -> u64;
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u64);

        impl ObjectKey for $name {
            fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

object_id!(
    /// 量能器击中
    HitId,
    "hit"
);
object_id!(
    /// 径迹
    TrackId,
    "track"
);
object_id!(
    /// 真值（MC）粒子
    McParticleId,
    "mc"
);
object_id!(
    /// 簇
    ClusterId,
    "cluster"
);
object_id!(
    /// 粒子流对象
    PfoId,
    "pfo"
);
object_id!(
    /// 顶点
    VertexId,
    "vertex"
);

/// 客户端提供的外部标识符（对象构造之前即可用于登记关系）
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u64);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid:{}", self.0)
    }
}

impl From<u64> for Uid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// 正在运行的算法实例
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AlgorithmId(u64);

impl AlgorithmId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alg{}", self.0)
    }
}
