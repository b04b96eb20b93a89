//! pflow - 粒子流重建的对象生命周期与列表管理核心
//!
//! 模块划分：
//! - **config**: 管理器配置加载（TOML + 环境变量）
//! - **core**: 错误与状态码、标识符
//! - **lists**: 命名列表、对象 arena、按算法的列表检查点
//! - **objects**: 击中、径迹、MC 粒子、簇、PFO、顶点
//! - **relations**: 按客户端 Uid 登记、每事件解析一次的关系
//! - **truth**: PFO 目标选择与真值权重
//! - **fragment**: 击中拆分 / 合并的能量守恒与谱系
//! - **recluster**: 重聚类与碎片化事务
//! - **managers**: 各对象管理器与统一入口 [`Managers`]
//! - **input**: JSON 输入事件
//! - **observability**: tracing 初始化

pub mod config;
pub mod core;
pub mod fragment;
pub mod input;
pub mod lists;
pub mod managers;
pub mod objects;
pub mod observability;
pub mod recluster;
pub mod relations;
pub mod truth;

pub use crate::config::{load_config, PflowConfig};
pub use crate::core::{PflowError, PflowResult, StatusCode};
pub use crate::input::InputEvent;
pub use crate::managers::Managers;

/// 常用类型一次导入
pub mod prelude {
    pub use crate::config::PflowConfig;
    pub use crate::core::{
        AlgorithmId, ClusterId, HitId, McParticleId, PfoId, PflowError, PflowResult, TrackId, Uid, VertexId,
    };
    pub use crate::input::InputEvent;
    pub use crate::managers::Managers;
    pub use crate::objects::{
        CaloHitParameters, ClusterParameters, McParticleParameters, PfoParameters, TrackParameters,
        VertexParameters,
    };
    pub use crate::truth::{FoldDirection, FnTargetPolicy, TargetSelectionPolicy};
}
