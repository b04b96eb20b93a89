//! 核心类型：错误与状态码、对象 / 客户端 / 算法标识符

pub mod error;
pub mod ids;

pub use error::{PflowError, PflowResult, StatusCode};
pub use ids::{AlgorithmId, ClusterId, HitId, McParticleId, ObjectKey, PfoId, TrackId, Uid, VertexId};
