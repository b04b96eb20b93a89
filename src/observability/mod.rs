//! 可观测性：tracing 订阅器
//!
//! 默认级别 info，`RUST_LOG` 可覆盖（如 `RUST_LOG=pflow=debug` 查看列表与事务细节）。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 安装全局订阅器；重复调用无副作用
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
