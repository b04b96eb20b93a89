//! 管理器配置：从 config/pflow.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PFLOW__*` 覆盖（双下划线表示嵌套，如 `PFLOW__LISTS__INPUT_LIST_NAME=Hits`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 配置根（对应 config/pflow.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PflowConfig {
    #[serde(default)]
    pub lists: ListsSection,
    #[serde(default)]
    pub fragmentation: FragmentationSection,
}

/// [lists] 段：保留列表名
#[derive(Debug, Clone, Deserialize)]
pub struct ListsSection {
    /// 永久为空的列表名
    #[serde(default = "default_null_list_name")]
    pub null_list_name: String,
    /// 每个事件的输入列表名（击中、径迹、MC 粒子）
    #[serde(default = "default_input_list_name")]
    pub input_list_name: String,
    /// 被选为 PFO 目标的 MC 粒子列表名
    #[serde(default = "default_selected_mc_list_name")]
    pub selected_mc_list_name: String,
}

fn default_null_list_name() -> String {
    "NullList".to_string()
}

fn default_input_list_name() -> String {
    "Input".to_string()
}

fn default_selected_mc_list_name() -> String {
    "Selected".to_string()
}

impl Default for ListsSection {
    fn default() -> Self {
        Self {
            null_list_name: default_null_list_name(),
            input_list_name: default_input_list_name(),
            selected_mc_list_name: default_selected_mc_list_name(),
        }
    }
}

/// [fragmentation] 段：击中拆分的数值容差
#[derive(Debug, Clone, Deserialize)]
pub struct FragmentationSection {
    /// 拆分比例须落在 (eps, 1 - eps)
    #[serde(default = "default_fraction_epsilon")]
    pub fraction_epsilon: f32,
    /// 能量守恒检查的相对容差
    #[serde(default = "default_energy_tolerance")]
    pub energy_tolerance: f32,
}

fn default_fraction_epsilon() -> f32 {
    1e-6
}

fn default_energy_tolerance() -> f32 {
    1e-4
}

impl Default for FragmentationSection {
    fn default() -> Self {
        Self {
            fraction_epsilon: default_fraction_epsilon(),
            energy_tolerance: default_energy_tolerance(),
        }
    }
}

/// 加载配置，环境变量 PFLOW__* 可覆盖
///
/// 1. 若存在 config/pflow.toml 则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PFLOW__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<PflowConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    if std::path::Path::new("config/pflow.toml").exists() {
        builder = builder.add_source(config::File::with_name("config/pflow").required(false));
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PFLOW")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
