//! 配置加载
//!
//! 配置文件为 TOML，查找顺序：
//! 1. `-c/--config` 参数
//! 2. `ENVOKE_CONFIG` 环境变量
//! 3. `$XDG_CONFIG_HOME/envoke/config.toml`
//!
//! 文件不存在时使用默认值。

pub mod format;

use crate::error::{EnvError, Result};
use crate::types::GLOBAL_ENVIRONMENT;
use crate::utils::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV_VAR: &str = "ENVOKE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite 数据库文件
    pub db_path: Option<PathBuf>,
    /// 省略 `-e` 时使用的环境
    pub default_environment: Option<String>,
}

impl Config {
    /// 加载配置；`explicit` 为命令行传入的路径
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
                Some(path) => (PathBuf::from(path), true),
                None => (paths::default_config_path()?, false),
            },
        };

        if !paths::file_exists(&path) {
            if required {
                return Err(EnvError::FileNotFound(path));
            }
            tracing::debug!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let config = Self::from_file(&path)?;
        tracing::debug!(path = %path.display(), ?config, "已加载配置");
        Ok(config)
    }

    /// 从指定文件解析配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = paths::read_file(path)?;
        let mut config: Config = toml::from_str(&content).map_err(|source| EnvError::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })?;

        // 相对路径以配置文件所在目录为基准
        if let (Some(db), Some(dir)) = (&config.db_path, path.parent()) {
            if db.is_relative() {
                config.db_path = Some(dir.join(db));
            }
        }

        if config.default_environment.as_deref() == Some("") {
            return Err(EnvError::Config("default_environment 不能为空".to_string()));
        }

        Ok(config)
    }

    /// 数据库路径：配置值或 XDG 数据目录下的默认文件
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => paths::default_db_path(),
        }
    }

    /// 命令行未指定环境时的回退
    #[must_use]
    pub fn environment_or_default(&self, requested: Option<&str>) -> String {
        requested
            .or(self.default_environment.as_deref())
            .unwrap_or(GLOBAL_ENVIRONMENT)
            .to_string()
    }
}
