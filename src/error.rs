//! 错误处理模块 (修复原则：明确抛出异常)

use crate::resolver::ResolveError;
use std::error::Error;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("文件IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("解析错误: {0}")]
    Parse(String),

    #[error("环境 '{0}' 不存在")]
    EnvironmentNotFound(String),

    #[error("环境 '{0}' 已存在")]
    EnvironmentExists(String),

    #[error("变量 '{0}' 不存在")]
    VariableNotFound(String),

    #[error("变量 '{name}' 已存在于环境 '{environment}' (使用 --update 修改)")]
    VariableExists { name: String, environment: String },

    #[error("环境 'global' 受保护: {0}")]
    ProtectedEnvironment(String),

    #[error("无效参数: {0}")]
    InvalidArgument(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("配置文件格式错误 {path}: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("配置目录不存在: {0}")]
    ConfigDirMissing(String),

    #[error("文件不存在: {0}")]
    FileNotFound(PathBuf),

    #[error("JSON序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("变量展开失败: {0}")]
    Resolve(#[from] ResolveError),

    #[error("命令未找到: {0}")]
    CommandNotFound(String),

    #[error("命令执行失败: {0}")]
    CommandExecutionFailed(String),

    #[error("操作已取消: {0}")]
    Cancelled(String),
}

/// 详细的错误报告函数 (透明原则)
impl EnvError {
    /// 报告错误，支持详细/安静模式
    /// verbose = true: 详细错误链
    /// verbose = false: 关键信息，安静模式
    pub fn report(&self, verbose: bool) {
        if verbose {
            eprintln!("❌ 错误: {}", self);

            if let Some(source) = self.source() {
                eprintln!("  └─ 原因: {}", source);
                let mut current = source.source();
                while let Some(next) = current {
                    eprintln!("     └─ {}", next);
                    current = next.source();
                }
            }
        } else {
            match self {
                EnvError::Cancelled(msg) => eprintln!("{}", msg),
                EnvError::FileNotFound(path) => eprintln!("文件不存在: {}", path.display()),
                EnvError::Resolve(err) => eprintln!("错误: {}", err),
                _ => eprintln!("错误: {}", self),
            }
        }
    }

    /// 进程退出码：取消操作视为正常结束
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            EnvError::Cancelled(_) => 0,
            _ => 1,
        }
    }
}

/// 简化 Result 类型别名
pub type Result<T> = std::result::Result<T, EnvError>;
