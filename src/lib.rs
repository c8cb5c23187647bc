//! envoke - 按环境管理环境变量
//!
//! - [`core`]: SQLite 存储 (环境与变量)
//! - [`resolver`]: 合并、展开与子进程环境生成
//! - [`config`]: 配置文件与 .env 格式
//! - [`commands`]: CLI 命令实现

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod resolver;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{EnvError, Result};
pub use resolver::{ResolveError, Resolver, materialize, merge_variables};
pub use types::{EnvEntry, GLOBAL_ENVIRONMENT, Variable};
