//! 核心数据结构定义 (表达原则：用数据结构表达逻辑)

use serde::{Deserialize, Serialize};
use std::fmt;

/// 全局环境名称 (保留，始终存在)
pub const GLOBAL_ENVIRONMENT: &str = "global";

/// 环境：一组命名变量的集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl Environment {
    /// 是否为全局环境
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.name == GLOBAL_ENVIRONMENT
    }
}

/// 环境列表条目 (附带变量数量)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSummary {
    pub name: String,
    pub description: Option<String>,
    pub variables_count: usize,
}

/// 环境变量条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    /// 值中的 `${VAR}` 是否需要展开
    #[serde(default)]
    pub expand: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Variable {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expand: false,
            comment: None,
        }
    }

    /// 标记为需要展开
    #[must_use]
    pub fn expanded(mut self) -> Self {
        self.expand = true;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// 变量更新内容
///
/// `value` 为 `None` 时保留原值；`comment` 与 `expand` 总是被替换。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariablePatch {
    pub value: Option<String>,
    pub comment: Option<String>,
    pub expand: bool,
}

/// 最终注入子进程 (或导出) 的一条 `name=value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

impl EnvEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for EnvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// `NAME=value` 行
    #[default]
    Env,
    /// JSON 数组
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_entry_display() {
        let entry = EnvEntry::new("DATABASE_URL", "postgres://l");
        assert_eq!(entry.to_string(), "DATABASE_URL=postgres://l");
    }

    #[test]
    fn test_variable_builders() {
        let var = Variable::new("API_URL", "${BASE}/v1")
            .expanded()
            .with_comment("接口地址");
        assert!(var.expand);
        assert_eq!(var.comment.as_deref(), Some("接口地址"));
    }
}
