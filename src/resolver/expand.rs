//! 变量展开器
//!
//! 支持 `${NAME}` 与 `$NAME` 两种占位符。查找顺序：
//! 目标环境 → 全局环境 → 当前进程环境变量。
//! 前两者中标记了 expand 的变量会被递归展开；进程环境变量的值按字面使用。

use super::{ResolveError, VariableMap};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// 匹配 `${...}` 或 `$NAME`
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([^}]*)\}|([A-Za-z_][A-Za-z0-9_]*))").expect("占位符正则无效")
});

/// 进程外部环境变量查找
pub trait AmbientEnv {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// 当前进程的环境变量
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl AmbientEnv for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }
}

impl AmbientEnv for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

pub(crate) static PROCESS_ENV: ProcessEnv = ProcessEnv;

/// 递归展开的最大嵌套层数
pub const MAX_DEPTH: usize = 128;

/// 一次展开的结果：展开后的字符串和途中遇到的全部错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub value: String,
    pub errors: Vec<ResolveError>,
}

impl Expansion {
    /// 是否存在循环展开
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, ResolveError::CyclicExpansion { .. }))
    }

    /// 未定义的变量名 (按出现顺序)
    pub fn undefined_names(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().filter_map(|e| match e {
            ResolveError::UndefinedVariable { name } => Some(name.as_str()),
            _ => None,
        })
    }

    /// 按策略转换为结果
    ///
    /// 循环展开和嵌套过深总是报错；未定义变量只在 `error_on_undefined` 时报错。
    pub fn into_result(self, error_on_undefined: bool) -> Result<String, ExpandError> {
        let errors: Vec<ResolveError> = if error_on_undefined {
            self.errors
        } else {
            self.errors
                .into_iter()
                .filter(ResolveError::is_fatal)
                .collect()
        };

        match ResolveError::join(errors) {
            None => Ok(self.value),
            Some(error) => Err(ExpandError {
                partial: self.value,
                error,
            }),
        }
    }
}

/// 展开失败，同时保留部分替换后的字符串
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error}")]
pub struct ExpandError {
    pub partial: String,
    pub error: ResolveError,
}

/// 变量展开器
#[derive(Clone, Copy)]
pub struct Expander<'a> {
    global: &'a VariableMap<'a>,
    local: &'a VariableMap<'a>,
    ambient: &'a dyn AmbientEnv,
}

impl<'a> Expander<'a> {
    /// 使用当前进程环境作为最后的回退
    #[must_use]
    pub fn new(global: &'a VariableMap<'a>, local: &'a VariableMap<'a>) -> Self {
        Self {
            global,
            local,
            ambient: &PROCESS_ENV,
        }
    }

    #[must_use]
    pub fn with_ambient(mut self, ambient: &'a dyn AmbientEnv) -> Self {
        self.ambient = ambient;
        self
    }

    /// 展开字符串中的全部占位符，收集所有错误而不提前返回
    #[must_use]
    pub fn expand(&self, value: &str) -> Expansion {
        let mut chain = Vec::new();
        let mut errors = Vec::new();
        let value = self.expand_in(value, &mut chain, &mut errors);
        Expansion { value, errors }
    }

    fn expand_in(
        &self,
        value: &str,
        chain: &mut Vec<String>,
        errors: &mut Vec<ResolveError>,
    ) -> String {
        let mut out = String::with_capacity(value.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(value) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&value[last..whole.start()]);
            last = whole.end();

            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());

            // `${}`：语法错误，整体吞掉
            if name.is_empty() {
                continue;
            }

            out.push_str(&self.resolve(name, chain, errors));
        }

        out.push_str(&value[last..]);
        out
    }

    fn resolve(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        errors: &mut Vec<ResolveError>,
    ) -> String {
        if let Some(var) = self.local.get(name).or_else(|| self.global.get(name)) {
            if !var.expand {
                return var.value.clone();
            }

            if chain.iter().any(|n| n == name) {
                let mut cycle = chain.clone();
                cycle.push(name.to_string());
                errors.push(ResolveError::CyclicExpansion { chain: cycle });
                return String::new();
            }

            if chain.len() >= MAX_DEPTH {
                let mut deep = chain.clone();
                deep.push(name.to_string());
                errors.push(ResolveError::DepthExceeded {
                    limit: MAX_DEPTH,
                    chain: deep,
                });
                return String::new();
            }

            chain.push(name.to_string());
            let expanded = self.expand_in(&var.value, chain, errors);
            chain.pop();
            return expanded;
        }

        if let Some(value) = self.ambient.lookup(name) {
            return value;
        }

        errors.push(ResolveError::UndefinedVariable {
            name: name.to_string(),
        });
        String::new()
    }
}

/// 展开单个值
///
/// `error_on_undefined = false` 为尽力模式：未定义的引用替换为空串且不报错；
/// `true` 时返回包含所有未定义变量的聚合错误（错误中保留部分替换后的字符串）。
pub fn expand_variable(
    value: &str,
    global: &VariableMap<'_>,
    local: &VariableMap<'_>,
    error_on_undefined: bool,
) -> Result<String, ExpandError> {
    Expander::new(global, local)
        .expand(value)
        .into_result(error_on_undefined)
}
