//! 变量解析引擎
//!
//! - [`merge`]: 全局变量与目标环境变量的优先级合并
//! - [`expand`]: `${VAR}` 递归展开
//! - [`Resolver`]: 组合两者，生成最终注入子进程或导出的 `name=value` 列表
//!
//! 优先级（从低到高）：
//! 1. 系统环境变量
//! 2. 全局环境变量
//! 3. 目标环境变量

pub mod expand;
pub mod merge;

pub use expand::{
    AmbientEnv, ExpandError, Expander, Expansion, MAX_DEPTH, ProcessEnv, expand_variable,
};
pub use merge::{MergedVariables, merge_variables};

use crate::types::{EnvEntry, Variable};
use std::collections::HashMap;
use thiserror::Error;

/// 解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("未定义的变量 '{name}'")]
    UndefinedVariable { name: String },

    #[error("检测到循环展开: {}", .chain.join(" -> "))]
    CyclicExpansion { chain: Vec<String> },

    #[error("展开嵌套超过 {limit} 层: {}", summarize_chain(.chain))]
    DepthExceeded { limit: usize, chain: Vec<String> },

    #[error("{}", join_messages(.0))]
    Multiple(Vec<ResolveError>),
}

impl ResolveError {
    /// 合并多个错误：单个时原样返回，多个时聚合
    #[must_use]
    pub fn join(mut errors: Vec<ResolveError>) -> Option<ResolveError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ResolveError::Multiple(errors)),
        }
    }

    /// 无论严格与否都会中断展开的错误 (循环或嵌套过深)
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ResolveError::CyclicExpansion { .. } | ResolveError::DepthExceeded { .. }
        )
    }
}

/// 长链只显示首尾
fn summarize_chain(chain: &[String]) -> String {
    match chain {
        [first, .., last] if chain.len() > 4 => format!("{first} -> ... -> {last}"),
        _ => chain.join(" -> "),
    }
}

fn join_messages(errors: &[ResolveError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// 变量名 → 变量 的查找表
///
/// 仅用于展开时查找，不影响合并顺序。重复名称时后出现者覆盖先出现者。
#[derive(Debug, Clone, Default)]
pub struct VariableMap<'a> {
    inner: HashMap<&'a str, &'a Variable>,
}

impl<'a> VariableMap<'a> {
    pub fn from_variables<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = &'a Variable>,
    {
        vars.into_iter().collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Variable> {
        self.inner.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<'a> FromIterator<&'a Variable> for VariableMap<'a> {
    fn from_iter<T: IntoIterator<Item = &'a Variable>>(iter: T) -> Self {
        let mut inner = HashMap::new();
        for var in iter {
            inner.insert(var.name.as_str(), var);
        }
        Self { inner }
    }
}

/// 变量解析器：持有两组变量及其查找表
pub struct Resolver<'a> {
    global: &'a [Variable],
    local: &'a [Variable],
    global_map: VariableMap<'a>,
    local_map: VariableMap<'a>,
    ambient: &'a dyn AmbientEnv,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(global: &'a [Variable], local: &'a [Variable]) -> Self {
        Self {
            global,
            local,
            global_map: VariableMap::from_variables(global),
            local_map: VariableMap::from_variables(local),
            ambient: &expand::PROCESS_ENV,
        }
    }

    /// 替换进程环境查找 (测试或隔离场景)
    #[must_use]
    pub fn with_ambient(mut self, ambient: &'a dyn AmbientEnv) -> Self {
        self.ambient = ambient;
        self
    }

    #[must_use]
    pub fn expander(&self) -> Expander<'_> {
        Expander::new(&self.global_map, &self.local_map).with_ambient(self.ambient)
    }

    /// 合并后的变量序列
    ///
    /// `include_global = false` 时只输出目标环境变量，但展开时仍可引用全局变量。
    #[must_use]
    pub fn merged(&self, include_global: bool) -> MergedVariables<'a> {
        let global: &'a [Variable] = if include_global { self.global } else { &[] };
        merge_variables(global, self.local)
    }

    /// 计算单个变量的最终值
    ///
    /// 尽力模式下未定义引用被替换为空串并记录警告；严格模式下返回错误。
    /// 循环展开在两种模式下都返回错误。
    pub fn value_of(
        &self,
        var: &Variable,
        error_on_undefined: bool,
    ) -> Result<String, ResolveError> {
        if !var.expand {
            return Ok(var.value.clone());
        }

        let expansion = self.expander().expand(&var.value);
        if !error_on_undefined {
            for name in expansion.undefined_names() {
                tracing::warn!(variable = %var.name, reference = %name, "引用了未定义的变量，已替换为空");
            }
        }

        expansion
            .into_result(error_on_undefined)
            .map_err(|e| e.error)
    }

    /// 生成合并并展开后的 `name=value` 列表
    pub fn entries(
        &self,
        include_global: bool,
        error_on_undefined: bool,
    ) -> Result<Vec<EnvEntry>, ResolveError> {
        self.merged(include_global)
            .map(|var| {
                let value = self.value_of(var, error_on_undefined)?;
                Ok(EnvEntry::new(var.name.clone(), value))
            })
            .collect()
    }
}

/// 生成子进程的完整环境
///
/// 结果 = 基础环境 + 合并展开后的变量；同名时靠后的条目生效。
/// 展开采用尽力模式，未定义的引用不会中断执行。
pub fn materialize<I>(
    global: &[Variable],
    local: &[Variable],
    base: I,
) -> Result<Vec<EnvEntry>, ResolveError>
where
    I: IntoIterator<Item = (String, String)>,
{
    materialize_with(Resolver::new(global, local), base)
}

/// 同 [`materialize`]，使用指定的解析器
pub fn materialize_with<I>(resolver: Resolver<'_>, base: I) -> Result<Vec<EnvEntry>, ResolveError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut environ: Vec<EnvEntry> = base
        .into_iter()
        .map(|(name, value)| EnvEntry { name, value })
        .collect();
    let base_len = environ.len();

    environ.extend(resolver.entries(true, false)?);

    tracing::debug!(
        base = base_len,
        injected = environ.len() - base_len,
        "已生成子进程环境"
    );

    Ok(environ)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_ambient() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_variable_map_last_write_wins() {
        let vars = vec![
            Variable::new("A", "first"),
            Variable::new("B", "b"),
            Variable::new("A", "second"),
        ];

        let map = VariableMap::from_variables(&vars);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("A").map(|v| v.value.as_str()), Some("second"));
        assert!(map.get("a").is_none());
    }

    #[test]
    fn test_depth_exceeded_message_is_short() {
        let chain: Vec<String> = (0..=MAX_DEPTH).map(|i| format!("V{i}")).collect();
        let err = ResolveError::DepthExceeded {
            limit: MAX_DEPTH,
            chain,
        };

        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            format!("展开嵌套超过 {MAX_DEPTH} 层: V0 -> ... -> V{MAX_DEPTH}")
        );
        assert!(
            !ResolveError::UndefinedVariable {
                name: "X".to_string()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_join_errors() {
        assert_eq!(ResolveError::join(vec![]), None);

        let single = ResolveError::UndefinedVariable {
            name: "X".to_string(),
        };
        assert_eq!(ResolveError::join(vec![single.clone()]), Some(single.clone()));

        let joined = ResolveError::join(vec![
            single,
            ResolveError::UndefinedVariable {
                name: "Y".to_string(),
            },
        ])
        .unwrap();
        assert_eq!(joined.to_string(), "未定义的变量 'X'\n未定义的变量 'Y'");
    }

    #[test]
    fn test_materialize_appends_after_base() {
        let global = vec![Variable::new("DATABASE_URL", "postgres://g")];
        let local = vec![
            Variable::new("DATABASE_URL", "postgres://l"),
            Variable::new("API_KEY", "k1"),
        ];
        let env = no_ambient();
        let base = vec![
            ("HOME".to_string(), "/home/dev".to_string()),
            ("API_KEY".to_string(), "from-shell".to_string()),
        ];

        let resolver = Resolver::new(&global, &local).with_ambient(&env);
        let environ: Vec<String> = materialize_with(resolver, base)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            environ,
            vec![
                "HOME=/home/dev",
                "API_KEY=from-shell",
                "DATABASE_URL=postgres://l",
                "API_KEY=k1",
            ]
        );
    }

    #[test]
    fn test_materialize_expands_flagged_only() {
        let global = vec![Variable::new("BASE_URL", "https://example.com")];
        let local = vec![
            Variable::new("API_URL", "${BASE_URL}/api/v1").expanded(),
            Variable::new("TEMPLATE", "${BASE_URL}/raw"),
        ];
        let env = no_ambient();

        let resolver = Resolver::new(&global, &local).with_ambient(&env);
        let entries = materialize_with(resolver, Vec::new()).unwrap();

        assert_eq!(entries[0], EnvEntry::new("API_URL", "https://example.com/api/v1"));
        assert_eq!(entries[1], EnvEntry::new("TEMPLATE", "${BASE_URL}/raw"));
        assert_eq!(entries[2], EnvEntry::new("BASE_URL", "https://example.com"));
    }

    #[test]
    fn test_materialize_swallows_undefined() {
        let local = vec![Variable::new("GREETING", "hello ${NOBODY}!").expanded()];
        let env = no_ambient();

        let resolver = Resolver::new(&[], &local).with_ambient(&env);
        let entries = materialize_with(resolver, Vec::new()).unwrap();

        assert_eq!(entries, vec![EnvEntry::new("GREETING", "hello !")]);
    }

    #[test]
    fn test_materialize_fails_on_cycle() {
        let local = vec![
            Variable::new("A", "${B}").expanded(),
            Variable::new("B", "${A}").expanded(),
        ];
        let env = no_ambient();

        let resolver = Resolver::new(&[], &local).with_ambient(&env);
        let err = materialize_with(resolver, Vec::new()).unwrap_err();

        assert!(matches!(err, ResolveError::CyclicExpansion { .. }));
    }

    #[test]
    fn test_entries_without_global_still_resolve_global_refs() {
        let global = vec![
            Variable::new("REGION", "eu-west-1"),
            Variable::new("UNUSED", "x"),
        ];
        let local = vec![Variable::new("BUCKET", "logs-${REGION}").expanded()];
        let env = no_ambient();

        let resolver = Resolver::new(&global, &local).with_ambient(&env);
        let entries = resolver.entries(false, true).unwrap();

        assert_eq!(entries, vec![EnvEntry::new("BUCKET", "logs-eu-west-1")]);
    }

    #[test]
    fn test_value_of_strict_reports_undefined() {
        let local = vec![Variable::new("DSN", "${USER}:${PASS}@db").expanded()];
        let env = no_ambient();

        let resolver = Resolver::new(&[], &local).with_ambient(&env);
        let err = resolver.value_of(&local[0], true).unwrap_err();

        assert!(matches!(err, ResolveError::Multiple(ref errors) if errors.len() == 2));
        assert_eq!(resolver.value_of(&local[0], false).unwrap(), ":@db");
    }
}
