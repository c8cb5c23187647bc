//! 变量合并器
//!
//! 目标环境的变量全部保留（原顺序），随后追加目标环境中不存在的全局变量（原顺序）。
//! 同名时目标环境覆盖全局，被覆盖的全局变量不会出现。

use crate::types::Variable;
use std::collections::HashSet;
use std::iter::FusedIterator;

/// 合并全局变量与目标环境变量
///
/// 返回惰性迭代器：消费者提前停止时，后续元素不会被计算；
/// 目标环境的名称集合只在进入全局部分时才构建。
pub fn merge_variables<'a>(global: &'a [Variable], local: &'a [Variable]) -> MergedVariables<'a> {
    MergedVariables {
        local_vars: local,
        local: local.iter(),
        global: global.iter(),
        local_names: None,
    }
}

/// [`merge_variables`] 的迭代器
#[derive(Debug, Clone)]
pub struct MergedVariables<'a> {
    local_vars: &'a [Variable],
    local: std::slice::Iter<'a, Variable>,
    global: std::slice::Iter<'a, Variable>,
    local_names: Option<HashSet<&'a str>>,
}

impl<'a> Iterator for MergedVariables<'a> {
    type Item = &'a Variable;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(var) = self.local.next() {
            return Some(var);
        }

        let local_vars = self.local_vars;
        let names = self
            .local_names
            .get_or_insert_with(|| local_vars.iter().map(|v| v.name.as_str()).collect());

        self.global.find(|v| !names.contains(v.name.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let local = self.local.len();
        (local, Some(local + self.global.len()))
    }
}

impl FusedIterator for MergedVariables<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<Variable> {
        pairs.iter().map(|(k, v)| Variable::new(*k, *v)).collect()
    }

    fn names<'a>(iter: impl Iterator<Item = &'a Variable>) -> Vec<&'a str> {
        iter.map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn test_disjoint_sets_keep_everything() {
        let global = vars(&[("A", "1"), ("B", "2")]);
        let local = vars(&[("C", "3"), ("D", "4"), ("E", "5")]);

        let merged: Vec<_> = merge_variables(&global, &local).collect();
        assert_eq!(merged.len(), global.len() + local.len());
    }

    #[test]
    fn test_local_overrides_global() {
        let global = vars(&[("DATABASE_URL", "postgres://g"), ("LOG_LEVEL", "info")]);
        let local = vars(&[("API_KEY", "k1"), ("DATABASE_URL", "postgres://l")]);

        let merged: Vec<_> = merge_variables(&global, &local).collect();
        let db: Vec<_> = merged.iter().filter(|v| v.name == "DATABASE_URL").collect();

        assert_eq!(db.len(), 1);
        assert_eq!(db[0].value, "postgres://l");
    }

    #[test]
    fn test_order_local_first_then_global() {
        let global = vars(&[("Z", "g"), ("B", "g"), ("A", "g")]);
        let local = vars(&[("M", "l"), ("B", "l"), ("C", "l")]);

        assert_eq!(
            names(merge_variables(&global, &local)),
            vec!["M", "B", "C", "Z", "A"]
        );
    }

    #[test]
    fn test_scenario_database_url() {
        let global = vec![Variable::new("DATABASE_URL", "postgres://g")];
        let local = vec![
            Variable::new("DATABASE_URL", "postgres://l"),
            Variable::new("API_KEY", "k1"),
        ];

        let entries: Vec<String> = merge_variables(&global, &local)
            .map(|v| format!("{}={}", v.name, v.value))
            .collect();

        assert_eq!(entries, vec!["DATABASE_URL=postgres://l", "API_KEY=k1"]);
    }

    #[test]
    fn test_name_matching_is_case_sensitive() {
        let global = vars(&[("path", "g")]);
        let local = vars(&[("PATH", "l")]);

        assert_eq!(names(merge_variables(&global, &local)), vec!["PATH", "path"]);
    }

    #[test]
    fn test_empty_inputs() {
        let empty: Vec<Variable> = Vec::new();
        let some = vars(&[("A", "1")]);

        assert_eq!(merge_variables(&empty, &empty).count(), 0);
        assert_eq!(names(merge_variables(&some, &empty)), vec!["A"]);
        assert_eq!(names(merge_variables(&empty, &some)), vec!["A"]);
    }

    #[test]
    fn test_restartable_and_early_termination() {
        let global = vars(&[("G1", "g"), ("G2", "g")]);
        let local = vars(&[("L1", "l"), ("L2", "l")]);

        let mut iter = merge_variables(&global, &local);
        assert_eq!(iter.next().map(|v| v.name.as_str()), Some("L1"));
        // 未进入全局部分，名称集合尚未构建
        assert!(iter.local_names.is_none());
        drop(iter);

        let first = merge_variables(&global, &local).find(|v| v.name.starts_with('G'));
        assert_eq!(first.map(|v| v.name.as_str()), Some("G1"));

        // 每次调用都是全新的序列
        assert_eq!(merge_variables(&global, &local).count(), 4);
        assert_eq!(merge_variables(&global, &local).count(), 4);
    }

    #[test]
    fn test_fused_after_exhaustion() {
        let global = vars(&[("A", "1")]);
        let local = vars(&[("A", "2")]);

        let mut iter = merge_variables(&global, &local);
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }
}
