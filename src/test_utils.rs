//! 测试工具模块
//!
//! 提供进程环境变量守卫和内存数据库夹具，避免测试之间互相污染

use crate::core::Store;
use crate::types::{Variable, VariablePatch};
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::sync::Mutex;

/// 环境变量守卫 - 只记录被修改过的变量，释放时逐个恢复
#[derive(Default)]
pub struct EnvGuard {
    touched: Mutex<HashMap<String, Option<OsString>>>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, key: &str) {
        let mut touched = self.touched.lock().unwrap();
        touched
            .entry(key.to_string())
            .or_insert_with(|| env::var_os(key));
    }

    /// 设置测试环境变量（自动包装为 unsafe）
    pub fn set_var(&self, key: &str, value: &str) {
        self.remember(key);
        unsafe {
            env::set_var(key, value);
        }
    }

    /// 移除环境变量（自动包装为 unsafe）
    pub fn remove_var(&self, key: &str) {
        self.remember(key);
        unsafe {
            env::remove_var(key);
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        let touched = self.touched.get_mut().unwrap();
        for (key, original) in touched.drain() {
            unsafe {
                match original {
                    Some(value) => env::set_var(&key, value),
                    None => env::remove_var(&key),
                }
            }
        }
    }
}

/// 内存数据库（已迁移，含 global 环境）
pub fn memory_store() -> Store {
    Store::open_in_memory().unwrap()
}

/// 向指定环境写入变量；环境不存在时先创建
pub fn seed(store: &mut Store, environment: &str, vars: &[Variable]) {
    if store.find_environment(environment).is_err() {
        store.create_environment(environment, None).unwrap();
    }
    for var in vars {
        let patch = VariablePatch {
            value: Some(var.value.clone()),
            comment: var.comment.clone(),
            expand: var.expand,
        };
        store
            .add_variable(environment, &var.name, patch, false)
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_guard_restores_original() {
        unsafe {
            env::set_var("ENVOKE_GUARD_EXISTING", "original");
        }
        {
            let guard = EnvGuard::new();
            guard.set_var("ENVOKE_GUARD_EXISTING", "changed");
            guard.set_var("ENVOKE_GUARD_NEW", "temp");
            guard.set_var("ENVOKE_GUARD_NEW", "temp2");
            assert_eq!(env::var("ENVOKE_GUARD_EXISTING").unwrap(), "changed");
        }
        assert_eq!(env::var("ENVOKE_GUARD_EXISTING").unwrap(), "original");
        assert!(env::var("ENVOKE_GUARD_NEW").is_err());

        unsafe {
            env::remove_var("ENVOKE_GUARD_EXISTING");
        }
    }

    #[test]
    fn test_seed_creates_environment() {
        let mut store = memory_store();
        seed(&mut store, "dev", &[Variable::new("A", "1").expanded()]);

        let vars = store.variables("dev").unwrap();
        assert_eq!(vars.len(), 1);
        assert!(vars[0].expand);
    }
}
