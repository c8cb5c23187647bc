//! 核心存储引擎 (模块原则：清晰分离的存储逻辑)
//!
//! SQLite 存储，两张表：
//! - `environments`：环境，名称唯一
//! - `variables`：变量，(environment_id, name) 唯一，随环境级联删除
//!
//! 打开时执行迁移，并确保 `global` 环境存在。

use crate::error::{EnvError, Result};
use crate::types::{Environment, EnvironmentSummary, GLOBAL_ENVIRONMENT, Variable, VariablePatch};
use crate::utils::paths;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

/// 按版本顺序排列的迁移脚本，`PRAGMA user_version` 记录已执行的数量
const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE IF NOT EXISTS environments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE CHECK (name <> ''),
    description TEXT
);

CREATE TABLE IF NOT EXISTS variables (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    environment_id INTEGER NOT NULL REFERENCES environments (id) ON DELETE CASCADE,
    name           TEXT NOT NULL CHECK (name <> ''),
    value          TEXT NOT NULL,
    comment        TEXT,
    expand         INTEGER NOT NULL DEFAULT 0,
    UNIQUE (environment_id, name)
);
"#];

/// 核心存储引擎
pub struct Store {
    conn: Connection,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// 打开（或创建）数据库文件
    pub fn open(path: &Path) -> Result<Self> {
        paths::ensure_parent_dir(path)?;
        tracing::debug!(path = %path.display(), "打开数据库");
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// 内存数据库 (测试用)
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut store = Self { conn };
        store.migrate()?;
        store.ensure_global()?;
        Ok(store)
    }

    /// 当前数据库结构版本
    pub fn schema_version(&self) -> Result<usize> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(usize::try_from(version).unwrap_or(0))
    }

    fn migrate(&mut self) -> Result<()> {
        let current = self.schema_version()?;
        if current >= MIGRATIONS.len() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
            tracing::info!(version = index + 1, "执行数据库迁移");
            tx.execute_batch(sql)?;
            tx.execute_batch(&format!("PRAGMA user_version = {};", index + 1))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn ensure_global(&mut self) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO environments (name) VALUES (?1)",
            params![GLOBAL_ENVIRONMENT],
        )?;
        if inserted > 0 {
            tracing::info!("已创建 global 环境");
        }
        Ok(())
    }

    // ==================== 环境 ====================

    /// 列出所有环境（global 在最前，其余按名称排序）
    pub fn list_environments(&self) -> Result<Vec<EnvironmentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.name, e.description, COUNT(v.id)
             FROM environments e
             LEFT JOIN variables v ON v.environment_id = e.id
             GROUP BY e.id
             ORDER BY e.name <> ?1, e.name",
        )?;

        let rows = stmt.query_map(params![GLOBAL_ENVIRONMENT], |row| {
            let count: i64 = row.get(2)?;
            Ok(EnvironmentSummary {
                name: row.get(0)?,
                description: row.get(1)?,
                variables_count: usize::try_from(count).unwrap_or(0),
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 查找环境
    pub fn find_environment(&self, name: &str) -> Result<Environment> {
        find_environment(&self.conn, name)
    }

    /// 创建环境
    pub fn create_environment(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Environment> {
        validate_name("环境", name)?;
        if name == GLOBAL_ENVIRONMENT {
            return Err(EnvError::ProtectedEnvironment(
                "不能创建保留名称 'global'".to_string(),
            ));
        }

        insert_environment(&self.conn, name, description)
    }

    /// 复制环境及其全部变量
    pub fn copy_environment(&mut self, name: &str, new_name: &str) -> Result<Environment> {
        validate_name("源环境", name)?;
        validate_name("目标环境", new_name)?;

        let tx = self.conn.transaction()?;
        let source = find_environment(&tx, name)?;
        let copy = insert_environment(&tx, new_name, source.description.as_deref())?;

        let copied = tx.execute(
            "INSERT INTO variables (environment_id, name, value, comment, expand)
             SELECT ?1, name, value, comment, expand FROM variables WHERE environment_id = ?2",
            params![copy.id, source.id],
        )?;
        tx.commit()?;

        tracing::info!(from = name, to = new_name, variables = copied, "已复制环境");
        Ok(copy)
    }

    /// 重命名环境
    pub fn rename_environment(&mut self, name: &str, new_name: &str) -> Result<Environment> {
        validate_name("当前环境", name)?;
        validate_name("新环境", new_name)?;
        if name == GLOBAL_ENVIRONMENT {
            return Err(EnvError::ProtectedEnvironment("不能重命名".to_string()));
        }
        if new_name == GLOBAL_ENVIRONMENT {
            return Err(EnvError::ProtectedEnvironment(
                "不能重命名为保留名称 'global'".to_string(),
            ));
        }

        let tx = self.conn.transaction()?;
        let mut env = find_environment(&tx, name)?;
        tx.execute(
            "UPDATE environments SET name = ?1 WHERE id = ?2",
            params![new_name, env.id],
        )
        .map_err(|e| map_constraint(e, || EnvError::EnvironmentExists(new_name.to_string())))?;
        tx.commit()?;

        env.name = new_name.to_string();
        tracing::info!(from = name, to = new_name, "已重命名环境");
        Ok(env)
    }

    /// 更新环境描述（`None` 清空描述）
    pub fn update_environment(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Environment> {
        validate_name("环境", name)?;
        if name == GLOBAL_ENVIRONMENT {
            return Err(EnvError::ProtectedEnvironment("不能修改".to_string()));
        }

        let mut env = find_environment(&self.conn, name)?;
        let description = description.filter(|d| !d.is_empty());
        self.conn.execute(
            "UPDATE environments SET description = ?1 WHERE id = ?2",
            params![description, env.id],
        )?;

        env.description = description.map(str::to_string);
        Ok(env)
    }

    /// 删除环境（变量级联删除）
    pub fn remove_environment(&mut self, name: &str) -> Result<()> {
        validate_name("环境", name)?;
        if name == GLOBAL_ENVIRONMENT {
            return Err(EnvError::ProtectedEnvironment("不能删除".to_string()));
        }

        let env = find_environment(&self.conn, name)?;
        self.conn
            .execute("DELETE FROM environments WHERE id = ?1", params![env.id])?;

        tracing::info!(environment = name, "已删除环境");
        Ok(())
    }

    // ==================== 变量 ====================

    /// 列出环境中的变量（按名称升序）
    pub fn variables(&self, environment: &str) -> Result<Vec<Variable>> {
        let env = find_environment(&self.conn, environment)?;
        let mut stmt = self.conn.prepare(
            "SELECT name, value, comment, expand FROM variables
             WHERE environment_id = ?1
             ORDER BY name ASC",
        )?;

        let rows = stmt.query_map(params![env.id], variable_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 全局环境的变量
    pub fn global_variables(&self) -> Result<Vec<Variable>> {
        self.variables(GLOBAL_ENVIRONMENT)
    }

    /// 查找单个变量
    pub fn find_variable(&self, environment: &str, name: &str) -> Result<Variable> {
        let env = find_environment(&self.conn, environment)?;
        find_variable(&self.conn, env.id, name)
    }

    /// 添加变量
    ///
    /// `upsert = true` 时已存在的变量会被覆盖，否则返回 [`EnvError::VariableExists`]。
    /// 未提供值时使用空字符串。
    pub fn add_variable(
        &mut self,
        environment: &str,
        name: &str,
        patch: VariablePatch,
        upsert: bool,
    ) -> Result<()> {
        validate_name("变量", name)?;
        let env = find_environment(&self.conn, environment)?;
        let value = patch.value.unwrap_or_default();
        let comment = patch.comment.filter(|c| !c.is_empty());

        let sql = if upsert {
            "INSERT INTO variables (environment_id, name, value, comment, expand)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (environment_id, name) DO UPDATE SET
                 value = excluded.value,
                 comment = excluded.comment,
                 expand = excluded.expand"
        } else {
            "INSERT INTO variables (environment_id, name, value, comment, expand)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        };

        self.conn
            .execute(sql, params![env.id, name, value, comment, patch.expand])
            .map_err(|e| {
                map_constraint(e, || EnvError::VariableExists {
                    name: name.to_string(),
                    environment: env.name.clone(),
                })
            })?;

        tracing::debug!(environment = %env.name, variable = name, upsert, "已写入变量");
        Ok(())
    }

    /// 更新变量：值仅在提供时修改，注释和展开标记总是被替换
    pub fn update_variable(
        &mut self,
        environment: &str,
        name: &str,
        patch: VariablePatch,
    ) -> Result<Variable> {
        validate_name("变量", name)?;
        let tx = self.conn.transaction()?;
        let env = find_environment(&tx, environment)?;
        let mut var = find_variable(&tx, env.id, name)?;

        if let Some(value) = patch.value {
            var.value = value;
        }
        var.comment = patch.comment.filter(|c| !c.is_empty());
        var.expand = patch.expand;

        tx.execute(
            "UPDATE variables SET value = ?1, comment = ?2, expand = ?3
             WHERE environment_id = ?4 AND name = ?5",
            params![var.value, var.comment, var.expand, env.id, name],
        )?;
        tx.commit()?;

        Ok(var)
    }

    /// 删除变量
    pub fn remove_variable(&mut self, environment: &str, name: &str) -> Result<()> {
        validate_name("变量", name)?;
        let env = find_environment(&self.conn, environment)?;
        let deleted = self.conn.execute(
            "DELETE FROM variables WHERE environment_id = ?1 AND name = ?2",
            params![env.id, name],
        )?;

        if deleted == 0 {
            return Err(EnvError::VariableNotFound(name.to_string()));
        }
        Ok(())
    }

    /// 导入变量
    ///
    /// - `merge = false`：先清空环境中的全部变量
    /// - `merge = true`：只替换同名变量，其他变量保留
    ///
    /// 导入的变量不展开、无注释。返回导入数量。
    pub fn import_variables(
        &mut self,
        environment: &str,
        vars: &[(String, String)],
        merge: bool,
    ) -> Result<usize> {
        for (name, _) in vars {
            validate_name("变量", name)?;
        }

        let tx = self.conn.transaction()?;
        let env = find_environment(&tx, environment)?;

        if !merge {
            let cleared = tx.execute(
                "DELETE FROM variables WHERE environment_id = ?1",
                params![env.id],
            )?;
            tracing::debug!(environment = %env.name, cleared, "已清空环境变量");
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO variables (environment_id, name, value, comment, expand)
                 VALUES (?1, ?2, ?3, NULL, 0)
                 ON CONFLICT (environment_id, name) DO UPDATE SET
                     value = excluded.value,
                     comment = NULL,
                     expand = 0",
            )?;
            for (name, value) in vars {
                stmt.execute(params![env.id, name, value])?;
            }
        }
        tx.commit()?;

        tracing::info!(environment = %env.name, imported = vars.len(), merge, "已导入变量");
        Ok(vars.len())
    }
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EnvError::InvalidArgument(format!("{kind}名称不能为空")));
    }
    Ok(())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// 唯一约束冲突转换为领域错误，其他错误原样返回
fn map_constraint(err: rusqlite::Error, on_conflict: impl FnOnce() -> EnvError) -> EnvError {
    if is_constraint_violation(&err) {
        on_conflict()
    } else {
        EnvError::Database(err)
    }
}

fn find_environment(conn: &Connection, name: &str) -> Result<Environment> {
    conn.query_row(
        "SELECT id, name, description FROM environments WHERE name = ?1",
        params![name],
        |row| {
            Ok(Environment {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| EnvError::EnvironmentNotFound(name.to_string()))
}

fn insert_environment(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> Result<Environment> {
    let description = description.filter(|d| !d.is_empty());
    conn.execute(
        "INSERT INTO environments (name, description) VALUES (?1, ?2)",
        params![name, description],
    )
    .map_err(|e| map_constraint(e, || EnvError::EnvironmentExists(name.to_string())))?;

    Ok(Environment {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        description: description.map(str::to_string),
    })
}

fn find_variable(conn: &Connection, environment_id: i64, name: &str) -> Result<Variable> {
    conn.query_row(
        "SELECT name, value, comment, expand FROM variables
         WHERE environment_id = ?1 AND name = ?2",
        params![environment_id, name],
        variable_from_row,
    )
    .optional()?
    .ok_or_else(|| EnvError::VariableNotFound(name.to_string()))
}

fn variable_from_row(row: &Row<'_>) -> rusqlite::Result<Variable> {
    Ok(Variable {
        name: row.get(0)?,
        value: row.get(1)?,
        comment: row.get(2)?,
        expand: row.get(3)?,
    })
}
