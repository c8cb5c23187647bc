//! 跨平台路径处理工具 (传统原则：常识性接口设计)
//!
//! 遵循 XDG 规范：
//! - 配置：`$XDG_CONFIG_HOME/envoke`，默认 `~/.config/envoke`
//! - 数据：`$XDG_DATA_HOME/envoke`，默认 `~/.local/share/envoke`

use crate::error::{EnvError, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "envoke";

/// 根据 XDG 变量或主目录下的默认子目录确定基础目录
fn xdg_dir(var: &str, home_fallback: &str) -> Result<PathBuf> {
    match std::env::var_os(var).filter(|v| !v.is_empty()) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(EnvError::ConfigDirMissing(format!(
                    "{var} 必须是绝对路径: {}",
                    dir.display()
                )));
            }
            Ok(dir)
        }
        None => {
            let home = dirs::home_dir()
                .ok_or_else(|| EnvError::ConfigDirMissing("无法找到用户主目录".to_string()))?;
            Ok(home.join(home_fallback))
        }
    }
}

/// 获取配置目录
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(xdg_dir("XDG_CONFIG_HOME", ".config")?.join(APP_DIR))
}

/// 获取数据目录
pub fn get_data_dir() -> Result<PathBuf> {
    Ok(xdg_dir("XDG_DATA_HOME", ".local/share")?.join(APP_DIR))
}

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// 默认数据库路径
pub fn default_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("data.db"))
}

/// 检查文件是否存在
pub fn file_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

/// 读取文件内容，返回错误时提供详细信息
pub fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(EnvError::FileNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| {
        EnvError::Io(std::io::Error::new(
            e.kind(),
            format!("读取文件 {} 失败: {}", path.display(), e),
        ))
    })
}

/// 确保文件的父目录存在 (幂等操作)
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EnvError::Io(std::io::Error::new(
                    e.kind(),
                    format!("创建目录 {} 失败: {}", parent.display(), e),
                ))
            })?;
        }
    }
    Ok(())
}

/// 安全写入文件 (同目录临时文件 + 原子替换)
pub fn write_file_safe(path: &Path, content: &str) -> Result<()> {
    ensure_parent_dir(path)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// 获取当前进程的环境变量 (保持系统返回的顺序，跳过非 UTF-8 的项)
pub fn get_system_env() -> Vec<(String, String)> {
    utf8_pairs(std::env::vars_os()).collect()
}

/// 只保留键和值都是合法 UTF-8 的环境变量；有损转换会把损坏的值传给子进程
fn utf8_pairs<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                let key = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
                tracing::warn!(%key, "跳过非 UTF-8 的环境变量");
                None
            }
        })
}
