//! 命令处理器
//!
//! 每组子命令一个模块，共享 [`CommandContext`]

use crate::config::Config;
use crate::core::Store;
use crate::error::Result;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use std::io::{self, BufRead, Write};

pub mod env;
pub mod run;
pub mod var;

/// 命令上下文
#[derive(Debug)]
pub struct CommandContext<W: Write> {
    pub store: Store,
    pub config: Config,
    pub verbose: bool,
    /// 命令的标准输出
    pub out: W,
}

impl<W: Write> CommandContext<W> {
    pub fn new(store: Store, config: Config, verbose: bool, out: W) -> Self {
        Self {
            store,
            config,
            verbose,
            out,
        }
    }

    /// 解析目标环境名
    #[must_use]
    pub fn environment(&self, requested: Option<&str>) -> String {
        self.config.environment_or_default(requested)
    }

    /// 详细模式下输出成功提示 (安静原则：默认静默)
    pub fn success(&mut self, message: impl std::fmt::Display) -> Result<()> {
        if self.verbose {
            writeln!(self.out, "✓ {message}")?;
        }
        Ok(())
    }
}

/// 统一的表格样式
pub(crate) fn table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// 在标准错误输出提示并从标准输入读取 y/N
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_success_is_quiet_by_default() {
        let mut ctx = context();
        ctx.success("done").unwrap();
        assert_eq!(output(&mut ctx), "");

        ctx.verbose = true;
        ctx.success("done").unwrap();
        assert_eq!(output(&mut ctx), "✓ done\n");
    }

    #[test]
    fn test_environment_falls_back_to_config() {
        let mut ctx = context();
        assert_eq!(ctx.environment(None), "global");

        ctx.config.default_environment = Some("dev".to_string());
        assert_eq!(ctx.environment(None), "dev");
        assert_eq!(ctx.environment(Some("prod")), "prod");
    }
}
