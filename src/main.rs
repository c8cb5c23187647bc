//! envoke 主程序入口
//!
//! 设计原则：
//! - 模块化：入口代码简洁，逻辑委托给各模块
//! - 安静模式：默认无输出，成功静默
//! - 错误处理：详细/安静错误模式，通过 --verbose 切换

use clap::Parser;
use envoke::cli::{Cli, Commands};
use envoke::commands::{self, CommandContext};
use envoke::config::Config;
use envoke::core::Store;
use envoke::error::Result;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let verbose = cli.verbose;
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            e.report(verbose);
            std::process::exit(e.exit_code());
        }
    }
}

/// 日志写到 stderr；`RUST_LOG` 优先，其次 `-v`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// 执行命令，返回进程退出码
fn run(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    let store = Store::open(&config.db_path()?)?;
    let mut ctx = CommandContext::new(store, config, cli.verbose, io::stdout().lock());

    let code = match cli.command {
        Commands::Env(command) => commands::env::execute(command, &mut ctx).map(|()| 0)?,
        Commands::Var(args) => commands::var::execute(args, &mut ctx).map(|()| 0)?,
        Commands::Run {
            environment,
            command,
        } => commands::run::execute(environment.as_deref(), &command, &mut ctx)?,
    };

    ctx.out.flush()?;
    Ok(code)
}
