//! run 命令处理器

use super::CommandContext;
use crate::error::Result;
use crate::resolver::materialize;
use crate::types::GLOBAL_ENVIRONMENT;
use crate::utils::executor::CommandExecutor;
use crate::utils::paths;
use std::io::Write;

/// 以 "系统环境 + 全局变量 + 目标环境变量" 运行命令，返回子进程退出码
pub fn execute<W: Write>(
    environment: Option<&str>,
    command: &[String],
    ctx: &mut CommandContext<W>,
) -> Result<i32> {
    let environment = ctx.environment(environment);

    let global = ctx.store.global_variables()?;
    let local = if environment == GLOBAL_ENVIRONMENT {
        global.clone()
    } else {
        ctx.store.variables(&environment)?
    };

    let environ = materialize(&global, &local, paths::get_system_env())?;
    tracing::info!(environment = %environment, command = ?command, "运行命令");

    // 子进程输出直接写到终端，先把已缓冲的内容写出
    ctx.out.flush()?;
    CommandExecutor::exec_with_environ(command, &environ)
}
