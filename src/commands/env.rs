//! env 命令处理器

use super::{CommandContext, confirm, table};
use crate::cli::EnvCommands;
use crate::error::{EnvError, Result};
use std::io::Write;

pub fn execute<W: Write>(command: EnvCommands, ctx: &mut CommandContext<W>) -> Result<()> {
    match command {
        EnvCommands::Create { name, description } => {
            ctx.store.create_environment(&name, description.as_deref())?;
            ctx.success(format!("已创建环境 '{name}'"))
        }

        EnvCommands::List => list(ctx),

        EnvCommands::Copy { name, new_name } => {
            ctx.store.copy_environment(&name, &new_name)?;
            ctx.success(format!("已复制环境 '{name}' -> '{new_name}'"))
        }

        EnvCommands::Rename { name, new_name } => {
            ctx.store.rename_environment(&name, &new_name)?;
            ctx.success(format!("已重命名环境 '{name}' -> '{new_name}'"))
        }

        EnvCommands::Update { name, description } => {
            ctx.store.update_environment(&name, description.as_deref())?;
            ctx.success(format!("已更新环境 '{name}'"))
        }

        EnvCommands::Remove { name, yes } => {
            // 先确认环境存在，避免对不存在的环境提示确认
            let env = ctx.store.find_environment(&name)?;
            if !env.is_global()
                && !yes
                && !confirm(&format!("确定删除环境 '{name}' 及其全部变量?"))?
            {
                return Err(EnvError::Cancelled("已取消删除".to_string()));
            }

            ctx.store.remove_environment(&name)?;
            ctx.success(format!("已删除环境 '{name}'"))
        }
    }
}

fn list<W: Write>(ctx: &mut CommandContext<W>) -> Result<()> {
    let envs = ctx.store.list_environments()?;

    let mut table = table(["名称", "描述", "变量数"]);
    for env in &envs {
        table.add_row(vec![
            env.name.clone(),
            env.description.clone().unwrap_or_default(),
            env.variables_count.to_string(),
        ]);
    }

    writeln!(ctx.out, "{table}")?;
    Ok(())
}
