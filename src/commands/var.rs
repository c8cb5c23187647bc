//! var 命令处理器

use super::{CommandContext, table};
use crate::cli::{VarArgs, VarCommands, VariableArgs};
use crate::config::format::{DotenvParser, DotenvWriter};
use crate::error::Result;
use crate::resolver::Resolver;
use crate::types::{EnvEntry, GLOBAL_ENVIRONMENT, OutputFormat, Variable, VariablePatch};
use crate::utils::paths;
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

impl From<VariableArgs> for VariablePatch {
    fn from(args: VariableArgs) -> Self {
        Self {
            value: args.value,
            comment: args.comment,
            expand: args.expand,
        }
    }
}

/// JSON 导出条目
#[derive(Debug, Serialize)]
struct ExportedVariable<'a> {
    name: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

/// 导出选项
#[derive(Debug, Clone)]
struct ExportOptions {
    file: Option<PathBuf>,
    comment: bool,
    global: bool,
    strict: bool,
    format: OutputFormat,
}

pub fn execute<W: Write>(args: VarArgs, ctx: &mut CommandContext<W>) -> Result<()> {
    let environment = ctx.environment(args.environment.as_deref());

    match args.command {
        VarCommands::Add { variable, update } => {
            let name = variable.name.clone();
            ctx.store.add_variable(&environment, &name, variable.into(), update)?;
            ctx.success(format!("已设置 {environment}.{name}"))
        }

        VarCommands::Update { variable } => {
            let name = variable.name.clone();
            ctx.store.update_variable(&environment, &name, variable.into())?;
            ctx.success(format!("已更新 {environment}.{name}"))
        }

        VarCommands::Remove { name } => {
            ctx.store.remove_variable(&environment, &name)?;
            ctx.success(format!("已删除 {environment}.{name}"))
        }

        VarCommands::List => list(&environment, ctx),

        VarCommands::Import { file, merge } => {
            let content = match &file {
                Some(path) => paths::read_file(path)?,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            import(&environment, &content, merge, ctx)
        }

        VarCommands::Export {
            file,
            comment,
            global,
            strict,
            format,
        } => export(
            &environment,
            &ExportOptions {
                file,
                comment,
                global,
                strict,
                format,
            },
            ctx,
        ),
    }
}

fn list<W: Write>(environment: &str, ctx: &mut CommandContext<W>) -> Result<()> {
    let vars = ctx.store.variables(environment)?;
    if vars.is_empty() {
        if ctx.verbose {
            writeln!(ctx.out, "环境 '{environment}' 中没有变量")?;
        }
        return Ok(());
    }

    let mut table = table(["名称", "值", "展开", "注释"]);
    for var in &vars {
        table.add_row(vec![
            var.name.clone(),
            var.value.clone(),
            if var.expand { "✓" } else { "" }.to_string(),
            var.comment.clone().unwrap_or_default(),
        ]);
    }

    writeln!(ctx.out, "{table}")?;
    Ok(())
}

fn import<W: Write>(
    environment: &str,
    content: &str,
    merge: bool,
    ctx: &mut CommandContext<W>,
) -> Result<()> {
    let pairs = DotenvParser::parse(content)?;
    let count = ctx.store.import_variables(environment, &pairs, merge)?;
    ctx.success(format!("成功导入 {count} 个变量到环境 '{environment}'"))
}

fn export<W: Write>(
    environment: &str,
    opts: &ExportOptions,
    ctx: &mut CommandContext<W>,
) -> Result<()> {
    let global = ctx.store.global_variables()?;
    let local = if environment == GLOBAL_ENVIRONMENT {
        global.clone()
    } else {
        ctx.store.variables(environment)?
    };

    let resolver = Resolver::new(&global, &local);
    let entries = resolver.entries(opts.global, opts.strict)?;
    let sources: Vec<&Variable> = resolver.merged(opts.global).collect();

    if entries.is_empty() {
        tracing::warn!(environment, "没有可导出的变量");
    }

    let content = render(&entries, &sources, opts)?;
    match &opts.file {
        Some(path) => write_export(path, &content)?,
        None if content.is_empty() => {}
        None => writeln!(ctx.out, "{content}")?,
    }

    tracing::debug!(environment, exported = entries.len(), "导出完成");
    Ok(())
}

fn render(entries: &[EnvEntry], sources: &[&Variable], opts: &ExportOptions) -> Result<String> {
    let comment_of = |index: usize| {
        if opts.comment {
            sources.get(index).and_then(|v| v.comment.as_deref())
        } else {
            None
        }
    };

    let content = match opts.format {
        OutputFormat::Env => DotenvWriter::serialize(
            entries
                .iter()
                .enumerate()
                .map(|(i, entry)| (entry, comment_of(i))),
        ),
        OutputFormat::Json => {
            let exported: Vec<ExportedVariable<'_>> = entries
                .iter()
                .enumerate()
                .map(|(i, entry)| ExportedVariable {
                    name: &entry.name,
                    value: &entry.value,
                    comment: comment_of(i),
                })
                .collect();
            serde_json::to_string_pretty(&exported)?
        }
    };
    Ok(content)
}

fn write_export(path: &Path, content: &str) -> Result<()> {
    if content.is_empty() {
        paths::write_file_safe(path, "")
    } else {
        paths::write_file_safe(path, &format!("{content}\n"))
    }
}
