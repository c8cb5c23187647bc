//! 跨平台命令执行器
//!
//! 子进程环境完全由调用方给出 (先清空再按顺序写入，同名时靠后者生效)，
//! 标准流继承父进程。

use crate::error::{EnvError, Result};
use crate::types::EnvEntry;
use std::io;
use std::process::{Command, ExitStatus, Stdio};

/// 跨平台命令执行器
pub struct CommandExecutor;

impl CommandExecutor {
    /// 执行命令并使用给定环境
    ///
    /// # 参数
    /// - `command`: 命令和参数，如 `["python", "app.py"]`
    /// - `environ`: 子进程的完整环境
    ///
    /// # 返回
    /// 子进程的退出码
    pub fn exec_with_environ(command: &[String], environ: &[EnvEntry]) -> Result<i32> {
        let Some((program, args)) = command.split_first() else {
            return Err(EnvError::InvalidArgument("命令不能为空".to_string()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args).env_clear();
        for entry in environ {
            cmd.env(&entry.name, &entry.value);
        }

        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        tracing::debug!(program = %program, args = args.len(), vars = environ.len(), "启动子进程");

        let status = cmd.status().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => EnvError::CommandNotFound(format!(
                "{program} (请确保命令在 PATH 中或使用完整路径)"
            )),
            _ => EnvError::CommandExecutionFailed(format!("{program}: {e}")),
        })?;

        let code = exit_code(status);
        tracing::debug!(program = %program, code, "子进程已退出");
        Ok(code)
    }
}

/// 被信号终止的进程按 shell 惯例返回 128 + 信号值
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command() {
        let result = CommandExecutor::exec_with_environ(&[], &[]);
        assert!(matches!(result, Err(EnvError::InvalidArgument(_))));
    }

    #[test]
    fn test_command_not_found() {
        let command = vec!["envoke-definitely-missing-binary".to_string()];
        let environ = [EnvEntry::new(
            "PATH",
            std::env::var("PATH").unwrap_or_default(),
        )];

        let result = CommandExecutor::exec_with_environ(&command, &environ);
        assert!(matches!(result, Err(EnvError::CommandNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_and_environment_passthrough() {
        let command = vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            "test \"$GREETING\" = second && test -z \"$HOME_LEAK\" && exit 7".to_string(),
        ];
        let environ = [
            EnvEntry::new("GREETING", "first"),
            EnvEntry::new("GREETING", "second"),
        ];

        let code = CommandExecutor::exec_with_environ(&command, &environ).unwrap();
        assert_eq!(code, 7);
    }
}
