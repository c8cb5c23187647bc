//! CLI 参数定义

use crate::types::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// envoke - 按环境管理变量并注入子进程
#[derive(Parser, Debug)]
#[command(
    name = "envoke",
    version,
    about = "按环境管理环境变量",
    long_about = "在 SQLite 中按环境保存变量，支持全局变量覆盖、${VAR} 展开、.env 导入导出，并以合并后的环境运行命令"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 环境管理
    #[command(subcommand, visible_alias = "environment")]
    Env(EnvCommands),

    /// 变量管理
    #[command(visible_alias = "variable")]
    Var(VarArgs),

    /// 以合并后的环境运行命令
    Run {
        /// 目标环境 (默认取配置中的 default_environment，否则为 global)
        #[arg(short, long)]
        environment: Option<String>,
        /// 要执行的命令
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommands {
    /// 创建环境
    #[command(visible_alias = "new")]
    Create {
        name: String,
        /// 描述
        #[arg(short, long)]
        description: Option<String>,
    },

    /// 列出环境
    #[command(visible_alias = "ls")]
    List,

    /// 复制环境及其变量
    #[command(visible_alias = "cp")]
    Copy { name: String, new_name: String },

    /// 重命名环境
    #[command(visible_alias = "mv")]
    Rename { name: String, new_name: String },

    /// 修改环境描述
    Update {
        name: String,
        /// 新描述 (省略则清空)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// 删除环境及其变量
    #[command(visible_alias = "rm")]
    Remove {
        name: String,
        /// 跳过确认
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct VarArgs {
    /// 目标环境 (默认取配置中的 default_environment，否则为 global)
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    #[command(subcommand)]
    pub command: VarCommands,
}

/// 变量值与元数据
#[derive(Args, Debug, Clone)]
pub struct VariableArgs {
    /// 变量名称
    pub name: String,
    /// 变量值
    pub value: Option<String>,
    /// 注释
    #[arg(long)]
    pub comment: Option<String>,
    /// 展开值中的 ${VAR} 引用
    #[arg(long)]
    pub expand: bool,
}

#[derive(Subcommand, Debug)]
pub enum VarCommands {
    /// 添加变量
    #[command(visible_alias = "new")]
    Add {
        #[command(flatten)]
        variable: VariableArgs,
        /// 已存在时覆盖
        #[arg(short, long)]
        update: bool,
    },

    /// 修改变量
    Update {
        #[command(flatten)]
        variable: VariableArgs,
    },

    /// 删除变量
    #[command(visible_alias = "rm")]
    Remove { name: String },

    /// 列出变量
    #[command(visible_alias = "ls")]
    List,

    /// 从 .env 文件导入 (省略文件时读取标准输入)
    Import {
        file: Option<PathBuf>,
        /// 保留未出现在文件中的变量
        #[arg(short, long)]
        merge: bool,
    },

    /// 导出为 .env (省略文件时写到标准输出)
    Export {
        file: Option<PathBuf>,
        /// 输出注释
        #[arg(long)]
        comment: bool,
        /// 包含全局变量
        #[arg(short, long)]
        global: bool,
        /// 引用未定义变量时报错
        #[arg(long)]
        strict: bool,
        /// 输出格式
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Env)]
        format: OutputFormat,
    },
}
