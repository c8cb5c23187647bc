//! .env 格式解析器 (简单原则：透明的文本解析)

use crate::error::{EnvError, Result};
use crate::types::EnvEntry;
use std::collections::HashMap;

/// .env 格式解析器
#[derive(Debug, Default)]
pub struct DotenvParser;

impl DotenvParser {
    /// 解析 .env 文件内容
    ///
    /// 规则：
    /// - 忽略空行和以 # 开头的注释行
    /// - 允许 `export ` 前缀
    /// - 单引号值按字面保留；双引号值支持 `\n` `\t` `\"` `\\` 转义
    /// - 无引号值去除首尾空白，` #` 之后视为注释
    /// - 没有 `=` 的行被跳过
    /// - 同名键后出现者生效，位置保持首次出现处
    ///
    /// # Errors
    ///
    /// 键名为空或引号未闭合时返回 [`EnvError::Parse`]。
    pub fn parse(content: &str) -> Result<Vec<(String, String)>> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line
                .strip_prefix("export ")
                .map_or(line, str::trim_start);

            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!(line = line_no, "跳过非 KEY=VALUE 行");
                continue;
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(EnvError::Parse(format!("第 {line_no} 行: 键名为空")));
            }

            let value = parse_value(value.trim_start())
                .map_err(|msg| EnvError::Parse(format!("第 {line_no} 行: {msg}")))?;

            match positions.get(key) {
                Some(&pos) => pairs[pos].1 = value,
                None => {
                    positions.insert(key.to_string(), pairs.len());
                    pairs.push((key.to_string(), value));
                }
            }
        }

        Ok(pairs)
    }
}

fn parse_value(value: &str) -> std::result::Result<String, &'static str> {
    if let Some(rest) = value.strip_prefix('\'') {
        return rest
            .find('\'')
            .map(|end| rest[..end].to_string())
            .ok_or("单引号未闭合");
    }

    if let Some(rest) = value.strip_prefix('"') {
        let mut out = String::with_capacity(rest.len());
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return Ok(out),
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => break,
                },
                _ => out.push(c),
            }
        }
        return Err("双引号未闭合");
    }

    let value = match value.find(" #") {
        Some(pos) => &value[..pos],
        None => value,
    };
    Ok(value.trim().to_string())
}

/// .env 格式输出
#[derive(Debug, Default)]
pub struct DotenvWriter;

impl DotenvWriter {
    /// 序列化为 .env 文本，每个条目可附带一行注释
    ///
    /// 需要时值会加双引号并转义，保证能被 [`DotenvParser`] 原样读回。
    #[must_use]
    pub fn serialize<'a, I>(entries: I) -> String
    where
        I: IntoIterator<Item = (&'a EnvEntry, Option<&'a str>)>,
    {
        let mut lines = Vec::new();
        for (entry, comment) in entries {
            if let Some(comment) = comment.filter(|c| !c.is_empty()) {
                for line in comment.lines() {
                    lines.push(format!("# {line}"));
                }
            }
            lines.push(format!("{}={}", entry.name, quote_value(&entry.value)));
        }
        lines.join("\n")
    }
}

fn needs_quotes(value: &str) -> bool {
    value != value.trim()
        || value.starts_with('"')
        || value.starts_with('\'')
        || value.contains(" #")
        || value.contains('\n')
        || value.contains('\r')
}

fn quote_value(value: &str) -> String {
    if !needs_quotes(value) {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
