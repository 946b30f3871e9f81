use std::collections::HashMap;

use super::error::{Result, RouterOsError};

/// 一行记录的属性（`=key=value`）
pub type Attributes = HashMap<String, String>;

/// 回复类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `!re` 数据行
    Re,
    /// `!done` 命令结束
    Done,
    /// `!trap` 命令错误
    Trap,
    /// `!fatal` 会话被关闭
    Fatal,
    /// `!empty` 无数据（RouterOS 7.18+）
    Empty,
}

/// 解析后的回复 sentence
#[derive(Debug, Clone)]
pub struct Reply {
    pub kind: ReplyKind,
    pub attributes: Attributes,
    pub tag: Option<String>,
    /// 非属性 word，`!fatal` 的原因就在这里
    pub extra: Vec<String>,
}

impl Reply {
    pub fn parse(words: Vec<String>) -> Result<Self> {
        let mut iter = words.into_iter();
        let head = iter
            .next()
            .ok_or_else(|| RouterOsError::Protocol("empty reply sentence".to_string()))?;

        let kind = match head.as_str() {
            "!re" => ReplyKind::Re,
            "!done" => ReplyKind::Done,
            "!trap" => ReplyKind::Trap,
            "!fatal" => ReplyKind::Fatal,
            "!empty" => ReplyKind::Empty,
            other => {
                return Err(RouterOsError::Protocol(format!(
                    "unknown reply type: {}",
                    other
                )))
            }
        };

        let mut attributes = Attributes::new();
        let mut tag = None;
        let mut extra = Vec::new();

        for word in iter {
            if let Some(rest) = word.strip_prefix('=') {
                // 值里允许出现 '='，只按第一个分隔
                match rest.split_once('=') {
                    Some((key, value)) => {
                        attributes.insert(key.to_string(), value.to_string());
                    }
                    None => {
                        attributes.insert(rest.to_string(), String::new());
                    }
                }
            } else if let Some(value) = word.strip_prefix(".tag=") {
                tag = Some(value.to_string());
            } else {
                extra.push(word);
            }
        }

        Ok(Self { kind, attributes, tag, extra })
    }

    /// `!trap` / `!fatal` 的错误信息
    pub fn message(&self) -> String {
        if let Some(message) = self.attributes.get("message") {
            return message.clone();
        }
        if !self.extra.is_empty() {
            return self.extra.join(" ");
        }
        "unknown error".to_string()
    }

    pub fn category(&self) -> Option<u32> {
        self.attributes.get("category").and_then(|c| c.parse().ok())
    }
}

/// API 命令构造器
///
/// ```
/// use common::routeros::Command;
///
/// let cmd = Command::new("/ip/hotspot/user/print").query("name", "alice");
/// assert_eq!(cmd.words(), vec!["/ip/hotspot/user/print", "?name=alice"]);
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    path: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    /// 追加 `=key=value` 参数
    pub fn attr(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.args.push(format!("={}={}", key, value.as_ref()));
        self
    }

    /// 可选参数，`None` 时跳过
    pub fn attr_opt(self, key: &str, value: Option<impl AsRef<str>>) -> Self {
        match value {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    /// 追加 `?key=value` 查询条件
    pub fn query(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.args.push(format!("?{}={}", key, value.as_ref()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn words(&self) -> Vec<String> {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.path.clone());
        words.extend(self.args.iter().cloned());
        words
    }
}

/// 命令执行结果
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// 所有 `!re` 行
    pub rows: Vec<Attributes>,
    /// `!done` 携带的属性（add 命令返回 `ret`）
    pub done: Attributes,
}

impl Response {
    /// add 命令返回的新记录 `.id`
    pub fn ret(&self) -> Option<&str> {
        self.done.get("ret").map(String::as_str)
    }
}
