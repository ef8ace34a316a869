use std::fmt;

use serde::Serialize;

/// 被跳过的实体或区域的原因。跳过从不会中断整次解析。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkipReason {
    Malformed { message: String },
    UnresolvedBlock { name: String },
    CyclicBlock { name: String },
    BlockDepthExceeded { name: String, depth: usize },
    EmptyText,
    Degenerate,
    InvalidRegion { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed { message } => write!(f, "malformed entity: {message}"),
            SkipReason::UnresolvedBlock { name } => write!(f, "block `{name}` is not defined"),
            SkipReason::CyclicBlock { name } => {
                write!(f, "block `{name}` references itself")
            }
            SkipReason::BlockDepthExceeded { name, depth } => {
                write!(f, "block `{name}` exceeds nesting depth {depth}")
            }
            SkipReason::EmptyText => f.write_str("text has no content"),
            SkipReason::Degenerate => f.write_str("geometry is degenerate"),
            SkipReason::InvalidRegion { message } => write!(f, "invalid region: {message}"),
        }
    }
}

/// 单条诊断：实体类型（DXF 名称，区域为 `REGION`）、所在图层与原因。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub entity: String,
    pub layer: Option<String>,
    pub reason: SkipReason,
}

impl Diagnostic {
    pub fn new(entity: impl Into<String>, layer: Option<String>, reason: SkipReason) -> Self {
        Self {
            entity: entity.into(),
            layer,
            reason,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.layer {
            Some(layer) => write!(f, "{} on layer {}: {}", self.entity, layer, self.reason),
            None => write!(f, "{}: {}", self.entity, self.reason),
        }
    }
}
