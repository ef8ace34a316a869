use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_MAX_BLOCK_DEPTH: usize = 16;
pub const DEFAULT_SNAP_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_CONCAVITY: f64 = 0.01;

/// 大小写不敏感的图层白名单。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerFilter {
    names: BTreeSet<String>,
}

impl LayerFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for name in names {
            filter.insert(name.as_ref());
        }
        filter
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(fold(name));
    }

    #[inline]
    pub fn contains(&self, layer: &str) -> bool {
        self.names.contains(&fold(layer))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 折叠后的图层名，按字典序。
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

fn fold(name: &str) -> String {
    name.trim().to_uppercase()
}

/// 调用方请求的目标图层。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TargetLayers {
    /// 不过滤，输出整张图纸的预览。
    #[default]
    All,
    /// 只保留指定图层，并要求重建出多边形。
    Only(LayerFilter),
}

impl TargetLayers {
    #[inline]
    pub fn admits(&self, layer: &str) -> bool {
        match self {
            TargetLayers::All => true,
            TargetLayers::Only(filter) => filter.contains(layer),
        }
    }

    /// 由目标图层一次性决定输出模式，调用期间不再改变。
    #[inline]
    pub fn mode(&self) -> OutputMode {
        match self {
            TargetLayers::All => OutputMode::Preview,
            TargetLayers::Only(_) => OutputMode::Strict,
        }
    }
}

/// 输出模式：预览模式宽松地返回全部曲线与注记；严格模式必须得到多边形。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Preview,
    Strict,
}

/// 单次解析调用的参数，按值传入，不依赖任何全局状态。
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// 线性比例：面积乘以 `scale²`，周长乘以 `scale`。
    pub scale: f64,
    pub target_layers: TargetLayers,
    pub max_block_depth: usize,
    pub snap_tolerance: f64,
    pub concavity: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            target_layers: TargetLayers::All,
            max_block_depth: DEFAULT_MAX_BLOCK_DEPTH,
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
            concavity: DEFAULT_CONCAVITY,
        }
    }
}

impl ParseOptions {
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// 追加一个目标图层；首次调用会把模式切换为严格模式。
    pub fn with_layer(mut self, layer: impl AsRef<str>) -> Self {
        match &mut self.target_layers {
            TargetLayers::Only(filter) => filter.insert(layer.as_ref()),
            TargetLayers::All => {
                self.target_layers = TargetLayers::Only(LayerFilter::new([layer]));
            }
        }
        self
    }

    pub fn with_layers<I, S>(self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        layers
            .into_iter()
            .fold(self, |options, layer| options.with_layer(layer))
    }

    #[inline]
    pub fn mode(&self) -> OutputMode {
        self.target_layers.mode()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(EngineError::InvalidOptions(format!(
                "scale must be a positive finite number, got {}",
                self.scale
            )));
        }
        if !(self.snap_tolerance.is_finite() && self.snap_tolerance > 0.0) {
            return Err(EngineError::InvalidOptions(format!(
                "snap tolerance must be a positive finite number, got {}",
                self.snap_tolerance
            )));
        }
        if !(self.concavity.is_finite() && self.concavity >= 0.0) {
            return Err(EngineError::InvalidOptions(format!(
                "concavity must be a non-negative finite number, got {}",
                self.concavity
            )));
        }
        if let TargetLayers::Only(filter) = &self.target_layers {
            if filter.is_empty() {
                return Err(EngineError::InvalidOptions(
                    "target layer set must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
