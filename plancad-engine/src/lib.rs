//! 平面图重建引擎：把 DXF 文档中的实体展开、离散化并重建为可度量的多边形。
//!
//! 数据严格按 收集 → 离散化 → 几何构建 → 拓扑重建 → 度量 → 输出 的顺序流动，
//! 入口为 [`pipeline::parse_path`] 与 [`pipeline::parse_document`]。

pub mod builder;
pub mod collector;
pub mod diagnostics;
pub mod metrics;
pub mod model;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod tessellate;
pub mod topology;

pub mod errors {
    use std::path::PathBuf;

    use plancad_io::IoError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("failed to read document {path:?}: {source}")]
        DocumentUnreadable {
            path: PathBuf,
            #[source]
            source: IoError,
        },
        #[error(
            "no construction could be identified on the requested layers (available layers: {})",
            .available_layers.join(", ")
        )]
        NoGeometryFound { available_layers: Vec<String> },
        #[error("invalid parse options: {0}")]
        InvalidOptions(String),
        #[error("failed to serialize output: {0}")]
        Serialization(#[from] serde_json::Error),
    }
}

pub use diagnostics::{Diagnostic, SkipReason};
pub use errors::EngineError;
pub use model::{Curve, PointFeature, Region, RegionSource};
pub use options::{LayerFilter, OutputMode, ParseOptions, TargetLayers};
pub use output::{FeatureCollection, Metadata};
pub use pipeline::{ParseOutput, parse_document, parse_path};
