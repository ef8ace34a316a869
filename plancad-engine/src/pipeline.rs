use std::path::Path;

use plancad_core::document::Document;
use plancad_io::{DocumentLoader, DxfFacade};
use serde::Serialize;
use tracing::debug;

use crate::builder;
use crate::collector::{self, Collection};
use crate::diagnostics::{Diagnostic, SkipReason};
use crate::errors::EngineError;
use crate::metrics::{self, RegionMetrics};
use crate::model::Region;
use crate::options::{OutputMode, ParseOptions};
use crate::output::{self, FeatureCollection, Metadata};
use crate::topology;

/// 一次解析调用的完整结果。
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub mode: OutputMode,
    pub collection: FeatureCollection,
    pub metadata: Metadata,
    /// 通过校验的区域，与 `metadata.constructions` 一一对应。
    pub regions: Vec<Region>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct Response<'a> {
    geojson: &'a FeatureCollection,
    metadata: &'a Metadata,
}

impl ParseOutput {
    fn response(&self) -> Response<'_> {
        Response {
            geojson: &self.collection,
            metadata: &self.metadata,
        }
    }

    /// 序列化为 `{"geojson": ..., "metadata": ...}`。
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.response())?)
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&self.response())?)
    }
}

/// 读取 DXF 文件并解析。
pub fn parse_path(path: impl AsRef<Path>, options: &ParseOptions) -> Result<ParseOutput, EngineError> {
    options.validate()?;
    let path = path.as_ref();
    let document = DxfFacade::new()
        .load(path)
        .map_err(|source| EngineError::DocumentUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
    parse_document(&document, options)
}

/// 对已读取的文档执行 收集 → 构建 → 重建 → 度量 → 输出。
///
/// 预览模式不做拓扑重建，返回全部曲线、标注与填充区域，不会因为没有多边形而失败；
/// 严格模式只输出多边形，一个都没有时返回 [`EngineError::NoGeometryFound`]。
pub fn parse_document(document: &Document, options: &ParseOptions) -> Result<ParseOutput, EngineError> {
    options.validate()?;
    let mode = options.mode();

    let Collection {
        entities,
        layer_counts,
        mut diagnostics,
    } = collector::collect(document, &options.target_layers, options.max_block_depth);

    let built = builder::build(&entities, &mut diagnostics);
    debug!(
        ?mode,
        entities = entities.len(),
        curves = built.curves.len(),
        regions = built.regions.len(),
        points = built.points.len(),
        "几何构建完成"
    );

    let mut candidates = built.regions;
    if mode == OutputMode::Strict && !built.curves.is_empty() {
        candidates.extend(topology::reconstruct(
            &built.curves,
            options.snap_tolerance,
            options.concavity,
        ));
    }

    let mut measured: Vec<(Region, RegionMetrics)> = Vec::with_capacity(candidates.len());
    for region in candidates {
        match metrics::validate(&region) {
            Ok(()) => {
                let region_metrics = metrics::measure(&region, options.scale);
                measured.push((region, region_metrics));
            }
            Err(message) => {
                debug!(layer = ?region.layer, %message, "丢弃无效区域");
                diagnostics.push(Diagnostic::new(
                    "REGION",
                    region.layer.clone(),
                    SkipReason::InvalidRegion { message },
                ));
            }
        }
    }

    if mode == OutputMode::Strict && measured.is_empty() {
        return Err(EngineError::NoGeometryFound {
            available_layers: layer_counts.keys().cloned().collect(),
        });
    }

    let collection = match mode {
        OutputMode::Preview => output::assemble(&measured, &built.curves, &built.points),
        OutputMode::Strict => output::assemble(&measured, &[], &[]),
    };
    let metadata = Metadata::new(
        &layer_counts,
        measured.iter().map(|(_, region_metrics)| *region_metrics).collect(),
    );
    debug!(
        features = collection.len(),
        constructions = metadata.total_constructions,
        total_area = metadata.total_area,
        diagnostics = diagnostics.len(),
        "解析完成"
    );

    Ok(ParseOutput {
        mode,
        collection,
        metadata,
        regions: measured.into_iter().map(|(region, _)| region).collect(),
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use plancad_core::document::PolylineVertex;
    use plancad_core::geometry::Point2;

    use super::*;
    use crate::model::RegionSource;

    fn rectangle(document: &mut Document, layer: &str, width: f64, height: f64) {
        document.add_lwpolyline(
            [(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)]
                .into_iter()
                .map(|(x, y)| PolylineVertex::new(Point2::new(x, y))),
            true,
            layer,
        );
    }

    #[test]
    fn preview_mode_returns_curves_and_labels() {
        let mut document = Document::new();
        rectangle(&mut document, "WALL", 10.0, 5.0);
        document.add_text(Point2::new(5.0, 2.5), "Sala", Some(0.3), "NOTES");

        let output = parse_document(&document, &ParseOptions::default()).expect("解析失败");
        assert_eq!(output.mode, OutputMode::Preview);
        assert!(output.regions.is_empty(), "预览模式不做拓扑重建");
        assert_eq!(output.collection.len(), 2);
        assert_eq!(output.metadata.total_constructions, 0);
    }

    #[test]
    fn strict_mode_emits_only_polygons() {
        let mut document = Document::new();
        rectangle(&mut document, "WALL", 10.0, 5.0);
        document.add_text(Point2::new(5.0, 2.5), "Sala", Some(0.3), "WALL");

        let options = ParseOptions::default().with_layer("wall");
        let output = parse_document(&document, &options).expect("解析失败");
        assert_eq!(output.mode, OutputMode::Strict);
        assert_eq!(output.regions.len(), 1);
        assert_eq!(output.regions[0].source, RegionSource::Topology);
        assert_eq!(output.collection.len(), 1);
        assert!((output.metadata.total_area - 50.0).abs() < 1e-9);
    }

    #[test]
    fn strict_mode_without_match_lists_layers() {
        let mut document = Document::new();
        rectangle(&mut document, "WALL", 1.0, 1.0);
        document.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), "NOTES");

        let options = ParseOptions::default().with_layer("ROOF");
        match parse_document(&document, &options) {
            Err(EngineError::NoGeometryFound { available_layers }) => {
                assert_eq!(available_layers, vec!["WALL", "NOTES"]);
            }
            other => panic!("期望 NoGeometryFound，实际 {other:?}"),
        }
    }

    #[test]
    fn invalid_options_are_rejected_before_reading() {
        let options = ParseOptions::default().with_scale(0.0);
        assert!(matches!(
            parse_path("/nonexistent/plan.dxf", &options),
            Err(EngineError::InvalidOptions(_))
        ));
    }

    #[test]
    fn unreadable_document_reports_path() {
        match parse_path("/nonexistent/plan.dxf", &ParseOptions::default()) {
            Err(EngineError::DocumentUnreadable { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/plan.dxf"));
            }
            other => panic!("期望 DocumentUnreadable，实际 {other:?}"),
        }
    }

    #[test]
    fn response_wraps_geojson_and_metadata() {
        let document = Document::new();
        let output = parse_document(&document, &ParseOptions::default()).expect("解析失败");
        let value: serde_json::Value =
            serde_json::from_str(&output.to_json().expect("序列化失败")).expect("JSON 无效");
        assert_eq!(value["geojson"]["type"], "FeatureCollection");
        assert_eq!(value["metadata"]["total_entities_found"], 0);
    }
}
