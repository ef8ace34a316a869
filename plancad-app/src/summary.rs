use std::fmt::Write;
use std::path::Path;

use plancad_engine::{OutputMode, ParseOutput};

/// 生成按图层与区域汇总的文本报告。
pub fn render(file: &Path, output: &ParseOutput) -> String {
    let mut report = String::new();
    let metadata = &output.metadata;
    let mode = match output.mode {
        OutputMode::Preview => "预览",
        OutputMode::Strict => "严格",
    };

    // 写入 String 不会失败
    let _ = writeln!(report, "文件: {}", file.display());
    let _ = writeln!(report, "模式: {mode}");
    let _ = writeln!(report, "图层实体统计（共 {} 个）:", metadata.total_entities_found);
    for (layer, count) in &metadata.entities_per_layer {
        let _ = writeln!(report, "  - {layer}: {count}");
    }

    if output.regions.is_empty() {
        let _ = writeln!(report, "未识别出区域。");
    } else {
        let _ = writeln!(report, "区域:");
        for (index, (region, metrics)) in output
            .regions
            .iter()
            .zip(&metadata.constructions)
            .enumerate()
        {
            let _ = writeln!(
                report,
                "  #{} 面积={:.2} 周长={:.2} 顶点={} 图层={} 来源={}",
                index + 1,
                metrics.area,
                metrics.perimeter,
                metrics.vertices,
                region.layer.as_deref().unwrap_or("-"),
                region.source.as_str()
            );
        }
    }
    let _ = writeln!(
        report,
        "合计: 区域 {} 个, 面积 {:.2}, 周长 {:.2}, 顶点 {}",
        metadata.total_constructions,
        metadata.total_area,
        metadata.total_perimeter,
        metadata.total_vertices
    );

    if !output.diagnostics.is_empty() {
        let _ = writeln!(report, "跳过 {} 项:", output.diagnostics.len());
        for diagnostic in &output.diagnostics {
            let _ = writeln!(report, "  - {diagnostic}");
        }
    }
    report
}

