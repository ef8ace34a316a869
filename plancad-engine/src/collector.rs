use indexmap::IndexMap;
use plancad_core::document::{BlockReference, Document, Entity};
use plancad_core::geometry::Transform2;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, SkipReason};
use crate::options::TargetLayers;

/// DXF 中表示“随块”的默认图层。
const BYBLOCK_LAYER: &str = "0";

/// 收集结果：展开后的世界坐标实体、按首次出现顺序的图层计数以及诊断。
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub entities: Vec<Entity>,
    pub layer_counts: IndexMap<String, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Collection {
    /// 所有出现过的图层名，顺序与首次出现一致。
    pub fn layers(&self) -> Vec<String> {
        self.layer_counts.keys().cloned().collect()
    }
}

/// 遍历模型空间并展开块参照。
///
/// 图层计数在过滤之前完成，因此反映整张图纸；输出实体只保留目标图层。
/// 块展开受 `max_depth` 限制，同时检测当前展开栈上的重复块名。
pub fn collect(document: &Document, targets: &TargetLayers, max_depth: usize) -> Collection {
    let mut collector = Collector {
        document,
        targets,
        max_depth,
        stack: Vec::new(),
        output: Collection::default(),
    };

    for issue in document.issues() {
        collector.output.diagnostics.push(Diagnostic::new(
            issue.entity_type.clone(),
            issue.layer.clone(),
            SkipReason::Malformed {
                message: issue.message.clone(),
            },
        ));
    }

    for entity in document.entities() {
        collector.visit(entity, &Transform2::IDENTITY, None);
    }

    let output = collector.output;
    debug!(
        collected = output.entities.len(),
        layers = output.layer_counts.len(),
        diagnostics = output.diagnostics.len(),
        "实体收集完成"
    );
    output
}

struct Collector<'a> {
    document: &'a Document,
    targets: &'a TargetLayers,
    max_depth: usize,
    /// 当前展开链上的块名（大写）。
    stack: Vec<String>,
    output: Collection,
}

impl Collector<'_> {
    fn visit(&mut self, entity: &Entity, transform: &Transform2, inherited_layer: Option<&str>) {
        let layer = effective_layer(entity.layer_name(), inherited_layer);
        if let Entity::BlockReference(reference) = entity {
            self.expand(reference, transform, &layer);
            return;
        }

        *self.output.layer_counts.entry(layer.clone()).or_insert(0) += 1;
        if !self.targets.admits(&layer) {
            return;
        }

        let mut world = if *transform == Transform2::IDENTITY {
            entity.clone()
        } else {
            entity.transformed(transform)
        };
        if world.layer_name() != layer {
            world.set_layer(layer);
        }
        self.output.entities.push(world);
    }

    fn expand(&mut self, reference: &BlockReference, parent: &Transform2, layer: &str) {
        let key = reference.name.to_uppercase();
        let depth = self.stack.len();
        if depth >= self.max_depth {
            warn!(block = %reference.name, depth, "块嵌套超过深度上限，跳过");
            self.skip(
                layer,
                SkipReason::BlockDepthExceeded {
                    name: reference.name.clone(),
                    depth: self.max_depth,
                },
            );
            return;
        }
        if self.stack.contains(&key) {
            warn!(block = %reference.name, "检测到循环块引用，跳过");
            self.skip(
                layer,
                SkipReason::CyclicBlock {
                    name: reference.name.clone(),
                },
            );
            return;
        }
        let Some(definition) = self.document.block(&reference.name) else {
            warn!(block = %reference.name, "块定义不存在，跳过");
            self.skip(
                layer,
                SkipReason::UnresolvedBlock {
                    name: reference.name.clone(),
                },
            );
            return;
        };

        let transform = parent.then_inner(reference.placement(definition.base_point));
        self.stack.push(key);
        for child in &definition.entities {
            self.visit(child, &transform, Some(layer));
        }
        self.stack.pop();
    }

    fn skip(&mut self, layer: &str, reason: SkipReason) {
        self.output.diagnostics.push(Diagnostic::new(
            "INSERT",
            Some(layer.to_string()),
            reason,
        ));
    }
}

/// 块内位于 `0` 图层的实体继承放置它的 INSERT 的图层。
fn effective_layer(own: &str, inherited: Option<&str>) -> String {
    match inherited {
        Some(parent) if own == BYBLOCK_LAYER => parent.to_string(),
        _ => own.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use plancad_core::document::{BlockDefinition, Line};
    use plancad_core::geometry::{Point2, Vector2};

    use super::*;
    use crate::options::LayerFilter;

    fn line(layer: &str, start: (f64, f64), end: (f64, f64)) -> Entity {
        Entity::Line(Line {
            start: Point2::new(start.0, start.1),
            end: Point2::new(end.0, end.1),
            layer: layer.to_string(),
        })
    }

    fn reference(name: &str, layer: &str, insert: (f64, f64)) -> Entity {
        Entity::BlockReference(BlockReference {
            name: name.to_string(),
            insert: Point2::new(insert.0, insert.1),
            scale: Vector2::new(1.0, 1.0),
            rotation: 0.0,
            layer: layer.to_string(),
        })
    }

    #[test]
    fn counts_layers_before_filtering() {
        let mut document = Document::new();
        document.add_entity(line("WALL", (0.0, 0.0), (1.0, 0.0)));
        document.add_entity(line("NOTES", (0.0, 1.0), (1.0, 1.0)));
        document.add_entity(line("WALL", (1.0, 0.0), (1.0, 1.0)));

        let targets = TargetLayers::Only(LayerFilter::new(["wall"]));
        let collection = collect(&document, &targets, 16);
        assert_eq!(collection.entities.len(), 2);
        assert_eq!(collection.layers(), vec!["WALL", "NOTES"]);
        assert_eq!(collection.layer_counts["WALL"], 2);
        assert_eq!(collection.layer_counts["NOTES"], 1);
    }

    #[test]
    fn expands_nested_blocks_with_layer_inheritance() {
        let mut document = Document::new();
        document.add_block_definition(BlockDefinition {
            name: "Leaf".to_string(),
            base_point: Point2::new(0.0, 0.0),
            entities: vec![line("0", (0.0, 0.0), (1.0, 0.0))],
        });
        document.add_block_definition(BlockDefinition {
            name: "Door".to_string(),
            base_point: Point2::new(0.0, 0.0),
            entities: vec![reference("LEAF", "0", (1.0, 0.0)), line("FRAME", (0.0, 0.0), (0.0, 1.0))],
        });
        document.add_entity(reference("door", "DOORS", (10.0, 5.0)));

        let collection = collect(&document, &TargetLayers::All, 16);
        assert_eq!(collection.entities.len(), 2);
        assert_eq!(collection.entities[0].layer_name(), "DOORS");
        assert_eq!(collection.entities[1].layer_name(), "FRAME");
        match &collection.entities[0] {
            Entity::Line(line) => {
                assert!(line.start.coincides(Point2::new(11.0, 5.0), 1e-9));
                assert!(line.end.coincides(Point2::new(12.0, 5.0), 1e-9));
            }
            other => panic!("期望直线，实际 {other:?}"),
        }
        assert!(collection.diagnostics.is_empty());
    }

    #[test]
    fn cyclic_blocks_are_skipped_with_diagnostic() {
        let mut document = Document::new();
        document.add_block_definition(BlockDefinition {
            name: "A".to_string(),
            base_point: Point2::new(0.0, 0.0),
            entities: vec![line("WALL", (0.0, 0.0), (1.0, 0.0)), reference("B", "0", (0.0, 0.0))],
        });
        document.add_block_definition(BlockDefinition {
            name: "B".to_string(),
            base_point: Point2::new(0.0, 0.0),
            entities: vec![reference("a", "0", (0.0, 0.0))],
        });
        document.add_entity(reference("A", "PLAN", (0.0, 0.0)));

        let collection = collect(&document, &TargetLayers::All, 16);
        assert_eq!(collection.entities.len(), 1);
        assert_eq!(collection.diagnostics.len(), 1);
        assert!(matches!(
            &collection.diagnostics[0].reason,
            SkipReason::CyclicBlock { name } if name == "a"
        ));
    }

    #[test]
    fn depth_limit_stops_expansion() {
        let mut document = Document::new();
        for level in 0..4 {
            document.add_block_definition(BlockDefinition {
                name: format!("L{level}"),
                base_point: Point2::new(0.0, 0.0),
                entities: vec![
                    line("WALL", (0.0, 0.0), (1.0, 0.0)),
                    reference(&format!("L{}", level + 1), "0", (1.0, 0.0)),
                ],
            });
        }
        document.add_entity(reference("L0", "PLAN", (0.0, 0.0)));

        let collection = collect(&document, &TargetLayers::All, 2);
        assert_eq!(collection.entities.len(), 2);
        assert!(matches!(
            &collection.diagnostics[0].reason,
            SkipReason::BlockDepthExceeded { name, depth: 2 } if name == "L2"
        ));
    }

    #[test]
    fn unresolved_block_is_reported() {
        let mut document = Document::new();
        document.add_block_reference("MISSING", Point2::new(0.0, 0.0), "DOORS");
        document.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), "WALL");

        let collection = collect(&document, &TargetLayers::All, 16);
        assert_eq!(collection.entities.len(), 1);
        assert_eq!(collection.diagnostics[0].entity, "INSERT");
        assert_eq!(collection.diagnostics[0].layer.as_deref(), Some("DOORS"));
        assert!(matches!(
            collection.diagnostics[0].reason,
            SkipReason::UnresolvedBlock { .. }
        ));
        assert!(!collection.layer_counts.contains_key("DOORS"));
    }
}
