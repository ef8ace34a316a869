use std::f64::consts::{FRAC_PI_2, PI};
use std::io::Write;
use std::path::PathBuf;

use plancad_core::document::{Entity, EntityKind, HatchEdge};
use plancad_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_basic_entities_in_file_order() {
    let loader = DxfFacade::new();
    let doc = loader
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");

    let kinds: Vec<EntityKind> = doc.entities().map(Entity::kind).collect();
    // DIMENSION 不在读取范围内，被静默跳过
    assert_eq!(
        kinds,
        vec![
            EntityKind::Line,
            EntityKind::Circle,
            EntityKind::Arc,
            EntityKind::LwPolyline,
            EntityKind::Polyline,
            EntityKind::Text,
            EntityKind::Text,
            EntityKind::Point,
        ]
    );
    assert!(doc.issues().is_empty());

    let layers: Vec<&str> = doc
        .entities()
        .map(|entity| entity.layer_name())
        .collect();
    assert_eq!(
        layers,
        vec!["WALL", "COLUMN", "DOOR", "WALL", "ROOM", "NOTES", "NOTES", "SURVEY"]
    );
}

#[test]
fn load_arc_converts_degrees_to_radians() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");
    let arc = doc
        .entities()
        .find_map(|entity| match entity {
            Entity::Arc(arc) => Some(arc),
            _ => None,
        })
        .expect("未找到圆弧实体");
    assert!(arc.start_angle.abs() < 1e-12);
    assert!((arc.end_angle - FRAC_PI_2).abs() < 1e-12);
}

#[test]
fn load_polyline_with_bulge_preserves_value() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取带 bulge 的 DXF 失败");

    let polyline = doc
        .entities()
        .find_map(|entity| match entity {
            Entity::LwPolyline(polyline) => Some(polyline),
            _ => None,
        })
        .expect("未找到多段线实体");
    assert_eq!(polyline.vertices.len(), 2);
    assert!(!polyline.is_closed);
    assert!((polyline.vertices[0].bulge - 1.0).abs() < 1e-9);
    assert!((polyline.vertices[1].position.x() - 10.0).abs() < 1e-9);
    assert!(polyline.vertices[1].bulge.abs() < 1e-9);
}

#[test]
fn load_heavy_polyline_vertex_sequence() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");

    let polyline = doc
        .entities()
        .find_map(|entity| match entity {
            Entity::Polyline(polyline) => Some(polyline),
            _ => None,
        })
        .expect("未找到 POLYLINE 实体");
    assert!(polyline.is_closed);
    let coords: Vec<(f64, f64)> = polyline
        .vertices
        .iter()
        .map(|point| (point.x(), point.y()))
        .collect();
    assert_eq!(coords, vec![(0.0, 0.0), (4.0, 0.0), (4.0, 3.0)]);
}

#[test]
fn load_text_and_mtext_as_text_entities() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");

    let texts: Vec<_> = doc
        .entities()
        .filter_map(|entity| match entity {
            Entity::Text(text) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0].content, "Sala ⌀50");
    assert_eq!(texts[0].height, Some(0.25));
    assert_eq!(texts[1].content, "Line1\nLine2");
    assert!((texts[1].insert.x() - 5.0).abs() < 1e-9);
    assert!((texts[1].insert.y() - 6.0).abs() < 1e-9);
}

#[test]
fn load_block_definition_and_insert() {
    let doc = DxfFacade::new()
        .load(&fixture("block_insert.dxf"))
        .expect("读取块 DXF 失败");

    assert!(doc.block("*Model_Space").is_none(), "匿名块不应被收集");
    let block = doc.block("DOOR").expect("未找到块定义");
    assert_eq!(block.entities.len(), 2);
    assert!((block.base_point.x() - 1.0).abs() < 1e-9);

    let kinds: Vec<EntityKind> = doc.entities().map(Entity::kind).collect();
    assert_eq!(kinds, vec![EntityKind::BlockReference, EntityKind::Line]);

    let reference = doc
        .entities()
        .find_map(|entity| match entity {
            Entity::BlockReference(reference) => Some(reference),
            _ => None,
        })
        .expect("未找到块参照");
    assert_eq!(reference.name, "Door");
    assert_eq!(reference.layer, "DOORS");
    assert!((reference.scale.x() - 2.0).abs() < 1e-9);
    assert!((reference.rotation - FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn load_hatch_polyline_and_edge_boundaries() {
    let doc = DxfFacade::new()
        .load(&fixture("hatch_boundaries.dxf"))
        .expect("读取 HATCH DXF 失败");

    let hatch = doc
        .entities()
        .find_map(|entity| match entity {
            Entity::Hatch(hatch) => Some(hatch),
            _ => None,
        })
        .expect("未找到 HATCH 实体");
    assert!(hatch.is_solid);
    assert_eq!(hatch.layer, "FLOOR");
    assert_eq!(hatch.loops.len(), 2, "种子点不应被当作边界");

    let polyline_loop = &hatch.loops[0];
    assert!(polyline_loop.is_polyline);
    assert_eq!(polyline_loop.edges.len(), 4);

    let edge_loop = &hatch.loops[1];
    assert!(!edge_loop.is_polyline);
    assert_eq!(edge_loop.edges.len(), 2);
    match &edge_loop.edges[1] {
        HatchEdge::Arc {
            start_angle,
            end_angle,
            is_counter_clockwise,
            ..
        } => {
            assert!(!is_counter_clockwise);
            assert!(start_angle.abs() < 1e-12);
            assert!((end_angle + PI).abs() < 1e-12);
        }
        other => panic!("期望圆弧边，实际 {other:?}"),
    }
}

#[test]
fn malformed_entities_are_recorded_and_skipped() {
    let doc = DxfFacade::new()
        .load(&fixture("malformed_entities.dxf"))
        .expect("实体级错误不应中断读取");

    assert_eq!(doc.entity_count(), 1);
    let issues = doc.issues();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].entity_type, "LINE");
    assert_eq!(issues[0].layer.as_deref(), Some("BROKEN"));
    assert_eq!(issues[1].entity_type, "CIRCLE");
    assert_eq!(issues[1].layer.as_deref(), Some("MISSING"));
    assert!(issues[1].message.contains("半径"));
}

#[test]
fn truncated_stream_is_a_document_error() {
    let source = "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\n";
    match DxfFacade::new().parse_str(source) {
        Err(IoError::InvalidDocument(message)) => assert!(message.contains("缺少")),
        other => panic!("期望 InvalidDocument，实际 {other:?}"),
    }
}

#[test]
fn missing_endsec_is_a_document_error() {
    let source = "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\nA\n10\n0\n20\n0\n11\n1\n21\n1\n";
    assert!(matches!(
        DxfFacade::new().parse_str(source),
        Err(IoError::InvalidDocument(_))
    ));
}

#[test]
fn empty_or_blank_input_is_a_document_error() {
    for source in ["", "\n\n", "   \n"] {
        match DxfFacade::new().parse_str(source) {
            Err(IoError::InvalidDocument(message)) => assert!(message.contains("SECTION")),
            other => panic!("期望 InvalidDocument，实际 {other:?}"),
        }
    }
}

#[test]
fn empty_file_fails_to_load() {
    let file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
    assert!(matches!(
        DxfFacade::new().load(file.path()),
        Err(IoError::InvalidDocument(_))
    ));
}

#[test]
fn eof_only_document_is_empty_but_valid() {
    let doc = DxfFacade::new()
        .parse_str("0\nEOF\n")
        .expect("读取 DXF 失败");
    assert_eq!(doc.entity_count(), 0);
}

#[test]
fn binary_dxf_is_rejected() {
    let mut bytes = b"AutoCAD Binary DXF\r\n\x1a\x00".to_vec();
    bytes.extend_from_slice(&[0u8; 16]);
    assert!(matches!(
        DxfFacade::new().parse_bytes(&bytes),
        Err(IoError::UnsupportedFeature(_))
    ));
}

#[test]
fn missing_file_reports_path() {
    let path = PathBuf::from("/nonexistent/plancad/plan.dxf");
    match DxfFacade::new().load(&path) {
        Err(IoError::ReadError { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("期望 ReadError，实际 {other:?}"),
    }
}

#[test]
fn latin1_bytes_are_decoded_lossily() {
    let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
    file.write_all(b"0\nSECTION\n2\nENTITIES\n0\nTEXT\n8\nNOTES\n10\n0\n20\n0\n1\nCozinha \xe1rea\n0\nENDSEC\n0\nEOF\n")
        .expect("写入临时文件失败");

    let doc = DxfFacade::new().load(file.path()).expect("读取 DXF 失败");
    let text = doc
        .entities()
        .find_map(|entity| match entity {
            Entity::Text(text) => Some(text),
            _ => None,
        })
        .expect("未找到文字实体");
    assert!(text.content.starts_with("Cozinha "));
    assert!(text.content.contains('\u{FFFD}'));
    assert_eq!(text.height, None);
}

#[test]
fn document_serializes_to_json() {
    let doc = DxfFacade::new()
        .load(&fixture("block_insert.dxf"))
        .expect("读取块 DXF 失败");
    let value = serde_json::to_value(&doc).expect("序列化文档失败");
    let entities = value["entities"].as_array().expect("entities 应为数组");
    assert_eq!(entities.len(), 2);
    assert!(entities[0].get("BlockReference").is_some());
}
