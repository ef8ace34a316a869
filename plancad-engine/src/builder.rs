use plancad_core::document::{Entity, EntityKind, Hatch, HatchEdge, HatchLoop, LwPolyline};
use plancad_core::geometry::Point2;
use tracing::trace;

use crate::diagnostics::{Diagnostic, SkipReason};
use crate::model::{Curve, PointFeature, Region, RegionSource};
use crate::tessellate::{self, SplineInput};

/// 判定相邻点重合的容差，用于拼接与去重。
const JOINT_EPSILON: f64 = 1e-9;

/// 单个实体构建出的几何。
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Curve(Curve),
    Region(Region),
    Point(PointFeature),
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub curves: Vec<Curve>,
    pub regions: Vec<Region>,
    pub points: Vec<PointFeature>,
}

impl BuildOutput {
    fn push(&mut self, geometry: Geometry) {
        match geometry {
            Geometry::Curve(curve) => self.curves.push(curve),
            Geometry::Region(region) => self.regions.push(region),
            Geometry::Point(point) => self.points.push(point),
        }
    }
}

/// 按输入顺序构建所有实体；失败只影响当前实体并记录诊断。
pub fn build(entities: &[Entity], diagnostics: &mut Vec<Diagnostic>) -> BuildOutput {
    let mut output = BuildOutput::default();
    for entity in entities {
        match build_entity(entity) {
            Ok(geometries) => {
                for geometry in geometries {
                    output.push(geometry);
                }
            }
            Err(reason) => {
                trace!(
                    kind = %entity.kind(),
                    layer = entity.layer_name(),
                    %reason,
                    "跳过实体"
                );
                diagnostics.push(Diagnostic::new(
                    entity.kind().dxf_name(),
                    Some(entity.layer_name().to_string()),
                    reason,
                ));
            }
        }
    }
    output
}

pub fn build_entity(entity: &Entity) -> Result<Vec<Geometry>, SkipReason> {
    let kind = entity.kind();
    let layer = entity.layer_name();
    match entity {
        Entity::Line(line) => {
            if line.start.coincides(line.end, JOINT_EPSILON) {
                return Err(SkipReason::Degenerate);
            }
            curve(vec![line.start, line.end], layer, kind)
        }
        Entity::LwPolyline(polyline) => curve(flatten_lwpolyline(polyline), layer, kind),
        Entity::Polyline(polyline) => {
            let mut points = polyline.vertices.clone();
            if polyline.is_closed {
                if let Some(first) = polyline.vertices.first() {
                    points.push(*first);
                }
            }
            curve(points, layer, kind)
        }
        Entity::Arc(arc) => {
            if arc.radius.abs() <= JOINT_EPSILON {
                return Err(SkipReason::Degenerate);
            }
            curve(
                tessellate::arc(arc.center, arc.radius, arc.start_angle, arc.end_angle),
                layer,
                kind,
            )
        }
        Entity::Circle(circle) => {
            if circle.radius.abs() <= JOINT_EPSILON {
                return Err(SkipReason::Degenerate);
            }
            curve(tessellate::circle(circle.center, circle.radius), layer, kind)
        }
        Entity::Ellipse(ellipse) => {
            if ellipse.major_axis.length() <= JOINT_EPSILON {
                return Err(SkipReason::Degenerate);
            }
            curve(
                tessellate::ellipse(
                    ellipse.center,
                    ellipse.major_axis,
                    ellipse.ratio,
                    ellipse.start_parameter,
                    ellipse.end_parameter,
                ),
                layer,
                kind,
            )
        }
        Entity::Spline(spline) => {
            let mut points = tessellate::spline(SplineInput {
                degree: spline.degree,
                control_points: &spline.control_points,
                knot_values: &spline.knot_values,
                weights: &spline.weights,
                fit_points: &spline.fit_points,
            });
            if spline.is_closed {
                close_points(&mut points);
            }
            curve(points, layer, kind)
        }
        Entity::Hatch(hatch) => hatch_regions(hatch),
        Entity::Text(text) => {
            let content = text.content.trim();
            if content.is_empty() {
                return Err(SkipReason::EmptyText);
            }
            ensure_finite(&[text.insert])?;
            Ok(vec![Geometry::Point(PointFeature {
                position: text.insert,
                text: Some(content.to_string()),
                height: text.height,
                layer: layer.to_string(),
            })])
        }
        Entity::Point(point) => {
            ensure_finite(&[point.position])?;
            Ok(vec![Geometry::Point(PointFeature {
                position: point.position,
                text: None,
                height: None,
                layer: layer.to_string(),
            })])
        }
        Entity::BlockReference(reference) => Err(SkipReason::Malformed {
            message: format!("块参照 {} 未被展开", reference.name),
        }),
    }
}

fn curve(points: Vec<Point2>, layer: &str, kind: EntityKind) -> Result<Vec<Geometry>, SkipReason> {
    ensure_finite(&points)?;
    let points = dedup_consecutive(points);
    if points.len() < 2 {
        return Err(SkipReason::Degenerate);
    }
    Ok(vec![Geometry::Curve(Curve::new(points, layer, kind))])
}

/// 逐段展开 bulge，共享的连接点只保留一次；闭合时使用末顶点的 bulge 补上闭合段。
fn flatten_lwpolyline(polyline: &LwPolyline) -> Vec<Point2> {
    let vertices = &polyline.vertices;
    let count = vertices.len();
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![vertices[0].position];
    }
    let segments = if polyline.is_closed { count } else { count - 1 };
    let mut points = Vec::new();
    for i in 0..segments {
        let current = &vertices[i];
        let next = &vertices[(i + 1) % count];
        append_joined(
            &mut points,
            tessellate::bulge_arc(current.position, next.position, current.bulge),
        );
    }
    points
}

fn hatch_regions(hatch: &Hatch) -> Result<Vec<Geometry>, SkipReason> {
    let mut regions = Vec::new();
    for boundary in &hatch.loops {
        let mut ring = flatten_hatch_loop(boundary);
        ensure_finite(&ring)?;
        if ring.len() > 1 && ring_is_closed(&ring) {
            ring.pop();
        }
        if ring.len() >= 3 {
            regions.push(Geometry::Region(Region::new(
                ring,
                Some(hatch.layer.clone()),
                RegionSource::Hatch,
            )));
        }
    }
    if regions.is_empty() {
        return Err(SkipReason::Degenerate);
    }
    Ok(regions)
}

fn flatten_hatch_loop(boundary: &HatchLoop) -> Vec<Point2> {
    let mut points = Vec::new();
    for edge in &boundary.edges {
        let edge_points = match edge {
            HatchEdge::Line { start, end } => vec![*start, *end],
            HatchEdge::PolylineSegment { start, end, bulge } => {
                tessellate::bulge_arc(*start, *end, *bulge)
            }
            HatchEdge::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => tessellate::arc_directed(
                *center,
                *radius,
                *start_angle,
                *end_angle,
                *is_counter_clockwise,
            ),
            HatchEdge::Ellipse {
                center,
                major_axis,
                minor_ratio,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => tessellate::ellipse_directed(
                *center,
                *major_axis,
                *minor_ratio,
                *start_angle,
                *end_angle,
                *is_counter_clockwise,
            ),
            HatchEdge::Spline {
                control_points,
                fit_points,
                knot_values,
                weights,
                degree,
                ..
            } => tessellate::spline(SplineInput {
                degree: *degree,
                control_points,
                knot_values,
                weights,
                fit_points,
            }),
        };
        append_joined(&mut points, edge_points);
    }
    dedup_consecutive(points)
}

fn append_joined(points: &mut Vec<Point2>, segment: Vec<Point2>) {
    let shares_joint = match (points.last(), segment.first()) {
        (Some(last), Some(first)) => last.coincides(*first, JOINT_EPSILON),
        _ => false,
    };
    points.extend(segment.into_iter().skip(usize::from(shares_joint)));
}

fn close_points(points: &mut Vec<Point2>) {
    if points.len() > 2 && !ring_is_closed(points) {
        points.push(points[0]);
    }
}

fn ring_is_closed(points: &[Point2]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => first.coincides(*last, JOINT_EPSILON),
        _ => false,
    }
}

fn dedup_consecutive(points: Vec<Point2>) -> Vec<Point2> {
    let mut result: Vec<Point2> = Vec::with_capacity(points.len());
    for point in points {
        match result.last() {
            Some(last) if last.coincides(point, JOINT_EPSILON) => {}
            _ => result.push(point),
        }
    }
    result
}

fn ensure_finite(points: &[Point2]) -> Result<(), SkipReason> {
    if points.iter().all(|point| point.is_finite()) {
        Ok(())
    } else {
        Err(SkipReason::Malformed {
            message: "坐标不是有限数".to_string(),
        })
    }
}
