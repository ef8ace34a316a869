//! 拓扑重建：由曲线构成的平面线网 → 闭合区域。
//!
//! 先做精确多边形化（吸附、打断、去重、剔除桥边、面追踪），
//! 得不到任何面时退回到全部点的凹包近似。

use std::collections::{HashMap, HashSet};

use geo::{Area, ConcaveHull, Coord, LineString, MultiPoint, Point, Polygon};
use glam::DVec2;
use indexmap::IndexMap;
use petgraph::algo::bridges;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use plancad_core::geometry::Point2;
use tracing::debug;

use crate::model::{Curve, Region, RegionSource};

/// 先精确多边形化，失败时使用凹包近似。
pub fn reconstruct(curves: &[Curve], snap_tolerance: f64, concavity: f64) -> Vec<Region> {
    let regions = polygonize(curves, snap_tolerance);
    if !regions.is_empty() {
        return regions;
    }
    debug!(curves = curves.len(), "精确多边形化没有得到闭合面，改用凹包近似");
    alpha_shape(curves, concavity)
}

/// 精确多边形化，返回所有有界面（逆时针外环，不含闭合重复点）。
pub fn polygonize(curves: &[Curve], snap_tolerance: f64) -> Vec<Region> {
    let mut grid = SnapGrid::new(snap_tolerance);
    let segments = snapped_segments(curves, &mut grid);
    let edges = node_segments(&segments, &mut grid);
    let graph = without_bridges(&wall_graph(&grid.points, &edges));
    let faces = trace_faces(&graph, snap_tolerance * snap_tolerance);
    debug!(
        segments = segments.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        faces = faces.len(),
        "多边形化完成"
    );
    faces
}

/// 对所有曲线点（去重后）求凹包；少于三个不共线的点时没有结果。
pub fn alpha_shape(curves: &[Curve], concavity: f64) -> Vec<Region> {
    let mut seen = HashSet::new();
    let mut points = Vec::new();
    for curve in curves {
        for point in &curve.points {
            if seen.insert((point.x().to_bits(), point.y().to_bits())) {
                points.push(Point::new(point.x(), point.y()));
            }
        }
    }
    if points.len() < 3 {
        return Vec::new();
    }

    let hull = MultiPoint::new(points).concave_hull(concavity);
    if hull.unsigned_area() <= f64::EPSILON {
        return Vec::new();
    }
    let mut ring: Vec<Point2> = hull
        .exterior()
        .coords()
        .map(|coord| Point2::new(coord.x, coord.y))
        .collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Vec::new();
    }
    let layer = common_layer(curves.iter().map(|curve| curve.layer.as_str()));
    vec![Region::new(ring, layer, RegionSource::Alpha)]
}

fn common_layer<'a>(mut layers: impl Iterator<Item = &'a str>) -> Option<String> {
    let first = layers.next()?;
    if layers.all(|layer| layer == first) {
        Some(first.to_string())
    } else {
        None
    }
}

/// 网格吸附：同一格内、或相邻格内距离不超过容差的点合并到首次出现的坐标。
struct SnapGrid {
    tolerance: f64,
    index: HashMap<(i64, i64), usize>,
    points: Vec<Point2>,
}

impl SnapGrid {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            index: HashMap::new(),
            points: Vec::new(),
        }
    }

    fn snap(&mut self, point: Point2) -> usize {
        let (cx, cy) = (
            (point.x() / self.tolerance).round() as i64,
            (point.y() / self.tolerance).round() as i64,
        );
        if let Some(&index) = self.index.get(&(cx, cy)) {
            return index;
        }
        // 格边界两侧的近邻点
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(&index) = self.index.get(&(cx + dx, cy + dy)) {
                    if self.points[index].coincides(point, self.tolerance) {
                        return index;
                    }
                }
            }
        }
        self.points.push(point);
        self.index.insert((cx, cy), self.points.len() - 1);
        self.points.len() - 1
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    start: usize,
    end: usize,
    layer: &'a str,
}

fn snapped_segments<'a>(curves: &'a [Curve], grid: &mut SnapGrid) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    for curve in curves {
        for (start, end) in curve.segments() {
            let start = grid.snap(start);
            let end = grid.snap(end);
            if start != end {
                segments.push(Segment {
                    start,
                    end,
                    layer: &curve.layer,
                });
            }
        }
    }
    segments
}

/// 在所有交点与共线重叠端点处打断线段，并按无向边去重（保留首个图层）。
fn node_segments<'a>(
    segments: &[Segment<'a>],
    grid: &mut SnapGrid,
) -> IndexMap<(usize, usize), &'a str> {
    let tolerance = grid.tolerance;
    let endpoints: Vec<(DVec2, DVec2)> = segments
        .iter()
        .map(|segment| {
            (
                grid.points[segment.start].as_vec2(),
                grid.points[segment.end].as_vec2(),
            )
        })
        .collect();

    let mut splits: Vec<Vec<DVec2>> = vec![Vec::new(); segments.len()];
    for i in 0..endpoints.len() {
        for j in (i + 1)..endpoints.len() {
            let (a0, a1) = endpoints[i];
            let (b0, b1) = endpoints[j];
            match intersect(a0, a1, b0, b1, tolerance) {
                Intersection::None => {}
                Intersection::Point(point) => {
                    splits[i].push(point);
                    splits[j].push(point);
                }
                Intersection::Overlap => {
                    for point in [b0, b1] {
                        if within_segment(a0, a1, point, tolerance) {
                            splits[i].push(point);
                        }
                    }
                    for point in [a0, a1] {
                        if within_segment(b0, b1, point, tolerance) {
                            splits[j].push(point);
                        }
                    }
                }
            }
        }
    }

    let mut edges: IndexMap<(usize, usize), &'a str> = IndexMap::new();
    for ((segment, (start, end)), points) in segments.iter().zip(&endpoints).zip(&splits) {
        let direction = *end - *start;
        let length_squared = direction.length_squared();
        let mut cuts: Vec<(f64, DVec2)> = points
            .iter()
            .map(|point| ((*point - *start).dot(direction) / length_squared, *point))
            .collect();
        cuts.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut previous = segment.start;
        for (_, point) in cuts {
            let node = grid.snap(Point2::from_vec(point));
            if node != previous && node != segment.end {
                insert_edge(&mut edges, previous, node, segment.layer);
                previous = node;
            }
        }
        if previous != segment.end {
            insert_edge(&mut edges, previous, segment.end, segment.layer);
        }
    }
    edges
}

fn insert_edge<'a>(
    edges: &mut IndexMap<(usize, usize), &'a str>,
    a: usize,
    b: usize,
    layer: &'a str,
) {
    let key = if a < b { (a, b) } else { (b, a) };
    edges.entry(key).or_insert(layer);
}

enum Intersection {
    None,
    Point(DVec2),
    Overlap,
}

fn intersect(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2, tolerance: f64) -> Intersection {
    let r = a1 - a0;
    let s = b1 - b0;
    let denominator = r.perp_dot(s);
    let offset = b0 - a0;
    let r_length = r.length();
    let s_length = s.length();

    if denominator.abs() <= f64::EPSILON * r_length * s_length {
        // 平行：只有共线时才可能重叠
        if offset.perp_dot(r).abs() / r_length <= tolerance {
            return Intersection::Overlap;
        }
        return Intersection::None;
    }

    let t = offset.perp_dot(s) / denominator;
    let u = offset.perp_dot(r) / denominator;
    let t_slack = tolerance / r_length;
    let u_slack = tolerance / s_length;
    if t >= -t_slack && t <= 1.0 + t_slack && u >= -u_slack && u <= 1.0 + u_slack {
        Intersection::Point(a0 + r * t.clamp(0.0, 1.0))
    } else {
        Intersection::None
    }
}

fn within_segment(start: DVec2, end: DVec2, point: DVec2, tolerance: f64) -> bool {
    let direction = end - start;
    let length_squared = direction.length_squared();
    let t = (point - start).dot(direction) / length_squared;
    let slack = tolerance / length_squared.sqrt();
    t > slack && t < 1.0 - slack
}

/// 节点为吸附后的坐标，边权为来源图层。
type WallGraph<'a> = UnGraph<Point2, &'a str>;

fn wall_graph<'a>(points: &[Point2], edges: &IndexMap<(usize, usize), &'a str>) -> WallGraph<'a> {
    let mut graph = WallGraph::with_capacity(points.len(), edges.len());
    let nodes: Vec<NodeIndex> = points.iter().map(|point| graph.add_node(*point)).collect();
    for (&(a, b), &layer) in edges {
        graph.add_edge(nodes[a], nodes[b], layer);
    }
    graph
}

/// 移除所有桥边（悬挂线与孤立树枝都属于桥），节点下标保持不变。
fn without_bridges<'a>(graph: &WallGraph<'a>) -> WallGraph<'a> {
    let cut: HashSet<EdgeIndex> = bridges(graph).map(|edge| edge.id()).collect();
    graph.filter_map(
        |_, point| Some(*point),
        |edge, layer| (!cut.contains(&edge)).then_some(*layer),
    )
}

/// 每个节点的邻接按极角升序排列：(邻点, 边)。
fn rotation_system(graph: &WallGraph<'_>) -> Vec<Vec<(NodeIndex, EdgeIndex)>> {
    graph
        .node_indices()
        .map(|node| {
            let origin = graph[node].as_vec2();
            let mut neighbors: Vec<(NodeIndex, EdgeIndex)> = graph
                .edges(node)
                .map(|edge| {
                    let other = if edge.source() == node {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    (other, edge.id())
                })
                .collect();
            neighbors.sort_by(|a, b| {
                let da = graph[a.0].as_vec2() - origin;
                let db = graph[b.0].as_vec2() - origin;
                da.y.atan2(da.x).total_cmp(&db.y.atan2(db.x))
            });
            neighbors
        })
        .collect()
}

/// 左手面追踪，保留有向面积为正（逆时针）的面。
///
/// 与外环只在一点相接的闭合环（如贴墙的柱子）会让面追踪两次经过该点，
/// 这样的面在重复点处拆成简单子环后分别判定。
fn trace_faces(graph: &WallGraph<'_>, min_area: f64) -> Vec<Region> {
    let rotation = rotation_system(graph);
    let mut visited: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    let mut faces = Vec::new();
    for edge in graph.edge_references() {
        for (from, to) in [
            (edge.source(), edge.target()),
            (edge.target(), edge.source()),
        ] {
            if visited.contains(&(from, to)) {
                continue;
            }
            let mut walk: Vec<(NodeIndex, &str)> = Vec::new();
            let (mut u, mut v) = (from, to);
            loop {
                if !visited.insert((u, v)) {
                    break;
                }
                let neighbors = &rotation[v.index()];
                let Some(position) = neighbors.iter().position(|&(node, _)| node == u) else {
                    break;
                };
                walk.push((u, graph[neighbors[position].1]));
                let (next, _) = neighbors[(position + neighbors.len() - 1) % neighbors.len()];
                u = v;
                v = next;
            }
            if (u, v) != (from, to) {
                continue;
            }
            for ring in split_pinched(walk) {
                if ring.len() < 3 {
                    continue;
                }
                let exterior: Vec<Point2> = ring.iter().map(|&(node, _)| graph[node]).collect();
                if signed_area(&exterior) > min_area {
                    faces.push(Region::new(
                        exterior,
                        common_layer(ring.into_iter().map(|(_, layer)| layer)),
                        RegionSource::Topology,
                    ));
                }
            }
        }
    }
    faces
}

/// 在重复经过的节点处把闭合路径拆成互不重复的子环；每步记录起点与出边图层。
fn split_pinched<'a>(walk: Vec<(NodeIndex, &'a str)>) -> Vec<Vec<(NodeIndex, &'a str)>> {
    let mut rings = Vec::new();
    let mut path: Vec<(NodeIndex, &'a str)> = Vec::with_capacity(walk.len());
    for step in walk {
        if let Some(position) = path.iter().position(|&(node, _)| node == step.0) {
            rings.push(path.split_off(position));
        }
        path.push(step);
    }
    rings.push(path);
    rings
}

fn signed_area(ring: &[Point2]) -> f64 {
    let coords: Vec<Coord> = ring
        .iter()
        .chain(ring.first())
        .map(|point| Coord {
            x: point.x(),
            y: point.y(),
        })
        .collect();
    Polygon::new(LineString::new(coords), Vec::new()).signed_area()
}

#[cfg(test)]
mod tests {
    use plancad_core::document::EntityKind;

    use super::*;

    fn polyline(layer: &str, points: &[(f64, f64)]) -> Curve {
        Curve::new(
            points.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            layer,
            EntityKind::LwPolyline,
        )
    }

    fn area(region: &Region) -> f64 {
        signed_area(&region.exterior)
    }

    #[test]
    fn unit_square_gives_single_face() {
        let curves = vec![polyline(
            "ROOM",
            &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)],
        )];
        let regions = polygonize(&curves, 1e-6);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].vertex_count(), 4);
        assert!((area(&regions[0]) - 1.0).abs() < 1e-12);
        assert_eq!(regions[0].layer.as_deref(), Some("ROOM"));
        assert_eq!(regions[0].source, RegionSource::Topology);
    }

    #[test]
    fn shared_wall_splits_two_rooms() {
        let curves = vec![
            polyline(
                "WALL",
                &[(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (0.0, 10.0), (0.0, 0.0)],
            ),
            polyline("WALL", &[(10.0, 0.0), (10.0, 10.0)]),
        ];
        let regions = polygonize(&curves, 1e-6);
        assert_eq!(regions.len(), 2);
        for region in &regions {
            assert!((area(region) - 100.0).abs() < 1e-9);
            assert_eq!(region.vertex_count(), 4);
        }
    }

    #[test]
    fn dangling_lines_are_removed() {
        let curves = vec![
            polyline(
                "WALL",
                &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)],
            ),
            polyline("WALL", &[(4.0, 2.0), (8.0, 2.0)]),
            polyline("NOTES", &[(20.0, 20.0), (25.0, 25.0)]),
        ];
        let regions = polygonize(&curves, 1e-6);
        assert_eq!(regions.len(), 1);
        // 悬挂线在 (4,2) 打断了右墙，外环多出一个顶点
        assert_eq!(regions[0].vertex_count(), 5);
        assert!((area(&regions[0]) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_lines_are_noded() {
        // 四条相互穿过的线围成中间的 2×2 方格
        let curves = vec![
            polyline("A", &[(-1.0, 0.0), (3.0, 0.0)]),
            polyline("A", &[(-1.0, 2.0), (3.0, 2.0)]),
            polyline("B", &[(0.0, -1.0), (0.0, 3.0)]),
            polyline("B", &[(2.0, -1.0), (2.0, 3.0)]),
        ];
        let regions = polygonize(&curves, 1e-6);
        assert_eq!(regions.len(), 1);
        assert!((area(&regions[0]) - 4.0).abs() < 1e-9);
        assert_eq!(regions[0].layer, None, "混合图层的面不应带图层");
    }

    #[test]
    fn collinear_overlap_is_merged() {
        let curves = vec![
            polyline("WALL", &[(0.0, 0.0), (6.0, 0.0)]),
            polyline("WALL", &[(3.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0), (0.0, 0.0)]),
        ];
        let regions = polygonize(&curves, 1e-6);
        assert_eq!(regions.len(), 1);
        assert!((area(&regions[0]) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn nearly_closed_ring_is_snapped() {
        let curves = vec![polyline(
            "ROOM",
            &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 1e-8)],
        )];
        let regions = polygonize(&curves, 1e-6);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].vertex_count(), 4);
    }

    #[test]
    fn column_touching_wall_keeps_the_room() {
        // 菱形柱子的一个顶点落在房间下墙上
        let curves = vec![
            polyline(
                "WALL",
                &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)],
            ),
            polyline(
                "WALL",
                &[(5.0, 0.0), (6.0, 1.0), (5.0, 2.0), (4.0, 1.0), (5.0, 0.0)],
            ),
        ];
        let mut areas: Vec<f64> = polygonize(&curves, 1e-6).iter().map(area).collect();
        areas.sort_by(f64::total_cmp);
        assert_eq!(areas.len(), 2);
        assert!((areas[0] - 2.0).abs() < 1e-9);
        assert!((areas[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn touching_squares_outside_each_other_give_two_faces() {
        let curves = vec![
            polyline("WALL", &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
            polyline("WALL", &[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0), (2.0, 2.0)]),
        ];
        let regions = polygonize(&curves, 1e-6);
        assert_eq!(regions.len(), 2);
        for region in &regions {
            assert_eq!(region.vertex_count(), 4);
            assert!((area(region) - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn pinched_walk_splits_into_simple_rings() {
        let n = NodeIndex::new;
        let walk = vec![
            (n(0), "A"),
            (n(1), "A"),
            (n(2), "B"),
            (n(3), "B"),
            (n(1), "A"),
            (n(4), "A"),
        ];
        let rings = split_pinched(walk);
        let nodes: Vec<Vec<usize>> = rings
            .iter()
            .map(|ring| ring.iter().map(|(node, _)| node.index()).collect())
            .collect();
        assert_eq!(nodes, vec![vec![1, 2, 3], vec![0, 1, 4]]);
        assert_eq!(rings[0][0].1, "A");
        assert_eq!(rings[0][1].1, "B");
    }

    #[test]
    fn snap_merges_points_across_cell_boundary() {
        let mut grid = SnapGrid::new(1e-6);
        let first = grid.snap(Point2::new(0.4e-6, 0.0));
        // 0.4e-6 与 1.2e-6 分别落在相邻两格，但相距不足容差
        assert_eq!(grid.snap(Point2::new(1.2e-6, 0.0)), first);
        assert_eq!(grid.snap(Point2::new(0.0, 0.0)), first);
        assert_ne!(grid.snap(Point2::new(3.0e-6, 0.0)), first);
        assert_eq!(grid.points.len(), 2);
        assert_eq!(grid.points[first], Point2::new(0.4e-6, 0.0));
    }

    #[test]
    fn open_outline_falls_back_to_concave_hull() {
        let curves = vec![polyline(
            "WALL",
            &[(0.0, 10.0), (0.0, 0.0), (10.0, 0.0), (10.0, 10.0)],
        )];
        assert!(polygonize(&curves, 1e-6).is_empty());
        let regions = reconstruct(&curves, 1e-6, 0.01);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].source, RegionSource::Alpha);
        assert!((area(&regions[0]).abs() - 100.0).abs() < 1e-9);
        assert_eq!(regions[0].vertex_count(), 4);
    }

    #[test]
    fn collinear_points_give_no_hull() {
        let curves = vec![polyline("WALL", &[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])];
        assert!(alpha_shape(&curves, 0.01).is_empty());
    }
}
