use std::collections::HashSet;

use geo::{Area, Coord, EuclideanLength, LineString, Polygon};
use serde::Serialize;

use crate::model::Region;

/// 面积低于该值的区域视为退化。
const MIN_REGION_AREA: f64 = 1e-12;

/// 单个区域的度量，面积与周长已按调用方比例换算。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionMetrics {
    pub area: f64,
    pub perimeter: f64,
    pub vertices: usize,
}

fn polygon(region: &Region) -> Polygon<f64> {
    let coords: Vec<Coord> = region
        .closed_ring()
        .into_iter()
        .map(|point| Coord {
            x: point.x(),
            y: point.y(),
        })
        .collect();
    Polygon::new(LineString::new(coords), Vec::new())
}

/// 检查区域是否为有效的简单多边形。
pub fn validate(region: &Region) -> Result<(), String> {
    if region.vertex_count() < 3 {
        return Err(format!("区域只有 {} 个顶点", region.vertex_count()));
    }
    if region.exterior.iter().any(|point| !point.is_finite()) {
        return Err("区域坐标不是有限数".to_string());
    }
    let mut seen = HashSet::new();
    for point in &region.exterior {
        if !seen.insert((point.x().to_bits(), point.y().to_bits())) {
            return Err("外环存在重复顶点".to_string());
        }
    }
    if polygon(region).unsigned_area() <= MIN_REGION_AREA {
        return Err("区域面积接近零".to_string());
    }
    if self_intersects(region) {
        return Err("外环自相交".to_string());
    }
    Ok(())
}

pub fn measure(region: &Region, scale: f64) -> RegionMetrics {
    let polygon = polygon(region);
    RegionMetrics {
        area: polygon.unsigned_area() * scale * scale,
        perimeter: polygon.exterior().euclidean_length() * scale,
        vertices: region.vertex_count(),
    }
}

/// 非相邻边之间的相交检测。
fn self_intersects(region: &Region) -> bool {
    let ring = region.closed_ring();
    let count = ring.len() - 1;
    for i in 0..count {
        for j in (i + 1)..count {
            // 相邻边共享端点，跳过
            if j == i + 1 || (i == 0 && j == count - 1) {
                continue;
            }
            if segments_touch(
                (ring[i].x(), ring[i].y()),
                (ring[i + 1].x(), ring[i + 1].y()),
                (ring[j].x(), ring[j].y()),
                (ring[j + 1].x(), ring[j + 1].y()),
            ) {
                return true;
            }
        }
    }
    false
}

fn segments_touch(a0: (f64, f64), a1: (f64, f64), b0: (f64, f64), b1: (f64, f64)) -> bool {
    let d1 = orientation(b0, b1, a0);
    let d2 = orientation(b0, b1, a1);
    let d3 = orientation(a0, a1, b0);
    let d4 = orientation(a0, a1, b1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(b0, b1, a0))
        || (d2 == 0.0 && on_segment(b0, b1, a1))
        || (d3 == 0.0 && on_segment(a0, a1, b0))
        || (d4 == 0.0 && on_segment(a0, a1, b1))
}

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

#[cfg(test)]
mod tests {
    use plancad_core::geometry::Point2;

    use super::*;
    use crate::model::RegionSource;

    fn region(points: &[(f64, f64)]) -> Region {
        Region::new(
            points.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            None,
            RegionSource::Topology,
        )
    }

    #[test]
    fn unit_square_metrics() {
        let square = region(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(validate(&square).is_ok());
        let metrics = measure(&square, 1.0);
        assert!((metrics.area - 1.0).abs() < 1e-12);
        assert!((metrics.perimeter - 4.0).abs() < 1e-12);
        assert_eq!(metrics.vertices, 4);
    }

    #[test]
    fn scale_applies_squared_to_area() {
        let rectangle = region(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]);
        let metrics = measure(&rectangle, 0.5);
        assert!((metrics.area - 12.5).abs() < 1e-9);
        assert!((metrics.perimeter - 15.0).abs() < 1e-9);
    }

    #[test]
    fn clockwise_ring_has_positive_area() {
        let square = region(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]);
        assert!((measure(&square, 1.0).area - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_bow_tie() {
        let bow_tie = region(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        assert!(validate(&bow_tie).is_err());
    }

    #[test]
    fn rejects_degenerate_rings() {
        assert!(validate(&region(&[(0.0, 0.0), (1.0, 0.0)])).is_err());
        assert!(validate(&region(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])).is_err());
        assert!(
            validate(&region(&[
                (0.0, 0.0),
                (2.0, 0.0),
                (1.0, 1.0),
                (2.0, 2.0),
                (0.0, 2.0),
                (1.0, 1.0),
            ]))
            .is_err(),
            "自接触的外环应被拒绝"
        );
    }
}
