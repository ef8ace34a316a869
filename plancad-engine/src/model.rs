use plancad_core::document::EntityKind;
use plancad_core::geometry::Point2;
use serde::Serialize;

/// 判定曲线闭合时首尾点允许的偏差。
pub const CLOSURE_EPSILON: f64 = 1e-9;

/// 离散化后的有序折线。
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub points: Vec<Point2>,
    pub layer: String,
    pub kind: EntityKind,
}

impl Curve {
    pub fn new(points: Vec<Point2>, layer: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            points,
            layer: layer.into(),
            kind,
        }
    }

    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() > 2 => {
                first.coincides(*last, CLOSURE_EPSILON)
            }
            _ => false,
        }
    }

    /// 相邻点组成的线段序列。
    pub fn segments(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        self.points.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// 文字或点标注。
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub position: Point2,
    pub text: Option<String>,
    pub height: Option<f64>,
    pub layer: String,
}

/// 区域的来源：精确拓扑重建、凹包近似或填充边界。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionSource {
    Topology,
    Alpha,
    Hatch,
}

impl RegionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RegionSource::Topology => "topology",
            RegionSource::Alpha => "alpha",
            RegionSource::Hatch => "hatch",
        }
    }
}

/// 简单多边形，外环不重复首点，不含洞。
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub exterior: Vec<Point2>,
    pub layer: Option<String>,
    pub source: RegionSource,
}

impl Region {
    pub fn new(exterior: Vec<Point2>, layer: Option<String>, source: RegionSource) -> Self {
        Self {
            exterior,
            layer,
            source,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.exterior.len()
    }

    /// 显式闭合的外环（末尾追加首点）。
    pub fn closed_ring(&self) -> Vec<Point2> {
        let mut ring = self.exterior.clone();
        if let Some(first) = self.exterior.first() {
            ring.push(*first);
        }
        ring
    }
}
