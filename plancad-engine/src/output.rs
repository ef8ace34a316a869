use indexmap::IndexMap;
use plancad_core::document::EntityKind;
use plancad_core::geometry::Point2;
use serde::Serialize;

use crate::metrics::RegionMetrics;
use crate::model::{Curve, PointFeature, Region, RegionSource};

/// GeoJSON 风格的要素集合，字段顺序由结构体定义固定。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: FeatureGeometry,
    pub properties: FeatureProperties,
}

impl Feature {
    fn new(geometry: FeatureGeometry, properties: FeatureProperties) -> Self {
        Self {
            kind: "Feature",
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum FeatureGeometry {
    Polygon(Vec<Vec<[f64; 2]>>),
    LineString(Vec<[f64; 2]>),
    Point([f64; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureProperties {
    Region {
        area: f64,
        perimeter: f64,
        vertices: usize,
        layer: Option<String>,
        source: RegionSource,
    },
    Curve {
        layer: String,
        entity: EntityKind,
    },
    Point {
        text: Option<String>,
        height: Option<f64>,
        layer: String,
    },
}

/// 汇总元数据，键名与下游报表约定一致。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub layers: Vec<String>,
    pub entities_per_layer: IndexMap<String, usize>,
    pub constructions: Vec<RegionMetrics>,
    pub total_constructions: usize,
    pub total_area: f64,
    pub total_perimeter: f64,
    pub total_vertices: usize,
    pub total_entities_found: usize,
}

impl Metadata {
    pub fn new(layer_counts: &IndexMap<String, usize>, constructions: Vec<RegionMetrics>) -> Self {
        Self {
            layers: layer_counts.keys().cloned().collect(),
            entities_per_layer: layer_counts.clone(),
            total_constructions: constructions.len(),
            total_area: constructions.iter().map(|metrics| metrics.area).sum(),
            total_perimeter: constructions.iter().map(|metrics| metrics.perimeter).sum(),
            total_vertices: constructions.iter().map(|metrics| metrics.vertices).sum(),
            total_entities_found: layer_counts.values().sum(),
            constructions,
        }
    }
}

/// 按 区域 → 曲线 → 点 的顺序组装要素，类别内部保持输入顺序。
pub fn assemble(
    regions: &[(Region, RegionMetrics)],
    curves: &[Curve],
    points: &[PointFeature],
) -> FeatureCollection {
    let mut features = Vec::with_capacity(regions.len() + curves.len() + points.len());
    for (region, metrics) in regions {
        features.push(Feature::new(
            FeatureGeometry::Polygon(vec![coordinates(&region.closed_ring())]),
            FeatureProperties::Region {
                area: metrics.area,
                perimeter: metrics.perimeter,
                vertices: metrics.vertices,
                layer: region.layer.clone(),
                source: region.source,
            },
        ));
    }
    for curve in curves {
        features.push(Feature::new(
            FeatureGeometry::LineString(coordinates(&curve.points)),
            FeatureProperties::Curve {
                layer: curve.layer.clone(),
                entity: curve.kind,
            },
        ));
    }
    for point in points {
        features.push(Feature::new(
            FeatureGeometry::Point(coordinate(point.position)),
            FeatureProperties::Point {
                text: point.text.clone(),
                height: point.height,
                layer: point.layer.clone(),
            },
        ));
    }
    FeatureCollection::new(features)
}

#[inline]
fn coordinate(point: Point2) -> [f64; 2] {
    [point.x(), point.y()]
}

fn coordinates(points: &[Point2]) -> Vec<[f64; 2]> {
    points.iter().copied().map(coordinate).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn features_are_ordered_by_category() {
        let region = Region::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
            ],
            Some("ROOM".to_string()),
            RegionSource::Hatch,
        );
        let metrics = RegionMetrics {
            area: 0.5,
            perimeter: 2.0 + 2f64.sqrt(),
            vertices: 3,
        };
        let curve = Curve::new(
            vec![Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)],
            "WALL",
            EntityKind::Line,
        );
        let label = PointFeature {
            position: Point2::new(0.5, 0.5),
            text: Some("Sala".to_string()),
            height: None,
            layer: "NOTES".to_string(),
        };

        let collection = assemble(&[(region, metrics)], &[curve], &[label]);
        let value = serde_json::to_value(&collection).expect("序列化要素集合失败");
        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().expect("features 应为数组");
        assert_eq!(features.len(), 3);

        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]])
        );
        assert_eq!(features[0]["properties"]["source"], "hatch");
        assert_eq!(features[0]["properties"]["vertices"], 3);

        assert_eq!(features[1]["geometry"]["type"], "LineString");
        assert_eq!(features[1]["properties"], json!({"layer": "WALL", "entity": "LINE"}));

        assert_eq!(features[2]["geometry"], json!({"type": "Point", "coordinates": [0.5, 0.5]}));
        assert_eq!(features[2]["properties"]["text"], "Sala");
        assert!(features[2]["properties"]["height"].is_null());
    }

    #[test]
    fn metadata_totals_follow_constructions() {
        let mut counts = IndexMap::new();
        counts.insert("WALL".to_string(), 4);
        counts.insert("NOTES".to_string(), 2);
        let metadata = Metadata::new(
            &counts,
            vec![
                RegionMetrics {
                    area: 50.0,
                    perimeter: 30.0,
                    vertices: 4,
                },
                RegionMetrics {
                    area: 1.0,
                    perimeter: 4.0,
                    vertices: 4,
                },
            ],
        );
        assert_eq!(metadata.layers, vec!["WALL", "NOTES"]);
        assert_eq!(metadata.total_constructions, 2);
        assert!((metadata.total_area - 51.0).abs() < 1e-12);
        assert!((metadata.total_perimeter - 34.0).abs() < 1e-12);
        assert_eq!(metadata.total_vertices, 8);
        assert_eq!(metadata.total_entities_found, 6);

        let value = serde_json::to_value(&metadata).expect("序列化元数据失败");
        let keys: Vec<&str> = value
            .as_object()
            .expect("元数据应为对象")
            .keys()
            .map(String::as_str)
            .collect();
        assert!(keys.contains(&"entities_per_layer"));
        assert!(keys.contains(&"total_entities_found"));
    }
}
