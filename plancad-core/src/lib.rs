pub mod geometry {
    use glam::{DAffine2, DVec2};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，全部计算使用双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        /// 判定两点是否在给定容差内重合。
        #[inline]
        pub fn coincides(self, other: Point2, epsilon: f64) -> bool {
            self.0.distance_squared(other.0) <= epsilon * epsilon
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 二维仿射变换，用于把块定义中的实体放置到世界坐标。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Transform2(pub DAffine2);

    impl Transform2 {
        pub const IDENTITY: Self = Self(DAffine2::IDENTITY);

        /// 按 INSERT 语义构造：先平移掉块基点，再缩放、旋转，最后移动到插入点。
        pub fn from_insert(insert: Point2, scale: Vector2, rotation: f64, base: Point2) -> Self {
            let placement =
                DAffine2::from_scale_angle_translation(scale.as_vec2(), rotation, insert.as_vec2());
            Self(placement * DAffine2::from_translation(-base.as_vec2()))
        }

        /// 组合变换：先应用 `inner`，再应用 `self`。
        #[inline]
        pub fn then_inner(self, inner: Transform2) -> Self {
            Self(self.0 * inner.0)
        }

        #[inline]
        pub fn apply_point(&self, point: Point2) -> Point2 {
            Point2(self.0.transform_point2(point.0))
        }

        #[inline]
        pub fn apply_vector(&self, vector: Vector2) -> Vector2 {
            Vector2(self.0.transform_vector2(vector.0))
        }

        #[inline]
        pub fn determinant(&self) -> f64 {
            self.0.matrix2.determinant()
        }

        /// 是否包含镜像（行列式为负），镜像会翻转弧线方向。
        #[inline]
        pub fn is_mirrored(&self) -> bool {
            self.determinant() < 0.0
        }

        /// 线性部分的平均缩放，非等比缩放时作为半径近似。
        #[inline]
        pub fn mean_scale(&self) -> f64 {
            self.determinant().abs().sqrt()
        }

        /// 线性部分的旋转角（取 X 轴的像）。
        #[inline]
        pub fn rotation(&self) -> f64 {
            let axis = self.0.matrix2.x_axis;
            axis.y.atan2(axis.x)
        }
    }

    impl Default for Transform2 {
        fn default() -> Self {
            Self::IDENTITY
        }
    }
}

pub mod document {
    use std::collections::HashMap;
    use std::fmt;

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Transform2, Vector2};

    /// 实体的 DXF 类型名，用于输出标注与诊断。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum EntityKind {
        Line,
        #[serde(rename = "LWPOLYLINE")]
        LwPolyline,
        Polyline,
        Arc,
        Circle,
        Ellipse,
        Spline,
        Hatch,
        Text,
        Point,
        #[serde(rename = "INSERT")]
        BlockReference,
    }

    impl EntityKind {
        pub fn dxf_name(self) -> &'static str {
            match self {
                EntityKind::Line => "LINE",
                EntityKind::LwPolyline => "LWPOLYLINE",
                EntityKind::Polyline => "POLYLINE",
                EntityKind::Arc => "ARC",
                EntityKind::Circle => "CIRCLE",
                EntityKind::Ellipse => "ELLIPSE",
                EntityKind::Spline => "SPLINE",
                EntityKind::Hatch => "HATCH",
                EntityKind::Text => "TEXT",
                EntityKind::Point => "POINT",
                EntityKind::BlockReference => "INSERT",
            }
        }
    }

    impl fmt::Display for EntityKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.dxf_name())
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        LwPolyline(LwPolyline),
        Polyline(Polyline),
        Arc(Arc),
        Circle(Circle),
        Ellipse(Ellipse),
        Spline(Spline),
        Hatch(Hatch),
        Text(Text),
        Point(PointEntity),
        BlockReference(BlockReference),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::LwPolyline(polyline) => &polyline.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Ellipse(ellipse) => &ellipse.layer,
                Entity::Spline(spline) => &spline.layer,
                Entity::Hatch(hatch) => &hatch.layer,
                Entity::Text(text) => &text.layer,
                Entity::Point(point) => &point.layer,
                Entity::BlockReference(reference) => &reference.layer,
            }
        }

        pub fn set_layer(&mut self, layer: impl Into<String>) {
            let layer = layer.into();
            match self {
                Entity::Line(line) => line.layer = layer,
                Entity::LwPolyline(polyline) => polyline.layer = layer,
                Entity::Polyline(polyline) => polyline.layer = layer,
                Entity::Arc(arc) => arc.layer = layer,
                Entity::Circle(circle) => circle.layer = layer,
                Entity::Ellipse(ellipse) => ellipse.layer = layer,
                Entity::Spline(spline) => spline.layer = layer,
                Entity::Hatch(hatch) => hatch.layer = layer,
                Entity::Text(text) => text.layer = layer,
                Entity::Point(point) => point.layer = layer,
                Entity::BlockReference(reference) => reference.layer = layer,
            }
        }

        #[inline]
        pub fn kind(&self) -> EntityKind {
            match self {
                Entity::Line(_) => EntityKind::Line,
                Entity::LwPolyline(_) => EntityKind::LwPolyline,
                Entity::Polyline(_) => EntityKind::Polyline,
                Entity::Arc(_) => EntityKind::Arc,
                Entity::Circle(_) => EntityKind::Circle,
                Entity::Ellipse(_) => EntityKind::Ellipse,
                Entity::Spline(_) => EntityKind::Spline,
                Entity::Hatch(_) => EntityKind::Hatch,
                Entity::Text(_) => EntityKind::Text,
                Entity::Point(_) => EntityKind::Point,
                Entity::BlockReference(_) => EntityKind::BlockReference,
            }
        }

        /// 返回应用变换后的实体副本。
        ///
        /// 圆与圆弧在非等比缩放下以平均缩放近似半径；镜像变换会翻转
        /// bulge 符号与弧线方向，保证输出仍与原始几何一致。
        pub fn transformed(&self, transform: &Transform2) -> Entity {
            let mirrored = transform.is_mirrored();
            let scale = transform.mean_scale();
            match self {
                Entity::Line(line) => Entity::Line(Line {
                    start: transform.apply_point(line.start),
                    end: transform.apply_point(line.end),
                    layer: line.layer.clone(),
                }),
                Entity::LwPolyline(polyline) => Entity::LwPolyline(LwPolyline {
                    vertices: polyline
                        .vertices
                        .iter()
                        .map(|vertex| PolylineVertex {
                            position: transform.apply_point(vertex.position),
                            bulge: if mirrored { -vertex.bulge } else { vertex.bulge },
                        })
                        .collect(),
                    is_closed: polyline.is_closed,
                    layer: polyline.layer.clone(),
                }),
                Entity::Polyline(polyline) => Entity::Polyline(Polyline {
                    vertices: polyline
                        .vertices
                        .iter()
                        .map(|point| transform.apply_point(*point))
                        .collect(),
                    is_closed: polyline.is_closed,
                    layer: polyline.layer.clone(),
                }),
                Entity::Arc(arc) => {
                    let (center, radius, start_angle, end_angle) = transform_arc(
                        transform,
                        arc.center,
                        arc.radius,
                        arc.start_angle,
                        arc.end_angle,
                    );
                    // 镜像后原本逆时针的弧变为顺时针，交换端点以保持逆时针语义。
                    let (start_angle, end_angle) = if mirrored {
                        (end_angle, start_angle)
                    } else {
                        (start_angle, end_angle)
                    };
                    Entity::Arc(Arc {
                        center,
                        radius,
                        start_angle,
                        end_angle,
                        layer: arc.layer.clone(),
                    })
                }
                Entity::Circle(circle) => Entity::Circle(Circle {
                    center: transform.apply_point(circle.center),
                    radius: circle.radius * scale,
                    layer: circle.layer.clone(),
                }),
                Entity::Ellipse(ellipse) => {
                    let (center, major_axis, ratio) =
                        transform_ellipse_axes(transform, ellipse.center, ellipse.major_axis, ellipse.ratio);
                    let (start_parameter, end_parameter) = if mirrored {
                        (-ellipse.end_parameter, -ellipse.start_parameter)
                    } else {
                        (ellipse.start_parameter, ellipse.end_parameter)
                    };
                    Entity::Ellipse(Ellipse {
                        center,
                        major_axis,
                        ratio,
                        start_parameter,
                        end_parameter,
                        layer: ellipse.layer.clone(),
                    })
                }
                Entity::Spline(spline) => Entity::Spline(Spline {
                    degree: spline.degree,
                    is_rational: spline.is_rational,
                    is_closed: spline.is_closed,
                    is_periodic: spline.is_periodic,
                    control_points: spline
                        .control_points
                        .iter()
                        .map(|point| transform.apply_point(*point))
                        .collect(),
                    fit_points: spline
                        .fit_points
                        .iter()
                        .map(|point| transform.apply_point(*point))
                        .collect(),
                    knot_values: spline.knot_values.clone(),
                    weights: spline.weights.clone(),
                    layer: spline.layer.clone(),
                }),
                Entity::Hatch(hatch) => Entity::Hatch(Hatch {
                    pattern_name: hatch.pattern_name.clone(),
                    is_solid: hatch.is_solid,
                    loops: hatch
                        .loops
                        .iter()
                        .map(|boundary| HatchLoop {
                            is_polyline: boundary.is_polyline,
                            is_closed: boundary.is_closed,
                            edges: boundary
                                .edges
                                .iter()
                                .map(|edge| transform_hatch_edge(edge, transform))
                                .collect(),
                        })
                        .collect(),
                    layer: hatch.layer.clone(),
                }),
                Entity::Text(text) => Entity::Text(Text {
                    insert: transform.apply_point(text.insert),
                    content: text.content.clone(),
                    height: text.height.map(|height| height * scale),
                    rotation: text.rotation + transform.rotation(),
                    layer: text.layer.clone(),
                }),
                Entity::Point(point) => Entity::Point(PointEntity {
                    position: transform.apply_point(point.position),
                    layer: point.layer.clone(),
                }),
                // 块参照由收集器沿变换链展开，这里只移动插入点。
                Entity::BlockReference(reference) => Entity::BlockReference(BlockReference {
                    name: reference.name.clone(),
                    insert: transform.apply_point(reference.insert),
                    scale: reference.scale,
                    rotation: reference.rotation,
                    layer: reference.layer.clone(),
                }),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以弧度形式储存，遵循数学正方向（逆时针）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    /// 椭圆实体，记录主轴向量与参数范围（单位为弧度）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
    }

    /// 轻量多段线（LWPOLYLINE），每个顶点携带到下一顶点的 bulge。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LwPolyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub layer: String,
    }

    /// 传统二维多段线（POLYLINE + VERTEX 序列），仅保留顶点位置。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub is_rational: bool,
        pub is_closed: bool,
        pub is_periodic: bool,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub knot_values: Vec<f64>,
        pub weights: Vec<f64>,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 单行文字（TEXT）或多行文字（MTEXT）统一表示，高度可能缺省。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: Option<f64>,
        pub rotation: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PointEntity {
        pub position: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HatchLoop {
        pub is_polyline: bool,
        pub is_closed: bool,
        pub edges: Vec<HatchEdge>,
    }

    /// 填充边界的边。圆弧/椭圆角度为实际几何角（弧度），方向由标志决定。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum HatchEdge {
        Line {
            start: Point2,
            end: Point2,
        },
        Arc {
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            is_counter_clockwise: bool,
        },
        PolylineSegment {
            start: Point2,
            end: Point2,
            bulge: f64,
        },
        Ellipse {
            center: Point2,
            major_axis: Vector2,
            minor_ratio: f64,
            start_angle: f64,
            end_angle: f64,
            is_counter_clockwise: bool,
        },
        Spline {
            control_points: Vec<Point2>,
            fit_points: Vec<Point2>,
            knot_values: Vec<f64>,
            weights: Vec<f64>,
            degree: i32,
            is_rational: bool,
            is_periodic: bool,
        },
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Hatch {
        pub pattern_name: String,
        pub is_solid: bool,
        pub loops: Vec<HatchLoop>,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockReference {
        pub name: String,
        pub insert: Point2,
        pub scale: Vector2,
        pub rotation: f64,
        pub layer: String,
    }

    impl BlockReference {
        /// 该参照相对块定义的放置变换。
        pub fn placement(&self, base_point: Point2) -> Transform2 {
            Transform2::from_insert(self.insert, self.scale, self.rotation, base_point)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockDefinition {
        pub name: String,
        pub base_point: Point2,
        pub entities: Vec<Entity>,
    }

    /// 读取阶段被跳过的实体记录（数据残缺、数值无法解析等）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LoadIssue {
        pub entity_type: String,
        pub layer: Option<String>,
        pub message: String,
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        entities: Vec<Entity>,
        blocks: HashMap<String, BlockDefinition>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        issues: Vec<LoadIssue>,
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::Line(Line {
                start,
                end,
                layer: layer.into(),
            }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::Circle(Circle {
                center,
                radius,
                layer: layer.into(),
            }))
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer: layer.into(),
            }))
        }

        pub fn add_lwpolyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        )
        where
            I: IntoIterator<Item = PolylineVertex>,
        {
            self.add_entity(Entity::LwPolyline(LwPolyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer: layer.into(),
            }))
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            height: Option<f64>,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::Text(Text {
                insert,
                content: content.into(),
                height,
                rotation: 0.0,
                layer: layer.into(),
            }))
        }

        pub fn add_block_reference(
            &mut self,
            name: impl Into<String>,
            insert: Point2,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::BlockReference(BlockReference {
                name: name.into(),
                insert,
                scale: Vector2::new(1.0, 1.0),
                rotation: 0.0,
                layer: layer.into(),
            }))
        }

        pub fn add_entity(&mut self, entity: Entity) {
            self.entities.push(entity);
        }

        /// 模型空间实体，按读取顺序。
        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &Entity> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        /// 注册块定义。块名按 DXF 约定大小写不敏感，重复定义以后者为准。
        pub fn add_block_definition(&mut self, definition: BlockDefinition) {
            self.blocks
                .insert(definition.name.to_uppercase(), definition);
        }

        #[inline]
        pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
            self.blocks.get(&name.to_uppercase())
        }

        #[inline]
        pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
            self.blocks.values()
        }

        pub fn record_issue(&mut self, issue: LoadIssue) {
            self.issues.push(issue);
        }

        #[inline]
        pub fn issues(&self) -> &[LoadIssue] {
            &self.issues
        }

    }

    fn transform_arc(
        transform: &Transform2,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    ) -> (Point2, f64, f64, f64) {
        let new_center = transform.apply_point(center);
        let start = transform.apply_point(arc_point(center, radius, start_angle));
        let end = transform.apply_point(arc_point(center, radius, end_angle));
        let start_dir = start.as_vec2() - new_center.as_vec2();
        let end_dir = end.as_vec2() - new_center.as_vec2();
        (
            new_center,
            radius * transform.mean_scale(),
            start_dir.y.atan2(start_dir.x),
            end_dir.y.atan2(end_dir.x),
        )
    }

    fn transform_ellipse_axes(
        transform: &Transform2,
        center: Point2,
        major_axis: Vector2,
        ratio: f64,
    ) -> (Point2, Vector2, f64) {
        let major = major_axis.as_vec2();
        let minor = DVec2::new(-major.y, major.x) * ratio;
        let new_major = transform.apply_vector(major_axis);
        let new_minor = transform.apply_vector(Vector2::from(minor));
        let major_length = new_major.length();
        let new_ratio = if major_length <= f64::EPSILON {
            ratio
        } else {
            new_minor.length() / major_length
        };
        (transform.apply_point(center), new_major, new_ratio)
    }

    fn transform_hatch_edge(edge: &HatchEdge, transform: &Transform2) -> HatchEdge {
        let mirrored = transform.is_mirrored();
        match edge {
            HatchEdge::Line { start, end } => HatchEdge::Line {
                start: transform.apply_point(*start),
                end: transform.apply_point(*end),
            },
            HatchEdge::PolylineSegment { start, end, bulge } => HatchEdge::PolylineSegment {
                start: transform.apply_point(*start),
                end: transform.apply_point(*end),
                bulge: if mirrored { -*bulge } else { *bulge },
            },
            HatchEdge::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => {
                let (center, radius, start_angle, end_angle) =
                    transform_arc(transform, *center, *radius, *start_angle, *end_angle);
                HatchEdge::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    is_counter_clockwise: *is_counter_clockwise != mirrored,
                }
            }
            HatchEdge::Ellipse {
                center,
                major_axis,
                minor_ratio,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => {
                let (center, major_axis, minor_ratio) =
                    transform_ellipse_axes(transform, *center, *major_axis, *minor_ratio);
                let (start_angle, end_angle) = if mirrored {
                    (-*start_angle, -*end_angle)
                } else {
                    (*start_angle, *end_angle)
                };
                HatchEdge::Ellipse {
                    center,
                    major_axis,
                    minor_ratio,
                    start_angle,
                    end_angle,
                    is_counter_clockwise: *is_counter_clockwise != mirrored,
                }
            }
            HatchEdge::Spline {
                control_points,
                fit_points,
                knot_values,
                weights,
                degree,
                is_rational,
                is_periodic,
            } => HatchEdge::Spline {
                control_points: control_points
                    .iter()
                    .map(|point| transform.apply_point(*point))
                    .collect(),
                fit_points: fit_points
                    .iter()
                    .map(|point| transform.apply_point(*point))
                    .collect(),
                knot_values: knot_values.clone(),
                weights: weights.clone(),
                degree: *degree,
                is_rational: *is_rational,
                is_periodic: *is_periodic,
            },
        }
    }

    fn arc_point(center: Point2, radius: f64, angle: f64) -> Point2 {
        Point2::from_vec(center.as_vec2() + DVec2::from_angle(angle) * radius)
    }

}
