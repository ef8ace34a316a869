use plancad_core::{
    document::{
        Arc, BlockDefinition, BlockReference, Circle, Document, Ellipse, Entity, Hatch, HatchEdge,
        HatchLoop, Line, LoadIssue, LwPolyline, PointEntity, Polyline, PolylineVertex, Spline,
        Text,
    },
    geometry::{Point2, Vector2},
};
use tracing::{debug, trace};

use crate::reader::{
    DxfError, DxfReader, assign_coord, decode_mtext_content, decode_text_content, parse_f64,
    parse_i16, parse_i32,
};

pub(crate) struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        let mut has_marker = false;
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::syntax(format!(
                    "第 {} 行遇到意外的组码 {code}（期望 0 表示 SECTION/EOF）",
                    self.reader.line_number()
                )));
            }
            match value.trim() {
                "SECTION" => {
                    has_marker = true;
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::syntax("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::syntax(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        "BLOCKS" => self.parse_blocks(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => {
                    has_marker = true;
                    break;
                }
                unexpected => {
                    return Err(DxfError::syntax(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        if !has_marker {
            return Err(DxfError::syntax("文件中没有 SECTION 或 EOF 标记，不是 DXF 文档"));
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::syntax("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::syntax("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::syntax(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                kind => {
                    if let Some(entity) = self.read_entity(kind, document)? {
                        document.add_entity(entity);
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_blocks(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::syntax("BLOCKS 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::syntax(format!(
                    "BLOCKS 段遇到组码 {code}（期望 0 表示块起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "BLOCK" => {
                    if let Some(definition) = self.parse_block_definition(document)? {
                        document.add_block_definition(definition);
                    }
                }
                _ => {
                    // 块段外的零散记录，直接跳过
                    self.skip_entity_body()?;
                }
            }
        }
        Ok(())
    }

    fn parse_block_definition(
        &mut self,
        document: &mut Document,
    ) -> Result<Option<BlockDefinition>, DxfError> {
        let mut name: Option<String> = None;
        let mut base_x: f64 = 0.0;
        let mut base_y: f64 = 0.0;
        let mut collect_entities = true;
        let mut entities: Vec<Entity> = Vec::new();

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ENDBLK" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    kind => {
                        if collect_entities {
                            if let Some(entity) = self.read_entity(kind, document)? {
                                entities.push(entity);
                            }
                        } else {
                            self.skip_entity_body()?;
                        }
                    }
                },
                Some((code, value)) => match code {
                    2 => {
                        let trimmed = value.trim().to_string();
                        // *Model_Space / *Paper_Space 等匿名记录不参与展开
                        collect_entities = !trimmed.starts_with('*');
                        name = Some(trimmed);
                    }
                    10 => {
                        base_x = parse_f64(&value, "BLOCK 基点 X")
                            .map_err(|_| DxfError::syntax("BLOCK 基点 X 无法解析"))?
                    }
                    20 => {
                        base_y = parse_f64(&value, "BLOCK 基点 Y")
                            .map_err(|_| DxfError::syntax("BLOCK 基点 Y 无法解析"))?
                    }
                    _ => {}
                },
                None => {
                    return Err(DxfError::syntax("BLOCK 定义未找到 ENDBLK 终止标记"));
                }
            }
        }

        let name = match name {
            Some(name) => name,
            None => return Err(DxfError::syntax("BLOCK 缺少名称（组码 2）")),
        };

        if !collect_entities {
            return Ok(None);
        }

        debug!(block = %name, entities = entities.len(), "读取块定义");
        Ok(Some(BlockDefinition {
            name,
            base_point: Point2::new(base_x, base_y),
            entities,
        }))
    }

    /// 读取单个实体。实体自身数据损坏时记录到文档并跳过，只有组码流损坏才返回错误。
    fn read_entity(
        &mut self,
        kind: &str,
        document: &mut Document,
    ) -> Result<Option<Entity>, DxfError> {
        self.reader.begin_entity();
        match self.parse_entity(kind) {
            Ok(entity) => Ok(Some(entity)),
            Err(DxfError::Unsupported { feature }) => {
                trace!(kind, %feature, "跳过暂不支持的实体");
                self.skip_entity_body()?;
                Ok(None)
            }
            Err(DxfError::Invalid { message }) => {
                let layer = self.reader.entity_layer();
                debug!(kind, layer = layer.as_deref().unwrap_or(""), %message, "跳过数据损坏的实体");
                document.record_issue(LoadIssue {
                    entity_type: kind.to_string(),
                    layer,
                    message,
                });
                self.skip_entity_body()?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        match kind {
            "LINE" => self.parse_line(),
            "CIRCLE" => self.parse_circle(),
            "ARC" => self.parse_arc(),
            "ELLIPSE" => self.parse_ellipse(),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "POLYLINE" => self.parse_polyline(),
            "SPLINE" => self.parse_spline(),
            "TEXT" => self.parse_text(),
            "MTEXT" => self.parse_mtext(),
            "POINT" => self.parse_point(),
            "INSERT" => self.parse_insert(),
            "HATCH" => self.parse_hatch(),
            other => Err(DxfError::unsupported(format!("暂不支持的实体类型 {other}"))),
        }
    }

    fn parse_line(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut start_x = None;
        let mut start_y = None;
        let mut end_x = None;
        let mut end_y = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut start_x, &value, "LINE 起点 X（组码 10）")?,
                    20 => assign_coord(&mut start_y, &value, "LINE 起点 Y（组码 20）")?,
                    11 => assign_coord(&mut end_x, &value, "LINE 终点 X（组码 11）")?,
                    21 => assign_coord(&mut end_y, &value, "LINE 终点 Y（组码 21）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("LINE")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let sx = start_x.ok_or_else(|| DxfError::invalid("LINE 缺少起点 X（组码 10）"))?;
        let sy = start_y.ok_or_else(|| DxfError::invalid("LINE 缺少起点 Y（组码 20）"))?;
        let ex = end_x.ok_or_else(|| DxfError::invalid("LINE 缺少终点 X（组码 11）"))?;
        let ey = end_y.ok_or_else(|| DxfError::invalid("LINE 缺少终点 Y（组码 21）"))?;

        Ok(Entity::Line(Line {
            start: Point2::new(sx, sy),
            end: Point2::new(ex, ey),
            layer,
        }))
    }

    fn parse_circle(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut center_x, &value, "CIRCLE 圆心 X（组码 10）")?,
                    20 => assign_coord(&mut center_y, &value, "CIRCLE 圆心 Y（组码 20）")?,
                    40 => assign_coord(&mut radius, &value, "CIRCLE 半径（组码 40）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("CIRCLE")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let cx = center_x.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;

        Ok(Entity::Circle(Circle {
            center: Point2::new(cx, cy),
            radius,
            layer,
        }))
    }

    fn parse_arc(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        let mut start_angle = None;
        let mut end_angle = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut center_x, &value, "ARC 圆心 X（组码 10）")?,
                    20 => assign_coord(&mut center_y, &value, "ARC 圆心 Y（组码 20）")?,
                    40 => assign_coord(&mut radius, &value, "ARC 半径（组码 40）")?,
                    50 => assign_coord(&mut start_angle, &value, "ARC 起始角（组码 50）")?,
                    51 => assign_coord(&mut end_angle, &value, "ARC 终止角（组码 51）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("ARC")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let cx = center_x.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("ARC 缺少半径（组码 40）"))?;
        let start_angle =
            start_angle.ok_or_else(|| DxfError::invalid("ARC 缺少起始角（组码 50）"))?;
        let end_angle = end_angle.ok_or_else(|| DxfError::invalid("ARC 缺少终止角（组码 51）"))?;

        Ok(Entity::Arc(Arc {
            center: Point2::new(cx, cy),
            radius,
            start_angle: start_angle.to_radians(),
            end_angle: end_angle.to_radians(),
            layer,
        }))
    }

    fn parse_ellipse(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut major_x = None;
        let mut major_y = None;
        let mut ratio = None;
        let mut start_parameter = 0.0;
        let mut end_parameter = std::f64::consts::TAU;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut center_x, &value, "ELLIPSE 圆心 X（组码 10）")?,
                    20 => assign_coord(&mut center_y, &value, "ELLIPSE 圆心 Y（组码 20）")?,
                    11 => assign_coord(&mut major_x, &value, "ELLIPSE 主轴向量 X（组码 11）")?,
                    21 => assign_coord(&mut major_y, &value, "ELLIPSE 主轴向量 Y（组码 21）")?,
                    40 => assign_coord(&mut ratio, &value, "ELLIPSE 半径比（组码 40）")?,
                    41 => start_parameter = parse_f64(&value, "ELLIPSE 起始参数（组码 41）")?,
                    42 => end_parameter = parse_f64(&value, "ELLIPSE 终止参数（组码 42）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("ELLIPSE")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let cx = center_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少圆心 Y（组码 20）"))?;
        let major_x =
            major_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴向量 X（组码 11）"))?;
        let major_y =
            major_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴向量 Y（组码 21）"))?;

        if major_x.abs() < f64::EPSILON && major_y.abs() < f64::EPSILON {
            return Err(DxfError::invalid("ELLIPSE 主轴向量长度为 0，无法创建实体"));
        }

        let ratio = ratio.unwrap_or(1.0);
        if ratio <= 0.0 {
            return Err(DxfError::invalid(format!(
                "ELLIPSE 半径比必须为正数，实际为 {ratio}"
            )));
        }

        Ok(Entity::Ellipse(Ellipse {
            center: Point2::new(cx, cy),
            major_axis: Vector2::new(major_x, major_y),
            ratio,
            start_parameter,
            end_parameter,
            layer,
        }))
    }

    fn parse_lwpolyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        let mut pending_y: Option<f64> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => {
                        let flag = parse_i32(&value, "LWPOLYLINE 标志（组码 70）")?;
                        is_closed = flag & 0x01 == 0x01;
                    }
                    10 => {
                        let x = parse_f64(&value, "LWPOLYLINE 顶点 X（组码 10）")?;
                        if let Some(y) = pending_y.take() {
                            vertices.push(PolylineVertex::new(Point2::new(x, y)));
                        } else if pending_x.replace(x).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                            ));
                        }
                    }
                    20 => {
                        let y = parse_f64(&value, "LWPOLYLINE 顶点 Y（组码 20）")?;
                        if let Some(x) = pending_x.take() {
                            vertices.push(PolylineVertex::new(Point2::new(x, y)));
                        } else if pending_y.replace(y).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 X（组码 10）",
                            ));
                        }
                    }
                    42 => {
                        let bulge = parse_f64(&value, "LWPOLYLINE 顶点 bulge（组码 42）")?;
                        match vertices.last_mut() {
                            Some(vertex) => vertex.bulge = bulge,
                            None => {
                                return Err(DxfError::invalid(
                                    "LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）",
                                ));
                            }
                        }
                    }
                    _ => {}
                },
                None => return Err(DxfError::truncated("LWPOLYLINE")),
            }
        }

        if pending_x.is_some() || pending_y.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标应成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }

        if vertices.is_empty() {
            return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        Ok(Entity::LwPolyline(LwPolyline {
            vertices,
            is_closed,
            layer,
        }))
    }

    /// 传统 POLYLINE：头部之后跟随 VERTEX 记录，以 SEQEND 结束。
    fn parse_polyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags: i16 = 0;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => flags = parse_i16(&value, "POLYLINE 标志（组码 70）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("POLYLINE")),
            }
        }

        if flags & (0x10 | 0x40) != 0 {
            self.skip_polyline_sequence()?;
            return Err(DxfError::unsupported("POLYLINE 网格/多面网格"));
        }

        let mut vertices: Vec<Point2> = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => {
                        if let Some(point) = self.parse_vertex()? {
                            vertices.push(point);
                        }
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => {
                    return Err(DxfError::invalid(
                        "POLYLINE 遇到无效的记录，期望 VERTEX/SEQEND",
                    ));
                }
                None => return Err(DxfError::truncated("POLYLINE")),
            }
        }

        if vertices.is_empty() {
            return Err(DxfError::invalid("POLYLINE 未解析到任何顶点"));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed: flags & 0x01 != 0,
            layer,
        }))
    }

    fn parse_vertex(&mut self) -> Result<Option<Point2>, DxfError> {
        let mut x = None;
        let mut y = None;
        let mut flags: i16 = 0;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    10 => assign_coord(&mut x, &value, "VERTEX X（组码 10）")?,
                    20 => assign_coord(&mut y, &value, "VERTEX Y（组码 20）")?,
                    70 => flags = parse_i16(&value, "VERTEX 标志（组码 70）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("VERTEX")),
            }
        }

        // 样条拟合的控制顶点不属于折线本身。
        if flags & 0x10 != 0 {
            return Ok(None);
        }

        let x = x.ok_or_else(|| DxfError::invalid("VERTEX 缺少 X（组码 10）"))?;
        let y = y.ok_or_else(|| DxfError::invalid("VERTEX 缺少 Y（组码 20）"))?;
        Ok(Some(Point2::new(x, y)))
    }

    fn skip_polyline_sequence(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }

    fn parse_spline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags: i16 = 0;
        let mut degree: Option<i16> = None;
        let mut knot_values: Vec<f64> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        let mut control_points: Vec<Point2> = Vec::new();
        let mut fit_points: Vec<Point2> = Vec::new();
        let mut pending_control_x: Option<f64> = None;
        let mut pending_fit_x: Option<f64> = None;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => flags = parse_i16(&value, "SPLINE 类型标志（组码 70）")?,
                    71 => degree = Some(parse_i16(&value, "SPLINE 阶数（组码 71）")?),
                    40 => knot_values.push(parse_f64(&value, "SPLINE 节点值（组码 40）")?),
                    41 => weights.push(parse_f64(&value, "SPLINE 权重（组码 41）")?),
                    10 => {
                        if pending_control_x
                            .replace(parse_f64(&value, "SPLINE 控制点 X（组码 10）")?)
                            .is_some()
                        {
                            return Err(DxfError::invalid(
                                "SPLINE 控制点 X（组码 10）在未提供 Y 之前重复出现",
                            ));
                        }
                    }
                    20 => {
                        let y = parse_f64(&value, "SPLINE 控制点 Y（组码 20）")?;
                        let x = pending_control_x.take().ok_or_else(|| {
                            DxfError::invalid("SPLINE 控制点 Y（组码 20）缺少对应的 X")
                        })?;
                        control_points.push(Point2::new(x, y));
                    }
                    11 => {
                        if pending_fit_x
                            .replace(parse_f64(&value, "SPLINE 拟合点 X（组码 11）")?)
                            .is_some()
                        {
                            return Err(DxfError::invalid(
                                "SPLINE 拟合点 X（组码 11）在未提供 Y 之前重复出现",
                            ));
                        }
                    }
                    21 => {
                        let y = parse_f64(&value, "SPLINE 拟合点 Y（组码 21）")?;
                        let x = pending_fit_x.take().ok_or_else(|| {
                            DxfError::invalid("SPLINE 拟合点 Y（组码 21）缺少对应的 X")
                        })?;
                        fit_points.push(Point2::new(x, y));
                    }
                    _ => {}
                },
                None => return Err(DxfError::truncated("SPLINE")),
            }
        }

        if let Some(x) = pending_control_x.take() {
            return Err(DxfError::invalid(format!(
                "SPLINE 控制点 X={x} 缺少对应的 Y（组码 20）"
            )));
        }
        if let Some(x) = pending_fit_x.take() {
            return Err(DxfError::invalid(format!(
                "SPLINE 拟合点 X={x} 缺少对应的 Y（组码 21）"
            )));
        }
        if control_points.is_empty() && fit_points.is_empty() {
            return Err(DxfError::invalid("SPLINE 既没有控制点也没有拟合点"));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let degree = degree.ok_or_else(|| DxfError::invalid("SPLINE 缺少阶数（组码 71）"))? as i32;

        Ok(Entity::Spline(Spline {
            degree,
            is_rational: flags & 0x04 != 0,
            is_closed: flags & 0x01 != 0,
            is_periodic: flags & 0x02 != 0,
            control_points,
            fit_points,
            knot_values,
            weights,
            layer,
        }))
    }

    fn parse_text(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut height = None;
        let mut rotation_deg = 0.0;
        let mut text: Option<String> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut insert_x, &value, "TEXT 插入点 X（组码 10）")?,
                    20 => assign_coord(&mut insert_y, &value, "TEXT 插入点 Y（组码 20）")?,
                    40 => assign_coord(&mut height, &value, "TEXT 高度（组码 40）")?,
                    50 => rotation_deg = parse_f64(&value, "TEXT 旋转角（组码 50）")?,
                    1 => {
                        let entry = decode_text_content(&value);
                        match text {
                            Some(ref mut existing) => {
                                existing.push('\n');
                                existing.push_str(&entry);
                            }
                            None => text = Some(entry),
                        }
                    }
                    _ => {}
                },
                None => return Err(DxfError::truncated("TEXT")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let ix = insert_x.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 Y（组码 20）"))?;

        Ok(Entity::Text(Text {
            insert: Point2::new(ix, iy),
            content: text.unwrap_or_default(),
            height,
            rotation: rotation_deg.to_radians(),
            layer,
        }))
    }

    fn parse_mtext(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut height = None;
        let mut direction_x: Option<f64> = None;
        let mut direction_y: Option<f64> = None;
        let mut rotation_deg: Option<f64> = None;
        let mut fragments: Vec<String> = Vec::new();
        let mut tail: Option<String> = None;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut insert_x, &value, "MTEXT 插入点 X（组码 10）")?,
                    20 => assign_coord(&mut insert_y, &value, "MTEXT 插入点 Y（组码 20）")?,
                    40 => assign_coord(&mut height, &value, "MTEXT 高度（组码 40）")?,
                    11 => direction_x = Some(parse_f64(&value, "MTEXT 方向向量 X（组码 11）")?),
                    21 => direction_y = Some(parse_f64(&value, "MTEXT 方向向量 Y（组码 21）")?),
                    50 => rotation_deg = Some(parse_f64(&value, "MTEXT 旋转角（组码 50）")?),
                    // 组码 3 为前置分段，组码 1 为最后一段
                    3 => fragments.push(value),
                    1 => tail = Some(value),
                    _ => {}
                },
                None => return Err(DxfError::truncated("MTEXT")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let ix = insert_x.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 Y（组码 20）"))?;

        fragments.extend(tail);
        let raw: String = fragments.concat();

        let rotation = match (direction_x, direction_y) {
            (Some(x), Some(y)) if x.abs() > f64::EPSILON || y.abs() > f64::EPSILON => y.atan2(x),
            _ => rotation_deg.unwrap_or(0.0).to_radians(),
        };

        Ok(Entity::Text(Text {
            insert: Point2::new(ix, iy),
            content: decode_mtext_content(&raw),
            height,
            rotation,
            layer,
        }))
    }

    fn parse_point(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut x = None;
        let mut y = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut x, &value, "POINT X（组码 10）")?,
                    20 => assign_coord(&mut y, &value, "POINT Y（组码 20）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("POINT")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let x = x.ok_or_else(|| DxfError::invalid("POINT 缺少 X（组码 10）"))?;
        let y = y.ok_or_else(|| DxfError::invalid("POINT 缺少 Y（组码 20）"))?;
        Ok(Entity::Point(PointEntity {
            position: Point2::new(x, y),
            layer,
        }))
    }

    fn parse_insert(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut name: Option<String> = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut scale_x: Option<f64> = None;
        let mut scale_y: Option<f64> = None;
        let mut rotation_deg: f64 = 0.0;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    2 => {
                        if name.is_some() {
                            return Err(DxfError::invalid("INSERT 遇到重复的块名（组码 2）"));
                        }
                        name = Some(value.trim().to_string());
                    }
                    10 => assign_coord(&mut insert_x, &value, "INSERT 插入点 X（组码 10）")?,
                    20 => assign_coord(&mut insert_y, &value, "INSERT 插入点 Y（组码 20）")?,
                    41 => scale_x = Some(parse_f64(&value, "INSERT 缩放 X（组码 41）")?),
                    42 => scale_y = Some(parse_f64(&value, "INSERT 缩放 Y（组码 42）")?),
                    50 => rotation_deg = parse_f64(&value, "INSERT 旋转角（组码 50）")?,
                    _ => {}
                },
                None => return Err(DxfError::truncated("INSERT")),
            }
        }

        // 属性记录（ATTRIB ... SEQEND）紧随 INSERT，文字内容不参与几何重建。
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ATTRIB" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::syntax(format!(
                        "INSERT 属性段出现意外组码 {code} 值 {value}"
                    )));
                }
                None => break,
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let name = name.ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
        let ix = insert_x.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 Y（组码 20）"))?;

        Ok(Entity::BlockReference(BlockReference {
            name,
            insert: Point2::new(ix, iy),
            scale: Vector2::new(scale_x.unwrap_or(1.0), scale_y.unwrap_or(1.0)),
            rotation: rotation_deg.to_radians(),
            layer,
        }))
    }

    fn parse_hatch(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut pattern_name = "SOLID".to_string();
        let mut is_solid = false;
        let mut loops: Vec<HatchLoop> = Vec::new();
        let mut current_loop: Option<PartialLoop> = None;
        let mut edge_builder: Option<EdgeBuilder> = None;
        // 图案样式（75）或种子点（98）之后不再有边界数据
        let mut boundaries_done = false;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    finalize_loop(&mut current_loop, &mut loops, &mut edge_builder)?;
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => {
                    if boundaries_done {
                        continue;
                    }
                    match code {
                        8 => layer = Some(value.trim().to_string()),
                        2 => pattern_name = value.trim().to_string(),
                        70 => {
                            let flag = parse_i16(&value, "HATCH 实体填充标志（组码 70）")?;
                            is_solid = (flag & 1) != 0;
                        }
                        75 | 98 => {
                            finalize_loop(&mut current_loop, &mut loops, &mut edge_builder)?;
                            boundaries_done = true;
                        }
                        92 => {
                            finalize_loop(&mut current_loop, &mut loops, &mut edge_builder)?;
                            let flags = parse_i32(&value, "HATCH 环路类型（组码 92）")?;
                            current_loop = Some(PartialLoop::new(flags));
                        }
                        93 => {
                            if let Some(loop_data) = current_loop.as_mut() {
                                loop_data.expected_count =
                                    Some(parse_i32(&value, "HATCH 边计数（组码 93）")?.max(0) as usize);
                            }
                        }
                        72 => {
                            let loop_data = current_loop.as_mut().ok_or_else(|| {
                                DxfError::invalid("HATCH 在缺少环路的情况下出现了边定义（组码 72）")
                            })?;
                            if loop_data.is_polyline {
                                loop_data.has_bulge =
                                    parse_i32(&value, "HATCH 多段线 bulge 标记（组码 72）")? != 0;
                            } else {
                                loop_data.finalize_edge_builder(edge_builder.take())?;
                                edge_builder = Some(EdgeBuilder::new(parse_i32(
                                    &value,
                                    "HATCH 边类型（组码 72）",
                                )?)?);
                            }
                        }
                        73 => {
                            if let Some(loop_data) = current_loop.as_mut() {
                                if loop_data.is_polyline {
                                    loop_data.is_closed =
                                        parse_i32(&value, "HATCH 多段线闭合标记（组码 73）")? != 0;
                                } else if let Some(builder) = edge_builder.as_mut() {
                                    match builder {
                                        EdgeBuilder::Arc {
                                            is_counter_clockwise,
                                            ..
                                        }
                                        | EdgeBuilder::Ellipse {
                                            is_counter_clockwise,
                                            ..
                                        } => {
                                            *is_counter_clockwise =
                                                parse_i32(&value, "HATCH 边方向标记（组码 73）")?
                                                    != 0;
                                        }
                                        EdgeBuilder::Spline(spline) => {
                                            spline.is_rational =
                                                parse_i32(&value, "HATCH 样条有理标记（组码 73）")?
                                                    != 0;
                                        }
                                        EdgeBuilder::Line { .. } => {}
                                    }
                                }
                            }
                        }
                        74 => {
                            if let Some(EdgeBuilder::Spline(spline)) = edge_builder.as_mut() {
                                spline.is_periodic =
                                    parse_i32(&value, "HATCH 样条周期标记（组码 74）")? != 0;
                            }
                        }
                        94 => {
                            if let Some(EdgeBuilder::Spline(spline)) = edge_builder.as_mut() {
                                spline.degree =
                                    Some(parse_i32(&value, "HATCH 样条阶数（组码 94）")?);
                            }
                        }
                        10 | 20 | 11 | 21 => {
                            if let Some(loop_data) = current_loop.as_mut() {
                                if loop_data.is_polyline {
                                    loop_data.push_vertex_coord(code, &value)?;
                                } else if let Some(builder) = edge_builder.as_mut() {
                                    builder.push_coord(code, &value)?;
                                }
                            }
                        }
                        40 => {
                            if let Some(builder) = edge_builder.as_mut() {
                                match builder {
                                    EdgeBuilder::Arc { radius, .. } => {
                                        *radius =
                                            Some(parse_f64(&value, "HATCH 圆弧半径（组码 40）")?);
                                    }
                                    EdgeBuilder::Ellipse { minor_ratio, .. } => {
                                        *minor_ratio =
                                            Some(parse_f64(&value, "HATCH 椭圆轴比（组码 40）")?);
                                    }
                                    EdgeBuilder::Spline(spline) => {
                                        spline.knot_values.push(parse_f64(
                                            &value,
                                            "HATCH 样条节点（组码 40）",
                                        )?);
                                    }
                                    EdgeBuilder::Line { .. } => {}
                                }
                            }
                        }
                        42 => {
                            if let Some(loop_data) = current_loop.as_mut() {
                                if loop_data.is_polyline {
                                    let bulge = parse_f64(&value, "HATCH 多段线 bulge（组码 42）")?;
                                    if let Some(last) = loop_data.poly_vertices.last_mut() {
                                        last.bulge = bulge;
                                    }
                                } else if let Some(EdgeBuilder::Spline(spline)) =
                                    edge_builder.as_mut()
                                {
                                    spline
                                        .weights
                                        .push(parse_f64(&value, "HATCH 样条权重（组码 42）")?);
                                }
                            }
                        }
                        50 | 51 => {
                            if let Some(builder) = edge_builder.as_mut() {
                                builder.push_angle(code, &value)?;
                            }
                        }
                        _ => {}
                    }
                }
                None => return Err(DxfError::truncated("HATCH")),
            }
        }

        if loops.is_empty() {
            return Err(DxfError::invalid("HATCH 缺少边界定义"));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        Ok(Entity::Hatch(Hatch {
            pattern_name,
            is_solid,
            loops,
            layer,
        }))
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PolyVertex {
    point: Point2,
    bulge: f64,
}

struct PartialLoop {
    is_polyline: bool,
    has_bulge: bool,
    is_closed: bool,
    expected_count: Option<usize>,
    poly_vertices: Vec<PolyVertex>,
    edges: Vec<HatchEdge>,
    pending_vertex_x: Option<f64>,
}

impl PartialLoop {
    fn new(flags: i32) -> Self {
        Self {
            is_polyline: (flags & 0x02) != 0,
            has_bulge: false,
            // 边界类型的环路总是闭合的；多段线环路由组码 73 决定
            is_closed: true,
            expected_count: None,
            poly_vertices: Vec::new(),
            edges: Vec::new(),
            pending_vertex_x: None,
        }
    }

    fn push_vertex_coord(&mut self, code: i32, raw: &str) -> Result<(), DxfError> {
        match code {
            10 => {
                let x = parse_f64(raw, "HATCH 顶点 X（组码 10）")?;
                if self.pending_vertex_x.replace(x).is_some() {
                    return Err(DxfError::invalid("HATCH 多段线遇到重复的顶点 X（组码 10）"));
                }
            }
            20 => {
                let y = parse_f64(raw, "HATCH 顶点 Y（组码 20）")?;
                let x = self.pending_vertex_x.take().ok_or_else(|| {
                    DxfError::invalid("HATCH 顶点 Y 前未读取到对应的 X 值（组码 20）")
                })?;
                self.poly_vertices.push(PolyVertex {
                    point: Point2::new(x, y),
                    bulge: 0.0,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn finalize_edge_builder(&mut self, builder: Option<EdgeBuilder>) -> Result<(), DxfError> {
        if let Some(edge_builder) = builder {
            self.edges.push(edge_builder.finish()?);
        }
        Ok(())
    }

    fn finalize(mut self) -> Result<HatchLoop, DxfError> {
        if let Some(pending) = self.pending_vertex_x {
            return Err(DxfError::invalid(format!(
                "HATCH 顶点 X={pending} 缺少对应的 Y 坐标"
            )));
        }
        if self.is_polyline {
            if let Some(expected) = self.expected_count {
                if expected != self.poly_vertices.len() {
                    return Err(DxfError::invalid(format!(
                        "HATCH 多段线环路声明的顶点数量 {expected} 与实际数量 {} 不符",
                        self.poly_vertices.len()
                    )));
                }
            }
            self.convert_polyline_vertices_to_edges();
        }
        Ok(HatchLoop {
            is_polyline: self.is_polyline,
            is_closed: self.is_closed,
            edges: self.edges,
        })
    }

    fn convert_polyline_vertices_to_edges(&mut self) {
        let len = self.poly_vertices.len();
        if len < 2 {
            return;
        }
        let segments = if self.is_closed { len } else { len - 1 };
        for i in 0..segments {
            let current = &self.poly_vertices[i];
            let next = &self.poly_vertices[(i + 1) % len];
            self.edges.push(HatchEdge::PolylineSegment {
                start: current.point,
                end: next.point,
                bulge: if self.has_bulge { current.bulge } else { 0.0 },
            });
        }
    }
}

enum EdgeBuilder {
    Line {
        start: CoordSlot,
        end: CoordSlot,
    },
    Arc {
        center: CoordSlot,
        radius: Option<f64>,
        start_angle: Option<f64>,
        end_angle: Option<f64>,
        is_counter_clockwise: bool,
    },
    Ellipse {
        center: CoordSlot,
        major_axis: CoordSlot,
        minor_ratio: Option<f64>,
        start_angle: Option<f64>,
        end_angle: Option<f64>,
        is_counter_clockwise: bool,
    },
    Spline(SplineBuilder),
}

#[derive(Default)]
struct CoordSlot {
    x: Option<f64>,
    y: Option<f64>,
}

impl CoordSlot {
    fn finish(&self, context: &str) -> Result<Point2, DxfError> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Ok(Point2::new(x, y)),
            _ => Err(DxfError::invalid(format!("HATCH {context} 坐标不完整"))),
        }
    }
}

impl EdgeBuilder {
    fn new(edge_type: i32) -> Result<Self, DxfError> {
        match edge_type {
            1 => Ok(Self::Line {
                start: CoordSlot::default(),
                end: CoordSlot::default(),
            }),
            2 => Ok(Self::Arc {
                center: CoordSlot::default(),
                radius: None,
                start_angle: None,
                end_angle: None,
                is_counter_clockwise: true,
            }),
            3 => Ok(Self::Ellipse {
                center: CoordSlot::default(),
                major_axis: CoordSlot::default(),
                minor_ratio: None,
                start_angle: None,
                end_angle: None,
                is_counter_clockwise: true,
            }),
            4 => Ok(Self::Spline(SplineBuilder::default())),
            other => Err(DxfError::invalid(format!("HATCH 未知的边界边类型 {other}"))),
        }
    }

    fn push_coord(&mut self, code: i32, raw: &str) -> Result<(), DxfError> {
        match self {
            EdgeBuilder::Line { start, end } => match code {
                10 => assign_coord(&mut start.x, raw, "HATCH 直线起点 X（组码 10）"),
                20 => assign_coord(&mut start.y, raw, "HATCH 直线起点 Y（组码 20）"),
                11 => assign_coord(&mut end.x, raw, "HATCH 直线终点 X（组码 11）"),
                21 => assign_coord(&mut end.y, raw, "HATCH 直线终点 Y（组码 21）"),
                _ => Ok(()),
            },
            EdgeBuilder::Arc { center, .. } => match code {
                10 => assign_coord(&mut center.x, raw, "HATCH 圆弧圆心 X（组码 10）"),
                20 => assign_coord(&mut center.y, raw, "HATCH 圆弧圆心 Y（组码 20）"),
                _ => Ok(()),
            },
            EdgeBuilder::Ellipse {
                center, major_axis, ..
            } => match code {
                10 => assign_coord(&mut center.x, raw, "HATCH 椭圆圆心 X（组码 10）"),
                20 => assign_coord(&mut center.y, raw, "HATCH 椭圆圆心 Y（组码 20）"),
                11 => assign_coord(&mut major_axis.x, raw, "HATCH 椭圆主轴 X（组码 11）"),
                21 => assign_coord(&mut major_axis.y, raw, "HATCH 椭圆主轴 Y（组码 21）"),
                _ => Ok(()),
            },
            EdgeBuilder::Spline(spline) => match code {
                10 => spline.push_control_x(parse_f64(raw, "HATCH 样条控制点 X（组码 10）")?),
                20 => spline.push_control_y(parse_f64(raw, "HATCH 样条控制点 Y（组码 20）")?),
                11 => spline.push_fit_x(parse_f64(raw, "HATCH 样条拟合点 X（组码 11）")?),
                21 => spline.push_fit_y(parse_f64(raw, "HATCH 样条拟合点 Y（组码 21）")?),
                _ => Ok(()),
            },
        }
    }

    fn push_angle(&mut self, code: i32, raw: &str) -> Result<(), DxfError> {
        let (start_angle, end_angle) = match self {
            EdgeBuilder::Arc {
                start_angle,
                end_angle,
                ..
            }
            | EdgeBuilder::Ellipse {
                start_angle,
                end_angle,
                ..
            } => (start_angle, end_angle),
            _ => return Ok(()),
        };
        match code {
            50 => assign_coord(start_angle, raw, "HATCH 边起始角（组码 50）"),
            51 => assign_coord(end_angle, raw, "HATCH 边终止角（组码 51）"),
            _ => Ok(()),
        }
    }

    fn finish(self) -> Result<HatchEdge, DxfError> {
        match self {
            EdgeBuilder::Line { start, end } => Ok(HatchEdge::Line {
                start: start.finish("直线边起点")?,
                end: end.finish("直线边终点")?,
            }),
            EdgeBuilder::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => {
                let center = center.finish("圆弧边圆心")?;
                let radius = radius.ok_or_else(|| DxfError::invalid("HATCH 圆弧边缺少半径"))?;
                let start_angle =
                    start_angle.ok_or_else(|| DxfError::invalid("HATCH 圆弧边缺少起始角"))?;
                let end_angle =
                    end_angle.ok_or_else(|| DxfError::invalid("HATCH 圆弧边缺少终止角"))?;
                let (start_angle, end_angle) =
                    edge_angles(start_angle, end_angle, is_counter_clockwise);
                Ok(HatchEdge::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    is_counter_clockwise,
                })
            }
            EdgeBuilder::Ellipse {
                center,
                major_axis,
                minor_ratio,
                start_angle,
                end_angle,
                is_counter_clockwise,
            } => {
                let center = center.finish("椭圆边圆心")?;
                let major = major_axis.finish("椭圆边主轴")?;
                let minor_ratio =
                    minor_ratio.ok_or_else(|| DxfError::invalid("HATCH 椭圆边缺少轴比"))?;
                let start_angle =
                    start_angle.ok_or_else(|| DxfError::invalid("HATCH 椭圆边缺少起始角"))?;
                let end_angle =
                    end_angle.ok_or_else(|| DxfError::invalid("HATCH 椭圆边缺少终止角"))?;
                let (start_angle, end_angle) =
                    edge_angles(start_angle, end_angle, is_counter_clockwise);
                Ok(HatchEdge::Ellipse {
                    center,
                    major_axis: Vector2::new(major.x(), major.y()),
                    minor_ratio,
                    start_angle,
                    end_angle,
                    is_counter_clockwise,
                })
            }
            EdgeBuilder::Spline(builder) => builder.finish(),
        }
    }
}

/// 组码 50/51 以角度存储；顺时针边的角度按镜像方式记录，需要取反还原实际方位。
fn edge_angles(start_deg: f64, end_deg: f64, is_counter_clockwise: bool) -> (f64, f64) {
    if is_counter_clockwise {
        (start_deg.to_radians(), end_deg.to_radians())
    } else {
        (-start_deg.to_radians(), -end_deg.to_radians())
    }
}

#[derive(Default)]
struct SplineBuilder {
    control_points: Vec<Point2>,
    fit_points: Vec<Point2>,
    knot_values: Vec<f64>,
    weights: Vec<f64>,
    degree: Option<i32>,
    is_rational: bool,
    is_periodic: bool,
    pending_control_x: Option<f64>,
    pending_fit_x: Option<f64>,
}

impl SplineBuilder {
    fn push_control_x(&mut self, value: f64) -> Result<(), DxfError> {
        if self.pending_control_x.replace(value).is_some() {
            Err(DxfError::invalid("HATCH 样条边遇到重复的控制点 X（组码 10）"))
        } else {
            Ok(())
        }
    }

    fn push_control_y(&mut self, value: f64) -> Result<(), DxfError> {
        let x = self
            .pending_control_x
            .take()
            .ok_or_else(|| DxfError::invalid("HATCH 样条边缺少控制点 X（组码 10）"))?;
        self.control_points.push(Point2::new(x, value));
        Ok(())
    }

    fn push_fit_x(&mut self, value: f64) -> Result<(), DxfError> {
        if self.pending_fit_x.replace(value).is_some() {
            Err(DxfError::invalid("HATCH 样条边遇到重复的拟合点 X（组码 11）"))
        } else {
            Ok(())
        }
    }

    fn push_fit_y(&mut self, value: f64) -> Result<(), DxfError> {
        let x = self
            .pending_fit_x
            .take()
            .ok_or_else(|| DxfError::invalid("HATCH 样条边缺少拟合点 X（组码 11）"))?;
        self.fit_points.push(Point2::new(x, value));
        Ok(())
    }

    fn finish(mut self) -> Result<HatchEdge, DxfError> {
        if let Some(x) = self.pending_control_x.take() {
            return Err(DxfError::invalid(format!(
                "HATCH 样条边控制点 X={x} 缺少对应的 Y 坐标"
            )));
        }
        if let Some(x) = self.pending_fit_x.take() {
            return Err(DxfError::invalid(format!(
                "HATCH 样条边拟合点 X={x} 缺少对应的 Y 坐标"
            )));
        }
        if self.control_points.len() < 2 && self.fit_points.len() < 2 {
            return Err(DxfError::invalid("HATCH 样条边至少需要两个控制点或拟合点"));
        }
        Ok(HatchEdge::Spline {
            control_points: self.control_points,
            fit_points: self.fit_points,
            knot_values: self.knot_values,
            weights: self.weights,
            degree: self.degree.unwrap_or(3),
            is_rational: self.is_rational,
            is_periodic: self.is_periodic,
        })
    }
}

fn finalize_loop(
    current_loop: &mut Option<PartialLoop>,
    loops: &mut Vec<HatchLoop>,
    edge_builder: &mut Option<EdgeBuilder>,
) -> Result<(), DxfError> {
    if let Some(mut loop_data) = current_loop.take() {
        loop_data.finalize_edge_builder(edge_builder.take())?;
        loops.push(loop_data.finalize()?);
    }
    Ok(())
}
