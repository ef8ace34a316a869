use std::convert::TryFrom;

/// 读取阶段的内部错误。
///
/// `Syntax` 表示组码流本身损坏，整个文件无法继续读取；`Invalid` 只影响
/// 当前实体，调用方会跳过该实体并记录；`Unsupported` 表示合法但暂不处理的内容。
#[derive(Debug)]
pub(crate) enum DxfError {
    Syntax { message: String },
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// 实体数据在文件末尾被截断。
    pub(crate) fn truncated(kind: &str) -> Self {
        Self::syntax(format!("{kind} 未正确结束，文件提前结束"))
    }
}

/// ASCII DXF 组码/值对读取器，支持回退一个组码对。
pub(crate) struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
    entity_layer: Option<String>,
}

impl<'a> DxfReader<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
            entity_layer: None,
        }
    }

    pub(crate) fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 文件末尾的空行不构成组码对。
                    if line.trim().is_empty() && self.remaining_is_blank() {
                        return Ok(None);
                    }
                    break line;
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::syntax(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::syntax(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();

        if code == 8 {
            self.entity_layer = Some(value.trim().to_string());
        }
        Ok(Some((code, value)))
    }

    pub(crate) fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }

    /// 开始读取新实体，清除上一实体的图层记录。
    pub(crate) fn begin_entity(&mut self) {
        self.entity_layer = None;
    }

    /// 当前实体中最近读到的图层（组码 8），用于记录被跳过实体的位置。
    pub(crate) fn entity_layer(&self) -> Option<String> {
        self.entity_layer.clone()
    }

    #[inline]
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    fn remaining_is_blank(&self) -> bool {
        self.lines.clone().all(|line| line.trim().is_empty())
    }
}

pub(crate) fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DxfError::invalid(format!("{context} 不是有限数值（值：\"{raw}\"）")))
    }
}

pub(crate) fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

pub(crate) fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

/// 写入单值坐标槽位，重复出现视为数据损坏。
pub(crate) fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

/// 解码 MTEXT 内联格式：段落换行、不换行空格、堆叠分数与各类格式开关。
pub(crate) fn decode_mtext_content(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('P') | Some('p') | Some('X') => result.push('\n'),
                Some('~') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some('{') => result.push('{'),
                Some('}') => result.push('}'),
                Some('S') => {
                    for next in chars.by_ref() {
                        match next {
                            ';' => break,
                            '^' | '#' => result.push('/'),
                            other => result.push(other),
                        }
                    }
                }
                Some('A' | 'C' | 'F' | 'H' | 'Q' | 'T' | 'W' | 'c' | 'f' | 'h' | 'q' | 't' | 'w') => {
                    for next in chars.by_ref() {
                        if next == ';' {
                            break;
                        }
                    }
                }
                Some('L' | 'l' | 'O' | 'o' | 'K' | 'k') => {}
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            '{' | '}' => {}
            other => result.push(other),
        }
    }
    result
}

/// 解码 TEXT 中的 `%%` 控制序列。
pub(crate) fn decode_text_content(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(index) = rest.find("%%") {
        result.push_str(&rest[..index]);
        let tail = &rest[index + 2..];
        let mut chars = tail.chars();
        match chars.next() {
            Some('d' | 'D') => result.push('°'),
            Some('p' | 'P') => result.push('±'),
            Some('c' | 'C') => result.push('⌀'),
            Some('%') => result.push('%'),
            // 下划线/上划线开关不影响文字内容。
            Some('u' | 'U' | 'o' | 'O') => {}
            Some(other) => {
                result.push_str("%%");
                result.push(other);
            }
            None => result.push_str("%%"),
        }
        rest = chars.as_str();
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_supports_single_put_back() {
        let mut reader = DxfReader::new("0\nSECTION\n2\nENTITIES\n");
        let first = reader.next_pair().expect("读取失败").expect("缺少组码对");
        assert_eq!(first, (0, "SECTION".to_string()));
        reader.put_back(first.clone());
        assert_eq!(reader.next_pair().expect("读取失败"), Some(first));
        assert_eq!(
            reader.next_pair().expect("读取失败"),
            Some((2, "ENTITIES".to_string()))
        );
        assert!(reader.next_pair().expect("读取失败").is_none());
        assert_eq!(reader.line_number(), 4);
    }

    #[test]
    fn reader_rejects_dangling_group_code() {
        let mut reader = DxfReader::new("0\nSECTION\n2\n");
        reader.next_pair().expect("首个组码对应当可读");
        match reader.next_pair() {
            Err(DxfError::Syntax { message }) => assert!(message.contains("缺少")),
            other => panic!("期望语法错误，实际 {other:?}"),
        }
    }

    #[test]
    fn reader_tracks_entity_layer() {
        let mut reader = DxfReader::new("0\nLINE\n8\nWALL\n10\n1.0\n0\nARC\n");
        reader.next_pair().expect("读取失败");
        reader.begin_entity();
        while let Some((code, _)) = reader.next_pair().expect("读取失败") {
            if code == 0 {
                break;
            }
        }
        // 读到下一个实体的起始组码后仍保留当前实体的图层。
        assert_eq!(reader.entity_layer().as_deref(), Some("WALL"));
        reader.begin_entity();
        assert!(reader.entity_layer().is_none());
    }

    #[test]
    fn parse_f64_rejects_non_finite_values() {
        assert!(matches!(
            parse_f64("NaN", "测试"),
            Err(DxfError::Invalid { .. })
        ));
        assert!((parse_f64(" 2.5 ", "测试").expect("数值") - 2.5).abs() < 1e-12);
    }

    #[test]
    fn mtext_formatting_is_stripped() {
        assert_eq!(decode_mtext_content("Line1\\PLine2"), "Line1\nLine2");
        assert_eq!(
            decode_mtext_content("{\\fArial|b0|i0;\\H2.5;Sala} 1"),
            "Sala 1"
        );
        assert_eq!(decode_mtext_content("\\S1^2;"), "1/2");
    }

    #[test]
    fn text_control_codes_are_decoded() {
        assert_eq!(decode_text_content("%%c50"), "⌀50");
        assert_eq!(decode_text_content("90%%d"), "90°");
        assert_eq!(decode_text_content("%%uSALA%%u"), "SALA");
        assert_eq!(decode_text_content("100%%%"), "100%");
    }
}
