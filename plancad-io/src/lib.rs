use std::fs;
use std::path::{Path, PathBuf};

use plancad_core::document::Document;
use thiserror::Error;
use tracing::debug;

mod parser;
mod reader;

use parser::DxfParser;
use reader::DxfError;

/// 二进制 DXF 的文件头标记。
const BINARY_DXF_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

impl From<DxfError> for IoError {
    fn from(err: DxfError) -> Self {
        match err {
            DxfError::Unsupported { feature } => IoError::UnsupportedFeature(feature),
            DxfError::Invalid { message } | DxfError::Syntax { message } => {
                IoError::InvalidDocument(message)
            }
        }
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// ASCII DXF 读取入口。
///
/// 只读取 `BLOCKS` 与 `ENTITIES` 段；单个实体的数据问题不会中断读取，
/// 而是记录在 [`Document::issues`] 中。
#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 从内存中的 DXF 文本构建文档。
    pub fn parse_str(&self, source: &str) -> Result<Document, IoError> {
        let document = DxfParser::new(source).parse()?;
        debug!(
            entities = document.entity_count(),
            blocks = document.blocks().count(),
            issues = document.issues().len(),
            "DXF 读取完成"
        );
        Ok(document)
    }

    /// 从原始字节构建文档，非 UTF-8 内容按有损方式解码。
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Document, IoError> {
        if bytes.starts_with(BINARY_DXF_SENTINEL) {
            return Err(IoError::UnsupportedFeature("binary DXF".to_string()));
        }
        let source = String::from_utf8_lossy(bytes);
        self.parse_str(&source)
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = data.len(), "读取 DXF 文件");
        self.parse_bytes(&data)
    }
}
