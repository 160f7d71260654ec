use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

mod registry;

pub use registry::{replace_record, DocumentRegistry, RegistryError};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Xlsx,
    Docx,
    Ppt,
    Image,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Docx => "docx",
            Self::Ppt => "ppt",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "xlsx" => Ok(Self::Xlsx),
            "docx" => Ok(Self::Docx),
            "ppt" => Ok(Self::Ppt),
            "image" => Ok(Self::Image),
            other => Err(format!("unsupported file type: {other}")),
        }
    }
}

/// A document known to the shell. Identity, locator and the metadata shared
/// with every other view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub name: String,
    pub uri: String,
    #[serde(rename = "fileType")]
    pub file_type: FileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DocumentRecord {
    pub fn new(
        id: impl Into<DocumentId>,
        name: impl Into<String>,
        uri: impl Into<String>,
        file_type: FileType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uri: uri.into(),
            file_type,
            assign: None,
            status: None,
        }
    }

    /// Same identity and locator, new metadata. Values are stored verbatim,
    /// including empty strings.
    pub fn with_metadata(&self, assign: &str, status: &str) -> Self {
        Self {
            assign: Some(assign.to_owned()),
            status: Some(status.to_owned()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Square,
    Circle,
    Triangle,
}

impl std::str::FromStr for ShapeKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "circle" => Ok(Self::Circle),
            "triangle" => Ok(Self::Triangle),
            other => Err(format!("unsupported shape: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// One overlay shape. Position semantics belong to the drawing widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub position: Position,
    pub size: Size,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub text: String,
}

impl Shape {
    pub fn new(kind: ShapeKind, position: Position, size: Size) -> Self {
        Self { kind, position, size, text: String::new() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Everything saved for one document. Shape order is z-order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub comment: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub assign: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub status: String,
}

impl Snapshot {
    pub fn has_content(&self) -> bool {
        !self.shapes.is_empty()
            || !self.comment.is_empty()
            || !self.assign.is_empty()
            || !self.status.is_empty()
    }
}

fn empty_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
