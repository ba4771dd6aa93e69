use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// The schema version stamped on every document result.
/// Bump this when the output shape changes.
pub const SCHEMA_VERSION: &str = "1.0.0";

// ===== GEOMETRY =====

/// Axis-aligned box in pixel space of the image fed to recognition.
/// `x1,y1` is the top-left corner, `x2,y2` the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a recognizer-style `left, top, width, height` quadruple
    pub fn from_ltwh(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    /// Like `from_ltwh`, but `None` when the far corner overflows `i32`
    pub fn checked_from_ltwh(left: i32, top: i32, width: i32, height: i32) -> Option<Self> {
        Some(Self::new(
            left,
            top,
            left.checked_add(width)?,
            top.checked_add(height)?,
        ))
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_inverted(&self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }

    /// Coordinate-wise union (min of left/top, max of right/bottom)
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

// ===== RECOGNIZER OUTPUT =====

/// Grouping key assigned by the recognizer. Ordering is lexicographic
/// (block, then paragraph, then line), which is natural reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
}

impl LineKey {
    pub fn new(block: u32, paragraph: u32, line: u32) -> Self {
        Self {
            block,
            paragraph,
            line,
        }
    }
}

/// A single recognized word as emitted by the external recognizer.
///
/// Structural rows (empty text, confidence <= 0) are passed through untouched;
/// the line reconstructor is responsible for discarding them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub bbox: BoundingBox,
    /// Recognition confidence in [0, 100]; negative for structural rows
    pub confidence: f32,
    pub key: LineKey,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub word: u32,
}

impl Token {
    pub fn new(text: &str, bbox: BoundingBox, confidence: f32, key: LineKey) -> Self {
        Self {
            text: text.to_string(),
            bbox,
            confidence,
            key,
            page: 1,
            word: 0,
        }
    }

    /// Tokens with content: positive confidence and non-blank text
    pub fn carries_text(&self) -> bool {
        self.confidence > 0.0 && !self.text.trim().is_empty()
    }
}

/// Word as reported in the response (text trimmed, box, confidence)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl From<&Token> for Word {
    fn from(token: &Token) -> Self {
        Self {
            text: token.text.trim().to_string(),
            bbox: token.bbox,
            confidence: token.confidence,
        }
    }
}

// ===== DERIVED STRUCTURE =====

/// One visual line of text, reconstructed from tokens sharing a `LineKey`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    pub words: Vec<Word>,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl Line {
    pub fn height(&self) -> i32 {
        self.bbox.height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Header,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockContent {
    pub text: String,
}

/// A classified layout unit. Derived 1:1 from a `Line`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub id: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub content: BlockContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    pub row_span: u32,
    pub col_span: u32,
    pub bbox: BoundingBox,
}

/// Rectangular grid region found from ruling lines.
/// `rows` stays empty: no cell-intersection analysis is performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    pub id: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub rows: Vec<Vec<TableCell>>,
}

/// De-duplicated entity collections. Ordered sets keep serialized output stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub dates: BTreeSet<String>,
    pub amounts: BTreeSet<String>,
    pub emails: BTreeSet<String>,
    pub phones: BTreeSet<String>,
}

impl EntitySet {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
            && self.amounts.is_empty()
            && self.emails.is_empty()
            && self.phones.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len() + self.amounts.len() + self.emails.len() + self.phones.len()
    }
}

// ===== RESPONSE =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// 0 when the source carries no resolution information
    pub dpi: u32,
    pub format: String,
    pub color_space: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub ocr_engine: String,
    pub model_type: String,
    pub language: String,
    pub runtime_ms: f64,
    pub processed_offline: bool,
    pub version: String,
    pub processed_at: DateTime<Utc>,
    /// Measured skew in degrees (None when nothing was measured)
    pub skew_angle: Option<f32>,
    pub stage_timings: Vec<StageTiming>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Line texts joined with newlines, before normalization
    pub raw_text: String,
    /// Whitespace-collapsed text
    pub full_text: String,
    pub lines: Vec<Line>,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub blocks: Vec<LayoutBlock>,
}

/// Top-level aggregate for one processed image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub schema_version: String,
    pub document_id: String,
    pub processing_mode: String,
    pub image_metadata: ImageMetadata,
    pub layout: Layout,
    pub text_content: TextContent,
    pub tables: Vec<TableRegion>,
    pub entities: EntitySet,
    pub processing_metadata: ProcessingMetadata,
}

/// Short, prefixed identifier such as `blk_1a2b3c4d`
pub fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &hex[..8])
}

/// Request-scoped document identifier (full UUID hex)
pub fn document_id() -> String {
    Uuid::new_v4().simple().to_string()
}
