use crate::types::*;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub index: usize,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Ordered layout blocks only
#[derive(Debug, Clone, Serialize)]
pub struct BlocksDocument {
    pub format: String,
    pub document_id: String,
    pub blocks: Vec<BlockSummary>,
    pub tables: Vec<BoundingBox>,
}

/// Normalized text plus the per-line text it was built from
#[derive(Debug, Clone, Serialize)]
pub struct TextDocument {
    pub format: String,
    pub document_id: String,
    pub full_text: String,
    pub lines: Vec<String>,
}

impl DocumentResult {
    pub fn to_blocks_format(&self) -> BlocksDocument {
        let blocks = self
            .layout
            .blocks
            .iter()
            .enumerate()
            .map(|(index, block)| BlockSummary {
                index,
                block_type: block.block_type,
                text: block.content.text.clone(),
                bbox: block.bbox,
                confidence: block.confidence,
            })
            .collect();

        BlocksDocument {
            format: "blocks".to_string(),
            document_id: self.document_id.clone(),
            blocks,
            tables: self.tables.iter().map(|t| t.bbox).collect(),
        }
    }

    pub fn to_text_format(&self) -> TextDocument {
        TextDocument {
            format: "text".to_string(),
            document_id: self.document_id.clone(),
            full_text: self.text_content.full_text.clone(),
            lines: self
                .text_content
                .lines
                .iter()
                .map(|l| l.text.clone())
                .collect(),
        }
    }

    /// Pretty JSON in the named format; unknown names mean `document`
    pub fn to_json_with_format(&self, format: &str) -> Result<String> {
        let json = match format {
            "blocks" => serde_json::to_string_pretty(&self.to_blocks_format())?,
            "text" => serde_json::to_string_pretty(&self.to_text_format())?,
            "document" | _ => serde_json::to_string_pretty(self)?,
        };
        Ok(json)
    }

    pub fn save_to_json(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn save_with_format(&self, path: &str, format: &str) -> Result<()> {
        match format {
            "blocks" | "text" => {
                let json = self.to_json_with_format(format)?;
                std::fs::write(path, json)?;
            }
            "document" | _ => {
                self.save_to_json(path)?;
            }
        }
        Ok(())
    }
}
