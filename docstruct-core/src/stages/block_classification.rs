use crate::config::BlockClassificationConfig;
use crate::types::{short_id, BlockContent, BlockType, LayoutBlock, Line};

/// Median of line heights; mean of the middle pair for even counts
pub fn median_line_height(lines: &[Line]) -> Option<f32> {
    if lines.is_empty() {
        return None;
    }
    let mut heights: Vec<i32> = lines.iter().map(Line::height).collect();
    heights.sort_unstable();
    let mid = heights.len() / 2;
    let median = if heights.len() % 2 == 0 {
        (heights[mid - 1] as f32 + heights[mid] as f32) / 2.0
    } else {
        heights[mid] as f32
    };
    Some(median)
}

/// Has at least one cased character and no lower-case ones
fn is_upper_case(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

pub struct BlockClassifier {
    config: BlockClassificationConfig,
}

impl BlockClassifier {
    pub fn new(config: BlockClassificationConfig) -> Self {
        Self { config }
    }

    /// Header when clearly taller than the median, or when it is a short
    /// all-caps line that is at least somewhat taller
    pub fn classify_line(&self, line: &Line, median_height: f32) -> BlockType {
        let height = line.height() as f32;
        if height > median_height * self.config.header_height_ratio {
            return BlockType::Header;
        }
        if is_upper_case(&line.text)
            && line.text.chars().count() < self.config.caps_header_max_chars
            && height > median_height
        {
            return BlockType::Header;
        }
        BlockType::Paragraph
    }

    /// One block per line, same order
    pub fn classify(&self, lines: &[Line]) -> Vec<LayoutBlock> {
        let Some(median) = median_line_height(lines) else {
            return Vec::new();
        };

        let blocks: Vec<LayoutBlock> = lines
            .iter()
            .map(|line| LayoutBlock {
                block_type: self.classify_line(line, median),
                id: short_id("blk"),
                bbox: line.bbox,
                confidence: line.confidence,
                content: BlockContent {
                    text: line.text.clone(),
                },
            })
            .collect();

        let headers = blocks
            .iter()
            .filter(|b| b.block_type == BlockType::Header)
            .count();
        log::debug!(
            "Classified {} blocks ({} headers, median line height {:.1}px)",
            blocks.len(),
            headers,
            median
        );
        blocks
    }
}
