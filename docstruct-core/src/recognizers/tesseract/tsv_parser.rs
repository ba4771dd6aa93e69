//! Tesseract TSV Parser
//!
//! Parses the tab-separated output of `tesseract ... tsv` into Tokens.
//!
//! Each row carries:
//! - `level` (1 page, 2 block, 3 paragraph, 4 line, 5 word)
//! - `page_num block_num par_num line_num word_num` grouping ordinals
//! - `left top width height` box in pixels
//! - `conf` (-1 on structural rows) and `text` (may be absent)
//!
//! All rows are returned; filtering belongs to line reconstruction.

use crate::errors::RecognitionError;
use crate::types::{BoundingBox, LineKey, Token};

const HEADER_PREFIX: &str = "level";
const MIN_COLUMNS: usize = 11;

/// Parse a complete TSV document
pub fn parse_tsv(tsv: &str) -> Result<Vec<Token>, RecognitionError> {
    let mut tokens = Vec::new();

    for (index, row) in tsv.lines().enumerate() {
        let row = row.trim_end_matches('\r');
        if row.trim().is_empty() || row.starts_with(HEADER_PREFIX) {
            continue;
        }
        tokens.push(parse_row(row, index + 1)?);
    }

    Ok(tokens)
}

fn parse_row(row: &str, line_number: usize) -> Result<Token, RecognitionError> {
    let columns: Vec<&str> = row.splitn(12, '\t').collect();
    if columns.len() < MIN_COLUMNS {
        return Err(RecognitionError::MalformedOutput(format!(
            "row {} has {} columns, expected at least {}",
            line_number,
            columns.len(),
            MIN_COLUMNS
        )));
    }

    let int = |i: usize, name: &str| -> Result<i32, RecognitionError> {
        columns[i].trim().parse::<i32>().map_err(|_| {
            RecognitionError::MalformedOutput(format!(
                "row {}: {} '{}' is not an integer",
                line_number, name, columns[i]
            ))
        })
    };
    let ordinal = |i: usize, name: &str| -> Result<u32, RecognitionError> {
        let value = int(i, name)?;
        u32::try_from(value).map_err(|_| {
            RecognitionError::MalformedOutput(format!(
                "row {}: {} {} is negative",
                line_number, name, value
            ))
        })
    };

    let page = ordinal(1, "page_num")?;
    let key = LineKey::new(
        ordinal(2, "block_num")?,
        ordinal(3, "par_num")?,
        ordinal(4, "line_num")?,
    );
    let word = ordinal(5, "word_num")?;
    let bbox = BoundingBox::checked_from_ltwh(
        int(6, "left")?,
        int(7, "top")?,
        int(8, "width")?,
        int(9, "height")?,
    )
    .ok_or_else(|| {
        RecognitionError::MalformedOutput(format!("row {}: box overflows", line_number))
    })?;
    let confidence = columns[10].trim().parse::<f32>().map_err(|_| {
        RecognitionError::MalformedOutput(format!(
            "row {}: conf '{}' is not a number",
            line_number, columns[10]
        ))
    })?;
    let text = columns.get(11).copied().unwrap_or_default();

    Ok(Token {
        text: text.to_string(),
        bbox,
        confidence,
        key,
        page,
        word,
    })
}
