use crate::errors::PipelineError;
use crate::types::{Line, LineKey, Token, Word};
use std::collections::BTreeMap;

/// Lines in reading order plus the text derived from them
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedText {
    pub lines: Vec<Line>,
    /// Surviving tokens in reading order
    pub words: Vec<Word>,
    /// Line texts joined by `\n`, before any normalization
    pub raw_text: String,
}

impl ReconstructedText {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn validate(tokens: &[Token]) -> Result<(), PipelineError> {
    for (i, token) in tokens.iter().enumerate() {
        if !token.confidence.is_finite() {
            return Err(PipelineError::ProcessingFailed(format!(
                "token {} has non-finite confidence",
                i
            )));
        }
        if token.bbox.is_inverted() {
            return Err(PipelineError::ProcessingFailed(format!(
                "token {} ('{}') has inverted box {:?}",
                i, token.text, token.bbox
            )));
        }
    }
    Ok(())
}

fn build_line(words: Vec<Word>) -> Option<Line> {
    let first = words.first()?;
    let bbox = words
        .iter()
        .skip(1)
        .fold(first.bbox, |acc, w| acc.union(&w.bbox));
    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Some(Line {
        text,
        words,
        bbox,
        confidence,
    })
}

/// Group recognizer tokens into lines.
///
/// Tokens without content (confidence <= 0 or blank text) are dropped. The
/// rest are bucketed by `(block, paragraph, line)`; buckets come out in key
/// order and keep arrival order inside. Zero surviving tokens is a valid,
/// empty result.
pub fn reconstruct_lines(tokens: &[Token]) -> Result<ReconstructedText, PipelineError> {
    validate(tokens)?;

    let mut groups: BTreeMap<LineKey, Vec<Word>> = BTreeMap::new();
    for token in tokens.iter().filter(|t| t.carries_text()) {
        groups.entry(token.key).or_default().push(Word::from(token));
    }

    let lines: Vec<Line> = groups.into_values().filter_map(build_line).collect();

    let words = lines.iter().flat_map(|l| l.words.iter().cloned()).collect();
    let raw_text = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    log::info!(
        "Reconstructed {} lines from {} tokens",
        lines.len(),
        tokens.len()
    );

    Ok(ReconstructedText {
        lines,
        words,
        raw_text,
    })
}
