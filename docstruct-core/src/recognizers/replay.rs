use crate::errors::RecognitionError;
use crate::recognizers::{StopSignal, TokenRecognizer};
use crate::types::Token;
use anyhow::{Context, Result};
use image::GrayImage;
use std::path::Path;

/// Replays tokens recorded earlier (a `tokens.json` stage dump or a fixture)
///
/// The image is ignored: the same tokens come back for every call.
#[derive(Debug, Clone)]
pub struct ReplayRecognizer {
    tokens: Vec<Token>,
}

impl ReplayRecognizer {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let tokens: Vec<Token> = serde_json::from_str(json).context("invalid token JSON")?;
        Ok(Self::new(tokens))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tokens from {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl TokenRecognizer for ReplayRecognizer {
    fn recognize(
        &self,
        _image: &GrayImage,
        signal: &StopSignal,
    ) -> Result<Vec<Token>, RecognitionError> {
        signal.check()?;
        Ok(self.tokens.clone())
    }

    fn name(&self) -> &str {
        "replay"
    }

    fn is_available(&self) -> bool {
        true
    }
}
