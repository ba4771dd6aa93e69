use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_min_skew_degrees() -> f32 {
    0.5
}

fn default_header_height_ratio() -> f32 {
    1.5
}

fn default_caps_header_max_chars() -> usize {
    50
}

fn default_adaptive_block_size() -> u32 {
    11
}

fn default_adaptive_c() -> i32 {
    2
}

fn default_kernel_length() -> u32 {
    25
}

fn default_open_iterations() -> u32 {
    2
}

fn default_min_region_side() -> i32 {
    50 // pixels, not normalized by resolution
}

fn default_region_confidence() -> f32 {
    0.8
}

fn default_tesseract_command() -> String {
    "tesseract".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_psm() -> u32 {
    3 // fully automatic page segmentation, no OSD
}

fn default_oem() -> u32 {
    3 // default engine (LSTM where available)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub skew: SkewCorrectionConfig,
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    #[serde(default)]
    pub layout: BlockClassificationConfig,
    #[serde(default)]
    pub tables: TableDetectionConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    /// Abort the whole request after this many milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkewCorrectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Angles below this magnitude are left alone
    #[serde(default = "default_min_skew_degrees")]
    pub min_angle_degrees: f32,
}

impl Default for SkewCorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_angle_degrees: default_min_skew_degrees(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementMode {
    /// Hand the grayscale image to the recognizer, which binarizes internally
    #[default]
    Grayscale,
    /// Otsu-binarize before recognition (dark text on white)
    Otsu,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhancementConfig {
    #[serde(default)]
    pub mode: EnhancementMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockClassificationConfig {
    /// Lines taller than median * ratio are headers
    #[serde(default = "default_header_height_ratio")]
    pub header_height_ratio: f32,
    /// All-caps lines shorter than this (in characters) and taller than the median are headers
    #[serde(default = "default_caps_header_max_chars")]
    pub caps_header_max_chars: usize,
}

impl Default for BlockClassificationConfig {
    fn default() -> Self {
        Self {
            header_height_ratio: default_header_height_ratio(),
            caps_header_max_chars: default_caps_header_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDetectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Neighbourhood size for adaptive mean thresholding (odd)
    #[serde(default = "default_adaptive_block_size")]
    pub adaptive_block_size: u32,
    /// Constant subtracted from the neighbourhood mean
    #[serde(default = "default_adaptive_c")]
    pub adaptive_c: i32,
    #[serde(default = "default_kernel_length")]
    pub horizontal_kernel_length: u32,
    #[serde(default = "default_kernel_length")]
    pub vertical_kernel_length: u32,
    #[serde(default = "default_open_iterations")]
    pub open_iterations: u32,
    /// Regions must be strictly wider than this
    #[serde(default = "default_min_region_side")]
    pub min_region_width: i32,
    /// Regions must be strictly taller than this
    #[serde(default = "default_min_region_side")]
    pub min_region_height: i32,
    #[serde(default = "default_region_confidence")]
    pub region_confidence: f32,
}

impl Default for TableDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            adaptive_block_size: default_adaptive_block_size(),
            adaptive_c: default_adaptive_c(),
            horizontal_kernel_length: default_kernel_length(),
            vertical_kernel_length: default_kernel_length(),
            open_iterations: default_open_iterations(),
            min_region_width: default_min_region_side(),
            min_region_height: default_min_region_side(),
            region_confidence: default_region_confidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Path or name of the tesseract binary
    #[serde(default = "default_tesseract_command")]
    pub command: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_psm")]
    pub page_segmentation_mode: u32,
    #[serde(default = "default_oem")]
    pub engine_mode: u32,
    #[serde(default)]
    pub tessdata_dir: Option<String>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            command: default_tesseract_command(),
            language: default_language(),
            page_segmentation_mode: default_psm(),
            engine_mode: default_oem(),
            tessdata_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                log::warn!("Failed to load config from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Apply `TESSERACT_CMD` / `TESSDATA_DIR` from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(cmd) = std::env::var("TESSERACT_CMD") {
            if !cmd.is_empty() {
                self.recognizer.command = cmd;
            }
        }
        if let Ok(dir) = std::env::var("TESSDATA_DIR") {
            if !dir.is_empty() {
                self.recognizer.tessdata_dir = Some(dir);
            }
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        let min_angle = self.skew.min_angle_degrees;
        if !min_angle.is_finite() || min_angle < 0.0 {
            bail!("skew.min_angle_degrees must be a non-negative number");
        }
        let ratio = self.layout.header_height_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            bail!("layout.header_height_ratio must be a positive number");
        }
        let tables = &self.tables;
        if tables.adaptive_block_size < 3 || tables.adaptive_block_size % 2 == 0 {
            bail!(
                "tables.adaptive_block_size must be odd and at least 3, got {}",
                tables.adaptive_block_size
            );
        }
        if tables.horizontal_kernel_length == 0 || tables.vertical_kernel_length == 0 {
            bail!("tables kernel lengths must be positive");
        }
        if tables.open_iterations == 0 {
            bail!("tables.open_iterations must be at least 1");
        }
        if !(0.0..=1.0).contains(&tables.region_confidence) {
            bail!("tables.region_confidence must be within [0, 1]");
        }
        if self.recognizer.command.trim().is_empty() {
            bail!("recognizer.command must not be empty");
        }
        Ok(())
    }
}
