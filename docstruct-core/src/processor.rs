use crate::config::{EngineConfig, EnhancementMode};
use crate::errors::{IngestError, PipelineError};
use crate::imaging::{ImageOps, ImageprocBackend};
use crate::ingestion::{ingest, MediaType};
use crate::recognizers::{StopSignal, TesseractRecognizer, TokenRecognizer};
use crate::stages::{
    extract_entities, normalize_text, reconstruct_lines, BlockClassifier, SkewCorrector,
    StageOutcome, TableDetector,
};
use crate::types::*;
use anyhow::Result;
use chrono::Utc;
use image::{GrayImage, RgbImage};
use std::path::Path;
use std::time::{Duration, Instant};

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics: lets you inspect/compare each boundary
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStages {
    /// Dimensions of the page handed to recognition
    pub width: u32,
    pub height: u32,
    pub skew_angle: Option<f32>,
    pub tokens: Vec<Token>,
    pub lines: Vec<Line>,
    pub blocks: Vec<LayoutBlock>,
    pub tables: Vec<TableRegion>,
    pub raw_text: String,
    pub result: DocumentResult,
}

/// Simple profiler that collects timings for pipeline steps
///
/// Timings are always recorded; `enabled` only controls the log output.
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        if self.enabled {
            log::info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_secs_f64() * 1000.0);
        }
        self.timings.push((step_name.to_string(), elapsed));

        result
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        log::info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        let total_secs = total.as_secs_f64().max(f64::EPSILON);

        for (step, duration) in &self.timings {
            let percentage = (duration.as_secs_f64() / total_secs) * 100.0;
            log::info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_secs_f64() * 1000.0,
                percentage
            );
        }
        log::info!("   {:.<35} {:.0}ms", "Total", total.as_secs_f64() * 1000.0);
    }

    pub fn stage_timings(&self) -> Vec<StageTiming> {
        self.timings
            .iter()
            .map(|(stage, d)| StageTiming {
                stage: stage.clone(),
                elapsed_ms: round_ms(*d),
            })
            .collect()
    }
}

fn round_ms(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Log a degraded stage and hand back whatever value it produced
fn settle<T>(stage: &str, outcome: StageOutcome<T>) -> T {
    if let Some(diagnostic) = outcome.diagnostic() {
        log::warn!("{} degraded, continuing with fallback: {}", stage, diagnostic);
    }
    outcome.into_value()
}

fn checkpoint(signal: &StopSignal) -> Result<(), PipelineError> {
    signal
        .check()
        .map_err(|e| PipelineError::from_recognition(e, signal.budget()))
}

/// Runs one image through every stage.
///
/// Holds configuration and backends only, so a single instance can serve
/// concurrent requests from several threads.
pub struct DocumentProcessor {
    recognizer: Box<dyn TokenRecognizer>,
    imaging: Box<dyn ImageOps>,
    config: EngineConfig,
    skew_corrector: SkewCorrector,
    block_classifier: BlockClassifier,
    table_detector: TableDetector,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        recognizer: Box<dyn TokenRecognizer>,
        imaging: Box<dyn ImageOps>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "Processor ready: {} recognizer, {} imaging",
            recognizer.name(),
            imaging.name()
        );
        Ok(Self {
            recognizer,
            imaging,
            skew_corrector: SkewCorrector::new(config.skew.clone()),
            block_classifier: BlockClassifier::new(config.layout.clone()),
            table_detector: TableDetector::new(config.tables.clone()),
            config,
        })
    }

    /// Convenience constructor: local tesseract binary + imageproc backend
    pub fn new_tesseract(config: EngineConfig) -> Result<Self> {
        let recognizer = Box::new(TesseractRecognizer::new(&config.recognizer));
        Self::new_with_dependencies(recognizer, Box::new(ImageprocBackend::new()), config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    pub fn recognizer_available(&self) -> bool {
        self.recognizer.is_available()
    }

    /// Process an uploaded payload under the configured timeout
    pub fn process_bytes(
        &self,
        bytes: &[u8],
        media_type: MediaType,
    ) -> Result<DocumentResult, PipelineError> {
        let signal = StopSignal::from_budget(self.config.timeout());
        self.process_bytes_with_signal(bytes, media_type, &signal)
    }

    /// Process an uploaded payload under a caller-supplied deadline/cancel handle
    pub fn process_bytes_with_signal(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        signal: &StopSignal,
    ) -> Result<DocumentResult, PipelineError> {
        let mut profiler = StepProfiler::new(false);
        self.run(bytes, media_type, signal, &mut profiler)
            .map(|stages| stages.result)
    }

    /// Process an image file; the media type comes from its extension
    pub fn process_file(&self, path: &Path) -> Result<DocumentResult, PipelineError> {
        self.process_file_with_profiling(path, false)
    }

    pub fn process_file_with_profiling(
        &self,
        path: &Path,
        enable_profiling: bool,
    ) -> Result<DocumentResult, PipelineError> {
        let (bytes, media_type) = read_input(path)?;
        self.process_bytes_with_profiling(&bytes, media_type, enable_profiling)
    }

    pub fn process_bytes_with_profiling(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        enable_profiling: bool,
    ) -> Result<DocumentResult, PipelineError> {
        let signal = StopSignal::from_budget(self.config.timeout());
        let mut profiler = StepProfiler::new(enable_profiling);

        let stages = self.run(bytes, media_type, &signal, &mut profiler)?;
        profiler.log_summary();
        Ok(stages.result)
    }

    /// Process document and capture all intermediate stage outputs
    /// Used for pipeline diagnostics and testing stage boundaries
    pub fn process_document_capture_stages(
        &self,
        path: &Path,
    ) -> Result<PipelineStages, PipelineError> {
        let (bytes, media_type) = read_input(path)?;
        self.capture_stages_from_bytes(&bytes, media_type)
    }

    pub fn capture_stages_from_bytes(
        &self,
        bytes: &[u8],
        media_type: MediaType,
    ) -> Result<PipelineStages, PipelineError> {
        let signal = StopSignal::from_budget(self.config.timeout());
        let mut profiler = StepProfiler::new(false);
        let stages = self.run(bytes, media_type, &signal, &mut profiler)?;

        log::info!("📋 Stage capture: {} tokens", stages.tokens.len());
        log::info!(
            "📋 Stage capture: {} lines, {} blocks",
            stages.lines.len(),
            stages.blocks.len()
        );
        log::info!("📋 Stage capture: {} tables", stages.tables.len());
        Ok(stages)
    }

    /// Otsu mode falls back to plain grayscale if binarization fails
    fn enhance(&self, image: &RgbImage) -> StageOutcome<GrayImage> {
        let gray = self.imaging.to_grayscale(image);
        match self.config.enhancement.mode {
            EnhancementMode::Grayscale => StageOutcome::Completed(gray),
            EnhancementMode::Otsu => match self.imaging.threshold_otsu(&gray) {
                Ok(binary) => StageOutcome::Completed(binary),
                Err(e) => StageOutcome::degraded(gray, format!("binarization failed: {}", e)),
            },
        }
    }

    fn run(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        signal: &StopSignal,
        profiler: &mut StepProfiler,
    ) -> Result<PipelineStages, PipelineError> {
        let start_time = Instant::now();

        // Stage 1: Ingestion (rejections end here, before any stage runs)
        let ingested = profiler.time_step("1. Ingestion", || ingest(bytes, media_type))?;
        checkpoint(signal)?;

        // Stage 2: Skew correction (degrades to pass-through)
        let skew = profiler.time_step("2. Skew Correction", || {
            self.skew_corrector
                .correct(self.imaging.as_ref(), ingested.image)
        });
        let skew = settle("Skew correction", skew);
        checkpoint(signal)?;

        // Stage 3: Enhancement for recognition
        let page = profiler.time_step("3. Enhancement", || self.enhance(&skew.image));
        let page = settle("Enhancement", page);
        checkpoint(signal)?;

        // Stage 4: Token recognition (fatal on failure, no retries)
        let tokens = profiler
            .time_step("4. Recognition", || self.recognizer.recognize(&page, signal))
            .map_err(|e| PipelineError::from_recognition(e, signal.budget()))?;
        checkpoint(signal)?;

        // Stage 5: Line reconstruction
        let text = profiler.time_step("5. Line Reconstruction", || reconstruct_lines(&tokens))?;
        log::info!(
            "Recognition complete: {} lines, {} words",
            text.lines.len(),
            text.words.len()
        );

        // Stage 6: Table regions on the deskewed, non-binarized image
        let tables = profiler.time_step("6. Table Detection", || {
            self.table_detector.detect(self.imaging.as_ref(), &skew.image)
        });
        let tables = settle("Table detection", tables);

        // Stage 7: Block classification
        let blocks = profiler.time_step("7. Block Classification", || {
            self.block_classifier.classify(&text.lines)
        });

        // Stage 8: Normalization + entities (entities read the raw text)
        let (full_text, entities) = profiler.time_step("8. Entity Extraction", || {
            (normalize_text(&text.raw_text), extract_entities(&text.raw_text))
        });

        let runtime_ms = round_ms(start_time.elapsed());
        let (width, height) = skew.image.dimensions();

        let result = DocumentResult {
            schema_version: SCHEMA_VERSION.to_string(),
            document_id: document_id(),
            processing_mode: "offline".to_string(),
            image_metadata: ingested.metadata,
            layout: Layout {
                blocks: blocks.clone(),
            },
            text_content: TextContent {
                raw_text: text.raw_text.clone(),
                full_text,
                lines: text.lines.clone(),
                words: text.words,
            },
            tables: tables.clone(),
            entities,
            processing_metadata: ProcessingMetadata {
                ocr_engine: self.recognizer.name().to_string(),
                model_type: "lstm".to_string(),
                language: self.config.recognizer.language.clone(),
                runtime_ms,
                processed_offline: true,
                version: env!("CARGO_PKG_VERSION").to_string(),
                processed_at: Utc::now(),
                skew_angle: skew.angle,
                stage_timings: profiler.stage_timings(),
            },
        };

        log::info!("Pipeline finished in {:.2}ms", runtime_ms);

        Ok(PipelineStages {
            width,
            height,
            skew_angle: skew.angle,
            tokens,
            lines: text.lines,
            blocks,
            tables,
            raw_text: text.raw_text,
            result,
        })
    }
}

fn read_input(path: &Path) -> Result<(Vec<u8>, MediaType), PipelineError> {
    let media_type = MediaType::from_path(path)?;
    let bytes = std::fs::read(path)
        .map_err(|e| IngestError::Unreadable(format!("{}: {}", path.display(), e)))?;
    log::info!("📄 Processing document: {}", path.display());
    Ok((bytes, media_type))
}
