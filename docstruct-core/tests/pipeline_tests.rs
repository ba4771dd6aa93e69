//! Pipeline boundary tests: drive the full processor end to end.
//!
//! Pages are synthesized with the `image` crate and recognition is replayed
//! from fixed tokens, so these tests need no tesseract install:
//!
//! - Input boundary: allow-list, PDF rejection, corrupt payloads
//! - Output boundary: blocks, tables, entities, metadata of a known page
//! - Failure policy: recognizer errors, timeouts, cancellation
//!
//! The geometry heuristics themselves are unit-tested next to each stage.

use docstruct_core::config::EngineConfig;
use docstruct_core::errors::{FailureCategory, RecognitionError};
use docstruct_core::recognizers::{CancelHandle, ReplayRecognizer, StopSignal, TokenRecognizer};
use docstruct_core::{
    BlockType, BoundingBox, DocumentProcessor, ImageprocBackend, LineKey, MediaType,
    PipelineError, Token,
};
use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;
use std::time::Duration;

// ============================================================================
// Fixture helpers
// ============================================================================

fn blank_page() -> RgbImage {
    RgbImage::from_pixel(800, 600, Rgb([255, 255, 255]))
}

fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn word(text: &str, x: i32, y: i32, w: i32, h: i32, key: (u32, u32, u32)) -> Token {
    Token::new(
        text,
        BoundingBox::from_ltwh(x, y, w, h),
        92.0,
        LineKey::new(key.0, key.1, key.2),
    )
}

/// One 40px title over three 20px body lines; lines arrive out of order
fn invoice_tokens() -> Vec<Token> {
    vec![
        word("Acme", 40, 120, 60, 20, (1, 2, 1)),
        Token::new("", BoundingBox::new(0, 0, 800, 600), -1.0, LineKey::new(0, 0, 0)),
        word("INVOICE", 40, 40, 220, 40, (1, 1, 1)),
        word("Corporation", 110, 120, 130, 20, (1, 2, 1)),
        word("Please", 40, 200, 110, 20, (1, 2, 2)),
        word("retain", 160, 200, 60, 20, (1, 2, 2)),
        word("Thank", 40, 280, 70, 20, (2, 1, 1)),
        word("you", 120, 280, 40, 20, (2, 1, 1)),
    ]
}

fn processor_with(tokens: Vec<Token>) -> DocumentProcessor {
    DocumentProcessor::new_with_dependencies(
        Box::new(ReplayRecognizer::new(tokens)),
        Box::new(ImageprocBackend::new()),
        EngineConfig::default(),
    )
    .unwrap()
}

/// Waits on the stop signal the way a long-running engine would
struct StallingRecognizer;

impl TokenRecognizer for StallingRecognizer {
    fn recognize(
        &self,
        _image: &GrayImage,
        signal: &StopSignal,
    ) -> Result<Vec<Token>, RecognitionError> {
        for _ in 0..500 {
            signal.check()?;
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "stalling"
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct BrokenRecognizer;

impl TokenRecognizer for BrokenRecognizer {
    fn recognize(&self, _: &GrayImage, _: &StopSignal) -> Result<Vec<Token>, RecognitionError> {
        Err(RecognitionError::EngineFailed("exit status 1: no language data".into()))
    }

    fn name(&self) -> &str {
        "broken"
    }

    fn is_available(&self) -> bool {
        false
    }
}

// ============================================================================
// Input boundary
// ============================================================================

mod input_boundary {
    use super::*;

    #[test]
    fn pdf_is_rejected_before_processing() {
        let err = MediaType::from_mime("application/pdf").unwrap_err();
        assert!(err.to_string().contains("PDF"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        let err = processor_with(Vec::new()).process_file(&path).unwrap_err();
        assert_eq!(err.category(), FailureCategory::InputRejected);
    }

    #[test]
    fn corrupt_payload_is_input_rejection() {
        let err = processor_with(Vec::new())
            .process_bytes(b"\x89PNG but not really", MediaType::Png)
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::InputRejected);
    }

    #[test]
    fn missing_file_is_input_rejection() {
        let err = processor_with(Vec::new())
            .process_file(std::path::Path::new("/nonexistent/page.png"))
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::InputRejected);
    }

    #[test]
    fn every_allowed_format_decodes() {
        let processor = processor_with(invoice_tokens());
        for (format, media_type, name) in [
            (ImageFormat::Png, MediaType::Png, "PNG"),
            (ImageFormat::Jpeg, MediaType::Jpeg, "JPEG"),
            (ImageFormat::Bmp, MediaType::Bmp, "BMP"),
            (ImageFormat::Tiff, MediaType::Tiff, "TIFF"),
        ] {
            let result = processor
                .process_bytes(&encode(&blank_page(), format), media_type)
                .unwrap();
            assert_eq!(result.image_metadata.format, name);
            assert_eq!(result.image_metadata.width, 800);
            assert_eq!(result.image_metadata.height, 600);
        }
    }
}

// ============================================================================
// Output boundary
// ============================================================================

mod output_boundary {
    use super::*;

    #[test]
    fn invoice_page_yields_one_header_and_three_paragraphs() {
        let result = processor_with(invoice_tokens())
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap();

        let blocks = &result.layout.blocks;
        let kinds: Vec<BlockType> = blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(
            kinds,
            vec![
                BlockType::Header,
                BlockType::Paragraph,
                BlockType::Paragraph,
                BlockType::Paragraph
            ]
        );
        assert_eq!(blocks[0].content.text, "INVOICE");
        assert_eq!(blocks[1].content.text, "Acme Corporation");
        assert_eq!(blocks[2].content.text, "Please retain");
        assert_eq!(blocks[3].content.text, "Thank you");

        assert!(result.tables.is_empty());
        assert!(result.entities.is_empty());
    }

    #[test]
    fn text_content_keeps_raw_and_normalized_forms() {
        let result = processor_with(invoice_tokens())
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap();
        let text = &result.text_content;
        assert_eq!(
            text.raw_text,
            "INVOICE\nAcme Corporation\nPlease retain\nThank you"
        );
        assert_eq!(text.full_text, "INVOICE Acme Corporation Please retain Thank you");
        assert_eq!(text.lines.len(), 4);
        assert_eq!(text.words.len(), 7);
        assert_eq!(text.lines[1].bbox, BoundingBox::new(40, 120, 240, 140));
    }

    #[test]
    fn metadata_describes_offline_run() {
        let result = processor_with(invoice_tokens())
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap();
        let meta = &result.processing_metadata;
        assert!(meta.processed_offline);
        assert_eq!(meta.ocr_engine, "replay");
        assert_eq!(meta.model_type, "lstm");
        assert_eq!(meta.language, "eng");
        assert_eq!(meta.skew_angle, None);
        assert_eq!(meta.stage_timings.len(), 8);
        assert!(meta.runtime_ms >= 0.0);
        assert_eq!(result.processing_mode, "offline");
        assert_eq!(result.document_id.len(), 32);
        assert_eq!(result.image_metadata.dpi, 0);
        assert_eq!(result.image_metadata.color_space, "RGB");
    }

    #[test]
    fn entities_come_from_recognized_text() {
        let tokens = vec![
            word("Total", 40, 40, 60, 20, (1, 1, 1)),
            word("$1,250.00", 110, 40, 90, 20, (1, 1, 1)),
            word("2024-03-15", 40, 80, 120, 20, (1, 1, 2)),
            word("billing@acme.io", 40, 120, 160, 20, (1, 1, 3)),
            word("Page", 40, 160, 50, 20, (1, 1, 4)),
            word("2", 100, 160, 10, 20, (1, 1, 4)),
        ];
        let result = processor_with(tokens)
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap();
        let entities = &result.entities;
        assert_eq!(entities.amounts.iter().collect::<Vec<_>>(), vec!["$1,250.00"]);
        assert_eq!(entities.dates.iter().collect::<Vec<_>>(), vec!["2024-03-15"]);
        assert_eq!(entities.emails.iter().collect::<Vec<_>>(), vec!["billing@acme.io"]);
    }

    #[test]
    fn ruled_grid_is_reported_as_table() {
        let mut page = blank_page();
        for row in 0..=3 {
            let rule = Rect::at(100, 300 + row * 60).of_size(400, 2);
            draw_filled_rect_mut(&mut page, rule, Rgb([0, 0, 0]));
        }
        for col in 0..=4 {
            let rule = Rect::at(100 + col * 100, 300).of_size(2, 182);
            draw_filled_rect_mut(&mut page, rule, Rgb([0, 0, 0]));
        }
        let result = processor_with(invoice_tokens())
            .process_bytes(&encode(&page, ImageFormat::Png), MediaType::Png)
            .unwrap();
        assert_eq!(result.tables.len(), 1);
        assert!(result.tables[0].rows.is_empty());
        assert_eq!(result.tables[0].confidence, 0.8);
    }

    #[test]
    fn blank_page_without_tokens_is_a_valid_empty_document() {
        let result = processor_with(Vec::new())
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap();
        assert!(result.layout.blocks.is_empty());
        assert!(result.text_content.lines.is_empty());
        assert_eq!(result.text_content.full_text, "");
    }

    #[test]
    fn captured_stages_expose_every_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.png");
        blank_page().save(&path).unwrap();

        let stages = processor_with(invoice_tokens())
            .process_document_capture_stages(&path)
            .unwrap();
        assert_eq!((stages.width, stages.height), (800, 600));
        assert_eq!(stages.tokens.len(), 8);
        assert_eq!(stages.lines.len(), 4);
        assert_eq!(stages.blocks.len(), 4);
        assert_eq!(stages.raw_text, stages.result.text_content.raw_text);

        let json = serde_json::to_value(&stages).unwrap();
        assert!(json["result"]["layout"]["blocks"].is_array());
    }

    #[test]
    fn result_saves_to_disk_in_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("invoice.png");
        blank_page().save(&input).unwrap();

        let result = processor_with(invoice_tokens()).process_file(&input).unwrap();
        for format in ["document", "blocks", "text"] {
            let out = dir.path().join(format!("{}.json", format));
            result
                .save_with_format(out.to_str().unwrap(), format)
                .unwrap();
            let value: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
            assert!(value.is_object());
        }
    }
}

// ============================================================================
// Failure policy
// ============================================================================

mod failure_policy {
    use super::*;

    fn processor(recognizer: Box<dyn TokenRecognizer>, config: EngineConfig) -> DocumentProcessor {
        DocumentProcessor::new_with_dependencies(
            recognizer,
            Box::new(ImageprocBackend::new()),
            config,
        )
        .unwrap()
    }

    #[test]
    fn recognizer_failure_is_processing_failed() {
        let err = processor(Box::new(BrokenRecognizer), EngineConfig::default())
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::ProcessingFailed);
        assert!(err.to_string().contains("no language data"));
    }

    #[test]
    fn missing_tesseract_is_processing_failed() {
        let mut config = EngineConfig::default();
        config.recognizer.command = "/nonexistent/tesseract".to_string();
        let processor = DocumentProcessor::new_tesseract(config).unwrap();
        assert!(!processor.recognizer_available());
        let err = processor
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::ProcessingFailed);
    }

    #[test]
    fn configured_timeout_aborts_recognition() {
        let config = EngineConfig {
            timeout_ms: Some(50),
            ..EngineConfig::default()
        };
        let err = processor(Box::new(StallingRecognizer), config)
            .process_bytes(&encode(&blank_page(), ImageFormat::Png), MediaType::Png)
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::Timeout);
        assert!(matches!(err, PipelineError::TimedOut(d) if d == Duration::from_millis(50)));
    }

    #[test]
    fn cancellation_aborts_the_request() {
        let processor = processor(Box::new(StallingRecognizer), EngineConfig::default());
        let handle = CancelHandle::new();
        let signal = StopSignal::none().with_cancel(handle.clone());
        let bytes = encode(&blank_page(), ImageFormat::Png);

        let err = std::thread::scope(|scope| {
            let worker = scope
                .spawn(|| processor.process_bytes_with_signal(&bytes, MediaType::Png, &signal));
            std::thread::sleep(Duration::from_millis(50));
            handle.cancel();
            worker.join().unwrap()
        })
        .unwrap_err();
        assert_eq!(err.category(), FailureCategory::Cancelled);
    }

    #[test]
    fn invalid_config_is_refused_at_construction() {
        let mut config = EngineConfig::default();
        config.tables.adaptive_block_size = 4;
        assert!(DocumentProcessor::new_with_dependencies(
            Box::new(ReplayRecognizer::new(Vec::new())),
            Box::new(ImageprocBackend::new()),
            config,
        )
        .is_err());
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency {
    use super::*;

    #[test]
    fn one_processor_serves_parallel_requests() {
        let processor = processor_with(invoice_tokens());
        let bytes = encode(&blank_page(), ImageFormat::Png);

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| processor.process_bytes(&bytes, MediaType::Png).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in &results {
            assert_eq!(result.layout.blocks.len(), 4);
            assert_eq!(result.layout.blocks[0].block_type, BlockType::Header);
        }
        let mut ids: Vec<_> = results.iter().map(|r| r.document_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
