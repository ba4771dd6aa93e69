use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;

// Import from docstruct-core
use docstruct_core::{
    DocumentProcessor, DocumentResult, EngineConfig, ImageprocBackend, MediaType, PipelineError,
    PipelineStages, ReplayRecognizer,
};

// Import CLI utilities
use docstruct::{exit_code, TesseractLocator};

#[derive(Parser)]
#[command(name = "docstruct")]
#[command(about = "Offline document structure extraction from a scanned page image")]
struct Args {
    /// Path to the image file to process (JPEG, PNG, BMP or TIFF)
    #[arg(short, long, required_unless_present = "show_configs")]
    input: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output format: document, blocks, or text
    #[arg(short = 'f', long, default_value = "document")]
    output_format: String,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Declared media type (e.g. image/png); inferred from the extension if omitted
    #[arg(long)]
    media_type: Option<String>,

    /// Replay recognizer tokens from a JSON file instead of running tesseract
    #[arg(long)]
    tokens: Option<String>,

    /// Path to the tesseract binary
    /// If not specified, TESSERACT_CMD, PATH and common install locations are searched
    #[arg(long)]
    tesseract_cmd: Option<String>,

    /// Recognition language (tesseract language code)
    #[arg(long)]
    lang: Option<String>,

    /// Abort processing after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip skew estimation and rotation
    #[arg(long)]
    no_deskew: bool,

    /// Skip table region detection
    #[arg(long)]
    no_tables: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Dump all intermediate pipeline stage outputs to a directory
    /// Captures: tokens, lines, blocks, tables, raw text and the final result
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output (default: test_outputs/stages)
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    println!("🦀 DocStruct Document Extractor");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    let Some(input) = args.input.clone() else {
        eprintln!("⚠️  No input image given (use --input <path>)");
        std::process::exit(2);
    };

    // Check if input file exists
    if !Path::new(&input).exists() {
        eprintln!("⚠️  Input image not found at: {}", input);
        eprintln!("   Please check the file path.");
        std::process::exit(2);
    }

    // Load config, then layer environment and CLI overrides on top
    let mut config = EngineConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }
    config.apply_env_overrides();
    apply_cli_overrides(&mut config, &args);

    let media_type = match resolve_media_type(args.media_type.as_deref(), &input) {
        Ok(media_type) => media_type,
        Err(e) => fail(&e),
    };

    // Create processor based on the chosen recognizer
    let processor = create_processor(&args, config)?;
    log::debug!("Resolved config: {:?}", processor.config());

    println!("📄 Processing: {}", input);
    let bytes = std::fs::read(&input)?;

    // Stage dump mode: capture and save all intermediates
    if args.dump_stages {
        println!("\n🔬 Pipeline stage dump mode");
        match processor.capture_stages_from_bytes(&bytes, media_type) {
            Ok(stages) => {
                save_stages(&stages, &input, &args.stages_dir)?;
                println!("\n✅ All stages dumped to: {}", args.stages_dir);
            }
            Err(e) => fail(&e),
        }
        return Ok(());
    }

    match processor.process_bytes_with_profiling(&bytes, media_type, args.profile) {
        Ok(result) => {
            println!("✅ Successfully processed document");
            println!("📊 Document metrics:");
            println!("   - Lines: {}", result.text_content.lines.len());
            println!("   - Blocks: {}", result.layout.blocks.len());
            println!("   - Tables: {}", result.tables.len());
            println!("   - Entities: {}", result.entities.len());
            if let Some(angle) = result.processing_metadata.skew_angle {
                println!("   - Skew: {:.2}°", angle);
            }
            println!(
                "⏱️  Total processing time: {:.0}ms",
                result.processing_metadata.runtime_ms
            );

            // Generate output path
            let output_path = if let Some(output) = &args.output {
                output.clone()
            } else {
                let input_name = Path::new(&input)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("output");
                format!("{input_name}_docstruct.json")
            };

            save_result(&result, &output_path, &args.output_format)?;
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

fn fail(error: &PipelineError) -> ! {
    eprintln!("❌ Processing failed: {error}");
    std::process::exit(exit_code(error.category()));
}

fn apply_cli_overrides(config: &mut EngineConfig, args: &Args) {
    if let Some(lang) = &args.lang {
        config.recognizer.language = lang.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
    if args.no_deskew {
        config.skew.enabled = false;
    }
    if args.no_tables {
        config.tables.enabled = false;
    }
}

fn resolve_media_type(declared: Option<&str>, input: &str) -> Result<MediaType, PipelineError> {
    let media_type = match declared {
        Some(mime) => MediaType::from_mime(mime)?,
        None => MediaType::from_path(Path::new(input))?,
    };
    Ok(media_type)
}

fn create_processor(args: &Args, mut config: EngineConfig) -> Result<DocumentProcessor> {
    if let Some(tokens_path) = &args.tokens {
        println!("🔁 Replaying tokens from: {}", tokens_path);
        let recognizer = ReplayRecognizer::from_file(Path::new(tokens_path))?;
        println!("   {} tokens loaded", recognizer.tokens().len());
        return DocumentProcessor::new_with_dependencies(
            Box::new(recognizer),
            Box::new(ImageprocBackend::new()),
            config,
        );
    }

    // Flag, then a command set by the config file or TESSERACT_CMD, then search
    let configured = config.recognizer.command.clone();
    let explicit = args
        .tesseract_cmd
        .clone()
        .or_else(|| (configured != "tesseract").then_some(configured));
    let located = TesseractLocator::from_env().locate(explicit.as_deref())?;
    println!(
        "🔧 Using tesseract: {} ({:?})",
        located.path.display(),
        located.source
    );
    config.recognizer.command = located.path.to_string_lossy().into_owned();

    let processor = DocumentProcessor::new_tesseract(config)?;
    if !processor.recognizer_available() {
        bail!(
            "tesseract at {} did not answer --version; check the install or use --tokens",
            located.path.display()
        );
    }
    println!("🚀 Using {} recognizer", processor.recognizer_name());
    Ok(processor)
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --config <path>          Load custom config file");
    println!("  --input <path>           Image file to process");
    println!("  --output <path>          Output file path (auto-generated if not specified)");
    println!("  --output-format <fmt>    Output format: document, blocks, or text");
    println!("  --media-type <mime>      Declared media type (default: from extension)");
    println!("  --tokens <path>          Replay recognizer tokens instead of running tesseract");
    println!("  --tesseract-cmd <path>   Path to tesseract (default: TESSERACT_CMD, then PATH)");
    println!("  --lang <code>            Recognition language (default: eng)");
    println!("  --timeout-ms <n>         Abort processing after n milliseconds");
    println!("  --no-deskew              Skip skew correction");
    println!("  --no-tables              Skip table region detection");

    println!("\n📄 Output Formats:");
    println!("  document  - Full result: metadata, lines, blocks, tables, entities (default)");
    println!("  blocks    - Ordered header/paragraph blocks with boxes");
    println!("  text      - Normalized full text plus per-line text");

    println!("\n🖼️  Accepted Inputs:");
    println!("  image/jpeg, image/png, image/bmp, image/tiff (single page; PDF is rejected)");

    println!("\n🚦 Exit Codes:");
    println!("  0 success, 1 processing failed, 2 input rejected, 3 timed out or cancelled");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i scan.png");
    println!("  cargo run -- -i scan.jpg -o /path/to/output.json -f blocks");
    println!("  cargo run -- -i scan.tif -c config.yaml --timeout-ms 30000");
    println!("  cargo run -- -i scan.png --tokens test_outputs/stages/stage1_tokens.json");
}

fn save_stages(stages: &PipelineStages, input: &str, output_dir: &str) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)?;

    // Stage 1: Recognizer tokens (replayable with --tokens)
    let tokens_path = format!("{}/stage1_tokens.json", output_dir);
    fs::write(&tokens_path, serde_json::to_string_pretty(&stages.tokens)?)?;
    println!("  💾 {} ({} tokens)", tokens_path, stages.tokens.len());

    // Stage 2: Reconstructed lines
    let lines_path = format!("{}/stage2_lines.json", output_dir);
    fs::write(&lines_path, serde_json::to_string_pretty(&stages.lines)?)?;
    println!("  💾 {} ({} lines)", lines_path, stages.lines.len());

    // Stage 3: Classified blocks
    let blocks_path = format!("{}/stage3_blocks.json", output_dir);
    fs::write(&blocks_path, serde_json::to_string_pretty(&stages.blocks)?)?;
    println!("  💾 {} ({} blocks)", blocks_path, stages.blocks.len());

    // Stage 4: Table regions
    let tables_path = format!("{}/stage4_tables.json", output_dir);
    fs::write(&tables_path, serde_json::to_string_pretty(&stages.tables)?)?;
    println!("  💾 {} ({} tables)", tables_path, stages.tables.len());

    // Stage 5: Raw text before normalization
    let text_path = format!("{}/stage5_raw_text.txt", output_dir);
    fs::write(&text_path, &stages.raw_text)?;
    println!("  💾 {}", text_path);

    // Final result
    let result_path = format!("{}/result.json", output_dir);
    stages.result.save_with_format(&result_path, "document")?;
    println!("  💾 {}", result_path);

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input_image": input,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "page": { "width": stages.width, "height": stages.height },
        "skew_angle": stages.skew_angle,
        "stage_counts": {
            "tokens": stages.tokens.len(),
            "lines": stages.lines.len(),
            "blocks": stages.blocks.len(),
            "tables": stages.tables.len(),
            "entities": stages.result.entities.len(),
        }
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}

fn save_result(result: &DocumentResult, output_path: &str, format: &str) -> Result<()> {
    result.save_with_format(output_path, format)?;

    match format {
        "blocks" => println!("💾 Blocks format results saved to: {}", output_path),
        "text" => println!("💾 Text format results saved to: {}", output_path),
        "document" => println!("💾 Document format results saved to: {}", output_path),
        _ => {
            println!("⚠️  Unknown output format '{}', using default document format", format);
            println!("💾 Document format results saved to: {}", output_path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_configs_needs_no_input() {
        let args = Args::try_parse_from(["docstruct", "--show-configs"]).unwrap();
        assert!(args.show_configs);
        assert!(args.input.is_none());
    }

    #[test]
    fn input_is_required_for_processing() {
        assert!(Args::try_parse_from(["docstruct"]).is_err());
        let args = Args::try_parse_from(["docstruct", "-i", "scan.png", "-f", "text"]).unwrap();
        assert_eq!(args.input.as_deref(), Some("scan.png"));
        assert_eq!(args.output_format, "text");
    }
}
