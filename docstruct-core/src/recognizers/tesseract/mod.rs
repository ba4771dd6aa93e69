//! Tesseract Recognizer
//!
//! Runs a local tesseract binary as a child process. The page is fed as PNG
//! on stdin and TSV word data is read back from stdout, so nothing touches
//! disk and nothing leaves the machine.

pub mod tsv_parser;

use crate::config::RecognizerConfig;
use crate::errors::RecognitionError;
use crate::recognizers::{StopSignal, TokenRecognizer};
use crate::types::Token;
use image::{GrayImage, ImageFormat};
use std::io::{Cursor, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct TesseractRecognizer {
    command: String,
    language: String,
    page_segmentation_mode: u32,
    engine_mode: u32,
    tessdata_dir: Option<String>,
}

impl TesseractRecognizer {
    pub fn new(config: &RecognizerConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
            engine_mode: config.engine_mode,
            tessdata_dir: config.tessdata_dir.clone(),
        }
    }

    /// Arguments after the binary name
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec!["stdin".to_string(), "stdout".to_string()];
        if let Some(dir) = &self.tessdata_dir {
            args.push("--tessdata-dir".to_string());
            args.push(dir.clone());
        }
        args.extend([
            "--oem".to_string(),
            self.engine_mode.to_string(),
            "--psm".to_string(),
            self.page_segmentation_mode.to_string(),
            "-l".to_string(),
            self.language.clone(),
            "tsv".to_string(),
        ]);
        args
    }

    fn spawn(&self) -> Result<Child, RecognitionError> {
        Command::new(&self.command)
            .args(self.arguments())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecognitionError::EngineUnavailable(format!(
                        "tesseract binary '{}' not found",
                        self.command
                    ))
                } else {
                    RecognitionError::EngineUnavailable(format!(
                        "failed to start '{}': {}",
                        self.command, e
                    ))
                }
            })
    }

    /// Poll the child until it exits, killing it if the signal fires first
    fn wait_or_stop(
        child: &mut Child,
        signal: &StopSignal,
    ) -> Result<ExitStatus, RecognitionError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if let Err(stop) = signal.check() {
                        log::warn!("Stopping tesseract (pid {}): {}", child.id(), stop);
                        terminate(child);
                        return Err(stop);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    terminate(child);
                    return Err(RecognitionError::EngineFailed(format!(
                        "waiting on tesseract failed: {}",
                        e
                    )));
                }
            }
        }
    }
}

/// Kill the child and reap it so no zombie is left behind
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn encode_png(image: &GrayImage) -> Result<Vec<u8>, RecognitionError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| RecognitionError::EngineFailed(format!("failed to encode page: {}", e)))?;
    Ok(buf.into_inner())
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buf);
        }
        buf
    })
}

impl TokenRecognizer for TesseractRecognizer {
    fn recognize(
        &self,
        image: &GrayImage,
        signal: &StopSignal,
    ) -> Result<Vec<Token>, RecognitionError> {
        signal.check()?;
        let png = encode_png(image)?;

        log::debug!("Running {} {}", self.command, self.arguments().join(" "));
        let mut child = self.spawn()?;

        // Pipes are serviced on their own threads so a full buffer never blocks the poll loop
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&png)?;
            }
            Ok(())
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = Self::wait_or_stop(&mut child, signal)?;

        let write_result = writer.join();
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(RecognitionError::EngineFailed(format!(
                "tesseract exited with {}: {}",
                status,
                stderr.trim()
            )));
        }
        if let Ok(Err(e)) = write_result {
            return Err(RecognitionError::EngineFailed(format!(
                "failed to send page to tesseract: {}",
                e
            )));
        }

        let tsv = String::from_utf8(stdout).map_err(|e| {
            RecognitionError::MalformedOutput(format!("tesseract output is not UTF-8: {}", e))
        })?;
        let tokens = tsv_parser::parse_tsv(&tsv)?;
        log::debug!("tesseract returned {} rows", tokens.len());
        Ok(tokens)
    }

    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}
