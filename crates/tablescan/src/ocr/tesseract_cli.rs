//! Tesseract through its command-line executable.
//!
//! Each call spawns `tesseract stdin stdout --psm N -l LANG`, writes the image
//! as PNG to the child's stdin and reads plain text from its stdout. Calls are
//! bounded by a timeout after which the child is killed.
//!
//! The child is driven by a small tokio runtime owned by this module, so
//! [`TextRecognizer::recognize`] stays synchronous. Call it from plain or
//! blocking threads (rayon, `spawn_blocking`), never from inside an async task.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::sync::OnceLock;
use std::time::Duration;

use image::{GrayImage, ImageFormat};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::runtime::Runtime;
use tokio::time::timeout;

use super::error::OcrError;
use super::recognizer::TextRecognizer;
use super::types::PSMMode;
use super::utils::is_valid_language;
use crate::core::config::OcrConfig;
use crate::error::{Result, TablescanError};

/// Runtime shared by every [`TesseractCommand`]; built on first use.
fn subprocess_runtime() -> Result<&'static Runtime> {
    static RUNTIME: OnceLock<std::result::Result<Runtime, String>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("tesseract-cli")
                .enable_all()
                .build()
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| OcrError::ProcessingFailed(format!("Failed to start subprocess runtime: {}", e)).into())
}

#[derive(Debug, Clone)]
pub struct TesseractCommand {
    executable: PathBuf,
    language: String,
    tessdata_dir: Option<PathBuf>,
    timeout: Duration,
}

impl TesseractCommand {
    pub fn new(language: impl Into<String>) -> Result<Self> {
        Self::from_config(&OcrConfig {
            language: language.into(),
            ..Default::default()
        })
    }

    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        if !is_valid_language(&config.language) {
            return Err(OcrError::InvalidLanguageCode(config.language.clone()).into());
        }

        Ok(Self {
            executable: config
                .tesseract_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            language: config.language.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn command(&self, mode: PSMMode) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(mode.as_u8().to_string())
            .arg("-l")
            .arg(&self.language);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn(&self, mode: PSMMode) -> Result<Child> {
        self.command(mode).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TablescanError::MissingDependency(format!(
                    "Tesseract executable '{}' not found. Install tesseract-ocr or set ocr.tesseract_path",
                    self.executable.display()
                ))
            } else {
                std::io::Error::other(format!("Failed to execute tesseract: {}", e)).into()
            }
        })
    }

    /// Feeds `png` to a fresh child and collects its output. Dropping the
    /// future on timeout drops the child, which kills it.
    async fn run(&self, mode: PSMMode, png: Vec<u8>) -> Result<Output> {
        let mut child = self.spawn(mode)?;
        let stdin = child.stdin.take();

        let work = async move {
            if let Some(mut stdin) = stdin {
                // A broken pipe means tesseract exited early; its status says why.
                if let Err(e) = stdin.write_all(&png).await {
                    tracing::debug!(error = %e, "tesseract closed stdin early");
                }
            }
            child.wait_with_output().await
        };

        match timeout(self.timeout, work).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(std::io::Error::other(format!("Failed to wait for tesseract: {}", e)).into()),
            Err(_) => Err(OcrError::Timeout(self.timeout.as_secs()).into()),
        }
    }
}

impl TextRecognizer for TesseractCommand {
    fn name(&self) -> &str {
        "tesseract-cli"
    }

    fn recognize(&self, image: &GrayImage, mode: PSMMode) -> Result<String> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::ImageProcessingFailed(format!(
                "Cannot recognize a {}x{} image",
                image.width(),
                image.height()
            ))
            .into());
        }

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| OcrError::ImageProcessingFailed(format!("Failed to encode PNG: {}", e)))?;

        let output = subprocess_runtime()?.block_on(self.run(mode, png.into_inner()))?;

        if !output.status.success() {
            return Err(OcrError::ProcessingFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }

        tracing::trace!(psm = mode.as_u8(), bytes = output.stdout.len(), "tesseract finished");

        String::from_utf8(output.stdout)
            .map_err(|e| TablescanError::ocr_with_source("Tesseract produced invalid UTF-8", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blank() -> GrayImage {
        GrayImage::from_pixel(30, 30, Luma([255]))
    }

    #[test]
    fn test_from_config_rejects_bad_language() {
        let config = OcrConfig {
            language: "eng; echo".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            TesseractCommand::from_config(&config),
            Err(TablescanError::Ocr { .. })
        ));
    }

    #[test]
    fn test_command_arguments() {
        let config = OcrConfig {
            language: "eng+deu".to_string(),
            tessdata_dir: Some(PathBuf::from("/data/tessdata")),
            ..Default::default()
        };
        let tesseract = TesseractCommand::from_config(&config).unwrap();
        let cmd = tesseract.command(PSMMode::SingleBlock);
        let cmd = cmd.as_std();
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["stdin", "stdout", "--psm", "6", "-l", "eng+deu", "--tessdata-dir", "/data/tessdata"]
        );
        assert_eq!(cmd.get_program(), "tesseract");
    }

    #[test]
    fn test_missing_executable_is_missing_dependency() {
        let tesseract = TesseractCommand::new("eng")
            .unwrap()
            .with_executable("/nonexistent/bin/tesseract");
        let err = tesseract.recognize(&blank(), PSMMode::SingleBlock).unwrap_err();
        assert!(matches!(err, TablescanError::MissingDependency(_)));
    }

    #[test]
    fn test_empty_image_rejected_before_spawn() {
        let tesseract = TesseractCommand::new("eng")
            .unwrap()
            .with_executable("/nonexistent/bin/tesseract");
        let err = tesseract.recognize(&GrayImage::new(0, 5), PSMMode::Auto).unwrap_err();
        assert!(matches!(err, TablescanError::Ocr { .. }));
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use std::time::Instant;

        /// Writes an executable shell script standing in for tesseract.
        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-tesseract");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_reads_stdout_after_consuming_stdin() {
            let dir = tempfile::tempdir().unwrap();
            let tesseract = TesseractCommand::new("eng")
                .unwrap()
                .with_executable(script(dir.path(), "cat > /dev/null\nprintf 'Total 12.00\\n'"));
            let text = tesseract.recognize(&blank(), PSMMode::SingleBlock).unwrap();
            assert_eq!(text, "Total 12.00\n");
        }

        #[test]
        fn test_failed_exit_reports_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let tesseract = TesseractCommand::new("eng")
                .unwrap()
                .with_executable(script(dir.path(), "echo 'missing eng.traineddata' >&2\nexit 3"));
            let err = tesseract.recognize(&blank(), PSMMode::Auto).unwrap_err();
            assert!(matches!(err, TablescanError::Ocr { .. }));
            assert!(err.to_string().contains("missing eng.traineddata"), "{}", err);
        }

        #[test]
        fn test_slow_process_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let tesseract = TesseractCommand::new("eng")
                .unwrap()
                .with_executable(script(dir.path(), "exec sleep 30"))
                .with_timeout(Duration::from_millis(300));

            let started = Instant::now();
            let err = tesseract.recognize(&blank(), PSMMode::SingleBlock).unwrap_err();
            assert!(started.elapsed() < Duration::from_secs(10));
            assert!(err.to_string().contains("timed out"), "{}", err);
        }
    }
}
