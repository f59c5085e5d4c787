//! MOV to MP4 remuxing through ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::converter::{ensure_pair, ConverterConfig, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;

const INPUT_NAME: &str = "input.mov";
const OUTPUT_NAME: &str = "output.mp4";

/// Repackages QuickTime video as MP4 without re-encoding the streams.
#[derive(Debug, Clone)]
pub struct VideoStrategy {
    config: ConverterConfig,
}

impl VideoStrategy {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Builds the ffmpeg argument list for one remux.
    fn build_args(&self, input_path: &Path, output_path: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            output_path.to_string_lossy().to_string(),
        ]
    }

    fn spawn_error(&self, e: std::io::Error) -> StrategyError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StrategyError::ToolNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            StrategyError::Io(e)
        }
    }

    /// Checks that ffmpeg can be launched and the staging directory exists.
    pub async fn validate(&self) -> Result<(), StrategyError> {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        Ok(())
    }

    async fn remux(&self, staging: &Path, bytes: &[u8]) -> Result<Vec<u8>, StrategyError> {
        let input_path = staging.join(INPUT_NAME);
        let output_path = staging.join(OUTPUT_NAME);
        tokio::fs::write(&input_path, bytes).await?;

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(self.build_args(&input_path, &output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stderr = child.stderr.take();
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();
            if let Some(stderr) = stderr.as_mut() {
                stderr.read_to_string(&mut error_output).await?;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(StrategyError::encoding(format!(
                        "ffmpeg exited with code {:?}: {}",
                        status.code(),
                        error_output.trim()
                    )));
                }
            }
            Ok(Err(e)) => return Err(StrategyError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(StrategyError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        let output = tokio::fs::read(&output_path)
            .await
            .map_err(|_| StrategyError::encoding("ffmpeg produced no output file"))?;
        if output.is_empty() {
            return Err(StrategyError::encoding("ffmpeg produced an empty output file"));
        }
        Ok(output)
    }
}

#[async_trait]
impl Strategy for VideoStrategy {
    fn name(&self) -> &str {
        "video"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![(FormatTag::Mov, FormatTag::Mp4)]
    }

    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError> {
        ensure_pair(self, from, to)?;
        if file.is_empty() {
            return Err(StrategyError::NoContent);
        }

        let start = Instant::now();
        let staging: PathBuf = self.config.temp_dir.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&staging).await?;

        let result = self.remux(&staging, &file.bytes).await;

        if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
            tracing::warn!(path = %staging.display(), error = %e, "Failed to clean up staging directory");
        }

        if let Ok(output) = &result {
            tracing::debug!(
                file = %file.name,
                input_bytes = file.len(),
                output_bytes = output.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Remuxed video"
            );
        }
        result
    }
}
