//! yt-dlp backed live detection and stream resolution.
//!
//! The tool is invoked as a subprocess under a hard timeout; a timed-out
//! process is killed and the attempt is reported as a timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use process_utils::{CapturedOutput, ProcessError, output_with_timeout};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::classify::{OutputClass, OutputClassifier, truncate_message};
use super::detector::{Detection, LiveDetector, ResolvedStream, StreamResolver, ToolFailure};
use crate::domain::Channel;

const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Configuration for the extraction tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the yt-dlp binary.
    pub binary_path: String,
    /// Hard timeout for a detection run.
    pub detect_timeout: Duration,
    /// Hard timeout for a resolution run.
    pub resolve_timeout: Duration,
    /// `-f` format selector used when resolving.
    pub format_selector: String,
    /// Arguments placed before the generated ones.
    pub extra_args: Vec<String>,
    /// Maximum characters of tool output kept in error messages.
    pub max_message_chars: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
            detect_timeout: Duration::from_secs(45),
            resolve_timeout: Duration::from_secs(45),
            format_selector: "best".to_string(),
            extra_args: Vec::new(),
            max_message_chars: 2000,
        }
    }
}

/// Runs yt-dlp and classifies failures from its output.
#[derive(Debug, Clone)]
pub struct YtDlpRunner {
    config: ToolConfig,
    classifier: Arc<OutputClassifier>,
}

impl YtDlpRunner {
    pub fn new(config: ToolConfig, classifier: Arc<OutputClassifier>) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn classifier(&self) -> &OutputClassifier {
        &self.classifier
    }

    /// Invoke the tool. Any exit status is returned as output; only spawn
    /// failures and timeouts are errors here.
    pub async fn invoke(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> std::result::Result<CapturedOutput, ToolFailure> {
        let mut cmd = process_utils::tokio_command(&self.config.binary_path);
        cmd.args(&self.config.extra_args).args(args);

        trace!(binary = %self.config.binary_path, ?args, "Invoking extraction tool");

        match output_with_timeout(cmd, timeout).await {
            Ok(output) => Ok(output),
            Err(ProcessError::TimedOut(after)) => Err(ToolFailure::timeout(format!(
                "{} timed out after {}s",
                self.config.binary_path,
                after.as_secs()
            ))),
            Err(e) => Err(ToolFailure::tool(format!(
                "{}: {}",
                self.config.binary_path, e
            ))),
        }
    }

    /// Truncated combined stdout+stderr.
    pub fn message(&self, output: &CapturedOutput) -> String {
        let combined = output.combined();
        if combined.is_empty() {
            format!("exited with code {:?} and no output", output.code)
        } else {
            truncate_message(&combined, self.config.max_message_chars)
        }
    }

    /// Classify a failed run as blocked, timeout or generic tool failure.
    pub fn failure_from_output(&self, output: &CapturedOutput) -> ToolFailure {
        let message = self.message(output);
        match self.classifier.classify(&output.combined()) {
            OutputClass::Blocked => ToolFailure::blocked(message),
            OutputClass::Timeout => ToolFailure::timeout(message),
            _ => ToolFailure::tool(message),
        }
    }
}

/// Subset of the yt-dlp info JSON used for detection.
#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: Option<String>,
    live_status: Option<String>,
    is_live: Option<bool>,
    release_timestamp: Option<i64>,
}

/// Live detector that asks yt-dlp for the channel's live URL metadata.
#[derive(Debug, Clone)]
pub struct YtDlpDetector {
    runner: YtDlpRunner,
}

impl YtDlpDetector {
    pub fn new(runner: YtDlpRunner) -> Self {
        Self { runner }
    }

    fn args(channel: &Channel) -> Vec<String> {
        [
            "--dump-single-json",
            "--skip-download",
            "--no-warnings",
            "--no-playlist",
            channel.live_url.as_str(),
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    /// Interpret a finished tool run.
    pub fn interpret(&self, output: &CapturedOutput) -> Detection {
        if output.success()
            && let Ok(info) = serde_json::from_str::<VideoInfo>(output.stdout.trim())
        {
            return detection_from_info(info);
        }

        let message = self.runner.message(output);
        match self.runner.classifier().classify(&output.combined()) {
            OutputClass::Blocked => Detection::Blocked { message },
            OutputClass::Upcoming => Detection::Scheduled {
                starts_at: None,
                message: Some(message),
            },
            OutputClass::NotLive => Detection::NotLive,
            OutputClass::Timeout => Detection::Failed(ToolFailure::timeout(message)),
            OutputClass::Generic if output.success() => Detection::Failed(ToolFailure::tool(
                format!("unparsable tool output: {message}"),
            )),
            OutputClass::Generic => Detection::Failed(ToolFailure::tool(message)),
        }
    }
}

fn detection_from_info(info: VideoInfo) -> Detection {
    let status = info.live_status.as_deref().unwrap_or_default();
    let live = status == "is_live" || (status.is_empty() && info.is_live == Some(true));

    if live {
        return match info.id {
            Some(session_id) if !session_id.is_empty() => Detection::Live { session_id },
            _ => Detection::Failed(ToolFailure::tool("live broadcast reported without an id")),
        };
    }

    if status == "is_upcoming" {
        return Detection::Scheduled {
            starts_at: info
                .release_timestamp
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            message: None,
        };
    }

    Detection::NotLive
}

#[async_trait]
impl LiveDetector for YtDlpDetector {
    async fn detect(&self, channel: &Channel) -> Detection {
        let timeout = self.runner.config().detect_timeout;
        let output = match self.runner.invoke(&Self::args(channel), timeout).await {
            Ok(output) => output,
            Err(failure) => return Detection::Failed(failure),
        };

        let detection = self.interpret(&output);
        debug!(channel_id = %channel.id, ?detection, "Live detection finished");
        detection
    }
}

/// Stream resolver that asks yt-dlp for direct media URLs.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    runner: YtDlpRunner,
}

impl YtDlpResolver {
    pub fn new(runner: YtDlpRunner) -> Self {
        Self { runner }
    }

    fn args(&self, channel: &Channel, session_id: &str) -> Vec<String> {
        let target = if session_id.is_empty() {
            channel.live_url.clone()
        } else {
            format!("{WATCH_URL_BASE}{session_id}")
        };
        vec![
            "-g".to_string(),
            "-f".to_string(),
            self.runner.config().format_selector.clone(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            target,
        ]
    }

    /// Pick the first usable address from a finished tool run.
    pub fn interpret(
        &self,
        output: &CapturedOutput,
    ) -> std::result::Result<ResolvedStream, ToolFailure> {
        if !output.success() {
            return Err(self.runner.failure_from_output(output));
        }

        output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http"))
            .map(ResolvedStream::new)
            .ok_or_else(|| {
                ToolFailure::tool(format!(
                    "no stream address in tool output: {}",
                    self.runner.message(output)
                ))
            })
    }
}

#[async_trait]
impl StreamResolver for YtDlpResolver {
    async fn resolve(
        &self,
        channel: &Channel,
        session_id: &str,
    ) -> std::result::Result<ResolvedStream, ToolFailure> {
        let timeout = self.runner.config().resolve_timeout;
        let output = self
            .runner
            .invoke(&self.args(channel, session_id), timeout)
            .await?;
        self.interpret(&output)
    }
}
