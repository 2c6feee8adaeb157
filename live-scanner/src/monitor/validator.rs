//! Lightweight HTTP validation of resolved stream addresses.
//!
//! A HEAD request decides most cases from the content type. When HEAD is
//! refused or the content type is ambiguous, a bounded GET sniffs the start
//! of the body for playlist markers.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for stream validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub head_timeout: Duration,
    pub get_timeout: Duration,
    /// Maximum body bytes read while sniffing.
    pub sniff_bytes: usize,
    pub user_agent: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            head_timeout: Duration::from_secs(8),
            get_timeout: Duration::from_secs(10),
            sniff_bytes: 4096,
            user_agent: format!("live-scanner/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Result of validating a stream address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub online: bool,
    /// Last HTTP status observed.
    pub http_code: Option<u16>,
    pub content_type: Option<String>,
    /// Human-readable reason, e.g. `"HEAD 404"`.
    pub detail: String,
}

impl ValidationReport {
    fn online(http_code: u16, content_type: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            online: true,
            http_code: Some(http_code),
            content_type,
            detail: detail.into(),
        }
    }

    fn offline(
        http_code: Option<u16>,
        content_type: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            online: false,
            http_code,
            content_type,
            detail: detail.into(),
        }
    }
}

/// Confirms that a stream address actually serves media.
#[async_trait]
pub trait StreamValidator: Send + Sync {
    async fn validate(&self, url: &str) -> ValidationReport;
}

/// How a content type bears on liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Playlist or media: online.
    Media,
    /// Could be anything: sniff the body.
    Ambiguous,
    /// Clearly not a stream (e.g. an HTML error page).
    NotMedia,
}

pub fn content_kind(content_type: Option<&str>) -> ContentKind {
    let Some(content_type) = content_type else {
        return ContentKind::Ambiguous;
    };
    let ct = content_type.to_ascii_lowercase();

    if ct.contains("mpegurl")
        || ct.contains("dash+xml")
        || ct.starts_with("video/")
        || ct.starts_with("audio/")
        || ct.contains("mp2t")
    {
        ContentKind::Media
    } else if ct.is_empty()
        || ct.starts_with("text/plain")
        || ct.starts_with("application/octet-stream")
        || ct.starts_with("binary/octet-stream")
    {
        ContentKind::Ambiguous
    } else {
        ContentKind::NotMedia
    }
}

/// Whether a body prefix looks like an HLS or DASH manifest.
pub fn has_playlist_marker(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("#EXTM3U") || text.contains("<MPD")
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// `reqwest`-based stream validator.
#[derive(Debug, Clone)]
pub struct HttpStreamValidator {
    client: reqwest::Client,
    config: ValidatorConfig,
}

impl HttpStreamValidator {
    pub fn new(client: reqwest::Client, config: ValidatorConfig) -> Self {
        Self { client, config }
    }

    /// HEAD probe. `Some(report)` is final; `None` means fall back to GET.
    async fn probe_head(&self, url: &str) -> Option<ValidationReport> {
        let response = match self
            .client
            .head(url)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .timeout(self.config.head_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "HEAD failed, falling back to GET");
                return None;
            }
        };

        let status = response.status();
        let content_type = content_type_of(response.headers());

        // Some CDNs refuse HEAD outright.
        if matches!(status.as_u16(), 403 | 405 | 501) {
            return None;
        }

        if !status.is_success() {
            return Some(ValidationReport::offline(
                Some(status.as_u16()),
                content_type,
                format!("HEAD {}", status.as_u16()),
            ));
        }

        match content_kind(content_type.as_deref()) {
            ContentKind::Media => Some(ValidationReport::online(
                status.as_u16(),
                content_type.clone(),
                format!(
                    "HEAD {} {}",
                    status.as_u16(),
                    content_type.as_deref().unwrap_or_default()
                ),
            )),
            ContentKind::Ambiguous => None,
            ContentKind::NotMedia => Some(ValidationReport::offline(
                Some(status.as_u16()),
                content_type.clone(),
                format!(
                    "HEAD {} unexpected content-type {}",
                    status.as_u16(),
                    content_type.as_deref().unwrap_or_default()
                ),
            )),
        }
    }

    async fn probe_get(&self, url: &str) -> ValidationReport {
        let response = match self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .timeout(self.config.get_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ValidationReport::offline(None, None, format!("GET timed out: {e}"));
            }
            Err(e) => return ValidationReport::offline(None, None, format!("GET failed: {e}")),
        };

        let status = response.status().as_u16();
        let content_type = content_type_of(response.headers());

        if !response.status().is_success() {
            return ValidationReport::offline(Some(status), content_type, format!("GET {status}"));
        }

        if content_kind(content_type.as_deref()) == ContentKind::Media {
            let detail = format!("GET {status} {}", content_type.as_deref().unwrap_or_default());
            return ValidationReport::online(status, content_type, detail);
        }

        let mut body = Vec::with_capacity(self.config.sniff_bytes.min(64 * 1024));
        let mut stream = response.bytes_stream();
        while body.len() < self.config.sniff_bytes {
            match stream.next().await {
                Some(Ok(chunk)) => body.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    return ValidationReport::offline(
                        Some(status),
                        content_type,
                        format!("GET {status} body read failed: {e}"),
                    );
                }
                None => break,
            }
        }
        body.truncate(self.config.sniff_bytes);

        if has_playlist_marker(&body) {
            ValidationReport::online(status, content_type, format!("GET {status} playlist marker"))
        } else {
            let detail = format!(
                "GET {status} {} no playlist marker",
                content_type.as_deref().unwrap_or("unknown")
            );
            ValidationReport::offline(Some(status), content_type, detail)
        }
    }
}

#[async_trait]
impl StreamValidator for HttpStreamValidator {
    async fn validate(&self, url: &str) -> ValidationReport {
        if let Some(report) = self.probe_head(url).await {
            return report;
        }
        self.probe_get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind() {
        assert_eq!(
            content_kind(Some("application/vnd.apple.mpegurl")),
            ContentKind::Media
        );
        assert_eq!(content_kind(Some("application/x-mpegURL")), ContentKind::Media);
        assert_eq!(content_kind(Some("application/dash+xml")), ContentKind::Media);
        assert_eq!(content_kind(Some("video/mp2t")), ContentKind::Media);
        assert_eq!(content_kind(Some("text/plain; charset=utf-8")), ContentKind::Ambiguous);
        assert_eq!(content_kind(Some("application/octet-stream")), ContentKind::Ambiguous);
        assert_eq!(content_kind(None), ContentKind::Ambiguous);
        assert_eq!(content_kind(Some("text/html")), ContentKind::NotMedia);
    }

    #[test]
    fn test_playlist_markers() {
        assert!(has_playlist_marker(b"#EXTM3U\n#EXT-X-VERSION:3\n"));
        assert!(has_playlist_marker(b"\xef\xbb\xbf  #EXTM3U\n"));
        assert!(has_playlist_marker(b"<?xml version=\"1.0\"?><MPD xmlns=\"x\">"));
        assert!(!has_playlist_marker(b"<html><body>nope</body></html>"));
        assert!(!has_playlist_marker(b""));
    }
}
