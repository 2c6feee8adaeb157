//! Monitored channel entity.

use serde::{Deserialize, Serialize};
use url::Url;

const YOUTUBE_BASE: &str = "https://www.youtube.com";

/// A monitored channel.
///
/// The scanner only reads channels; they are created and edited elsewhere and
/// picked up at the next refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Canonical channel reference (`UC…` id, `@handle`, or a full URL).
    pub channel_ref: String,
    /// Precomputed URL that points at the channel's current live broadcast.
    pub live_url: String,
    pub enabled: bool,
}

impl Channel {
    /// Create a new enabled channel, deriving its live URL from the reference.
    pub fn new(name: impl Into<String>, channel_ref: impl Into<String>) -> Self {
        let channel_ref = channel_ref.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            live_url: live_url_for(&channel_ref),
            channel_ref,
            enabled: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Derive the "live" URL for a channel reference.
///
/// - full `http(s)` URLs are used verbatim
/// - `UC…` channel ids map to `/channel/<id>/live`
/// - anything else is treated as a handle and maps to `/@handle/live`
pub fn live_url_for(channel_ref: &str) -> String {
    let reference = channel_ref.trim();

    if let Ok(url) = Url::parse(reference)
        && matches!(url.scheme(), "http" | "https")
    {
        return reference.to_string();
    }

    if reference.starts_with("UC") && reference.len() == 24 {
        return format!("{YOUTUBE_BASE}/channel/{reference}/live");
    }

    let handle = reference.trim_start_matches('@');
    format!("{YOUTUBE_BASE}/@{handle}/live")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_url_for_channel_id() {
        assert_eq!(
            live_url_for("UCabcdefghijklmnopqrstuv"),
            "https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv/live"
        );
    }

    #[test]
    fn test_live_url_for_handle() {
        assert_eq!(
            live_url_for("@somechannel"),
            "https://www.youtube.com/@somechannel/live"
        );
        assert_eq!(
            live_url_for("somechannel"),
            "https://www.youtube.com/@somechannel/live"
        );
    }

    #[test]
    fn test_live_url_for_full_url() {
        let url = "https://www.youtube.com/watch?v=abc123";
        assert_eq!(live_url_for(url), url);
    }

    #[test]
    fn test_new_channel_is_enabled() {
        let channel = Channel::new("News", "@news");
        assert!(channel.enabled);
        assert!(!channel.id.is_empty());
        assert_eq!(channel.live_url, "https://www.youtube.com/@news/live");
        assert!(!channel.disabled().enabled);
    }
}
