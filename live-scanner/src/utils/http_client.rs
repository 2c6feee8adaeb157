use std::{sync::OnceLock, time::Duration};

use tracing::{debug, warn};

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate may have installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the shared client used for stream validation.
///
/// Per-request timeouts are applied by callers; `connect_timeout` bounds
/// connection setup only. Redirects are followed since CDN playlist URLs
/// commonly bounce between edge hosts.
pub fn build_validation_client(user_agent: &str, connect_timeout: Duration) -> reqwest::Client {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .pool_max_idle_per_host(4);

    if connect_timeout > Duration::ZERO {
        builder = builder.connect_timeout(connect_timeout);
    }

    builder.build().unwrap_or_else(|error| {
        warn!(
            error = %error,
            "Failed to create HTTP client; falling back to reqwest defaults"
        );
        reqwest::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_install_is_idempotent() {
        install_rustls_provider();
        install_rustls_provider();
    }

    #[test]
    fn test_build_validation_client() {
        let _client = build_validation_client("live-scanner/test", Duration::from_secs(5));
        let _client = build_validation_client("live-scanner/test", Duration::ZERO);
    }
}
