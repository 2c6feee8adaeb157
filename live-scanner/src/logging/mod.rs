//! Logging setup with a reloadable filter and local timezone timestamps.

use chrono::Local;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "live_scanner=info,sqlx=warn";

/// Formats timestamps in the host's local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Type alias for the reload handle.
pub type FilterHandle = Handle<EnvFilter, tracing_subscriber::Registry>;

/// Handle for changing the active filter at runtime.
pub struct LoggingConfig {
    handle: FilterHandle,
    current: Mutex<String>,
}

impl LoggingConfig {
    /// The directive currently in effect.
    pub fn current_filter(&self) -> String {
        self.current.lock().clone()
    }

    /// Replace the active filter.
    pub fn set_filter(&self, directive: &str) -> crate::Result<()> {
        let filter = parse_filter(directive)?;
        self.handle
            .reload(filter)
            .map_err(|e| crate::Error::Other(format!("Failed to reload log filter: {e}")))?;
        *self.current.lock() = directive.to_string();
        info!(filter = directive, "Log filter updated");
        Ok(())
    }
}

/// Validate and build a filter from a directive string.
pub fn parse_filter(directive: &str) -> crate::Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| crate::Error::config(format!("Invalid log filter '{directive}': {e}")))
}

/// Pick the initial directive: `RUST_LOG` wins, then `directive`, then the default.
fn initial_directive(directive: Option<&str>) -> String {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| directive.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Initialize console logging.
pub fn init_logging(directive: Option<&str>) -> crate::Result<LoggingConfig> {
    let directive = initial_directive(directive);
    let initial_filter = parse_filter(&directive).unwrap_or_else(|e| {
        eprintln!("{e}; using default filter");
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });
    let (filter_layer, handle) = reload::Layer::new(initial_filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    Ok(LoggingConfig {
        handle,
        current: Mutex::new(directive),
    })
}
