//! Shared in-memory collaborators for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use live_scanner::database::repositories::{
    ChannelRepository, HistoryRepository, StatusRepository,
};
use live_scanner::domain::{Channel, ChannelStatus, CheckResult};
use live_scanner::monitor::{
    BreakerConfig, ChannelChecker, CircuitBreaker, Detection, LiveDetector, ResolvedStream,
    RetryConfig, StreamResolver, StreamValidator, ToolFailure, ValidationReport,
};
use live_scanner::{Error, Result};

pub const STREAM_URL: &str = "https://cdn.example.com/live/index.m3u8";

#[derive(Default)]
pub struct MemoryChannelRepository {
    channels: Mutex<Vec<Channel>>,
    pub fail: AtomicBool,
    /// Return disabled rows from `list_enabled`, like a store with a stale filter.
    pub include_disabled: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl MemoryChannelRepository {
    pub fn with_channels(channels: Vec<Channel>) -> Self {
        Self {
            channels: Mutex::new(channels),
            fail: AtomicBool::new(false),
            include_disabled: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, channel: Channel) {
        self.channels.lock().push(channel);
    }

    pub fn disable(&self, id: &str) {
        for channel in self.channels.lock().iter_mut().filter(|c| c.id == id) {
            channel.enabled = false;
        }
    }
}

#[async_trait]
impl ChannelRepository for MemoryChannelRepository {
    async fn list_enabled(&self) -> Result<Vec<Channel>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Other("channel store unavailable".to_string()));
        }
        Ok(self
            .channels
            .lock()
            .iter()
            .filter(|c| c.enabled || self.include_disabled.load(Ordering::SeqCst))
            .cloned()
            .collect())
    }

    async fn get_channel(&self, id: &str) -> Result<Channel> {
        self.channels
            .lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("Channel", id))
    }

    async fn create_channel(&self, channel: &Channel) -> Result<()> {
        self.push(channel.clone());
        Ok(())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let mut channels = self.channels.lock();
        let channel = channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::not_found("Channel", id))?;
        channel.enabled = enabled;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStatusRepository {
    statuses: Mutex<HashMap<String, ChannelStatus>>,
    pub upserts: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl MemoryStatusRepository {
    pub fn get(&self, channel_id: &str) -> Option<ChannelStatus> {
        self.statuses.lock().get(channel_id).cloned()
    }
}

#[async_trait]
impl StatusRepository for MemoryStatusRepository {
    async fn upsert(&self, status: &ChannelStatus) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Other("status store unavailable".to_string()));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .insert(status.channel_id.clone(), status.clone());
        Ok(())
    }

    async fn get_status(&self, channel_id: &str) -> Result<Option<ChannelStatus>> {
        Ok(self.get(channel_id))
    }
}

#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub channel_id: String,
    pub result: CheckResult,
    pub details: Value,
    pub duration_ms: u64,
}

#[derive(Default)]
pub struct MemoryHistoryRepository {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryRepository {
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().clone()
    }

    pub fn for_channel(&self, channel_id: &str) -> Vec<HistoryRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.channel_id == channel_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    async fn add(
        &self,
        channel_id: &str,
        result: CheckResult,
        details: &Value,
        duration_ms: u64,
    ) -> Result<String> {
        let mut records = self.records.lock();
        records.push(HistoryRecord {
            channel_id: channel_id.to_string(),
            result,
            details: details.clone(),
            duration_ms,
        });
        Ok(format!("h{}", records.len()))
    }

    async fn list_for_channel(
        &self,
        _channel_id: &str,
        _limit: u32,
    ) -> Result<Vec<live_scanner::domain::CheckHistoryEntry>> {
        Ok(Vec::new())
    }
}

/// Detector that replays a script, then falls back to a fixed answer.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Detection>>,
    per_channel: Mutex<HashMap<String, Detection>>,
    fallback: Detection,
    delay: Duration,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedDetector {
    pub fn always(fallback: Detection) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            per_channel: Mutex::new(HashMap::new()),
            fallback,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn live() -> Self {
        Self::always(Detection::Live {
            session_id: "v1".to_string(),
        })
    }

    pub fn with_script(self, script: Vec<Detection>) -> Self {
        *self.script.lock() = script.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_for_channel(&self, channel_id: &str, detection: Detection) {
        self.per_channel
            .lock()
            .insert(channel_id.to_string(), detection);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn called_ids(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveDetector for ScriptedDetector {
    async fn detect(&self, channel: &Channel) -> Detection {
        self.calls.lock().push((channel.id.clone(), Instant::now()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(detection) = self.per_channel.lock().get(&channel.id) {
            return detection.clone();
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

pub struct ScriptedResolver {
    script: Mutex<VecDeque<std::result::Result<ResolvedStream, ToolFailure>>>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn ok() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<std::result::Result<ResolvedStream, ToolFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamResolver for ScriptedResolver {
    async fn resolve(
        &self,
        _channel: &Channel,
        _session_id: &str,
    ) -> std::result::Result<ResolvedStream, ToolFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ResolvedStream::new(STREAM_URL)))
    }
}

pub fn online_report() -> ValidationReport {
    ValidationReport {
        online: true,
        http_code: Some(200),
        content_type: Some("application/vnd.apple.mpegurl".to_string()),
        detail: "HEAD 200".to_string(),
    }
}

pub fn offline_report(code: u16) -> ValidationReport {
    ValidationReport {
        online: false,
        http_code: Some(code),
        content_type: None,
        detail: format!("HEAD {code}"),
    }
}

pub struct ScriptedValidator {
    script: Mutex<VecDeque<ValidationReport>>,
    fallback: ValidationReport,
    calls: AtomicUsize,
}

impl ScriptedValidator {
    pub fn always(fallback: ValidationReport) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn online() -> Self {
        Self::always(online_report())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamValidator for ScriptedValidator {
    async fn validate(&self, _url: &str) -> ValidationReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// A checker wired to in-memory collaborators, with handles to inspect them.
pub struct Harness {
    pub detector: Arc<ScriptedDetector>,
    pub resolver: Arc<ScriptedResolver>,
    pub validator: Arc<ScriptedValidator>,
    pub breaker: Arc<CircuitBreaker>,
    pub statuses: Arc<MemoryStatusRepository>,
    pub history: Arc<MemoryHistoryRepository>,
}

impl Harness {
    pub fn new(detector: ScriptedDetector) -> Self {
        Self::with_parts(detector, ScriptedResolver::ok(), ScriptedValidator::online())
    }

    pub fn with_parts(
        detector: ScriptedDetector,
        resolver: ScriptedResolver,
        validator: ScriptedValidator,
    ) -> Self {
        Self {
            detector: Arc::new(detector),
            resolver: Arc::new(resolver),
            validator: Arc::new(validator),
            breaker: Arc::new(CircuitBreaker::new(BreakerConfig::default())),
            statuses: Arc::new(MemoryStatusRepository::default()),
            history: Arc::new(MemoryHistoryRepository::default()),
        }
    }

    pub fn checker(&self) -> Arc<ChannelChecker> {
        Arc::new(ChannelChecker::new(
            self.detector.clone(),
            self.resolver.clone(),
            self.validator.clone(),
            self.breaker.clone(),
            self.statuses.clone(),
            self.history.clone(),
            RetryConfig::default(),
        ))
    }
}

pub fn channel(id: &str) -> Channel {
    Channel::new(format!("Channel {id}"), format!("@{id}")).with_id(id)
}
