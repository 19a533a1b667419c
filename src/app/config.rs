use std::time::Duration;

use reqwest::Url;

use super::error::ConfigError;
use crate::domain::{DEFAULT_RESULT_FIELD, EventAttributes};
use crate::streaming::{
    ConsumerSettings, DispatchSettings, MAX_BOUNDED_CAPACITY, PipelineSettings, QueuePolicy,
};

pub const DATA_STREAM: &str = "DATA_STREAM";
pub const K_SINK: &str = "K_SINK";
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const RESULT_FIELD: &str = "RESULT_FIELD";
pub const DISPATCH_INTERVAL_MS: &str = "DISPATCH_INTERVAL_MS";
pub const IDLE_POLL_INTERVAL_MS: &str = "IDLE_POLL_INTERVAL_MS";
pub const MAX_BACKOFF_SECS: &str = "MAX_BACKOFF_SECS";
pub const QUEUE_CAPACITY: &str = "QUEUE_CAPACITY";
pub const SINK_TIMEOUT_MS: &str = "SINK_TIMEOUT_MS";
pub const SHUTDOWN_GRACE_MS: &str = "SHUTDOWN_GRACE_MS";

const DEFAULT_REGION: &str = "us-east-1";

/// Runtime configuration read from the process environment
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub stream_name: String,
    pub sink_url: Url,
    pub region: String,
    pub result_field: String,
    pub dispatch_interval: Duration,
    pub idle_poll_interval: Duration,
    /// `None` disables the cap (`MAX_BACKOFF_SECS=0`)
    pub max_backoff: Option<Duration>,
    pub queue_policy: QueuePolicy,
    pub sink_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let stream_name = get(DATA_STREAM).ok_or(ConfigError::Missing(DATA_STREAM))?;

        let raw_sink = get(K_SINK).ok_or(ConfigError::Missing(K_SINK))?;
        let sink_url = Url::parse(&raw_sink).map_err(|e| ConfigError::Invalid {
            var: K_SINK,
            value: raw_sink.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(sink_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: K_SINK,
                value: raw_sink,
                reason: "scheme must be http or https".to_string(),
            });
        }

        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            get(var)
                .map(|value| {
                    value.parse::<u64>().map_err(|e| ConfigError::Invalid {
                        var,
                        value: value.clone(),
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        let max_backoff = match number(MAX_BACKOFF_SECS)? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => ConsumerSettings::default().max_backoff,
        };

        let queue_policy = match number(QUEUE_CAPACITY)? {
            None | Some(0) => QueuePolicy::Unbounded,
            Some(capacity) => match usize::try_from(capacity) {
                Ok(capacity) if capacity <= MAX_BOUNDED_CAPACITY => QueuePolicy::Bounded(capacity),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: QUEUE_CAPACITY,
                        value: capacity.to_string(),
                        reason: format!("must not exceed {MAX_BOUNDED_CAPACITY}"),
                    });
                }
            },
        };

        Ok(Self {
            stream_name,
            sink_url,
            region: get(AWS_DEFAULT_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            result_field: get(RESULT_FIELD).unwrap_or_else(|| DEFAULT_RESULT_FIELD.to_string()),
            dispatch_interval: Duration::from_millis(number(DISPATCH_INTERVAL_MS)?.unwrap_or(500)),
            idle_poll_interval: Duration::from_millis(
                number(IDLE_POLL_INTERVAL_MS)?.unwrap_or(1000),
            ),
            max_backoff,
            queue_policy,
            sink_timeout: Duration::from_millis(number(SINK_TIMEOUT_MS)?.unwrap_or(10_000)),
            shutdown_grace: Duration::from_millis(number(SHUTDOWN_GRACE_MS)?.unwrap_or(5_000)),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            result_field: self.result_field.clone(),
            queue_policy: self.queue_policy,
            attributes: EventAttributes::default(),
            consumer: ConsumerSettings {
                max_backoff: self.max_backoff,
                idle_poll_interval: self.idle_poll_interval,
                ..Default::default()
            },
            dispatch: DispatchSettings {
                dispatch_interval: self.dispatch_interval,
            },
            shutdown_grace: self.shutdown_grace,
        }
    }
}
