//! Dispatcher configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`DispatcherConfig::from_env`].
pub const ENV_PREFIX: &str = "SLOT_DISPATCH_";

/// What happens to a worker's slot claim when the worker faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Free the slot on every completion path.
    #[default]
    ReleaseClaim,
    /// Keep the slot claimed after a fault or an interrupted outcome. The
    /// slot stays stranded for the rest of the run.
    RetainClaim,
}

impl fmt::Display for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReleaseClaim => f.write_str("release_claim"),
            Self::RetainClaim => f.write_str("retain_claim"),
        }
    }
}

impl FromStr for FaultPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "release_claim" | "release" => Ok(Self::ReleaseClaim),
            "retain_claim" | "retain" => Ok(Self::RetainClaim),
            other => Err(format!("unknown fault policy `{other}`")),
        }
    }
}

fn default_max_concurrency() -> usize {
    num_cpus::get()
}

const fn default_resource_count() -> u32 {
    2
}

const fn default_worker_duration_ms() -> u64 {
    1000
}

const fn default_contention_backoff_ms() -> u64 {
    1000
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum units of work in flight. Defaults to available execution units.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Number of exclusive resource slots.
    #[serde(default = "default_resource_count")]
    pub resource_count: u32,
    /// Duration of each simulated unit of work, in milliseconds.
    #[serde(default = "default_worker_duration_ms")]
    pub worker_duration_ms: u64,
    /// Pause after a failed claim, in milliseconds.
    #[serde(default = "default_contention_backoff_ms")]
    pub contention_backoff_ms: u64,
    /// Claim handling on faulted or interrupted work.
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    /// Stop after this many identities have been issued. Unbounded when absent.
    #[serde(default)]
    pub max_dispatches: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            resource_count: default_resource_count(),
            worker_duration_ms: default_worker_duration_ms(),
            contention_backoff_ms: default_contention_backoff_ms(),
            fault_policy: FaultPolicy::default(),
            max_dispatches: None,
        }
    }
}

impl DispatcherConfig {
    /// Configuration with every option at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the number of resource slots.
    #[must_use]
    pub const fn with_resource_count(mut self, resource_count: u32) -> Self {
        self.resource_count = resource_count;
        self
    }

    /// Set the simulated work duration.
    #[must_use]
    pub const fn with_worker_duration_ms(mut self, ms: u64) -> Self {
        self.worker_duration_ms = ms;
        self
    }

    /// Set the contention backoff.
    #[must_use]
    pub const fn with_contention_backoff_ms(mut self, ms: u64) -> Self {
        self.contention_backoff_ms = ms;
        self
    }

    /// Set the fault policy.
    #[must_use]
    pub const fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Stop after `max` identities.
    #[must_use]
    pub const fn with_max_dispatches(mut self, max: u64) -> Self {
        self.max_dispatches = Some(max);
        self
    }

    /// Simulated work duration.
    pub const fn worker_duration(&self) -> Duration {
        Duration::from_millis(self.worker_duration_ms)
    }

    /// Contention backoff.
    pub const fn contention_backoff(&self) -> Duration {
        Duration::from_millis(self.contention_backoff_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".into());
        }
        if self.resource_count == 0 {
            return Err("resource_count must be greater than 0".into());
        }
        if self.max_dispatches == Some(0) {
            return Err("max_dispatches must be greater than 0 when set".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `SLOT_DISPATCH_*` environment variables.
    ///
    /// Unset variables keep their defaults. Call `dotenvy::dotenv().ok()`
    /// first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a full variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        let mut cfg = Self::default();
        if let Some(v) = parse_var(var("MAX_CONCURRENCY"))? {
            cfg.max_concurrency = v;
        }
        if let Some(v) = parse_var(var("RESOURCE_COUNT"))? {
            cfg.resource_count = v;
        }
        if let Some(v) = parse_var(var("WORKER_DURATION_MS"))? {
            cfg.worker_duration_ms = v;
        }
        if let Some(v) = parse_var(var("CONTENTION_BACKOFF_MS"))? {
            cfg.contention_backoff_ms = v;
        }
        if let Some(v) = parse_var(var("FAULT_POLICY"))? {
            cfg.fault_policy = v;
        }
        if let Some(v) = parse_var(var("MAX_DISPATCHES"))? {
            cfg.max_dispatches = Some(v);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(entry: Option<(String, String)>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    entry
        .map(|(name, raw)| {
            raw.trim()
                .parse()
                .map_err(|e| format!("{name}: invalid value `{raw}`: {e}"))
        })
        .transpose()
}
