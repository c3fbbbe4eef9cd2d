use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use mastery_algo::{InterventionPolicy, MasteryPolicy};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            host,
            port,
            log_level,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub const DEFAULT_INTERVENTION_SCHEDULE: &str = "*/30 * * * * *";
const DEFAULT_SNAPSHOT_MAX_AGE_SECS: u64 = 90;

/// Tunable learning and intervention policy
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub mastery: MasteryPolicy,
    pub intervention: InterventionPolicy,
    /// Cron expression (with seconds) for the snapshot refresh worker
    pub intervention_schedule: String,
    pub intervention_worker_enabled: bool,
    /// Older worker snapshots are recomputed on read
    pub snapshot_max_age: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mastery: MasteryPolicy::default(),
            intervention: InterventionPolicy::default(),
            intervention_schedule: DEFAULT_INTERVENTION_SCHEDULE.to_string(),
            intervention_worker_enabled: true,
            snapshot_max_age: Duration::from_secs(DEFAULT_SNAPSHOT_MAX_AGE_SECS),
        }
    }
}

impl PolicyConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable or out-of-range values keep the default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(threshold) = parse_with(&lookup, "MASTERY_THRESHOLD", is_unit_open_low) {
            config.mastery = MasteryPolicy::new(threshold);
        }

        let policy = &mut config.intervention;
        if let Some(v) = parse_with(&lookup, "INTERVENTION_CRITICAL_MASTERY", is_unit) {
            policy.critical_mastery = v;
        }
        if let Some(v) = parse_with(&lookup, "INTERVENTION_VERY_LOW_MASTERY", is_unit) {
            policy.very_low_mastery = v;
        }
        if let Some(v) = parse_with(&lookup, "INTERVENTION_INACTIVE_LONG_DAYS", |d: &i64| *d >= 0) {
            policy.inactive_long_days = v;
        }
        if let Some(v) = parse_with(&lookup, "INTERVENTION_INACTIVE_SHORT_DAYS", |d: &i64| *d >= 0) {
            policy.inactive_short_days = v;
        }
        if let Some(v) = parse_with(&lookup, "INTERVENTION_TOP_N", |n: &usize| *n > 0) {
            policy.top_n = v;
        }
        if policy.very_low_mastery < policy.critical_mastery {
            warn!(
                critical = policy.critical_mastery,
                very_low = policy.very_low_mastery,
                "very-low mastery band below critical band; using defaults"
            );
            let defaults = InterventionPolicy::default();
            policy.critical_mastery = defaults.critical_mastery;
            policy.very_low_mastery = defaults.very_low_mastery;
        }
        if policy.inactive_short_days >= policy.inactive_long_days {
            warn!(
                short = policy.inactive_short_days,
                long = policy.inactive_long_days,
                "short inactivity window not below long window; using defaults"
            );
            let defaults = InterventionPolicy::default();
            policy.inactive_long_days = defaults.inactive_long_days;
            policy.inactive_short_days = defaults.inactive_short_days;
        }

        if let Some(schedule) = lookup("INTERVENTION_SCHEDULE").filter(|s| !s.trim().is_empty()) {
            config.intervention_schedule = schedule;
        }
        if let Some(enabled) = lookup("ENABLE_INTERVENTION_WORKER") {
            config.intervention_worker_enabled = enabled != "false" && enabled != "0";
        }
        if let Some(secs) = parse_with(&lookup, "INTERVENTION_SNAPSHOT_MAX_AGE_SECS", |s: &u64| *s > 0) {
            config.snapshot_max_age = Duration::from_secs(secs);
        }

        config
    }
}

fn is_unit(v: &f64) -> bool {
    (0.0..=1.0).contains(v)
}

fn is_unit_open_low(v: &f64) -> bool {
    *v > 0.0 && *v <= 1.0
}

fn parse_with<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    valid: impl Fn(&T) -> bool,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => Some(value),
        _ => {
            warn!(key, value = %raw, "invalid configuration value, using default");
            None
        }
    }
}
