//! Application log generator.
//!
//! Level selection is a weighted draw derived from two config knobs
//! (`debug_log_ratio`, `error_rate`); messages are level templates filled
//! from small fixed vocabularies so the corpus looks hand-written without
//! unbounded cardinality.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::GenerationConfig;
use crate::generators::{new_span_id, new_trace_id, random_hex};
use crate::model::{LogLevel, LogRecord};
use crate::pools::EntityPools;

const DEBUG_TEMPLATES: [&str; 4] = [
    "Debug information: processing request {request_id}",
    "Database query executed: {query}",
    "Cache hit for key {key}",
    "Processing user action: {action}",
];

const INFO_TEMPLATES: [&str; 5] = [
    "User {user_id} logged in successfully",
    "Request processed successfully",
    "Service started successfully",
    "Configuration loaded",
    "Health check passed",
];

const WARN_TEMPLATES: [&str; 4] = [
    "Slow query detected: {query} took {duration}ms",
    "High memory usage: {usage}%",
    "Deprecated API endpoint used: {endpoint}",
    "Connection pool nearly exhausted",
];

const ERROR_TEMPLATES: [&str; 5] = [
    "Database connection failed",
    "Failed to process request: {error}",
    "Authentication failed for user {user_id}",
    "External service unavailable",
    "Validation error: {field} is required",
];

const CRITICAL_TEMPLATES: [&str; 4] = [
    "Service is shutting down due to critical error",
    "Database connection pool exhausted",
    "Out of memory error",
    "Security breach detected",
];

const QUERIES: [&str; 3] = [
    "SELECT * FROM users",
    "UPDATE orders SET status",
    "INSERT INTO logs",
];
const ACTIONS: [&str; 4] = ["login", "logout", "purchase", "search"];
const ERRORS: [&str; 3] = ["timeout", "validation failed", "service unavailable"];
const ENDPOINTS: [&str; 3] = ["/api/v1/users", "/api/v1/orders", "/legacy/stats"];
const FIELDS: [&str; 4] = ["email", "password", "user_id", "order_id"];

/// Fraction of logs carrying trace context (always trace_id AND span_id).
const TRACE_CONTEXT_RATE: f64 = 0.3;

enum LevelPicker {
    Weighted(WeightedIndex<f64>),
    Uniform,
}

pub struct LogsGenerator {
    cursor: DateTime<Utc>,
    interval: Duration,
    picker: LevelPicker,
}

impl LogsGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            cursor: config.start_time,
            interval: Duration::seconds(i64::from(config.logs_frequency_seconds)),
            picker: Self::build_picker(config),
        }
    }

    /// Weights per level: [debug_ratio, 0.7 - debug_ratio, 0.15, error_rate,
    /// error_rate / 10], negatives clamped to zero. A degenerate combination
    /// (everything zero) falls back to a uniform draw — the one sanctioned
    /// fallback instead of a hard config error.
    fn build_picker(config: &GenerationConfig) -> LevelPicker {
        let raw = [
            config.debug_log_ratio,
            0.7 - config.debug_log_ratio,
            0.15,
            config.error_rate,
            config.error_rate / 10.0,
        ];
        let weights: Vec<f64> = raw.iter().map(|w| w.max(0.0)).collect();

        if weights.iter().sum::<f64>() <= 0.0 {
            warn!(
                debug_log_ratio = config.debug_log_ratio,
                error_rate = config.error_rate,
                "degenerate log level weights; falling back to uniform distribution"
            );
            return LevelPicker::Uniform;
        }

        match WeightedIndex::new(&weights) {
            Ok(index) => LevelPicker::Weighted(index),
            Err(_) => {
                warn!("log level weights rejected; falling back to uniform distribution");
                LevelPicker::Uniform
            }
        }
    }

    pub fn generate(
        &mut self,
        rng: &mut StdRng,
        pools: &EntityPools,
        count: usize,
    ) -> Vec<LogRecord> {
        let mut out = Vec::with_capacity(count);

        for _ in 0..count {
            let level = self.choose_level(rng);
            let service = pools.service(rng).to_string();
            let message = fill_template(rng, level);

            let (trace_id, span_id) = if rng.random_bool(TRACE_CONTEXT_RATE) {
                (Some(new_trace_id(rng)), Some(new_span_id(rng)))
            } else {
                (None, None)
            };

            let mut metadata = BTreeMap::new();
            metadata.insert("service".to_string(), service.clone().into());
            metadata.insert("host".to_string(), pools.host(rng).to_string().into());
            metadata.insert(
                "environment".to_string(),
                pools.environment(rng).to_string().into(),
            );
            metadata.insert("version".to_string(), EntityPools::version_tag(rng).into());
            metadata.insert("thread_id".to_string(), rng.random_range(1..=100i64).into());
            metadata.insert(
                "process_id".to_string(),
                rng.random_range(1000..=9999i64).into(),
            );

            out.push(LogRecord {
                timestamp: self.cursor,
                level,
                service,
                message,
                metadata,
                trace_id,
                span_id,
            });

            self.cursor += self.interval;
        }

        out
    }

    fn choose_level(&self, rng: &mut StdRng) -> LogLevel {
        match &self.picker {
            LevelPicker::Weighted(index) => LogLevel::ALL[index.sample(rng)],
            LevelPicker::Uniform => LogLevel::ALL[rng.random_range(0..LogLevel::ALL.len())],
        }
    }

    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }
}

fn fill_template(rng: &mut StdRng, level: LogLevel) -> String {
    let template = match level {
        LogLevel::Debug => DEBUG_TEMPLATES.choose(rng),
        LogLevel::Info => INFO_TEMPLATES.choose(rng),
        LogLevel::Warn => WARN_TEMPLATES.choose(rng),
        LogLevel::Error => ERROR_TEMPLATES.choose(rng),
        LogLevel::Critical => CRITICAL_TEMPLATES.choose(rng),
    };
    let mut message = (*template.unwrap_or(&"Log event")).to_string();

    // Placeholders are independent draws; untouched templates pass through.
    if message.contains("{request_id}") {
        message = message.replace("{request_id}", &format!("req_{}", random_hex(rng, 8)));
    }
    if message.contains("{user_id}") {
        message = message.replace("{user_id}", &format!("user_{}", rng.random_range(1000..=9999)));
    }
    if message.contains("{query}") {
        message = message.replace("{query}", QUERIES.choose(rng).unwrap_or(&QUERIES[0]));
    }
    if message.contains("{key}") {
        message = message.replace("{key}", &format!("cache_key_{}", rng.random_range(1..=1000)));
    }
    if message.contains("{action}") {
        message = message.replace("{action}", ACTIONS.choose(rng).unwrap_or(&ACTIONS[0]));
    }
    if message.contains("{error}") {
        message = message.replace("{error}", ERRORS.choose(rng).unwrap_or(&ERRORS[0]));
    }
    if message.contains("{duration}") {
        message = message.replace("{duration}", &rng.random_range(100..=5000).to_string());
    }
    if message.contains("{usage}") {
        message = message.replace("{usage}", &rng.random_range(80..=95).to_string());
    }
    if message.contains("{endpoint}") {
        message = message.replace("{endpoint}", ENDPOINTS.choose(rng).unwrap_or(&ENDPOINTS[0]));
    }
    if message.contains("{field}") {
        message = message.replace("{field}", FIELDS.choose(rng).unwrap_or(&FIELDS[0]));
    }

    message
}
