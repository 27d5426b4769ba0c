//! Trace-tree builder.
//!
//! Builds whole span trees until the accumulated span count reaches the
//! target. Children are attached through an explicit worklist rather than
//! recursion, which bounds stack depth and keeps partial trees easy to test.
//!
//! Timing invariants, enforced at creation time:
//! - a child never starts before its parent (children are offset forward by
//!   the cumulative duration of prior siblings at the same level);
//! - a child's duration never exceeds half the parent's.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;

use crate::config::GenerationConfig;
use crate::generators::{new_span_id, new_trace_id};
use crate::model::{SpanStatus, TraceSpan};
use crate::pools::EntityPools;

/// Operation catalog: category name to concrete operation names. The
/// category decides which extra tags a span carries.
pub const OPERATIONS: [(&str, &[&str]); 6] = [
    (
        "http_request",
        &["GET /users", "POST /orders", "PUT /users/{id}", "DELETE /orders/{id}"],
    ),
    (
        "database_query",
        &["SELECT users", "UPDATE orders", "INSERT logs", "DELETE sessions"],
    ),
    (
        "cache_operation",
        &["GET user_cache", "SET order_cache", "DEL session_cache"],
    ),
    (
        "message_processing",
        &["process_order", "send_notification", "update_inventory"],
    ),
    ("file_operation", &["read_config", "write_logs", "backup_data"]),
    (
        "external_api_call",
        &["payment_gateway", "email_service", "analytics_api"],
    ),
];

/// Root span duration range, microseconds (50ms to 500ms).
const ROOT_DURATION_US: std::ops::RangeInclusive<u64> = 50_000..=500_000;
/// Smallest span the builder will emit, microseconds.
const MIN_SPAN_DURATION_US: u64 = 1_000;
/// Fan-out is bounded regardless of configuration.
const DEPTH_CAP: u32 = 4;

/// Work item: attach children under this parent.
struct Pending {
    parent_span_id: String,
    parent_start: DateTime<Utc>,
    parent_duration: u64,
    remaining_depth: u32,
}

pub struct TraceTreeBuilder {
    cursor: DateTime<Utc>,
    interval: Duration,
    max_depth: u32,
    missing_span_rate: f64,
    error_rate: f64,
}

impl TraceTreeBuilder {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            cursor: config.start_time,
            interval: Duration::seconds(i64::from(config.traces_frequency_seconds)),
            max_depth: config.max_trace_depth.clamp(1, DEPTH_CAP),
            missing_span_rate: config.missing_span_rate,
            error_rate: config.error_rate,
        }
    }

    /// Build complete trees until at least `target_spans` spans exist (the
    /// last tree may overshoot slightly). Zero target yields nothing.
    pub fn generate(
        &mut self,
        rng: &mut StdRng,
        pools: &EntityPools,
        target_spans: usize,
    ) -> Vec<TraceSpan> {
        let mut spans = Vec::with_capacity(target_spans);

        while spans.len() < target_spans {
            self.build_tree(rng, pools, &mut spans);
            self.cursor += self.interval;
        }

        spans
    }

    fn build_tree(&self, rng: &mut StdRng, pools: &EntityPools, out: &mut Vec<TraceSpan>) {
        let trace_id = new_trace_id(rng);
        let root_duration = rng.random_range(ROOT_DURATION_US);
        let depth_budget = rng.random_range(1..=self.max_depth);

        let root = self.make_span(rng, pools, &trace_id, None, self.cursor, root_duration);

        let mut work = vec![Pending {
            parent_span_id: root.span_id.clone(),
            parent_start: root.start_time,
            parent_duration: root.duration,
            remaining_depth: depth_budget,
        }];
        out.push(root);

        while let Some(item) = work.pop() {
            if item.remaining_depth == 0 {
                continue;
            }

            let child_count = rng.random_range(1..=3);
            let mut sibling_offset_us: u64 = 0;

            for _ in 0..child_count {
                // Instrumentation gap: dropping the child drops its subtree.
                if rng.random_bool(self.missing_span_rate) {
                    continue;
                }

                let start =
                    item.parent_start + Duration::microseconds(sibling_offset_us as i64);
                let duration =
                    rng.random_range(MIN_SPAN_DURATION_US..=(item.parent_duration / 2).max(MIN_SPAN_DURATION_US));

                let span = self.make_span(
                    rng,
                    pools,
                    &trace_id,
                    Some(item.parent_span_id.clone()),
                    start,
                    duration,
                );

                // Descend only while the child is long enough to host a
                // half-duration grandchild; a coin flip varies tree shapes
                // below the first level.
                if item.remaining_depth > 1
                    && duration >= MIN_SPAN_DURATION_US * 2
                    && rng.random_bool(0.5)
                {
                    work.push(Pending {
                        parent_span_id: span.span_id.clone(),
                        parent_start: start,
                        parent_duration: duration,
                        remaining_depth: item.remaining_depth - 1,
                    });
                }

                sibling_offset_us += duration;
                out.push(span);
            }
        }
    }

    fn make_span(
        &self,
        rng: &mut StdRng,
        pools: &EntityPools,
        trace_id: &str,
        parent_span_id: Option<String>,
        start_time: DateTime<Utc>,
        duration: u64,
    ) -> TraceSpan {
        let (category, names) = OPERATIONS.choose(rng).copied().unwrap_or(OPERATIONS[0]);
        let operation_name = names.choose(rng).copied().unwrap_or(names[0]);
        let service = pools.service(rng).to_string();

        let status = if rng.random::<f64>() < self.error_rate {
            *[SpanStatus::Error, SpanStatus::Timeout]
                .choose(rng)
                .unwrap_or(&SpanStatus::Error)
        } else {
            SpanStatus::Ok
        };

        let mut tags = BTreeMap::new();
        tags.insert("service.name".to_string(), service.clone());
        tags.insert("service.version".to_string(), EntityPools::version_tag(rng));
        tags.insert("environment".to_string(), pools.environment(rng).to_string());
        tags.insert("host.name".to_string(), pools.host(rng).to_string());

        match category {
            "http_request" => {
                let mut parts = operation_name.split_whitespace();
                let method = parts.next().unwrap_or("GET");
                let path = parts.next().unwrap_or("/");
                tags.insert("http.method".to_string(), method.to_string());
                tags.insert(
                    "http.url".to_string(),
                    format!("https://api.example.com{path}"),
                );
                tags.insert(
                    "http.status_code".to_string(),
                    if status == SpanStatus::Error { "500" } else { "200" }.to_string(),
                );
            }
            "database_query" => {
                let db = ["postgresql", "mysql", "redis"]
                    .choose(rng)
                    .copied()
                    .unwrap_or("postgresql");
                tags.insert("db.type".to_string(), db.to_string());
                tags.insert("db.statement".to_string(), operation_name.to_string());
                tags.insert("db.instance".to_string(), "primary".to_string());
            }
            "cache_operation" => {
                let key = operation_name.split_whitespace().nth(1).unwrap_or("unknown");
                tags.insert("cache.type".to_string(), "redis".to_string());
                tags.insert("cache.key".to_string(), key.to_string());
            }
            _ => {}
        }

        TraceSpan {
            trace_id: trace_id.to_string(),
            span_id: new_span_id(rng),
            parent_span_id,
            operation_name: operation_name.to_string(),
            start_time,
            duration,
            service,
            tags,
            status,
        }
    }

    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn build(config: &GenerationConfig, seed: u64, target: usize) -> Vec<TraceSpan> {
        let pools = EntityPools::from_config(config);
        let mut builder = TraceTreeBuilder::new(config);
        let mut rng = StdRng::seed_from_u64(seed);
        builder.generate(&mut rng, &pools, target)
    }

    #[test]
    fn test_zero_target_is_empty() {
        let config = GenerationConfig::default();
        assert!(build(&config, 1, 0).is_empty());
    }

    #[test]
    fn test_parentage_and_timing_invariants() {
        let config = GenerationConfig::default();
        let spans = build(&config, 42, 800);
        assert!(spans.len() >= 800);

        let by_span: HashMap<(&str, &str), &TraceSpan> = spans
            .iter()
            .map(|s| ((s.trace_id.as_str(), s.span_id.as_str()), s))
            .collect();

        for span in &spans {
            assert!(span.duration > 0);
            if let Some(parent_id) = &span.parent_span_id {
                let parent = by_span
                    .get(&(span.trace_id.as_str(), parent_id.as_str()))
                    .expect("parent exists in the same trace");
                assert!(parent.start_time <= span.start_time);
                assert!(
                    span.duration <= parent.duration / 2,
                    "child {} exceeds half of parent {}",
                    span.duration,
                    parent.duration
                );
            }
        }
    }

    #[test]
    fn test_trace_ids_not_reused_across_trees() {
        let config = GenerationConfig::default();
        let spans = build(&config, 7, 500);

        // Group per trace; each trace id must map to exactly one root.
        let mut roots: HashMap<&str, usize> = HashMap::new();
        for span in &spans {
            if span.parent_span_id.is_none() {
                *roots.entry(span.trace_id.as_str()).or_insert(0) += 1;
            }
        }
        assert!(roots.values().all(|&n| n == 1));
    }

    #[test]
    fn test_full_instrumentation_guarantees_children() {
        let mut config = GenerationConfig::default();
        config.max_trace_depth = 5;
        config.missing_span_rate = 0.0;

        // Every tree must contain the root plus at least one first-level
        // child when no spans are dropped.
        let spans = build(&config, 3, 400);
        let mut per_trace: HashMap<&str, usize> = HashMap::new();
        for span in &spans {
            *per_trace.entry(span.trace_id.as_str()).or_insert(0) += 1;
        }
        assert!(per_trace.values().all(|&n| n >= 2));
    }

    #[test]
    fn test_depth_is_capped() {
        let mut config = GenerationConfig::default();
        config.max_trace_depth = 100;
        let spans = build(&config, 9, 600);

        let mut parent_of: HashMap<&str, Option<&str>> = HashMap::new();
        for span in &spans {
            parent_of.insert(span.span_id.as_str(), span.parent_span_id.as_deref());
        }
        for span in &spans {
            let mut depth = 0;
            let mut current = span.parent_span_id.as_deref();
            while let Some(id) = current {
                depth += 1;
                current = parent_of.get(id).copied().flatten();
            }
            assert!(depth <= DEPTH_CAP as usize, "depth {depth} exceeds cap");
        }
    }

    #[test]
    fn test_http_spans_carry_http_tags() {
        let config = GenerationConfig::default();
        let spans = build(&config, 11, 400);
        let http = spans
            .iter()
            .find(|s| s.tags.contains_key("http.method"))
            .expect("http span in 400 spans");
        assert!(http.tags.contains_key("http.url"));
        assert!(http.tags.contains_key("http.status_code"));
    }
}
