//! Concurrent fan-out range aggregation.
//!
//! One upstream lookup task per identifier in the requested range, merged by
//! a single collector over an mpsc channel. The channel closing is the
//! barrier: the collector only returns once every task has reported or the
//! range deadline has expired, and timed-out identifiers are recorded as
//! failures rather than left hanging.
//!
//! All coordination state lives inside a single `fetch_range` call, so
//! concurrent HTTP requests cannot interfere with each other.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::Instrument;

use pokedex_core::model::{FetchFailure, PokemonSummary, RangeOutcome};
use pokedex_core::observability::range_span;
use pokedex_core::{Error, Result};

use crate::config::RangeConfig;
use crate::upstream::PokemonLookup;

/// Largest identifier the upstream assigns; bounds the valid request domain.
const MAX_UPSTREAM_ID: i64 = u32::MAX as i64;

/// Aggregates an inclusive identifier range into one ordered collection.
#[derive(Clone)]
pub struct RangeAggregator {
    lookup: Arc<dyn PokemonLookup>,
    per_fetch_timeout: Duration,
    deadline: Duration,
    max_span: u32,
}

impl RangeAggregator {
    /// Creates an aggregator over the given lookup seam.
    #[must_use]
    pub fn new(lookup: Arc<dyn PokemonLookup>, per_fetch_timeout: Duration, range: RangeConfig) -> Self {
        Self {
            lookup,
            per_fetch_timeout,
            deadline: range.deadline(),
            max_span: range.max_span,
        }
    }

    /// Fetches every identifier in `[start, end]` concurrently and returns
    /// the merged outcome, entries sorted ascending by id.
    ///
    /// A failed or timed-out identifier is recorded in
    /// [`RangeOutcome::failures`] and never aborts its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRange`] when `start > end`, either bound is
    /// negative, the span exceeds the configured maximum, or the bounds fall
    /// outside the upstream identifier domain. No lookups are dispatched in
    /// any of these cases.
    pub async fn fetch_range(&self, start: i64, end: i64) -> Result<RangeOutcome> {
        let span = range_span(start, end);
        let (start, end) = validate_bounds(start, end, self.max_span)?;
        self.collect_range(start, end).instrument(span).await
    }

    async fn collect_range(&self, start: u32, end: u32) -> Result<RangeOutcome> {
        let count = (end - start + 1) as usize;

        let deadline = Instant::now() + self.deadline;
        let (tx, mut rx) = mpsc::channel::<(u32, std::result::Result<PokemonSummary, FetchFailure>)>(count);

        let mut handles = Vec::with_capacity(count);
        for id in start..=end {
            let lookup = Arc::clone(&self.lookup);
            let tx = tx.clone();
            let per_fetch = self.per_fetch_timeout;
            handles.push(tokio::spawn(async move {
                let report = match timeout(per_fetch, lookup.summary(id)).await {
                    Ok(Ok(summary)) => Ok(summary),
                    Ok(Err(err)) => Err(FetchFailure::new(id, err.to_string())),
                    Err(_) => Err(FetchFailure::new(
                        id,
                        format!("timed out after {}s", per_fetch.as_secs()),
                    )),
                };
                // Receiver may already be gone if the range deadline expired.
                let _ = tx.send((id, report)).await;
            }));
        }
        drop(tx);

        let mut entries = Vec::with_capacity(count);
        let mut failures = Vec::new();
        let mut pending: BTreeSet<u32> = (start..=end).collect();

        loop {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some((id, report))) => {
                    pending.remove(&id);
                    match report {
                        Ok(summary) => entries.push(summary),
                        Err(failure) => {
                            tracing::warn!(id = failure.id, reason = %failure.reason, "range fetch failed");
                            failures.push(failure);
                        }
                    }
                }
                // Every sender dropped: the barrier is complete.
                Ok(None) => break,
                Err(_) => {
                    for handle in &handles {
                        handle.abort();
                    }
                    tracing::warn!(
                        unfinished = pending.len(),
                        "range deadline expired with lookups outstanding"
                    );
                    for id in &pending {
                        failures.push(FetchFailure::new(
                            *id,
                            format!("range deadline of {}s expired", self.deadline.as_secs()),
                        ));
                    }
                    break;
                }
            }
        }

        entries.sort_unstable_by_key(|e| e.id);
        failures.sort_unstable_by_key(|f| f.id);

        tracing::info!(
            fetched = entries.len(),
            failed = failures.len(),
            "range aggregation complete"
        );

        Ok(RangeOutcome { entries, failures })
    }
}

/// Checks range bounds and converts them into the upstream id domain.
fn validate_bounds(start: i64, end: i64, max_span: u32) -> Result<(u32, u32)> {
    if start < 0 || end < 0 {
        return Err(Error::invalid_range(format!(
            "bounds must be non-negative (got start={start}, end={end})"
        )));
    }
    if start > end {
        return Err(Error::invalid_range(format!(
            "start {start} is greater than end {end}"
        )));
    }
    if end > MAX_UPSTREAM_ID {
        return Err(Error::invalid_range(format!(
            "end {end} is outside the upstream identifier domain"
        )));
    }
    let span = end - start + 1;
    if span > i64::from(max_span) {
        return Err(Error::invalid_range(format!(
            "span {span} exceeds the maximum of {max_span} per request"
        )));
    }

    // Both bounds proven to fit after the domain checks above.
    Ok((start as u32, end as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pokedex_core::model::PokemonDetail;

    /// In-process lookup fake with per-id failures and deterministic jitter.
    struct MockLookup {
        fail: HashSet<u32>,
        hang: HashSet<u32>,
        jitter: bool,
        calls: AtomicUsize,
    }

    impl MockLookup {
        fn ok() -> Self {
            Self {
                fail: HashSet::new(),
                hang: HashSet::new(),
                jitter: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(ids: impl IntoIterator<Item = u32>) -> Self {
            Self {
                fail: ids.into_iter().collect(),
                ..Self::ok()
            }
        }

        fn hanging(ids: impl IntoIterator<Item = u32>) -> Self {
            Self {
                hang: ids.into_iter().collect(),
                ..Self::ok()
            }
        }

        fn jittered() -> Self {
            Self {
                jitter: true,
                ..Self::ok()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn summary(id: u32) -> PokemonSummary {
        PokemonSummary {
            url: format!("https://upstream.test/pokemon/{id}"),
            id,
            name: format!("pokemon-{id}"),
            sprite: format!("https://upstream.test/sprite/{id}.png"),
            types: vec!["normal".to_string()],
        }
    }

    #[async_trait]
    impl PokemonLookup for MockLookup {
        async fn summary(&self, id: u32) -> Result<PokemonSummary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang.contains(&id) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.jitter {
                // Deterministic spread so completion order differs from id order.
                tokio::time::sleep(Duration::from_millis(u64::from((id * 31) % 13))).await;
            }
            if self.fail.contains(&id) {
                return Err(Error::upstream(format!("simulated failure for {id}")));
            }
            Ok(summary(id))
        }

        async fn detail(&self, _target: &str) -> Result<PokemonDetail> {
            Ok(PokemonDetail::default())
        }
    }

    fn aggregator(lookup: Arc<MockLookup>) -> RangeAggregator {
        RangeAggregator::new(lookup, Duration::from_secs(1), RangeConfig::default())
    }

    fn assert_sorted_unique(entries: &[PokemonSummary]) {
        for pair in entries.windows(2) {
            assert!(pair[0].id < pair[1].id, "entries must be strictly ascending");
        }
    }

    #[tokio::test]
    async fn full_range_is_sorted_and_complete() {
        let lookup = Arc::new(MockLookup::jittered());
        let outcome = aggregator(Arc::clone(&lookup))
            .fetch_range(1, 20)
            .await
            .expect("valid range");

        assert!(outcome.is_complete());
        assert_eq!(outcome.entries.len(), 20);
        assert_sorted_unique(&outcome.entries);
        assert_eq!(outcome.entries[0].id, 1);
        assert_eq!(outcome.entries[19].id, 20);
        assert_eq!(lookup.calls(), 20);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected_before_dispatch() {
        let lookup = Arc::new(MockLookup::ok());
        let result = aggregator(Arc::clone(&lookup)).fetch_range(5, 3).await;

        assert!(matches!(result, Err(Error::InvalidRange { .. })));
        assert_eq!(lookup.calls(), 0, "no lookups may be dispatched");
    }

    #[tokio::test]
    async fn negative_bounds_are_rejected() {
        let lookup = Arc::new(MockLookup::ok());
        let agg = aggregator(Arc::clone(&lookup));

        assert!(matches!(
            agg.fetch_range(-1, 5).await,
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            agg.fetch_range(1, -5).await,
            Err(Error::InvalidRange { .. })
        ));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn span_above_cap_is_rejected() {
        let lookup = Arc::new(MockLookup::ok());
        let result = aggregator(Arc::clone(&lookup)).fetch_range(1, 501).await;

        assert!(matches!(result, Err(Error::InvalidRange { .. })));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn single_id_range_dispatches_one_task() {
        let lookup = Arc::new(MockLookup::ok());
        let outcome = aggregator(Arc::clone(&lookup))
            .fetch_range(1, 1)
            .await
            .expect("valid range");

        assert_eq!(lookup.calls(), 1);
        assert!(outcome.is_complete());
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].id, 1);
    }

    #[tokio::test]
    async fn single_failure_is_isolated() {
        let lookup = Arc::new(MockLookup::failing([7]));
        let outcome = aggregator(lookup)
            .fetch_range(5, 10)
            .await
            .expect("partial outcome is not an error");

        let ids: Vec<u32> = outcome.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 6, 8, 9, 10]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, 7);
        assert!(outcome.failures[0].reason.contains("simulated failure"));
    }

    #[tokio::test]
    async fn slow_lookup_times_out_without_blocking_siblings() {
        let lookup = Arc::new(MockLookup::hanging([2]));
        let agg = RangeAggregator::new(lookup, Duration::from_millis(50), RangeConfig::default());

        let outcome = agg.fetch_range(1, 3).await.expect("partial outcome");

        let ids: Vec<u32> = outcome.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, 2);
        assert!(outcome.failures[0].reason.contains("timed out"));
    }

    #[tokio::test]
    async fn deadline_expiry_records_unfinished_ids() {
        let lookup = Arc::new(MockLookup::hanging([4, 5]));
        let agg = RangeAggregator::new(
            lookup,
            Duration::from_secs(30),
            RangeConfig {
                deadline_secs: 1,
                max_span: 500,
            },
        );

        let started = std::time::Instant::now();
        let outcome = agg.fetch_range(1, 5).await.expect("partial outcome");
        assert!(started.elapsed() < Duration::from_secs(10), "barrier must not hang");

        let ids: Vec<u32> = outcome.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let failed: Vec<u32> = outcome.failures.iter().map(|f| f.id).collect();
        assert_eq!(failed, vec![4, 5]);
        for failure in &outcome.failures {
            assert!(failure.reason.contains("deadline"));
        }
    }

    #[tokio::test]
    async fn thousand_id_stress_stays_sorted_and_lossless() {
        let lookup = Arc::new(MockLookup::jittered());
        let agg = RangeAggregator::new(
            Arc::clone(&lookup) as Arc<dyn PokemonLookup>,
            Duration::from_secs(5),
            RangeConfig {
                deadline_secs: 60,
                max_span: 1000,
            },
        );

        let outcome = agg.fetch_range(1, 1000).await.expect("valid range");

        assert!(outcome.is_complete());
        assert_eq!(outcome.entries.len(), 1000);
        assert_sorted_unique(&outcome.entries);
        assert_eq!(lookup.calls(), 1000);
    }
}
