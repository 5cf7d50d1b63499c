//! Metrics for the merchant assistant conversation pipeline.

use metrics::{counter, histogram};
use std::time::Instant;

/// Pipeline metrics recorder
pub struct AssistantMetrics;

impl AssistantMetrics {
    /// Record one pipeline stage finishing.
    ///
    /// `outcome` is `ok`, `error` or `timeout`.
    pub fn record_stage(stage: &'static str, outcome: &'static str, seconds: f64) {
        counter!("assistant_stage_total", "stage" => stage, "outcome" => outcome).increment(1);
        histogram!("assistant_stage_duration_seconds", "stage" => stage).record(seconds);
    }

    /// Retrieval failed and the turn continued with no prior context
    pub fn record_retrieval_degraded(reason: &'static str) {
        counter!("assistant_retrieval_degraded_total", "reason" => reason).increment(1);
    }

    /// Number of prior turns rendered into a prompt
    pub fn record_context_size(pairs: usize) {
        histogram!("assistant_context_pairs").record(pairs as f64);
    }

    /// An embedding for a persisted turn was not stored.
    ///
    /// The turn itself is durable; only its retrievability is reduced.
    pub fn record_embedding_upsert_failed(kind: &str) {
        counter!("assistant_embedding_upsert_failures_total", "kind" => kind.to_string())
            .increment(1);
    }

    /// Final outcome of a create-interaction request
    pub fn record_interaction(outcome: &'static str, seconds: f64) {
        counter!("assistant_interactions_total", "outcome" => outcome).increment(1);
        histogram!("assistant_interaction_duration_seconds").record(seconds);

        tracing::debug!(outcome, seconds, "Recorded interaction");
    }
}

/// Measures one stage; call [`StageTimer::finish`] with the outcome.
///
/// A timer dropped without finishing records the stage as `error`.
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
    finished: bool,
}

impl StageTimer {
    pub fn start(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Record the stage and return the elapsed seconds
    pub fn finish(mut self, outcome: &'static str) -> f64 {
        self.record(outcome)
    }

    fn record(&mut self, outcome: &'static str) -> f64 {
        self.finished = true;
        let seconds = self.start.elapsed().as_secs_f64();
        AssistantMetrics::record_stage(self.stage, outcome, seconds);
        seconds
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        if !self.finished {
            self.record("error");
        }
    }
}
