//! Time-ordered chat index answering point and range queries by playback offset

use crate::chat::model::ChatMessage;
use crate::error::{ReplayError, Result};
use tracing::debug;

/// Tolerance around a scrub position, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubWindow {
    pub before: f64,
    pub after: f64,
}

impl ScrubWindow {
    /// `[t - window, t + window]`
    pub fn symmetric(window: f64) -> Self {
        Self {
            before: window,
            after: window,
        }
    }

    /// `[t - window, t]`, everything already said up to the playhead
    pub fn trailing(window: f64) -> Self {
        Self {
            before: window,
            after: 0.0,
        }
    }
}

/// Immutable, time-sorted view over one chat export.
///
/// Messages are stably sorted by `time_in_seconds` at build time, so equal
/// offsets keep their ingestion order. Every query result is a contiguous
/// slice of that order.
#[derive(Debug, Clone, Default)]
pub struct ChatTimeIndex {
    messages: Vec<ChatMessage>,
}

impl ChatTimeIndex {
    /// Build an index, taking ownership of the messages
    pub fn build(mut messages: Vec<ChatMessage>) -> Self {
        messages.sort_by(|a, b| a.time_in_seconds.total_cmp(&b.time_in_seconds));
        debug!("Built chat index over {} messages", messages.len());
        Self { messages }
    }

    /// Messages within `window` seconds either side of `t`
    pub fn query_at(&self, t: f64, window: f64) -> Result<&[ChatMessage]> {
        if !window.is_finite() || window < 0.0 {
            return Err(ReplayError::invalid_range(t, t, "window must be a non-negative number"));
        }
        self.query_window(t, ScrubWindow::symmetric(window))
    }

    /// Messages within an explicit, possibly asymmetric window around `t`
    pub fn query_window(&self, t: f64, window: ScrubWindow) -> Result<&[ChatMessage]> {
        if !window.before.is_finite() || !window.after.is_finite() || window.before < 0.0 || window.after < 0.0 {
            return Err(ReplayError::invalid_range(
                t - window.before,
                t + window.after,
                "window bounds must be non-negative numbers",
            ));
        }
        self.query_range(t - window.before, t + window.after)
    }

    /// Messages with `t0 <= time_in_seconds <= t1`
    pub fn query_range(&self, t0: f64, t1: f64) -> Result<&[ChatMessage]> {
        if t0.is_nan() || t1.is_nan() {
            return Err(ReplayError::invalid_range(t0, t1, "bounds must be numbers"));
        }
        if t0 > t1 {
            return Err(ReplayError::invalid_range(t0, t1, "start is after end"));
        }

        let lower = self.messages.partition_point(|m| m.time_in_seconds < t0);
        let upper = lower
            + self.messages[lower..]
                .iter()
                .take_while(|m| m.time_in_seconds <= t1)
                .count();

        Ok(&self.messages[lower..upper])
    }

    /// All messages in index order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Offset of the first and last message
    pub fn time_span(&self) -> Option<(f64, f64)> {
        match (self.messages.first(), self.messages.last()) {
            (Some(first), Some(last)) => Some((first.time_in_seconds, last.time_in_seconds)),
            _ => None,
        }
    }
}
