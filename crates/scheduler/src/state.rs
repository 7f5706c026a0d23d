use std::time::Duration;

use driftwatch_state_center::SeriesFlags;
use driftwatch_transport::TransportError;
use tokio::time::Instant;

/// Observable state of one polled series.
///
/// A failure never clears `value`: the last good snapshot stays available next to the
/// error until a later fetch succeeds.
#[derive(Clone, Debug)]
pub struct PollState<T> {
    pub value: Option<T>,
    pub error: Option<TransportError>,
    pub in_flight: bool,
    /// When `value` was last replaced.
    pub updated_at: Option<Instant>,
    pub consecutive_failures: u32,
    /// Completed fetch cycles, successful or not.
    pub fetch_count: u64,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
            in_flight: false,
            updated_at: None,
            consecutive_failures: 0,
            fetch_count: 0,
        }
    }
}

impl<T> PollState<T> {
    /// Nothing has resolved yet.
    pub fn is_loading(&self) -> bool {
        self.value.is_none() && self.error.is_none()
    }

    pub fn is_stale(&self, window: Duration) -> bool {
        match self.updated_at {
            Some(at) => at.elapsed() > window,
            None => false,
        }
    }

    pub fn flags(&self, window: Duration) -> SeriesFlags {
        SeriesFlags {
            loading: self.is_loading(),
            in_flight: self.in_flight,
            stale: self.is_stale(window),
            error: self.error.as_ref().map(|err| err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_loading_and_not_stale() {
        let state: PollState<u32> = PollState::default();
        assert!(state.is_loading());
        assert!(!state.is_stale(Duration::from_secs(1)));
    }

    #[test]
    fn error_without_value_is_not_loading() {
        let state: PollState<u32> = PollState {
            error: Some(TransportError::network("refused")),
            ..PollState::default()
        };
        assert!(!state.is_loading());
        let flags = state.flags(Duration::from_secs(5));
        assert_eq!(flags.error.as_deref(), Some("refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn value_goes_stale_after_window() {
        let state = PollState {
            value: Some(1u32),
            updated_at: Some(Instant::now()),
            ..PollState::default()
        };
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!state.is_stale(Duration::from_secs(5)));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(state.is_stale(Duration::from_secs(5)));
    }
}
