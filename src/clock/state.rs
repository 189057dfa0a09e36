use tokio::time::Instant;

/// Running time of a session, excluding any span the clock was stopped for.
///
/// All transitions take `now` explicitly so the arithmetic can be exercised
/// without a runtime.
#[derive(Debug, Clone, Default)]
pub struct ClockState {
    pub running: bool,
    /// Time folded in from earlier running segments; combines with
    /// `segment_anchor` to give the true elapsed time.
    pub accumulated_ms: u64,
    pub segment_anchor: Option<Instant>,
}

impl ClockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new running segment. Returns `false` if one is already open.
    pub fn begin_segment(&mut self, now: Instant) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.segment_anchor = Some(now);
        true
    }

    /// Folds the open segment into `accumulated_ms`. Returns `false` if the
    /// clock was not running.
    pub fn end_segment(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        self.accumulated_ms = self.elapsed_ms(now);
        self.running = false;
        self.segment_anchor = None;
        true
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        match (self.running, self.segment_anchor) {
            (true, Some(anchor)) => self
                .accumulated_ms
                .saturating_add(now.saturating_duration_since(anchor).as_millis() as u64),
            _ => self.accumulated_ms,
        }
    }

    pub fn elapsed_seconds(&self, now: Instant) -> u64 {
        self.elapsed_ms(now) / 1000
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stopped_clock_is_frozen() {
        let t0 = Instant::now();
        let mut state = ClockState::new();
        assert!(state.begin_segment(t0));
        assert!(state.end_segment(t0 + Duration::from_millis(2500)));

        assert_eq!(state.elapsed_ms(t0 + Duration::from_secs(60)), 2500);
        assert_eq!(state.elapsed_seconds(t0 + Duration::from_secs(60)), 2);
    }

    #[test]
    fn segments_accumulate_across_pauses() {
        let t0 = Instant::now();
        let mut state = ClockState::new();

        state.begin_segment(t0);
        state.end_segment(t0 + Duration::from_secs(4));
        // 10s paused
        state.begin_segment(t0 + Duration::from_secs(14));
        assert_eq!(state.elapsed_seconds(t0 + Duration::from_secs(16)), 6);
        state.end_segment(t0 + Duration::from_secs(17));

        assert_eq!(state.elapsed_seconds(t0 + Duration::from_secs(100)), 7);
    }

    #[test]
    fn double_begin_and_double_end_are_ignored() {
        let t0 = Instant::now();
        let mut state = ClockState::new();

        assert!(state.begin_segment(t0));
        assert!(!state.begin_segment(t0 + Duration::from_secs(5)));
        assert!(state.end_segment(t0 + Duration::from_secs(8)));
        assert!(!state.end_segment(t0 + Duration::from_secs(20)));

        assert_eq!(state.accumulated_ms, 8000);
    }

    #[test]
    fn reset_zeroes_everything() {
        let t0 = Instant::now();
        let mut state = ClockState::new();
        state.begin_segment(t0);
        state.reset();

        assert!(!state.running);
        assert!(state.segment_anchor.is_none());
        assert_eq!(state.elapsed_ms(t0 + Duration::from_secs(3)), 0);
    }
}
