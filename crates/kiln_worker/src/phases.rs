//! Per-phase wall-clock timing of backend builds.

use crate::backend::{Phase, ProgressFeedback, ProgressListener};
use std::time::{Duration, Instant};

/// Measures how long each backend phase takes and logs it.
///
/// A phase ends when a different phase starts; the final phase ends at
/// [`finish`](PhaseTimer::finish). Never asks the build to stop.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    current: Option<(Phase, Instant)>,
    timings: Vec<(Phase, Duration)>,
}

impl PhaseTimer {
    /// Creates a timer with no phase started.
    pub fn new() -> Self {
        Self::default()
    }

    fn close_current(&mut self, now: Instant) {
        if let Some((phase, started)) = self.current.take() {
            let elapsed = now.duration_since(started);
            log::debug!("{phase}: {} ms", elapsed.as_millis());
            self.timings.push((phase, elapsed));
        }
    }

    /// Ends the phase in progress, if any, and returns all timings in order.
    pub fn finish(mut self) -> Vec<(Phase, Duration)> {
        self.close_current(Instant::now());
        self.timings
    }
}

impl ProgressListener for PhaseTimer {
    fn phase_started(&mut self, phase: Phase, _count: usize) -> ProgressFeedback {
        if self.current.map(|(p, _)| p) != Some(phase) {
            let now = Instant::now();
            self.close_current(now);
            self.current = Some((phase, now));
        }
        ProgressFeedback::Continue
    }

    fn progress_reached(&mut self, _progress: usize) -> ProgressFeedback {
        ProgressFeedback::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_phase_once() {
        let mut timer = PhaseTimer::new();
        for phase in Phase::ALL {
            assert_eq!(timer.phase_started(phase, 10), ProgressFeedback::Continue);
            assert_eq!(timer.phase_started(phase, 10), ProgressFeedback::Continue);
            assert_eq!(timer.progress_reached(5), ProgressFeedback::Continue);
        }
        let phases: Vec<Phase> = timer.finish().into_iter().map(|(p, _)| p).collect();
        assert_eq!(phases, Phase::ALL.to_vec());
    }

    #[test]
    fn empty_build_has_no_timings() {
        assert!(PhaseTimer::new().finish().is_empty());
    }

    #[test]
    fn revisited_phase_is_recorded_again() {
        let mut timer = PhaseTimer::new();
        timer.phase_started(Phase::Linking, 1);
        timer.phase_started(Phase::Optimization, 1);
        timer.phase_started(Phase::Linking, 1);
        let timings = timer.finish();
        assert_eq!(timings.len(), 3);
    }
}
