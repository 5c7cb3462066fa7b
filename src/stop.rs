use std::time::{Duration, Instant};

/// The two phases of a run (§3). Transitions exactly once, on the first
/// successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Setup,
    Running,
}

/// The outcome of evaluating admission policy for one inner-loop
/// iteration. `Rewind` replaces the side-channel `eof_seen` mutation from
/// the original `should_admit` description (§9) with an explicit variant
/// the engine's loop consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    Rewind,
    Stop,
}

/// Grace period added to the time limit while still in the setup phase,
/// so a run that never manages to send anything is still bounded (§4.E).
const SETUP_GRACE: Duration = Duration::from_secs(5);

/// Why the stop predicate latched `stopped`, recorded for the Reporter
/// (§4.G wants to print "time limit" vs. "end of input" as the reason
/// the run ended).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TimeLimit,
    EndOfInput,
}

/// Decides whether the engine should keep admitting new queries (§4.E).
/// `stopped` is latched: once true, it stays true for the rest of the run.
pub struct StopPredicate {
    stopped: bool,
    reason: Option<StopReason>,
    time_limit: Option<Duration>,
    run_once: bool,
    runs_through_file: u64,
}

impl StopPredicate {
    pub fn new(time_limit: Option<Duration>, run_once: bool) -> Self {
        Self {
            stopped: false,
            reason: None,
            time_limit,
            run_once,
            runs_through_file: 0,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn reason(&self) -> Option<StopReason> {
        self.reason
    }

    pub fn runs_through_file(&self) -> u64 {
        self.runs_through_file
    }

    /// `program_start`/`first_query_at` anchor the elapsed-time check
    /// depending on `phase` — setup measures from program start with a
    /// grace window, running measures from the first dispatch exactly
    /// (§4.E).
    pub fn decide(
        &mut self,
        eof_seen: bool,
        phase: RunPhase,
        program_start: Instant,
        first_query_at: Option<Instant>,
    ) -> AdmissionDecision {
        if self.stopped {
            return AdmissionDecision::Stop;
        }

        if let Some(limit) = self.time_limit {
            let (elapsed, bound) = match phase {
                RunPhase::Setup => (
                    Instant::now().saturating_duration_since(program_start),
                    limit + SETUP_GRACE,
                ),
                RunPhase::Running => (
                    Instant::now().saturating_duration_since(
                        first_query_at.expect("running phase always has a first_query_at"),
                    ),
                    limit,
                ),
            };
            if elapsed >= bound {
                self.stopped = true;
                self.reason = Some(StopReason::TimeLimit);
                return AdmissionDecision::Stop;
            }
        }

        if !eof_seen {
            return AdmissionDecision::Admit;
        }

        if self.run_once {
            self.stopped = true;
            self.reason = Some(StopReason::EndOfInput);
            return AdmissionDecision::Stop;
        }

        self.runs_through_file += 1;
        AdmissionDecision::Rewind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_while_not_at_eof() {
        let mut stop = StopPredicate::new(None, true);
        let now = Instant::now();
        assert_eq!(
            stop.decide(false, RunPhase::Setup, now, None),
            AdmissionDecision::Admit
        );
    }

    #[test]
    fn run_once_stops_at_eof() {
        let mut stop = StopPredicate::new(None, true);
        let now = Instant::now();
        assert_eq!(
            stop.decide(true, RunPhase::Running, now, Some(now)),
            AdmissionDecision::Stop
        );
        assert!(stop.is_stopped());
    }

    #[test]
    fn repeating_run_rewinds_and_counts_passes() {
        let mut stop = StopPredicate::new(Some(Duration::from_secs(60)), false);
        let now = Instant::now();
        assert_eq!(
            stop.decide(true, RunPhase::Running, now, Some(now)),
            AdmissionDecision::Rewind
        );
        assert_eq!(stop.runs_through_file(), 1);
        assert!(!stop.is_stopped());
    }

    #[test]
    fn once_stopped_stays_stopped() {
        let mut stop = StopPredicate::new(None, true);
        let now = Instant::now();
        stop.decide(true, RunPhase::Running, now, Some(now));
        assert_eq!(
            stop.decide(false, RunPhase::Running, now, Some(now)),
            AdmissionDecision::Stop
        );
    }

    #[test]
    fn setup_phase_time_limit_includes_grace_period() {
        let mut stop = StopPredicate::new(Some(Duration::from_secs(1)), true);
        let program_start = Instant::now() - Duration::from_secs(3);
        // 3s elapsed < 1s + 5s grace, so setup is still allowed to continue.
        assert_eq!(
            stop.decide(false, RunPhase::Setup, program_start, None),
            AdmissionDecision::Admit
        );
    }

    #[test]
    fn running_phase_time_limit_has_no_grace() {
        let mut stop = StopPredicate::new(Some(Duration::from_secs(1)), true);
        let program_start = Instant::now() - Duration::from_secs(10);
        let first_query_at = Instant::now() - Duration::from_secs(2);
        assert_eq!(
            stop.decide(false, RunPhase::Running, program_start, Some(first_query_at)),
            AdmissionDecision::Stop
        );
    }
}
