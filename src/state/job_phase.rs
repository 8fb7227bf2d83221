/// Job phase definitions for tracking crawl progress
///
/// This module defines every phase a crawl job passes through and the
/// transitions allowed between them.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Represents the current phase of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    // ===== Active Phases =====
    /// Job record created, engine not yet running
    Starting,

    /// Breadth-first URL discovery is running (0-80%)
    Discovering,

    /// Discovery finished, extraction not yet started
    DiscoveryDone,

    /// Content extraction is running (80-100%)
    Extracting,

    // ===== Terminal Phases =====
    /// Job completed, possibly with per-URL failures
    Done,

    /// A fatal error aborted the job
    Error,

    /// The job was cancelled by an external stop request
    Stopped,
}

impl JobPhase {
    /// Returns true if this is a terminal phase (the record is final)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Stopped)
    }

    /// Returns true if the job is still running
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether a job in this phase may move to `next`
    ///
    /// Repeating an active phase is allowed (it carries a new progress value).
    /// `Error` and `Stopped` are reachable from every active phase; nothing
    /// leaves a terminal phase.
    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        use JobPhase::*;

        if self.is_terminal() {
            return false;
        }

        if matches!(next, Error | Stopped) || *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Starting, Discovering)
                | (Discovering, DiscoveryDone)
                | (DiscoveryDone, Extracting)
                | (Extracting, Done)
        )
    }

    /// Converts the phase to the status string stored in progress records
    pub fn as_status(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Discovering => "discovering",
            Self::DiscoveryDone => "discovery done",
            Self::Extracting => "scraping",
            Self::Done => "done",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }

    /// Parses a phase from its status string
    ///
    /// Accepts `error: <message>` records written by older tooling as `Error`.
    pub fn from_status(s: &str) -> Option<Self> {
        match s {
            "starting" => Some(Self::Starting),
            "discovering" => Some(Self::Discovering),
            "discovery done" => Some(Self::DiscoveryDone),
            "scraping" | "extracting" => Some(Self::Extracting),
            "done" => Some(Self::Done),
            "stopped" => Some(Self::Stopped),
            s if s == "error" || s.starts_with("error:") => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all phases in lifecycle order
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Starting,
            Self::Discovering,
            Self::DiscoveryDone,
            Self::Extracting,
            Self::Done,
            Self::Error,
            Self::Stopped,
        ]
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_status())
    }
}

impl Serialize for JobPhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_status())
    }
}

impl<'de> Deserialize<'de> for JobPhase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let status = String::deserialize(deserializer)?;
        JobPhase::from_status(&status)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown job status '{}'", status)))
    }
}

/// Per-job URL counters
///
/// `done` counts every URL the extraction phase has settled, so
/// `done == success + failed + skipped` holds at every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub done: u64,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    /// Unchanged content skipped by hash match
    #[serde(default)]
    pub skipped: u64,
}

impl Counters {
    /// Creates zeroed counters for `total` URLs
    pub fn with_total(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self) {
        self.success += 1;
        self.done += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
        self.done += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
        self.done += 1;
    }

    /// Overall job progress during extraction: `80 + floor(done / total * 20)`
    pub fn extraction_progress(&self) -> u8 {
        if self.total == 0 {
            return 80;
        }
        let share = (self.done.min(self.total) * 20) / self.total;
        80 + share as u8
    }

    /// Returns true once every URL has been settled
    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!JobPhase::Starting.is_terminal());
        assert!(!JobPhase::Discovering.is_terminal());
        assert!(!JobPhase::DiscoveryDone.is_terminal());
        assert!(!JobPhase::Extracting.is_terminal());

        assert!(JobPhase::Done.is_terminal());
        assert!(JobPhase::Error.is_terminal());
        assert!(JobPhase::Stopped.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            JobPhase::Starting,
            JobPhase::Discovering,
            JobPhase::DiscoveryDone,
            JobPhase::Extracting,
            JobPhase::Done,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_error_and_stop_reachable_from_active() {
        for phase in JobPhase::all_phases().into_iter().filter(|p| p.is_active()) {
            assert!(phase.can_transition_to(JobPhase::Error));
            assert!(phase.can_transition_to(JobPhase::Stopped));
        }
    }

    #[test]
    fn test_terminal_phases_are_final() {
        for from in [JobPhase::Done, JobPhase::Error, JobPhase::Stopped] {
            for to in JobPhase::all_phases() {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_no_skipping_phases() {
        assert!(!JobPhase::Starting.can_transition_to(JobPhase::Extracting));
        assert!(!JobPhase::Discovering.can_transition_to(JobPhase::Done));
        assert!(!JobPhase::Extracting.can_transition_to(JobPhase::Discovering));
    }

    #[test]
    fn test_status_roundtrip() {
        for phase in JobPhase::all_phases() {
            assert_eq!(JobPhase::from_status(phase.as_status()), Some(phase));
        }
    }

    #[test]
    fn test_legacy_error_status() {
        assert_eq!(
            JobPhase::from_status("error: browser crashed"),
            Some(JobPhase::Error)
        );
        assert_eq!(JobPhase::from_status("bogus"), None);
    }

    #[test]
    fn test_serde_uses_status_string() {
        let json = serde_json::to_string(&JobPhase::DiscoveryDone).unwrap();
        assert_eq!(json, "\"discovery done\"");

        let parsed: JobPhase = serde_json::from_str("\"scraping\"").unwrap();
        assert_eq!(parsed, JobPhase::Extracting);

        assert!(serde_json::from_str::<JobPhase>("\"nope\"").is_err());
    }

    #[test]
    fn test_counters_accounting() {
        let mut counters = Counters::with_total(4);
        counters.record_success();
        counters.record_failure();
        counters.record_skip();

        assert_eq!(counters.done, 3);
        assert_eq!(
            counters.done,
            counters.success + counters.failed + counters.skipped
        );
        assert!(!counters.is_complete());

        counters.record_success();
        assert!(counters.is_complete());
    }

    #[test]
    fn test_extraction_progress() {
        let mut counters = Counters::with_total(3);
        assert_eq!(counters.extraction_progress(), 80);

        counters.record_success();
        assert_eq!(counters.extraction_progress(), 86);

        counters.record_success();
        counters.record_success();
        assert_eq!(counters.extraction_progress(), 100);
    }

    #[test]
    fn test_extraction_progress_empty() {
        assert_eq!(Counters::with_total(0).extraction_progress(), 80);
    }
}
