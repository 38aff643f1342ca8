//! New-run delta detection.
//!
//! Compares the persisted watermark for an instrument against the run
//! number currently reported by the instrument and produces the set of
//! runs that have not been reported downstream yet.

/// A contiguous, half-open range of new run numbers.
///
/// `start_run` is the first unreported run, `end_run_exclusive` is one
/// past the last. The range is never empty; "nothing new" is represented
/// by `RunRange::between` returning `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRange {
    /// First run to report.
    pub start_run: u64,
    /// One past the last run to report.
    pub end_run_exclusive: u64,
}

impl RunRange {
    /// Compute the range of runs that appeared since `last_known`.
    ///
    /// Returns `None` when `current <= last_known`. A regressed current
    /// run (instrument counter reset) is treated the same as "no new
    /// runs" rather than producing a negative-length range.
    pub fn between(last_known: u64, current: u64) -> Option<RunRange> {
        if current <= last_known {
            return None;
        }
        Some(RunRange {
            start_run: last_known + 1,
            end_run_exclusive: current + 1,
        })
    }

    /// Number of runs covered by this range.
    pub fn len(&self) -> u64 {
        self.end_run_exclusive - self.start_run
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the run numbers in this range.
    pub fn runs(&self) -> impl Iterator<Item = u64> {
        self.start_run..self.end_run_exclusive
    }
}

impl std::fmt::Display for RunRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start_run, self.end_run_exclusive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_new_runs_when_equal() {
        assert_eq!(RunRange::between(44733, 44733), None);
    }

    #[test]
    fn test_no_new_runs_when_regressed() {
        // Instrument counter reset must not produce a negative range.
        assert_eq!(RunRange::between(44733, 12), None);
        assert_eq!(RunRange::between(1, 0), None);
    }

    #[test]
    fn test_single_new_run() {
        let range = RunRange::between(44733, 44734).unwrap();
        assert_eq!(range.start_run, 44734);
        assert_eq!(range.end_run_exclusive, 44735);
        assert_eq!(range.len(), 1);
        assert_eq!(range.runs().collect::<Vec<_>>(), vec![44734]);
    }

    #[test]
    fn test_multiple_new_runs() {
        let range = RunRange::between(100, 105).unwrap();
        assert_eq!(range.len(), 5);
        assert_eq!(
            range.runs().collect::<Vec<_>>(),
            vec![101, 102, 103, 104, 105]
        );
    }

    #[test]
    fn test_run_count_matches_delta() {
        for (last, current) in [(0u64, 1u64), (10, 13), (44733, 44800)] {
            let range = RunRange::between(last, current).unwrap();
            assert_eq!(range.len(), current - last);
        }
    }

    #[test]
    fn test_from_zero_watermark() {
        let range = RunRange::between(0, 2).unwrap();
        assert_eq!(range.runs().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_display() {
        let range = RunRange::between(44733, 44734).unwrap();
        assert_eq!(range.to_string(), "[44734, 44735)");
    }
}
