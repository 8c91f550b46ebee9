use std::fmt;

/// A target whose response had exactly the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub number: u64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Status other than the expected one.
    Status(u16),
    /// Pattern seen fewer times than expected.
    NoMatch(usize),
}

/// What a worker hands to the collector; exactly one per target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Found(MatchResult),
    Ambiguous { target: u64, count: usize },
    Skipped { target: u64, reason: SkipReason },
    Failed { target: u64, error: String },
}

impl ProbeEvent {
    pub fn target(&self) -> u64 {
        match self {
            ProbeEvent::Found(m) => m.number,
            ProbeEvent::Ambiguous { target, .. }
            | ProbeEvent::Skipped { target, .. }
            | ProbeEvent::Failed { target, .. } => *target,
        }
    }

    /// Line printed while the run is in progress, if the event warrants one.
    pub fn progress_line(&self) -> Option<String> {
        match self {
            ProbeEvent::Found(m) => Some(format!("FOUND [{} {}]", m.number, m.label)),
            ProbeEvent::Ambiguous { target, .. } => Some(format!("NOT FOUND [{}]", target)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStats {
    pub attempted: usize,
    pub matched: usize,
    pub ambiguous: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Positive matches in completion order, plus what else happened.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub matches: Vec<MatchResult>,
    pub ambiguous: Vec<u64>,
    pub stats: ProbeStats,
}

impl Report {
    pub fn record(&mut self, event: ProbeEvent) {
        self.stats.attempted += 1;
        match event {
            ProbeEvent::Found(m) => {
                self.stats.matched += 1;
                self.matches.push(m);
            }
            ProbeEvent::Ambiguous { target, .. } => {
                self.stats.ambiguous += 1;
                self.ambiguous.push(target);
            }
            ProbeEvent::Skipped { .. } => self.stats.skipped += 1,
            ProbeEvent::Failed { .. } => self.stats.failed += 1,
        }
    }

    pub fn summary(&self) -> String {
        let s = &self.stats;
        format!(
            "{} probed | {} found | {} ambiguous | {} skipped | {} failed",
            s.attempted, s.matched, s.ambiguous, s.skipped, s.failed
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "✅ Final Working Endpoints:")?;
        for m in &self.matches {
            writeln!(f, "[{} {}]", m.number, m.label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_lines() {
        let found = ProbeEvent::Found(MatchResult { number: 3, label: "in Al Barsha".into() });
        assert_eq!(found.progress_line().as_deref(), Some("FOUND [3 in Al Barsha]"));
        let amb = ProbeEvent::Ambiguous { target: 7, count: 4 };
        assert_eq!(amb.progress_line().as_deref(), Some("NOT FOUND [7]"));
        let skip = ProbeEvent::Skipped { target: 1, reason: SkipReason::NoMatch(1) };
        assert!(skip.progress_line().is_none());
        assert_eq!(skip.target(), 1);
        assert_eq!(found.target(), 3);
    }

    #[test]
    fn report_keeps_completion_order() {
        let mut report = Report::default();
        report.record(ProbeEvent::Found(MatchResult { number: 5, label: "b".into() }));
        report.record(ProbeEvent::Failed { target: 4, error: "refused".into() });
        report.record(ProbeEvent::Found(MatchResult { number: 2, label: "a".into() }));

        let numbers: Vec<u64> = report.matches.iter().map(|m| m.number).collect();
        assert_eq!(numbers, vec![5, 2]);
        assert_eq!(report.stats.attempted, 3);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.to_string(), "✅ Final Working Endpoints:\n[5 b]\n[2 a]\n");
    }
}
