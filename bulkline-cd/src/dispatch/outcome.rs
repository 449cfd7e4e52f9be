//! Per-contact dispatch outcomes and campaign summaries

use serde::Serialize;

/// Terminal classification of one contact's send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Text send confirmed (attachment, if any, also delivered)
    Sent,
    /// Number failed normalization/validation
    Invalid,
    /// The platform explicitly signaled the number is not registered
    NotOnChannel,
    /// Text confirmed but the attachment protocol failed
    FileError,
    /// Attempt protocol failed (element waits, confirmation, retries spent)
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Sent => "sent",
            OutcomeStatus::Invalid => "invalid",
            OutcomeStatus::NotOnChannel => "not_on_channel",
            OutcomeStatus::FileError => "file_error",
            OutcomeStatus::Error => "error",
        }
    }
}

/// One contact's resolved outcome; owned by the dispatch loop until
/// handed to the aggregator
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    /// Normalized number, or the raw value when validation failed
    pub number: String,
    pub status: OutcomeStatus,
    /// Whole-protocol attempts consumed (0 when the UI was never driven)
    pub attempts: u32,
    /// Short diagnostic for the last failure, when any
    pub last_error: Option<String>,
}

impl DispatchOutcome {
    pub fn new(number: impl Into<String>, status: OutcomeStatus) -> Self {
        Self {
            number: number.into(),
            status,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_error(mut self, diagnostic: impl Into<String>) -> Self {
        self.last_error = Some(diagnostic.into());
        self
    }
}

/// Aggregated counts for a finished (or aborted) run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub sent: usize,
    pub invalid: usize,
    pub not_on_channel: usize,
    pub file_error: usize,
    pub error: usize,
    /// True when the loop stopped on a cancellation request
    pub cancelled: bool,
}

impl DispatchSummary {
    /// Tally outcomes in arrival order
    pub fn tally(outcomes: &[DispatchOutcome], cancelled: bool) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            sent: 0,
            invalid: 0,
            not_on_channel: 0,
            file_error: 0,
            error: 0,
            cancelled,
        };
        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Sent => summary.sent += 1,
                OutcomeStatus::Invalid => summary.invalid += 1,
                OutcomeStatus::NotOnChannel => summary.not_on_channel += 1,
                OutcomeStatus::FileError => summary.file_error += 1,
                OutcomeStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Sent count for the campaign record. A confirmed text whose
    /// attachment failed still received the text portion; whether it
    /// counts is a policy choice.
    pub fn sent_count(&self, count_file_error_as_sent: bool) -> usize {
        if count_file_error_as_sent {
            self.sent + self.file_error
        } else {
            self.sent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_every_disposition() {
        let outcomes = vec![
            DispatchOutcome::new("911111111111", OutcomeStatus::Sent),
            DispatchOutcome::new("bad", OutcomeStatus::Invalid),
            DispatchOutcome::new("912222222222", OutcomeStatus::NotOnChannel),
            DispatchOutcome::new("913333333333", OutcomeStatus::FileError),
            DispatchOutcome::new("914444444444", OutcomeStatus::Error).with_attempts(3),
        ];
        let summary = DispatchSummary::tally(&outcomes, false);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.not_on_channel, 1);
        assert_eq!(summary.file_error, 1);
        assert_eq!(summary.error, 1);
        assert!(!summary.cancelled);
    }

    #[test]
    fn sent_count_policy_controls_file_error() {
        let outcomes = vec![
            DispatchOutcome::new("911111111111", OutcomeStatus::Sent),
            DispatchOutcome::new("913333333333", OutcomeStatus::FileError),
        ];
        let summary = DispatchSummary::tally(&outcomes, false);
        assert_eq!(summary.sent_count(true), 2);
        assert_eq!(summary.sent_count(false), 1);
    }
}
