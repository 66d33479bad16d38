// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-English messages for the person who submitted a message.
//
// Delivery failures are never retried automatically, so every message says
// whether sending again is worth it.

use crate::error::PrintboxError;
use crate::types::{FailureReason, JobReport};

/// A submitter-facing message with a suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanMessage {
    /// Short summary (shown as the flash line).
    pub message: String,
    /// What the submitter can do about it.
    pub suggestion: String,
    /// Whether resubmitting the same message may succeed.
    pub resubmit: bool,
}

impl HumanMessage {
    fn new(message: &str, suggestion: &str, resubmit: bool) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            resubmit,
        }
    }
}

/// Describe why a job did not print.
pub fn humanize_failure(reason: FailureReason) -> HumanMessage {
    match reason {
        FailureReason::Timeout => HumanMessage::new(
            "Connection timed out - is the printer bridge running?",
            "The printer may be off or asleep. Try again in a minute.",
            true,
        ),
        FailureReason::ConnectFailed => HumanMessage::new(
            "Connection refused - is the printer bridge running?",
            "The printer isn't accepting messages right now. Try again later.",
            true,
        ),
        FailureReason::WriteFailed => HumanMessage::new(
            "The printer hung up part-way through your message.",
            "It may have printed partially. Send it again if nothing came out.",
            true,
        ),
        FailureReason::NotDelivered => HumanMessage::new(
            "Your message wasn't printed before the printer went offline.",
            "Please send it again once the printer is back.",
            true,
        ),
    }
}

/// Describe a status report.
pub fn humanize_report(report: &JobReport) -> HumanMessage {
    match report {
        JobReport::Pending { position: 1 } => {
            HumanMessage::new("Your message is next in line.", "It will print shortly.", false)
        }
        JobReport::Pending { position } => HumanMessage {
            message: format!("{} messages ahead of you.", position.saturating_sub(1)),
            suggestion: "Hang tight, the printer takes a moment per message.".into(),
            resubmit: false,
        },
        JobReport::InProgress => {
            HumanMessage::new("Printing your message now...", "Nearly there.", false)
        }
        JobReport::Delivered { .. } => {
            HumanMessage::new("Message sent to printer!", "Thanks for writing.", false)
        }
        JobReport::Failed { reason, .. } => humanize_failure(*reason),
    }
}

/// Convert a `PrintboxError` into a `HumanMessage`.
pub fn humanize_error(err: &PrintboxError) -> HumanMessage {
    match err {
        PrintboxError::CapacityExceeded { .. } => HumanMessage::new(
            "The printer is busy with other messages.",
            "Wait a little while and send yours again.",
            true,
        ),
        PrintboxError::NotFound(_) => HumanMessage::new(
            "We couldn't find that message.",
            "It may have finished a while ago.",
            false,
        ),
        PrintboxError::ShuttingDown => HumanMessage::new(
            "The printer is going offline.",
            "Please try again later.",
            true,
        ),
        PrintboxError::Transport(t) => humanize_failure(t.kind.into()),
        PrintboxError::InvalidConfig(_)
        | PrintboxError::Worker(_)
        | PrintboxError::Io(_)
        | PrintboxError::Serialization(_) => HumanMessage::new(
            "Something went wrong on our side.",
            "Please try again later.",
            false,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn timeout_mentions_bridge() {
        let human = humanize_failure(FailureReason::Timeout);
        assert!(human.message.contains("timed out"));
        assert!(human.resubmit);
    }

    #[test]
    fn transport_error_maps_through_kind() {
        let err = PrintboxError::from(TransportError::connect("refused"));
        assert_eq!(humanize_error(&err), humanize_failure(FailureReason::ConnectFailed));
    }

    #[test]
    fn pending_position_counts_jobs_ahead() {
        let human = humanize_report(&JobReport::Pending { position: 4 });
        assert_eq!(human.message, "3 messages ahead of you.");
    }

    #[test]
    fn full_queue_invites_resubmission() {
        let human = humanize_error(&PrintboxError::CapacityExceeded { capacity: 10 });
        assert!(human.resubmit);
    }
}
