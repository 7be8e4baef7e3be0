//! Exact-phrase classification of inbound replies to a rebooking outreach.

/// What a patient's reply means for their reminder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyIntent {
    OptOut,
    RebookConfirm,
    Unrecognized,
}

pub const OPT_OUT_PHRASES: [&str; 6] = [
    "stop",
    "no thanks",
    "no thank you",
    "not interested",
    "unsubscribe",
    // Bare "no" may also be a negative reply to something unrelated; kept as opt-out.
    "no",
];

pub const CONFIRM_PHRASES: [&str; 9] = [
    "yes",
    "yeah",
    "yep",
    "sure",
    "ok",
    "okay",
    "yes please",
    "book",
    "schedule",
];

impl ReplyIntent {
    /// Whole-message match after trim + lowercase. Anything else is never guessed.
    pub fn classify(body: &str) -> Self {
        let normalized = body.trim().to_lowercase();
        if OPT_OUT_PHRASES.contains(&normalized.as_str()) {
            ReplyIntent::OptOut
        } else if CONFIRM_PHRASES.contains(&normalized.as_str()) {
            ReplyIntent::RebookConfirm
        } else {
            ReplyIntent::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_out_phrases() {
        for body in ["stop", "STOP", " No Thanks ", "no", "not interested", "Unsubscribe"] {
            assert_eq!(ReplyIntent::classify(body), ReplyIntent::OptOut, "{body}");
        }
    }

    #[test]
    fn confirm_phrases() {
        for body in ["yes", "Yeah", "ok", "OKAY", "yes please", "schedule\n"] {
            assert_eq!(ReplyIntent::classify(body), ReplyIntent::RebookConfirm, "{body}");
        }
    }

    #[test]
    fn only_whole_message_matches() {
        for body in ["yes I guess", "stop it", "hello", "", "nope", "book me in"] {
            assert_eq!(ReplyIntent::classify(body), ReplyIntent::Unrecognized, "{body}");
        }
    }

    #[test]
    fn phrase_sets_do_not_overlap() {
        for p in OPT_OUT_PHRASES {
            assert!(!CONFIRM_PHRASES.contains(&p), "{p}");
        }
    }
}
