use std::time::Duration;

/// How long a "skipped" feedback message stays on screen
pub const SKIP_FEEDBACK_TTL: Duration = Duration::from_secs(1);
/// How long a "try again" feedback message stays on screen
pub const RETRY_FEEDBACK_TTL: Duration = Duration::from_secs(2);
/// How long a "+N" score popup stays on screen
pub const SCORE_POPUP_TTL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Feedback,
    ScorePopup,
}

/// Handle identifying one particular showing of a notice. A scheduled
/// clear carries the token it was issued for; if a newer notice of the
/// same kind has replaced it in the meantime, the clear is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticeToken {
    pub kind: NoticeKind,
    generation: u64,
}

/// A transient message together with the token and TTL the session
/// needs to schedule its expiry
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub token: NoticeToken,
    pub ttl: Duration,
}

/// Current transient display state. Generations are monotonic for the
/// lifetime of the engine, across restarts, so a timer armed before a
/// restart can never clear a message set after it.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    feedback: Option<String>,
    feedback_generation: u64,
    popup: Option<String>,
    popup_generation: u64,
}

impl NoticeBoard {
    /// Replace the current notice of `kind`, superseding any previous
    /// one of the same kind
    pub fn set(&mut self, kind: NoticeKind, text: String, ttl: Duration) -> Notice {
        let generation = match kind {
            NoticeKind::Feedback => {
                self.feedback_generation += 1;
                self.feedback = Some(text.clone());
                self.feedback_generation
            }
            NoticeKind::ScorePopup => {
                self.popup_generation += 1;
                self.popup = Some(text.clone());
                self.popup_generation
            }
        };

        Notice {
            text,
            token: NoticeToken { kind, generation },
            ttl,
        }
    }

    /// Clear the notice the token was issued for. Returns false when a
    /// newer notice has replaced it, in which case nothing is cleared.
    pub fn clear_if_current(&mut self, token: NoticeToken) -> bool {
        match token.kind {
            NoticeKind::Feedback => {
                if token.generation == self.feedback_generation && self.feedback.is_some() {
                    self.feedback = None;
                    return true;
                }
            }
            NoticeKind::ScorePopup => {
                if token.generation == self.popup_generation && self.popup.is_some() {
                    self.popup = None;
                    return true;
                }
            }
        }
        false
    }

    /// Drop any visible notices without resetting generations
    pub fn reset(&mut self) {
        self.feedback = None;
        self.popup = None;
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn score_popup(&self) -> Option<&str> {
        self.popup.as_deref()
    }
}
