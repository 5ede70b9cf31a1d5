//! Typed values for the string-backed status and enum columns

use serde::{Deserialize, Serialize};

/// Lifecycle status of a contact submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    New,
    Read,
    Replied,
    Archived,
    Spam,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::New => "new",
            SubmissionStatus::Read => "read",
            SubmissionStatus::Replied => "replied",
            SubmissionStatus::Archived => "archived",
            SubmissionStatus::Spam => "spam",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(SubmissionStatus::New),
            "read" => Some(SubmissionStatus::Read),
            "replied" => Some(SubmissionStatus::Replied),
            "archived" => Some(SubmissionStatus::Archived),
            "spam" => Some(SubmissionStatus::Spam),
            _ => None,
        }
    }

    /// Whether a moderation action may move a submission from `self` to `to`.
    ///
    /// Transitions only move forward: `new` may become anything, `read` may
    /// become replied/archived/spam, and every state may be marked spam.
    /// Terminal states never revert to `new`.
    pub fn can_transition_to(&self, to: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        match (self, to) {
            (_, Spam) => true,
            (New, Read) | (New, Replied) | (New, Archived) => true,
            (Read, Replied) | (Read, Archived) => true,
            (Replied, Archived) => true,
            (a, b) => *a == b,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind tag for a configured spam pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Keyword,
    Email,
    Url,
    Ip,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Keyword => "keyword",
            PatternType::Email => "email",
            PatternType::Url => "url",
            PatternType::Ip => "ip",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "keyword" => Some(PatternType::Keyword),
            "email" => Some(PatternType::Email),
            "url" => Some(PatternType::Url),
            "ip" => Some(PatternType::Ip),
            _ => None,
        }
    }
}

/// Why an IP was added to the block list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockReason {
    Spam,
    Abuse,
    Manual,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Spam => "spam",
            BlockReason::Abuse => "abuse",
            BlockReason::Manual => "manual",
        }
    }
}

/// Lifecycle status of an email queue row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Processing => "processing",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EmailStatus::Pending),
            "processing" => Some(EmailStatus::Processing),
            "sent" => Some(EmailStatus::Sent),
            "failed" => Some(EmailStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a configured recipient wants to be notified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPreference {
    Immediate,
    Digest,
}

impl NotificationPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPreference::Immediate => "immediate",
            NotificationPreference::Digest => "digest",
        }
    }
}

/// Submission language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ar,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Ar => "ar",
            Language::En => "en",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ar" => Some(Language::Ar),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_status_round_trip() {
        for status in [
            SubmissionStatus::New,
            SubmissionStatus::Read,
            SubmissionStatus::Replied,
            SubmissionStatus::Archived,
            SubmissionStatus::Spam,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubmissionStatus::parse("bogus"), None);
    }

    #[test]
    fn test_transitions_move_forward_only() {
        use SubmissionStatus::*;
        assert!(New.can_transition_to(Read));
        assert!(Read.can_transition_to(Replied));
        assert!(Archived.can_transition_to(Spam));
        assert!(!Read.can_transition_to(New));
        assert!(!Spam.can_transition_to(Read));
        assert!(!Archived.can_transition_to(Replied));
    }

    #[test]
    fn test_every_state_reaches_spam() {
        use SubmissionStatus::*;
        for status in [New, Read, Replied, Archived, Spam] {
            assert!(status.can_transition_to(Spam));
        }
    }
}
