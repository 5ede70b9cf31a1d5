//! Weighted spam scoring against configured patterns
//!
//! Scoring is deterministic and side-effect free: load the active
//! patterns, fold them into typed matchers, sum the weights of the ones
//! that hit, add the two heuristics, compare against the threshold.

use std::sync::Arc;

use mailroom_entities::{spam_patterns, PatternType};
use regex::{Regex, RegexBuilder};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, warn};

use crate::errors::ContactError;

/// Score at or above which a submission is classified as spam
pub const SPAM_SCORE_THRESHOLD: i32 = 5;

/// Penalty added when the message carries more than this many URLs
const URL_COUNT_THRESHOLD: usize = 3;
const URL_PENALTY: i32 = 2;

/// Penalty added when the message is shorter than this many characters
const SHORT_MESSAGE_LEN: usize = 10;
const SHORT_MESSAGE_PENALTY: i32 = 1;

/// The fields of a submission the scorer looks at
#[derive(Debug, Clone)]
pub struct SubmissionInput<'a> {
    pub email: &'a str,
    pub message: &'a str,
    pub ip_address: &'a str,
}

/// One configured pattern, compiled into its type-specific matcher
pub enum PatternKind {
    /// Case-insensitive substring match against the message body
    Keyword(String),
    /// Case-insensitive substring match against the submitted email
    Email(String),
    /// Case-insensitive regex (escaped) match against the message body
    Url(Regex),
    /// Exact match against the submitter's IP
    Ip(String),
}

impl PatternKind {
    fn compile(pattern_type: PatternType, pattern: &str) -> Option<Self> {
        match pattern_type {
            PatternType::Keyword => Some(PatternKind::Keyword(pattern.to_lowercase())),
            PatternType::Email => Some(PatternKind::Email(pattern.to_lowercase())),
            PatternType::Url => RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .ok()
                .map(PatternKind::Url),
            PatternType::Ip => Some(PatternKind::Ip(pattern.to_string())),
        }
    }

    fn matches(&self, input: &SubmissionInput<'_>) -> bool {
        match self {
            PatternKind::Keyword(needle) => input.message.to_lowercase().contains(needle),
            PatternKind::Email(needle) => input.email.to_lowercase().contains(needle),
            PatternKind::Url(regex) => regex.is_match(input.message),
            PatternKind::Ip(ip) => input.ip_address == ip,
        }
    }
}

/// A compiled pattern with its score weight
pub struct CompiledPattern {
    pub kind: PatternKind,
    pub weight: i32,
}

impl CompiledPattern {
    pub fn from_model(model: &spam_patterns::Model) -> Option<Self> {
        let pattern_type = match PatternType::parse(&model.pattern_type) {
            Some(t) => t,
            None => {
                warn!(
                    "Spam pattern {} has unknown type '{}', skipping",
                    model.id, model.pattern_type
                );
                return None;
            }
        };

        PatternKind::compile(pattern_type, &model.pattern).map(|kind| CompiledPattern {
            kind,
            weight: model.weight,
        })
    }
}

/// Count URL-like substrings in a message
fn count_urls(message: &str) -> usize {
    let lowered = message.to_lowercase();
    ["http://", "https://", "www."]
        .iter()
        .map(|marker| lowered.matches(marker).count())
        .sum()
}

/// Compute the spam score for one submission against a pattern set.
///
/// Pure function so the classification decision can be unit-tested with
/// constructed pattern sets.
pub fn score(input: &SubmissionInput<'_>, patterns: &[CompiledPattern]) -> i32 {
    let mut total = 0;

    for pattern in patterns {
        if pattern.kind.matches(input) {
            total += pattern.weight;
        }
    }

    if count_urls(input.message) > URL_COUNT_THRESHOLD {
        total += URL_PENALTY;
    }

    if input.message.chars().count() < SHORT_MESSAGE_LEN {
        total += SHORT_MESSAGE_PENALTY;
    }

    total
}

/// Loads active patterns and classifies submissions
pub struct SpamScorer {
    db: Arc<DatabaseConnection>,
}

impl SpamScorer {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Load and compile all active patterns
    pub async fn load_patterns(&self) -> Result<Vec<CompiledPattern>, ContactError> {
        let models = spam_patterns::Entity::find()
            .filter(spam_patterns::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await?;

        let patterns: Vec<CompiledPattern> = models
            .iter()
            .filter_map(CompiledPattern::from_model)
            .collect();

        debug!("Loaded {} active spam patterns", patterns.len());
        Ok(patterns)
    }

    /// Score a submission against the currently active pattern set
    pub async fn score(&self, input: &SubmissionInput<'_>) -> Result<i32, ContactError> {
        let patterns = self.load_patterns().await?;
        Ok(score(input, &patterns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(pattern: &str, weight: i32) -> CompiledPattern {
        CompiledPattern {
            kind: PatternKind::compile(PatternType::Keyword, pattern).unwrap(),
            weight,
        }
    }

    fn input<'a>(message: &'a str) -> SubmissionInput<'a> {
        SubmissionInput {
            email: "sender@example.com",
            message,
            ip_address: "203.0.113.7",
        }
    }

    #[test]
    fn test_clean_message_scores_zero() {
        let patterns = vec![keyword("casino", 3)];
        let result = score(&input("Hi, interested in your services"), &patterns);
        assert_eq!(result, 0);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let patterns = vec![keyword("casino", 3)];
        assert_eq!(score(&input("Visit my CASINO for great fun"), &patterns), 3);
    }

    #[test]
    fn test_email_pattern_matches_sender_address() {
        let patterns = vec![CompiledPattern {
            kind: PatternKind::compile(PatternType::Email, "@spammer.example").unwrap(),
            weight: 4,
        }];
        let submission = SubmissionInput {
            email: "bot@SPAMMER.example",
            message: "a perfectly normal message",
            ip_address: "203.0.113.7",
        };
        assert_eq!(score(&submission, &patterns), 4);
    }

    #[test]
    fn test_url_pattern_escapes_regex_metacharacters() {
        let patterns = vec![CompiledPattern {
            kind: PatternKind::compile(PatternType::Url, "evil.example/buy?x=1").unwrap(),
            weight: 5,
        }];
        assert_eq!(
            score(&input("go to evil.example/buy?x=1 right now"), &patterns),
            5
        );
        // The '?' must not act as a regex quantifier
        assert_eq!(score(&input("go to evil.example/buyx=1 now"), &patterns), 0);
    }

    #[test]
    fn test_ip_pattern_is_exact() {
        let patterns = vec![CompiledPattern {
            kind: PatternKind::compile(PatternType::Ip, "203.0.113.7").unwrap(),
            weight: 5,
        }];
        assert_eq!(score(&input("any normal message here"), &patterns), 5);

        let other = SubmissionInput {
            email: "sender@example.com",
            message: "any normal message here",
            ip_address: "203.0.113.70",
        };
        assert_eq!(score(&other, &patterns), 0);
    }

    #[test]
    fn test_url_count_heuristic() {
        // Four URLs, no configured patterns: heuristic penalty alone
        let message =
            "see http://a.example http://b.example http://c.example http://d.example now ok";
        assert_eq!(score(&input(message), &[]), URL_PENALTY);

        // Three URLs stay under the threshold
        let message = "see http://a.example http://b.example http://c.example thanks a lot";
        assert_eq!(score(&input(message), &[]), 0);
    }

    #[test]
    fn test_url_heuristic_plus_keyword_crosses_threshold() {
        // 4 URLs (+2) combined with one weight-3 keyword = 5 => spam
        let patterns = vec![keyword("prize", 3)];
        let message =
            "claim prize http://a.example http://b.example http://c.example http://d.example";
        let total = score(&input(message), &patterns);
        assert_eq!(total, 5);
        assert!(total >= SPAM_SCORE_THRESHOLD);
    }

    #[test]
    fn test_short_message_penalty() {
        assert_eq!(score(&input("hi"), &[]), SHORT_MESSAGE_PENALTY);
        assert_eq!(score(&input("a perfectly fine message"), &[]), 0);
    }

    #[test]
    fn test_weights_accumulate_across_patterns() {
        let patterns = vec![keyword("casino", 2), keyword("winner", 3)];
        let total = score(&input("casino winner casino"), &patterns);
        // Each pattern counts once regardless of repeated hits
        assert_eq!(total, 5);
    }

    #[test]
    fn test_threshold_constant() {
        assert_eq!(SPAM_SCORE_THRESHOLD, 5);
    }
}
