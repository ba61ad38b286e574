//! Heuristic extraction from free-text model responses
//!
//! Every function here is a pure text transform: identical input always
//! yields identical output, and nothing is cached between calls.
//!
//! # Design Philosophy
//!
//! Extraction is best-effort and deliberately shallow:
//! - Patterns live in ordered tables so each one can be audited and tested alone
//! - The first matching rule wins; later rules are never consulted
//! - Missing signals fall back to fixed defaults instead of failing
//!
//! Pattern matching runs over the lowercased response so `Confidence: 8`
//! and `confidence: 8` are the same signal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Confidence reported when no pattern matches.
pub const DEFAULT_CONFIDENCE: u8 = 5;
pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 10;

/// Description lines kept before truncation.
pub const DESCRIPTION_MAX_LINES: usize = 20;
/// Description length cap, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Confidence patterns in priority order. Capture group 1 is the number.
static CONFIDENCE_PATTERNS: Lazy<[(&str, Regex); 3]> = Lazy::new(|| {
    [
        (
            "confidence",
            Regex::new(r"confidence[:\s]+([0-9]+)").expect("valid confidence regex"),
        ),
        (
            "out_of_ten",
            Regex::new(r"([0-9]+)[\s/]*10").expect("valid out-of-ten regex"),
        ),
        (
            "likelihood",
            Regex::new(r"likelihood[:\s]+([0-9]+)").expect("valid likelihood regex"),
        ),
    ]
});

/// Any fenced block, whatever its language tag. Capture group 1 is the body.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n`]*\n(.*?)```").expect("valid fenced block regex"));

/// Labels for the approach a response argues for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approach {
    SenderIdFix,
    DispatchFix,
    QueueFix,
    AlternativeMethod,
    Unknown,
}

impl Approach {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SenderIdFix => "sender_id_fix",
            Self::DispatchFix => "dispatch_fix",
            Self::QueueFix => "queue_fix",
            Self::AlternativeMethod => "alternative_method",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trigger phrases in priority order.
const APPROACH_TRIGGERS: [(&str, Approach); 4] = [
    ("sender id", Approach::SenderIdFix),
    ("dispatch", Approach::DispatchFix),
    ("queue", Approach::QueueFix),
    ("alternative", Approach::AlternativeMethod),
];

/// How a bulleted list is harvested from a response.
///
/// With no triggers every bullet in the text is eligible. Otherwise
/// capture starts at the first line containing a trigger (that line
/// included) and stays on for the rest of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletRule {
    pub triggers: &'static [&'static str],
    /// Items must be strictly longer than this, in characters.
    pub min_len: usize,
    pub max_items: usize,
}

impl BulletRule {
    pub const INSIGHTS: Self = Self {
        triggers: &[],
        min_len: 10,
        max_items: 5,
    };

    pub const ISSUES: Self = Self {
        triggers: &["issue", "problem"],
        min_len: 10,
        max_items: 5,
    };

    pub const PROS: Self = Self {
        triggers: &["pro", "advantage"],
        min_len: 5,
        max_items: 3,
    };

    pub const CONS: Self = Self {
        triggers: &["con", "disadvantage"],
        min_len: 5,
        max_items: 3,
    };
}

/// Clamp a matched digit run into the confidence range.
///
/// Runs too long for `u64` are treated as large, so they clamp to the top.
fn clamp_confidence(digits: &str) -> u8 {
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    let clamped = value.clamp(u64::from(MIN_CONFIDENCE), u64::from(MAX_CONFIDENCE));
    u8::try_from(clamped).unwrap_or(MAX_CONFIDENCE)
}

/// Extract a 1-10 confidence rating.
///
/// Tries `confidence: N`, then `N/10`, then `likelihood: N`; the first
/// pattern that matches anywhere decides. Returns [`DEFAULT_CONFIDENCE`]
/// when none match.
#[must_use]
pub fn extract_confidence(text: &str) -> u8 {
    let lowered = text.to_lowercase();
    CONFIDENCE_PATTERNS
        .iter()
        .find_map(|(_, pattern)| pattern.captures(&lowered))
        .and_then(|caps| caps.get(1))
        .map_or(DEFAULT_CONFIDENCE, |m| clamp_confidence(m.as_str()))
}

/// Label the approach a response argues for. First trigger phrase found wins.
#[must_use]
pub fn extract_approach(text: &str) -> Approach {
    let lowered = text.to_lowercase();
    APPROACH_TRIGGERS
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map_or(Approach::Unknown, |(_, approach)| *approach)
}

/// Strip a `- ` or `* ` marker from a trimmed line.
fn bullet_body(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .map(str::trim)
}

/// Harvest bullet items according to `rule`, in document order.
#[must_use]
pub fn extract_bulleted(text: &str, rule: &BulletRule) -> Vec<String> {
    let mut items = Vec::new();
    let mut capturing = rule.triggers.is_empty();

    for line in text.lines() {
        if items.len() == rule.max_items {
            break;
        }

        if !capturing {
            let lowered = line.to_lowercase();
            capturing = rule.triggers.iter().any(|t| lowered.contains(t));
        }
        if !capturing {
            continue;
        }

        if let Some(body) = bullet_body(line)
            && body.chars().count() > rule.min_len
        {
            items.push(body.to_string());
        }
    }

    items
}

#[must_use]
pub fn extract_insights(text: &str) -> Vec<String> {
    extract_bulleted(text, &BulletRule::INSIGHTS)
}

#[must_use]
pub fn extract_issues(text: &str) -> Vec<String> {
    extract_bulleted(text, &BulletRule::ISSUES)
}

#[must_use]
pub fn extract_pros(text: &str) -> Vec<String> {
    extract_bulleted(text, &BulletRule::PROS)
}

#[must_use]
pub fn extract_cons(text: &str) -> Vec<String> {
    extract_bulleted(text, &BulletRule::CONS)
}

/// Whether the response contains a code fence at all.
#[must_use]
pub fn has_code(text: &str) -> bool {
    text.contains("```")
}

/// Concatenate the bodies of every fenced code block, separated by a blank
/// line. Returns an empty string when there are none.
#[must_use]
pub fn extract_code(text: &str) -> String {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prose summary of a response.
///
/// Keeps the first [`DESCRIPTION_MAX_LINES`] lines that do not start with a
/// fence or a heading marker, joins and trims them, then truncates to
/// [`DESCRIPTION_MAX_CHARS`] characters.
#[must_use]
pub fn extract_description(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !line.starts_with("```") && !line.starts_with('#'))
        .take(DESCRIPTION_MAX_LINES)
        .collect();

    kept.join("\n")
        .trim()
        .chars()
        .take(DESCRIPTION_MAX_CHARS)
        .collect()
}

/// Per-candidate ratings named in a critique.
///
/// Looks for `candidate {n}: {rating}` for each ordinal `1..=num_candidates`.
/// Ordinals without a match are absent from the map. Ratings are taken as
/// written; they are not clamped.
#[must_use]
pub fn extract_candidate_ratings(text: &str, num_candidates: usize) -> BTreeMap<usize, u32> {
    let lowered = text.to_lowercase();
    let mut ratings = BTreeMap::new();

    for ordinal in 1..=num_candidates {
        let Ok(pattern) = Regex::new(&format!(r"candidate\s*{ordinal}[:\s]+([0-9]+)")) else {
            continue;
        };
        if let Some(m) = pattern.captures(&lowered).and_then(|caps| caps.get(1)) {
            ratings.insert(ordinal, m.as_str().parse::<u32>().unwrap_or(u32::MAX));
        }
    }

    ratings
}
