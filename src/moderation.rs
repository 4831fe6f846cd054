//! Text moderation applied before any content event is built.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Outcome of a moderation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
        }
    }

    /// Convert a rejection into [`Error::Moderation`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Verdict { allowed: true, .. } => Ok(()),
            Verdict { reason, .. } => Err(Error::Moderation(
                reason.unwrap_or_else(|| "rejected".into()),
            )),
        }
    }
}

const MIN_CHARS: usize = 3;
const MAX_CHAR_RUN: usize = 10;
const MAX_URLS: usize = 2;
const REPETITION_MIN_CHARS: usize = 50;
const REPETITION_MIN_WORDS: usize = 10;

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)https?://").expect("static url pattern"))
}

/// Check `text` against the community's spam heuristics.
pub fn moderate(text: &str) -> Verdict {
    if text.chars().count() < MIN_CHARS {
        return Verdict::reject("Content too short");
    }
    if text.chars().count() > REPETITION_MIN_CHARS && dominant_word(text) {
        return Verdict::reject("Excessive repetition detected");
    }
    if longest_char_run(text) > MAX_CHAR_RUN || url_count(text) > MAX_URLS {
        return Verdict::reject("Spam pattern detected");
    }
    Verdict::allow()
}

/// True when more than 10 words are present and one of them makes up more
/// than half of all words.
fn dominant_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() <= REPETITION_MIN_WORDS {
        return false;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in &words {
        *counts.entry(word).or_default() += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    max * 2 > words.len()
}

fn longest_char_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    let mut prev = None;
    for c in text.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        longest = longest.max(run);
    }
    longest
}

fn url_count(text: &str) -> usize {
    url_pattern().find_iter(text).count()
}
