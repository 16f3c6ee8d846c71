//! Parsing of participant replies: confirmations, numbered selections,
//! planning scores, and the execution-stage free-text answer.

use crate::error::TurnError;
use crate::matcher::{MatchCandidate, Matcher, contains_phrase, normalize};
use crate::sessions::SCORE_MAX;
use once_cell::sync::Lazy;
use regex::Regex;

const AFFIRMATIVES: &[&str] = &[
    "yes",
    "y",
    "yeah",
    "yep",
    "yup",
    "correct",
    "right",
    "that's right",
    "thats right",
    "sure",
    "ok",
    "okay",
];

const REJECTIONS: &[&str] = &[
    "no",
    "n",
    "nope",
    "wrong",
    "incorrect",
    "none",
    "neither",
    "none of these",
    "none of them",
    "not listed",
    "0",
];

/// Minimum Jaro-Winkler similarity for a typed option name to count as a pick.
const NAME_SIMILARITY_FLOOR: f64 = 0.92;

static SIGNED_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?\d+").expect("integer regex should compile"));

static TIMELINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|eighteen|few|couple\s+of)
          (\s*(-|to)\s*\d+)?\s*(day|week|month|quarter|year)s?\b
        | \bq[1-4]\b
        | \b(by|end\s+of|within|until|before|during|in)\s+(the\s+)?(next\s+|this\s+)?
          (\d{4}|year|month|quarter|spring|summer|autumn|winter|january|february|march|april|may|june|july|august|september|october|november|december)\b
        ",
    )
    .expect("timeline regex should compile")
});

/// Matched as whole words, so "unresolved" or "explanation" do not count.
const PLAN_MARKERS: &[&str] = &[
    "plan",
    "plans",
    "planned",
    "planning",
    "we will",
    "we'll",
    "we are going to",
    "we're going to",
    "roll out",
    "rolling out",
    "implement",
    "resolve",
    "roadmap",
    "intend",
    "next step",
];

/// Outcome of a reply to a confirmation or disambiguation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the offered candidates.
    Chosen(usize),
    Rejected,
    Unclear,
}

fn strip_trailing_punct(s: &str) -> &str {
    s.trim_end_matches(['.', '!', ',', '?'])
}

pub fn is_affirmative(reply: &str) -> bool {
    let text = normalize(reply);
    AFFIRMATIVES.contains(&strip_trailing_punct(&text))
}

pub fn is_rejection(reply: &str) -> bool {
    let text = normalize(reply);
    REJECTIONS.contains(&strip_trailing_punct(&text))
}

/// Interpret a reply against the offered candidates.
///
/// Order: explicit rejection, yes for a lone candidate, option number, option
/// name (exact or close spelling), then a keyword that points at exactly one
/// offered option.
pub fn parse_selection(reply: &str, offered: &[MatchCandidate], matcher: &Matcher) -> Selection {
    let normalized = normalize(reply);
    let text = strip_trailing_punct(&normalized);
    if text.is_empty() || offered.is_empty() {
        return Selection::Unclear;
    }
    if is_rejection(text) {
        return Selection::Rejected;
    }
    if offered.len() == 1 && is_affirmative(text) {
        return Selection::Chosen(0);
    }

    let numeric = text
        .trim_start_matches('#')
        .trim_start_matches("option")
        .trim_start_matches("number")
        .trim();
    if let Ok(n) = numeric.parse::<usize>() {
        return if (1..=offered.len()).contains(&n) {
            Selection::Chosen(n - 1)
        } else {
            Selection::Unclear
        };
    }

    if let Some(i) = offered.iter().position(|c| normalize(c.name()) == text) {
        return Selection::Chosen(i);
    }

    let closest = offered
        .iter()
        .enumerate()
        .map(|(i, c)| (i, strsim::jaro_winkler(text, &normalize(c.name()))))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    if let Some((i, sim)) = closest
        && sim >= NAME_SIMILARITY_FLOOR
    {
        return Selection::Chosen(i);
    }

    let keyword_hits: Vec<usize> = offered
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.category
                .keywords
                .iter()
                .any(|kw| matcher.keyword_present(text, kw))
        })
        .map(|(i, _)| i)
        .collect();
    if let [only] = keyword_hits.as_slice() {
        return Selection::Chosen(*only);
    }

    Selection::Unclear
}

/// Read a planning score: a bare integer, or the first signed integer in the reply.
pub fn parse_score(reply: &str) -> Result<u8, TurnError> {
    let out_of_range = || TurnError::OutOfRange {
        constraint: format!("planning score must be a whole number from 0 to {SCORE_MAX}"),
    };

    let found = SIGNED_INT.find(reply.trim()).ok_or_else(out_of_range)?;
    let value: i64 = found.as_str().parse().map_err(|_| out_of_range())?;
    if (0..=SCORE_MAX as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(out_of_range())
    }
}

/// The three parts an execution-stage answer is asked to cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionParts {
    pub detail: String,
    pub resolution_plan: String,
    pub timeline: String,
}

fn sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(['.', '!', '?', ';', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split one execution-stage answer into challenge detail, resolution plan and
/// timeline. A sentence can feed both plan and timeline; a part with no
/// sentences of its own falls back to the whole answer.
pub fn segment_execution_answer(answer: &str) -> ExecutionParts {
    let whole = answer.trim();
    let mut detail = Vec::new();
    let mut plan = Vec::new();
    let mut timeline = Vec::new();

    for sentence in sentences(whole) {
        let lower = sentence.to_lowercase();
        let is_timeline = TIMELINE.is_match(&lower);
        let is_plan = PLAN_MARKERS.iter().any(|m| contains_phrase(&lower, m));
        if is_timeline {
            timeline.push(sentence);
        }
        if is_plan {
            plan.push(sentence);
        }
        if !is_timeline && !is_plan {
            detail.push(sentence);
        }
    }

    let join_or_whole = |parts: Vec<&str>| {
        if parts.is_empty() {
            whole.to_string()
        } else {
            parts.join(" ")
        }
    };

    ExecutionParts {
        detail: join_or_whole(detail),
        resolution_plan: join_or_whole(plan),
        timeline: join_or_whole(timeline),
    }
}
