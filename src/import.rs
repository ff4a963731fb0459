//! # Chat Export Ingestion
//!
//! Reads the JSON a browser extension saves for a ChatGPT conversation and
//! turns it into [`Chat`]s of question/answer pairs. Also hosts the turn
//! helpers used before an export: text cleanup, HTML fallback, validation,
//! filtering, sorting and statistics.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FolioError;
use crate::model::{Chat, ChatPair};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static LINE_BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportMeta {
    pub timestamp: String,
    pub url: String,
    pub title: String,
}

/// One message of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Turn {
    pub id: String,
    /// `"user"` or `"assistant"`; other roles are carried but never paired.
    pub role: String,
    pub model: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// RFC 3339 timestamp, possibly empty.
    pub date: String,
}

impl Turn {
    fn parsed_date(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date).ok()
    }
}

/// One saved conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatExport {
    pub meta: ExportMeta,
    pub turns: Vec<Turn>,
}

/// A saved file holds either one conversation or an array of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExportInput {
    Many(Vec<ChatExport>),
    One(ChatExport),
}

impl ExportInput {
    pub fn into_exports(self) -> Vec<ChatExport> {
        match self {
            Self::Many(exports) => exports,
            Self::One(export) => vec![export],
        }
    }
}

/// Parse a saved file into its conversations.
pub fn parse_exports(json: &str) -> Result<Vec<ChatExport>, FolioError> {
    let input: ExportInput = serde_json::from_str(json)?;
    Ok(input.into_exports())
}

/// Pair every `user` turn with the next `assistant` turn.
///
/// A user turn followed by another user turn is replaced by it. Assistant
/// turns without a pending question are skipped. Conversations that yield
/// no pair are dropped.
pub fn convert_exports(exports: &[ChatExport]) -> Vec<Chat> {
    exports
        .iter()
        .filter_map(|export| {
            let chat_id = format!("chat-{}", uuid::Uuid::new_v4().simple());
            let mut pairs = Vec::new();
            let mut question: Option<&str> = None;

            for turn in &export.turns {
                match turn.role.as_str() {
                    "user" => question = Some(turn.text.as_str()).filter(|q| !q.is_empty()),
                    "assistant" => {
                        if let Some(q) = question.take() {
                            pairs.push(ChatPair {
                                id: format!("{}-{}", chat_id, pairs.len() + 1),
                                question: q.to_string(),
                                answer: answer_text(turn),
                                selected: false,
                                question_reason: None,
                                answer_evaluation: None,
                                model: Some(turn.model.clone()).filter(|m| !m.is_empty()),
                            });
                        }
                    }
                    _ => {}
                }
            }

            if pairs.is_empty() {
                debug!(title = %export.meta.title, "conversation has no question/answer pair");
                return None;
            }

            let title = if export.meta.title.trim().is_empty() {
                format!("Chat {}", Local::now().format("%d.%m.%Y, %H:%M:%S"))
            } else {
                export.meta.title.clone()
            };
            Some(Chat { id: chat_id, title, pairs })
        })
        .collect()
}

fn answer_text(turn: &Turn) -> String {
    match &turn.html {
        Some(html) if turn.text.is_empty() => extract_text_from_html(html),
        _ => turn.text.clone(),
    }
}

/// Collapse every run of whitespace (line breaks and tabs included) to a
/// single space and trim the ends.
pub fn sanitize_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Strip tags from an HTML fragment. `<br>` and `</p>` become spaces and
/// the common entities are decoded before the result is sanitized.
pub fn extract_text_from_html(html: &str) -> String {
    let spaced = LINE_BREAK_TAG.replace_all(html, " ");
    let stripped = ANY_TAG.replace_all(&spaced, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    sanitize_text(&decoded)
}

/// The turn as it goes into an export: HTML fallback for empty text,
/// sanitized text, and the current time when the date is missing.
pub fn prepare_turn(turn: &Turn) -> Turn {
    let mut prepared = turn.clone();
    prepared.text = sanitize_text(&answer_text(turn));
    if prepared.date.is_empty() {
        prepared.date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    prepared
}

/// Findings of [`validate_turns`], one message per invalid turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validation {
    pub errors: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check that every turn has an id and a role, and that a present date is
/// RFC 3339.
pub fn validate_turns(turns: &[Turn]) -> Validation {
    let mut errors = Vec::new();
    for (index, turn) in turns.iter().enumerate() {
        let problem = if turn.id.is_empty() {
            Some("missing id")
        } else if turn.role.is_empty() {
            Some("missing role")
        } else if !turn.date.is_empty() && turn.parsed_date().is_none() {
            Some("date is not RFC 3339")
        } else {
            None
        };
        if let Some(problem) = problem {
            warn!(index, problem, "invalid turn");
            errors.push(format!("turn at index {} is invalid: {}", index, problem));
        }
    }
    Validation { errors }
}

/// Which turns to keep. Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub role: Option<String>,
    pub model: Option<String>,
    pub date_from: Option<DateTime<FixedOffset>>,
    pub date_to: Option<DateTime<FixedOffset>>,
}

/// Keep the turns matching `criteria`. With a date bound set, turns whose
/// date does not parse are dropped.
pub fn filter_turns(turns: &[Turn], criteria: &FilterCriteria) -> Vec<Turn> {
    turns
        .iter()
        .filter(|turn| criteria.role.as_ref().is_none_or(|role| &turn.role == role))
        .filter(|turn| criteria.model.as_ref().is_none_or(|model| &turn.model == model))
        .filter(|turn| {
            if criteria.date_from.is_none() && criteria.date_to.is_none() {
                return true;
            }
            let Some(date) = turn.parsed_date() else {
                return false;
            };
            criteria.date_from.is_none_or(|from| date >= from) && criteria.date_to.is_none_or(|to| date <= to)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Turns ordered by date. Undated turns sort first; ties keep their order.
pub fn sort_turns(turns: &[Turn], order: SortOrder) -> Vec<Turn> {
    let mut sorted = turns.to_vec();
    sorted.sort_by_key(|turn| turn.parsed_date());
    if order == SortOrder::Descending {
        sorted.reverse();
    }
    sorted
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_turns: usize,
    pub by_role: BTreeMap<String, usize>,
    pub by_model: BTreeMap<String, usize>,
    /// In characters.
    pub total_text_length: usize,
    /// Rounded to the nearest character.
    pub average_text_length: usize,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

/// Counts and date range over `turns`. Turns without a model are not
/// counted per model; undated turns do not move the date range.
pub fn statistics(turns: &[Turn]) -> Statistics {
    let mut stats = Statistics {
        total_turns: turns.len(),
        ..Default::default()
    };
    let mut earliest: Option<(DateTime<FixedOffset>, &str)> = None;
    let mut latest: Option<(DateTime<FixedOffset>, &str)> = None;

    for turn in turns {
        *stats.by_role.entry(turn.role.clone()).or_default() += 1;
        if !turn.model.is_empty() {
            *stats.by_model.entry(turn.model.clone()).or_default() += 1;
        }
        stats.total_text_length += turn.text.chars().count();

        if let Some(date) = turn.parsed_date() {
            if earliest.is_none_or(|(e, _)| date < e) {
                earliest = Some((date, &turn.date));
            }
            if latest.is_none_or(|(l, _)| date > l) {
                latest = Some((date, &turn.date));
            }
        }
    }

    if stats.total_turns > 0 {
        stats.average_text_length =
            (stats.total_text_length as f64 / stats.total_turns as f64).round() as usize;
    }
    stats.earliest = earliest.map(|(_, raw)| raw.to_string());
    stats.latest = latest.map(|(_, raw)| raw.to_string());
    stats
}
