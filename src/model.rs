//! # Records and Chats
//!
//! The input side of an export. A [`Chat`] holds question/answer pairs the
//! user curates; each selected [`ChatPair`] becomes one [`Record`], the
//! immutable unit the layout engine places into a table row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::FieldMapping;

/// One exportable unit: the four texts of a table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    /// The question as asked, with its export date.
    pub primary_text: String,
    /// Why the question was asked.
    pub rationale: String,
    /// How the answer was judged.
    pub evaluation: String,
    /// The model that answered.
    pub version_tag: String,
}

/// The four named fields of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    PrimaryText,
    Rationale,
    Evaluation,
    VersionTag,
}

impl Field {
    /// Bind a column name to a field. Accepts the shipped German headers
    /// and the English field names, case-insensitively.
    pub fn for_column(name: &str) -> Option<Field> {
        match name.trim().to_lowercase().as_str() {
            "anfrage" | "primarytext" | "request" | "question" => Some(Field::PrimaryText),
            "grund" | "rationale" | "reason" => Some(Field::Rationale),
            "bewertung" | "evaluation" => Some(Field::Evaluation),
            "version" | "versiontag" | "model" => Some(Field::VersionTag),
            _ => None,
        }
    }
}

impl Record {
    pub fn new(primary_text: &str, rationale: &str, evaluation: &str, version_tag: &str) -> Self {
        Self {
            primary_text: primary_text.to_string(),
            rationale: rationale.to_string(),
            evaluation: evaluation.to_string(),
            version_tag: version_tag.to_string(),
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::PrimaryText => &self.primary_text,
            Field::Rationale => &self.rationale,
            Field::Evaluation => &self.evaluation,
            Field::VersionTag => &self.version_tag,
        }
    }

    /// The text shown in a column. Columns not bound to a field are empty.
    pub fn column_text(&self, column_name: &str) -> &str {
        Field::for_column(column_name).map(|f| self.field(f)).unwrap_or("")
    }

    /// Build the export row for a chat pair.
    ///
    /// The question is stamped with `date`; an absent reason, evaluation or
    /// model becomes the mapping's placeholder.
    pub fn from_pair(pair: &ChatPair, date: NaiveDate, mapping: &FieldMapping) -> Self {
        let question = if pair.question.trim().is_empty() {
            mapping.empty_question.as_str()
        } else {
            pair.question.as_str()
        };
        let or_placeholder = |value: &Option<String>| match value {
            Some(v) if !v.trim().is_empty() => v.clone(),
            _ => mapping.placeholder.clone(),
        };

        Self {
            primary_text: format!("{} ({})", question, date.format(&mapping.date_format)),
            rationale: or_placeholder(&pair.question_reason),
            evaluation: or_placeholder(&pair.answer_evaluation),
            version_tag: or_placeholder(&pair.model),
        }
    }
}

/// A question with its answer and the user's annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPair {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_evaluation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub pairs: Vec<ChatPair>,
}
