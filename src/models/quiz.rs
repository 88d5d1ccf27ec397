// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single multiple-choice question.
///
/// The generation upstream emits the text under a `question` key; stored and
/// served records use `text`. `correct_answer` must be verbatim-equal to one
/// of the four `options` (enforced in the generator, see `Question::is_well_formed`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "question")]
    pub text: String,

    /// Exactly 4 answer options.
    pub options: Vec<String>,

    /// The exact text of the correct option.
    pub correct_answer: String,

    /// Optional explanation of why the correct answer is correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Shape postcondition for generated questions: 4 options, and the
    /// correct answer is one of them.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == 4 && self.options.iter().any(|o| o == &self.correct_answer)
    }
}

/// Difficulty levels accepted by the generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    /// Guidance text embedded in the generation prompt.
    pub fn guide(&self) -> &'static str {
        match self {
            Difficulty::Easy => {
                "straightforward questions with commonly known facts, suitable for beginners"
            }
            Difficulty::Medium => {
                "moderately challenging questions requiring good knowledge of the subject"
            }
            Difficulty::Hard => {
                "difficult questions that require extensive knowledge and some critical thinking"
            }
            Difficulty::Expert => {
                "extremely challenging questions only true experts would likely know"
            }
        }
    }
}

/// DTO for requesting quiz generation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    #[validate(length(min = 1, max = 100))]
    pub category: String,

    #[validate(range(min = 5, max = 20))]
    pub question_count: u32,

    pub difficulty: Difficulty,

    /// Free-text topic the questions must focus on.
    #[validate(length(min = 1, max = 500))]
    pub topics: String,

    #[serde(default)]
    pub include_explanations: bool,

    /// Countdown budget in minutes, echoed into the stored record.
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,

    /// Reveal budget for the quiz-taking UI, echoed into the stored record.
    #[serde(default = "default_reveal_limit")]
    pub reveal_limit: u32,

    #[serde(default)]
    pub title: Option<String>,
}

fn default_time_limit() -> u32 {
    10
}

fn default_reveal_limit() -> u32 {
    5
}

/// A generated quiz as stored and served: configuration echo plus the
/// ordered question list. Immutable once saved; fetched by its opaque id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuizRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub topics: String,
    pub question_count: u32,
    pub time_limit: u32,
    pub reveal_limit: u32,
    pub include_explanations: bool,
    pub questions: Vec<Question>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
