// src/generator.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    models::quiz::{GenerateQuizRequest, Question},
};

const SYSTEM_PROMPT: &str = "You are a professional quiz creator specializing in creating engaging, accurate, and highly specific trivia questions. \
Your task is to generate quiz questions based on the user's specifications, with special emphasis on their chosen topic. \
Each question should be relevant to the specified category and topic, with the difficulty level properly calibrated. \
Each question must have one correct answer and three plausible but incorrect options. \
For multiple choice questions, make sure options are distinct and don't overlap in meaning. \
Avoid ambiguous questions or answers, and ensure factual accuracy. \
The response should be in valid JSON format as specified.";

/// Produces questions for a validated generation request.
///
/// Injected through `AppState` so tests can stub the upstream service out.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, params: &GenerateQuizRequest) -> Result<Vec<Question>, AppError>;
}

/// Production generator backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        })
    }
}

#[async_trait]
impl QuestionGenerator for OpenAiGenerator {
    async fn generate(&self, params: &GenerateQuizRequest) -> Result<Vec<Question>, AppError> {
        let prompt = build_prompt(params);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Generation(format!(
                "upstream returned HTTP {}",
                status
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("malformed completion body: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Generation("empty completion".to_string()))?;

        parse_questions(&content, params.question_count)
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct QuestionsEnvelope {
    questions: Vec<Question>,
}

/// Build the user prompt embedding the exact topic string, difficulty
/// guidance and requested count.
pub fn build_prompt(params: &GenerateQuizRequest) -> String {
    let explanation_line = if params.include_explanations {
        "\n    - Include a brief but informative explanation for each correct answer"
    } else {
        ""
    };
    let explanation_field = if params.include_explanations {
        "\n          \"explanation\": \"Brief explanation of why this answer is correct\","
    } else {
        ""
    };

    format!(
        r#"Create {count} high-quality trivia questions specifically about "{topics}" within the broader category of {category}.

    Important Requirements:
    - Generate exactly {count} questions (no more, no less)
    - The questions MUST focus specifically on {topics} as the primary subject
    - Difficulty level: {difficulty} ({guide})
    - Each question should have exactly 4 options labeled A, B, C, and D
    - Ensure only ONE answer is correct, and all others are clearly incorrect but plausible
    - Questions should be engaging, interesting, and factually accurate
    - Vary the types of questions (e.g., who, what, when, where, how)
    - Ensure questions are diverse and cover different aspects of the topic
    - For large sets (15-20 questions), ensure good coverage of different subtopics
    - Maintain consistent difficulty across all questions{explanation_line}
    - Don't create multiple questions that are too similar to each other

    The user has specifically requested {count} questions about "{topics}" with {difficulty} difficulty, so ensure all questions match this criteria precisely.

    The response should be a JSON object with this structure:
    {{
      "questions": [
        {{
          "question": "The specific question text?",
          "options": ["Option A", "Option B", "Option C", "Option D"],
          "correctAnswer": "The exact text of the correct option",{explanation_field}
        }},
        ...
      ]
    }}"#,
        count = params.question_count,
        topics = params.topics,
        category = params.category,
        difficulty = params.difficulty.as_str(),
        guide = params.difficulty.guide(),
    )
}

/// Parse the upstream JSON payload into questions, enforcing the shape
/// contract (4 options, correct answer among them).
///
/// A count mismatch is passed through as-is; callers must not assume the
/// requested length.
pub fn parse_questions(content: &str, requested: u32) -> Result<Vec<Question>, AppError> {
    let envelope: QuestionsEnvelope = serde_json::from_str(content)
        .map_err(|e| AppError::Generation(format!("unparseable generation response: {}", e)))?;

    for question in &envelope.questions {
        if !question.is_well_formed() {
            return Err(AppError::Generation(format!(
                "malformed question in generation response: {:?}",
                question.text
            )));
        }
    }

    if envelope.questions.len() != requested as usize {
        tracing::warn!(
            "Requested {} questions but upstream returned {}",
            requested,
            envelope.questions.len()
        );
    }

    Ok(envelope.questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Difficulty;

    fn params(include_explanations: bool) -> GenerateQuizRequest {
        serde_json::from_value(serde_json::json!({
            "category": "Science",
            "questionCount": 10,
            "difficulty": "hard",
            "topics": "volcanoes of Iceland",
            "includeExplanations": include_explanations,
        }))
        .unwrap()
    }

    #[test]
    fn prompt_embeds_topic_count_and_difficulty() {
        let prompt = build_prompt(&params(false));
        assert!(prompt.contains("Create 10 high-quality trivia questions"));
        assert!(prompt.contains("\"volcanoes of Iceland\""));
        assert!(prompt.contains("broader category of Science"));
        assert!(prompt.contains(Difficulty::Hard.guide()));
        assert!(!prompt.contains("explanation for each correct answer"));
    }

    #[test]
    fn prompt_toggles_explanations() {
        let prompt = build_prompt(&params(true));
        assert!(prompt.contains("explanation for each correct answer"));
        assert!(prompt.contains("\"explanation\""));
    }

    #[test]
    fn parse_accepts_valid_envelope() {
        let content = serde_json::json!({
            "questions": [{
                "question": "Which volcano erupted in 2010?",
                "options": ["Eyjafjallajokull", "Hekla", "Katla", "Askja"],
                "correctAnswer": "Eyjafjallajokull",
                "explanation": "Its ash cloud disrupted European air travel."
            }]
        })
        .to_string();

        let questions = parse_questions(&content, 1).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Which volcano erupted in 2010?");
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_questions("Sure! Here are your questions:", 5).unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[test]
    fn parse_rejects_missing_envelope() {
        let err = parse_questions(r#"{"items": []}"#, 5).unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[test]
    fn parse_rejects_wrong_option_count() {
        let content = serde_json::json!({
            "questions": [{
                "question": "Q?",
                "options": ["a", "b", "c"],
                "correctAnswer": "a"
            }]
        })
        .to_string();
        assert!(matches!(
            parse_questions(&content, 1),
            Err(AppError::Generation(_))
        ));
    }

    #[test]
    fn parse_rejects_foreign_correct_answer() {
        let content = serde_json::json!({
            "questions": [{
                "question": "Q?",
                "options": ["a", "b", "c", "d"],
                "correctAnswer": "e"
            }]
        })
        .to_string();
        assert!(matches!(
            parse_questions(&content, 1),
            Err(AppError::Generation(_))
        ));
    }

    #[test]
    fn parse_passes_short_batches_through() {
        let content = serde_json::json!({
            "questions": [{
                "question": "Q?",
                "options": ["a", "b", "c", "d"],
                "correctAnswer": "a"
            }]
        })
        .to_string();
        // Requested 5, got 1: passed through, the caller decides.
        assert_eq!(parse_questions(&content, 5).unwrap().len(), 1);
    }
}
