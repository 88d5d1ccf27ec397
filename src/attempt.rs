// src/attempt.rs
//
// Quiz-taking session engine. Lives entirely inside one interactive session;
// nothing here is persisted server-side while the attempt is in progress.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::models::quiz::Question;

/// One-way lifecycle of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InProgress,
    Completed,
}

/// Whether the attempt scores itself when the last gap is filled, or waits
/// for an explicit submit. The generated-quiz flow uses `ExplicitSubmit`;
/// the all-questions-on-one-page flow uses `OnLastAnswer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    OnLastAnswer,
    ExplicitSubmit,
}

/// Countdown clamps at zero without auto-submitting; count-up is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    CountDown { remaining_seconds: u64 },
    CountUp { elapsed_seconds: u64 },
}

impl Timer {
    fn tick(&mut self, seconds: u64) {
        match self {
            Timer::CountDown { remaining_seconds } => {
                *remaining_seconds = remaining_seconds.saturating_sub(seconds);
            }
            Timer::CountUp { elapsed_seconds } => {
                *elapsed_seconds += seconds;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    NotStarted,
    AlreadyStarted,
    AlreadyCompleted,
    QuestionOutOfRange(usize),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::NotStarted => write!(f, "quiz has not been started"),
            AttemptError::AlreadyStarted => write!(f, "quiz is already in progress"),
            AttemptError::AlreadyCompleted => write!(f, "quiz is already completed"),
            AttemptError::QuestionOutOfRange(i) => write!(f, "no question at index {}", i),
        }
    }
}

impl std::error::Error for AttemptError {}

/// Final (or running) tally for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub correct: usize,
    pub total: usize,
    pub percent: u32,
}

/// Tracks a user's in-progress answers, reveal budget, timer and completion.
///
/// Answers upsert (last write wins); reveals are capped by the budget and
/// never affect scoring; once completed, answers and reveals are frozen.
pub struct QuizAttempt {
    questions: Vec<Question>,
    answers: HashMap<usize, String>,
    revealed: HashSet<usize>,
    reveal_budget: usize,
    completion_mode: CompletionMode,
    timer: Timer,
    phase: Phase,
    score: Option<ScoreSummary>,
}

impl QuizAttempt {
    /// A fixed-budget attempt for a generated quiz: countdown timer,
    /// explicit submit, preview screen before starting.
    pub fn timed(
        questions: Vec<Question>,
        time_limit_minutes: u64,
        reveal_budget: usize,
    ) -> Self {
        Self::new(
            questions,
            Timer::CountDown {
                remaining_seconds: time_limit_minutes * 60,
            },
            CompletionMode::ExplicitSubmit,
            reveal_budget,
        )
    }

    /// A free-form attempt for a pre-authored quiz: count-up timer,
    /// auto-completes on the last answer, immediately in progress.
    pub fn free_form(questions: Vec<Question>, reveal_budget: usize) -> Self {
        let mut attempt = Self::new(
            questions,
            Timer::CountUp { elapsed_seconds: 0 },
            CompletionMode::OnLastAnswer,
            reveal_budget,
        );
        attempt.phase = Phase::InProgress;
        attempt
    }

    pub fn new(
        questions: Vec<Question>,
        timer: Timer,
        completion_mode: CompletionMode,
        reveal_budget: usize,
    ) -> Self {
        Self {
            questions,
            answers: HashMap::new(),
            revealed: HashSet::new(),
            reveal_budget,
            completion_mode,
            timer,
            phase: Phase::NotStarted,
            score: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    pub fn timer(&self) -> Timer {
        self.timer
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn remaining_reveals(&self) -> usize {
        self.reveal_budget - self.revealed.len()
    }

    pub fn is_revealed(&self, question_index: usize) -> bool {
        self.revealed.contains(&question_index)
    }

    pub fn answer(&self, question_index: usize) -> Option<&str> {
        self.answers.get(&question_index).map(String::as_str)
    }

    /// Final score, present once the attempt is completed.
    pub fn score(&self) -> Option<ScoreSummary> {
        self.score
    }

    /// Begin the attempt and its timer.
    pub fn start(&mut self) -> Result<(), AttemptError> {
        match self.phase {
            Phase::NotStarted => {
                self.phase = Phase::InProgress;
                Ok(())
            }
            Phase::InProgress => Err(AttemptError::AlreadyStarted),
            Phase::Completed => Err(AttemptError::AlreadyCompleted),
        }
    }

    /// Select (or re-select) an answer. Returns the final summary when this
    /// selection filled the last gap in `OnLastAnswer` mode.
    pub fn select_answer(
        &mut self,
        question_index: usize,
        option: impl Into<String>,
    ) -> Result<Option<ScoreSummary>, AttemptError> {
        self.ensure_in_progress()?;
        if question_index >= self.questions.len() {
            return Err(AttemptError::QuestionOutOfRange(question_index));
        }

        self.answers.insert(question_index, option.into());

        // Completion must be evaluated after every selection, not only on an
        // explicit submit, so the one-page flow finishes itself.
        if self.completion_mode == CompletionMode::OnLastAnswer
            && self.answers.len() == self.questions.len()
        {
            return self.complete().map(Some);
        }

        Ok(None)
    }

    /// Show the correct answer for a question ahead of completion.
    ///
    /// Returns `true` if newly revealed. A no-op (`false`) when the budget is
    /// exhausted, the index is already revealed, or the attempt is not in
    /// progress; scoring is never affected.
    pub fn reveal_answer(&mut self, question_index: usize) -> bool {
        if self.phase != Phase::InProgress
            || question_index >= self.questions.len()
            || self.revealed.len() >= self.reveal_budget
            || self.revealed.contains(&question_index)
        {
            return false;
        }
        self.revealed.insert(question_index);
        true
    }

    /// Grade the attempt and freeze it.
    pub fn complete(&mut self) -> Result<ScoreSummary, AttemptError> {
        self.ensure_in_progress()?;

        let correct = self.correct_count();
        let total = self.questions.len();
        let summary = ScoreSummary {
            correct,
            total,
            percent: percentage(correct, total),
        };

        self.phase = Phase::Completed;
        self.score = Some(summary);
        Ok(summary)
    }

    /// Running percentage over the questions answered so far, for live
    /// feedback while in progress. Distinct from the final grade, whose
    /// denominator is the full quiz length.
    pub fn live_score_percent(&self) -> Option<u32> {
        if self.answers.is_empty() {
            return None;
        }
        Some(percentage(self.correct_count(), self.answers.len()))
    }

    /// Advance the timer. Only ticks while in progress; a countdown clamps
    /// at zero and does not submit the attempt.
    pub fn tick(&mut self, seconds: u64) {
        if self.phase == Phase::InProgress {
            self.timer.tick(seconds);
        }
    }

    fn ensure_in_progress(&self) -> Result<(), AttemptError> {
        match self.phase {
            Phase::InProgress => Ok(()),
            Phase::NotStarted => Err(AttemptError::NotStarted),
            Phase::Completed => Err(AttemptError::AlreadyCompleted),
        }
    }

    fn correct_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|(i, answer)| {
                self.questions
                    .get(**i)
                    .is_some_and(|q| q.correct_answer == **answer)
            })
            .count()
    }
}

fn percentage(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (numerator as f64 / denominator as f64 * 100.0).round() as u32
}
