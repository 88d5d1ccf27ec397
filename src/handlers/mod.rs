// src/handlers/mod.rs

pub mod generate;
pub mod quizzes;
pub mod tracking;
