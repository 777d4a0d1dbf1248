//! Domain model for the course generation workflow.
//!
//! Serde names mirror the wire format of the remote generation service
//! (snake_case field names), so the same types serve as both the in-memory
//! model and the request/response payloads.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of modules requested when the user does not specify one.
pub const DEFAULT_MODULE_COUNT: u8 = 4;

/// Valid range for the requested module count.
pub const MODULE_COUNT_RANGE: RangeInclusive<u8> = 2..=6;

/// Number of exercises requested per module detail.
pub const DEFAULT_EXERCISE_COUNT: u8 = 5;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Errors produced when validating a [`TextbookSubmission`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The textbook content is empty or whitespace-only.
    #[error("textbook content must not be empty")]
    EmptyContent,

    /// The requested module count is outside [`MODULE_COUNT_RANGE`].
    #[error("module count {0} is out of range (2..=6)")]
    ModuleCountOutOfRange(u8),
}

/// The user's input to the first generation stage.
///
/// Immutable once accepted by the workflow: the `content` is reused verbatim
/// as carry-over context in every subsequent detail request, so the session
/// retains it for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextbookSubmission {
    /// Raw textbook text. Required, non-empty.
    pub content: String,
    /// Optional grade level hint (e.g. "3rd grade").
    pub grade_level: Option<String>,
    /// Optional subject hint (e.g. "science").
    pub subject: Option<String>,
    /// Desired number of modules in the outline.
    pub module_count: u8,
}

impl TextbookSubmission {
    /// Build a submission with default grade/subject/module count.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            grade_level: None,
            subject: None,
            module_count: DEFAULT_MODULE_COUNT,
        }
    }

    /// Check the submission against the input rules.
    ///
    /// Runs before any network call: an invalid submission never reaches the
    /// gateway.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.content.trim().is_empty() {
            return Err(SubmissionError::EmptyContent);
        }
        if !MODULE_COUNT_RANGE.contains(&self.module_count) {
            return Err(SubmissionError::ModuleCountOutOfRange(self.module_count));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// One module of a generated course outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    /// Identifier, unique within its outline.
    pub module_id: String,
    pub title: String,
    pub description: String,
    /// 1-based position within the outline.
    pub sequence: u32,
    pub duration_minutes: u32,
    pub learning_objectives: Vec<String>,
    pub key_concepts: Vec<String>,
    /// May be omitted by the service for introductory modules.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// The top-level course structure produced by the first generation stage.
///
/// Replaced wholesale on each new submission; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub course_title: String,
    pub grade: String,
    pub subject: String,
    pub total_modules: u32,
    pub estimated_hours: u32,
    /// Ordered by `sequence`.
    pub modules: Vec<CourseModule>,
}

impl CourseOutline {
    /// Find a module by id.
    pub fn module(&self, module_id: &str) -> Option<&CourseModule> {
        self.modules.iter().find(|m| m.module_id == module_id)
    }
}

// ---------------------------------------------------------------------------
// Module detail
// ---------------------------------------------------------------------------

/// How much content the detail stage should produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Simple,
    #[default]
    Standard,
    Detailed,
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Simple => "simple",
            Self::Standard => "standard",
            Self::Detailed => "detailed",
        };
        f.write_str(s)
    }
}

impl FromStr for DetailLevel {
    type Err = DetailLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "standard" => Ok(Self::Standard),
            "detailed" => Ok(Self::Detailed),
            other => Err(DetailLevelParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DetailLevel`] string.
#[derive(Debug, Clone)]
pub struct DetailLevelParseError(pub String);

impl fmt::Display for DetailLevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid detail level: {:?}", self.0)
    }
}

impl std::error::Error for DetailLevelParseError {}

/// Difficulty of an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(DifficultyParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Difficulty`] string.
#[derive(Debug, Clone)]
pub struct DifficultyParseError(pub String);

impl fmt::Display for DifficultyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid difficulty: {:?}", self.0)
    }
}

impl std::error::Error for DifficultyParseError {}

/// One phase of a lesson (introduction, main content, practice, summary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingSection {
    pub title: String,
    pub duration_minutes: u32,
    pub content: String,
    #[serde(default)]
    pub activities: Vec<String>,
}

/// The four fixed phases of a module's lesson plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingPlan {
    pub introduction: TeachingSection,
    pub main_content: TeachingSection,
    pub practice: TeachingSection,
    pub summary: TeachingSection,
}

/// A worked example within a module detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingExample {
    pub title: String,
    pub content: String,
    pub purpose: String,
}

/// A practice exercise within a module detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Identifier, unique within its module detail.
    pub id: String,
    /// Question type (e.g. "multiple_choice", "short_answer").
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub explanation: String,
}

/// Expanded teaching content for one selected module.
///
/// `module_id` must match the [`CourseModule`] that triggered its
/// generation; the workflow rejects a response where it does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDetail {
    pub module_id: String,
    pub teaching_plan: TeachingPlan,
    pub examples: Vec<TeachingExample>,
    /// Ordered as generated.
    pub exercises: Vec<Exercise>,
    pub teaching_tips: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
