//! Workflow session state.
//!
//! [`WorkflowSession`] is the aggregate root of the generation workflow:
//! the current stage plus the data each stage has produced. It is mutated
//! exclusively through the invariant-preserving methods in this module,
//! which the state machine ([`machine::WorkflowStateMachine`]) drives. The
//! presentation layer only ever sees cloned [`WorkflowSnapshot`]s.
//!
//! Stage invariants:
//!
//! ```text
//! CollectingInput  -- nothing required
//! ShowingOutline   -- submission and outline present
//! ShowingDetail    -- submission, outline, selected module and a detail
//!                     whose module_id matches the selection
//! ```

pub mod machine;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::gateway::GatewayError;
use crate::model::{CourseModule, CourseOutline, ModuleDetail, SubmissionError, TextbookSubmission};
use crate::orchestrator::{OperationStatus, OrchestratorError};

pub use machine::WorkflowStateMachine;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The three mutually exclusive phases of the generation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Waiting for the user's textbook submission.
    CollectingInput,
    /// An outline is available; a module can be selected.
    ShowingOutline,
    /// A module's detailed teaching content is available.
    ShowingDetail,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CollectingInput => "collecting_input",
            Self::ShowingOutline => "showing_outline",
            Self::ShowingDetail => "showing_detail",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by workflow intents.
///
/// All of these are session-visible signals, never uncaught faults: the
/// session stays in its last valid stage whenever one is returned.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The submitted input is malformed; nothing reached the network.
    #[error("invalid submission: {0}")]
    Validation(#[from] SubmissionError),

    /// The requested module id does not exist in the current outline.
    #[error("no module {0:?} in the current outline")]
    UnknownModule(String),

    /// The intent is not applicable in the session's current stage.
    #[error("cannot {intent} while in the {stage} stage")]
    InvalidTransition {
        stage: WorkflowStage,
        intent: &'static str,
    },

    /// A generation call is already in flight; the intent was rejected
    /// without touching the session.
    #[error("another generation request is already in progress")]
    OperationInProgress,

    /// The generation call failed; the same message is recorded in the
    /// session's operation status.
    #[error("generation failed: {message}")]
    Generation {
        message: String,
        #[source]
        source: GatewayError,
    },
}

impl From<OrchestratorError> for WorkflowError {
    fn from(error: OrchestratorError) -> Self {
        match error {
            OrchestratorError::OperationInProgress => Self::OperationInProgress,
            OrchestratorError::Generation { message, source } => {
                Self::Generation { message, source }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The aggregate root: one user's workflow through the two generation
/// stages.
///
/// Fields are private; mutation happens only through the stage-transition
/// methods below so no caller can observe a half-updated session.
#[derive(Debug)]
pub struct WorkflowSession {
    id: Uuid,
    stage: WorkflowStage,
    submission: Option<TextbookSubmission>,
    outline: Option<CourseOutline>,
    selected_module: Option<CourseModule>,
    detail: Option<ModuleDetail>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowSession {
    /// Fresh session in the `CollectingInput` stage.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stage: WorkflowStage::CollectingInput,
            submission: None,
            outline: None,
            selected_module: None,
            detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn submission(&self) -> Option<&TextbookSubmission> {
        self.submission.as_ref()
    }

    pub fn outline(&self) -> Option<&CourseOutline> {
        self.outline.as_ref()
    }

    pub fn selected_module(&self) -> Option<&CourseModule> {
        self.selected_module.as_ref()
    }

    pub fn detail(&self) -> Option<&ModuleDetail> {
        self.detail.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Store a fresh submission/outline pair and enter `ShowingOutline`.
    ///
    /// Replaces any prior outline and drops the prior selection and detail
    /// in the same step, so no stale cross-generation references survive.
    /// `total_modules` is normalized to the actual module count when the
    /// service reports them inconsistently.
    pub(crate) fn apply_outline(
        &mut self,
        submission: TextbookSubmission,
        mut outline: CourseOutline,
    ) {
        let actual = outline.modules.len() as u32;
        if outline.total_modules != actual {
            warn!(
                session_id = %self.id,
                reported = outline.total_modules,
                actual,
                "outline reported a module count that differs from its module list, normalizing"
            );
            outline.total_modules = actual;
        }

        self.submission = Some(submission);
        self.outline = Some(outline);
        self.selected_module = None;
        self.detail = None;
        self.stage = WorkflowStage::ShowingOutline;
        self.touch();
    }

    /// Record the module a detail request is being generated for.
    pub(crate) fn select_module(&mut self, module: CourseModule) {
        self.selected_module = Some(module);
        self.touch();
    }

    /// Drop the selection after a failed detail generation, so no
    /// "selected but undetailed" state persists.
    pub(crate) fn clear_selection(&mut self) {
        self.selected_module = None;
        self.touch();
    }

    /// Store a generated detail and enter `ShowingDetail`.
    pub(crate) fn apply_detail(&mut self, detail: ModuleDetail) {
        debug_assert!(
            self.selected_module
                .as_ref()
                .is_some_and(|m| m.module_id == detail.module_id),
            "detail applied without a matching selection"
        );
        self.detail = Some(detail);
        self.stage = WorkflowStage::ShowingDetail;
        self.touch();
    }

    /// Return to `ShowingOutline`, discarding the detail-stage data.
    pub(crate) fn reset_to_outline(&mut self) {
        self.selected_module = None;
        self.detail = None;
        self.stage = WorkflowStage::ShowingOutline;
        self.touch();
    }

    /// Return to `CollectingInput`, discarding everything the later
    /// stages own. The submission is retained as a prefill convenience.
    pub(crate) fn reset_to_input(&mut self) {
        self.outline = None;
        self.selected_module = None;
        self.detail = None;
        self.stage = WorkflowStage::CollectingInput;
        self.touch();
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only view of a session, handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub session_id: Uuid,
    pub stage: WorkflowStage,
    pub submission: Option<TextbookSubmission>,
    pub outline: Option<CourseOutline>,
    pub selected_module: Option<CourseModule>,
    pub detail: Option<ModuleDetail>,
    pub status: OperationStatus,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
