//! The workflow state machine.
//!
//! Consumes the four user intents, validates them against the current
//! stage, drives generation calls through the [`RequestOrchestrator`], and
//! applies results to the session. The session mutex is never held across
//! an await point: every transition is atomic from the caller's
//! perspective, and suspension happens only at the gateway boundary.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::gateway::{DetailRequest, GatewayError, GenerationGateway, OutlineRequest};
use crate::model::{DetailLevel, TextbookSubmission, DEFAULT_EXERCISE_COUNT};
use crate::orchestrator::{OrchestratorError, RequestOrchestrator};

use super::{WorkflowError, WorkflowSession, WorkflowSnapshot, WorkflowStage};

/// Progress label shown while the outline call is in flight.
const LABEL_OUTLINE: &str = "generating outline";
/// Progress label shown while the detail call is in flight.
const LABEL_DETAIL: &str = "generating detail";

/// Sequences the two-stage generation workflow for one session.
///
/// The machine is the only component that mutates the [`WorkflowSession`];
/// collaborators receive read-only [`WorkflowSnapshot`]s and submit
/// intents. All intents take `&self`, so the machine can sit behind an
/// `Arc` and receive an intent while a generation call is parked on its
/// await -- which is exactly when the single-in-flight rule rejects it.
pub struct WorkflowStateMachine {
    session: Mutex<WorkflowSession>,
    orchestrator: RequestOrchestrator,
    gateway: Arc<dyn GenerationGateway>,
}

impl WorkflowStateMachine {
    /// Create a machine with a fresh session.
    pub fn new(gateway: Arc<dyn GenerationGateway>) -> Self {
        let session = WorkflowSession::new();
        info!(session_id = %session.id(), "workflow session started");
        Self {
            session: Mutex::new(session),
            orchestrator: RequestOrchestrator::new(),
            gateway,
        }
    }

    /// Read-only view of the current session and operation status.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        WorkflowSnapshot {
            session_id: session.id(),
            stage: session.stage(),
            submission: session.submission().cloned(),
            outline: session.outline().cloned(),
            selected_module: session.selected_module().cloned(),
            detail: session.detail().cloned(),
            status: self.orchestrator.status(),
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut WorkflowSession) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut session)
    }

    /// Intent: submit textbook text and generate a course outline.
    ///
    /// Valid from `CollectingInput` and `ShowingOutline` (resubmission).
    /// Validation runs before any network call. On success the submission
    /// and outline are stored and the stage becomes `ShowingOutline`; on
    /// failure the session is untouched apart from its failure status.
    pub async fn submit_textbook(
        &self,
        submission: TextbookSubmission,
    ) -> Result<(), WorkflowError> {
        submission.validate()?;

        let session_id = self.with_session(|session| match session.stage() {
            WorkflowStage::CollectingInput | WorkflowStage::ShowingOutline => {
                Ok(session.id())
            }
            stage => Err(WorkflowError::InvalidTransition {
                stage,
                intent: "submit textbook",
            }),
        })?;

        let request = OutlineRequest::from(&submission);
        let outline = self
            .orchestrator
            .run(LABEL_OUTLINE, self.gateway.generate_outline(&request))
            .await?;

        self.with_session(|session| {
            session.apply_outline(submission, outline);
            info!(
                session_id = %session_id,
                modules = session.outline().map_or(0, |o| o.modules.len()),
                "outline applied, session now showing outline"
            );
        });
        Ok(())
    }

    /// Intent: select a module from the outline and generate its detail.
    ///
    /// Valid only from `ShowingOutline`. The stored submission content is
    /// passed as carry-over context. On any failure -- including a
    /// response whose `module_id` does not match the request -- the
    /// selection is cleared and the session stays in `ShowingOutline`.
    pub async fn select_module(&self, module_id: &str) -> Result<(), WorkflowError> {
        let (session_id, module, content) = self.with_session(|session| {
            if session.stage() != WorkflowStage::ShowingOutline {
                return Err(WorkflowError::InvalidTransition {
                    stage: session.stage(),
                    intent: "select module",
                });
            }
            // ShowingOutline guarantees both of these are present.
            let Some(outline) = session.outline() else {
                return Err(WorkflowError::InvalidTransition {
                    stage: session.stage(),
                    intent: "select module",
                });
            };
            let Some(submission) = session.submission() else {
                return Err(WorkflowError::InvalidTransition {
                    stage: session.stage(),
                    intent: "select module",
                });
            };
            let module = outline
                .module(module_id)
                .cloned()
                .ok_or_else(|| WorkflowError::UnknownModule(module_id.to_owned()))?;
            Ok((session.id(), module, submission.content.clone()))
        })?;

        let request = DetailRequest {
            module_info: module.clone(),
            textbook_content: content,
            detail_level: DetailLevel::Standard,
            exercise_count: DEFAULT_EXERCISE_COUNT,
        };

        // The selection is recorded only after the orchestrator grants the
        // permit: an intent rejected with OperationInProgress must not
        // leave any trace on the session.
        let operation = async {
            self.with_session(|session| session.select_module(module.clone()));
            self.gateway.generate_detail(&request).await
        };

        let detail = match self.orchestrator.run(LABEL_DETAIL, operation).await {
            Ok(detail) => detail,
            // A rejected concurrent call never recorded a selection; the
            // in-flight call's selection must survive the rejection.
            Err(OrchestratorError::OperationInProgress) => {
                return Err(WorkflowError::OperationInProgress);
            }
            Err(error @ OrchestratorError::Generation { .. }) => {
                self.with_session(WorkflowSession::clear_selection);
                return Err(error.into());
            }
        };

        if detail.module_id != module.module_id {
            // Contract violation: the service answered for a different
            // module. Treated exactly like a remote failure.
            let message = format!(
                "service returned detail for module {:?}, expected {:?}",
                detail.module_id, module.module_id
            );
            warn!(session_id = %session_id, %message, "discarding mismatched detail");
            self.orchestrator.record_failure(&message);
            self.with_session(WorkflowSession::clear_selection);
            return Err(WorkflowError::Generation {
                message: message.clone(),
                source: GatewayError::Remote(message),
            });
        }

        self.with_session(|session| {
            // The session may have been reset while the call was in
            // flight; apply only if the originating stage and selection
            // are still in place.
            let selection_intact = session.stage() == WorkflowStage::ShowingOutline
                && session
                    .selected_module()
                    .is_some_and(|m| m.module_id == module.module_id);
            if selection_intact {
                session.apply_detail(detail);
                info!(
                    session_id = %session_id,
                    module_id = %module.module_id,
                    "detail applied, session now showing detail"
                );
            } else {
                warn!(
                    session_id = %session_id,
                    module_id = %module.module_id,
                    stage = %session.stage(),
                    "session changed while detail was in flight, discarding result"
                );
            }
        });
        Ok(())
    }

    /// Intent: leave the detail view, back to the outline.
    ///
    /// Valid only from `ShowingDetail`. No I/O; always succeeds there.
    pub fn go_back_to_outline(&self) -> Result<(), WorkflowError> {
        self.with_session(|session| match session.stage() {
            WorkflowStage::ShowingDetail => {
                session.reset_to_outline();
                info!(session_id = %session.id(), "returned to outline");
                Ok(())
            }
            stage => Err(WorkflowError::InvalidTransition {
                stage,
                intent: "go back to outline",
            }),
        })
    }

    /// Intent: return to the input form.
    ///
    /// Accepted from every stage and idempotent. Clears the outline,
    /// selection and detail along with any stale failure status; the
    /// submission survives as a prefill.
    pub fn go_back_to_input(&self) {
        self.with_session(|session| {
            session.reset_to_input();
            info!(session_id = %session.id(), "returned to input");
        });
        self.orchestrator.clear_failure();
    }
}
