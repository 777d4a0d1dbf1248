//! Shared test fixtures for the courseforge workspace.
//!
//! Provides a scripted [`StubGateway`] standing in for the remote
//! generation service, plus builders for realistic sample payloads. The
//! stub can also hold a call open at its await point (see
//! [`StubGateway::hold_next_detail`]) so tests can exercise the
//! single-in-flight rule deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use courseforge_core::gateway::{
    DetailRequest, GatewayError, GenerationGateway, OutlineRequest,
};
use courseforge_core::model::{
    CourseModule, CourseOutline, Difficulty, Exercise, ModuleDetail, TeachingExample,
    TeachingPlan, TeachingSection,
};

// ---------------------------------------------------------------------------
// Stub gateway
// ---------------------------------------------------------------------------

/// Releases a call held by [`StubGateway::hold_next_outline`] or
/// [`StubGateway::hold_next_detail`].
///
/// Releasing before the call arrives is fine: the permit is stored.
pub struct GateHandle {
    notify: Arc<Notify>,
}

impl GateHandle {
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

#[derive(Default)]
struct StubInner {
    outline_responses: Mutex<VecDeque<Result<CourseOutline, GatewayError>>>,
    detail_responses: Mutex<VecDeque<Result<ModuleDetail, GatewayError>>>,
    outline_gate: Mutex<Option<Arc<Notify>>>,
    detail_gate: Mutex<Option<Arc<Notify>>>,
    outline_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    last_outline_request: Mutex<Option<OutlineRequest>>,
    last_detail_request: Mutex<Option<DetailRequest>>,
}

/// Scripted [`GenerationGateway`]: responses are queued up front and
/// popped per call. Clones share state, so tests can keep a handle after
/// moving a clone into the state machine.
#[derive(Clone, Default)]
pub struct StubGateway {
    inner: Arc<StubInner>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response for the next outline call.
    pub fn push_outline(&self, response: Result<CourseOutline, GatewayError>) {
        self.inner
            .outline_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    /// Queue the response for the next detail call.
    pub fn push_detail(&self, response: Result<ModuleDetail, GatewayError>) {
        self.inner
            .detail_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    /// Park the next outline call until the returned handle is released.
    pub fn hold_next_outline(&self) -> GateHandle {
        let notify = Arc::new(Notify::new());
        *self.inner.outline_gate.lock().unwrap() = Some(Arc::clone(&notify));
        GateHandle { notify }
    }

    /// Park the next detail call until the returned handle is released.
    pub fn hold_next_detail(&self) -> GateHandle {
        let notify = Arc::new(Notify::new());
        *self.inner.detail_gate.lock().unwrap() = Some(Arc::clone(&notify));
        GateHandle { notify }
    }

    pub fn outline_calls(&self) -> usize {
        self.inner.outline_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.inner.detail_calls.load(Ordering::SeqCst)
    }

    /// The most recent outline request body, if any call was made.
    pub fn last_outline_request(&self) -> Option<OutlineRequest> {
        self.inner.last_outline_request.lock().unwrap().clone()
    }

    /// The most recent detail request body, if any call was made.
    pub fn last_detail_request(&self) -> Option<DetailRequest> {
        self.inner.last_detail_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationGateway for StubGateway {
    async fn generate_outline(
        &self,
        request: &OutlineRequest,
    ) -> Result<CourseOutline, GatewayError> {
        self.inner.outline_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_outline_request.lock().unwrap() = Some(request.clone());

        let gate = self.inner.outline_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.inner
            .outline_responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("StubGateway: outline call with no scripted response")
    }

    async fn generate_detail(
        &self,
        request: &DetailRequest,
    ) -> Result<ModuleDetail, GatewayError> {
        self.inner.detail_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_detail_request.lock().unwrap() = Some(request.clone());

        let gate = self.inner.detail_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.inner
            .detail_responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("StubGateway: detail call with no scripted response")
    }
}

// ---------------------------------------------------------------------------
// Sample payload builders
// ---------------------------------------------------------------------------

/// A plausible course module with id `m<sequence>`.
pub fn sample_module(sequence: u32) -> CourseModule {
    CourseModule {
        module_id: format!("m{sequence}"),
        title: format!("Module {sequence}"),
        description: format!("What module {sequence} covers."),
        sequence,
        duration_minutes: 45,
        learning_objectives: vec![format!("objective {sequence}")],
        key_concepts: vec![format!("concept {sequence}")],
        prerequisites: if sequence > 1 {
            vec![format!("m{}", sequence - 1)]
        } else {
            vec![]
        },
    }
}

/// An outline with `count` modules `m1..m<count>`.
pub fn sample_outline(count: u32) -> CourseOutline {
    CourseOutline {
        course_title: "The Water Cycle".into(),
        grade: "3rd grade".into(),
        subject: "science".into(),
        total_modules: count,
        estimated_hours: count * 2,
        modules: (1..=count).map(sample_module).collect(),
    }
}

fn section(title: &str, minutes: u32) -> TeachingSection {
    TeachingSection {
        title: title.into(),
        duration_minutes: minutes,
        content: format!("{title} content."),
        activities: vec![format!("{title} activity")],
    }
}

/// A full module detail answering for `module_id`.
pub fn sample_detail(module_id: &str) -> ModuleDetail {
    ModuleDetail {
        module_id: module_id.into(),
        teaching_plan: TeachingPlan {
            introduction: section("Introduction", 5),
            main_content: section("Main content", 25),
            practice: section("Practice", 10),
            summary: section("Summary", 5),
        },
        examples: vec![TeachingExample {
            title: "Puddle after rain".into(),
            content: "Watch a puddle shrink over a sunny day.".into(),
            purpose: "Connect evaporation to everyday observation.".into(),
        }],
        exercises: vec![
            Exercise {
                id: "e1".into(),
                kind: "multiple_choice".into(),
                question: "Where does the puddle's water go?".into(),
                answer: "Into the air as vapour.".into(),
                difficulty: Difficulty::Easy,
                explanation: "Sunlight warms the water until it evaporates.".into(),
            },
            Exercise {
                id: "e2".into(),
                kind: "short_answer".into(),
                question: "Name the four stages of the water cycle.".into(),
                answer: "Evaporation, condensation, precipitation, collection.".into(),
                difficulty: Difficulty::Medium,
                explanation: "The cycle repeats through these four stages.".into(),
            },
        ],
        teaching_tips: vec!["Use a kettle demonstration for condensation.".into()],
    }
}
