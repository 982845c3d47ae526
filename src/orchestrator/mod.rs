//! Generation orchestrator.
//!
//! Drives one generation at a time through `idle → loading → success/error →
//! idle`. While loading, a [`ProgressEstimator`] ticks a cosmetic progress
//! value; the remote call's completion is the only thing that ends it. A
//! successful result is committed to the [`HistoryCache`] before the session
//! reports success, so success always means a stored artifact.
//!
//! All session transitions happen inside one `std::sync::Mutex` scope that is
//! never held across an await. Each run gets a sequence number; estimator
//! ticks and settle timers from an older run see a newer number and do nothing.

pub mod events;
pub mod state;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use productviz_common::{Artifact, ArtifactKind, GenerationRequest, ImagePayload};
use tokio::sync::broadcast;

use crate::config::OrchestratorSettings;
use crate::errors::{OrchestratorError, StoreError};
use crate::generator::ImageGenerator;
use crate::history::{HistoryCache, LoadReport};
use crate::progress::{PROGRESS_COMPLETE, ProgressEstimator, next_progress};
use crate::scenarios::find_scenario;
use crate::source::BaseSource;
use crate::store::ArtifactStore;

pub use events::{EventBus, SessionEvent};
pub use state::{SessionState, SessionStatus};

use state::Session;

struct Inner {
    session: Mutex<Session>,
    history: Arc<HistoryCache>,
    generator: Arc<dyn ImageGenerator>,
    source: Arc<BaseSource>,
    events: EventBus,
    settings: OrchestratorSettings,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        // Every transition rewrites whole fields; a poisoned guard is still usable.
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit_status(&self, state: &SessionState) {
        self.events.emit(SessionEvent::StatusChanged {
            status: state.status,
            error: state.error.clone(),
        });
    }

    /// Move a finished run back to idle, now or after `delay`.
    fn schedule_settle(self: &Arc<Self>, session: &mut Session, run: u64, delay: Duration) {
        if delay.is_zero() {
            session.state.reset();
            self.emit_status(&session.state);
            return;
        }

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut session = inner.lock();
            if session.run == run
                && matches!(
                    session.state.status,
                    SessionStatus::Success | SessionStatus::Error
                )
            {
                session.state.reset();
                inner.emit_status(&session.state);
            }
        });
    }

    fn start_estimator(weak: Weak<Self>, run: u64, interval: Duration) -> ProgressEstimator {
        ProgressEstimator::start(interval, move |stopped| {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let mut session = inner.lock();
            if stopped.load(Ordering::SeqCst)
                || session.run != run
                || session.state.status != SessionStatus::Loading
            {
                return false;
            }
            let next = next_progress(session.state.progress);
            if next != session.state.progress {
                session.state.progress = next;
                inner.events.emit(SessionEvent::Progress { percent: next });
            }
            true
        })
    }
}

/// Held for the lifetime of one run. If the run's future is dropped while
/// the session is still loading, the drop stops the estimator and returns the
/// session to idle so the next submit is accepted.
struct RunGuard {
    inner: Arc<Inner>,
    run: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut session = self.inner.lock();
        if session.run != self.run || !session.state.is_loading() {
            return;
        }
        tracing::warn!(run = self.run, "generation cancelled before completion");
        session.stop_estimator();
        session.state.reset();
        self.inner.emit_status(&session.state);
    }
}

pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        history: Arc<HistoryCache>,
        generator: Arc<dyn ImageGenerator>,
        source: Arc<BaseSource>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::default()),
                history,
                generator,
                source,
                events: EventBus::default(),
                settings,
            }),
        }
    }

    /// Build with a fresh [`HistoryCache`] over `store`, bounded by
    /// `settings.max_history`.
    pub fn with_store(
        store: Arc<dyn ArtifactStore>,
        generator: Arc<dyn ImageGenerator>,
        source: Arc<BaseSource>,
        settings: OrchestratorSettings,
    ) -> Self {
        let history = Arc::new(HistoryCache::new(store, settings.max_history));
        Self::new(history, generator, source, settings)
    }

    /// Load persisted history. Never fails; a broken store yields an empty
    /// history and a degraded report.
    pub async fn start(&self) -> LoadReport {
        let report = self.inner.history.load().await;
        match &report {
            LoadReport::Loaded { count, trimmed } => {
                tracing::info!(count, trimmed, "orchestrator started");
            }
            LoadReport::Degraded(message) => {
                tracing::warn!(error = %message, "orchestrator started with empty history");
            }
        }
        report
    }

    /// Stop any running estimator, return to idle and wait for pending
    /// eviction deletes. An in-flight remote call is left to finish on its own.
    pub async fn shutdown(&self) {
        {
            let mut session = self.inner.lock();
            session.stop_estimator();
            session.run += 1;
            if session.state.status != SessionStatus::Idle {
                session.state.reset();
                self.inner.emit_status(&session.state);
            }
        }
        self.inner.history.settle_evictions().await;
        tracing::debug!("orchestrator shut down");
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn history(&self) -> &Arc<HistoryCache> {
        &self.inner.history
    }

    pub fn source(&self) -> &Arc<BaseSource> {
        &self.inner.source
    }

    /// Run one generation.
    ///
    /// Validation failures return before any state change. A call while a
    /// generation is in flight is rejected with `AlreadyRunning`, not queued.
    pub async fn submit(
        &self,
        prompt: &str,
        kind: ArtifactKind,
        source_override: Option<ImagePayload>,
    ) -> Result<Artifact, OrchestratorError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(OrchestratorError::EmptyPrompt);
        }
        let source = source_override
            .or_else(|| self.inner.source.get())
            .ok_or(OrchestratorError::NoSourceConfigured)?;
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            source,
            kind,
        };

        let guard = self.begin_run()?;
        self.execute(&guard, request).await
    }

    async fn execute(
        &self,
        guard: &RunGuard,
        request: GenerationRequest,
    ) -> Result<Artifact, OrchestratorError> {
        let run = guard.run;
        let GenerationRequest {
            prompt,
            source,
            kind,
        } = request;
        tracing::info!(run, kind = %kind, "generation started");

        let generated = self.inner.generator.generate(&source, &prompt).await;

        let payload = match generated {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(run, error = %e, "generation failed");
                self.fail_run(run, e.to_string());
                return Err(e.into());
            }
        };

        self.complete_progress(run);

        let artifact = Artifact::new(payload, prompt, kind);
        match self.inner.history.insert(artifact.clone()).await {
            Ok(outcome) => {
                self.inner.events.emit(SessionEvent::ArtifactCommitted {
                    artifact_id: artifact.id.clone(),
                });
                if let Some(evicted) = outcome.evicted {
                    self.inner.events.emit(SessionEvent::ArtifactEvicted {
                        artifact_id: evicted,
                    });
                }
                self.succeed_run(run, &artifact.id);
                tracing::info!(run, artifact_id = %artifact.id, "generation committed");
                Ok(artifact)
            }
            Err(e) => {
                tracing::error!(run, error = %e, "generated image could not be stored");
                let err = OrchestratorError::Storage(e);
                self.fail_run(run, err.to_string());
                Err(err)
            }
        }
    }

    /// Generate one of the built-in marketing scenarios from the base source.
    pub async fn generate_scenario(&self, scenario_id: &str) -> Result<Artifact, OrchestratorError> {
        let scenario = find_scenario(scenario_id)
            .ok_or_else(|| OrchestratorError::UnknownScenario(scenario_id.to_string()))?;
        self.submit(scenario.prompt, ArtifactKind::Scenario, None)
            .await
    }

    /// Free-form edit. With `use_history_source`, the newest artifact is the
    /// source when there is one; otherwise the base source is used.
    pub async fn generate_custom(
        &self,
        prompt: &str,
        use_history_source: bool,
    ) -> Result<Artifact, OrchestratorError> {
        let source_override = if use_history_source {
            self.inner.history.latest().await.map(|a| a.payload)
        } else {
            None
        };
        self.submit(prompt, ArtifactKind::Edit, source_override)
            .await
    }

    /// Delete an artifact from history. Returns whether it was present.
    pub async fn remove_artifact(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.inner.history.remove(id).await?;
        if removed {
            self.inner.events.emit(SessionEvent::ArtifactRemoved {
                artifact_id: id.to_string(),
            });
        }
        Ok(removed)
    }

    fn begin_run(&self) -> Result<RunGuard, OrchestratorError> {
        let mut session = self.inner.lock();
        if session.state.is_loading() {
            return Err(OrchestratorError::AlreadyRunning);
        }

        session.stop_estimator();
        session.run += 1;
        let run = session.run;
        session.state.begin();
        session.estimator = Some(Inner::start_estimator(
            Arc::downgrade(&self.inner),
            run,
            self.inner.settings.tick_interval,
        ));
        self.inner.emit_status(&session.state);
        Ok(RunGuard {
            inner: Arc::clone(&self.inner),
            run,
        })
    }

    fn complete_progress(&self, run: u64) {
        let mut session = self.inner.lock();
        if session.run != run {
            return;
        }
        session.stop_estimator();
        session.state.progress = PROGRESS_COMPLETE;
        self.inner.events.emit(SessionEvent::Progress {
            percent: PROGRESS_COMPLETE,
        });
    }

    fn succeed_run(&self, run: u64, artifact_id: &str) {
        let mut session = self.inner.lock();
        if session.run != run {
            return;
        }
        session.state.succeed(artifact_id.to_string());
        self.inner.emit_status(&session.state);
        self.inner
            .schedule_settle(&mut session, run, self.inner.settings.success_settle);
    }

    fn fail_run(&self, run: u64, message: String) {
        let mut session = self.inner.lock();
        if session.run != run {
            return;
        }
        session.stop_estimator();
        session.state.fail(message);
        self.inner.emit_status(&session.state);
        self.inner
            .schedule_settle(&mut session, run, self.inner.settings.error_settle);
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.inner.lock().stop_estimator();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GenerationError;
    use crate::history::tests::MockStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::{Notify, Semaphore};

    /// Generator double. With a gate, each call blocks until a permit is added.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        sources: std::sync::Mutex<Vec<ImagePayload>>,
        fail: AtomicBool,
        gate: Option<Arc<Semaphore>>,
        started: Arc<Notify>,
    }

    impl ScriptedGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                sources: std::sync::Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
                gate: None,
                started: Arc::new(Notify::new()),
            }
        }

        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new()
            }
        }

        fn failing() -> Self {
            let generator = Self::new();
            generator.fail.store(true, Ordering::SeqCst);
            generator
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            source: &ImagePayload,
            _prompt: &str,
        ) -> Result<ImagePayload, GenerationError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.sources.lock().unwrap().push(source.clone());
            self.started.notify_one();
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(GenerationError::NoImage);
            }
            Ok(ImagePayload::new("image/png", format!("b3V0{n}")))
        }
    }

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings {
            max_history: 50,
            tick_interval: Duration::from_secs(3600),
            success_settle: Duration::from_secs(3600),
            error_settle: Duration::ZERO,
        }
    }

    fn source() -> Arc<BaseSource> {
        Arc::new(BaseSource::new(Some(ImagePayload::new("image/png", "c291cmNl"))))
    }

    fn build(
        store: &Arc<MockStore>,
        generator: &Arc<ScriptedGenerator>,
        source: Arc<BaseSource>,
        settings: OrchestratorSettings,
    ) -> Orchestrator {
        Orchestrator::with_store(
            Arc::clone(store) as Arc<dyn ArtifactStore>,
            Arc::clone(generator) as Arc<dyn ImageGenerator>,
            source,
            settings,
        )
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_submit_commits_artifact() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(&store, &generator, source(), settings());
        let mut rx = orch.subscribe();

        let artifact = orch
            .submit("make it gold", ArtifactKind::Edit, None)
            .await
            .unwrap();

        assert_eq!(artifact.prompt, "make it gold");
        assert_eq!(artifact.kind, ArtifactKind::Edit);
        assert_eq!(orch.history().latest().await, Some(artifact.clone()));
        assert_eq!(store.ids(), vec![artifact.id.clone()]);

        let state = orch.snapshot();
        assert_eq!(state.status, SessionStatus::Success);
        assert_eq!(state.progress, PROGRESS_COMPLETE);
        assert_eq!(state.last_artifact_id.as_deref(), Some(artifact.id.as_str()));

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                SessionEvent::StatusChanged {
                    status: SessionStatus::Loading,
                    error: None
                },
                SessionEvent::Progress { percent: 100.0 },
                SessionEvent::ArtifactCommitted {
                    artifact_id: artifact.id.clone()
                },
                SessionEvent::StatusChanged {
                    status: SessionStatus::Success,
                    error: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_no_source_is_validation_failure() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(&store, &generator, Arc::new(BaseSource::default()), settings());
        let mut rx = orch.subscribe();

        let err = orch
            .submit("anything", ArtifactKind::Edit, None)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::NoSourceConfigured));
        assert!(err.is_validation());
        assert_eq!(orch.snapshot(), SessionState::default());
        assert_eq!(generator.calls(), 0);
        assert!(drain(&mut rx).is_empty());
        assert!(orch.inner.lock().estimator.is_none());
    }

    #[tokio::test]
    async fn test_override_source_used_without_base() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(&store, &generator, Arc::new(BaseSource::default()), settings());
        let override_src = ImagePayload::new("image/jpeg", "b3ZlcnJpZGU=");

        orch.submit("x", ArtifactKind::Edit, Some(override_src.clone()))
            .await
            .unwrap();

        assert_eq!(generator.sources.lock().unwrap()[0], override_src);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(&store, &generator, source(), settings());

        let err = orch.submit("   ", ArtifactKind::Edit, None).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::EmptyPrompt));
        assert_eq!(orch.snapshot().status, SessionStatus::Idle);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_submit_while_loading_is_rejected() {
        let store = Arc::new(MockStore::default());
        let gate = Arc::new(Semaphore::new(0));
        let generator = Arc::new(ScriptedGenerator::gated(Arc::clone(&gate)));
        let orch = Arc::new(build(&store, &generator, source(), settings()));

        let first = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.submit("first", ArtifactKind::Edit, None).await })
        };
        generator.started.notified().await;
        assert_eq!(orch.snapshot().status, SessionStatus::Loading);

        let err = orch
            .submit("second", ArtifactKind::Edit, None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::AlreadyRunning));
        assert_eq!(orch.snapshot().status, SessionStatus::Loading);
        assert!(orch.history().is_empty().await);

        gate.add_permits(1);
        let artifact = first.await.unwrap().unwrap();

        assert_eq!(artifact.prompt, "first");
        assert_eq!(generator.calls(), 1);
        assert_eq!(orch.history().len().await, 1);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history_unchanged() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::failing());
        let orch = build(
            &store,
            &generator,
            source(),
            OrchestratorSettings {
                error_settle: Duration::from_secs(3600),
                ..settings()
            },
        );

        let err = orch
            .submit("doomed", ArtifactKind::Edit, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Generation(GenerationError::NoImage)
        ));
        let state = orch.snapshot();
        assert_eq!(state.status, SessionStatus::Error);
        assert_eq!(state.error.as_deref(), Some("No image generated."));
        assert_eq!(state.progress, 0.0);
        assert!(orch.history().is_empty().await);
        assert!(store.ids().is_empty());
    }

    #[tokio::test]
    async fn test_error_settles_immediately_by_default() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::failing());
        let orch = build(&store, &generator, source(), settings());
        let mut rx = orch.subscribe();

        assert!(orch.submit("doomed", ArtifactKind::Edit, None).await.is_err());
        assert_eq!(orch.snapshot(), SessionState::default());

        let statuses: Vec<SessionStatus> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StatusChanged { status, .. } => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                SessionStatus::Loading,
                SessionStatus::Error,
                SessionStatus::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_error() {
        let store = Arc::new(MockStore::default());
        store.fail_put.store(true, Ordering::SeqCst);
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(
            &store,
            &generator,
            source(),
            OrchestratorSettings {
                error_settle: Duration::from_secs(3600),
                ..settings()
            },
        );

        let err = orch
            .submit("unsaved", ArtifactKind::Edit, None)
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Storage(_)));
        let state = orch.snapshot();
        assert_eq!(state.status, SessionStatus::Error);
        assert!(state.error.unwrap().contains("could not be saved"));
        assert!(orch.history().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_settles_to_idle() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(
            &store,
            &generator,
            source(),
            OrchestratorSettings {
                success_settle: Duration::from_millis(800),
                ..settings()
            },
        );

        orch.submit("done", ArtifactKind::Edit, None).await.unwrap();
        assert_eq!(orch.snapshot().status, SessionStatus::Success);

        tokio::time::sleep(Duration::from_millis(900)).await;
        let state = orch.snapshot();
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(state.last_artifact_id.is_none());
        assert_eq!(orch.history().len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_ticks_then_completes() {
        let store = Arc::new(MockStore::default());
        let gate = Arc::new(Semaphore::new(0));
        let generator = Arc::new(ScriptedGenerator::gated(Arc::clone(&gate)));
        let orch = Arc::new(build(
            &store,
            &generator,
            source(),
            OrchestratorSettings {
                tick_interval: Duration::from_millis(200),
                ..settings()
            },
        ));

        let run = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.submit("slow", ArtifactKind::Edit, None).await })
        };
        generator.started.notified().await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        let stalled = orch.snapshot();
        assert_eq!(stalled.status, SessionStatus::Loading);
        assert_eq!(stalled.progress, 90.0);

        gate.add_permits(1);
        run.await.unwrap().unwrap();
        assert_eq!(orch.snapshot().progress, PROGRESS_COMPLETE);

        // No late tick may pull progress back below 100.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(orch.snapshot().progress, PROGRESS_COMPLETE);
        assert!(orch.inner.lock().estimator.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_settle_timer_does_not_reset_new_run() {
        let store = Arc::new(MockStore::default());
        let gate = Arc::new(Semaphore::new(1));
        let generator = Arc::new(ScriptedGenerator::gated(Arc::clone(&gate)));
        let orch = Arc::new(build(
            &store,
            &generator,
            source(),
            OrchestratorSettings {
                success_settle: Duration::from_millis(100),
                ..settings()
            },
        ));

        orch.submit("first", ArtifactKind::Edit, None).await.unwrap();
        assert_eq!(orch.snapshot().status, SessionStatus::Success);
        // Consume the first run's start signal.
        generator.started.notified().await;

        let second = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.submit("second", ArtifactKind::Edit, None).await })
        };
        generator.started.notified().await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(orch.snapshot().status, SessionStatus::Loading);

        gate.add_permits(1);
        second.await.unwrap().unwrap();
        assert_eq!(orch.snapshot().status, SessionStatus::Success);
    }

    #[tokio::test]
    async fn test_eviction_emits_event() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(
            &store,
            &generator,
            source(),
            OrchestratorSettings {
                max_history: 1,
                ..settings()
            },
        );

        let first = orch.submit("one", ArtifactKind::Edit, None).await.unwrap();
        let mut rx = orch.subscribe();
        let second = orch.submit("two", ArtifactKind::Edit, None).await.unwrap();
        orch.history().settle_evictions().await;

        assert!(drain(&mut rx).contains(&SessionEvent::ArtifactEvicted {
            artifact_id: first.id.clone()
        }));
        assert_eq!(store.ids(), vec![second.id]);
    }

    #[tokio::test]
    async fn test_generate_scenario() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(&store, &generator, source(), settings());

        let artifact = orch.generate_scenario("mug").await.unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Scenario);
        assert_eq!(artifact.prompt, find_scenario("mug").unwrap().prompt);

        let err = orch.generate_scenario("rocket").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownScenario(id) if id == "rocket"));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_custom_chains_from_latest() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let base = source();
        let orch = build(&store, &generator, Arc::clone(&base), settings());

        // Empty history falls back to the base source.
        let first = orch.generate_custom("add snow", true).await.unwrap();
        let second = orch.generate_custom("make it gold", true).await.unwrap();
        orch.generate_custom("pencil sketch", false).await.unwrap();

        let sources = generator.sources.lock().unwrap().clone();
        assert_eq!(sources[0], base.get().unwrap());
        assert_eq!(sources[1], first.payload);
        assert_eq!(sources[2], base.get().unwrap());
        assert_eq!(second.kind, ArtifactKind::Edit);
    }

    #[tokio::test]
    async fn test_remove_artifact() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(&store, &generator, source(), settings());
        let artifact = orch.submit("x", ArtifactKind::Edit, None).await.unwrap();
        let mut rx = orch.subscribe();

        assert!(orch.remove_artifact(&artifact.id).await.unwrap());
        assert!(!orch.remove_artifact("missing").await.unwrap());

        assert!(orch.history().is_empty().await);
        assert!(store.ids().is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![SessionEvent::ArtifactRemoved {
                artifact_id: artifact.id
            }]
        );
    }

    #[tokio::test]
    async fn test_start_loads_persisted_history() {
        let store = Arc::new(MockStore::default());
        let generator = Arc::new(ScriptedGenerator::new());
        let committed = {
            let orch = build(&store, &generator, source(), settings());
            orch.submit("persisted", ArtifactKind::Edit, None)
                .await
                .unwrap()
        };

        let orch = build(&store, &generator, source(), settings());
        assert!(orch.history().is_empty().await);
        let report = orch.start().await;

        assert_eq!(report, LoadReport::Loaded { count: 1, trimmed: 0 });
        assert_eq!(orch.history().latest().await, Some(committed));
    }

    #[tokio::test]
    async fn test_start_with_broken_store_degrades() {
        let store = Arc::new(MockStore::default());
        store.fail_list.store(true, Ordering::SeqCst);
        let generator = Arc::new(ScriptedGenerator::new());
        let orch = build(&store, &generator, source(), settings());

        assert!(orch.start().await.is_degraded());
        assert!(orch.history().is_empty().await);
        assert_eq!(orch.snapshot().status, SessionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submit_returns_to_idle() {
        let store = Arc::new(MockStore::default());
        let gate = Arc::new(Semaphore::new(0));
        let generator = Arc::new(ScriptedGenerator::gated(Arc::clone(&gate)));
        let s = OrchestratorSettings {
            tick_interval: Duration::from_millis(100),
            ..settings()
        };
        let orch = build(&store, &generator, source(), s);
        let mut rx = orch.subscribe();

        let timed_out = tokio::time::timeout(
            Duration::from_secs(1),
            orch.submit("slow", ArtifactKind::Edit, None),
        )
        .await;
        assert!(timed_out.is_err());

        assert_eq!(orch.snapshot(), SessionState::default());
        assert!(orch.inner.lock().estimator.is_none());
        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::StatusChanged {
                status: SessionStatus::Idle,
                error: None
            })
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(orch.snapshot().progress, 0.0);

        gate.add_permits(1);
        let artifact = orch
            .submit("again", ArtifactKind::Edit, None)
            .await
            .unwrap();
        assert_eq!(store.ids(), vec![artifact.id]);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_while_loading_stops_estimator() {
        let store = Arc::new(MockStore::default());
        let gate = Arc::new(Semaphore::new(0));
        let generator = Arc::new(ScriptedGenerator::gated(Arc::clone(&gate)));
        let orch = Arc::new(build(&store, &generator, source(), settings()));

        let run = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.submit("abandoned", ArtifactKind::Edit, None).await })
        };
        generator.started.notified().await;
        assert!(orch.inner.lock().estimator.is_some());

        orch.shutdown().await;
        assert!(orch.inner.lock().estimator.is_none());
        assert_eq!(orch.snapshot(), SessionState::default());

        // The abandoned call may still finish; it must not revive the session.
        gate.add_permits(1);
        let _ = run.await.unwrap();
        assert_eq!(orch.snapshot().status, SessionStatus::Idle);
    }
}
