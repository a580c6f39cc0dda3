//! Pipeline orchestrator
//!
//! Runs the stages in order over one `PipelineState`. Each stage result is
//! merged, the phase advanced, and a snapshot handed to the checkpoint
//! store. The first failing stage ends the run with its error. Metering and
//! checkpointing are best-effort and never fail a run.

use crate::aggregate::StanceReport;
use crate::checkpoint::CheckpointStore;
use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError, StateError};
use crate::phase::{Phase, StageKind};
use crate::stages::{default_stages, Stage, StageContext};
use crate::state::PipelineState;
use stance_agent::LlmClient;
use stance_tools::{
    LogMeter, Meter, Toolkit, EVENT_ACTOR_START, EVENT_AI_ANALYSIS, EVENT_EVIDENCE,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// A finished run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Final state, phase `Done`
    pub state: PipelineState,
    /// Aggregated result
    pub report: StanceReport,
}

/// Stance investigation pipeline
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    stages: Vec<Box<dyn Stage>>,
    meter: Arc<dyn Meter>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    start_units: u64,
}

impl Pipeline {
    /// Create pipeline with the standard stages, logging meter and no
    /// checkpoints
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, toolkit: Arc<dyn Toolkit>, config: PipelineConfig) -> Self {
        let config = Arc::new(config);
        let ctx = StageContext::new(llm, toolkit, Arc::clone(&config));
        Self {
            stages: default_stages(&ctx),
            config,
            meter: Arc::new(LogMeter),
            checkpoints: None,
            start_units: 1,
        }
    }

    /// With billing sink
    #[must_use]
    pub fn with_meter(mut self, meter: Arc<dyn Meter>) -> Self {
        self.meter = meter;
        self
    }

    /// With checkpoint store
    #[must_use]
    pub fn with_checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// With units charged for the run start
    #[must_use]
    pub fn with_start_units(mut self, units: u64) -> Self {
        self.start_units = units;
        self
    }

    /// Replace the stage list
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<Box<dyn Stage>>) -> Self {
        self.stages = stages;
        self
    }

    /// Run configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Investigate `subject` to completion
    ///
    /// # Errors
    /// The first stage failure, or a `Config` error for an empty subject or
    /// invalid configuration.
    pub async fn run(&self, subject: &str) -> Result<PipelineRun, PipelineError> {
        self.run_with_shutdown(subject, std::future::pending()).await
    }

    /// Investigate `subject`, giving up with `Cancelled` once `shutdown`
    /// resolves
    ///
    /// # Errors
    /// As `run`, plus `PipelineError::Cancelled`.
    pub async fn run_with_shutdown<F>(&self, subject: &str, shutdown: F) -> Result<PipelineRun, PipelineError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.execute(subject) => result,
            () = shutdown => {
                tracing::warn!(subject, "Run cancelled");
                Err(PipelineError::Cancelled)
            }
        }
    }

    async fn execute(&self, subject: &str) -> Result<PipelineRun, PipelineError> {
        self.config.validate()?;
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ConfigError::Invalid("subject name must not be empty".to_string()).into());
        }

        let state = PipelineState::new(subject, self.config.stance.as_str());
        let span = tracing::info_span!("investigation", run_id = %state.run_id(), subject);
        self.drive(state).instrument(span).await
    }

    async fn drive(&self, mut state: PipelineState) -> Result<PipelineRun, PipelineError> {
        tracing::info!(stance = state.stance(), "Investigation started");
        self.charge(EVENT_ACTOR_START, self.start_units).await;

        for stage in &self.stages {
            let kind = stage.kind();
            if state.phase() != kind.requires() {
                return Err(StateError::IllegalTransition {
                    from: state.phase(),
                    to: kind.completes(),
                }
                .into());
            }

            tracing::info!(stage = %kind, "Stage started");
            let started = Instant::now();
            let partial = stage.run(&state).await.map_err(|e| {
                tracing::error!(stage = %kind, error_kind = e.kind(), "Stage failed: {e}");
                e
            })?;
            state.merge(partial)?;
            state.advance(kind.completes())?;
            tracing::info!(
                stage = %kind,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Stage finished"
            );

            self.checkpoint(kind, &state).await;
            self.charge_for(kind, &state).await;
        }

        let report = StanceReport::from_state(&state);
        state.advance(Phase::Done)?;
        tracing::info!(score = report.score, evidence = report.evidence.len(), "Investigation finished");
        Ok(PipelineRun { state, report })
    }

    async fn charge_for(&self, kind: StageKind, state: &PipelineState) {
        match kind {
            StageKind::GatherEvidence => {
                let count = state.raw_evidence().map_or(0, <[_]>::len);
                if count > 0 {
                    self.charge(EVENT_EVIDENCE, count as u64).await;
                }
            }
            StageKind::ScoreEvidence => {
                // the model is only asked when there is something to score
                if state.evidence().is_some_and(|e| !e.is_empty()) {
                    self.charge(EVENT_AI_ANALYSIS, 1).await;
                }
            }
            StageKind::ResolveHandles => {}
        }
    }

    async fn charge(&self, event: &str, count: u64) {
        if let Err(e) = self.meter.charge(event, count).await {
            tracing::warn!(event, count, "Charge failed: {e}");
        }
    }

    async fn checkpoint(&self, kind: StageKind, state: &PipelineState) {
        let Some(store) = &self.checkpoints else {
            return;
        };
        if let Err(e) = store.save(kind, state).await {
            tracing::warn!(stage = %kind, "Checkpoint failed: {e}");
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("stages", &self.stages.iter().map(|s| s.kind()).collect::<Vec<_>>())
            .field("checkpoints", &self.checkpoints.is_some())
            .field("start_units", &self.start_units)
            .finish_non_exhaustive()
    }
}
