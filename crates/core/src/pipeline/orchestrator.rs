//! # Orchestrator
//!
//! Drives the idea pipeline: one market analysis and one idea batch per
//! `generate` call, then a Critic → PMRefiner → Synthesizer → score chain per
//! idea. Stage failures never escape (every stage falls back); only the
//! store can fail a call.

use super::events::{PipelineEvent, PipelineEventKind};
use super::iteration::IterationType;
use super::stages::PipelineStage;
use crate::analytics::{AnalyticsEvent, AnalyticsSink, NoopAnalytics};
use crate::config::CofounderConfig;
use crate::error::{PipelineError, Result, StoreError};
use crate::generation::StructuredGenerator;
use crate::scoring::{compare, CompositeScorer, Comparison, NoveltyOracle, ScoringWeights};
use crate::skills::{
    feedback, AgentStage, Constraints, CriticInput, CriticSkill, IdeaGeneratorInput,
    IdeaGeneratorSkill, MarketAnalystInput, MarketAnalystSkill, PmRefinerInput, PmRefinerSkill,
    RewriteInput, RewriteSkill, SynthesizerInput, SynthesizerSkill,
};
use crate::state::{open_store, Feedback, IdeaSnapshot, IdeaStatus, IdeaStore, ListQuery};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Used by [`Orchestrator::generate_default`]
    pub default_idea_count: usize,
    /// Idea chains run at once; 1 runs them one after another
    pub max_concurrent_ideas: usize,
    /// Capacity of the channel opened by [`Orchestrator::subscribe`]
    pub event_buffer: usize,
    pub weights: ScoringWeights,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_idea_count: 3,
            max_concurrent_ideas: 1,
            event_buffer: 256,
            weights: ScoringWeights::default(),
        }
    }
}

impl From<&CofounderConfig> for OrchestratorConfig {
    fn from(config: &CofounderConfig) -> Self {
        Self {
            default_idea_count: config.pipeline.default_idea_count,
            max_concurrent_ideas: config.pipeline.max_concurrent_ideas,
            event_buffer: config.pipeline.event_buffer,
            weights: config.scoring,
        }
    }
}

/// Everything one idea chain needs; cheap to clone into a task.
#[derive(Clone)]
struct ChainContext {
    generator: Arc<dyn StructuredGenerator>,
    scorer: Arc<CompositeScorer>,
    novelty: Option<Arc<dyn NoveltyOracle>>,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl ChainContext {
    /// Non-blocking; a full or closed channel drops the event.
    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.try_send(event) {
                tracing::debug!("Pipeline event dropped: {}", e);
            }
        }
    }

    async fn run_stage<S: AgentStage>(
        &self,
        skill: S,
        stage: PipelineStage,
        idea_id: Option<&str>,
        input: &S::Input,
    ) -> S::Output {
        let with_idea = |event: PipelineEvent| match idea_id {
            Some(id) => event.with_idea(id),
            None => event,
        };

        self.emit(with_idea(
            PipelineEvent::new(PipelineEventKind::StageStarted).with_stage(stage),
        ));

        let run = skill.run(self.generator.as_ref(), input).await;

        let done = match &run.fallback_reason {
            Some(reason) => PipelineEvent::new(PipelineEventKind::StageFellBack)
                .with_data(serde_json::json!({ "error": reason.to_string() })),
            None => PipelineEvent::new(PipelineEventKind::StageCompleted),
        };
        self.emit(with_idea(done.with_stage(stage)));

        run.into_output()
    }

    /// Recompute scores in place. On failure the current scores stay.
    async fn rescore(&self, snapshot: &mut IdeaSnapshot) {
        match self
            .scorer
            .score_snapshot(snapshot, self.novelty.as_deref())
            .await
        {
            Ok((components, overall)) => snapshot.apply_scores(components, overall),
            Err(e) => {
                tracing::warn!(
                    idea_id = %snapshot.id,
                    error = %e,
                    "Score recomputation failed, keeping previous scores"
                );
                self.emit(
                    PipelineEvent::new(PipelineEventKind::ScoringFailed)
                        .with_stage(PipelineStage::Scoring)
                        .with_idea(&snapshot.id)
                        .with_data(serde_json::json!({ "error": e.to_string() })),
                );
            }
        }
    }

    /// Critique, refine, synthesize and score one draft.
    async fn run_chain(self, mut snapshot: IdeaSnapshot) -> IdeaSnapshot {
        let idea = snapshot.idea();
        let mut stage = PipelineStage::CHAIN_START;

        let critique = self
            .run_stage(
                CriticSkill,
                stage,
                Some(&snapshot.id),
                &CriticInput {
                    idea: idea.clone(),
                    market_analysis: snapshot.market_analysis.clone(),
                    feedback: None,
                },
            )
            .await;
        stage.advance();

        let refinement = self
            .run_stage(
                PmRefinerSkill,
                stage,
                Some(&snapshot.id),
                &PmRefinerInput {
                    idea: idea.clone(),
                    critique: Some(critique.clone()),
                    feedback: None,
                    constraints: snapshot.constraints.clone(),
                },
            )
            .await;
        stage.advance();

        let synthesis = self
            .run_stage(
                SynthesizerSkill,
                stage,
                Some(&snapshot.id),
                &SynthesizerInput {
                    idea,
                    market_analysis: snapshot.market_analysis.clone(),
                    refinement: Some(refinement.clone()),
                    feedback: None,
                },
            )
            .await;
        stage.advance();

        snapshot.critic_output = Some(critique);
        snapshot.pm_refiner_output = Some(refinement);
        snapshot.synthesizer_output = Some(synthesis);

        self.rescore(&mut snapshot).await;
        stage.advance();

        if let Err(e) = snapshot.transition(IdeaStatus::Completed) {
            tracing::error!(idea_id = %snapshot.id, "{}", e);
        }

        self.emit(
            PipelineEvent::new(PipelineEventKind::IdeaCompleted)
                .with_stage(stage)
                .with_idea(&snapshot.id)
                .with_data(serde_json::json!({
                    "title": snapshot.title,
                    "overall_score": snapshot.overall_score,
                })),
        );
        snapshot
    }
}

/// Idea pipeline entry point
pub struct Orchestrator {
    config: OrchestratorConfig,
    ctx: ChainContext,
    store: Arc<dyn IdeaStore>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl Orchestrator {
    /// Fails only when the configured weights are invalid.
    pub fn new(
        config: OrchestratorConfig,
        generator: Arc<dyn StructuredGenerator>,
        store: Arc<dyn IdeaStore>,
    ) -> Result<Self> {
        let scorer = CompositeScorer::new(config.weights)?;
        Ok(Self {
            config,
            ctx: ChainContext {
                generator,
                scorer: Arc::new(scorer),
                novelty: None,
                event_tx: None,
            },
            store,
            analytics: Arc::new(NoopAnalytics),
        })
    }

    /// Build generator, store and orchestrator from loaded configuration.
    pub fn from_config(config: &CofounderConfig) -> anyhow::Result<Self> {
        let generator = config.llm.create_generator()?;
        let store = open_store(&config.storage)?;
        tracing::info!(
            backend = generator.name(),
            model = config.llm.resolved_model(),
            "Orchestrator ready"
        );
        Ok(Self::new(OrchestratorConfig::from(config), generator, store)?)
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Stream pipeline events into `tx`.
    pub fn with_event_channel(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.ctx.event_tx = Some(tx);
        self
    }

    /// Open an event channel sized by `event_buffer` and stream into it.
    /// Events past capacity are dropped until the receiver catches up.
    pub fn subscribe(self) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        (self.with_event_channel(tx), rx)
    }

    pub fn with_novelty_oracle(mut self, oracle: Arc<dyn NoveltyOracle>) -> Self {
        self.ctx.novelty = Some(oracle);
        self
    }

    /// Shared scorer; weight updates are seen by every later score.
    pub fn scorer(&self) -> Arc<CompositeScorer> {
        Arc::clone(&self.ctx.scorer)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn notify(&self, event: AnalyticsEvent) {
        if let Err(e) = self.analytics.notify(&event) {
            tracing::warn!(event = event.name(), "Analytics notification failed: {}", e);
        }
    }

    /// `generate` with the configured default count.
    pub async fn generate_default(
        &self,
        topic: &str,
        constraints: Constraints,
    ) -> Result<Vec<IdeaSnapshot>> {
        self.generate(topic, constraints, self.config.default_idea_count)
            .await
    }

    /// Generate, develop, score and persist `count` ideas for `topic`.
    /// The result is in generator order.
    #[tracing::instrument(skip(self, topic, constraints), fields(topic_preview = %topic.chars().take(50).collect::<String>()))]
    pub async fn generate(
        &self,
        topic: &str,
        constraints: Constraints,
        count: usize,
    ) -> Result<Vec<IdeaSnapshot>> {
        self.ctx.emit(
            PipelineEvent::new(PipelineEventKind::BatchStarted)
                .with_data(serde_json::json!({ "topic": topic, "count": count })),
        );

        if count == 0 {
            tracing::info!("No ideas requested");
            self.notify(AnalyticsEvent::IdeaGeneration {
                topic: topic.to_string(),
                count: 0,
            });
            return Ok(Vec::new());
        }

        let mut stage = PipelineStage::MarketAnalysis;
        let market_analysis = self
            .ctx
            .run_stage(
                MarketAnalystSkill,
                stage,
                None,
                &MarketAnalystInput::new(topic, constraints.clone()),
            )
            .await;
        stage.advance();

        let drafts = self
            .ctx
            .run_stage(
                IdeaGeneratorSkill,
                stage,
                None,
                &IdeaGeneratorInput {
                    topic: topic.to_string(),
                    constraints: constraints.clone(),
                    market_analysis: market_analysis.clone(),
                    count,
                },
            )
            .await;

        let snapshots: Vec<IdeaSnapshot> = drafts
            .into_iter()
            .map(|draft| {
                IdeaSnapshot::draft(topic, constraints.clone(), draft, market_analysis.clone())
            })
            .collect();

        let developed = self.develop(snapshots).await;

        let mut saved = Vec::with_capacity(developed.len());
        for snapshot in &developed {
            saved.push(self.store.save(snapshot).await?);
        }

        tracing::info!(ideas = saved.len(), "Idea batch persisted");
        self.notify(AnalyticsEvent::IdeaGeneration {
            topic: topic.to_string(),
            count: saved.len(),
        });
        self.ctx.emit(
            PipelineEvent::new(PipelineEventKind::BatchCompleted)
                .with_stage(PipelineStage::Complete)
                .with_data(serde_json::json!({
                    "ids": saved.iter().map(|s| s.id.as_str()).collect::<Vec<_>>()
                })),
        );
        Ok(saved)
    }

    /// Run the per-idea chains, bounded by `max_concurrent_ideas`.
    async fn develop(&self, drafts: Vec<IdeaSnapshot>) -> Vec<IdeaSnapshot> {
        let limit = self.config.max_concurrent_ideas.max(1);
        if limit == 1 || drafts.len() <= 1 {
            let mut developed = Vec::with_capacity(drafts.len());
            for draft in drafts {
                developed.push(self.ctx.clone().run_chain(draft).await);
            }
            return developed;
        }

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut join_set = JoinSet::new();
        let mut slots: Vec<Option<IdeaSnapshot>> = vec![None; drafts.len()];

        for (index, draft) in drafts.iter().cloned().enumerate() {
            let ctx = self.ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                (index, ctx.run_chain(draft).await)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, snapshot)) => slots[index] = Some(snapshot),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => tracing::error!("Idea chain cancelled: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(drafts)
            .map(|(slot, mut draft)| {
                slot.unwrap_or_else(|| {
                    if let Err(e) = draft.transition(IdeaStatus::Completed) {
                        tracing::error!(idea_id = %draft.id, "{}", e);
                    }
                    draft
                })
            })
            .collect()
    }

    /// Re-run one stage of a COMPLETED snapshot with user feedback and
    /// persist the result as the next version.
    #[tracing::instrument(skip(self, snapshot, feedback), fields(idea_id = %snapshot.id, version = snapshot.version, %iteration_type))]
    pub async fn iterate(
        &self,
        snapshot: &IdeaSnapshot,
        feedback: &str,
        iteration_type: IterationType,
    ) -> Result<IdeaSnapshot> {
        let mut next = snapshot.next_version()?;
        let feedback = feedback::normalize(Some(feedback)).map(str::to_string);

        self.ctx.emit(
            PipelineEvent::new(PipelineEventKind::IterationStarted)
                .with_idea(&next.id)
                .with_data(serde_json::json!({
                    "iteration_type": iteration_type.as_str(),
                    "version": next.version,
                })),
        );

        let id = next.id.clone();
        let idea = next.idea();
        match iteration_type {
            IterationType::Critique => {
                let critique = self
                    .ctx
                    .run_stage(
                        CriticSkill,
                        PipelineStage::Critique,
                        Some(&id),
                        &CriticInput {
                            idea,
                            market_analysis: next.market_analysis.clone(),
                            feedback,
                        },
                    )
                    .await;
                next.critic_output = Some(critique);
            }
            IterationType::Refinement => {
                let refinement = self
                    .ctx
                    .run_stage(
                        PmRefinerSkill,
                        PipelineStage::Refinement,
                        Some(&id),
                        &PmRefinerInput {
                            idea,
                            critique: next.critic_output.clone(),
                            feedback,
                            constraints: next.constraints.clone(),
                        },
                    )
                    .await;
                next.pm_refiner_output = Some(refinement);
            }
            IterationType::Synthesis => {
                let synthesis = self
                    .ctx
                    .run_stage(
                        SynthesizerSkill,
                        PipelineStage::Synthesis,
                        Some(&id),
                        &SynthesizerInput {
                            idea,
                            market_analysis: next.market_analysis.clone(),
                            refinement: next.pm_refiner_output.clone(),
                            feedback,
                        },
                    )
                    .await;
                next.synthesizer_output = Some(synthesis);
            }
            IterationType::MarketAnalysis => {
                let input = MarketAnalystInput {
                    topic: next.topic.clone(),
                    constraints: next.constraints.clone(),
                    feedback,
                };
                let analysis = self
                    .ctx
                    .run_stage(
                        MarketAnalystSkill,
                        PipelineStage::MarketAnalysis,
                        Some(&id),
                        &input,
                    )
                    .await;
                next.market_analyst_output = Some(analysis.clone());
                next.market_analysis = Some(analysis);
            }
            IterationType::General => {
                let description = self
                    .ctx
                    .run_stage(
                        RewriteSkill,
                        PipelineStage::Synthesis,
                        Some(&id),
                        &RewriteInput {
                            title: next.title.clone(),
                            description: next.description.clone(),
                            feedback: feedback.unwrap_or_default(),
                        },
                    )
                    .await;
                next.description = description;
            }
        }

        self.ctx.rescore(&mut next).await;
        next.transition(IdeaStatus::Completed)?;

        let saved = self.store.save(&next).await?;
        tracing::info!(version = saved.version, "Iteration persisted");

        self.notify(AnalyticsEvent::IdeaIteration {
            idea_id: saved.id.clone(),
            iteration_type: iteration_type.as_str().to_string(),
        });
        self.ctx.emit(
            PipelineEvent::new(PipelineEventKind::IterationCompleted)
                .with_stage(PipelineStage::Complete)
                .with_idea(&saved.id)
                .with_data(serde_json::json!({
                    "version": saved.version,
                    "overall_score": saved.overall_score,
                })),
        );
        Ok(saved)
    }

    /// Iterate the latest stored version of `id`.
    pub async fn iterate_by_id(
        &self,
        id: &str,
        feedback: &str,
        iteration_type: IterationType,
    ) -> Result<IdeaSnapshot> {
        let snapshot = self.require(id).await?;
        self.iterate(&snapshot, feedback, iteration_type).await
    }

    async fn require(&self, id: &str) -> Result<IdeaSnapshot> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::Persistence(StoreError::NotFound { id: id.to_string() }))
    }

    pub async fn get_idea(&self, id: &str) -> Result<Option<IdeaSnapshot>> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list_ideas(&self, query: &ListQuery) -> Result<Vec<IdeaSnapshot>> {
        Ok(self.store.list(query).await?)
    }

    /// All stored versions of `id`, oldest first.
    pub async fn idea_history(&self, id: &str) -> Result<Vec<IdeaSnapshot>> {
        Ok(self.store.history(id).await?)
    }

    pub async fn delete_idea(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete(id).await?)
    }

    /// Rank the latest versions of `ids`.
    pub async fn compare_ideas(&self, ids: &[&str]) -> Result<Comparison> {
        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            snapshots.push(self.require(id).await?);
        }
        Ok(compare(&snapshots))
    }

    /// Store feedback for an existing idea.
    pub async fn submit_feedback(&self, feedback: Feedback) -> Result<Feedback> {
        self.require(&feedback.idea_id).await?;
        Ok(self.store.save_feedback(&feedback).await?)
    }

    pub async fn feedback_for_idea(
        &self,
        idea_id: &str,
        page: usize,
        page_size: usize,
        feedback_type: Option<&str>,
    ) -> Result<Vec<Feedback>> {
        Ok(self
            .store
            .feedback_for_idea(idea_id, page, page_size, feedback_type)
            .await?)
    }

    /// Swap the scoring weights. Invalid weights leave the old ones in place.
    pub fn update_scoring_weights(&self, weights: ScoringWeights) -> Result<()> {
        Ok(self.ctx.scorer.update_weights(weights)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeightError;
    use crate::generation::OfflineGenerator;
    use crate::state::InMemoryStore;

    fn offline(config: OrchestratorConfig) -> Orchestrator {
        Orchestrator::new(
            config,
            Arc::new(OfflineGenerator::new()),
            Arc::new(InMemoryStore::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_events_follow_stage_order() {
        let (tx, mut rx) = mpsc::channel(64);
        let orchestrator = offline(OrchestratorConfig::default()).with_event_channel(tx);

        let ideas = orchestrator
            .generate("pet-sitting app", Constraints::new(), 1)
            .await
            .unwrap();
        assert_eq!(ideas.len(), 1);

        let mut kinds = Vec::new();
        let mut stages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
            if event.kind == PipelineEventKind::StageFellBack {
                stages.push(event.stage.unwrap());
            }
        }
        assert_eq!(kinds.first(), Some(&PipelineEventKind::BatchStarted));
        assert_eq!(kinds.last(), Some(&PipelineEventKind::BatchCompleted));
        assert!(kinds.contains(&PipelineEventKind::IdeaCompleted));
        assert_eq!(
            stages,
            vec![
                PipelineStage::MarketAnalysis,
                PipelineStage::IdeaGeneration,
                PipelineStage::Critique,
                PipelineStage::Refinement,
                PipelineStage::Synthesis,
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribe_uses_configured_buffer() {
        let config = OrchestratorConfig {
            event_buffer: 4,
            ..OrchestratorConfig::default()
        };
        let (orchestrator, mut rx) = offline(config).subscribe();
        assert_eq!(orchestrator.config().event_buffer, 4);

        orchestrator
            .generate("pet-sitting app", Constraints::new(), 1)
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event.kind);
        }
        assert_eq!(received.len(), 4);
        assert_eq!(received.first(), Some(&PipelineEventKind::BatchStarted));
    }

    #[tokio::test]
    async fn test_zero_count_skips_generation() {
        let orchestrator = offline(OrchestratorConfig::default());
        let ideas = orchestrator
            .generate("anything", Constraints::new(), 0)
            .await
            .unwrap();
        assert!(ideas.is_empty());
    }

    #[tokio::test]
    async fn test_iterate_requires_completed_snapshot() {
        let orchestrator = offline(OrchestratorConfig::default());
        let ideas = orchestrator
            .generate("anything", Constraints::new(), 1)
            .await
            .unwrap();

        let mut draft = ideas[0].clone();
        draft.status = IdeaStatus::Draft;
        let err = orchestrator
            .iterate(&draft, "more", IterationType::Critique)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transition(_)));
    }

    #[tokio::test]
    async fn test_iterate_unknown_id_is_not_found() {
        let orchestrator = offline(OrchestratorConfig::default());
        let err = orchestrator
            .iterate_by_id("missing", "x", IterationType::General)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Persistence(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_weights_rejected_at_construction() {
        let config = OrchestratorConfig {
            weights: ScoringWeights::new(0.5, 0.5, 0.5, 0.5),
            ..OrchestratorConfig::default()
        };
        let result = Orchestrator::new(
            config,
            Arc::new(OfflineGenerator::new()),
            Arc::new(InMemoryStore::new()),
        );
        assert!(matches!(
            result,
            Err(PipelineError::Weights(WeightError::SumOutOfTolerance { .. }))
        ));
    }

    #[test]
    fn test_weight_update_is_shared_with_scorer() {
        let orchestrator = offline(OrchestratorConfig::default());
        let weights = ScoringWeights::new(0.25, 0.25, 0.25, 0.25);
        orchestrator.update_scoring_weights(weights).unwrap();
        assert_eq!(orchestrator.scorer().weights(), weights);

        assert!(orchestrator
            .update_scoring_weights(ScoringWeights::new(1.0, 1.0, 0.0, 0.0))
            .is_err());
        assert_eq!(orchestrator.scorer().weights(), weights);
    }
}
