//! # Pipeline Coordinator
//!
//! Drives one run through the stage sequence, owns the run state, performs
//! the research fan-out/fan-in and reports progress. Any stage or branch
//! failure ends the run in `Failed` with a single `error` event; a
//! subscriber that disconnects cancels the run.

use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::channel::ProgressChannel;
use super::events::ProgressEvent;
use super::fan_out::FanOut;
use super::stage::{Pipeline, PipelineStage};
use crate::config::PipelineConfig;
use crate::error::{FailureCause, RenderFailure, RunFailure, StageFailure};
use crate::generator::{ContentGenerator, OpenAiCompatibleGenerator, RetryingGenerator};
use crate::render::{ArtifactStore, DocumentRenderer, MarkdownRenderer};
use crate::skills::{
    MetadataSkill, NotesSkill, QuestionSkill, RenderSkill, SkillContext, TopicPlannerSkill,
};
use crate::state::{PartialUpdate, ResearchBranch, RunRequest, RunResult, RunState};

/// Events buffered between a streaming run and its subscriber
pub const EVENT_BUFFER: usize = 64;

/// How the caller wants to observe a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Wait for the terminal state
    Synchronous,
    /// Receive every event as it is produced
    Streaming,
}

/// What [`Coordinator::start`] hands back
pub enum RunHandle {
    Finished(RunReport),
    Streaming(mpsc::Receiver<ProgressEvent>),
}

/// Outcome of a run plus every event it emitted
#[derive(Debug)]
pub struct RunReport {
    pub result: Result<RunResult, RunFailure>,
    pub events: Vec<ProgressEvent>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// The pipeline coordinator
pub struct Coordinator {
    generator: Arc<dyn ContentGenerator>,
    renderer: Arc<dyn DocumentRenderer>,
    store: ArtifactStore,
    language: String,
    max_concurrent_branches: usize,
}

impl Coordinator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        renderer: Arc<dyn DocumentRenderer>,
        store: ArtifactStore,
    ) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            generator,
            renderer,
            store,
            language: defaults.language,
            max_concurrent_branches: defaults.max_concurrent_branches,
        }
    }

    /// Coordinator backed by the OpenAI-compatible generator and the
    /// Markdown renderer
    pub fn from_config(config: &PipelineConfig) -> anyhow::Result<Self> {
        let generator: Arc<dyn ContentGenerator> =
            Arc::new(OpenAiCompatibleGenerator::from_config(config)?);
        let generator = RetryingGenerator::wrap(generator, config.attempts());

        Ok(Self::new(
            generator,
            Arc::new(MarkdownRenderer::new()),
            ArtifactStore::new(&config.output_dir),
        )
        .with_language(config.language.clone())
        .with_max_concurrent_branches(config.max_concurrent_branches))
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Limit research branches in flight (0 = unbounded)
    pub fn with_max_concurrent_branches(mut self, limit: usize) -> Self {
        self.max_concurrent_branches = limit;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Start a run in either mode
    pub async fn start(self: &Arc<Self>, request: RunRequest, mode: StartMode) -> RunHandle {
        match mode {
            StartMode::Synchronous => RunHandle::Finished(self.run(request).await),
            StartMode::Streaming => RunHandle::Streaming(self.start_streaming(request)),
        }
    }

    /// Run to completion without a subscriber
    pub async fn run(&self, request: RunRequest) -> RunReport {
        self.run_with_channel(request, ProgressChannel::detached())
            .await
    }

    /// Spawn the run and return the subscriber end of its channel. Dropping
    /// the receiver cancels the run.
    pub fn start_streaming(self: &Arc<Self>, request: RunRequest) -> mpsc::Receiver<ProgressEvent> {
        let (channel, rx) = ProgressChannel::open(EVENT_BUFFER);
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run_with_channel(request, channel).await;
        });
        rx
    }

    /// Run, reporting progress on `channel`, and close it exactly once
    #[tracing::instrument(
        skip(self, request, channel),
        fields(topic = %request.topic, questions = request.question_count)
    )]
    pub async fn run_with_channel(
        &self,
        request: RunRequest,
        mut channel: ProgressChannel,
    ) -> RunReport {
        let mut pipeline = Pipeline::new();
        let ctx = SkillContext::new(Arc::clone(&self.generator), self.language.clone());

        let outcome = self.drive(request, &mut pipeline, &mut channel, &ctx).await;

        match outcome {
            Ok((result, payload)) => {
                tracing::info!(questions = result.questions.len(), "Exam generation completed");
                let events = channel
                    .close(
                        ProgressEvent::new(
                            PipelineStage::Completed,
                            "Exam generation complete",
                            100.0,
                        )
                        .with_result(payload),
                    )
                    .await;
                RunReport {
                    result: Ok(result),
                    events,
                }
            }
            Err(RunFailure::Cancelled) => {
                let stage = pipeline.fail();
                tracing::info!(%stage, "Run cancelled by subscriber");
                RunReport {
                    result: Err(RunFailure::Cancelled),
                    events: channel.abandon(),
                }
            }
            Err(failure) => {
                let stage = pipeline.fail();
                tracing::warn!(%stage, "Exam generation failed: {}", failure);
                let progress = channel.last_progress();
                let events = channel
                    .close(
                        ProgressEvent::new(
                            PipelineStage::Failed,
                            format!("Generation failed during {}", stage),
                            progress,
                        )
                        .with_error(failure.to_string())
                        .with_data(json!({ "stage": stage.wire_name() })),
                    )
                    .await;
                RunReport {
                    result: Err(failure),
                    events,
                }
            }
        }
    }

    async fn drive(
        &self,
        request: RunRequest,
        pipeline: &mut Pipeline,
        channel: &mut ProgressChannel,
        ctx: &SkillContext,
    ) -> Result<(RunResult, serde_json::Value), RunFailure> {
        // Initializing
        let (start, _) = pipeline.stage.progress_span();
        emit(channel, ProgressEvent::new(pipeline.stage, "Initializing exam generation", start))
            .await?;
        request.validate()?;
        let request = Arc::new(request);
        let mut state = RunState::new(RunRequest::clone(&request));

        // PlanningTopics
        let stage = pipeline.advance();
        let (start, end) = stage.progress_span();
        tracing::info!(%stage, "Planning research topics");
        emit(channel, ProgressEvent::new(stage, "Planning research topics", start)).await?;

        let planned = guard(channel, TopicPlannerSkill::run(&request, ctx))
            .await?
            .map_err(|e| StageFailure::new(stage, e))?;
        let fallback = planned.is_empty();
        let topics = if fallback {
            tracing::warn!("Topic planner returned no topics, researching the requested topic");
            vec![request.topic.clone()]
        } else {
            planned
        };
        state
            .apply(PartialUpdate::Topics(topics.clone()))
            .map_err(|e| StageFailure::new(stage, e))?;
        emit(
            channel,
            ProgressEvent::new(stage, format!("Planned {} research topics", topics.len()), end)
                .with_data(json!({ "topics": topics, "fallback": fallback })),
        )
        .await?;

        // ResearchingKnowledge
        let stage = pipeline.advance();
        self.research(stage, &request, &topics, &mut state, channel, ctx)
            .await?;

        // GeneratingQuestions
        let stage = pipeline.advance();
        let (start, end) = stage.progress_span();
        tracing::info!(%stage, "Writing questions");
        emit(channel, ProgressEvent::new(stage, "Writing exam questions", start)).await?;

        let blob = state.findings_blob();
        let questions = guard(channel, QuestionSkill::run(&request, &blob, ctx))
            .await?
            .map_err(|e| StageFailure::new(stage, e))?;
        let question_count = questions.len();
        state
            .apply(PartialUpdate::Questions(questions))
            .map_err(|e| StageFailure::new(stage, e))?;
        emit(
            channel,
            ProgressEvent::new(stage, format!("Wrote {} questions", question_count), end)
                .with_data(json!({ "question_count": question_count })),
        )
        .await?;

        // CompilingMetadata
        let stage = pipeline.advance();
        let (start, end) = stage.progress_span();
        tracing::info!(%stage, "Compiling exam metadata");
        emit(channel, ProgressEvent::new(stage, "Compiling exam metadata", start)).await?;

        let metadata = guard(channel, MetadataSkill::run(&request, state.questions(), ctx))
            .await?
            .map_err(|e| StageFailure::new(stage, e))?;
        let data = json!({
            "title": metadata.title,
            "total_points": metadata.total_points,
            "time_limit": metadata.time_limit,
        });
        state
            .apply(PartialUpdate::Metadata(metadata))
            .map_err(|e| StageFailure::new(stage, e))?;
        emit(
            channel,
            ProgressEvent::new(stage, "Exam metadata compiled", end).with_data(data),
        )
        .await?;

        // GeneratingNotes
        let stage = pipeline.advance();
        let (start, end) = stage.progress_span();
        tracing::info!(%stage, "Writing study notes");
        emit(channel, ProgressEvent::new(stage, "Writing study notes", start)).await?;

        let notes = guard(channel, NotesSkill::run(&request, &blob, ctx))
            .await?
            .map_err(|e| StageFailure::new(stage, e))?;
        let knowledge_points = notes.knowledge_points.len();
        state
            .apply(PartialUpdate::Notes(notes))
            .map_err(|e| StageFailure::new(stage, e))?;
        emit(
            channel,
            ProgressEvent::new(stage, "Study notes written", end)
                .with_data(json!({ "knowledge_points": knowledge_points })),
        )
        .await?;

        // RenderingDocuments
        let stage = pipeline.advance();
        let (start, _) = stage.progress_span();
        tracing::info!(%stage, "Rendering documents");
        emit(channel, ProgressEvent::new(stage, "Rendering documents", start)).await?;

        let state = self.render(stage, state, channel).await?;

        let result = state.into_result().ok_or_else(|| {
            StageFailure::new(
                stage,
                FailureCause::Internal("run state incomplete after rendering".to_string()),
            )
        })?;
        let payload = serde_json::to_value(&result).map_err(|e| {
            StageFailure::new(
                stage,
                FailureCause::Internal(format!("result is not serializable: {}", e)),
            )
        })?;

        pipeline.advance();
        Ok((result, payload))
    }

    /// Fan out one research branch per topic and wait for all of them
    async fn research(
        &self,
        stage: PipelineStage,
        request: &Arc<RunRequest>,
        topics: &[String],
        state: &mut RunState,
        channel: &mut ProgressChannel,
        ctx: &SkillContext,
    ) -> Result<(), RunFailure> {
        let (start, end) = stage.progress_span();
        let total = topics.len();
        tracing::info!(%stage, branches = total, "Researching topics");
        emit(
            channel,
            ProgressEvent::new(stage, format!("Researching {} topics", total), start)
                .with_data(json!({ "total": total })),
        )
        .await?;

        let branches = topics
            .iter()
            .enumerate()
            .map(|(branch_index, topic)| ResearchBranch {
                branch_index,
                topic: topic.clone(),
                parent_topic: request.topic.clone(),
                difficulty: request.difficulty,
            })
            .collect();
        let limit = (self.max_concurrent_branches > 0).then_some(self.max_concurrent_branches);
        let mut fan_out = FanOut::spawn(branches, Arc::clone(request), ctx, limit);

        // GATHER: the stage completes only after every branch has reported
        let mut first_failure: Option<FailureCause> = None;
        let mut completed = 0usize;
        while let Some(joined) = guard(channel, fan_out.next()).await? {
            completed += 1;
            let progress = start + (end - start) * completed as f64 / total as f64;

            match joined {
                Ok(Ok(finding)) => {
                    let event = ProgressEvent::new(stage, format!("Researched: {}", finding.topic), progress)
                        .with_data(json!({
                            "branch_index": finding.branch_index,
                            "topic": finding.topic,
                            "completed": completed,
                            "total": total,
                        }));
                    if let Err(conflict) = state.apply(PartialUpdate::Finding(finding)) {
                        first_failure.get_or_insert(conflict.into());
                    }
                    emit(channel, event).await?;
                }
                Ok(Err(failure)) => {
                    tracing::warn!(branch = failure.branch_index, "{}", failure);
                    emit(
                        channel,
                        ProgressEvent::new(stage, format!("Research failed: {}", failure.topic), progress)
                            .with_data(json!({
                                "branch_index": failure.branch_index,
                                "topic": failure.topic,
                                "completed": completed,
                                "total": total,
                                "failed": true,
                            })),
                    )
                    .await?;
                    first_failure.get_or_insert(failure.into());
                }
                Err(join_error) => {
                    tracing::warn!("Research task failed: {}", join_error);
                    first_failure.get_or_insert(FailureCause::Internal(format!(
                        "research task failed: {}",
                        join_error
                    )));
                }
            }
        }

        match first_failure {
            Some(cause) => Err(StageFailure { stage, cause }.into()),
            None => Ok(()),
        }
    }

    /// Hand the state to a blocking worker and take it back with the
    /// rendered paths merged in
    async fn render(
        &self,
        stage: PipelineStage,
        state: RunState,
        channel: &ProgressChannel,
    ) -> Result<RunState, RunFailure> {
        let cancel = CancelOnDrop(Arc::new(AtomicBool::new(false)));
        let renderer = Arc::clone(&self.renderer);
        let store = self.store.clone();
        let flag = Arc::clone(&cancel.0);
        let mut task = tokio::task::spawn_blocking(move || {
            RenderSkill::run(state, renderer.as_ref(), &store, &flag)
        });

        let finished = tokio::select! {
            biased;
            _ = channel.cancelled() => None,
            joined = &mut task => Some(joined),
        };
        let Some(joined) = finished else {
            cancel.0.store(true, Ordering::SeqCst);
            // Let the worker stop, then drop whatever it finished
            if let Ok(Ok((_, paths))) = task.await {
                for path in [paths.exam_path, paths.answer_key_path, paths.notes_path] {
                    let _ = std::fs::remove_file(path);
                }
            }
            return Err(RunFailure::Cancelled);
        };

        let (mut state, paths) = match joined {
            Ok(Ok(rendered)) => rendered,
            Ok(Err(failure)) => return Err(StageFailure::new(stage, failure).into()),
            Err(join_error) => {
                return Err(
                    StageFailure::new(stage, RenderFailure::Aborted(join_error.to_string())).into(),
                )
            }
        };
        state
            .apply(PartialUpdate::Rendered(paths))
            .map_err(|e| StageFailure::new(stage, e))?;
        Ok(state)
    }
}

/// Raises the render cancel flag when dropped, so a run future dropped
/// mid-render stops its worker too
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Emit a progress event; a gone subscriber cancels the run
async fn emit(channel: &mut ProgressChannel, event: ProgressEvent) -> Result<(), RunFailure> {
    channel.emit(event).await.map_err(|_| RunFailure::Cancelled)
}

/// Await `fut` unless the subscriber disconnects first
async fn guard<F: Future>(channel: &ProgressChannel, fut: F) -> Result<F::Output, RunFailure> {
    tokio::select! {
        biased;
        _ = channel.cancelled() => Err(RunFailure::Cancelled),
        output = fut => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCause;
    use crate::state::QuestionType;
    use crate::testing::{FailingRenderer, ScriptedGenerator, SlowRenderer};
    use std::path::Path;
    use std::time::Duration;

    fn coordinator(generator: Arc<ScriptedGenerator>, dir: &Path) -> Coordinator {
        Coordinator::new(
            generator,
            Arc::new(MarkdownRenderer::new()),
            ArtifactStore::new(dir),
        )
        .with_language("English")
    }

    fn request() -> RunRequest {
        RunRequest::new("photosynthesis")
            .with_subject("biology")
            .with_question_count(6)
            .with_question_types([QuestionType::MultipleChoice, QuestionType::ShortAnswer])
    }

    fn assert_well_formed(events: &[ProgressEvent]) {
        let values: Vec<f64> = events.iter().map(|e| e.progress.value()).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "progress regressed: {:?}", values);

        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert!(events.last().unwrap().is_terminal());
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_successful_run_walks_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::new());
        let report = coordinator(generator.clone(), dir.path()).run(request()).await;

        assert!(report.is_success());
        assert_well_formed(&report.events);

        let first = &report.events[0];
        assert_eq!(first.step, PipelineStage::Initializing);
        assert_eq!(first.progress.value(), 5.0);

        let mut steps: Vec<PipelineStage> = report.events.iter().map(|e| e.step).collect();
        steps.dedup();
        assert_eq!(
            steps,
            vec![
                PipelineStage::Initializing,
                PipelineStage::PlanningTopics,
                PipelineStage::ResearchingKnowledge,
                PipelineStage::GeneratingQuestions,
                PipelineStage::CompilingMetadata,
                PipelineStage::GeneratingNotes,
                PipelineStage::RenderingDocuments,
                PipelineStage::Completed,
            ]
        );

        let last = report.events.last().unwrap();
        assert_eq!(last.progress.value(), 100.0);
        assert_eq!(last.result.as_ref().unwrap()["success"], true);
        assert!(last.result.as_ref().unwrap()["pdf_path"].is_string());

        let result = report.result.unwrap();
        assert_eq!(result.questions.len(), 6);
        assert_eq!(result.topics.len(), 3);
        assert_eq!(result.exam_title, "Scripted Exam");
        assert!(Path::new(&result.exam_path).exists());
        assert!(Path::new(&result.answer_key_path).exists());
        assert!(Path::new(&result.notes_path).exists());

        assert_eq!(generator.calls_for(PipelineStage::PlanningTopics), 1);
        assert_eq!(generator.calls_for(PipelineStage::ResearchingKnowledge), 3);
        assert_eq!(generator.calls_for(PipelineStage::GeneratingQuestions), 1);
    }

    #[tokio::test]
    async fn test_research_progress_advances_per_branch() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::new());
        let report = coordinator(generator, dir.path()).run(request()).await;

        let research: Vec<f64> = report
            .events
            .iter()
            .filter(|e| e.step == PipelineStage::ResearchingKnowledge)
            .map(|e| e.progress.value())
            .collect();
        assert_eq!(research, vec![35.0, 40.0, 45.0, 50.0]);
    }

    #[tokio::test]
    async fn test_questions_see_every_finding() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(
            ScriptedGenerator::new().with_topics(&["light reactions", "Calvin cycle", "stomata"]),
        );
        coordinator(generator.clone(), dir.path()).run(request()).await;

        let prompt = &generator.prompts_for(PipelineStage::GeneratingQuestions)[0];
        for topic in ["light reactions", "Calvin cycle", "stomata"] {
            assert!(prompt.contains(&format!("Key facts about {}.", topic)));
        }
    }

    #[tokio::test]
    async fn test_empty_plan_falls_back_to_request_topic() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::new().with_topics(&[]));
        let report = coordinator(generator.clone(), dir.path()).run(request()).await;

        assert!(report.is_success());
        let research = generator.prompts_for(PipelineStage::ResearchingKnowledge);
        assert_eq!(research.len(), 1);
        assert!(research[0].contains("Research topic: photosynthesis"));

        let planned = report
            .events
            .iter()
            .find(|e| e.step == PipelineStage::PlanningTopics && e.data.is_some())
            .unwrap();
        assert_eq!(planned.data.as_ref().unwrap()["fallback"], true);
        assert_eq!(report.result.unwrap().topics, vec!["photosynthesis"]);
    }

    #[tokio::test]
    async fn test_branch_failure_fails_run_after_barrier() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(
            ScriptedGenerator::new()
                .with_topics(&["food webs", "biomes", "succession", "symbiosis"])
                .fail_research_topic("biomes"),
        );
        let report = coordinator(generator.clone(), dir.path()).run(request()).await;

        match report.result.as_ref().unwrap_err() {
            RunFailure::Stage(failure) => {
                assert_eq!(failure.stage, PipelineStage::ResearchingKnowledge);
                match &failure.cause {
                    FailureCause::Branch(branch) => assert_eq!(branch.topic, "biomes"),
                    other => panic!("unexpected cause: {:?}", other),
                }
            }
            other => panic!("unexpected failure: {:?}", other),
        }

        // Every branch ran to completion, nothing downstream did
        assert_eq!(generator.calls_for(PipelineStage::ResearchingKnowledge), 4);
        assert_eq!(generator.calls_for(PipelineStage::GeneratingQuestions), 0);
        assert_well_formed(&report.events);

        let branch_events = report
            .events
            .iter()
            .filter(|e| e.data.as_ref().is_some_and(|d| d.get("branch_index").is_some()))
            .count();
        assert_eq!(branch_events, 4);

        let failed_branch = report
            .events
            .iter()
            .find(|e| e.data.as_ref().is_some_and(|d| d["failed"] == true))
            .unwrap();
        assert_eq!(failed_branch.data.as_ref().unwrap()["topic"], "biomes");

        let n = report.events.len();
        let last = &report.events[n - 1];
        assert_eq!(last.step, PipelineStage::Failed);
        assert!(last.error.as_ref().unwrap().contains("biomes"));
        assert_eq!(last.data.as_ref().unwrap()["stage"], "research_knowledge");
        assert_eq!(last.progress, report.events[n - 2].progress);
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stage_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::new().fail_on(PipelineStage::GeneratingNotes));
        let report = coordinator(generator, dir.path()).run(request()).await;

        let failure = report.result.as_ref().unwrap_err();
        assert_eq!(failure.stage(), PipelineStage::GeneratingNotes);
        assert!(report
            .events
            .iter()
            .all(|e| e.step != PipelineStage::RenderingDocuments));
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_question_failure_skips_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            Arc::new(ScriptedGenerator::new().fail_on(PipelineStage::GeneratingQuestions));
        let report = coordinator(generator.clone(), dir.path()).run(request()).await;

        let failure = report.result.as_ref().unwrap_err();
        assert_eq!(failure.stage(), PipelineStage::GeneratingQuestions);
        assert_eq!(generator.calls_for(PipelineStage::CompilingMetadata), 0);
        assert_well_formed(&report.events);

        let errors: Vec<&ProgressEvent> = report
            .events
            .iter()
            .filter(|e| e.step == PipelineStage::Failed)
            .collect();
        assert_eq!(errors.len(), 1);

        let n = report.events.len();
        let before = &report.events[n - 2];
        assert_eq!(before.step, PipelineStage::GeneratingQuestions);
        assert_eq!(before.progress.value(), 55.0);
        let last = &report.events[n - 1];
        assert_eq!(last.step, PipelineStage::Failed);
        assert_eq!(last.progress.value(), 55.0);
        assert_eq!(last.data.as_ref().unwrap()["stage"], "generate_questions");
        assert!(report
            .events
            .iter()
            .all(|e| e.data.as_ref().map_or(true, |d| d.get("title").is_none())));
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_render_failure_fails_render_stage() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::new(
            Arc::new(ScriptedGenerator::new()),
            Arc::new(FailingRenderer),
            ArtifactStore::new(dir.path()),
        )
        .with_language("English");

        let report = coordinator.run(request()).await;

        match report.result.as_ref().unwrap_err() {
            RunFailure::Stage(failure) => {
                assert_eq!(failure.stage, PipelineStage::RenderingDocuments);
                assert!(matches!(failure.cause, FailureCause::Render(_)));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
        assert_well_formed(&report.events);
        let last = report.events.last().unwrap();
        assert_eq!(last.data.as_ref().unwrap()["stage"], "generate_pdf");
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_dropped_run_stops_render_worker() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::new(
            Arc::new(ScriptedGenerator::new()),
            Arc::new(SlowRenderer {
                delay: Duration::from_millis(300),
            }),
            ArtifactStore::new(dir.path()),
        )
        .with_language("English");

        let outcome =
            tokio::time::timeout(Duration::from_millis(100), coordinator.run(request())).await;
        assert!(outcome.is_err());

        // The detached worker notices the flag after its current document
        for _ in 0..100 {
            if files_in(dir.path()) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(files_in(dir.path()), 0);
    }

    #[test]
    fn test_invalid_request_fails_before_any_stage() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::new());
        let coordinator = coordinator(generator.clone(), dir.path());

        let report = tokio_test::block_on(coordinator.run(request().with_question_count(0)));

        assert!(matches!(report.result, Err(RunFailure::InvalidRequest(_))));
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.events[1].data.as_ref().unwrap()["stage"], "initializing");
        assert_eq!(report.events[1].progress.value(), 5.0);
        assert_eq!(generator.calls_for(PipelineStage::PlanningTopics), 0);
    }

    #[tokio::test]
    async fn test_streaming_delivers_every_event() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Arc::new(coordinator(Arc::new(ScriptedGenerator::new()), dir.path()));

        let mut rx = match coordinator.start(request(), StartMode::Streaming).await {
            RunHandle::Streaming(rx) => rx,
            RunHandle::Finished(_) => panic!("expected a stream"),
        };
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_well_formed(&events);
        assert_eq!(events.last().unwrap().step, PipelineStage::Completed);
    }

    #[tokio::test]
    async fn test_synchronous_start_returns_report() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = Arc::new(coordinator(Arc::new(ScriptedGenerator::new()), dir.path()));

        match coordinator.start(request(), StartMode::Synchronous).await {
            RunHandle::Finished(report) => assert!(report.is_success()),
            RunHandle::Streaming(_) => panic!("expected a finished report"),
        }
    }

    #[tokio::test]
    async fn test_dropping_subscriber_cancels_run() {
        let dir = tempfile::tempdir().unwrap();
        let generator =
            Arc::new(ScriptedGenerator::new().with_research_delay(Duration::from_millis(500)));
        let coordinator = Arc::new(coordinator(generator.clone(), dir.path()));

        let mut rx = coordinator.start_streaming(request());
        while let Some(event) = rx.recv().await {
            if event.step == PipelineStage::ResearchingKnowledge {
                break;
            }
        }
        drop(rx);

        // The run task releases its handle once it has wound down
        for _ in 0..100 {
            if Arc::strong_count(&coordinator) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(Arc::strong_count(&coordinator), 1);
        assert_eq!(generator.calls_for(PipelineStage::GeneratingQuestions), 0);
        assert_eq!(files_in(dir.path()), 0);
    }
}
