//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{GenerationFailure, RenderFailure};
use crate::generator::{ContentGenerator, Prompt, ResultShape};
use crate::pipeline::PipelineStage;
use crate::render::{DocumentRenderer, ExamDocument, MarkdownRenderer, NotesHeader};
use crate::skills::SkillContext;
use crate::state::*;

/// Deterministic generator that answers each stage with valid content and
/// records every prompt it sees
#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    topics: Option<Vec<String>>,
    fail_on: Option<PipelineStage>,
    fail_research_topic: Option<String>,
    delays: HashMap<PipelineStage, Duration>,
    prompts: Mutex<HashMap<PipelineStage, Vec<String>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic planner returns exactly these topics
    pub fn with_topics(mut self, topics: &[&str]) -> Self {
        self.topics = Some(topics.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn fail_on(mut self, stage: PipelineStage) -> Self {
        self.fail_on = Some(stage);
        self
    }

    /// Fail only the research branch for `topic`
    pub fn fail_research_topic(mut self, topic: &str) -> Self {
        self.fail_research_topic = Some(topic.to_string());
        self
    }

    pub fn with_delay(mut self, stage: PipelineStage, delay: Duration) -> Self {
        self.delays.insert(stage, delay);
        self
    }

    pub fn with_research_delay(self, delay: Duration) -> Self {
        self.with_delay(PipelineStage::ResearchingKnowledge, delay)
    }

    pub fn calls_for(&self, stage: PipelineStage) -> usize {
        self.prompts_for(stage).len()
    }

    pub fn prompts_for(&self, stage: PipelineStage) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .get(&stage)
            .cloned()
            .unwrap_or_default()
    }

    /// Highest number of concurrent `generate` calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, prompt: &Prompt) -> Result<Value, GenerationFailure> {
        if self.fail_on == Some(prompt.stage) {
            return Err(GenerationFailure::Unreachable("scripted failure".to_string()));
        }

        match prompt.stage {
            PipelineStage::PlanningTopics => {
                let topics = self.topics.clone().unwrap_or_else(|| {
                    let count = capture(&prompt.text, r"exactly (\d+) specific research topics")
                        .and_then(|n| n.parse().ok())
                        .unwrap_or(3);
                    (1..=count).map(|i| format!("subtopic {}", i)).collect()
                });
                Ok(json!({ "topics": topics }))
            }
            PipelineStage::ResearchingKnowledge => {
                let topic = capture(&prompt.text, r"Research topic: (.+)").unwrap_or_default();
                if self.fail_research_topic.as_deref() == Some(topic.as_str()) {
                    return Err(GenerationFailure::Timeout(30));
                }
                Ok(Value::String(format!("Key facts about {}.", topic)))
            }
            PipelineStage::GeneratingQuestions => {
                let count: usize = capture(&prompt.text, r"Number of questions: (\d+)")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(1);
                let types: Vec<QuestionType> =
                    capture(&prompt.text, r"Question types to include: (.+)")
                        .unwrap_or_default()
                        .split(", ")
                        .filter_map(|t| serde_json::from_value(Value::String(t.to_string())).ok())
                        .collect();
                let types = if types.is_empty() {
                    vec![QuestionType::ShortAnswer]
                } else {
                    types
                };
                let questions: Vec<Value> = (0..count)
                    .map(|i| scripted_question(i, types[i % types.len()]))
                    .collect();
                Ok(json!({ "questions": questions }))
            }
            PipelineStage::CompilingMetadata => Ok(json!({
                "title": "Scripted Exam",
                "instructions": "Answer every question.",
                "time_limit": "30 minutes",
            })),
            PipelineStage::GeneratingNotes => Ok(serde_json::to_value(sample_notes()).unwrap()),
            other => Err(GenerationFailure::invalid(
                "scripted",
                format!("no script for stage {}", other),
            )),
        }
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &Prompt,
        _shape: &ResultShape,
    ) -> Result<Value, GenerationFailure> {
        self.prompts
            .lock()
            .unwrap()
            .entry(prompt.stage)
            .or_default()
            .push(prompt.text.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&prompt.stage) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.respond(prompt)
    }
}

fn capture(text: &str, pattern: &str) -> Option<String> {
    Regex::new(pattern)
        .unwrap()
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

fn scripted_question(index: usize, kind: QuestionType) -> Value {
    let mut question = json!({
        "question_type": kind,
        "question_text": format!("Scripted question {}", index + 1),
        "correct_answer": "scripted answer",
    });
    if kind == QuestionType::MultipleChoice {
        question["options"] = json!(["A. Water", "B. Oxygen", "C. Glucose", "D. Nitrogen"]);
        question["correct_answer"] = json!("B");
    }
    question
}

pub(crate) fn context(generator: Arc<ScriptedGenerator>) -> SkillContext {
    SkillContext::new(generator, "English")
}

/// Study notes with every section populated
pub(crate) fn sample_notes() -> StudyNotes {
    StudyNotes {
        topic_overview: "Plants turn light into chemical energy.".to_string(),
        learning_objectives: vec!["Describe the light reactions".to_string()],
        knowledge_points: vec![KnowledgePoint {
            title: "Chlorophyll".to_string(),
            definition: "The green pigment that absorbs light.".to_string(),
            content: "Found in the thylakoid membranes.".to_string(),
            importance: "core".to_string(),
            examples: vec!["Leaves look green".to_string()],
            key_points: vec!["Absorbs red and blue light".to_string()],
            common_mistakes: Some(vec!["Thinking it absorbs green".to_string()]),
            connections: None,
        }],
        study_tips: vec![StudyTip {
            category: "memorisation".to_string(),
            title: "Draw the cycle".to_string(),
            content: "Sketch inputs and outputs.".to_string(),
            steps: vec!["Draw the chloroplast".to_string()],
            applicable_scenarios: vec!["Revision".to_string()],
            examples: None,
            effectiveness: Some("Works well for visual learners".to_string()),
        }],
        extended_knowledge: vec![ExtendedKnowledge {
            title: "C4 plants".to_string(),
            content: "Some plants concentrate carbon dioxide.".to_string(),
            connection: "A variant of carbon fixation.".to_string(),
            difficulty_level: "hard".to_string(),
            applications: vec!["Maize farming".to_string()],
            historical_context: None,
            cross_subject_links: Some(vec!["Chemistry".to_string()]),
        }],
        summary: "Light energy becomes glucose.".to_string(),
        knowledge_structure: "Light reactions feed the Calvin cycle.".to_string(),
        practice_recommendations: vec![PracticeRecommendation {
            level: "basic".to_string(),
            title: "Label a diagram".to_string(),
            description: "Label the parts of a chloroplast.".to_string(),
            methods: vec!["Use flashcards".to_string()],
            time_suggestion: "15 minutes".to_string(),
        }],
        learning_resources: vec![LearningResource {
            kind: "website".to_string(),
            title: "Plant Biology Online".to_string(),
            description: "Interactive diagrams.".to_string(),
            recommendation_reason: "Clear animations.".to_string(),
        }],
        faqs: vec![Faq {
            question: "Why are leaves green?".to_string(),
            answer: "Chlorophyll reflects green light.".to_string(),
            category: "concept".to_string(),
        }],
        self_assessment: vec!["Explain the role of water".to_string()],
    }
}

/// Run state with everything but the rendered paths set
pub(crate) fn completed_state() -> RunState {
    let mut state = RunState::new(RunRequest::new("photosynthesis").with_subject("biology"));
    state
        .apply(PartialUpdate::Topics(vec!["light reactions".to_string()]))
        .unwrap();
    state
        .apply(PartialUpdate::Finding(ResearchFinding {
            branch_index: 0,
            topic: "light reactions".to_string(),
            content: "Water is split to release oxygen.".to_string(),
        }))
        .unwrap();
    state
        .apply(PartialUpdate::Questions(vec![Question {
            question_id: 1,
            question_type: QuestionType::MultipleChoice,
            question_text: "Which gas is released?".to_string(),
            options: Some(vec!["Carbon dioxide".to_string(), "Oxygen".to_string()]),
            correct_answer: Some("Oxygen".to_string()),
            points: 2,
            explanation: None,
        }]))
        .unwrap();
    state
        .apply(PartialUpdate::Metadata(ExamMetadata {
            title: "Photosynthesis Quiz".to_string(),
            instructions: "Answer all questions.".to_string(),
            total_points: 2,
            time_limit: "5 minutes".to_string(),
        }))
        .unwrap();
    state.apply(PartialUpdate::Notes(sample_notes())).unwrap();
    state
}

/// Writes the exam, then fails on the answer key
pub(crate) struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render_exam(
        &self,
        exam: &ExamDocument,
        include_answers: bool,
        path: &Path,
    ) -> Result<(), RenderFailure> {
        if include_answers {
            let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
            return Err(RenderFailure::io(path, err));
        }
        MarkdownRenderer::new().render_exam(exam, false, path)
    }

    fn render_notes(
        &self,
        _notes: &StudyNotes,
        _header: &NotesHeader,
        _path: &Path,
    ) -> Result<(), RenderFailure> {
        Ok(())
    }
}

/// Markdown renderer that pauses before writing each document
pub(crate) struct SlowRenderer {
    pub delay: Duration,
}

impl DocumentRenderer for SlowRenderer {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render_exam(
        &self,
        exam: &ExamDocument,
        include_answers: bool,
        path: &Path,
    ) -> Result<(), RenderFailure> {
        std::thread::sleep(self.delay);
        MarkdownRenderer::new().render_exam(exam, include_answers, path)
    }

    fn render_notes(
        &self,
        notes: &StudyNotes,
        header: &NotesHeader,
        path: &Path,
    ) -> Result<(), RenderFailure> {
        std::thread::sleep(self.delay);
        MarkdownRenderer::new().render_notes(notes, header, path)
    }
}
