//! # Render Skill
//!
//! Turns the finished run state into three documents: the exam, the answer
//! key and the study notes. Blocking; the coordinator runs it on a blocking
//! worker and hands it the run state by value.

use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::RenderFailure;
use crate::render::{ArtifactStore, DocumentRenderer, ExamDocument, NotesHeader};
use crate::state::{RenderedPaths, RunState};

pub struct RenderSkill;

impl RenderSkill {
    /// Render all documents and give the state back with their paths.
    ///
    /// `cancel` is checked before each document; on cancellation or failure
    /// every file written so far is removed.
    pub fn run(
        state: RunState,
        renderer: &dyn DocumentRenderer,
        store: &ArtifactStore,
        cancel: &AtomicBool,
    ) -> Result<(RunState, RenderedPaths), RenderFailure> {
        let metadata = state
            .metadata()
            .ok_or(RenderFailure::MissingInput("exam metadata"))?;
        let notes = state
            .study_notes()
            .ok_or(RenderFailure::MissingInput("study notes"))?;
        if state.questions().is_empty() {
            return Err(RenderFailure::MissingInput("questions"));
        }

        let exam = ExamDocument {
            title: metadata.title.clone(),
            instructions: metadata.instructions.clone(),
            questions: state.questions().to_vec(),
            total_points: metadata.total_points,
            time_limit: metadata.time_limit.clone(),
        };
        let answer_key = ExamDocument {
            title: format!("{} - Answer Key", exam.title),
            ..exam.clone()
        };
        let request = state.request();
        let header = NotesHeader {
            topic: request.topic.clone(),
            subject: request.subject.clone(),
            education_level: request.education_level,
            difficulty: request.difficulty,
        };

        let set = store.allocate(
            &request.topic,
            request.difficulty,
            Local::now(),
            renderer.extension(),
        )?;

        let rendered = (|| -> Result<(), RenderFailure> {
            check(cancel)?;
            renderer.render_exam(&exam, false, &set.exam)?;
            check(cancel)?;
            renderer.render_exam(&answer_key, true, &set.answer_key)?;
            check(cancel)?;
            renderer.render_notes(notes, &header, &set.notes)?;
            check(cancel)
        })();
        if let Err(e) = rendered {
            set.remove_partial();
            return Err(e);
        }

        tracing::info!(exam = ?set.exam, "Rendered exam documents");
        let paths = RenderedPaths {
            exam_path: set.exam,
            answer_key_path: set.answer_key,
            notes_path: set.notes,
        };
        Ok((state, paths))
    }
}

fn check(cancel: &AtomicBool) -> Result<(), RenderFailure> {
    if cancel.load(Ordering::SeqCst) {
        return Err(RenderFailure::Aborted("run cancelled".to_string()));
    }
    Ok(())
}
