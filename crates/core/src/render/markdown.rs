//! Markdown exam papers and study notes.

use std::fmt::Write as _;
use std::path::Path;

use super::{DocumentRenderer, ExamDocument, NotesHeader};
use crate::error::RenderFailure;
use crate::state::{subject_description, Question, QuestionType, StudyNotes};

const OPTION_LABELS: [char; 8] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn exam_markdown(&self, exam: &ExamDocument, include_answers: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", exam.title);
        let _ = writeln!(
            out,
            "**Total points:** {} | **Time limit:** {} | **Questions:** {}\n",
            exam.total_points,
            exam.time_limit,
            exam.questions.len()
        );
        if !exam.instructions.is_empty() {
            let _ = writeln!(out, "## Instructions\n\n{}\n", exam.instructions);
        }

        // Consecutive questions of one type share a section heading
        let mut current: Option<QuestionType> = None;
        for question in &exam.questions {
            if current != Some(question.question_type) {
                let _ = writeln!(out, "## {}\n", question.question_type.display_name());
                current = Some(question.question_type);
            }
            write_question(&mut out, question, include_answers);
        }
        out
    }

    pub fn notes_markdown(&self, notes: &StudyNotes, header: &NotesHeader) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Study Notes: {}\n", header.topic);
        let _ = writeln!(
            out,
            "**Subject:** {} | **Level:** {} | **Difficulty:** {}\n",
            subject_description(&header.subject),
            header.education_level.description(),
            header.difficulty
        );

        section(&mut out, "Overview", &notes.topic_overview);
        bullets(&mut out, "Learning Objectives", &notes.learning_objectives);

        if !notes.knowledge_points.is_empty() {
            let _ = writeln!(out, "## Knowledge Points\n");
            for (i, kp) in notes.knowledge_points.iter().enumerate() {
                let _ = writeln!(out, "### {}. {} ({})\n", i + 1, kp.title, kp.importance);
                let _ = writeln!(out, "**Definition:** {}\n\n{}\n", kp.definition, kp.content);
                sub_bullets(&mut out, "Key points", &kp.key_points);
                sub_bullets(&mut out, "Examples", &kp.examples);
                if let Some(mistakes) = &kp.common_mistakes {
                    sub_bullets(&mut out, "Common mistakes", mistakes);
                }
                if let Some(links) = &kp.connections {
                    sub_bullets(&mut out, "Connections", links);
                }
            }
        }

        if !notes.study_tips.is_empty() {
            let _ = writeln!(out, "## Study Tips\n");
            for tip in &notes.study_tips {
                let _ = writeln!(out, "### {} [{}]\n\n{}\n", tip.title, tip.category, tip.content);
                numbered(&mut out, &tip.steps);
                sub_bullets(&mut out, "When to use", &tip.applicable_scenarios);
                if let Some(examples) = &tip.examples {
                    sub_bullets(&mut out, "Examples", examples);
                }
                if let Some(effect) = &tip.effectiveness {
                    let _ = writeln!(out, "*{}*\n", effect);
                }
            }
        }

        if !notes.extended_knowledge.is_empty() {
            let _ = writeln!(out, "## Extended Knowledge\n");
            for ext in &notes.extended_knowledge {
                let _ = writeln!(out, "### {} ({})\n\n{}\n", ext.title, ext.difficulty_level, ext.content);
                let _ = writeln!(out, "**Connection:** {}\n", ext.connection);
                sub_bullets(&mut out, "Applications", &ext.applications);
                if let Some(history) = &ext.historical_context {
                    let _ = writeln!(out, "**Background:** {}\n", history);
                }
                if let Some(links) = &ext.cross_subject_links {
                    sub_bullets(&mut out, "Cross-subject links", links);
                }
            }
        }

        section(&mut out, "Knowledge Structure", &notes.knowledge_structure);
        section(&mut out, "Summary", &notes.summary);

        if !notes.practice_recommendations.is_empty() {
            let _ = writeln!(out, "## Practice Recommendations\n");
            for practice in &notes.practice_recommendations {
                let _ = writeln!(
                    out,
                    "### {} [{}]\n\n{}\n\n*Time:* {}\n",
                    practice.title, practice.level, practice.description, practice.time_suggestion
                );
                numbered(&mut out, &practice.methods);
            }
        }

        if !notes.learning_resources.is_empty() {
            let _ = writeln!(out, "## Learning Resources\n");
            for resource in &notes.learning_resources {
                let _ = writeln!(
                    out,
                    "- **{}** ({}): {} *{}*",
                    resource.title, resource.kind, resource.description, resource.recommendation_reason
                );
            }
            out.push('\n');
        }

        if !notes.faqs.is_empty() {
            let _ = writeln!(out, "## FAQ\n");
            for faq in &notes.faqs {
                let _ = writeln!(out, "**Q ({}): {}**\n\n{}\n", faq.category, faq.question, faq.answer);
            }
        }

        bullets(&mut out, "Self-Assessment", &notes.self_assessment);
        out
    }
}

fn write_question(out: &mut String, question: &Question, include_answers: bool) {
    let _ = writeln!(
        out,
        "**{}.** {} *({} {})*\n",
        question.question_id,
        question.question_text,
        question.points,
        if question.points == 1 { "point" } else { "points" }
    );

    for (label, option) in OPTION_LABELS.iter().zip(question.options()) {
        let _ = writeln!(out, "- {}. {}", label, option);
    }
    if !question.options().is_empty() {
        out.push('\n');
    }

    if include_answers {
        if let Some(answer) = &question.correct_answer {
            let label = question
                .options()
                .iter()
                .position(|o| o == answer)
                .and_then(|i| OPTION_LABELS.get(i));
            match label {
                Some(label) => {
                    let _ = writeln!(out, "> **Answer:** {}. {}", label, answer);
                }
                None => {
                    let _ = writeln!(out, "> **Answer:** {}", answer);
                }
            }
        }
        if let Some(explanation) = &question.explanation {
            let _ = writeln!(out, ">\n> **Explanation:** {}", explanation);
        }
        out.push('\n');
    }
}

fn section(out: &mut String, heading: &str, body: &str) {
    if !body.trim().is_empty() {
        let _ = writeln!(out, "## {}\n\n{}\n", heading, body.trim());
    }
}

fn bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "## {}\n", heading);
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
    out.push('\n');
}

fn sub_bullets(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "**{}:**\n", label);
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
    out.push('\n');
}

fn numbered(out: &mut String, items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, item);
    }
    if !items.is_empty() {
        out.push('\n');
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render_exam(
        &self,
        exam: &ExamDocument,
        include_answers: bool,
        path: &Path,
    ) -> Result<(), RenderFailure> {
        std::fs::write(path, self.exam_markdown(exam, include_answers))
            .map_err(|e| RenderFailure::io(path, e))
    }

    fn render_notes(
        &self,
        notes: &StudyNotes,
        header: &NotesHeader,
        path: &Path,
    ) -> Result<(), RenderFailure> {
        std::fs::write(path, self.notes_markdown(notes, header))
            .map_err(|e| RenderFailure::io(path, e))
    }
}
