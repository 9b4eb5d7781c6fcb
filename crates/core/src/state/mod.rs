pub mod notes;
pub mod question;
pub mod request;
pub mod run_state;

pub use notes::{
    ExtendedKnowledge, Faq, KnowledgePoint, LearningResource, PracticeRecommendation, StudyNotes,
    StudyTip,
};
pub use question::{total_points, Question};
pub use request::{
    subject_description, Difficulty, EducationLevel, QuestionType, RunRequest, MAX_QUESTION_COUNT,
};
pub use run_state::{
    ExamMetadata, PartialUpdate, RenderedPaths, ResearchBranch, ResearchFinding, RunResult,
    RunState, FINDINGS_SEPARATOR,
};
