//! Default prompt templates bundled at compile time.
//!
//! Placeholders are written as `{name}` and filled by [`fill`].

/// Topic Planner - picks the research topics for the fan-out
pub const TOPIC_PLANNER: &str = include_str!("defaults/topic_planner.md");

/// Researcher - collects material on one topic
pub const RESEARCHER: &str = include_str!("defaults/researcher.md");

/// Question Writer - writes the exam questions
pub const QUESTION_WRITER: &str = include_str!("defaults/question_writer.md");

/// Exam Compiler - title, instructions and time limit
pub const EXAM_COMPILER: &str = include_str!("defaults/exam_compiler.md");

/// Notes Writer - study notes
pub const NOTES_WRITER: &str = include_str!("defaults/notes_writer.md");

/// All default prompts with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("topic_planner", TOPIC_PLANNER),
        ("researcher", RESEARCHER),
        ("question_writer", QUESTION_WRITER),
        ("exam_compiler", EXAM_COMPILER),
        ("notes_writer", NOTES_WRITER),
    ]
}

/// Substitute `{name}` placeholders in one pass.
///
/// Substituted values are not scanned again, and unknown placeholders are
/// left untouched.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| {
                let key = &after[..close];
                vars.iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| (*value, close))
            });

        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
