//! # Progress Events
//!
//! The fixed wire record streamed to callers while a run is in flight:
//! `step`, `message`, `progress`, plus optional `data`, `error` and `result`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::stage::PipelineStage;

/// Run-level completion percentage, clamped to `0..=100`.
///
/// Whole values serialize as JSON integers (`25`), fractional values as
/// floats (`41.25`).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Progress(f64);

impl Progress {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 100.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// The larger of two progress values
    pub fn max(self, other: Progress) -> Progress {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

impl From<f64> for Progress {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl Serialize for Progress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Progress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Progress::new)
    }
}

/// A single progress event
///
/// Immutable once emitted; delivered in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Stage that produced the event (`completed` / `error` for terminals)
    pub step: PipelineStage,
    /// Human-readable status line
    pub message: String,
    /// Run-level percentage
    pub progress: Progress,
    /// Stage-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Failure reason, only on the terminal `error` event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final payload, only on the terminal `completed` event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl ProgressEvent {
    /// Create a new event
    pub fn new(step: PipelineStage, message: impl Into<String>, progress: impl Into<Progress>) -> Self {
        Self {
            step,
            message: message.into(),
            progress: progress.into(),
            data: None,
            error: None,
            result: None,
        }
    }

    /// Add stage data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add a failure reason to the event
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attach the final run payload
    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        self.step.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_shape() {
        let event = ProgressEvent::new(PipelineStage::PlanningTopics, "Planned 3 topics", 25.0)
            .with_data(json!(["a", "b", "c"]));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "step": "research_topics",
                "message": "Planned 3 topics",
                "progress": 25,
                "data": ["a", "b", "c"]
            })
        );
    }

    #[test]
    fn test_fractional_progress_serializes_as_float() {
        let event = ProgressEvent::new(PipelineStage::ResearchingKnowledge, "Researched: x", 41.25);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"progress\":41.25"));
        assert!(!json.contains("\"data\""));
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"result\""));
    }

    #[test]
    fn test_error_event_fields() {
        let event = ProgressEvent::new(PipelineStage::Failed, "Generation failed", 55.0)
            .with_error("timeout")
            .with_data(json!({ "stage": "generate_questions" }));

        assert!(event.is_terminal());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["step"], "error");
        assert_eq!(value["error"], "timeout");
        assert_eq!(value["data"]["stage"], "generate_questions");
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(Progress::new(140.0).value(), 100.0);
        assert_eq!(Progress::new(-3.0).value(), 0.0);
        assert_eq!(Progress::new(f64::NAN).value(), 0.0);
        assert_eq!(Progress::new(35.0).max(Progress::new(20.0)).value(), 35.0);
    }
}
