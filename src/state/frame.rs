use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reported observation from the remote model.
///
/// Created exactly once per received `report_analysis` tool call and never
/// mutated afterwards; the reducer only retains or evicts frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisFrame {
    /// When the report was received (RFC 3339 when serialized)
    pub timestamp: DateTime<Utc>,

    /// Dominant emotion label (e.g. "Happiness", "Neutral")
    pub dominant_emotion: String,

    /// Confidence in the dominant emotion, 0-100
    pub confidence: f64,

    /// Detected micro-expression, if any
    pub micro_expression: Option<String>,

    /// Active facial action unit codes, order-stable (e.g. "AU12")
    pub active_aus: Vec<String>,

    /// Whether expression and speech content disagree
    pub incongruence: bool,

    /// Deviation from the subject's baseline, 0-100
    pub baseline_deviation: f64,

    /// Short free-text summary from the model
    pub analysis_summary: String,
}

/// Wire view of the `report_analysis` tool-call arguments.
///
/// Every field the model may omit carries a default so a sparse or partially
/// malformed payload still yields a usable frame.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisReport {
    #[serde(default = "default_emotion")]
    pub dominant_emotion: String,

    #[serde(default)]
    pub confidence: f64,

    #[serde(default)]
    pub micro_expression: Option<String>,

    #[serde(default)]
    pub active_aus: Vec<String>,

    #[serde(default)]
    pub incongruence: bool,

    #[serde(default)]
    pub baseline_deviation: f64,

    #[serde(default = "default_summary")]
    pub analysis_summary: String,
}

fn default_emotion() -> String {
    "Neutral".to_string()
}

fn default_summary() -> String {
    "Processing...".to_string()
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self {
            dominant_emotion: default_emotion(),
            confidence: 0.0,
            micro_expression: None,
            active_aus: Vec::new(),
            incongruence: false,
            baseline_deviation: 0.0,
            analysis_summary: default_summary(),
        }
    }
}

impl AnalysisFrame {
    /// Build a frame from decoded tool-call arguments, stamped with the
    /// current time. Out-of-range scores are clamped into 0-100.
    pub fn from_report(report: AnalysisReport) -> Self {
        Self {
            timestamp: Utc::now(),
            dominant_emotion: report.dominant_emotion,
            confidence: report.confidence.clamp(0.0, 100.0),
            micro_expression: report.micro_expression,
            active_aus: report.active_aus,
            incongruence: report.incongruence,
            baseline_deviation: report.baseline_deviation.clamp(0.0, 100.0),
            analysis_summary: report.analysis_summary,
        }
    }

    /// Decode raw tool-call arguments. Arguments that do not decode at all
    /// (wrong JSON shape, non-object) fall back to the all-defaults report.
    pub fn from_args(args: serde_json::Value) -> Self {
        let report = serde_json::from_value::<AnalysisReport>(args).unwrap_or_default();
        Self::from_report(report)
    }
}

/// Timeline projection of an [`AnalysisFrame`]: one chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionPoint {
    /// Wall-clock label for the chart axis (HH:MM:SS)
    pub time: String,

    /// Intensity plotted on the timeline (= baseline deviation)
    pub intensity: f64,

    /// Emotion label at this point
    pub emotion: String,
}

impl EmotionPoint {
    pub fn from_frame(frame: &AnalysisFrame) -> Self {
        Self {
            time: frame.timestamp.format("%H:%M:%S").to_string(),
            intensity: frame.baseline_deviation,
            emotion: frame.dominant_emotion.clone(),
        }
    }
}
