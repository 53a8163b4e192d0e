//! Wire message types for the Gemini Live (BidiGenerateContent) protocol.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Name of the single tool the remote model may invoke.
pub const ANALYSIS_TOOL: &str = "report_analysis";

/// MIME type for transmitted video frames.
pub const FRAME_MIME: &str = "image/jpeg";

pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-exp";

/// Fixed system directive. The model only analyzes proactively when told to;
/// without the "do not wait for speech" framing it idles until the user talks.
pub const SYSTEM_DIRECTIVE: &str = "You are a facial and vocal analysis engine. \
Continuously observe the incoming video frames and audio stream. Do not wait for the user \
to speak and do not reply with text. Every one to two seconds, call the report_analysis \
function with your current read of the subject: dominant emotion, confidence (0-100), any \
micro-expression, active facial action unit codes, whether expression and speech are \
incongruent, deviation from the subject's baseline (0-100), and a summary of five words or \
fewer. Keep calling report_analysis for as long as the session is open.";

/// Synthetic first turn that primes the model into continuous analysis.
pub const KICKOFF_PROMPT: &str = "Begin continuous analysis of the video feed now.";

pub fn audio_mime(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub system_instruction: Content,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// One realtime media payload: base64 data plus its MIME type.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContentMessage {
    pub client_content: ClientContent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponseMessage {
    pub tool_response: ToolResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: serde_json::Value,
}

impl SetupMessage {
    pub fn new(model: &str) -> Self {
        Self {
            setup: Setup {
                model: model.to_string(),
                system_instruction: Content {
                    role: None,
                    parts: vec![Part {
                        text: SYSTEM_DIRECTIVE.to_string(),
                    }],
                },
                tools: vec![analysis_tool()],
            },
        }
    }
}

/// Declaration of the `report_analysis` function the model calls back.
pub fn analysis_tool() -> Tool {
    Tool {
        function_declarations: vec![FunctionDeclaration {
            name: ANALYSIS_TOOL.to_string(),
            description: "Report the current facial/vocal analysis of the subject.".to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "dominant_emotion": { "type": "STRING" },
                    "confidence": { "type": "NUMBER", "description": "0-100" },
                    "micro_expression": { "type": "STRING" },
                    "active_aus": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "incongruence": { "type": "BOOLEAN" },
                    "baseline_deviation": { "type": "NUMBER", "description": "0-100" },
                    "analysis_summary": { "type": "STRING", "description": "Five words or fewer" }
                },
                "required": ["dominant_emotion", "confidence", "active_aus", "baseline_deviation"]
            }),
        }],
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// Superset of server messages this core cares about; unknown fields are
/// ignored, model text output (`serverContent`) is informational only.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub tool_call: Option<ServerToolCall>,
    pub server_content: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerToolCall {
    #[serde(default)]
    pub function_calls: Vec<ServerFunctionCall>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFunctionCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}
