use serde::{Deserialize, Serialize};

// Stored per hour index
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub prompt: String,
    pub reply: String,
}

// GET /api/current query
#[derive(Debug, Deserialize, Default)]
pub struct CurrentQuery {
    #[serde(default)]
    pub barcode: bool,
}

// GET /api/current response
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrentResponse {
    pub index: u64,
    pub prompt: String,
    pub reply: String,
    pub seconds_until_next: u64,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

// POST /generate request; `number` stays loose so bad values get our own 400
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub number: Option<serde_json::Value>,
}

// POST /generate response
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerateResponse {
    pub input: String,
    pub response: String,
}

// OpenRouter chat completion request format
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

// OpenRouter chat completion response format (only what we read)
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}
