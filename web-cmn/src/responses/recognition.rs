use serde::{Deserialize, Serialize};

/// Outcome of recognizing one object. Keys stay snake case on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognitionResult {
    pub selected_views: Vec<String>,
    pub description: String,
    pub label: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognitionResponse {
    pub message: String,
    pub result: Vec<RecognitionResult>,
}
