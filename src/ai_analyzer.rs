// src/ai_analyzer.rs

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::GeminiConfig;
use crate::models::{Client, Email};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("AI analysis is not configured. Set GEMINI_API_KEY.")]
    NotConfigured,
    #[error("AI service unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI service error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("AI service returned no text")]
    EmptyReply,
    #[error("Failed to analyze email with AI: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Structured fields the model extracts from an inbound email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailAnalysis {
    pub email_type: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub service_requested: Option<String>,
    pub urgency: Option<String>,
    pub matching_client: Option<String>,
    pub suggested_task_title: Option<String>,
    pub suggested_task_description: Option<String>,
    pub keywords: Vec<String>,
    pub estimated_duration: Option<String>,
    pub location: Option<String>,
}

#[async_trait]
pub trait EmailAnalyzer: Send + Sync {
    async fn analyze(&self, email: &Email, clients: &[Client]) -> Result<EmailAnalysis, AnalysisError>;
}

pub fn build_prompt(subject: &str, content: &str, clients: &[Client]) -> String {
    let roster = clients
        .iter()
        .map(|c| {
            format!(
                "- {} ({}) [id: {}]",
                c.name,
                c.email.as_deref().unwrap_or("no email"),
                c.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze this customer service email and extract structured information.

EMAIL SUBJECT: {subject}

EMAIL CONTENT:
{content}

EXISTING CLIENTS:
{roster}

Extract the following information in JSON format:
{{
  "emailType": "one of: Preisanfrage, Terminanfrage, Auftrag, Beschwerde, Sonstiges",
  "customerName": "extracted customer name or null",
  "customerEmail": "extracted email address or null",
  "customerPhone": "extracted phone number or null",
  "serviceRequested": "what service is being requested (e.g., Rasenmähen, Heckenschneiden, Gartenpflege)",
  "urgency": "low, medium, or high",
  "matchingClient": "ID of matching existing client from the list, or null if no match",
  "suggestedTaskTitle": "a concise task title (max 60 chars)",
  "suggestedTaskDescription": "a detailed task description",
  "keywords": ["array", "of", "relevant", "keywords"],
  "estimatedDuration": "estimated time needed (e.g., '2 hours', '1 day')",
  "location": "extracted location/address if mentioned, or null"
}}

Rules:
- Match customer to existing client by name or email if possible
- Be conservative with urgency - only mark high if explicitly urgent
- Extract all contact information carefully
- Keywords should be relevant for filtering/searching
- Task title should be action-oriented
- Return ONLY valid JSON, no markdown or explanation
"#
    )
}

/// Removes Markdown code fences (```json ... ```) a model likes to wrap JSON in.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

pub fn parse_analysis(reply: &str) -> Result<EmailAnalysis, AnalysisError> {
    Ok(serde_json::from_str(&strip_code_fences(reply))?)
}

/* -------------------------------------------------------------------------- */
/* Gemini                                                                     */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

pub struct GeminiAnalyzer {
    http_client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http_client, config })
    }

    async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AnalysisError::NotConfigured)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );

        let resp = self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Gemini returned {}: {}", status, body);
            return Err(AnalysisError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyReply);
        }
        Ok(text)
    }
}

#[async_trait]
impl EmailAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, email: &Email, clients: &[Client]) -> Result<EmailAnalysis, AnalysisError> {
        let prompt = build_prompt(&email.subject, &email.content, clients);
        debug!("Analyzing email {} ({} prompt chars)", email.id, prompt.len());
        let reply = self.generate(&prompt).await?;
        parse_analysis(&reply)
    }
}
