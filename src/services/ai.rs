// src/services/ai.rs

//! Generative model client for pathways and detailed analyses.
//!
//! The model is asked for a single JSON object. Its reply is taken from the
//! first candidate, stripped of Markdown fences and parsed; anything that
//! does not parse is an error and is never repaired or retried.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{
    AiConfig, CostBreakdown, PathwayKind, PathwayProfile, PathwayTemplate, Scholarship, Step,
    TimelineEntry, VisaInfo, pathway_title,
};
use crate::utils::{endpoint_url, http::send_json};

const SERVICE: &str = "gemini";

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("static regex")
});

/// Source of AI-written pathways.
#[async_trait]
pub trait PathwayGenerator: Send + Sync {
    /// Write a complete pathway for the profile.
    async fn generate(&self, profile: &PathwayProfile) -> Result<PathwayTemplate>;

    /// Write a free-form analysis of a resolved pathway.
    async fn analyze(&self, profile: &PathwayProfile, template: &PathwayTemplate) -> Result<String>;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(client: Client, config: &AiConfig, api_key: SecretString) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
        }
    }

    /// Send one prompt and return the text of the first candidate.
    async fn complete(&self, prompt: &str, json_output: bool) -> Result<String> {
        let url = endpoint_url(
            &self.endpoint,
            &format!("models/{}:generateContent", self.model),
            &[("key", self.api_key.expose_secret())],
        )?;

        let mut generation_config = json!({ "temperature": self.temperature });
        if json_output {
            generation_config["responseMimeType"] = json!("application/json");
        }
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        log::debug!("Calling {} for {} prompt chars", self.model, prompt.len());
        let reply: Value = send_json(SERVICE, self.client.post(url).json(&body)).await?;
        candidate_text(&reply)
    }
}

#[async_trait]
impl PathwayGenerator for GeminiClient {
    async fn generate(&self, profile: &PathwayProfile) -> Result<PathwayTemplate> {
        let text = self.complete(&pathway_prompt(profile), true).await?;
        parse_pathway(&text, profile, &self.model)
    }

    async fn analyze(&self, profile: &PathwayProfile, template: &PathwayTemplate) -> Result<String> {
        let text = self.complete(&analysis_prompt(profile, template)?, false).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::upstream(SERVICE, "empty analysis"));
        }
        Ok(text.to_string())
    }
}

/// `candidates[0].content.parts[0].text` of a generateContent reply.
pub fn candidate_text(reply: &Value) -> Result<String> {
    reply
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            let reason = reply
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidate text");
            AppError::upstream(SERVICE, reason)
        })
}

/// Pull the JSON object out of a model reply.
pub fn extract_json(text: &str) -> &str {
    if let Some(inner) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return inner.as_str();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text.trim(),
    }
}

pub fn pathway_prompt(profile: &PathwayProfile) -> String {
    format!(
        r#"You are a study-abroad counsellor. Write a step-by-step plan for a {nationality} student who wants a {level} in {course} in {country} with a budget of {budget}.

Answer with one JSON object only, using this shape:
{{
  "title": string,
  "summary": string,
  "steps": [{{ "title": string, "description": string, "tasks": [string], "duration": string, "estimated_cost": number | null }}],
  "timeline": [{{ "phase": string, "duration": string }}],
  "costs": {{ "currency": string, "tuition_per_year": number, "living_per_year": number, "insurance_per_year": number, "visa_fee": number, "application_fees": number }},
  "visa": {{ "visa_type": string, "processing_time": string, "requirements": [string], "work_rights": string }},
  "scholarships": [{{ "name": string, "amount": string, "eligibility": string }}],
  "universities": [string]
}}

Use between 5 and 9 steps. Costs are yearly amounts in the local currency of {country}."#,
        nationality = profile.nationality,
        level = profile.academic_level.label(),
        course = profile.course,
        country = profile.country,
        budget = profile.budget_range.label(),
    )
}

fn analysis_prompt(profile: &PathwayProfile, template: &PathwayTemplate) -> Result<String> {
    let plan = serde_json::to_string(&json!({
        "steps": template.steps,
        "costs": template.costs,
        "visa": template.visa,
        "scholarships": template.scholarships,
    }))?;
    Ok(format!(
        "You are a study-abroad counsellor. Analyse this plan for a {} student pursuing a {} in {} in {} with a budget of {}. \
         Cover admission chances, financial feasibility, risks and a recommended order of actions. Answer in plain prose.\n\nPlan:\n{}",
        profile.nationality,
        profile.academic_level.label(),
        profile.course,
        profile.country,
        profile.budget_range.label(),
        plan
    ))
}

#[derive(Debug, Deserialize)]
struct AiStep {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tasks: Vec<String>,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    estimated_cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AiPathway {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: String,
    steps: Vec<AiStep>,
    #[serde(default)]
    timeline: Vec<TimelineEntry>,
    #[serde(default)]
    costs: Option<CostBreakdown>,
    #[serde(default)]
    visa: VisaInfo,
    #[serde(default)]
    scholarships: Vec<Scholarship>,
    #[serde(default)]
    universities: Vec<String>,
}

/// Turn a model reply into a template for `profile`.
pub fn parse_pathway(text: &str, profile: &PathwayProfile, model: &str) -> Result<PathwayTemplate> {
    let raw: AiPathway = serde_json::from_str(extract_json(text))
        .map_err(|e| AppError::upstream(SERVICE, format!("unparseable pathway: {e}")))?;

    if raw.steps.is_empty() {
        return Err(AppError::upstream(SERVICE, "pathway has no steps"));
    }

    let steps = raw
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, s)| Step {
            number: i as u32 + 1,
            title: s.title,
            description: s.description,
            tasks: s.tasks,
            duration: s.duration,
            estimated_cost: s.estimated_cost,
            is_limited: false,
        })
        .collect();

    let now = Utc::now();
    Ok(PathwayTemplate {
        key: profile.key(),
        profile: profile.clone(),
        title: raw
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| pathway_title(profile)),
        summary: raw.summary,
        steps,
        timeline: raw.timeline,
        costs: raw.costs,
        visa: raw.visa,
        scholarships: raw.scholarships,
        universities: raw.universities,
        kind: PathwayKind::AiGenerated {
            model: model.to_string(),
        },
        is_adapted: false,
        personalization: None,
        upgrade_prompt: None,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_profile;

    const REPLY: &str = r#"Here is the plan:
```json
{
  "title": "MSc Computer Science in Canada",
  "summary": "Two-year plan",
  "steps": [
    { "title": "Shortlist", "description": "Pick programmes", "tasks": ["List 8"], "duration": "1 month" },
    { "title": "IELTS", "description": "Take the test", "tasks": [], "duration": "2 months", "estimated_cost": 300 }
  ],
  "costs": { "currency": "CAD", "tuition_per_year": 25000, "living_per_year": 15000 },
  "visa": { "visa_type": "Study Permit" }
}
```"#;

    #[test]
    fn extracts_fenced_json() {
        let json = extract_json(REPLY);
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn extracts_bare_object_with_chatter() {
        assert_eq!(extract_json("Sure! {\"a\": 1} Hope it helps"), "{\"a\": 1}");
    }

    #[test]
    fn parses_reply_into_numbered_template() {
        let profile = sample_profile();
        let template = parse_pathway(REPLY, &profile, "gemini-1.5-flash").unwrap();

        assert_eq!(template.key, profile.key());
        assert_eq!(template.title, "MSc Computer Science in Canada");
        assert_eq!(template.steps.len(), 2);
        assert_eq!(template.steps[1].number, 2);
        assert_eq!(template.steps[1].estimated_cost, Some(300.0));
        assert_eq!(template.costs.as_ref().unwrap().insurance_per_year, 0.0);
        assert_eq!(
            template.kind,
            PathwayKind::AiGenerated {
                model: "gemini-1.5-flash".into()
            }
        );
    }

    #[test]
    fn rejects_unparseable_or_empty_replies() {
        let profile = sample_profile();
        assert!(parse_pathway("I cannot help with that.", &profile, "m").is_err());
        assert!(parse_pathway(r#"{"steps": []}"#, &profile, "m").is_err());
    }

    #[test]
    fn candidate_text_reads_first_part() {
        let reply = json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }]
        });
        assert_eq!(candidate_text(&reply).unwrap(), "hello");

        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = candidate_text(&blocked).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn prompt_mentions_profile() {
        let prompt = pathway_prompt(&sample_profile());
        assert!(prompt.contains("Indian student"));
        assert!(prompt.contains("Master's in Computer Science in Canada"));
    }
}
