use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn, error};

use crate::{
    config::AppConfig,
    error::GenerationError,
    generator::{ImageGenerator, ImageOutcome, TextGenerator},
    models::{ContentVariant, GenerationOptions, Platform, Product},
    prompt::{build_text_prompt, response_schema, VARIANT_COUNT},
};

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn log_preview(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut v) => {
            truncate_base64_in_json(&mut v);
            let s = v.to_string();
            if s.len() > 1000 { format!("{}...", s.chars().take(1000).collect::<String>()) } else { s }
        }
        Err(_) => body.chars().take(1000).collect(),
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_base.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    fn demo_mode(&self) -> bool { self.api_key == crate::config::DEMO_KEY }

    /// Returns the status and raw body; transport failures are hard errors.
    async fn perform_api_call(&self, model: &str, body: &Value) -> Result<(StatusCode, String), GenerationError> {
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, model, self.api_key);
        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let response = self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = response.status();
        let text = response.text().await
            .map_err(|e| GenerationError::Http(e.to_string()))?;
        info!("📥 Response status: {} body: {}", status, log_preview(&text));
        Ok((status, text))
    }

    pub async fn generate_variants(&self, product: &Product, options: &GenerationOptions) -> Result<Vec<ContentVariant>, GenerationError> {
        if self.demo_mode() {
            info!("Using demo mode - returning canned variants for '{}'", product.name);
            return Ok(demo_variants(product, options));
        }

        let request_body = json!({
            "contents": [{ "parts": [{ "text": build_text_prompt(product, options) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
                "temperature": options.temperature,
            }
        });

        let (status, body) = self.perform_api_call(&self.text_model, &request_body).await?;
        if !status.is_success() {
            error!("❌ Gemini text generation failed with status {}", status);
            return Err(GenerationError::Http(format!("status={} body={}", status, body)));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(format!("parse error: {}", e)))?;
        let text = extract_first_text(&parsed)
            .ok_or_else(|| GenerationError::InvalidResponse("no text content in response".into()))?;
        let variants = parse_variants(&text)?;
        if variants.len() != VARIANT_COUNT {
            warn!("⚠️ Expected {} variants for '{}', got {}", VARIANT_COUNT, product.name, variants.len());
        }
        info!("✅ Generated {} variants for '{}'", variants.len(), product.name);
        Ok(variants)
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<ImageOutcome, GenerationError> {
        if self.demo_mode() {
            info!("Using demo mode - no real images generated");
            return Ok(ImageOutcome::Ready(format!("data:image/svg+xml;base64,{}", generate_placeholder_image(prompt))));
        }

        let request_body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });

        let (status, body) = self.perform_api_call(&self.image_model, &request_body).await?;
        if is_quota_exhausted(status, &body) {
            warn!("⚠️ Image quota exhausted (status {})", status);
            return Ok(ImageOutcome::Unavailable("image quota exhausted".into()));
        }
        if !status.is_success() {
            error!("❌ Gemini image generation failed with status {}", status);
            return Err(GenerationError::Http(format!("status={} body={}", status, body)));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(format!("parse error: {}", e)))?;
        match extract_first_image(&parsed) {
            Some(handle) => {
                info!("🖼️ Extracted image ({} chars)", handle.len());
                Ok(ImageOutcome::Ready(handle))
            }
            None => {
                info!("⚠️ No image data found in API response");
                Ok(ImageOutcome::Unavailable("no image data in response".into()))
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, product: &Product, options: &GenerationOptions) -> Result<Vec<ContentVariant>, GenerationError> {
        self.generate_variants(product, options).await
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<ImageOutcome, GenerationError> {
        self.generate_image(prompt).await
    }
}

fn is_quota_exhausted(status: StatusCode, body: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || (!status.is_success() && body.contains("RESOURCE_EXHAUSTED"))
}

/// Validates the model's JSON answer. Only the first variant is inspected, and
/// image fields are always reset since they are owned by the batch.
pub fn parse_variants(text: &str) -> Result<Vec<ContentVariant>, GenerationError> {
    let cleaned = strip_code_fence(text.trim());
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| GenerationError::InvalidResponse(format!("not JSON: {}", e)))?;

    let items = match value.as_array() {
        Some(items) if !items.is_empty() => items,
        _ => return Err(GenerationError::InvalidResponse("API returned an empty or invalid array".into())),
    };
    let first = &items[0];
    let has_title = first.get("title").and_then(Value::as_str).is_some_and(|t| !t.trim().is_empty());
    let has_body = first.get("thread").and_then(Value::as_array).is_some_and(|b| !b.is_empty());
    if !has_title || !has_body {
        return Err(GenerationError::InvalidResponse("the data structure from API is not as expected".into()));
    }

    let mut variants: Vec<ContentVariant> = serde_json::from_value(value)
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
    for v in &mut variants {
        v.image_handle = None;
        v.image_loading = false;
    }
    Ok(variants)
}

fn strip_code_fence(s: &str) -> &str {
    s.strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(s)
}

fn demo_variants(product: &Product, options: &GenerationOptions) -> Vec<ContentVariant> {
    let angles: Vec<String> = if options.tones.is_empty() {
        vec!["Personal story".into(), "Detailed review".into(), "Quick tips".into()]
    } else {
        options.tones.iter().cycle().take(VARIANT_COUNT).cloned().collect()
    };
    let disclosure = if product.is_affiliate { "#Ad" } else { "" };
    angles.into_iter().map(|angle| {
        let body = match options.platform {
            Platform::Thread => vec![
                format!("Demo: why {} surprised me 👀", product.name),
                product.description.clone(),
                format!("Get it here 👉 {}", product.link),
            ],
            Platform::FacebookPost => vec![format!("Demo: {} - {} 👉 {}", product.name, product.description, product.link)],
            Platform::Comment => vec![format!("Demo: has anyone tried {}? Looks worth it.", product.name)],
        };
        ContentVariant {
            title: format!("{} ({})", product.name, angle),
            body,
            hashtags: vec!["#demo".into(), "#review".into(), "#shopee".into()],
            cta_options: vec!["Check it out".into(), "Grab yours".into(), "See the deal".into()],
            disclosure: disclosure.into(),
            scheduling_suggestion: "Lunch (11h-13h) or evening (20h-22h)".into(),
            template_label: angle,
            image_prompt: options.generate_image.then(|| format!("A vibrant product shot of {} on a clean background", product.name)),
            image_handle: None,
            image_loading: false,
        }
    }).collect()
}

fn generate_placeholder_image(prompt: &str) -> String {
    let colors = ["#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6"];
    let color = colors[prompt.len() % colors.len()];
    let caption: String = prompt.chars().filter(|c| !matches!(c, '<' | '>' | '&' | '"')).take(48).collect();

    let svg = format!(r#"<svg width="400" height="300" xmlns="http://www.w3.org/2000/svg">
            <rect width="400" height="300" fill="{}" />
            <text x="200" y="150" font-family="Arial, sans-serif" font-size="20" font-weight="bold"
                  text-anchor="middle" fill="white">Demo image</text>
            <text x="200" y="190" font-family="Arial, sans-serif" font-size="11"
                  text-anchor="middle" fill="white" opacity="0.8">{}</text>
        </svg>"#, color, caption);

    base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData
    },
    Text { text: String },
    #[allow(dead_code)]
    Other(Value)
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
}

fn extract_first_text(resp: &GeminiResponse) -> Option<String> {
    resp.candidates.iter()
        .flat_map(|c| c.content.parts.iter())
        .find_map(|p| match p { Part::Text { text } => Some(text.clone()), _ => None })
}

fn extract_first_image(resp: &GeminiResponse) -> Option<String> {
    resp.candidates.iter()
        .flat_map(|c| c.content.parts.iter())
        .find_map(|p| match p {
            Part::Inline { inline_data } => {
                let mime = inline_data.mime_type.as_deref().unwrap_or("image/png");
                Some(format!("data:{};base64,{}", mime, inline_data.data))
            }
            _ => None,
        })
}
