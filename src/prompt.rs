use serde_json::{json, Value};

use crate::models::{GenerationOptions, Platform, Product};

pub const VARIANT_COUNT: usize = 3;

pub fn platform_instruction(platform: Platform) -> &'static str {
    match platform {
        Platform::Thread => "Each version is a complete thread of 3-4 segments (each segment is one post). The last post carries the CTA and the link.",
        Platform::FacebookPost => "Each version is a complete Facebook post written as ONE single paragraph. Keep a hook, a body and a conclusion, with the CTA and link at the end. The thread array must contain exactly one string.",
        Platform::Comment => "Each version is a very short seeding comment (2-3 sentences), natural and curiosity-driven. The link may be omitted; mentioning the product name is enough. The thread array must contain exactly one string.",
    }
}

pub fn tone_instruction(tones: &[String]) -> String {
    let tones: Vec<&str> = tones.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
    if tones.is_empty() {
        format!("Freely create {VARIANT_COUNT} versions with {VARIANT_COUNT} distinct, original angles.")
    } else {
        format!("Prefer these angles/styles for the {VARIANT_COUNT} versions: {}.", tones.join(", "))
    }
}

pub fn build_text_prompt(product: &Product, options: &GenerationOptions) -> String {
    let affiliate = if product.is_affiliate { "Yes" } else { "No" };
    format!(
        "You are a viral content writer for the Vietnamese market, creating affiliate-oriented social media content. Write in Vietnamese.\n\
        \n\
        Create viral content for this product:\n\
        - Product name: {name}\n\
        - Description: {desc}\n\
        - Shopee link: {link}\n\
        - Affiliate link: {affiliate}\n\
        - Target platform: {platform}\n\
        \n\
        MANDATORY requirements:\n\
        1. Produce exactly {VARIANT_COUNT} different versions. {tones}\n\
        2. Format: {format}\n\
        3. Voice: friendly and close, like a friend sharing a find; short and intriguing. Use emoji sparingly. Add numbers or a micro-story to persuade.\n\
        4. If the link is an affiliate link, a clear disclosure is REQUIRED (e.g. \"#QC\", \"#Ad\", \"(Affiliate link)\"). Otherwise return an empty disclosure.\n\
        5. Never make unfounded health or financial claims. Avoid banned or sensitive wording.\n\
        6. Provide metadata for each version: title, 5-8 hashtags, 3 CTA variants, and a suggested posting time in Vietnam.\n\
        7. Provide one English 'imagePrompt' (15-25 words) describing an appealing product shot. It must be the same for all {VARIANT_COUNT} versions.\n\
        8. Answer with a JSON array that follows the provided schema.",
        name = product.name.trim(),
        desc = product.description.trim(),
        link = product.link.trim(),
        platform = options.platform.label(),
        tones = tone_instruction(&options.tones),
        format = platform_instruction(options.platform),
    )
}

/// Structured-output schema for the text model.
pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING", "description": "A catchy one-line title." },
                "thread": {
                    "type": "ARRAY",
                    "description": "Posts of a thread, or a single string holding the whole post or comment.",
                    "items": { "type": "STRING" }
                },
                "hashtags": { "type": "ARRAY", "description": "5-8 relevant hashtags.", "items": { "type": "STRING" } },
                "cta_options": { "type": "ARRAY", "description": "3 call-to-action variants.", "items": { "type": "STRING" } },
                "disclosure": { "type": "STRING", "description": "Affiliate disclosure, empty when not affiliate." },
                "scheduling_suggestion": { "type": "STRING", "description": "Suggested posting time in Vietnam." },
                "template_used": { "type": "STRING", "description": "Short name of the approach used." },
                "imagePrompt": { "type": "STRING", "description": "English image prompt for the product, 15-25 words." }
            },
            "required": ["title", "thread", "hashtags", "cta_options", "disclosure", "scheduling_suggestion", "template_used", "imagePrompt"]
        }
    })
}
