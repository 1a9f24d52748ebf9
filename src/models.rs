use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Suggested stylistic angles offered to the front-end. Tones stay free-form strings.
pub const TONE_OPTIONS: [&str; 10] = [
    "Shocking Story",
    "Super Detailed Review",
    "Tips & Tricks",
    "Before & After",
    "Myth Busting",
    "Trend Hijack",
    "For Beginners",
    "Maximum Savings",
    "Life Upgrade",
    "Q&A",
];

fn default_true() -> bool { true }

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "default_true")]
    pub is_affiliate: bool,
}

impl Product {
    pub fn new(name: impl Into<String>, description: impl Into<String>, link: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), description: description.into(), link: link.into(), is_affiliate: true }
    }

    /// A product can be submitted once name, description and link are all filled in.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.description.trim().is_empty() && !self.link.trim().is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Thread,
    FacebookPost,
    Comment,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Thread, Platform::FacebookPost, Platform::Comment];

    pub fn label(self) -> &'static str {
        match self {
            Platform::Thread => "Thread (short)",
            Platform::FacebookPost => "Facebook Post",
            Platform::Comment => "Comment",
        }
    }
}

fn default_temperature() -> f32 { 0.8 }

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationOptions {
    #[serde(default)]
    pub tones: Vec<String>,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub generate_image: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { tones: Vec::new(), platform: Platform::default(), temperature: default_temperature(), generate_image: false }
    }
}

impl GenerationOptions {
    pub fn clamped_temperature(&self) -> f32 {
        if self.temperature.is_nan() { default_temperature() } else { self.temperature.clamp(0.0, 1.0) }
    }
}

/// One candidate post for a product. Field names follow the upstream response schema.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ContentVariant {
    pub title: String,
    #[serde(rename = "thread")]
    pub body: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub cta_options: Vec<String>,
    #[serde(default)]
    pub disclosure: String,
    #[serde(default)]
    pub scheduling_suggestion: String,
    #[serde(rename = "template_used", default)]
    pub template_label: String,
    #[serde(rename = "imagePrompt", default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_handle: Option<String>,
    #[serde(rename = "isImageLoading", default)]
    pub image_loading: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProductResult {
    pub product: Product,
    #[serde(rename = "content")]
    pub variants: Vec<ContentVariant>,
}

impl ProductResult {
    pub fn set_image_loading(&mut self, loading: bool) {
        for v in &mut self.variants { v.image_loading = loading; }
    }

    /// One image per product, shared by every variant.
    pub fn attach_image(&mut self, handle: Option<String>) {
        for v in &mut self.variants {
            v.image_handle = handle.clone();
            v.image_loading = false;
        }
    }

    pub fn image_prompt(&self) -> Option<&str> {
        self.variants.first()
            .and_then(|v| v.image_prompt.as_deref())
            .filter(|p| !p.trim().is_empty())
    }
}

/// Observer stream from a running batch to whoever presents it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// `None` clears the progress line.
    Progress { message: Option<String> },
    Snapshot { results: Vec<ProductResult> },
    Warning { message: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
    Failed { product_id: Uuid, product_name: String, message: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunReport {
    #[serde(flatten)]
    pub status: RunStatus,
    pub results: Vec<ProductResult>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchRequest {
    pub products: Vec<Product>,
    #[serde(default)]
    pub options: GenerationOptions,
}

/// Server-side view of one run, rebuilt from the event stream.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchRecord {
    pub id: Uuid,
    pub state: BatchState,
    pub platform: Platform,
    pub total_products: usize,
    pub results: Vec<ProductResult>,
    pub progress: Option<String>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchRecord {
    pub fn new(id: Uuid, platform: Platform, total_products: usize) -> Self {
        Self {
            id, state: BatchState::Running, platform, total_products,
            results: Vec::new(), progress: None, warnings: Vec::new(), error: None,
            created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, event: BatchEvent) {
        match event {
            BatchEvent::Progress { message } => self.progress = message,
            BatchEvent::Snapshot { results } => self.results = results,
            BatchEvent::Warning { message } => self.warnings.push(message),
        }
        self.updated_at = Utc::now();
    }

    pub fn finish(&mut self, report: RunReport) {
        self.state = match &report.status {
            RunStatus::Completed => BatchState::Completed,
            RunStatus::Cancelled => BatchState::Cancelled,
            RunStatus::Failed { message, .. } => {
                self.error = Some(message.clone());
                BatchState::Failed
            }
        };
        self.results = report.results;
        // A cancelled run keeps its "stopped" line for the UI.
        if self.state != BatchState::Cancelled {
            self.progress = None;
        }
        self.updated_at = Utc::now();
    }

    /// The run task died without producing a report.
    pub fn abort(&mut self, message: String) {
        self.state = BatchState::Failed;
        self.error = Some(message);
        self.progress = None;
        self.updated_at = Utc::now();
    }
}
