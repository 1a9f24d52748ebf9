#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use viral_batch::{
    error::GenerationError,
    generator::{ImageGenerator, ImageOutcome, TextGenerator},
    models::{BatchEvent, ContentVariant, GenerationOptions, Product, RunReport},
    orchestrator::BatchOrchestrator,
};

pub fn product(name: &str) -> Product {
    Product::new(name, format!("{name} description"), format!("https://shopee.vn/{name}"))
}

pub fn prompt_for(name: &str) -> String {
    format!("photo of {name}")
}

pub fn variants_for(name: &str, with_prompt: bool) -> Vec<ContentVariant> {
    (1..=3).map(|i| ContentVariant {
        title: format!("{name} #{i}"),
        body: vec![format!("{name} post {i}")],
        hashtags: vec![format!("#{name}")],
        cta_options: vec!["Buy now".into()],
        disclosure: "#Ad".into(),
        scheduling_suggestion: "Evening".into(),
        template_label: format!("Angle {i}"),
        image_prompt: with_prompt.then(|| prompt_for(name)),
        image_handle: None,
        image_loading: false,
    }).collect()
}

#[derive(Clone)]
pub enum TextBehavior {
    Ok,
    NoPrompt,
    Fail(String),
    Panic,
}

#[derive(Clone)]
pub enum ImageBehavior {
    Ready(String),
    Unavailable,
    Fail(String),
}

/// Scripted text generator keyed by product name. Unknown products succeed.
#[derive(Default)]
pub struct FakeText {
    behaviors: HashMap<String, TextBehavior>,
    cancel_on: Option<(String, CancellationToken)>,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
    pub temperatures: Mutex<Vec<f32>>,
}

impl FakeText {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, name: &str, behavior: TextBehavior) -> Self {
        self.behaviors.insert(name.to_string(), behavior);
        self
    }

    /// Cancels `token` while the call for `name` is in flight.
    pub fn cancel_during(mut self, name: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((name.to_string(), token));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn called(&self) -> Vec<String> { self.calls.lock().clone() }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, product: &Product, options: &GenerationOptions) -> Result<Vec<ContentVariant>, GenerationError> {
        self.calls.lock().push(product.name.clone());
        self.temperatures.lock().push(options.temperature);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((name, token)) = &self.cancel_on {
            if name == &product.name { token.cancel(); }
        }
        match self.behaviors.get(&product.name).cloned().unwrap_or(TextBehavior::Ok) {
            TextBehavior::Ok => Ok(variants_for(&product.name, true)),
            TextBehavior::NoPrompt => Ok(variants_for(&product.name, false)),
            TextBehavior::Fail(msg) => Err(GenerationError::Http(msg)),
            TextBehavior::Panic => panic!("text generator crashed on {}", product.name),
        }
    }
}

/// Scripted image generator keyed by prompt. Unknown prompts get `img-<prompt>`.
#[derive(Default)]
pub struct FakeImage {
    behaviors: HashMap<String, ImageBehavior>,
    cancel_on: Option<(String, CancellationToken)>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeImage {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, product_name: &str, behavior: ImageBehavior) -> Self {
        self.behaviors.insert(prompt_for(product_name), behavior);
        self
    }

    pub fn cancel_during(mut self, product_name: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((prompt_for(product_name), token));
        self
    }

    pub fn called(&self) -> Vec<String> { self.calls.lock().clone() }
}

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn generate(&self, prompt: &str) -> Result<ImageOutcome, GenerationError> {
        self.calls.lock().push(prompt.to_string());
        if let Some((p, token)) = &self.cancel_on {
            if p == prompt { token.cancel(); }
        }
        match self.behaviors.get(prompt).cloned() {
            Some(ImageBehavior::Ready(handle)) => Ok(ImageOutcome::Ready(handle)),
            Some(ImageBehavior::Unavailable) => Ok(ImageOutcome::Unavailable("quota exceeded".into())),
            Some(ImageBehavior::Fail(msg)) => Err(GenerationError::Http(msg)),
            None => Ok(ImageOutcome::Ready(format!("img-{prompt}"))),
        }
    }
}

pub struct Harness {
    pub text: Arc<FakeText>,
    pub image: Arc<FakeImage>,
    pub orchestrator: BatchOrchestrator,
}

impl Harness {
    pub fn new(text: FakeText, image: FakeImage) -> Self {
        let text = Arc::new(text);
        let image = Arc::new(image);
        let orchestrator = BatchOrchestrator::new(text.clone(), image.clone());
        Self { text, image, orchestrator }
    }

    /// Runs to completion and returns the report with every event emitted.
    pub async fn run(&self, products: &[Product], options: &GenerationOptions, cancel: &CancellationToken) -> (RunReport, Vec<BatchEvent>) {
        self.run_observed(products, options, cancel, |_| {}).await
    }

    /// Like `run`, but `observe` sees each event while the batch is still going.
    pub async fn run_observed(
        &self,
        products: &[Product],
        options: &GenerationOptions,
        cancel: &CancellationToken,
        mut observe: impl FnMut(&BatchEvent),
    ) -> (RunReport, Vec<BatchEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watch = async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                observe(&event);
                events.push(event);
            }
            events
        };
        tokio::join!(self.orchestrator.run(products, options, cancel, tx), watch)
    }
}

pub fn snapshots(events: &[BatchEvent]) -> Vec<&Vec<viral_batch::models::ProductResult>> {
    events.iter().filter_map(|e| match e {
        BatchEvent::Snapshot { results } => Some(results),
        _ => None,
    }).collect()
}

pub fn warnings(events: &[BatchEvent]) -> Vec<&str> {
    events.iter().filter_map(|e| match e {
        BatchEvent::Warning { message } => Some(message.as_str()),
        _ => None,
    }).collect()
}

pub fn progress(events: &[BatchEvent]) -> Vec<Option<&str>> {
    events.iter().filter_map(|e| match e {
        BatchEvent::Progress { message } => Some(message.as_deref()),
        _ => None,
    }).collect()
}

pub fn names(results: &[viral_batch::models::ProductResult]) -> Vec<&str> {
    results.iter().map(|r| r.product.name.as_str()).collect()
}
