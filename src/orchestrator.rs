//! Sequential batch generation.
//!
//! Products are processed strictly one at a time: text first, then the optional
//! image. Every mutation of the accumulated results is published as a
//! [`BatchEvent::Snapshot`] holding a full copy, so observers never see a live
//! reference. Cancellation is cooperative: the token is polled before each
//! product and after every awaited call, and a result that arrives after
//! cancellation is dropped instead of committed.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::{
    error::GenerationError,
    generator::{ImageGenerator, ImageOutcome, TextGenerator},
    models::{BatchEvent, GenerationOptions, Product, ProductResult, RunReport, RunStatus},
};

pub const STOPPED_BY_REQUEST: &str = "⏹️ Stopped by request.";

enum Halt {
    Cancelled,
    Failed(RunStatus),
}

impl Halt {
    fn failed(product: &Product, err: GenerationError) -> Self {
        Halt::Failed(RunStatus::Failed {
            product_id: product.id,
            product_name: product.name.clone(),
            message: format!("Error while processing product \"{}\": {}. The batch was stopped.", product.name, err),
        })
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), Halt> {
    if cancel.is_cancelled() { Err(Halt::Cancelled) } else { Ok(()) }
}

/// State owned by one `run` call and dropped when it returns.
struct RunState {
    results: Vec<ProductResult>,
    events: UnboundedSender<BatchEvent>,
}

impl RunState {
    fn emit(&self, event: BatchEvent) {
        // A dropped receiver only means nobody is watching any more.
        let _ = self.events.send(event);
    }

    fn snapshot(&self) {
        self.emit(BatchEvent::Snapshot { results: self.results.clone() });
    }

    fn progress(&self, message: Option<String>) {
        self.emit(BatchEvent::Progress { message });
    }

    fn warning(&self, message: String) {
        warn!("⚠️ {}", message);
        self.emit(BatchEvent::Warning { message });
    }
}

pub struct BatchOrchestrator {
    text: Arc<dyn TextGenerator>,
    image: Arc<dyn ImageGenerator>,
}

impl BatchOrchestrator {
    pub fn new(text: Arc<dyn TextGenerator>, image: Arc<dyn ImageGenerator>) -> Self {
        Self { text, image }
    }

    /// Runs the whole batch. Callers filter out invalid products beforehand;
    /// `options.temperature` is passed through untouched.
    #[instrument(skip_all, fields(products = products.len()))]
    pub async fn run(
        &self,
        products: &[Product],
        options: &GenerationOptions,
        cancel: &CancellationToken,
        events: UnboundedSender<BatchEvent>,
    ) -> RunReport {
        let mut state = RunState { results: Vec::with_capacity(products.len()), events };
        let total = products.len();
        info!("🚀 Starting batch of {} products (platform: {}, images: {})", total, options.platform.label(), options.generate_image);

        for (i, product) in products.iter().enumerate() {
            match self.process_product(&mut state, product, i + 1, total, options, cancel).await {
                Ok(()) => {}
                Err(Halt::Cancelled) => {
                    info!("⏹️ Batch cancelled at product {}/{} ('{}')", i + 1, total, product.name);
                    state.progress(Some(STOPPED_BY_REQUEST.to_string()));
                    return RunReport { status: RunStatus::Cancelled, results: state.results };
                }
                Err(Halt::Failed(status)) => {
                    if let RunStatus::Failed { message, .. } = &status {
                        error!("❌ {}", message);
                    }
                    state.progress(None);
                    return RunReport { status, results: state.results };
                }
            }
        }

        state.progress(None);
        info!("✅ Batch completed with {} results", state.results.len());
        RunReport { status: RunStatus::Completed, results: state.results }
    }

    async fn process_product(
        &self,
        state: &mut RunState,
        product: &Product,
        index: usize,
        total: usize,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<(), Halt> {
        check_cancel(cancel)?;

        state.progress(Some(format!("✍️ Generating text for \"{}\" ({}/{})...", product.name, index, total)));
        let variants = self.text.generate(product, options).await
            .map_err(|e| Halt::failed(product, e))?;
        check_cancel(cancel)?;

        let slot = state.results.len();
        state.results.push(ProductResult { product: product.clone(), variants });
        state.snapshot();
        // Let observers react to the text-only result before the next checkpoint.
        tokio::task::yield_now().await;

        if !options.generate_image {
            return Ok(());
        }
        let Some(prompt) = state.results[slot].image_prompt().map(str::to_string) else {
            state.warning(format!("No image prompt found for \"{}\". Skipping image generation.", product.name));
            return Ok(());
        };
        check_cancel(cancel)?;

        state.results[slot].set_image_loading(true);
        state.snapshot();
        state.progress(Some(format!("🎨 Generating image for \"{}\" ({}/{})...", product.name, index, total)));

        let outcome = match self.image.generate(&prompt).await {
            Ok(outcome) => outcome,
            Err(e) => {
                state.results[slot].set_image_loading(false);
                state.snapshot();
                return Err(Halt::failed(product, e));
            }
        };
        if cancel.is_cancelled() {
            // Late result: keep the text-only entry as it was before the image step.
            state.results[slot].set_image_loading(false);
            state.snapshot();
            return Err(Halt::Cancelled);
        }

        match outcome {
            ImageOutcome::Ready(handle) => {
                state.results[slot].attach_image(Some(handle));
                state.snapshot();
            }
            ImageOutcome::Unavailable(reason) => {
                state.results[slot].attach_image(None);
                state.snapshot();
                state.warning(format!("Image unavailable for \"{}\": {}. Continuing without an image.", product.name, reason));
            }
        }
        Ok(())
    }
}
