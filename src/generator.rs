use async_trait::async_trait;

use crate::{error::GenerationError, models::{ContentVariant, GenerationOptions, Product}};

/// Outcome of an image request that did not hard-fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Ready(String),
    /// Quota exhausted or no image returned. The batch keeps going without one.
    Unavailable(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produces the variant set for one product. A successful result is non-empty
    /// and its first variant has a title and at least one body segment.
    async fn generate(&self, product: &Product, options: &GenerationOptions) -> Result<Vec<ContentVariant>, GenerationError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<ImageOutcome, GenerationError>;
}
