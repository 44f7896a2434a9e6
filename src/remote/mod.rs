//! Network collaborators: the store catalog, the image fetcher and the public
//! image host. Each sits behind a trait so batch code can be driven by fakes.
pub mod catalog;
pub mod fetch;
pub mod upload;

pub use catalog::{CatalogClient, CollectionRef, Product, ProductImage, ShopifyCatalog};
pub use fetch::{HttpFetcher, ImageFetcher};
pub use upload::{ImageHost, ImgbbHost};

const SNIPPET_LEN: usize = 300;

/// First few hundred characters of an error body, for error messages.
pub(crate) fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
