use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, LINK};
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::params::ExportParams;
use crate::error::{Error, Result};
use crate::remote::body_snippet;

pub const API_TIMEOUT: Duration = Duration::from_secs(60);
const PAGE_LIMIT: u32 = 250;
const TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// How the user named a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionRef {
    Id(u64),
    Handle(String),
}

impl FromStr for CollectionRef {
    type Err = Error;

    /// Accepts a numeric id, a bare handle, or a storefront URL such as
    /// `https://shop.example/collections/dunk?page=2`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidConfiguration(
                "collection reference is empty".to_string(),
            ));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let id = s
                .parse::<u64>()
                .map_err(|e| Error::InvalidConfiguration(format!("collection id {s}: {e}")))?;
            return Ok(CollectionRef::Id(id));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            let url = Url::parse(s)
                .map_err(|e| Error::InvalidConfiguration(format!("invalid collection URL {s}: {e}")))?;
            let handle = url.path_segments().and_then(|mut segments| {
                segments.find(|seg| *seg == "collections")?;
                segments.next().filter(|h| !h.is_empty()).map(str::to_string)
            });
            return handle.map(CollectionRef::Handle).ok_or_else(|| {
                Error::InvalidConfiguration(format!("no collection handle in URL {s}"))
            });
        }
        Ok(CollectionRef::Handle(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductImage {
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

/// Read access to a store's collections and products.
pub trait CatalogClient: Send + Sync {
    /// Resolves a reference to a numeric collection id.
    fn resolve_collection(&self, reference: &CollectionRef) -> Result<u64>;

    /// Every product of a collection, across all pages, in catalog order.
    fn list_products(&self, collection_id: u64) -> Result<Vec<Product>>;
}

#[derive(Deserialize)]
struct CollectionList {
    #[serde(default, alias = "smart_collections")]
    custom_collections: Vec<CollectionId>,
}

#[derive(Deserialize)]
struct CollectionId {
    id: u64,
}

#[derive(Deserialize)]
struct ProductPage {
    #[serde(default)]
    products: Vec<Product>,
}

/// Shopify Admin REST client.
pub struct ShopifyCatalog {
    client: Client,
    base: Url,
    token: String,
}

impl ShopifyCatalog {
    /// `shop` is either the store name (`my-store`) or its full host.
    pub fn new(shop: &str, api_version: &str, token: &str) -> Result<Self> {
        let shop = shop.trim();
        let host = if shop.contains('.') {
            shop.to_string()
        } else {
            format!("{shop}.myshopify.com")
        };
        let base = Url::parse(&format!("https://{host}/admin/api/{}/", api_version.trim()))
            .map_err(|e| Error::InvalidConfiguration(format!("invalid shop {shop}: {e}")))?;
        let client = Client::builder().timeout(API_TIMEOUT).build()?;
        Ok(Self {
            client,
            base,
            token: token.to_string(),
        })
    }

    pub fn from_params(params: &ExportParams) -> Result<Self> {
        Self::new(&params.shop, &params.api_version, &params.access_token)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }

    fn get(&self, url: Url) -> Result<Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .header(TOKEN_HEADER, &self.token)
            .header(CONTENT_TYPE, "application/json")
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::remote(
                url.as_str(),
                format!("HTTP {}: {}", status.as_u16(), body_snippet(&body)),
            ));
        }
        Ok(response)
    }

    fn lookup_handle(&self, kind: &str, handle: &str) -> Result<Option<u64>> {
        let mut url = self.endpoint(&format!("{kind}.json"))?;
        url.query_pairs_mut().append_pair("handle", handle);
        let list: CollectionList = self.get(url)?.json()?;
        Ok(list.custom_collections.first().map(|c| c.id))
    }
}

impl CatalogClient for ShopifyCatalog {
    fn resolve_collection(&self, reference: &CollectionRef) -> Result<u64> {
        let handle = match reference {
            CollectionRef::Id(id) => return Ok(*id),
            CollectionRef::Handle(h) => h,
        };
        for kind in ["custom_collections", "smart_collections"] {
            if let Some(id) = self.lookup_handle(kind, handle)? {
                info!("Resolved collection handle {} to id {}", handle, id);
                return Ok(id);
            }
        }
        Err(Error::InvalidConfiguration(format!(
            "no collection found for handle {handle}"
        )))
    }

    fn list_products(&self, collection_id: u64) -> Result<Vec<Product>> {
        let mut url = self.endpoint("products.json")?;
        url.query_pairs_mut()
            .append_pair("collection_id", &collection_id.to_string())
            .append_pair("limit", &PAGE_LIMIT.to_string());

        let mut products = Vec::new();
        let mut seen = HashSet::new();
        loop {
            seen.insert(url.to_string());
            let response = self.get(url.clone())?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_url);
            let page: ProductPage = response.json()?;
            debug!("Fetched page with {} products", page.products.len());
            products.extend(page.products);

            match next {
                Some(next) if !seen.contains(&next) => {
                    url = Url::parse(&next).map_err(|e| Error::remote(next.as_str(), e))?;
                }
                _ => break,
            }
        }
        info!(
            "Collection {} lists {} products",
            collection_id,
            products.len()
        );
        Ok(products)
    }
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header.
pub fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Folder-safe product title: each of `\ / * ? : " < > |` becomes `_`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_collection_references() {
        assert_eq!("12345".parse::<CollectionRef>().unwrap(), CollectionRef::Id(12345));
        assert_eq!(
            " dunk ".parse::<CollectionRef>().unwrap(),
            CollectionRef::Handle("dunk".into())
        );
        assert_eq!(
            "https://store.example/collections/dunk-low?page=2"
                .parse::<CollectionRef>()
                .unwrap(),
            CollectionRef::Handle("dunk-low".into())
        );
        assert_eq!(
            "https://store.example/en/collections/sale/products/x"
                .parse::<CollectionRef>()
                .unwrap(),
            CollectionRef::Handle("sale".into())
        );
    }

    #[test]
    fn rejects_unusable_references() {
        for bad in ["", "   ", "https://store.example/products/x", "https://store.example/collections/"] {
            assert!(
                matches!(bad.parse::<CollectionRef>(), Err(Error::InvalidConfiguration(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn finds_next_link_among_several() {
        let header = "<https://s.myshopify.com/admin/api/2023-10/products.json?limit=250&page_info=abc>; rel=\"previous\", \
                      <https://s.myshopify.com/admin/api/2023-10/products.json?limit=250&page_info=def>; rel=\"next\"";
        assert_eq!(
            next_page_url(header).as_deref(),
            Some("https://s.myshopify.com/admin/api/2023-10/products.json?limit=250&page_info=def")
        );
        assert_eq!(next_page_url("<https://x/y>; rel=\"previous\""), None);
        assert_eq!(next_page_url(""), None);
    }

    #[test]
    fn sanitizes_titles() {
        assert_eq!(sanitize_title(r#"A/B\C*D?E:F"G<H>I|J"#), "A_B_C_D_E_F_G_H_I_J");
        assert_eq!(sanitize_title("Tênis Dunk Low"), "Tênis Dunk Low");
    }

    #[test]
    fn product_payload_tolerates_missing_fields() {
        let page: ProductPage = serde_json::from_str(
            r#"{"products":[{"id":1,"title":"T","images":[{"src":"https://a/1.jpg","id":9}]},{"id":2}]}"#,
        )
        .unwrap();
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.products[0].images[0].src, "https://a/1.jpg");
        assert!(page.products[1].images.is_empty());
    }

    #[test]
    fn builds_admin_base_url() {
        let c = ShopifyCatalog::new("a608d7-cf", "2023-10", "t").unwrap();
        assert_eq!(
            c.endpoint("products.json").unwrap().as_str(),
            "https://a608d7-cf.myshopify.com/admin/api/2023-10/products.json"
        );
    }
}
