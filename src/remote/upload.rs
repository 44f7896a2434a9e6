use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::remote::body_snippet;

pub const IMGBB_ENDPOINT: &str = "https://api.imgbb.com/1/upload";
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Publishes image bytes and returns their public URL.
pub trait ImageHost: Send + Sync {
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String>;
}

pub struct ImgbbHost {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl ImgbbHost {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "image host API key is empty".to_string(),
            ));
        }
        let client = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: IMGBB_ENDPOINT.to_string(),
        })
    }
}

impl ImageHost for ImgbbHost {
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String> {
        let form = Form::new().text("key", self.api_key.clone()).part(
            "image",
            Part::bytes(bytes.to_vec()).file_name(file_name.to_string()),
        );
        let response = self.client.post(&self.endpoint).multipart(form).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(Error::remote(
                self.endpoint.as_str(),
                format!("HTTP {}: {}", status.as_u16(), body_snippet(&body)),
            ));
        }
        let url = parse_upload_response(&body)
            .map_err(|reason| Error::remote(self.endpoint.as_str(), reason))?;
        info!("Uploaded {} -> {}", file_name, url);
        Ok(url)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Deserialize)]
struct UploadData {
    url: String,
}

fn parse_upload_response(body: &str) -> std::result::Result<String, String> {
    serde_json::from_str::<UploadResponse>(body)
        .map(|r| r.data.url)
        .map_err(|e| format!("unexpected upload response ({e}): {}", body_snippet(body)))
}
