//! HTTP client for the recognition service.

use std::{path::PathBuf, time::Duration};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use serde_json::json;
use tally_core::extract::{Extraction, ImagePayload, ValueExtractor};
use tracing::{debug, info};

use crate::{Error, Result, staging::StagedImage};

const EXTRACTION_PROMPT: &str =
  "Read the numeric value shown on the utility meter in this image. \
   Reply with the number only.";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the recognition service.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
  /// Service root, e.g. `https://generativelanguage.googleapis.com`.
  pub base_url:    String,
  pub api_key:     String,
  /// Vision-capable model name, e.g. `gemini-1.5-flash`.
  pub model:       String,
  /// Directory where images are staged while an extraction is in flight.
  pub staging_dir: PathBuf,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Client for a Gemini-style vision API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RecognitionClient {
  http:   reqwest::Client,
  config: RecognitionConfig,
}

impl RecognitionClient {
  pub fn new(config: RecognitionConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(Error::Http)?;
    Ok(Self { http, config })
  }

  fn base(&self) -> &str {
    self.config.base_url.trim_end_matches('/')
  }

  /// Upload the staged image to the service's file store. The returned URI
  /// is the measurement's stable image reference.
  async fn upload_file(&self, staged: &StagedImage, mime_type: &str) -> Result<String> {
    let bytes = tokio::fs::read(staged.path()).await.map_err(Error::Staging)?;

    let url = format!("{}/upload/v1beta/files?key={}", self.base(), self.config.api_key);
    let response = self
      .http
      .post(&url)
      .header("X-Goog-Upload-Protocol", "raw")
      .header(reqwest::header::CONTENT_TYPE, mime_type.to_owned())
      .body(bytes)
      .send()
      .await
      .map_err(Error::Http)?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::Api { status: status.as_u16(), body });
    }

    let uploaded: UploadResponse = response.json().await.map_err(Error::Http)?;
    uploaded.file.map(|f| f.uri).ok_or(Error::MissingFileUri)
  }

  /// Ask the vision model to read the number off the photograph.
  async fn recognize(&self, image: &ImagePayload) -> Result<String> {
    let url = format!(
      "{}/v1beta/models/{}:generateContent?key={}",
      self.base(),
      self.config.model,
      self.config.api_key
    );

    let body = json!({
      "contents": [{
        "parts": [
          { "text": EXTRACTION_PROMPT },
          { "inline_data": {
              "mime_type": image.mime_type,
              "data":      B64.encode(&image.bytes),
          }},
        ]
      }]
    });

    let response = self
      .http
      .post(&url)
      .json(&body)
      .send()
      .await
      .map_err(Error::Http)?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::Api { status: status.as_u16(), body });
    }

    let generated: GenerateResponse = response.json().await.map_err(Error::Http)?;
    generated.first_text().ok_or(Error::EmptyReply)
  }
}

impl ValueExtractor for RecognitionClient {
  type Error = Error;

  async fn extract(&self, image: &ImagePayload) -> Result<Extraction> {
    // Staged for the duration of the call; the guard releases the file on
    // every exit path.
    let staged = StagedImage::write(&self.config.staging_dir, &image.bytes, &image.mime_type)
      .await
      .map_err(Error::Staging)?;

    let image_reference = self.upload_file(&staged, &image.mime_type).await?;
    debug!(%image_reference, "image uploaded");

    let reply = self.recognize(image).await?;
    let value =
      parse_value(&reply).ok_or_else(|| Error::UnparseableValue(reply.clone()))?;

    info!(value, "meter value extracted");
    Ok(Extraction { value, image_reference })
  }
}

// ─── Response shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UploadResponse {
  file: Option<UploadedFile>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
  uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
  text: Option<String>,
}

impl GenerateResponse {
  fn first_text(&self) -> Option<String> {
    self
      .candidates
      .first()?
      .content
      .as_ref()?
      .parts
      .iter()
      .find_map(|p| p.text.clone())
  }
}

// ─── Value parsing ───────────────────────────────────────────────────────────

/// Parse the model's reply as a decimal number.
///
/// Replies are not always clean: the leading numeric token is taken and any
/// trailing commentary or units ignored.
fn parse_value(reply: &str) -> Option<f64> {
  let trimmed = reply.trim();
  let end = trimmed
    .char_indices()
    .take_while(|&(i, c)| c.is_ascii_digit() || c == '.' || (c == '-' && i == 0))
    .last()
    .map(|(i, c)| i + c.len_utf8())?;
  trimmed[..end].parse().ok()
}
