//! The `ValueExtractor` collaborator contract.
//!
//! Extraction is one opaque external call: image in, best-effort numeric
//! reading plus a stable image locator out. The workflow attempts no
//! retries; retry policy, if any, belongs to the implementation or an outer
//! layer.

use std::future::Future;

use bytes::Bytes;

/// Raw image handed to the extractor.
#[derive(Debug, Clone)]
pub struct ImagePayload {
  pub bytes:     Bytes,
  /// MIME type of `bytes`, e.g. `image/jpeg`.
  pub mime_type: String,
}

/// A successful extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
  /// The reading the recognition service read off the photograph.
  pub value:           f64,
  /// Stable, externally dereferenceable reference to the stored image,
  /// produced as a side effect of processing.
  pub image_reference: String,
}

pub trait ValueExtractor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn extract<'a>(
    &'a self,
    image: &'a ImagePayload,
  ) -> impl Future<Output = Result<Extraction, Self::Error>> + Send + 'a;
}
