//! Value extraction backed by a hosted vision model.
//!
//! Implements [`tally_core::extract::ValueExtractor`] against a Gemini-style
//! recognition API: the decoded image is staged to disk, uploaded to the
//! service's file store (which yields the stable image URL), and a vision
//! prompt asks the model to read the meter value off the photograph.

mod staging;

pub mod client;
pub mod error;

pub use client::{RecognitionClient, RecognitionConfig};
pub use error::{Error, Result};
