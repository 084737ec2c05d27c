//! HTTP transport for the model upload pipeline.
//!
//! Implements the uploader's transport trait over `reqwest`: streaming
//! multipart uploads with byte-counting progress, per-file uploads, and the
//! JSON commit call, with Bearer authentication.

pub mod client;
mod stream;

pub use client::ApiClient;
