//! Rate-limited, retry-aware, cache-aware LLM client.
//!
//! The provider sits behind the narrow [`GenerativeBackend`] trait so the
//! rest of the pipeline (and every test) is independent of the wire
//! protocol. [`LlmClient`] layers rate limiting, exponential-backoff
//! retries, and cached-content tracking on top of a backend.

pub mod backend;
pub mod client;
pub mod error;
pub mod gemini;
pub mod retry;

pub use backend::{CacheSpec, GenerateRequest, GenerativeBackend, RawResponse};
pub use client::{ClientConfig, GenerateOptions, LlmClient, Response};
pub use error::{ClientError, Result};
pub use gemini::GeminiBackend;
pub use retry::{Decision, RetryPolicy, retry};
