//! Collegium - college-information chatbot backend
//!
//! Turns free-form visitor questions into ranked answers: keyword
//! extraction, tiered full-text search with a LIKE fallback, Q&A ranking
//! with feedback-driven scores, fuzzy "did you mean" suggestions, rate
//! limiting and response caching, all scoped per tenant (college).

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod feedback;
pub mod keywords;
pub mod lexicon;
pub mod pipeline;
pub mod query;
pub mod ranking;
pub mod ratelimit;
pub mod storage;
pub mod text;

pub use config::Config;
pub use error::{CollegiumError, ErrorStatus, Result};
pub use pipeline::{ChatRequest, SearchPipeline};
