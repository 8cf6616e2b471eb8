//! Sentinews: a market-news sentiment pipeline
//!
//! Crawls per-ticker news feeds, deduplicates headlines across a
//! sliding window, fans articles out over a shared stream bus to an
//! LLM sentiment analyzer and a vector archiver, and drives the whole
//! thing on a market-aware cadence with at-least-once delivery.

pub mod api;
pub mod app;
pub mod core;
pub mod crawl;
pub mod data;
pub mod domain;
pub mod llm;
