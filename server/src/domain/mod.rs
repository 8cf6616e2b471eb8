//! Domain logic for the news ingestion pipeline
//!
//! - `news` - articles, collector, analyzer, archiver, and the
//!   orchestrator loop that drives them on a market-aware cadence

pub mod news;

pub use news::NewsPipeline;
