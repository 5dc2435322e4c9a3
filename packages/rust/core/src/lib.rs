//! Export orchestration for aptsheet.
//!
//! Ties listing ingestion and the schema exporter together into one
//! end-to-end run (see [`pipeline::export_listings`]).

pub mod pipeline;
