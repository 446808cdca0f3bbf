//! On-disk outputs of the pipeline.
//!
//! # Submodules
//!
//! - [`json`]: feed metadata arrays and per-article record files
//!
//! The record directories are derived from the collection date by
//! [`Settings`](crate::config::Settings).

pub mod json;
