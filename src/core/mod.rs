//! Core library modules for mediagrab
//!
//! Search side: query, source, aggregator, normalize, selector.
//! Download side: stream (options and states) and downloader.

pub mod aggregator;
pub mod config;
pub mod downloader;
pub mod error;
pub mod item;
pub mod normalize;
pub mod query;
pub mod selector;
pub mod source;
pub mod stream;
