#![forbid(unsafe_code)]

//! Samples public video metadata from the YouTube Data API for a list of
//! topics and stores it as a CSV file and a SQLite table.

pub mod config;
pub mod details;
pub mod error;
pub mod export;
pub mod metadata;
pub mod pipeline;
pub mod record;
pub mod search;
pub mod youtube;
