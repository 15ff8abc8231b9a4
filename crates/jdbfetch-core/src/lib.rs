//! Chunked parallel downloader for definitions files.
//!
//! `resolver` turns a landing page into a [`target::DownloadTarget`];
//! `engine` plans byte ranges, runs them on a worker pool with bounded
//! retries, and verifies the assembled file before giving it its final name.

pub mod checksum;
pub mod config;
pub mod control;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod http;
pub mod logging;
pub mod pool;
pub mod resolver;
pub mod retry;
pub mod segmenter;
pub mod storage;
pub mod target;
pub mod url_model;
