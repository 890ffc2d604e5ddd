//! `whoopmania` - Results for tiny-whoop drone racing series
//!
//! This library keeps events, pilots, qualification tables and a fixed
//! 14-race double-elimination bracket, and scores bracket heats from
//! RotorHazard results exports.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod bracket;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod import;
pub mod logging;
pub mod model;
pub mod scoring;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use import::{import_bracket, import_qualification, score_export, BracketImportSummary};
pub use logging::init_logging;
pub use scoring::{score_heat, Heat, HeatRound, HeatScore, RankedResult, RoundEntry};
pub use storage::{Storage, StorageStats};
