//! Slate Core — domain models, database layer, and the roster sync engine
//! substrate shared by the provider connector crates.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod sync;
