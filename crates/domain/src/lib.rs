//! `suroo-domain` — shared types for the Suroo assistant pipeline.
//!
//! Everything here is plain data: the shared error enum, chat turns,
//! outbound stream frames, the request auth context, and the TOML
//! configuration tree. No I/O beyond `Config::load`.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod stream;

pub use error::{Error, Result};
