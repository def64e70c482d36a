//! Core domain types, configuration, and the content-hash utility for
//! the tiller collaboration state engine.

pub mod config;
pub mod error;
pub mod hash;
pub mod types;
