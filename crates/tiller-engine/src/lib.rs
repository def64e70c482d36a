//! The tiller state engine: audit log, history store, fixed-window rate
//! limiter, task/run mutation service, and event fan-out.
//!
//! The engine owns the canonical Task/Run tables. The only legal mutation
//! path is through [`engine::StateEngine`], which guarantees that every
//! committed mutation produces exactly one audit entry and one domain event.

pub mod alerts;
pub mod audit;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod rate_limit;
