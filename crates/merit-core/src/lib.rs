//! Core types, store traits and the achievement lifecycle service for Merit.
//!
//! This crate has no HTTP or database dependencies. The
//! storage backends (`merit-store-sqlite`) and the REST layer (`merit-api`)
//! both depend on it.

// Trait impls use native `async fn`; the traits spell out `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod achievement;
pub mod directory;
pub mod error;
pub mod memory;
pub mod reference;
pub mod saga;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod view;
pub mod workflow;

pub use error::{Error, Result};
pub use service::{AchievementInput, AchievementService, RequestContext};
