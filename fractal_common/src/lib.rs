//! FractalWave Common Library
//!
//! This crate provides the band layout constants, the [`band::BandSnapshot`]
//! type and configuration loading utilities shared by the consumer, the
//! shared-memory crate and the simulated producer.
//!
//! # Module Structure
//!
//! - [`consts`] - Band layout, default object names, limits
//! - [`band`] - Fixed-capacity band snapshot and its wire encoding
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! fractal = { package = "fractal_common", path = "../fractal_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use fractal_common::consts::*;
//! use fractal_common::config::{ConfigLoader, ChannelConfig};
//! ```

pub mod band;
pub mod config;
pub mod consts;
pub mod prelude;
