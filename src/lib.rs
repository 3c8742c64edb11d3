//! Pollution Dashboard - weather and pollution sensor charts
//!
//! This library exposes the core modules for testing and reuse.

pub mod chart;
pub mod common;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod proxy;
pub mod render;
pub mod routes;
pub mod source;
