// src/lib.rs

//! UniGuide study-abroad advising backend.
//!
//! - `services`: pathway resolution, usage gating, search, conversions
//! - `pipeline`: batch jobs (population, pathway scraping, migrations)
//! - `api`: REST layer (feature `server`)

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(feature = "server")]
pub mod api;
