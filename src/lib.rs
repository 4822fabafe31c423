//! Ingests public hazard feeds (FIRMS wildfire detections, FEMA shelters and
//! AirNow observations), normalizes them into flat records with deterministic
//! ids and upserts them into an Algolia-compatible search index.

pub mod airnow;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fema;
pub mod firms;
pub mod http_util;
pub mod index;
pub mod notify;
pub mod output;
