//! Core of a portfolio-optimization platform: strategy configuration, market
//! scenario selection, an event-sourced job lifecycle store, results
//! projection, and the gateway contract an optimizer backend fulfills.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod gateway;
pub mod job;
pub mod logging;
pub mod results;
pub mod scenario;
pub mod storage;
pub mod store;
pub mod strategy;
