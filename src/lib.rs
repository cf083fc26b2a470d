//! Benchmark driver for the OpenG graph engine.
//!
//! Graphs in the native VE format are transcoded into the engine's CSV
//! format with dense vertex ids, algorithms run as engine child processes,
//! and results are translated back to the native ids.

pub mod config;
pub mod error;
pub mod graph;
pub mod job;
pub mod mapper;
pub mod platform;
pub mod runner;
pub mod transcode;
pub mod translate;
pub mod types;
