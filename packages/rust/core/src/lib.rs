//! Benchmark adapter between the GERBIL QA harness and a Qanary pipeline.
//!
//! This crate ties together endpoint generation, pipeline invocation,
//! artifact extraction and response assembly behind [`GerbilAdapter`].

pub mod adapter;
pub mod assembler;
pub mod endpoint;
pub mod extractor;

pub use adapter::GerbilAdapter;
pub use endpoint::{EndpointBuilder, GeneratedEndpoint, NO_SELECTION};
