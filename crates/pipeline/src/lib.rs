//! qrsplice Pipeline
//!
//! Wires the QR generator and the three media stages into one run:
//!
//! ```text
//! preflight ─► qr code ─► image overlay ─► audio mix ─► concatenate ─► cleanup?
//!   │            │             │               │             │
//!   engine?      qr.png        intermediate_1  intermediate_2 final_output.mp4
//!   inputs?
//! ```
//!
//! Every stage blocks on the previous one; the first error stops the run.

pub mod orchestrator;
pub mod report;

pub use orchestrator::*;
pub use report::PipelineReport;
