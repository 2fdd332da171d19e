//! qrsplice Media Engine
//!
//! The three ffmpeg-backed stages of the pipeline, plus the engine seam
//! they run through.
//!
//! # Stage Graph
//!
//! ```text
//! video1.mp4 ──┐
//!              ├── overlay (re-encode video, pass audio) ──► intermediate_1
//! qr.png ──────┘                                                 │
//!                                                                ├── probe
//! target.m4a ─────────────────────────────────────────────────── ┤
//!                                     Blend (amix) | Replace     │
//!                                                                ▼
//!                                    intermediate_2 (video stream-copied)
//!                                                                │
//! video2.mp4 ────────────────── concat list ─────────────────────┤
//!                                                                ▼
//!                                                         final_output.mp4
//! ```

pub mod audio_mix;
pub mod concat;
pub mod engine;
pub mod overlay;
pub mod probe;

pub use audio_mix::{mix_audio, MixGains, MixOutcome, MixRequest, MixStrategy};
pub use concat::{concatenate, ConcatMode, ConcatOutcome, ConcatRequest};
pub use engine::{ensure_available, EngineOutput, FfmpegEngine, MediaEngine};
pub use overlay::{overlay_image, OverlayPosition, OverlayRequest, VideoEncoding};
pub use probe::{MediaProbe, StreamInfo, StreamKind};
