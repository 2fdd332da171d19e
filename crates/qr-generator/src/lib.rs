//! qrsplice QR Generator
//!
//! Renders a URL as a high-redundancy QR code and optionally embeds a
//! centered logo on a white patch.
//!
//! ```text
//! url ──► encode (EC level H) ──► rasterize (scale, quiet zone)
//!                                        │
//! logo ──► fit to 20% ──► white patch ──►├── alpha composite
//!                                        ▼
//!                                 temp PNG ──► rename ──► output.png
//! ```

pub mod generate;
pub mod logo;
pub mod render;

pub use generate::*;
pub use logo::LogoPlacement;
pub use render::QrOptions;
