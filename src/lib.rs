//! qrstudio - QR codes for links and contact cards, with color templates and logos
//!
//! The pipeline turns form input into a PNG:
//!
//! - **Input**: URLs get an `https://` scheme when missing, contacts become vCards
//! - **Templates**: a fixed catalog of dark/light color pairs, validated as hex
//! - **Encoding**: medium error correction, 512 px output, 2-module quiet zone
//! - **Logos**: centered on a circular plate covering 20% of the symbol
//! - **Export**: `qr-code-<template>-<mode>.png`
//!
//! # Example
//!
//! ```no_run
//! use qrstudio::{FormInput, FormState, Generator, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let form = FormState::new(FormInput::url("example.com"), "ocean");
//!     let mut session = Session::new(Generator::default(), form);
//!
//!     session.regenerate().await;
//!     if let Some(path) = session.export(std::path::Path::new("."))? {
//!         println!("Saved {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod compositor;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod qr;
pub mod session;
pub mod template;

// Re-exports for convenience
pub use error::{Error, Result};

pub use compositor::{LogoAsset, LogoOptions};
pub use config::{GenerationOptions, LogRotation, LoggingOptions, QrstudioConfig};
pub use input::{ContactRecord, FormInput, InputMode, build_contact_payload, format_url};
pub use qr::{ErrorCorrection, Payload, QrEncoder, RasterImage, RenderOptions};
pub use session::{
    Debouncer, FormEdit, FormState, GenerationOutcome, GenerationState, Generator, RequestId,
    RequestTracker, Session, SessionCommand, SessionEvent,
};
pub use template::{ColorPair, Template, resolve_color};
