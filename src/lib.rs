//! DICOM headless render pipeline
//!
//! Loads one DICOM image, renders it through a display-oriented backend
//! running inside a synthetic host (no windowing system, no GPU), captures
//! the RGBA result and emits either a JPEG or a JSON record carrying
//! metadata, source pixels and windowed display pixels.
//!
//! # Features
//!
//! - **Synthetic host**: drawing surfaces, a single-listener event sink and a
//!   file reader, enough for the backend to run headless
//! - **CPU stack backend**: modality LUT, linear VOI window and MONOCHROME1
//!   inversion
//! - **Bounded completion wait**: a backend that never reports completion
//!   fails with [`Error::Timeout`] instead of hanging
//!
//! # Example
//!
//! ```no_run
//! use dicom_render::{input::InputSource, pipeline, OutputFormat, RenderConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> dicom_render::Result<()> {
//! let config = RenderConfig {
//!     output: OutputFormat::Jpeg,
//!     jpeg_quality: 90,
//!     ..Default::default()
//! };
//! let source = InputSource::Path("slice.dcm".into());
//! pipeline::run(&config, &source, &mut std::io::stdout(), &mut std::io::stderr()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

// Decoded image model, native decoder and loader
pub mod dicom;

// Synthetic host: document, surfaces, events, file reader
pub mod platform;

// Render orchestration and the CPU backend
pub mod rendering;

pub mod input;
pub mod output;
pub mod perf;
pub mod pipeline;
pub mod transcode;

pub use output::{OutputEnvelope, OutputFormat, StructuredRecord};
pub use platform::{HostContext, RawPixelBuffer};
pub use rendering::{render_image, CpuStackBackend, RenderBackend};
pub use transcode::{transcode, transcode_checked, TranscodedBuffer};

/// Configuration for one render invocation
///
/// The defaults match the command line defaults: JSON output, a 30 second
/// render timeout, JPEG quality 99, no checkpoint recording and no grayscale
/// channel verification.
///
/// # Examples
///
/// ```
/// let cfg = dicom_render::RenderConfig::default();
/// assert_eq!(cfg.jpeg_quality, 99);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Output mode
    pub output: OutputFormat,
    /// How long to wait for the backend's completion event, in milliseconds
    pub render_timeout_ms: u64,
    /// JPEG quality, 1 to 100
    pub jpeg_quality: u8,
    /// Record checkpoints and attach them to the output
    pub perf: bool,
    /// Fail when a grayscale render has unequal color channels
    pub verify_grayscale: bool,
    /// Viewport background painted behind the image
    pub viewport_background: [u8; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output: OutputFormat::Json,
            render_timeout_ms: 30_000,
            jpeg_quality: output::DEFAULT_JPEG_QUALITY,
            perf: false,
            verify_grayscale: false,
            viewport_background: [0, 0, 0],
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::ConfigError(format!(
                "jpeg quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.render_timeout_ms == 0 {
            return Err(Error::ConfigError(
                "render timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Create the built-in rendering backend.
pub fn new_backend() -> Box<dyn RenderBackend> {
    Box::new(CpuStackBackend::new())
}
