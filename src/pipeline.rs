//! One invocation: acquire, load, render, assemble, emit.

use crate::dicom::ImageLoader;
use crate::input::{self, InputSource};
use crate::output::{encode_jpeg, OutputEnvelope, OutputFormat, StructuredRecord};
use crate::perf::Checkpoints;
use crate::platform::{Blob, HostContext};
use crate::rendering::{render_image, RenderBackend};
use crate::transcode::{transcode, transcode_checked};
use crate::{new_backend, Error, RenderConfig, Result};
use std::io::Write;
use std::sync::Arc;

/// Turn one DICOM payload into an output envelope with the built-in backend.
pub async fn process(config: &RenderConfig, blob: Blob, perf: &mut Checkpoints) -> Result<OutputEnvelope> {
    let mut backend = new_backend();
    process_with(config, blob, backend.as_mut(), perf).await
}

/// Like [`process`], rendering through the given backend.
pub async fn process_with(
    config: &RenderConfig,
    blob: Blob,
    backend: &mut dyn RenderBackend,
    perf: &mut Checkpoints,
) -> Result<OutputEnvelope> {
    let host = HostContext::new();
    let loader = ImageLoader::native();
    perf.checkpoint("init-done");

    let image = Arc::new(loader.load_blob(&host, blob).await?);
    perf.checkpoint("image-loaded");

    perf.checkpoint("render-start");
    let raw = render_image(&host, backend, image.clone(), config).await?;
    perf.checkpoint("render-complete");

    match config.output {
        OutputFormat::Jpeg => {
            let bytes = encode_jpeg(&raw, config.jpeg_quality)?;
            perf.checkpoint("result-ready");
            log::debug!("encoded {}x{} jpeg, {} bytes", raw.width, raw.height, bytes.len());
            Ok(OutputEnvelope::Compressed(bytes))
        }
        OutputFormat::Json => {
            let metadata = loader.metadata(&image.image_id).ok_or_else(|| {
                Error::Other(format!("no metadata recorded for {}", image.image_id))
            })?;
            perf.checkpoint("metadata-fetched");

            let windowed = if config.verify_grayscale {
                transcode_checked(&raw.data, image.color)?
            } else {
                transcode(&raw.data, image.color)
            };
            perf.checkpoint("result-ready");
            perf.total("total-processing");

            let record = StructuredRecord::assemble(&image, &metadata, windowed, perf.results(None));
            Ok(OutputEnvelope::Structured(record))
        }
    }
}

/// Run a full invocation. Primary output goes to `out` in one write; the
/// checkpoint dump, when enabled, goes to `diag`.
pub async fn run<W: Write, E: Write>(
    config: &RenderConfig,
    source: &InputSource,
    out: &mut W,
    diag: &mut E,
) -> Result<()> {
    config.validate()?;
    let mut perf = Checkpoints::new(config.perf);

    let blob = input::acquire(source).await?;
    let envelope = process(config, blob, &mut perf).await?;
    envelope.emit(out)?;

    perf.checkpoint("result-sent");
    perf.results(Some(diag));
    Ok(())
}
