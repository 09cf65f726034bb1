//! Image loading: blob registration, reading through the host file reader,
//! decoding, and per-image metadata lookup.

use super::{DecodedImage, DicomDecoder, ImageMetadata, NativeDecoder};
use crate::platform::{completion_signal, lock, Blob, HostContext, ReadSource};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Registry of in-memory files addressed by `dicomfile:<index>` ids.
#[derive(Default)]
pub struct FileManager {
    files: Mutex<Vec<Blob>>,
}

const FILE_SCHEME: &str = "dicomfile:";

impl FileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, blob: Blob) -> String {
        let mut files = lock(&self.files);
        files.push(blob);
        format!("{}{}", FILE_SCHEME, files.len() - 1)
    }

    pub fn get(&self, image_id: &str) -> Option<Blob> {
        let index: usize = image_id.strip_prefix(FILE_SCHEME)?.parse().ok()?;
        lock(&self.files).get(index).cloned()
    }
}

/// Loads images from blobs and remembers their metadata.
pub struct ImageLoader<D: DicomDecoder = NativeDecoder> {
    decoder: D,
    files: FileManager,
    metadata: Mutex<HashMap<String, ImageMetadata>>,
}

impl ImageLoader<NativeDecoder> {
    pub fn native() -> Self {
        Self::new(NativeDecoder::new())
    }
}

impl<D: DicomDecoder> ImageLoader<D> {
    pub fn new(decoder: D) -> Self {
        ImageLoader {
            decoder,
            files: FileManager::new(),
            metadata: Mutex::new(HashMap::new()),
        }
    }

    /// Register `blob` and load it.
    pub async fn load_blob(&self, host: &HostContext, blob: Blob) -> Result<DecodedImage> {
        let image_id = self.files.add(blob);
        log::debug!("image load started for {}", image_id);
        self.load_image(host, &image_id).await
    }

    /// Read a registered file through the host's file reader and decode it.
    pub async fn load_image(&self, host: &HostContext, image_id: &str) -> Result<DecodedImage> {
        let blob = self
            .files
            .get(image_id)
            .ok_or_else(|| Error::InputUnavailable(format!("unknown image id {}", image_id)))?;

        let (signal, wait) = completion_signal::<Result<Vec<u8>>>();
        let reader = host.file_reader();
        let on_load = signal.clone();
        reader.on_load(move |bytes| {
            on_load.fire(Ok(bytes));
        });
        reader.on_error(move |err| {
            signal.fire(Err(Error::UnsupportedInput(err.to_string())));
        });
        reader.read_as_array_buffer(ReadSource::Blob(blob));

        let bytes = wait.recv().await??;
        let decoded = self.decoder.decode(image_id, &bytes)?;
        lock(&self.metadata).insert(image_id.to_string(), decoded.metadata);
        Ok(decoded.image)
    }

    /// Metadata modules recorded for a loaded image
    pub fn metadata(&self, image_id: &str) -> Option<ImageMetadata> {
        lock(&self.metadata).get(image_id).cloned()
    }
}
