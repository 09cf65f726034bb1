//! In-memory blobs and an asynchronous reader over them

use super::lock;
use crate::Error;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Immutable binary payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    bytes: Arc<Vec<u8>>,
}

impl Blob {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Blob { bytes: Arc::new(bytes) }
    }

    /// Concatenate chunks in order into one blob.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut bytes = Vec::new();
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }
        Self::from_bytes(bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Values a caller may hand to [`FileReader::read_as_array_buffer`].
/// Only [`ReadSource::Blob`] can be read.
#[derive(Debug, Clone)]
pub enum ReadSource {
    Blob(Blob),
    Text(String),
    Null,
}

impl ReadSource {
    fn describe(&self) -> &'static str {
        match self {
            ReadSource::Blob(_) => "blob",
            ReadSource::Text(_) => "text",
            ReadSource::Null => "null",
        }
    }
}

type OnLoadHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;
type OnErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Reads a blob's bytes on a later scheduling turn and reports them through
/// `on_load`. Failures go to `on_error`; nothing is raised from the
/// synchronous call.
#[derive(Clone, Default)]
pub struct FileReader {
    on_load: Arc<Mutex<Option<OnLoadHandler>>>,
    on_error: Arc<Mutex<Option<OnErrorHandler>>>,
    result: Arc<Mutex<Option<Vec<u8>>>>,
}

impl FileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load<F>(&self, cb: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        *lock(&self.on_load) = Some(Arc::new(cb));
    }

    pub fn on_error<F>(&self, cb: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        *lock(&self.on_error) = Some(Arc::new(cb));
    }

    /// Bytes of the last successful read
    pub fn result(&self) -> Option<Vec<u8>> {
        lock(&self.result).clone()
    }

    /// Schedule a read of `source`. Must be called inside a tokio runtime.
    pub fn read_as_array_buffer(&self, source: ReadSource) -> JoinHandle<()> {
        let reader = self.clone();
        tokio::spawn(async move {
            let blob = match source {
                ReadSource::Blob(blob) => blob,
                other => {
                    let err = Error::UnsupportedInput(format!(
                        "file reader expects a blob, got {}",
                        other.describe()
                    ));
                    log::error!("{}", err);
                    reader.report_error(&err);
                    return;
                }
            };

            let on_load = lock(&reader.on_load).clone();
            let Some(on_load) = on_load else {
                log::error!("file reader has no load callback registered");
                return;
            };

            log::debug!("read {} bytes from blob", blob.len());
            let bytes = blob.as_bytes().to_vec();
            *lock(&reader.result) = Some(bytes.clone());
            on_load(bytes);
        })
    }

    fn report_error(&self, err: &Error) {
        let on_error = lock(&self.on_error).clone();
        if let Some(cb) = on_error {
            cb(err);
        }
    }
}
