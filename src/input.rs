//! Input acquisition: a file path or standard input, gathered into one blob.

use crate::platform::Blob;
use crate::{Error, Result};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Path(PathBuf),
    Stdin,
}

impl InputSource {
    /// A path when one is given, otherwise standard input.
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map(InputSource::Path).unwrap_or(InputSource::Stdin)
    }
}

/// Read the whole input. Empty input is an error.
pub async fn acquire(source: &InputSource) -> Result<Blob> {
    let blob = match source {
        InputSource::Path(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                Error::InputUnavailable(format!("cannot read {}: {}", path.display(), e))
            })?;
            Blob::from_bytes(bytes)
        }
        InputSource::Stdin => read_to_blob(&mut tokio::io::stdin()).await?,
    };
    if blob.is_empty() {
        return Err(Error::InputUnavailable(match source {
            InputSource::Path(path) => format!("{} is empty", path.display()),
            InputSource::Stdin => "no file given and standard input is empty".to_string(),
        }));
    }
    log::debug!("acquired {} input bytes", blob.len());
    Ok(blob)
}

/// Collect a reader to its end, chunk by chunk, into one blob.
pub async fn read_to_blob<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Blob> {
    let mut chunks = Vec::new();
    loop {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        chunk.truncate(n);
        chunks.push(chunk);
    }
    log::debug!("read {} chunks", chunks.len());
    Ok(Blob::from_chunks(chunks))
}
