//! File body delivery: direct reads and chunked streaming.
//!
//! Small files (per [`DeliveryPlan::chunked`]) are read whole; everything
//! else streams through [`FileChunkStream`], which yields [`Bytes`] frames
//! of at most `chunk_size` bytes so the response body never holds the
//! whole file in memory. A mid-stream read error terminates the stream
//! with the error; by then headers are already on the wire, so the only
//! correct behavior is to stop writing and let the connection close.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::AccessError;
use crate::policy::DeliveryPlan;

/// The response body for an approved delivery.
#[derive(Debug)]
pub enum DeliveryBody {
    /// The entire file, read up front.
    Direct(Bytes),
    /// A lazily-read chunk stream.
    Chunked(FileChunkStream),
}

/// Prepare the body for a resolved, policy-approved file.
///
/// Open and read failures surface as [`AccessError::Io`]; the file passed
/// resolution, so a failure here is a server-side problem, not a client
/// one.
pub async fn prepare(
    path: &Path,
    plan: &DeliveryPlan,
    chunk_size: usize,
) -> Result<DeliveryBody, AccessError> {
    if plan.chunked {
        let file = File::open(path).await.map_err(AccessError::Io)?;
        tracing::debug!(
            path = %path.display(),
            size = plan.size,
            chunk_size,
            "starting chunked delivery"
        );
        Ok(DeliveryBody::Chunked(FileChunkStream::new(file, chunk_size)))
    } else {
        let bytes = tokio::fs::read(path).await.map_err(AccessError::Io)?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "direct delivery");
        Ok(DeliveryBody::Direct(Bytes::from(bytes)))
    }
}

/// Streams a file as `Bytes` frames of at most the configured chunk size.
///
/// The file handle closes when the stream drops, on every exit path.
#[derive(Debug)]
pub struct FileChunkStream {
    file: File,
    buf: Box<[u8]>,
    chunks: u64,
    bytes_sent: u64,
    done: bool,
}

impl FileChunkStream {
    pub fn new(file: File, chunk_size: usize) -> Self {
        Self {
            file,
            buf: vec![0u8; chunk_size.max(1)].into_boxed_slice(),
            chunks: 0,
            bytes_sent: 0,
            done: false,
        }
    }
}

impl Stream for FileChunkStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        let mut read_buf = ReadBuf::new(&mut this.buf);
        match Pin::new(&mut this.file).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(err)) => {
                this.done = true;
                tracing::error!(
                    chunks = this.chunks,
                    bytes_sent = this.bytes_sent,
                    %err,
                    "read failed mid-stream"
                );
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    this.done = true;
                    tracing::debug!(
                        chunks = this.chunks,
                        bytes_sent = this.bytes_sent,
                        "chunked delivery complete"
                    );
                    return Poll::Ready(None);
                }
                this.chunks += 1;
                this.bytes_sent += filled.len() as u64;
                Poll::Ready(Some(Ok(Bytes::copy_from_slice(filled))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tempfile::TempDir;

    const CHUNK: usize = 64;

    async fn collect_chunks(path: &Path) -> Vec<Bytes> {
        let file = File::open(path).await.unwrap();
        let mut stream = FileChunkStream::new(file, CHUNK);
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        chunks
    }

    fn write_file(dir: &TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let contents: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_chunks_reassemble_to_file_contents() {
        let dir = TempDir::new().unwrap();
        // Boundary sizes around the chunk size.
        for len in [0, 1, CHUNK - 1, CHUNK, CHUNK + 1, CHUNK * 3, CHUNK * 3 + 7] {
            let path = write_file(&dir, &format!("f{len}"), len);
            let chunks = collect_chunks(&path).await;

            let reassembled: Vec<u8> = chunks.iter().flat_map(|c| c.to_vec()).collect();
            assert_eq!(reassembled, std::fs::read(&path).unwrap(), "len={len}");
            assert!(
                chunks.iter().all(|c| c.len() <= CHUNK),
                "oversized chunk at len={len}"
            );
        }
    }

    #[tokio::test]
    async fn test_empty_file_yields_no_chunks() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty", 0);
        assert!(collect_chunks(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_prepare_selects_direct_body() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "small", 10);
        let plan = DeliveryPlan {
            mime: "application/octet-stream".to_string(),
            size: 10,
            chunked: false,
        };

        match prepare(&path, &plan, CHUNK).await.unwrap() {
            DeliveryBody::Direct(bytes) => {
                assert_eq!(bytes.as_ref(), std::fs::read(&path).unwrap().as_slice());
            }
            DeliveryBody::Chunked(_) => panic!("expected direct body"),
        }
    }

    #[tokio::test]
    async fn test_prepare_selects_chunked_body() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "large", CHUNK * 2);
        let plan = DeliveryPlan {
            mime: "application/octet-stream".to_string(),
            size: (CHUNK * 2) as u64,
            chunked: true,
        };

        match prepare(&path, &plan, CHUNK).await.unwrap() {
            DeliveryBody::Chunked(mut stream) => {
                let mut total = 0;
                while let Some(chunk) = stream.next().await {
                    total += chunk.unwrap().len();
                }
                assert_eq!(total, CHUNK * 2);
            }
            DeliveryBody::Direct(_) => panic!("expected chunked body"),
        }
    }

    #[tokio::test]
    async fn test_prepare_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let plan = DeliveryPlan {
            mime: "application/octet-stream".to_string(),
            size: 10,
            chunked: false,
        };

        let err = prepare(&dir.path().join("gone"), &plan, CHUNK)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Io(_)));
        assert_eq!(err.status(), 500);
    }
}
