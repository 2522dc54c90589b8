//! Request body wrapper.
//!
//! # Responsibilities
//! - Wrap the host's raw body stream for the inner pipeline
//! - Buffer the body so it can be read more than once
//! - Move large bodies from memory to an anonymous temp file
//!
//! # Design Decisions
//! - The expected length is a hint for where to buffer, never a cap
//! - The switch threshold is configuration; without one, memory is used
//! - Temp files are unlinked at creation and vanish when dropped

use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, StreamExt};
use std::io;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::observability::metrics;

/// When buffered bodies move from memory to temporary storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchPolicy {
    /// Keep every body in memory regardless of size.
    pub disabled: bool,
    /// Size in bytes at which a body moves to temporary storage.
    pub threshold: Option<u64>,
}

impl SwitchPolicy {
    fn should_switch(&self, len: u64) -> bool {
        !self.disabled && self.threshold.is_some_and(|threshold| len >= threshold)
    }
}

enum Storage {
    Memory(BytesMut),
    File(File),
}

/// Buffered view over a request body stream.
pub struct RequestStream {
    source: Option<BoxStream<'static, io::Result<Bytes>>>,
    expected_length: u64,
    policy: SwitchPolicy,
    storage: Storage,
    len: u64,
}

impl RequestStream {
    pub fn new(
        source: BoxStream<'static, io::Result<Bytes>>,
        expected_length: u64,
        policy: SwitchPolicy,
    ) -> Self {
        Self {
            source: Some(source),
            expected_length,
            policy,
            storage: Storage::Memory(BytesMut::new()),
            len: 0,
        }
    }

    /// A stream with no content.
    pub fn empty() -> Self {
        Self::new(futures_util::stream::empty().boxed(), 0, SwitchPolicy::default())
    }

    /// Length declared by the client; zero when unknown.
    pub fn expected_length(&self) -> u64 {
        self.expected_length
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0 && self.source.is_none()
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.storage, Storage::Memory(_))
    }

    /// Drain the source into storage. Returns the total body length.
    pub async fn buffer(&mut self) -> io::Result<u64> {
        let Some(mut source) = self.source.take() else {
            return Ok(self.len);
        };

        if self.policy.should_switch(self.expected_length) {
            self.switch_to_file().await?;
        }

        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            if self.is_in_memory() && self.policy.should_switch(self.len + chunk.len() as u64) {
                self.switch_to_file().await?;
            }
            match &mut self.storage {
                Storage::Memory(buf) => buf.extend_from_slice(&chunk),
                Storage::File(file) => file.write_all(&chunk).await?,
            }
            self.len += chunk.len() as u64;
        }

        if let Storage::File(file) = &mut self.storage {
            file.flush().await?;
        }
        Ok(self.len)
    }

    /// Buffer the whole body and return a copy of it.
    pub async fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        self.buffer().await?;
        match &mut self.storage {
            Storage::Memory(buf) => Ok(buf.to_vec()),
            Storage::File(file) => {
                let mut out = Vec::with_capacity(self.len as usize);
                file.rewind().await?;
                file.read_to_end(&mut out).await?;
                Ok(out)
            }
        }
    }

    async fn switch_to_file(&mut self) -> io::Result<()> {
        if !self.is_in_memory() {
            return Ok(());
        }
        let mut file = File::from_std(tempfile::tempfile()?);
        if let Storage::Memory(buf) = &self.storage {
            file.write_all(buf).await?;
        }
        tracing::debug!(
            buffered = self.len,
            expected_length = self.expected_length,
            "Request body switched to temporary storage"
        );
        metrics::record_body_spill();
        self.storage = Storage::File(file);
        Ok(())
    }
}

impl std::fmt::Debug for RequestStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestStream")
            .field("expected_length", &self.expected_length)
            .field("len", &self.len)
            .field("in_memory", &self.is_in_memory())
            .field("drained", &self.source.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(chunks: &[&'static [u8]]) -> BoxStream<'static, io::Result<Bytes>> {
        let chunks: Vec<io::Result<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        futures_util::stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn test_reads_past_zero_hint() {
        let mut stream = RequestStream::new(source(&[b"hello ", b"world"]), 0, SwitchPolicy::default());

        assert_eq!(stream.read_to_end().await.unwrap(), b"hello world");
        assert_eq!(stream.len(), 11);
        assert!(stream.is_in_memory());
    }

    #[tokio::test]
    async fn test_read_is_repeatable() {
        let mut stream = RequestStream::new(source(&[b"abc"]), 3, SwitchPolicy::default());

        assert_eq!(stream.read_to_end().await.unwrap(), b"abc");
        assert_eq!(stream.read_to_end().await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_switches_when_threshold_crossed() {
        let policy = SwitchPolicy {
            disabled: false,
            threshold: Some(8),
        };
        let mut stream = RequestStream::new(source(&[b"12345", b"67890", b"!"]), 0, policy);

        assert_eq!(stream.read_to_end().await.unwrap(), b"1234567890!");
        assert!(!stream.is_in_memory());
    }

    #[tokio::test]
    async fn test_large_hint_starts_on_disk() {
        let policy = SwitchPolicy {
            disabled: false,
            threshold: Some(100),
        };
        let mut stream = RequestStream::new(source(&[b"tiny"]), 1_000, policy);

        stream.buffer().await.unwrap();
        assert!(!stream.is_in_memory());
        assert_eq!(stream.read_to_end().await.unwrap(), b"tiny");
    }

    #[tokio::test]
    async fn test_disabled_switching_stays_in_memory() {
        let policy = SwitchPolicy {
            disabled: true,
            threshold: Some(4),
        };
        let mut stream = RequestStream::new(source(&[b"0123456789"]), 10, policy);

        assert_eq!(stream.buffer().await.unwrap(), 10);
        assert!(stream.is_in_memory());
    }

    #[tokio::test]
    async fn test_source_error_surfaces() {
        let failing = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ])
        .boxed();
        let mut stream = RequestStream::new(failing, 0, SwitchPolicy::default());

        let err = stream.read_to_end().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }
}
