use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::UploadError;

/// One contiguous slice of the payload, held in memory until acknowledged.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub start: u64,
    payload: Bytes,
}

impl Chunk {
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Rewind: the full payload again, without touching the source.
    pub fn replay(&self) -> Bytes {
        self.payload.clone()
    }
}

/// Turns a forward-only source into chunks that can be resent verbatim.
///
/// The scratch allocation is reused: once the previous [`Chunk`] is dropped,
/// the next fill reclaims it instead of allocating.
#[derive(Debug)]
pub struct ReplayBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        ReplayBuffer {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Read exactly `len` bytes from `source` as the chunk at `start`.
    pub async fn next_chunk<R>(
        &mut self,
        source: &mut R,
        start: u64,
        len: u64,
    ) -> Result<Chunk, UploadError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let want = usize::try_from(len)
            .ok()
            .filter(|want| *want <= self.capacity)
            .ok_or_else(|| {
                UploadError::InvalidConfig(format!(
                    "chunk of {len} bytes exceeds buffer capacity {}",
                    self.capacity
                ))
            })?;

        self.buf.clear();
        self.buf.reserve(want);
        let mut limited = (&mut *source).take(len);
        while self.buf.len() < want {
            if limited.read_buf(&mut self.buf).await? == 0 {
                return Err(UploadError::ShortRead {
                    expected: len,
                    actual: self.buf.len() as u64,
                });
            }
        }

        Ok(Chunk {
            start,
            payload: self.buf.split().freeze(),
        })
    }
}

/// Discard `n` bytes of `source`, e.g. those the server already holds.
pub async fn skip<R>(source: &mut R, n: u64) -> Result<(), UploadError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let skipped = tokio::io::copy(&mut (&mut *source).take(n), &mut tokio::io::sink()).await?;
    if skipped < n {
        return Err(UploadError::ShortRead {
            expected: n,
            actual: skipped,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[tokio::test]
    async fn test_chunks_in_order() -> Result<()> {
        let mut source: &[u8] = b"0123456789";
        let mut buffer = ReplayBuffer::with_capacity(4);

        let first = buffer.next_chunk(&mut source, 0, 4).await?;
        assert_eq!(0, first.start);
        assert_eq!(&b"0123"[..], first.replay());
        drop(first);

        let second = buffer.next_chunk(&mut source, 4, 4).await?;
        assert_eq!(&b"4567"[..], second.replay());
        drop(second);

        let last = buffer.next_chunk(&mut source, 8, 2).await?;
        assert_eq!(2, last.len());
        assert_eq!(&b"89"[..], last.replay());
        assert!(source.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_replay_does_not_consume_source() -> Result<()> {
        let mut source: &[u8] = b"abcdef";
        let mut buffer = ReplayBuffer::with_capacity(4);
        let chunk = buffer.next_chunk(&mut source, 0, 3).await?;
        for _ in 0..3 {
            assert_eq!(&b"abc"[..], chunk.replay());
        }
        assert_eq!(b"def", source);
        Ok(())
    }

    #[tokio::test]
    async fn test_short_read() {
        let mut source: &[u8] = b"abc";
        let mut buffer = ReplayBuffer::with_capacity(8);
        let res = buffer.next_chunk(&mut source, 0, 5).await;
        assert!(matches!(
            res,
            Err(UploadError::ShortRead { expected: 5, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn test_over_capacity() {
        let mut source: &[u8] = b"abcdef";
        let mut buffer = ReplayBuffer::with_capacity(4);
        let res = buffer.next_chunk(&mut source, 0, 5).await;
        assert!(matches!(res, Err(UploadError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_empty_chunk() -> Result<()> {
        let mut source: &[u8] = b"";
        let mut buffer = ReplayBuffer::with_capacity(4);
        let chunk = buffer.next_chunk(&mut source, 0, 0).await?;
        assert!(chunk.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_skip() -> Result<()> {
        let mut source: &[u8] = b"0123456789";
        skip(&mut source, 6).await?;
        assert_eq!(b"6789", source);
        let res = skip(&mut source, 10).await;
        assert!(matches!(res, Err(UploadError::ShortRead { expected: 10, actual: 4 })));
        Ok(())
    }
}
