use bytes::{Bytes, BytesMut};
use sha2::{Digest, Sha256};

/// Totals produced once a write is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Bytes written.
    pub length: u64,
    /// Chunks emitted, including the trailing partial one.
    pub chunk_count: u32,
    /// `SHA-256` hex digest of everything written.
    pub checksum_sha256: String,
}

/// Splits an incoming byte sequence into fixed-size chunks while hashing it.
///
/// Writes of any size can be pushed; full chunks are handed back as soon as
/// they are complete and the remainder is returned by [`Chunker::finish`].
#[derive(Debug)]
pub struct Chunker {
    chunk_size: usize,
    pending: BytesMut,
    hasher: Sha256,
    length: u64,
    emitted: u32,
}

impl Chunker {
    /// Create a chunker. A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            pending: BytesMut::with_capacity(chunk_size),
            hasher: Sha256::new(),
            length: 0,
            emitted: 0,
        }
    }

    /// Chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Feed data, returning every chunk that became full.
    pub fn push(&mut self, mut data: &[u8]) -> Vec<Bytes> {
        self.hasher.update(data);
        self.length += data.len() as u64;

        let mut ready = Vec::new();
        while !data.is_empty() {
            let room = self.chunk_size - self.pending.len();
            let take = room.min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.pending.len() == self.chunk_size {
                ready.push(self.pending.split().freeze());
                self.emitted += 1;
            }
        }
        ready
    }

    /// Flush the trailing partial chunk (if any) and return the totals.
    pub fn finish(mut self) -> (Option<Bytes>, ChunkSummary) {
        let tail = if self.pending.is_empty() {
            None
        } else {
            self.emitted += 1;
            Some(self.pending.split().freeze())
        };
        let summary = ChunkSummary {
            length: self.length,
            chunk_count: self.emitted,
            checksum_sha256: hex::encode(self.hasher.finalize()),
        };
        (tail, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_across_writes() {
        let mut chunker = Chunker::new(4);
        assert!(chunker.push(b"ab").is_empty());
        let ready = chunker.push(b"cdefghij");
        assert_eq!(ready, vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")]);

        let (tail, summary) = chunker.finish();
        assert_eq!(tail, Some(Bytes::from_static(b"ij")));
        assert_eq!(summary.length, 10);
        assert_eq!(summary.chunk_count, 3);
    }

    #[test]
    fn exact_multiple_has_no_tail() {
        let mut chunker = Chunker::new(3);
        assert_eq!(chunker.push(b"abcdef").len(), 2);
        let (tail, summary) = chunker.finish();
        assert!(tail.is_none());
        assert_eq!(summary.chunk_count, 2);
    }

    #[test]
    fn empty_input() {
        let (tail, summary) = Chunker::new(8).finish();
        assert!(tail.is_none());
        assert_eq!(summary.length, 0);
        assert_eq!(summary.chunk_count, 0);
        assert_eq!(
            summary.checksum_sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
