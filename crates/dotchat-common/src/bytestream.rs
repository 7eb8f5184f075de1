//! Growable byte buffer with a read cursor.
//!
//! [`ByteStream`] is the unit of exchange between the transport and the
//! codec: the transport appends raw bytes at the tail, the codec consumes
//! them from the cursor. The stream moves bytes verbatim; byte-order
//! handling is entirely the codec's business.

/// Once the read cursor has advanced past this many bytes, the consumed
/// prefix is dropped on the next fixed-size extraction.
const COMPACT_THRESHOLD: usize = 100;

/// Append-only byte buffer with a monotonically advancing read cursor.
#[derive(Debug, Clone, Default)]
pub struct ByteStream {
    data: Vec<u8>,
    cursor: usize,
}

impl ByteStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream pre-filled with `bytes`, cursor at the start.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            cursor: 0,
        }
    }

    /// Append bytes at the tail.
    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Discard everything buffered, then append.
    pub fn overwrite(&mut self, bytes: &[u8]) {
        self.clear();
        self.write(bytes);
    }

    /// Copy up to `buf.len()` unread bytes into `buf`, advancing the cursor.
    /// Returns the actual count, which is less than requested when the
    /// stream is exhausted.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.cursor..self.cursor + n]);
        self.cursor += n;
        n
    }

    /// Consume exactly `N` bytes starting at the cursor, or `None` without
    /// advancing when fewer than `N` remain.
    pub fn extract<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.remaining() < N {
            return None;
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.cursor..self.cursor + N]);
        self.cursor += N;
        if self.cursor > COMPACT_THRESHOLD {
            self.compact();
        }
        Some(out)
    }

    /// Bytes left between the cursor and the tail.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// View of the unread tail, for handing to a transport write.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    /// Reset the cursor and drop the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
        self.cursor = 0;
    }

    fn compact(&mut self) {
        self.data.drain(..self.cursor);
        self.cursor = 0;
    }
}
