use alloc::collections::VecDeque;
use alloc::vec::Vec;

/// A bounded, in-memory byte pipe with a writing and a reading side.
///
/// Pushed data is kept as the chunks it was written in; `pop` only splits the front chunk
/// logically (via `removed_prefix`) instead of shifting the buffer.
///
/// Invariant: `bytes_pushed() - bytes_popped() == bytes_buffered() <= capacity`.
/// Once `set_error` is called the stream is frozen: pushes, pops and close become no-ops.
#[derive(Debug, Clone)]
pub struct ByteStream {
    capacity: u64,
    buffer: VecDeque<Vec<u8>>,
    // bytes of the front chunk that were already popped
    removed_prefix: usize,
    total_pushed: u64,
    total_popped: u64,
    closed: bool,
    errored: bool,
}

impl ByteStream {
    pub fn new(capacity: u64) -> Self {
        ByteStream {
            capacity,
            buffer: VecDeque::new(),
            removed_prefix: 0,
            total_pushed: 0,
            total_popped: 0,
            closed: false,
            errored: false,
        }
    }

    // writer side

    /// Appends as much of `data` as fits, the rest is dropped.
    pub fn push(&mut self, mut data: Vec<u8>) {
        if self.errored || self.closed || data.is_empty() {
            return;
        }

        let available = self.available_capacity();
        if available == 0 {
            return;
        }
        if data.len() as u64 > available {
            data.truncate(available as usize);
        }

        self.total_pushed += data.len() as u64;
        self.buffer.push_back(data);
    }

    pub fn close(&mut self) {
        if !self.errored {
            self.closed = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn available_capacity(&self) -> u64 {
        self.capacity - self.bytes_buffered()
    }

    pub fn bytes_pushed(&self) -> u64 {
        self.total_pushed
    }

    // reader side

    /// The next contiguous run of buffered bytes (possibly fewer than `bytes_buffered`).
    pub fn peek(&self) -> &[u8] {
        match self.buffer.front() {
            Some(chunk) => &chunk[self.removed_prefix..],
            None => &[],
        }
    }

    /// Discards up to `len` bytes from the front of the stream.
    pub fn pop(&mut self, len: u64) {
        if self.errored {
            return;
        }

        let mut len = len.min(self.bytes_buffered());
        self.total_popped += len;

        while len > 0 {
            let Some(front) = self.buffer.front() else {
                break;
            };

            let remaining = (front.len() - self.removed_prefix) as u64;
            if len < remaining {
                self.removed_prefix += len as usize;
                break;
            }

            self.buffer.pop_front();
            self.removed_prefix = 0;
            len -= remaining;
        }
    }

    /// Pops up to `len` bytes and hands them back, crossing chunk boundaries as needed.
    pub fn read(&mut self, len: u64) -> Vec<u8> {
        let len = len.min(self.bytes_buffered());
        let mut out = Vec::with_capacity(len as usize);

        while (out.len() as u64) < len && !self.errored {
            let want = (len - out.len() as u64) as usize;
            let chunk = self.peek();
            let take = want.min(chunk.len());
            out.extend_from_slice(&chunk[..take]);
            self.pop(take as u64);
        }

        out
    }

    pub fn is_finished(&self) -> bool {
        self.closed && self.bytes_buffered() == 0
    }

    pub fn bytes_buffered(&self) -> u64 {
        self.total_pushed - self.total_popped
    }

    pub fn bytes_popped(&self) -> u64 {
        self.total_popped
    }

    // shared

    pub fn set_error(&mut self) {
        self.errored = true;
    }

    pub fn has_error(&self) -> bool {
        self.errored
    }
}
