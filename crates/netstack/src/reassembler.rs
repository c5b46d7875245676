use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::trace;

use crate::stream::ByteStream;

/// Puts substrings of a byte stream, delivered in any order and with arbitrary overlap,
/// back in sequence and writes them to the output stream as soon as they are contiguous.
///
/// Only bytes inside the output's current window `[bytes_pushed, bytes_pushed +
/// available_capacity)` are kept. Where a new substring overlaps bytes that are already
/// pending, the newest substring wins.
#[derive(Debug)]
pub struct Reassembler {
    output: ByteStream,
    // absolute index -> bytes, ranges never overlap
    pending: BTreeMap<u64, Vec<u8>>,
    total_pending_bytes: u64,
    // one past the last byte of the stream, once known
    end_index: Option<u64>,
}

impl Reassembler {
    pub fn new(output: ByteStream) -> Self {
        Reassembler {
            output,
            pending: BTreeMap::new(),
            total_pending_bytes: 0,
            end_index: None,
        }
    }

    pub fn insert(&mut self, mut first_index: u64, mut data: Vec<u8>, mut is_last_substring: bool) {
        if data.is_empty() {
            if is_last_substring && self.end_index.is_none() {
                self.end_index = Some(first_index);
            }
            self.try_close();
            return;
        }

        if self.output.is_closed() || self.output.available_capacity() == 0 {
            return;
        }

        let window_start = self.output.bytes_pushed();
        let window_end = window_start + self.output.available_capacity();
        let data_end = first_index + data.len() as u64;

        if data_end <= window_start || first_index >= window_end {
            trace!("reassembler: [{}, {}) outside window, dropped", first_index, data_end);
            return;
        }

        // an incomplete tail can't mark the end of the stream
        if data_end > window_end {
            data.truncate((window_end - first_index) as usize);
            is_last_substring = false;
        }

        if first_index < window_start {
            data.drain(..(window_start - first_index) as usize);
            first_index = window_start;
        }

        if is_last_substring && self.end_index.is_none() {
            self.end_index = Some(first_index + data.len() as u64);
        }

        self.store(first_index, data);
        self.flush();
        self.try_close();
    }

    // buffers [first_index, first_index + len), evicting whatever was pending in that span
    fn store(&mut self, first_index: u64, data: Vec<u8>) {
        let end = first_index + data.len() as u64;

        self.split_at(end);
        self.split_at(first_index);

        let covered: Vec<u64> = self.pending.range(first_index..end).map(|(&k, _)| k).collect();
        for index in covered {
            if let Some(old) = self.pending.remove(&index) {
                self.total_pending_bytes -= old.len() as u64;
            }
        }

        self.total_pending_bytes += data.len() as u64;
        self.pending.insert(first_index, data);
    }

    // makes `pos` a range boundary by cutting the range that straddles it, if any
    fn split_at(&mut self, pos: u64) {
        let Some((&start, bytes)) = self.pending.range_mut(..pos).next_back() else {
            return;
        };

        let end = start + bytes.len() as u64;
        if end > pos {
            let tail = bytes.split_off((pos - start) as usize);
            self.pending.insert(pos, tail);
        }
    }

    // moves every range that starts at the next expected index into the output
    fn flush(&mut self) {
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() != self.output.bytes_pushed() {
                break;
            }

            let data = entry.remove();
            self.total_pending_bytes -= data.len() as u64;
            self.output.push(data);
        }
    }

    fn try_close(&mut self) {
        if self.end_index == Some(self.output.bytes_pushed()) {
            self.output.close();
        }
    }

    pub fn count_bytes_pending(&self) -> u64 {
        self.total_pending_bytes
    }

    pub fn output(&self) -> &ByteStream {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }
}
