use alloc::collections::VecDeque;

use log::{debug, trace};

use super::message::{TcpReceiverMessage, TcpSenderMessage};
use super::TcpConfig;
use crate::stream::ByteStream;
use crate::utils::Wrap32;

// a segment sent but not yet fully acknowledged
#[derive(Debug)]
struct Outstanding {
    // absolute sequence number of the first thing the segment occupies
    abs_seqno: u64,
    message: TcpSenderMessage,
}

impl Outstanding {
    fn abs_end(&self) -> u64 {
        self.abs_seqno + self.message.sequence_length()
    }
}

/// Sending half of a connection: cuts the outbound stream into segments that fit the
/// peer's advertised window and retransmits the oldest unacknowledged one on timeout,
/// doubling the timeout each time (while the window is open).
///
/// The timer is virtual and only advances through `tick`.
#[derive(Debug)]
pub struct TcpSender {
    input: ByteStream,
    isn: Wrap32,
    initial_rto_ms: u64,
    max_payload_size: usize,

    // absolute seqno of the next new byte (SYN = 0)
    next_abs_seqno: u64,
    bytes_in_flight: u64,
    outstanding: VecDeque<Outstanding>,
    syn_sent: bool,
    fin_sent: bool,

    // last window the peer advertised, 1 until we hear otherwise
    window_size: u16,

    rto_ms: u64,
    timer_ms: u64,
    consecutive_retransmissions: u64,
}

impl TcpSender {
    pub fn new(input: ByteStream, config: &TcpConfig) -> Self {
        TcpSender {
            input,
            isn: config.isn,
            initial_rto_ms: config.rt_timeout_ms,
            max_payload_size: config.max_payload_size,
            next_abs_seqno: 0,
            bytes_in_flight: 0,
            outstanding: VecDeque::new(),
            syn_sent: false,
            fin_sent: false,
            window_size: 1,
            rto_ms: config.rt_timeout_ms,
            timer_ms: 0,
            consecutive_retransmissions: 0,
        }
    }

    /// Sends as many new segments as the window allows, handing each to `transmit`.
    pub fn push<F>(&mut self, mut transmit: F)
    where
        F: FnMut(&TcpSenderMessage),
    {
        loop {
            let Some(message) = self.next_segment() else {
                return;
            };

            trace!(
                "tcp sender: seqno {} len {}{}{}",
                message.seqno,
                message.payload.len(),
                if message.syn { " SYN" } else { "" },
                if message.fin { " FIN" } else { "" },
            );

            let len = message.sequence_length();
            self.bytes_in_flight += len;
            self.outstanding.push_back(Outstanding {
                abs_seqno: self.next_abs_seqno,
                message,
            });
            self.next_abs_seqno += len;

            if let Some(sent) = self.outstanding.back() {
                transmit(&sent.message);
            }

            if self.input.bytes_buffered() == 0 || self.effective_window() <= self.bytes_in_flight {
                return;
            }
        }
    }

    // a zero window is treated as one so a probe keeps the connection alive
    fn effective_window(&self) -> u64 {
        self.window_size.max(1) as u64
    }

    // builds the next segment to send, None if it would carry nothing
    fn next_segment(&mut self) -> Option<TcpSenderMessage> {
        let mut message = self.make_empty_message();

        if !self.syn_sent {
            self.syn_sent = true;
            message.syn = true;
        }

        let window = self.effective_window();
        let available = window
            .saturating_sub(self.bytes_in_flight)
            .saturating_sub(message.sequence_length());

        let read_size = available
            .min(self.input.bytes_buffered())
            .min(self.max_payload_size as u64);
        if read_size > 0 {
            message.payload = self.input.read(read_size);
        }

        // FIN only goes out if it still fits behind the payload
        if !self.fin_sent && self.input.is_finished() && (message.payload.len() as u64) < available {
            self.fin_sent = true;
            message.fin = true;
        }

        if message.sequence_length() == 0 {
            return None;
        }

        Some(message)
    }

    /// A segment that occupies no sequence space, e.g. to carry a bare ack or a reset.
    pub fn make_empty_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::wrap(self.next_abs_seqno, self.isn),
            rst: self.input.has_error(),
            ..TcpSenderMessage::default()
        }
    }

    pub fn receive(&mut self, message: &TcpReceiverMessage) {
        if message.rst {
            debug!("tcp sender: peer reset the connection");
            self.input.set_error();
            return;
        }

        self.window_size = message.window_size;

        let Some(ackno) = message.ackno else {
            return;
        };

        let abs_ackno = ackno.unwrap(self.isn, self.next_abs_seqno);
        if abs_ackno > self.next_abs_seqno {
            debug!(
                "tcp sender: ackno {} is beyond anything sent, ignored",
                ackno
            );
            return;
        }

        let mut acked_any = false;
        while let Some(front) = self.outstanding.front() {
            if front.abs_end() > abs_ackno {
                break;
            }

            self.bytes_in_flight -= front.message.sequence_length();
            self.outstanding.pop_front();
            acked_any = true;
        }

        // duplicate or stale acks leave the timer alone
        if acked_any {
            self.rto_ms = self.initial_rto_ms;
            self.consecutive_retransmissions = 0;
            self.timer_ms = 0;
        }
    }

    /// Advances the retransmission timer by `ms_since_last_tick`.
    pub fn tick<F>(&mut self, ms_since_last_tick: u64, mut transmit: F)
    where
        F: FnMut(&TcpSenderMessage),
    {
        let Some(oldest) = self.outstanding.front() else {
            return;
        };

        self.timer_ms = self.timer_ms.saturating_add(ms_since_last_tick);
        if self.timer_ms < self.rto_ms {
            return;
        }

        trace!(
            "tcp sender: retransmitting seqno {} after {}ms",
            oldest.message.seqno,
            self.timer_ms
        );
        transmit(&oldest.message);

        // zero window probes are expected to go unanswered, don't back off for them
        if self.window_size > 0 {
            self.consecutive_retransmissions += 1;
            self.rto_ms = self.rto_ms.saturating_mul(2);
        }
        self.timer_ms = 0;
    }

    /// FIN went out and everything up to and including it was acknowledged.
    pub fn is_fully_acknowledged(&self) -> bool {
        self.fin_sent && self.outstanding.is_empty()
    }

    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.bytes_in_flight
    }

    pub fn consecutive_retransmissions(&self) -> u64 {
        self.consecutive_retransmissions
    }

    pub fn current_rto_ms(&self) -> u64 {
        self.rto_ms
    }

    pub fn writer(&self) -> &ByteStream {
        &self.input
    }

    /// The outbound stream, for the application to write into.
    pub fn writer_mut(&mut self) -> &mut ByteStream {
        &mut self.input
    }
}
