use log::{debug, trace};

use super::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::reassembler::Reassembler;
use crate::stream::ByteStream;
use crate::utils::Wrap32;

/// Receiving half of a connection: maps sequence numbers onto stream indices, feeds the
/// reassembler, and reports acknowledgment + window back to the peer.
#[derive(Debug)]
pub struct TcpReceiver {
    reassembler: Reassembler,
    // peer's ISN, known once a SYN arrived
    zero_point: Option<Wrap32>,
}

impl TcpReceiver {
    pub fn new(reassembler: Reassembler) -> Self {
        TcpReceiver {
            reassembler,
            zero_point: None,
        }
    }

    pub fn receive(&mut self, message: TcpSenderMessage) {
        if self.writer().has_error() {
            return;
        }

        if message.rst {
            debug!("tcp receiver: peer reset the connection");
            self.reassembler.output_mut().set_error();
            return;
        }

        let zero_point = match self.zero_point {
            Some(zero_point) => zero_point,
            None if message.syn => {
                trace!("tcp receiver: SYN, isn {}", message.seqno);
                self.zero_point = Some(message.seqno);
                message.seqno
            }
            None => {
                trace!("tcp receiver: segment before SYN, dropped");
                return;
            }
        };

        // absolute seqno 0 is the SYN itself, stream index = seqno - 1 for everything after
        let checkpoint = self.writer().bytes_pushed();
        let abs_seqno = message.seqno.unwrap(zero_point, checkpoint);
        let stream_index = if message.syn {
            abs_seqno
        } else {
            match abs_seqno.checked_sub(1) {
                Some(index) => index,
                None => {
                    trace!("tcp receiver: data at the SYN's seqno, dropped");
                    return;
                }
            }
        };

        self.reassembler
            .insert(stream_index, message.payload, message.fin);
    }

    pub fn send(&self) -> TcpReceiverMessage {
        let writer = self.writer();
        let window_size = writer.available_capacity().min(u16::MAX as u64) as u16;

        // SYN and FIN both take one sequence number
        let ackno = self.zero_point.map(|zero_point| {
            Wrap32::wrap(
                writer.bytes_pushed() + 1 + writer.is_closed() as u64,
                zero_point,
            )
        });

        TcpReceiverMessage {
            ackno,
            window_size,
            rst: writer.has_error(),
        }
    }

    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    fn writer(&self) -> &ByteStream {
        self.reassembler.output()
    }

    /// The reassembled inbound stream, for the application to read from.
    pub fn reader(&self) -> &ByteStream {
        self.reassembler.output()
    }

    pub fn reader_mut(&mut self) -> &mut ByteStream {
        self.reassembler.output_mut()
    }
}
