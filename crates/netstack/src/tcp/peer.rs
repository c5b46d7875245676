use log::{trace, warn};

use super::receiver::TcpReceiver;
use super::segment::TcpSegment;
use super::sender::TcpSender;
use super::TcpConfig;
use crate::reassembler::Reassembler;
use crate::stream::ByteStream;

/// One end of a connection. Every segment it emits carries both the sender's data and the
/// receiver's current ack/window, and anything the peer sent that occupies sequence space
/// gets acknowledged right away.
#[derive(Debug)]
pub struct TcpPeer {
    config: TcpConfig,
    sender: TcpSender,
    receiver: TcpReceiver,
}

impl TcpPeer {
    pub fn new(config: TcpConfig) -> Self {
        TcpPeer {
            config,
            sender: TcpSender::new(ByteStream::new(config.send_capacity), &config),
            receiver: TcpReceiver::new(Reassembler::new(ByteStream::new(config.recv_capacity))),
        }
    }

    /// Sends whatever the outbound stream and the peer's window allow.
    pub fn push<F>(&mut self, mut transmit: F)
    where
        F: FnMut(TcpSegment),
    {
        if self.is_reset() {
            return;
        }

        self.send_data(&mut transmit);
    }

    // returns whether anything was sent
    fn send_data<F>(&mut self, transmit: &mut F) -> bool
    where
        F: FnMut(TcpSegment),
    {
        let receiver = &self.receiver;
        let mut sent = false;

        self.sender.push(|message| {
            sent = true;
            transmit(TcpSegment {
                sender: message.clone(),
                receiver: receiver.send(),
            });
        });

        sent
    }

    pub fn receive<F>(&mut self, segment: TcpSegment, mut transmit: F)
    where
        F: FnMut(TcpSegment),
    {
        if self.is_reset() {
            return;
        }

        if segment.sender.rst || segment.receiver.rst {
            warn!("tcp: connection reset by peer");
            self.reset();
            return;
        }

        let needs_ack = segment.sequence_length() > 0;
        self.receiver.receive(segment.sender);
        self.sender.receive(&segment.receiver);

        if self.send_data(&mut transmit) || !needs_ack {
            return;
        }

        let ack = self.receiver.send();
        if ack.ackno.is_some() {
            trace!("tcp: bare ack {:?}", ack.ackno);
            transmit(TcpSegment {
                sender: self.sender.make_empty_message(),
                receiver: ack,
            });
        }
    }

    /// Drives retransmission. Gives up with a reset once the sender has retried more
    /// than `max_retx_attempts` times in a row.
    pub fn tick<F>(&mut self, ms_since_last_tick: u64, mut transmit: F)
    where
        F: FnMut(TcpSegment),
    {
        if self.is_reset() {
            return;
        }

        let receiver = &self.receiver;
        self.sender.tick(ms_since_last_tick, |message| {
            transmit(TcpSegment {
                sender: message.clone(),
                receiver: receiver.send(),
            });
        });

        if self.sender.consecutive_retransmissions() > self.config.max_retx_attempts {
            warn!(
                "tcp: giving up after {} retransmissions, resetting",
                self.sender.consecutive_retransmissions()
            );
            self.reset();
            transmit(TcpSegment {
                sender: self.sender.make_empty_message(),
                receiver: self.receiver.send(),
            });
        }
    }

    fn reset(&mut self) {
        self.sender.writer_mut().set_error();
        self.receiver.reader_mut().set_error();
    }

    fn is_reset(&self) -> bool {
        self.sender.writer().has_error() || self.receiver.reader().has_error()
    }

    /// False once the connection was reset, or both directions were closed and our FIN
    /// was acknowledged.
    pub fn active(&self) -> bool {
        if self.is_reset() {
            return false;
        }

        !(self.receiver.reader().is_closed() && self.sender.is_fully_acknowledged())
    }

    pub fn outbound(&self) -> &ByteStream {
        self.sender.writer()
    }

    pub fn outbound_mut(&mut self) -> &mut ByteStream {
        self.sender.writer_mut()
    }

    pub fn inbound(&self) -> &ByteStream {
        self.receiver.reader()
    }

    pub fn inbound_mut(&mut self) -> &mut ByteStream {
        self.receiver.reader_mut()
    }

    pub fn sender(&self) -> &TcpSender {
        &self.sender
    }

    pub fn receiver(&self) -> &TcpReceiver {
        &self.receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Wrap32;
    use alloc::vec::Vec;
    use wire::{Ipv4Address, TcpPacket};

    const CLIENT_IP: Ipv4Address = Ipv4Address::new([192, 168, 0, 1]);
    const SERVER_IP: Ipv4Address = Ipv4Address::new([192, 168, 0, 2]);

    fn peer(isn: u32) -> TcpPeer {
        TcpPeer::new(TcpConfig {
            isn: Wrap32::new(isn),
            ..TcpConfig::default()
        })
    }

    // through the real header codec, like it would go over a link
    fn over_the_wire(segment: TcpSegment) -> TcpSegment {
        let bytes = segment.into_packet(5555, 80).serialize(CLIENT_IP, SERVER_IP);
        assert!(TcpPacket::verify_checksum(CLIENT_IP, SERVER_IP, &bytes));
        TcpSegment::from_packet(&TcpPacket::deserialize(&bytes).unwrap())
    }

    // delivers `to_b` and keeps bouncing replies until both sides go quiet
    fn exchange(a: &mut TcpPeer, b: &mut TcpPeer, mut to_b: Vec<TcpSegment>) -> usize {
        let mut delivered = 0;
        while !to_b.is_empty() {
            let mut to_a = Vec::new();
            for segment in to_b.drain(..) {
                delivered += 1;
                b.receive(over_the_wire(segment), |reply| to_a.push(reply));
            }
            for segment in to_a {
                delivered += 1;
                a.receive(over_the_wire(segment), |reply| to_b.push(reply));
            }
        }
        delivered
    }

    fn push(peer: &mut TcpPeer) -> Vec<TcpSegment> {
        let mut out = Vec::new();
        peer.push(|segment| out.push(segment));
        out
    }

    fn read_all(peer: &mut TcpPeer) -> Vec<u8> {
        let len = peer.inbound().bytes_buffered();
        peer.inbound_mut().read(len)
    }

    fn connect() -> (TcpPeer, TcpPeer) {
        let mut client = peer(1000);
        let mut server = peer(u32::MAX - 3);

        let syn = push(&mut client);
        assert_eq!(syn.len(), 1);
        assert!(syn[0].sender.syn);
        assert_eq!(syn[0].receiver.ackno, None);

        // SYN, SYN/ACK, ACK
        assert_eq!(exchange(&mut client, &mut server, syn), 3);
        assert_eq!(client.sender().sequence_numbers_in_flight(), 0);
        assert_eq!(server.sender().sequence_numbers_in_flight(), 0);
        (client, server)
    }

    #[test]
    fn handshake_transfer_and_close() {
        let (mut client, mut server) = connect();

        client.outbound_mut().push(b"GET / HTTP/1.0\r\n".to_vec());
        let request = push(&mut client);
        exchange(&mut client, &mut server, request);
        assert_eq!(read_all(&mut server), b"GET / HTTP/1.0\r\n".to_vec());

        server.outbound_mut().push(b"200 OK".to_vec());
        server.outbound_mut().close();
        let response = push(&mut server);
        assert!(response.last().unwrap().sender.fin);
        exchange(&mut server, &mut client, response);
        assert_eq!(read_all(&mut client), b"200 OK".to_vec());
        assert!(client.inbound().is_finished());

        // server is done sending, but the client half is still open
        assert!(server.active());
        assert!(client.active());

        client.outbound_mut().close();
        let fin = push(&mut client);
        exchange(&mut client, &mut server, fin);

        assert!(!client.active());
        assert!(!server.active());
    }

    #[test]
    fn bulk_data_crosses_in_several_segments() {
        let (mut client, mut server) = connect();

        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        client.outbound_mut().push(data.clone());
        let segments = push(&mut client);
        assert_eq!(segments.len(), 5);

        exchange(&mut client, &mut server, segments);
        assert_eq!(read_all(&mut server), data);
        assert_eq!(client.sender().sequence_numbers_in_flight(), 0);
    }

    #[test]
    fn data_is_acked_with_a_bare_segment() {
        let (mut client, mut server) = connect();

        client.outbound_mut().push(b"x".to_vec());
        let data = push(&mut client);

        let mut replies = Vec::new();
        server.receive(over_the_wire(data[0].clone()), |reply| replies.push(reply));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].sequence_length(), 0);
        assert_eq!(replies[0].receiver.ackno, Some(Wrap32::new(1000) + 2));
    }

    #[test]
    fn pure_acks_are_not_acked() {
        let (mut client, mut server) = connect();

        let mut replies = Vec::new();
        let ack = TcpSegment {
            sender: client.sender().make_empty_message(),
            receiver: client.receiver().send(),
        };
        server.receive(ack, |reply| replies.push(reply));
        assert!(replies.is_empty());
    }

    #[test]
    fn resets_after_too_many_retransmissions() {
        let mut client = peer(0);
        push(&mut client);

        let attempts = TcpConfig::MAX_RETX_ATTEMPTS;
        for _ in 0..attempts {
            let mut out = Vec::new();
            client.tick(1 << 20, |segment| out.push(segment));
            assert_eq!(out.len(), 1);
            assert!(out[0].sender.syn);
            assert!(client.active());
        }

        let mut out = Vec::new();
        client.tick(1 << 20, |segment| out.push(segment));
        assert_eq!(out.len(), 2);
        assert!(out[1].sender.rst);
        assert!(!client.active());
        assert!(client.outbound().has_error());

        out.clear();
        client.tick(1 << 20, |segment| out.push(segment));
        assert!(out.is_empty());
    }

    #[test]
    fn incoming_rst_kills_connection() {
        let (mut client, mut server) = connect();

        let mut reset = TcpSegment {
            sender: client.sender().make_empty_message(),
            receiver: client.receiver().send(),
        };
        reset.sender.rst = true;

        let mut replies = Vec::new();
        server.receive(over_the_wire(reset), |reply| replies.push(reply));
        assert!(replies.is_empty());
        assert!(!server.active());
        assert!(server.inbound().has_error());
        assert!(server.outbound().has_error());

        server.outbound_mut().push(b"late".to_vec());
        assert!(push(&mut server).is_empty());
    }
}
