use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::{debug, trace};
use wire::{Ipv4Address, Ipv4Packet};

use crate::iface::NetworkInterface;
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Route {
    prefix_length: u8,
    // None: the destination is on the attached link
    next_hop: Option<Ipv4Address>,
    interface_index: usize,
}

// network mask with the `prefix_length` high bits set
fn mask(prefix_length: u8) -> u32 {
    match prefix_length {
        0 => 0,
        len => u32::MAX << (32 - len as u32),
    }
}

/// Moves datagrams between the interfaces it owns, choosing the outgoing interface by
/// longest prefix match.
pub struct Router {
    interfaces: Vec<NetworkInterface>,
    // masked prefix -> routes with that prefix, one per prefix length
    routes: BTreeMap<u32, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Router {
            interfaces: Vec::new(),
            routes: BTreeMap::new(),
        }
    }

    /// Takes ownership of `interface`; the returned index is what routes refer to.
    pub fn add_interface(&mut self, interface: NetworkInterface) -> usize {
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    pub fn interface(&self, index: usize) -> Option<&NetworkInterface> {
        self.interfaces.get(index)
    }

    pub fn interface_mut(&mut self, index: usize) -> Option<&mut NetworkInterface> {
        self.interfaces.get_mut(index)
    }

    /// Adds a route for `prefix/prefix_length`, replacing the one already there for the same
    /// masked prefix and length.
    pub fn add_route(
        &mut self,
        prefix: Ipv4Address,
        prefix_length: u8,
        next_hop: Option<Ipv4Address>,
        interface_index: usize,
    ) -> Result<()> {
        if prefix_length > 32 {
            return Err(Error::InvalidPrefixLength(prefix_length));
        }
        if interface_index >= self.interfaces.len() {
            return Err(Error::NoSuchInterface(interface_index));
        }

        let masked = prefix.as_u32() & mask(prefix_length);
        debug!(
            "adding route {}/{} => {} on interface {}",
            Ipv4Address::from_u32(masked),
            prefix_length,
            next_hop.map_or("(direct)".into(), |hop| alloc::format!("{}", hop)),
            interface_index
        );

        let route = Route {
            prefix_length,
            next_hop,
            interface_index,
        };

        let routes = self.routes.entry(masked).or_default();
        match routes.iter_mut().find(|r| r.prefix_length == prefix_length) {
            Some(existing) => *existing = route,
            None => routes.push(route),
        }

        Ok(())
    }

    // longest matching prefix; a later route of equal length would need the same masked
    // prefix, and add_route keeps only one of those
    fn lookup(&self, dst: Ipv4Address) -> Option<Route> {
        let dst = dst.as_u32();
        let mut best: Option<Route> = None;

        for (&prefix, routes) in &self.routes {
            for route in routes {
                if dst & mask(route.prefix_length) != prefix {
                    continue;
                }

                if best.map_or(true, |b| route.prefix_length >= b.prefix_length) {
                    best = Some(*route);
                }
            }
        }

        best
    }

    /// Drains every interface's received datagrams, oldest first, and forwards each one.
    pub fn route(&mut self) {
        for index in 0..self.interfaces.len() {
            while let Some(datagram) = self.interfaces[index].datagrams_received().pop_front() {
                self.forward(datagram);
            }
        }
    }

    fn forward(&mut self, mut datagram: Ipv4Packet) {
        if datagram.ttl <= 1 {
            debug!("ttl expired for datagram to {}, dropped", datagram.dst_addr);
            return;
        }

        let Some(route) = self.lookup(datagram.dst_addr) else {
            debug!("no route to {}, dropped", datagram.dst_addr);
            return;
        };

        datagram.ttl -= 1;
        datagram.compute_checksum();

        let next_hop = route.next_hop.unwrap_or(datagram.dst_addr);
        trace!(
            "forwarding datagram to {} via {} on interface {}",
            datagram.dst_addr,
            next_hop,
            route.interface_index
        );

        // add_route only accepts indices of interfaces we own
        if let Some(interface) = self.interfaces.get_mut(route.interface_index) {
            interface.send_datagram(datagram, next_hop);
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::testing::RecordingDevice;
    use crate::iface::ArpConfig;
    use alloc::boxed::Box;
    use alloc::vec;
    use rstest::rstest;
    use wire::{ArpPacket, EtherType, EthernetAddress, EthernetFrame, Ipv4Protocol};

    fn ip(addr: &str) -> Ipv4Address {
        addr.parse().unwrap()
    }

    fn mac(last: u8) -> EthernetAddress {
        EthernetAddress::new([2, 0, 0, 0, 0, last])
    }

    // a router whose interface i has mac 02:..:(i+1) and ip 192.168.i.1
    fn router(interfaces: usize) -> (Router, Vec<RecordingDevice>) {
        let mut router = Router::new();
        let mut devices = Vec::new();

        for i in 0..interfaces {
            let dev = RecordingDevice::default();
            let iface = NetworkInterface::new(
                &alloc::format!("eth{}", i),
                Box::new(dev.clone()),
                mac(i as u8 + 1),
                Ipv4Address::new([192, 168, i as u8, 1]),
                ArpConfig::default(),
            );
            assert_eq!(router.add_interface(iface), i);
            devices.push(dev);
        }

        (router, devices)
    }

    fn deliver(router: &mut Router, index: usize, datagram: &Ipv4Packet) {
        let iface = router.interface_mut(index).unwrap();
        let frame = EthernetFrame::new(mac(100), iface.ethernet_address(), EtherType::IPV4, datagram.serialize());
        iface.recv_frame(frame);
    }

    // tells interface `index` that `addr` lives at `hw`, swallowing its reply
    fn introduce(router: &mut Router, devices: &[RecordingDevice], index: usize, addr: Ipv4Address, hw: EthernetAddress) {
        let iface = router.interface_mut(index).unwrap();
        let request = ArpPacket::request(hw, addr, iface.ip_address());
        iface.recv_frame(EthernetFrame::new(hw, EthernetAddress::BROADCAST, EtherType::ARP, request.serialize()));
        assert!(devices[index].pop().is_some());
    }

    fn datagram(dst: &str, ttl: u8) -> Ipv4Packet {
        let mut datagram = Ipv4Packet::new(ip("172.16.0.9"), ip(dst), Ipv4Protocol::Unknown(144), vec![1, 2, 3]);
        datagram.ttl = ttl;
        datagram.compute_checksum();
        datagram
    }

    fn forwarded(dev: &RecordingDevice, to: EthernetAddress) -> Ipv4Packet {
        let frame = dev.pop().expect("nothing forwarded");
        assert_eq!(frame.ethertype, EtherType::IPV4);
        assert_eq!(frame.dst, to);
        let datagram = Ipv4Packet::deserialize(&frame.payload).unwrap();
        assert!(datagram.is_valid_checksum());
        datagram
    }

    #[test]
    fn direct_route_beats_default() {
        let (mut router, devices) = router(2);
        router.add_route(ip("0.0.0.0"), 0, Some(ip("192.168.0.254")), 0).unwrap();
        router.add_route(ip("10.0.0.0"), 8, None, 1).unwrap();
        introduce(&mut router, &devices, 1, ip("10.0.0.5"), mac(50));

        deliver(&mut router, 0, &datagram("10.0.0.5", 5));
        router.route();

        let out = forwarded(&devices[1], mac(50));
        assert_eq!(out.dst_addr, ip("10.0.0.5"));
        assert_eq!(out.ttl, 4);
        assert!(devices[0].is_empty());
    }

    #[test]
    fn direct_route_resolves_final_destination() {
        let (mut router, devices) = router(2);
        router.add_route(ip("10.0.0.0"), 8, None, 1).unwrap();

        deliver(&mut router, 0, &datagram("10.0.0.5", 5));
        router.route();

        let frame = devices[1].pop().unwrap();
        assert_eq!(frame.ethertype, EtherType::ARP);
        let request = ArpPacket::deserialize(&frame.payload).unwrap();
        assert_eq!(request.target_proto_addr, ip("10.0.0.5"));
    }

    #[test]
    fn default_route_uses_next_hop() {
        let (mut router, devices) = router(2);
        router.add_route(ip("0.0.0.0"), 0, Some(ip("192.168.0.254")), 0).unwrap();
        router.add_route(ip("10.0.0.0"), 8, None, 1).unwrap();
        introduce(&mut router, &devices, 0, ip("192.168.0.254"), mac(60));

        deliver(&mut router, 1, &datagram("8.8.8.8", 64));
        router.route();

        let out = forwarded(&devices[0], mac(60));
        assert_eq!(out.dst_addr, ip("8.8.8.8"));
        assert_eq!(out.ttl, 63);
    }

    #[test]
    fn more_specific_route_added_later_wins() {
        let (mut router, devices) = router(3);
        router.add_route(ip("10.0.0.0"), 8, None, 1).unwrap();
        router.add_route(ip("10.1.0.0"), 16, None, 2).unwrap();
        introduce(&mut router, &devices, 1, ip("10.2.0.1"), mac(51));
        introduce(&mut router, &devices, 2, ip("10.1.0.1"), mac(52));

        deliver(&mut router, 0, &datagram("10.1.0.1", 10));
        deliver(&mut router, 0, &datagram("10.2.0.1", 10));
        router.route();

        assert_eq!(forwarded(&devices[2], mac(52)).dst_addr, ip("10.1.0.1"));
        assert_eq!(forwarded(&devices[1], mac(51)).dst_addr, ip("10.2.0.1"));
    }

    #[test]
    fn route_for_same_prefix_is_replaced() {
        let (mut router, devices) = router(3);
        router.add_route(ip("10.0.0.0"), 8, None, 1).unwrap();
        // host bits are masked away, so this is the same route
        router.add_route(ip("10.9.9.9"), 8, None, 2).unwrap();
        assert_eq!(router.routes.len(), 1);
        introduce(&mut router, &devices, 2, ip("10.0.0.7"), mac(70));

        deliver(&mut router, 0, &datagram("10.0.0.7", 10));
        router.route();

        assert!(devices[1].is_empty());
        forwarded(&devices[2], mac(70));
    }

    #[rstest]
    #[case(1)]
    #[case(0)]
    fn exhausted_ttl_is_dropped(#[case] ttl: u8) {
        let (mut router, devices) = router(2);
        router.add_route(ip("0.0.0.0"), 0, None, 1).unwrap();

        deliver(&mut router, 0, &datagram("10.0.0.5", ttl));
        router.route();

        assert!(devices[0].is_empty());
        assert!(devices[1].is_empty());
    }

    #[test]
    fn no_route_is_dropped() {
        let (mut router, devices) = router(2);
        router.add_route(ip("10.0.0.0"), 8, None, 1).unwrap();

        deliver(&mut router, 0, &datagram("11.0.0.1", 10));
        router.route();

        assert!(devices[1].is_empty());
        assert!(router.interface_mut(0).unwrap().datagrams_received().is_empty());
    }

    #[rstest]
    #[case("10.0.0.5", 32, true)]
    #[case("10.0.0.4", 31, true)]
    #[case("10.0.0.6", 31, false)]
    #[case("10.0.1.5", 24, false)]
    #[case("10.0.1.5", 16, true)]
    #[case("11.0.0.5", 8, false)]
    #[case("11.0.0.5", 7, true)]
    #[case("200.1.2.3", 0, true)]
    fn prefix_matching(#[case] prefix: &str, #[case] prefix_length: u8, #[case] matches: bool) {
        let (mut router, _devices) = router(1);
        router.add_route(ip(prefix), prefix_length, None, 0).unwrap();
        assert_eq!(router.lookup(ip("10.0.0.5")).is_some(), matches);
    }

    #[test]
    fn rejects_bad_routes() {
        let (mut router, _devices) = router(1);
        assert_eq!(
            router.add_route(ip("10.0.0.0"), 33, None, 0),
            Err(Error::InvalidPrefixLength(33))
        );
        assert_eq!(
            router.add_route(ip("10.0.0.0"), 8, None, 1),
            Err(Error::NoSuchInterface(1))
        );
        assert!(router.routes.is_empty());
    }

    #[test]
    fn interfaces_by_index() {
        let (router, _devices) = router(2);
        assert_eq!(router.interface(1).map(|iface| iface.name()), Some("eth1"));
        assert!(router.interface(2).is_none());
    }
}
