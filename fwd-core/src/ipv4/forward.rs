use crate::error::Error;
use crate::processor::{DecIpv4HopLimit, Processor};
use crate::Router;
use fwd_packets::icmpv4::ECHO_REQUEST;
use fwd_packets::{EthernetFrame, Icmpv4Packet, IpProtocol, Ipv4Packet};
use log::{debug, warn};
use std::convert::TryFrom;

impl Router {
    ///
    /// Entry point for frames carrying IPv4. In order:
    /// - packets with a bad header checksum are dropped without a word,
    /// - packets addressed to one of the router's interfaces are handled locally,
    /// - packets that would leave with a TTL of zero get a time exceeded error,
    /// - packets without a route get a net unreachable error,
    /// - everything else has its TTL decremented and goes to its next hop, now or once the next
    ///   hop's address is resolved.
    ///
    /// Errors are reported from the address of the receiving interface and carry the packet's
    /// header as it was received.
    ///
    pub fn handle_ipv4(&self, frame: EthernetFrame, interface: &str) -> Result<(), Error> {
        let receiving_ip = self.interface(interface)?.ip;
        let packet = Ipv4Packet::try_from(frame).map_err(Error::MalformedFrame)?;
        if !packet.validate_checksum() {
            return Err(Error::ChecksumMismatch);
        }

        let dest_addr = packet.dest_addr();
        if self.interfaces.owning(dest_addr).is_some() {
            return self.handle_local(packet);
        }

        if packet.ttl() <= 1 {
            if let Some(error) = self.icmp().ttl_exceeded_error(&packet, receiving_ip) {
                self.route_and_send(error);
            }
            return Err(Error::TtlExpired);
        }

        let route = match self.routes.lookup(dest_addr) {
            Some(route) => route,
            None => {
                if let Some(error) = self.icmp().net_unreachable_error(&packet, receiving_ip) {
                    self.route_and_send(error);
                }
                return Err(Error::NoRoute(dest_addr));
            }
        };
        let outgoing_mac = self.interface(&route.interface)?.mac;

        let packet = DecIpv4HopLimit::new()
            .process(packet)
            .ok_or(Error::TtlExpired)?;
        let mut frame = EthernetFrame::try_from(packet).map_err(Error::MalformedFrame)?;
        frame.set_src_mac(outgoing_mac);

        self.deliver(route.next_hop(dest_addr), frame, &route.interface)
    }

    // Only echo requests are answered, nothing else is consumed by the router itself
    fn handle_local(&self, packet: Ipv4Packet) -> Result<(), Error> {
        let protocol = packet.protocol();
        if protocol != IpProtocol::ICMP {
            return Err(Error::LocalDeliveryUnsupported(protocol.into()));
        }

        let request = Icmpv4Packet::try_from(packet).map_err(Error::MalformedFrame)?;
        if request.msg_type() != ECHO_REQUEST {
            return Err(Error::LocalDeliveryUnsupported(protocol.into()));
        }
        if !request.validate_checksum() {
            return Err(Error::ChecksumMismatch);
        }

        match self.icmp().echo_reply(&request) {
            Some(reply) => self.route_and_send(reply),
            None => debug!(
                "Not answering echo request from {}",
                request.ipv4().src_addr()
            ),
        }
        Ok(())
    }

    /// Sends a packet this router originated, such as an ICMP error, along the route toward its
    /// destination. Packets with no route are dropped.
    pub(crate) fn route_and_send(&self, packet: Ipv4Packet) {
        let dest_addr = packet.dest_addr();
        let route = match self.routes.lookup(dest_addr) {
            Some(route) => route,
            None => {
                warn!("No route back to {}, dropping locally generated packet", dest_addr);
                return;
            }
        };
        let outgoing_mac = match self.interface(&route.interface) {
            Ok(outgoing) => outgoing.mac,
            Err(err) => {
                warn!("Cannot send locally generated packet to {}: {}", dest_addr, err);
                return;
            }
        };

        let mut frame = EthernetFrame::encap_ipv4(packet);
        frame.set_src_mac(outgoing_mac);
        if let Err(err) = self.deliver(route.next_hop(dest_addr), frame, &route.interface) {
            warn!("Cannot send locally generated packet to {}: {}", dest_addr, err);
        }
    }
}
