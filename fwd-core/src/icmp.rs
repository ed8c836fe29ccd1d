use fwd_packets::icmpv4::*;
use fwd_packets::{Icmpv4Packet, IpProtocol, Ipv4Packet};
use std::net::Ipv4Addr;

/// Builds the ICMP messages the router originates. The result is a complete IPv4 packet with a
/// valid header checksum, ready to be routed back toward the offending packet's source.
pub struct Icmpv4ErrorGenerator {
    ttl: u8,
}

impl Icmpv4ErrorGenerator {
    pub fn new(ttl: u8) -> Icmpv4ErrorGenerator {
        Icmpv4ErrorGenerator { ttl }
    }

    /// Create an ICMPv4 TTL exceeded error message. Return `None` if an ICMP error message should
    /// not be generated, and the packet should be silently discarded instead
    ///
    /// # Arguments
    ///
    /// * `packet` - The offending packet, its header and first payload bytes are copied into the
    /// returned error packet
    /// * `src_ip` - The source address of the error, an address of this router
    pub fn ttl_exceeded_error(&self, packet: &Ipv4Packet, src_ip: Ipv4Addr) -> Option<Ipv4Packet> {
        self.generic_error(packet, src_ip, TIME_EXCEEDED, CODE_TTL_EXPIRED)
    }

    pub fn net_unreachable_error(
        &self,
        packet: &Ipv4Packet,
        src_ip: Ipv4Addr,
    ) -> Option<Ipv4Packet> {
        self.generic_error(packet, src_ip, DEST_UNREACHABLE, CODE_NET_UNREACHABLE)
    }

    pub fn host_unreachable_error(
        &self,
        packet: &Ipv4Packet,
        src_ip: Ipv4Addr,
    ) -> Option<Ipv4Packet> {
        self.generic_error(packet, src_ip, DEST_UNREACHABLE, CODE_HOST_UNREACHABLE)
    }

    /// Answers an echo request addressed to this router. The reply comes from the address that
    /// was pinged and carries the request's identifier, sequence number and data.
    ///
    /// Returns `None` for anything but an echo request with a valid checksum from a unicast
    /// source.
    pub fn echo_reply(&self, request: &Icmpv4Packet) -> Option<Ipv4Packet> {
        if request.msg_type() != ECHO_REQUEST || !request.validate_checksum() {
            return None;
        }
        let request_ip = request.ipv4();
        if !is_valid_source(request_ip.src_addr()) {
            return None;
        }

        let reply = Icmpv4Packet::new(
            ECHO_REPLY,
            0,
            request.rest_of_header(),
            request.data(),
        );
        Some(self.finish(reply, request_ip.dest_addr(), request_ip.src_addr()))
    }

    // Every error carries the offending header untouched, followed by the first 8 bytes of its
    // payload
    fn generic_error(
        &self,
        packet: &Ipv4Packet,
        src_ip: Ipv4Addr,
        msg_type: u8,
        msg_code: u8,
    ) -> Option<Ipv4Packet> {
        if !Icmpv4ErrorGenerator::should_generate_error(packet) {
            return None;
        }

        let error = Icmpv4Packet::new(
            msg_type,
            msg_code,
            [0; 4],
            packet.header_and_leading_payload(ERROR_PAYLOAD_BYTES),
        );
        Some(self.finish(error, src_ip, packet.src_addr()))
    }

    fn finish(&self, message: Icmpv4Packet, src_ip: Ipv4Addr, dest_ip: Ipv4Addr) -> Ipv4Packet {
        let mut packet = message.packet();
        packet.set_src_addr(src_ip);
        packet.set_dest_addr(dest_ip);
        packet.set_ttl(self.ttl);
        packet.set_checksum();
        packet
    }

    // Performs checks based on RFC 1812 4.3.2.7 (When Not to Send ICMP Errors)
    fn should_generate_error(packet: &Ipv4Packet) -> bool {
        // Only the first fragment
        if packet.fragment_offset() != 0 {
            return false;
        }
        // Avoid infinite loops, no errors from errors or from replies
        if packet.protocol() == IpProtocol::ICMP {
            match packet.payload().first() {
                Some(&msg_type) if !is_error_type(msg_type) && msg_type != ECHO_REPLY => {}
                _ => return false,
            }
        }
        // No broadcast, multicast or loopback addresses
        is_valid_source(packet.src_addr())
    }
}

fn is_valid_source(addr: Ipv4Addr) -> bool {
    !(addr.is_unspecified() || addr.is_broadcast() || addr.is_multicast() || addr.is_loopback())
}
