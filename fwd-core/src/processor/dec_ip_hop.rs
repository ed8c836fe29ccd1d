use crate::processor::Processor;
use fwd_packets::Ipv4Packet;

/// Decrements the TTL of an IPv4 packet and patches its header checksum for that one change.
/// A packet whose TTL is already zero is dropped.
#[derive(Default)]
pub struct DecIpv4HopLimit {}

impl DecIpv4HopLimit {
    pub fn new() -> DecIpv4HopLimit {
        DecIpv4HopLimit {}
    }
}

impl Processor for DecIpv4HopLimit {
    type Input = Ipv4Packet;
    type Output = Ipv4Packet;

    fn process(&mut self, mut packet: Self::Input) -> Option<Self::Output> {
        packet.decrement_ttl().ok()?;
        Some(packet)
    }
}
