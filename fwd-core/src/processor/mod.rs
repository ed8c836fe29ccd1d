mod dec_ip_hop;
pub use self::dec_ip_hop::*;

/// Takes ownership of a packet and hands back the transformed packet, or `None` to drop it.
pub trait Processor {
    type Input: Send + Clone;
    type Output: Send + Clone;

    fn process(&mut self, packet: Self::Input) -> Option<Self::Output>;
}
