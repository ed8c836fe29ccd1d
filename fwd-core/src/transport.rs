use crate::error::TransportError;
use crossbeam::channel::{unbounded, Receiver, Sender};
use fwd_packets::EthernetFrame;
use std::collections::HashMap;

/// Egress side of the router: puts a complete Ethernet frame on the wire of an interface.
pub trait Transport: Send + Sync {
    fn send(&self, interface: &str, frame: EthernetFrame) -> Result<(), TransportError>;
}

/// Transport that hands every outgoing frame to a per-interface channel. Whatever drives the
/// real link (or a test) holds the receiving ends.
#[derive(Clone, Default)]
pub struct ChannelTransport {
    channels: HashMap<String, Sender<EthernetFrame>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        ChannelTransport::default()
    }

    pub fn channel(mut self, interface: &str, sender: Sender<EthernetFrame>) -> Self {
        self.channels.insert(String::from(interface), sender);
        self
    }

    /// Builds a transport with an unbounded channel for each named interface.
    pub fn unbounded(interfaces: &[&str]) -> (Self, HashMap<String, Receiver<EthernetFrame>>) {
        let mut transport = ChannelTransport::new();
        let mut receivers = HashMap::new();
        for interface in interfaces {
            let (sender, receiver) = unbounded();
            transport = transport.channel(interface, sender);
            receivers.insert(String::from(*interface), receiver);
        }
        (transport, receivers)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, interface: &str, frame: EthernetFrame) -> Result<(), TransportError> {
        let sender = self
            .channels
            .get(interface)
            .ok_or_else(|| TransportError::UnknownInterface(String::from(interface)))?;
        sender
            .send(frame)
            .map_err(|_| TransportError::Disconnected(String::from(interface)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwd_packets::MacAddr;

    #[test]
    fn frames_arrive_on_their_interface() {
        let (transport, receivers) = ChannelTransport::unbounded(&["eth0", "eth1"]);
        let mut frame = EthernetFrame::empty();
        frame.set_dest_mac(MacAddr::BROADCAST);

        transport.send("eth1", frame.clone()).unwrap();

        assert!(receivers["eth0"].try_recv().is_err());
        assert_eq!(receivers["eth1"].try_recv().unwrap(), frame);
    }

    #[test]
    fn unknown_interface() {
        let (transport, _receivers) = ChannelTransport::unbounded(&["eth0"]);
        assert_eq!(
            transport.send("eth9", EthernetFrame::empty()),
            Err(TransportError::UnknownInterface(String::from("eth9")))
        );
    }

    #[test]
    fn dropped_receiver() {
        let (sender, receiver) = unbounded();
        let transport = ChannelTransport::new().channel("eth0", sender);
        drop(receiver);
        assert_eq!(
            transport.send("eth0", EthernetFrame::empty()),
            Err(TransportError::Disconnected(String::from("eth0")))
        );
    }
}
