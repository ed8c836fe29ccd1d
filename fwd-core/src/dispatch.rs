use crate::classifier::{ByEtherType, Classifier, EtherType};
use crate::error::Error;
use crate::Router;
use fwd_packets::{EthernetFrame, PacketData};
use log::{debug, trace};

impl Router {
    /// Entry point for every frame received on `interface`. Returns why the frame was dropped,
    /// if it was; the router keeps running either way.
    pub fn dispatch(&self, data: PacketData, interface: &str) -> Result<(), Error> {
        let result = self.classify_and_handle(data, interface);
        if let Err(err) = &result {
            debug!("Dropped frame received on {}: {}", interface, err);
        }
        result
    }

    fn classify_and_handle(&self, data: PacketData, interface: &str) -> Result<(), Error> {
        let frame = EthernetFrame::from_buffer(data).map_err(Error::MalformedFrame)?;
        let class = ByEtherType::new().classify(&frame);
        trace!("{:?} frame on {} from {}", class, interface, frame.src_mac());

        match class {
            EtherType::Arp => self.handle_arp(frame, interface),
            EtherType::Ipv4 => self.handle_ipv4(frame, interface),
            EtherType::Unsupported(ether_type) => Err(Error::UnsupportedEtherType(ether_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RouterConfig;
    use crate::error::Error;
    use crate::interface::{Interface, StaticInterfaces};
    use crate::route::StaticRoutingTable;
    use crate::transport::ChannelTransport;
    use crate::Router;
    use fwd_packets::MacAddr;
    use std::net::Ipv4Addr;

    fn router() -> Router {
        let interfaces = StaticInterfaces::default().interface(Interface::new(
            "eth0",
            MacAddr::new([2, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(10, 0, 0, 1),
        ));
        let (transport, _receivers) = ChannelTransport::unbounded(&["eth0"]);
        Router::new(
            RouterConfig::default(),
            interfaces,
            StaticRoutingTable::default(),
            transport,
        )
    }

    #[test]
    fn short_frame_is_malformed() {
        assert!(matches!(
            router().dispatch(vec![0; 13], "eth0"),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn unsupported_ether_type() {
        let mut data = vec![0; 60];
        data[12] = 0x86;
        data[13] = 0xdd;
        assert_eq!(
            router().dispatch(data, "eth0"),
            Err(Error::UnsupportedEtherType(0x86dd))
        );
    }

    #[test]
    fn truncated_headers_are_malformed() {
        let mut arp = vec![0; 20];
        arp[12] = 0x08;
        arp[13] = 0x06;
        assert!(matches!(
            router().dispatch(arp, "eth0"),
            Err(Error::MalformedFrame(_))
        ));

        let mut ipv4 = vec![0; 30];
        ipv4[12] = 0x08;
        ipv4[14] = 0x45;
        assert!(matches!(
            router().dispatch(ipv4, "eth0"),
            Err(Error::MalformedFrame(_))
        ));
    }

    #[test]
    fn unknown_receiving_interface() {
        let mut data = vec![0; 42];
        data[12] = 0x08;
        data[13] = 0x06;
        assert_eq!(
            router().dispatch(data, "eth3"),
            Err(Error::UnknownInterface(String::from("eth3")))
        );
    }
}
