use crate::arp::QueuedPacket;
use crate::error::Error;
use crate::Router;
use fwd_packets::Ipv4Packet;
use futures::future::{self, Future};
use futures::pin_mut;
use log::{debug, info, warn};
use std::convert::TryFrom;
use std::time::Instant;
use tokio::time;

/// Periodic maintenance of a router's ARP cache: expires old entries, retries pending
/// resolutions, and answers the packets of resolutions that ran out of attempts with host
/// unreachable errors.
pub struct Sweeper {
    router: Router,
}

impl Sweeper {
    pub(crate) fn new(router: Router) -> Self {
        Sweeper { router }
    }

    /// One sweep as of `now`. The cache is locked only while it is being swept; requests and
    /// errors are sent afterwards.
    pub fn tick(&self, now: Instant) {
        let config = self.router.config();
        let report = self
            .router
            .cache()
            .sweep(now, config.retry_interval, config.max_attempts);

        if report.expired > 0 {
            debug!("Expired {} ARP cache entries", report.expired);
        }

        for (target, interface) in report.retransmit {
            debug!("Retrying resolution of {} on {}", target, interface);
            if let Err(err) = self.router.send_arp_request(target, &interface) {
                warn!("Cannot retry resolution of {}: {}", target, err);
            }
        }

        for pending in report.exhausted {
            warn!(
                "{}, {} queued packets are unreachable",
                Error::ResolutionExhausted(pending.target),
                pending.packets.len()
            );
            for queued in pending.packets {
                self.report_unreachable(queued);
            }
        }
    }

    fn report_unreachable(&self, queued: QueuedPacket) {
        let src_ip = match self.router.interface(&queued.interface) {
            Ok(outgoing) => outgoing.ip,
            Err(err) => {
                warn!("Dropping queued packet: {}", err);
                return;
            }
        };
        let packet = match Ipv4Packet::try_from(queued.frame) {
            Ok(packet) => packet,
            Err(err) => {
                debug!("Dropping queued packet: {}", err);
                return;
            }
        };
        if let Some(error) = self.router.icmp().host_unreachable_error(&packet, src_ip) {
            self.router.route_and_send(error);
        }
    }

    /// Sweeps every `sweep_period` for as long as the runtime keeps the task alive.
    pub async fn run(self) {
        let period = self.router.config().sweep_period;
        info!("Sweeping the ARP cache every {:?}", period);

        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            self.tick(Instant::now());
        }
    }

    /// Like `run`, but returns once `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let sweeping = self.run();
        pin_mut!(sweeping);
        pin_mut!(shutdown);
        future::select(sweeping, shutdown).await;
        info!("ARP cache sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RouterConfig;
    use crate::interface::{Interface, StaticInterfaces};
    use crate::route::{Route, StaticRoutingTable};
    use crate::transport::ChannelTransport;
    use crate::Router;
    use cidr::{Cidr, Ipv4Cidr};
    use crossbeam::channel::Receiver;
    use fwd_packets::icmpv4::*;
    use fwd_packets::*;
    use std::collections::HashMap;
    use std::convert::TryFrom;
    use std::net::Ipv4Addr;
    use std::time::{Duration, Instant};

    const ETH0_MAC: MacAddr = MacAddr {
        bytes: [2, 0, 0, 0, 0, 1],
    };
    const ETH1_MAC: MacAddr = MacAddr {
        bytes: [2, 0, 0, 0, 0, 2],
    };
    const SENDER_MAC: MacAddr = MacAddr {
        bytes: [2, 0, 0, 0, 0, 0xaa],
    };
    const SENDER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const TARGET_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 2);

    fn router() -> (Router, HashMap<String, Receiver<EthernetFrame>>) {
        let interfaces = StaticInterfaces::default()
            .interface(Interface::new("eth0", ETH0_MAC, Ipv4Addr::new(10, 0, 0, 1)))
            .interface(Interface::new("eth1", ETH1_MAC, Ipv4Addr::new(10, 0, 1, 1)));
        let routes = StaticRoutingTable::new(vec![
            Route::new(
                Ipv4Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 24).unwrap(),
                Ipv4Addr::UNSPECIFIED,
                "eth0",
            ),
            Route::new(
                Ipv4Cidr::new(Ipv4Addr::new(10, 0, 1, 0), 24).unwrap(),
                Ipv4Addr::UNSPECIFIED,
                "eth1",
            ),
        ]);
        let (transport, receivers) = ChannelTransport::unbounded(&["eth0", "eth1"]);
        let config = RouterConfig::default().max_attempts(3);
        (
            Router::new(config, interfaces, routes, transport),
            receivers,
        )
    }

    fn queue_one(router: &Router) -> Instant {
        let mut packet = Ipv4Packet::empty();
        packet.set_src_addr(SENDER_IP);
        packet.set_dest_addr(TARGET_IP);
        packet.set_protocol(IpProtocol::UDP);
        packet.set_ttl(64);
        packet.set_payload(&[0; 8]);
        packet.set_checksum();
        router
            .handle_ipv4(EthernetFrame::encap_ipv4(packet), "eth0")
            .unwrap();
        Instant::now()
    }

    fn drain(receiver: &Receiver<EthernetFrame>) -> Vec<EthernetFrame> {
        receiver.try_iter().collect()
    }

    #[test]
    fn retries_then_reports_unreachable() {
        let (router, receivers) = router();
        router.cache().insert(SENDER_IP, SENDER_MAC, Instant::now());
        let t0 = queue_one(&router);
        let sweeper = router.sweeper();

        assert_eq!(drain(&receivers["eth1"]).len(), 1);

        sweeper.tick(t0 + Duration::from_millis(500));
        assert!(drain(&receivers["eth1"]).is_empty());

        sweeper.tick(t0 + Duration::from_secs(1));
        sweeper.tick(t0 + Duration::from_secs(2));
        let retries = drain(&receivers["eth1"]);
        assert_eq!(retries.len(), 2);
        for frame in retries {
            let request = ArpFrame::try_from(frame).unwrap();
            assert_eq!(request.target_ipv4_addr().unwrap(), TARGET_IP);
        }
        assert_eq!(router.cache().pending_attempts(TARGET_IP), Some(3));
        assert!(drain(&receivers["eth0"]).is_empty());

        sweeper.tick(t0 + Duration::from_secs(3));
        assert!(drain(&receivers["eth1"]).is_empty());
        assert_eq!(router.cache().pending_attempts(TARGET_IP), None);

        let errors = drain(&receivers["eth0"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].dest_mac(), SENDER_MAC);
        let icmp =
            Icmpv4Packet::try_from(Ipv4Packet::try_from(errors[0].clone()).unwrap()).unwrap();
        assert_eq!(icmp.msg_type(), DEST_UNREACHABLE);
        assert_eq!(icmp.code(), CODE_HOST_UNREACHABLE);
        assert_eq!(icmp.ipv4().src_addr(), Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(icmp.ipv4().dest_addr(), SENDER_IP);
    }

    #[test]
    fn expires_entries() {
        let (router, _receivers) = router();
        let t0 = Instant::now();
        router.cache().insert(SENDER_IP, SENDER_MAC, t0);

        router.sweeper().tick(t0 + Duration::from_secs(15));
        assert_eq!(router.cache().entries_len(), 1);

        router.sweeper().tick(t0 + Duration::from_secs(16));
        assert_eq!(router.cache().entries_len(), 0);
    }
}
