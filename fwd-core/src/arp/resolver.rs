use crate::arp::CacheOutcome;
use crate::error::Error;
use crate::Router;
use fwd_packets::{ArpFrame, ArpOp, EthernetFrame, MacAddr};
use log::{debug, trace};
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use std::time::Instant;

/// Outcome of `Router::resolve_or_queue`.
#[derive(Debug, PartialEq)]
pub enum Resolution {
    /// The next hop is in the cache. The frame comes back to the caller untouched.
    Resolved { mac: MacAddr, frame: EthernetFrame },
    /// The frame now belongs to a pending resolution. It is sent when a reply arrives, or answered
    /// with a host unreachable error once the sweeper gives up.
    Queued,
}

impl Router {
    /// Entry point for frames carrying ARP.
    pub fn handle_arp(&self, frame: EthernetFrame, interface: &str) -> Result<(), Error> {
        self.interface(interface)?;
        let arp_frame = ArpFrame::try_from(frame).map_err(Error::MalformedFrame)?;
        if !arp_frame.is_ipv4_over_ethernet() {
            return Err(Error::MalformedFrame(
                "ARP frame does not map IPv4 to Ethernet addresses",
            ));
        }

        match ArpOp::from_opcode(arp_frame.opcode()) {
            Some(ArpOp::Request) => self.handle_arp_request(arp_frame, interface),
            Some(ArpOp::Reply) => self.handle_arp_reply(arp_frame, interface),
            None => Err(Error::MalformedFrame("ARP frame has an unknown operation")),
        }
    }

    ///
    /// Answers requests for the address of the interface they arrived on. The reply swaps the
    /// sender and target fields, puts the interface's own addresses in the sender fields, and goes
    /// back out the same interface to the requester's hardware address.
    ///
    /// Requests for any other address are ignored, this router does not proxy.
    ///
    pub fn handle_arp_request(&self, request: ArpFrame, interface: &str) -> Result<(), Error> {
        let receiving = self.interface(interface)?;
        let target_ip = request.target_ipv4_addr().map_err(Error::MalformedFrame)?;
        if target_ip != receiving.ip {
            trace!("Ignoring ARP request on {} for {}", interface, target_ip);
            return Ok(());
        }

        let sender_mac = request.sender_mac_addr().map_err(Error::MalformedFrame)?;
        let sender_ip = request.sender_ipv4_addr().map_err(Error::MalformedFrame)?;

        let mut reply = ArpFrame::new_ipv4_ethernet(ArpOp::Reply);
        reply.set_sender_hardware_addr(receiving.mac);
        reply.set_sender_protocol_addr(receiving.ip);
        reply.set_target_hardware_addr(sender_mac);
        reply.set_target_protocol_addr(sender_ip);

        let ethernet = reply.ethernet_mut();
        ethernet.set_dest_mac(sender_mac);
        ethernet.set_src_mac(receiving.mac);

        debug!(
            "Telling {} ({}) that {} is at {}",
            sender_ip, sender_mac, receiving.ip, receiving.mac
        );
        self.transmit(interface, reply.frame());
        Ok(())
    }

    ///
    /// Learns the sender's mapping from a reply and flushes every packet that was waiting for it,
    /// oldest first.
    ///
    /// Only replies addressed to the receiving interface are learned. Overheard replies for other
    /// hosts leave the cache and any pending queue as they are.
    ///
    pub fn handle_arp_reply(&self, reply: ArpFrame, interface: &str) -> Result<(), Error> {
        let receiving = self.interface(interface)?;
        let target_ip = reply.target_ipv4_addr().map_err(Error::MalformedFrame)?;
        if target_ip != receiving.ip {
            trace!("Ignoring ARP reply on {} addressed to {}", interface, target_ip);
            return Ok(());
        }

        let sender_mac = reply.sender_mac_addr().map_err(Error::MalformedFrame)?;
        let sender_ip = reply.sender_ipv4_addr().map_err(Error::MalformedFrame)?;
        if sender_mac.is_broadcast() || sender_mac == MacAddr::ZERO {
            return Err(Error::MalformedFrame(
                "ARP reply has no usable sender hardware address",
            ));
        }

        match self.cache().insert(sender_ip, sender_mac, Instant::now()) {
            None => debug!("Learned {} is at {}", sender_ip, sender_mac),
            Some(pending) => {
                debug!(
                    "Learned {} is at {}, flushing {} queued packets",
                    sender_ip,
                    sender_mac,
                    pending.packets.len()
                );
                for queued in pending.packets {
                    let mut frame = queued.frame;
                    frame.set_dest_mac(sender_mac);
                    self.transmit(&queued.interface, frame);
                }
            }
        }
        Ok(())
    }

    ///
    /// Looks up the hardware address of `next_hop`. On a miss the frame is queued and, if this is
    /// the first packet waiting for `next_hop`, the first ARP request goes out on `interface`.
    ///
    /// `frame` must be complete apart from its destination MAC.
    ///
    pub fn resolve_or_queue(
        &self,
        next_hop: Ipv4Addr,
        frame: EthernetFrame,
        interface: &str,
    ) -> Result<Resolution, Error> {
        self.interface(interface)?;

        match self
            .cache()
            .resolve_or_queue(next_hop, interface, frame, Instant::now())
        {
            CacheOutcome::Hit { mac, frame } => Ok(Resolution::Resolved { mac, frame }),
            CacheOutcome::Created => {
                debug!("Resolving {} on {}", next_hop, interface);
                self.send_arp_request(next_hop, interface)?;
                Ok(Resolution::Queued)
            }
            CacheOutcome::Appended => {
                trace!("Queued another packet behind {}", next_hop);
                Ok(Resolution::Queued)
            }
        }
    }

    /// Sends `frame` to `next_hop` now if its address is known, or once it is resolved.
    pub(crate) fn deliver(
        &self,
        next_hop: Ipv4Addr,
        frame: EthernetFrame,
        interface: &str,
    ) -> Result<(), Error> {
        if let Resolution::Resolved { mac, mut frame } =
            self.resolve_or_queue(next_hop, frame, interface)?
        {
            frame.set_dest_mac(mac);
            self.transmit(interface, frame);
        }
        Ok(())
    }

    /// Broadcasts a request for `target` from `interface`'s own addresses.
    pub fn send_arp_request(&self, target: Ipv4Addr, interface: &str) -> Result<(), Error> {
        let outgoing = self.interface(interface)?;

        let mut request = ArpFrame::new_ipv4_ethernet(ArpOp::Request);
        request.set_sender_hardware_addr(outgoing.mac);
        request.set_sender_protocol_addr(outgoing.ip);
        request.set_target_hardware_addr(MacAddr::ZERO);
        request.set_target_protocol_addr(target);

        let ethernet = request.ethernet_mut();
        ethernet.set_dest_mac(MacAddr::BROADCAST);
        ethernet.set_src_mac(outgoing.mac);

        self.transmit(interface, request.frame());
        Ok(())
    }
}
