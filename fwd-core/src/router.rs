use crate::arp::ArpCache;
use crate::config::RouterConfig;
use crate::error::Error;
use crate::icmp::Icmpv4ErrorGenerator;
use crate::interface::{Interface, InterfaceRegistry};
use crate::route::RoutingTable;
use crate::sweeper::Sweeper;
use crate::transport::Transport;
use fwd_packets::EthernetFrame;
use log::warn;
use std::sync::Arc;

/// The forwarding plane of one router instance.
///
/// Cloning is cheap and every clone shares the same address resolution cache, so the packet path
/// can run on as many threads as there are interfaces while the sweeper runs on its own task.
#[derive(Clone)]
pub struct Router {
    pub(crate) config: RouterConfig,
    pub(crate) interfaces: Arc<dyn InterfaceRegistry>,
    pub(crate) routes: Arc<dyn RoutingTable>,
    transport: Arc<dyn Transport>,
    cache: Arc<ArpCache>,
}

impl Router {
    pub fn new<I, R, T>(config: RouterConfig, interfaces: I, routes: R, transport: T) -> Self
    where
        I: InterfaceRegistry + 'static,
        R: RoutingTable + 'static,
        T: Transport + 'static,
    {
        let cache = Arc::new(ArpCache::new(config.entry_lifetime));
        Router {
            config,
            interfaces: Arc::new(interfaces),
            routes: Arc::new(routes),
            transport: Arc::new(transport),
            cache,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArpCache {
        &self.cache
    }

    /// The background task that ages this router's cache. See `Sweeper::run`.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(self.clone())
    }

    pub(crate) fn interface(&self, name: &str) -> Result<&Interface, Error> {
        self.interfaces
            .by_name(name)
            .ok_or_else(|| Error::UnknownInterface(String::from(name)))
    }

    pub(crate) fn icmp(&self) -> Icmpv4ErrorGenerator {
        Icmpv4ErrorGenerator::new(self.config.icmp_ttl)
    }

    /// Hands a finished frame to the transport. Failures are logged and otherwise ignored.
    pub(crate) fn transmit(&self, interface: &str, frame: EthernetFrame) {
        if let Err(err) = self.transport.send(interface, frame) {
            warn!("Dropping outgoing frame on {}: {}", interface, err);
        }
    }
}
