use fwd_packets::MacAddr;
use std::net::Ipv4Addr;

/// One of the router's own network interfaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

impl Interface {
    pub fn new(name: &str, mac: MacAddr, ip: Ipv4Addr) -> Self {
        Interface {
            name: String::from(name),
            mac,
            ip,
        }
    }
}

/// Read-only view of the router's interfaces.
pub trait InterfaceRegistry: Send + Sync {
    fn by_name(&self, name: &str) -> Option<&Interface>;

    fn all(&self) -> &[Interface];

    /// The interface that owns `ip`, if the address belongs to this router.
    fn owning(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.all().iter().find(|interface| interface.ip == ip)
    }
}

/// A fixed set of interfaces, in the order they were configured.
#[derive(Clone, Debug, Default)]
pub struct StaticInterfaces {
    interfaces: Vec<Interface>,
}

impl StaticInterfaces {
    pub fn new(interfaces: Vec<Interface>) -> Self {
        StaticInterfaces { interfaces }
    }

    pub fn interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }
}

impl InterfaceRegistry for StaticInterfaces {
    fn by_name(&self, name: &str) -> Option<&Interface> {
        self.interfaces
            .iter()
            .find(|interface| interface.name == name)
    }

    fn all(&self) -> &[Interface] {
        &self.interfaces
    }
}
