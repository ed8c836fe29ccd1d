use crate::error::ConfigError;
use cidr::{Cidr, Ipv4Cidr};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

/// A routing table entry. A gateway of `0.0.0.0` means the destination network is directly
/// connected to `interface`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub destination: Ipv4Cidr,
    pub gateway: Ipv4Addr,
    pub interface: String,
}

impl Route {
    pub fn new(destination: Ipv4Cidr, gateway: Ipv4Addr, interface: &str) -> Self {
        Route {
            destination,
            gateway,
            interface: String::from(interface),
        }
    }

    /// Address whose link address the packet must be sent to.
    pub fn next_hop(&self, dest_addr: Ipv4Addr) -> Ipv4Addr {
        if self.gateway.is_unspecified() {
            dest_addr
        } else {
            self.gateway
        }
    }
}

/// Longest prefix match lookup from destination address to route.
pub trait RoutingTable: Send + Sync {
    fn lookup(&self, dest_addr: Ipv4Addr) -> Option<Route>;
}

/// Routing table loaded once at startup.
///
/// Routes are kept sorted by descending prefix length, so the first route that contains an
/// address is its longest match. The sort is stable: if the same prefix is configured twice,
/// the route that came first wins.
#[derive(Clone, Debug, Default)]
pub struct StaticRoutingTable {
    routes_by_len_desc: Vec<Route>,
}

impl StaticRoutingTable {
    pub fn new(mut routes: Vec<Route>) -> Self {
        // Note that left and right are switched here because we are sorting in descending order
        routes.sort_by(|left, right| {
            right
                .destination
                .network_length()
                .cmp(&left.destination.network_length())
        });
        StaticRoutingTable {
            routes_by_len_desc: routes,
        }
    }

    /// Parses one route per line: `destination gateway mask interface`, e.g.
    ///
    /// ```text
    /// # default route through the upstream gateway
    /// 0.0.0.0      172.16.0.1  0.0.0.0          eth0
    /// 10.0.1.0     0.0.0.0     255.255.255.0    eth1
    /// ```
    ///
    /// Blank lines and `#` comments are skipped.
    pub fn from_rtable_str(rtable: &str) -> Result<Self, ConfigError> {
        let mut routes = vec![];
        for (index, line) in rtable.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            routes.push(parse_route(line).map_err(|reason| ConfigError::Parse {
                line: index + 1,
                reason,
            })?);
        }
        Ok(StaticRoutingTable::new(routes))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let rtable = fs::read_to_string(path)?;
        StaticRoutingTable::from_rtable_str(&rtable)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes_by_len_desc
    }
}

impl RoutingTable for StaticRoutingTable {
    fn lookup(&self, dest_addr: Ipv4Addr) -> Option<Route> {
        self.routes_by_len_desc
            .iter()
            .find(|route| route.destination.contains(&dest_addr))
            .cloned()
    }
}

fn parse_route(line: &str) -> Result<Route, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(format!(
            "expected `destination gateway mask interface`, found {} fields",
            fields.len()
        ));
    }

    let destination = parse_addr(fields[0])?;
    let gateway = parse_addr(fields[1])?;
    let mask = u32::from(parse_addr(fields[2])?);

    let prefix_len = mask.leading_ones();
    if prefix_len < 32 && mask << prefix_len != 0 {
        return Err(format!("mask {} is not contiguous", fields[2]));
    }
    let network = Ipv4Addr::from(u32::from(destination) & mask);
    let destination = Ipv4Cidr::new(network, prefix_len as u8)
        .map_err(|_| format!("{}/{} is not a valid network", network, prefix_len))?;

    Ok(Route::new(destination, gateway, fields[3]))
}

fn parse_addr(field: &str) -> Result<Ipv4Addr, String> {
    field
        .parse()
        .map_err(|_| format!("{} is not an IPv4 address", field))
}
