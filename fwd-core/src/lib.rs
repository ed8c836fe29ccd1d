/// Tunable policy values of the forwarding plane: cache entry lifetime, ARP retry interval and
/// attempt budget, sweep period and the TTL of packets the router originates.
pub mod config;

/// Why a frame was dropped or not forwarded, plus the errors of the transport and static
/// configuration boundaries.
pub mod error;

/// The router's own interfaces. The forwarding plane only reads them; `StaticInterfaces` is a
/// fixed list for applications that know their interfaces up front.
pub mod interface;

/// Longest prefix match routing. `StaticRoutingTable` can be loaded from the classic
/// `destination gateway mask interface` text format.
pub mod route;

/// The boundary where finished frames leave the router. Sending is fire and forget; failures are
/// only logged.
pub mod transport;

/// Classifiers look at a packet by reference and decide which path it takes, without changing it.
pub mod classifier;

/// Processors take ownership of a packet, transform it, and hand it back (or drop it by returning
/// `None`).
pub mod processor;

/// Address resolution: the shared cache of resolved and in-flight lookups, and the request/reply
/// handling that drives it.
pub mod arp;

// IPv4 validation and the forward / deliver-to-self / report-error decision, as `Router` methods.
mod ipv4;

/// ICMP error and echo reply construction.
pub mod icmp;

/// Background task that ages out cache entries and retries or abandons pending resolutions.
pub mod sweeper;

mod router;
pub use self::router::Router;

mod dispatch;
