use std::net::Ipv4Addr;
use thiserror::Error;

/// Reasons a received frame was dropped or not forwarded. None of them is fatal to the router,
/// only to the frame at hand.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),
    #[error("unsupported ether type {0:#06x}")]
    UnsupportedEtherType(u16),
    #[error("IPv4 header checksum mismatch")]
    ChecksumMismatch,
    #[error("TTL expired in transit")]
    TtlExpired,
    #[error("no route to {0}")]
    NoRoute(Ipv4Addr),
    #[error("address resolution for {0} ran out of attempts")]
    ResolutionExhausted(Ipv4Addr),
    #[error("unknown interface {0}")]
    UnknownInterface(String),
    #[error("IP protocol {0} addressed to the router is not handled")]
    LocalDeliveryUnsupported(u8),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("no channel is attached to interface {0}")]
    UnknownInterface(String),
    #[error("interface {0} is disconnected")]
    Disconnected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read routing table: {0}")]
    Io(#[from] std::io::Error),
    #[error("routing table line {line}: {reason}")]
    Parse { line: usize, reason: String },
}
