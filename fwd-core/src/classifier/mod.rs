//! # What are they for?
//!
//! Classifiers differentiate a stream of packets. They take each packet by reference and are
//! not able to modify it. A classifier can return any type, but generally returns an enum that
//! tells the caller which path the packet takes next.
mod ether_type;
pub use self::ether_type::*;

/// Determines the kind of packet we have. `Classifier::Class` is then matched on by the caller
/// to send the packet down the appropriate path.
pub trait Classifier {
    type Packet: Send + Clone;
    type Class: Sized;

    fn classify(&self, packet: &Self::Packet) -> Self::Class;
}
