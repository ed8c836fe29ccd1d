use fwd_packets::{EthernetFrame, MacAddr};
use log::trace;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A resolved IP to MAC mapping and when it was learned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub mac: MacAddr,
    pub inserted: Instant,
}

/// A frame waiting for its next hop's MAC address. The frame is complete except for its
/// destination MAC.
#[derive(Clone, Debug, PartialEq)]
pub struct QueuedPacket {
    pub frame: EthernetFrame,
    pub interface: String,
    pub enqueued: Instant,
}

/// An in-flight resolution and the packets queued behind it, oldest first.
#[derive(Clone, Debug)]
pub struct PendingResolution {
    pub target: Ipv4Addr,
    pub interface: String,
    pub packets: VecDeque<QueuedPacket>,
    pub attempts: u32,
    pub last_sent: Instant,
}

/// Result of `ArpCache::resolve_or_queue`.
#[derive(Debug, PartialEq)]
pub enum CacheOutcome {
    /// The address is resolved; the frame is handed back to be sent right away.
    Hit { mac: MacAddr, frame: EthernetFrame },
    /// A new pending resolution was created for the frame. The caller sends the first request.
    Created,
    /// The frame joined a resolution that is already in flight.
    Appended,
}

/// What a sweep removed or wants retried. All I/O it implies happens after the cache lock is
/// released.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub expired: usize,
    /// Pending targets due for another request, with the interface to send it on.
    pub retransmit: Vec<(Ipv4Addr, String)>,
    /// Pending resolutions that ran out of attempts. They are no longer in the cache.
    pub exhausted: Vec<PendingResolution>,
}

#[derive(Default)]
struct Tables {
    entries: HashMap<Ipv4Addr, CacheEntry>,
    pending: HashMap<Ipv4Addr, PendingResolution>,
}

/// Resolved entries and pending resolutions behind one lock, so that promoting a pending
/// resolution to an entry is a single step for every observer.
///
/// An address is never both resolved and pending.
pub struct ArpCache {
    tables: Mutex<Tables>,
    entry_lifetime: Duration,
}

impl ArpCache {
    pub fn new(entry_lifetime: Duration) -> Self {
        ArpCache {
            tables: Mutex::new(Tables::default()),
            entry_lifetime,
        }
    }

    // A panic elsewhere must not take the packet path down with it; the tables are always left
    // consistent between statements.
    fn tables(&self) -> MutexGuard<Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted) <= self.entry_lifetime
    }

    /// The MAC address for `ip`, unless it is unknown or older than the entry lifetime.
    pub fn lookup(&self, ip: Ipv4Addr, now: Instant) -> Option<MacAddr> {
        self.tables()
            .entries
            .get(&ip)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.mac)
    }

    /// Records `ip -> mac` and takes the pending resolution for `ip` out of the cache, if there
    /// is one, in the same critical section.
    pub fn insert(&self, ip: Ipv4Addr, mac: MacAddr, now: Instant) -> Option<PendingResolution> {
        let mut tables = self.tables();
        tables.entries.insert(ip, CacheEntry { mac, inserted: now });
        tables.pending.remove(&ip)
    }

    /// Returns the MAC for `ip` together with the frame if it is resolved. Otherwise the frame is
    /// queued behind the pending resolution for `ip`, which is created with one attempt
    /// recorded if it does not exist yet.
    pub fn resolve_or_queue(
        &self,
        ip: Ipv4Addr,
        interface: &str,
        frame: EthernetFrame,
        now: Instant,
    ) -> CacheOutcome {
        let mut tables = self.tables();

        if let Some(entry) = tables.entries.get(&ip) {
            if self.is_fresh(entry, now) {
                return CacheOutcome::Hit {
                    mac: entry.mac,
                    frame,
                };
            }
            trace!("Dropping stale cache entry for {}", ip);
            tables.entries.remove(&ip);
        }

        let queued = QueuedPacket {
            frame,
            interface: String::from(interface),
            enqueued: now,
        };
        match tables.pending.get_mut(&ip) {
            Some(pending) => {
                pending.packets.push_back(queued);
                CacheOutcome::Appended
            }
            None => {
                let mut packets = VecDeque::new();
                packets.push_back(queued);
                tables.pending.insert(
                    ip,
                    PendingResolution {
                        target: ip,
                        interface: String::from(interface),
                        packets,
                        attempts: 1,
                        last_sent: now,
                    },
                );
                CacheOutcome::Created
            }
        }
    }

    /// One sweep over both tables:
    /// - entries older than the entry lifetime are removed,
    /// - pending resolutions that used `max_attempts` requests and waited `retry_interval` since
    ///   the last one are removed and reported as exhausted,
    /// - every other pending resolution whose last request is `retry_interval` old is due for a
    ///   retransmission; its attempt count is bumped here.
    pub fn sweep(&self, now: Instant, retry_interval: Duration, max_attempts: u32) -> SweepReport {
        let mut report = SweepReport::default();
        let mut tables = self.tables();

        let lifetime = self.entry_lifetime;
        let before = tables.entries.len();
        tables
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted) <= lifetime);
        report.expired = before - tables.entries.len();

        let mut exhausted = vec![];
        for (ip, pending) in tables.pending.iter_mut() {
            if now.saturating_duration_since(pending.last_sent) < retry_interval {
                continue;
            }
            if pending.attempts >= max_attempts {
                exhausted.push(*ip);
            } else {
                pending.attempts += 1;
                pending.last_sent = now;
                report.retransmit.push((*ip, pending.interface.clone()));
            }
        }
        for ip in exhausted {
            if let Some(pending) = tables.pending.remove(&ip) {
                report.exhausted.push(pending);
            }
        }

        report
    }

    pub fn pending_attempts(&self, ip: Ipv4Addr) -> Option<u32> {
        self.tables().pending.get(&ip).map(|pending| pending.attempts)
    }

    /// Number of packets queued behind `ip`, zero if nothing is pending.
    pub fn pending_len(&self, ip: Ipv4Addr) -> usize {
        self.tables()
            .pending
            .get(&ip)
            .map_or(0, |pending| pending.packets.len())
    }

    pub fn entries_len(&self) -> usize {
        self.tables().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIFETIME: Duration = Duration::from_secs(15);
    const RETRY: Duration = Duration::from_secs(1);

    fn ip() -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, 2)
    }

    fn mac() -> MacAddr {
        MacAddr::new([2, 0, 0, 0, 0, 2])
    }

    fn frame(tag: u8) -> EthernetFrame {
        let mut frame = EthernetFrame::empty();
        frame.set_payload(&[tag]);
        frame
    }

    #[test]
    fn first_packet_creates_then_appends() {
        let cache = ArpCache::new(LIFETIME);
        let now = Instant::now();

        assert_eq!(
            cache.resolve_or_queue(ip(), "eth0", frame(1), now),
            CacheOutcome::Created
        );
        assert_eq!(
            cache.resolve_or_queue(ip(), "eth0", frame(2), now),
            CacheOutcome::Appended
        );
        assert_eq!(cache.pending_attempts(ip()), Some(1));
        assert_eq!(cache.pending_len(ip()), 2);
        assert_eq!(cache.lookup(ip(), now), None);
    }

    #[test]
    fn insert_takes_pending_in_fifo_order() {
        let cache = ArpCache::new(LIFETIME);
        let now = Instant::now();
        for tag in 0..4 {
            cache.resolve_or_queue(ip(), "eth0", frame(tag), now);
        }

        let pending = cache.insert(ip(), mac(), now).unwrap();
        let tags: Vec<u8> = pending
            .packets
            .iter()
            .map(|queued| queued.frame.payload()[0])
            .collect();
        assert_eq!(tags, vec![0, 1, 2, 3]);

        assert_eq!(cache.pending_len(ip()), 0);
        assert_eq!(cache.pending_attempts(ip()), None);
        assert_eq!(cache.lookup(ip(), now), Some(mac()));
        assert!(cache.insert(ip(), mac(), now).is_none());
    }

    #[test]
    fn hit_hands_the_frame_back() {
        let cache = ArpCache::new(LIFETIME);
        let now = Instant::now();
        cache.insert(ip(), mac(), now);

        assert_eq!(
            cache.resolve_or_queue(ip(), "eth0", frame(7), now),
            CacheOutcome::Hit {
                mac: mac(),
                frame: frame(7)
            }
        );
        assert_eq!(cache.pending_len(ip()), 0);
    }

    #[test]
    fn stale_entry_is_replaced_by_pending() {
        let cache = ArpCache::new(LIFETIME);
        let learned = Instant::now();
        cache.insert(ip(), mac(), learned);

        let later = learned + LIFETIME + Duration::from_millis(1);
        assert_eq!(cache.lookup(ip(), later), None);
        assert_eq!(
            cache.resolve_or_queue(ip(), "eth0", frame(1), later),
            CacheOutcome::Created
        );
        assert_eq!(cache.entries_len(), 0);
    }

    #[test]
    fn sweep_expires_old_entries() {
        let cache = ArpCache::new(LIFETIME);
        let t0 = Instant::now();
        cache.insert(ip(), mac(), t0);
        cache.insert(Ipv4Addr::new(10, 0, 0, 3), mac(), t0 + Duration::from_secs(10));

        let report = cache.sweep(t0 + LIFETIME, RETRY, 5);
        assert_eq!(report.expired, 0);
        assert_eq!(cache.entries_len(), 2);

        let report = cache.sweep(t0 + Duration::from_secs(16), RETRY, 5);
        assert_eq!(report.expired, 1);
        assert_eq!(cache.entries_len(), 1);
        assert_eq!(cache.lookup(ip(), t0 + Duration::from_secs(16)), None);
    }

    #[test]
    fn sweep_retransmits_once_per_interval() {
        let cache = ArpCache::new(LIFETIME);
        let t0 = Instant::now();
        cache.resolve_or_queue(ip(), "eth1", frame(1), t0);

        let report = cache.sweep(t0 + Duration::from_millis(500), RETRY, 5);
        assert!(report.retransmit.is_empty());
        assert_eq!(cache.pending_attempts(ip()), Some(1));

        let report = cache.sweep(t0 + RETRY, RETRY, 5);
        assert_eq!(report.retransmit, vec![(ip(), String::from("eth1"))]);
        assert_eq!(cache.pending_attempts(ip()), Some(2));

        let report = cache.sweep(t0 + Duration::from_millis(1500), RETRY, 5);
        assert!(report.retransmit.is_empty());
        assert_eq!(cache.pending_attempts(ip()), Some(2));
    }

    #[test]
    fn sweep_exhausts_after_max_attempts() {
        let cache = ArpCache::new(LIFETIME);
        let t0 = Instant::now();
        cache.resolve_or_queue(ip(), "eth0", frame(1), t0);
        cache.resolve_or_queue(ip(), "eth0", frame(2), t0);

        for tick in 1..3 {
            let report = cache.sweep(t0 + RETRY * tick, RETRY, 3);
            assert_eq!(report.retransmit.len(), 1);
            assert!(report.exhausted.is_empty());
        }
        assert_eq!(cache.pending_attempts(ip()), Some(3));

        let report = cache.sweep(t0 + RETRY * 3, RETRY, 3);
        assert!(report.retransmit.is_empty());
        assert_eq!(report.exhausted.len(), 1);
        assert_eq!(report.exhausted[0].target, ip());
        assert_eq!(report.exhausted[0].packets.len(), 2);
        assert_eq!(cache.pending_attempts(ip()), None);

        assert_eq!(
            cache.resolve_or_queue(ip(), "eth0", frame(3), t0 + RETRY * 4),
            CacheOutcome::Created
        );
        assert_eq!(cache.pending_attempts(ip()), Some(1));
    }
}
