//! What we know about the other devices on the bus.

use crate::types::CecLogicalAddress;
use std::time::{Duration, SystemTime};

/// feature aborts sent for one opcode to one peer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AbortRecord {
    pub count: u32,
    /// first abort of the current window
    pub since: Option<SystemTime>,
}

/// A remote logical address that talked to us.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub last_seen: SystemTime,
    /// as announced with Report Physical Address
    pub phys_addr: Option<u16>,
    aborts: Box<[AbortRecord; 256]>,
}

impl PeerInfo {
    fn new(now: SystemTime) -> Self {
        Self {
            last_seen: now,
            phys_addr: None,
            aborts: Box::new([AbortRecord::default(); 256]),
        }
    }
    pub fn aborts(&self, opcode: u8) -> AbortRecord {
        self.aborts[opcode as usize]
    }
}

/**
 * Peers by logical address 0 to 14.
 *
 * Entries are created on first contact and never dropped.
 * The unregistered address 15 is not tracked.
 */
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    peers: [Option<PeerInfo>; 15],
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }
    /// Note a message from `la`.
    pub fn touch(&mut self, la: CecLogicalAddress, now: SystemTime, phys: Option<u16>) {
        let Some(slot) = self.peers.get_mut(la.index()) else {
            return;
        };
        let peer = slot.get_or_insert_with(|| PeerInfo::new(now));
        peer.last_seen = now;
        if phys.is_some() {
            peer.phys_addr = phys;
        }
    }
    /**
     * Rate limit feature aborts to `la` for `opcode`.
     *
     * Returns true if `max_count` aborts were already sent within `window`.
     * Otherwise the abort is counted and may be sent.
     */
    pub fn should_suppress_abort(
        &mut self,
        la: CecLogicalAddress,
        opcode: u8,
        now: SystemTime,
        window: Duration,
        max_count: u32,
    ) -> bool {
        let Some(slot) = self.peers.get_mut(la.index()) else {
            return false;
        };
        let peer = slot.get_or_insert_with(|| PeerInfo::new(now));
        let rec = &mut peer.aborts[opcode as usize];
        let in_window = match rec.since {
            Some(since) => now.duration_since(since).unwrap_or_default() < window,
            None => false,
        };
        if rec.count > 0 && in_window {
            if rec.count >= max_count {
                return true;
            }
            rec.count += 1;
            return false;
        }
        rec.count = 1;
        rec.since = Some(now);
        false
    }
    pub fn get(&self, la: CecLogicalAddress) -> Option<&PeerInfo> {
        self.peers.get(la.index())?.as_ref()
    }
    pub fn phys_addr(&self, la: CecLogicalAddress) -> Option<u16> {
        self.get(la)?.phys_addr
    }
    /// known peers in address order
    pub fn iter(&self) -> impl Iterator<Item = (CecLogicalAddress, &PeerInfo)> {
        self.peers.iter().enumerate().filter_map(|(i, p)| {
            p.as_ref()
                .map(|p| (CecLogicalAddress::from_nibble(i as u8), p))
        })
    }
}
