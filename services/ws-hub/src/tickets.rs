//! Short-lived bearer tickets for WS admission (§6). Minted by the HTTP
//! façade (out of scope here); this hub only validates them. A ticket is
//! single-use — it's consumed on the first successful upgrade.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub struct TicketStore {
    tickets: DashMap<String, Instant>,
    ttl: Duration,
}

impl TicketStore {
    pub fn new(ttl_sec: u64) -> Self {
        Self {
            tickets: DashMap::new(),
            ttl: Duration::from_secs(ttl_sec),
        }
    }

    /// Mints a ticket the façade would hand back to a client out-of-band.
    /// Exposed here mainly for tests; the real façade lives outside this
    /// crate's process boundary.
    pub fn mint(&self) -> String {
        let ticket = Uuid::new_v4().to_string();
        self.tickets.insert(ticket.clone(), Instant::now() + self.ttl);
        ticket
    }

    /// Validates and consumes a ticket. Returns `false` on expiry, reuse,
    /// or a ticket that was never minted.
    pub fn redeem(&self, ticket: &str) -> bool {
        match self.tickets.remove(ticket) {
            Some((_, expires_at)) => Instant::now() < expires_at,
            None => false,
        }
    }

    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.tickets.retain(|_, expires_at| *expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ticket_redeems_once() {
        let store = TicketStore::new(60);
        let ticket = store.mint();
        assert!(store.redeem(&ticket));
        assert!(!store.redeem(&ticket));
    }

    #[test]
    fn unknown_ticket_is_rejected() {
        let store = TicketStore::new(60);
        assert!(!store.redeem("not-a-real-ticket"));
    }

    #[test]
    fn expired_ticket_is_rejected() {
        let store = TicketStore::new(0);
        let ticket = store.mint();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.redeem(&ticket));
    }
}
