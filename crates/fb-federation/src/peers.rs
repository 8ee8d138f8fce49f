//! The peer registry.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// A known remote server.
#[derive(Debug, Clone, Serialize)]
pub struct Peer {
    pub url: String,
    pub name: Option<String>,
    pub public_key: Option<String>,
    /// Last successful contact, unix millis.
    pub last_seen: i64,
    /// Cursor of the last completed sync, unix millis.
    pub last_sync: Option<i64>,
    /// Local sequence already pushed to this peer.
    pub pushed_sequence: u64,
}

/// Per-process peer table, rebuilt from handshakes and configuration.
#[derive(Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, Peer>>,
}

impl PeerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a peer record.
    pub fn upsert(&self, url: &str, name: Option<String>, public_key: Option<String>, now: i64) {
        let mut peers = self.peers.write();
        peers
            .entry(url.to_string())
            .and_modify(|peer| {
                if name.is_some() {
                    peer.name = name.clone();
                }
                if public_key.is_some() {
                    peer.public_key = public_key.clone();
                }
                peer.last_seen = now;
            })
            .or_insert_with(|| Peer {
                url: url.to_string(),
                name,
                public_key,
                last_seen: now,
                last_sync: None,
                pushed_sequence: 0,
            });
    }

    pub fn get(&self, url: &str) -> Option<Peer> {
        self.peers.read().get(url).cloned()
    }

    pub fn all(&self) -> Vec<Peer> {
        let mut peers: Vec<Peer> = self.peers.read().values().cloned().collect();
        peers.sort_by(|a, b| a.url.cmp(&b.url));
        peers
    }

    pub fn urls(&self) -> Vec<String> {
        self.all().into_iter().map(|p| p.url).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Record a completed sync cursor for a peer.
    pub fn record_sync(&self, url: &str, at: i64, pushed_sequence: u64) {
        if let Some(peer) = self.peers.write().get_mut(url) {
            peer.last_sync = Some(at);
            peer.last_seen = at;
            peer.pushed_sequence = pushed_sequence;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_refresh() {
        let registry = PeerRegistry::new();
        registry.upsert("https://b.example", None, None, 100);
        registry.upsert(
            "https://b.example",
            Some("node-b".to_string()),
            Some("aa".to_string()),
            200,
        );

        assert_eq!(registry.len(), 1);
        let peer = registry.get("https://b.example").unwrap();
        assert_eq!(peer.name.as_deref(), Some("node-b"));
        assert_eq!(peer.last_seen, 200);
    }

    #[test]
    fn test_refresh_keeps_known_fields() {
        let registry = PeerRegistry::new();
        registry.upsert(
            "https://b.example",
            Some("node-b".to_string()),
            Some("aa".to_string()),
            100,
        );
        registry.upsert("https://b.example", None, None, 200);

        let peer = registry.get("https://b.example").unwrap();
        assert_eq!(peer.name.as_deref(), Some("node-b"));
        assert_eq!(peer.public_key.as_deref(), Some("aa"));
    }

    #[test]
    fn test_sync_cursor() {
        let registry = PeerRegistry::new();
        registry.upsert("https://b.example", None, None, 100);
        registry.record_sync("https://b.example", 500, 42);

        let peer = registry.get("https://b.example").unwrap();
        assert_eq!(peer.last_sync, Some(500));
        assert_eq!(peer.pushed_sequence, 42);
    }
}
