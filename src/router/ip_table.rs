//! Host → candidate IP table.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::star::IpHints;

// ============================================================================
// IpTable
// ============================================================================

/// Ordered candidate IPs per host.
///
/// Order is fallback priority. Reads never create entries, and clearing a
/// host's list removes the host.
#[derive(Debug, Default)]
pub struct IpTable {
    entries: RwLock<FxHashMap<String, Vec<String>>>,
}

impl IpTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole list for `host`.
    ///
    /// An empty `ips` removes the host.
    pub fn set_ip_list<I, S>(&self, ips: I, host: &str)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ips: Vec<String> = ips.into_iter().map(Into::into).collect();
        let count = ips.len();

        let mut entries = self.entries.write();
        if ips.is_empty() {
            entries.remove(host);
        } else {
            entries.insert(host.to_string(), ips);
        }
        drop(entries);

        debug!(host, count, "IP list replaced");
    }

    /// Appends `ip` to `host`'s list, creating it if needed.
    pub fn add_ip_address(&self, ip: impl Into<String>, host: &str) {
        let ip = ip.into();
        debug!(host, ip = %ip, "IP address added");
        self.entries
            .write()
            .entry(host.to_string())
            .or_default()
            .push(ip);
    }

    /// Returns a copy of `host`'s list.
    #[must_use]
    pub fn ip_list(&self, host: &str) -> Option<Vec<String>> {
        self.entries.read().get(host).cloned()
    }

    /// Removes `host`, returning its list.
    pub fn remove_host(&self, host: &str) -> Option<Vec<String>> {
        self.entries.write().remove(host)
    }

    /// Returns the number of known hosts.
    #[inline]
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.entries.read().len()
    }
}

impl IpHints for IpTable {
    fn ip_list(&self, host: &str) -> Option<Vec<String>> {
        IpTable::ip_list(self, host)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_appends_in_order() {
        let table = IpTable::new();
        table.add_ip_address("1.2.3.4", "example.com");
        table.add_ip_address("5.6.7.8", "example.com");
        assert_eq!(
            table.ip_list("example.com"),
            Some(vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()])
        );
    }

    #[test]
    fn test_add_keeps_duplicates() {
        let table = IpTable::new();
        table.add_ip_address("1.2.3.4", "example.com");
        table.add_ip_address("1.2.3.4", "example.com");
        assert_eq!(table.ip_list("example.com").map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_set_replaces() {
        let table = IpTable::new();
        table.add_ip_address("1.2.3.4", "example.com");
        table.set_ip_list(["9.9.9.9"], "example.com");
        assert_eq!(
            table.ip_list("example.com"),
            Some(vec!["9.9.9.9".to_string()])
        );
    }

    #[test]
    fn test_set_empty_removes_host() {
        let table = IpTable::new();
        table.add_ip_address("1.2.3.4", "example.com");
        table.set_ip_list(Vec::<String>::new(), "example.com");
        assert_eq!(table.ip_list("example.com"), None);
        assert_eq!(table.host_count(), 0);
    }

    #[test]
    fn test_read_does_not_create() {
        let table = IpTable::new();
        assert_eq!(table.ip_list("unknown.example"), None);
        assert_eq!(table.host_count(), 0);
    }

    #[test]
    fn test_hosts_are_independent() {
        let table = IpTable::new();
        table.add_ip_address("1.1.1.1", "a.example");
        table.add_ip_address("2.2.2.2", "b.example");
        assert_eq!(table.remove_host("a.example"), Some(vec!["1.1.1.1".into()]));
        assert_eq!(table.ip_list("b.example"), Some(vec!["2.2.2.2".into()]));
    }
}
