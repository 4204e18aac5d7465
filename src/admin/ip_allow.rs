//! Admin IP allow-list.
//!
//! Entries are single addresses or CIDR ranges. An empty list allows everyone.

use crate::error::BookingError;
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct IpAllowList {
    networks: Vec<IpNetwork>,
}

impl IpAllowList {
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, BookingError> {
        let networks = entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .map(|e| {
                IpNetwork::from_str(e).map_err(|err| {
                    BookingError::Config(format!("invalid admin allow-list entry `{e}`: {err}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !networks.is_empty() {
            info!(count = networks.len(), "admin IP allow list enabled");
        }
        Ok(Self { networks })
    }

    pub fn is_enabled(&self) -> bool {
        !self.networks.is_empty()
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.networks.is_empty() || self.networks.iter().any(|n| n.contains(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_allows_all() {
        let list = IpAllowList::parse::<&str>(&[]).unwrap();
        assert!(!list.is_enabled());
        assert!(list.is_allowed("192.0.2.55".parse().unwrap()));
    }

    #[test]
    fn matches_exact_addresses_and_ranges() {
        let list = IpAllowList::parse(&["192.168.1.100", "10.0.0.0/8", " "]).unwrap();
        assert!(list.is_allowed("192.168.1.100".parse().unwrap()));
        assert!(list.is_allowed("10.20.30.40".parse().unwrap()));
        assert!(!list.is_allowed("192.168.1.101".parse().unwrap()));
        assert!(!list.is_allowed("203.0.113.0".parse().unwrap()));
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(IpAllowList::parse(&["not-an-ip"]).is_err());
        assert!(IpAllowList::parse(&["10.0.0.0/40"]).is_err());
    }
}
