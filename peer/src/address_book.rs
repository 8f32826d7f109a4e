//! Static list of member endpoints known to the initial leader.

use crate::error::{Error, Result};
use shared::RosterEntry;
use std::path::Path;

/// Member endpoints in file order. Ids start at 1; the leader holds id 0.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    endpoints: Vec<(u32, String)>,
}

impl AddressBook {
    /// Reads one `host:port` per line. Blank lines and `#` comments are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfiguration(format!(
                "cannot read address book {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let addresses = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string);
        Self::from_addresses(addresses)
    }

    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints = addresses
            .into_iter()
            .zip(1u32..)
            .map(|(addr, id)| (id, addr.into()))
            .collect();
        Self { endpoints }
    }

    pub fn list_member_endpoints(&self) -> &[(u32, String)] {
        &self.endpoints
    }

    /// Roster entries for a simulation of `total_units` units, leader included.
    pub fn roster_for(&self, total_units: usize) -> Result<Vec<RosterEntry>> {
        let members = total_units.saturating_sub(1);
        if self.endpoints.len() < members {
            return Err(Error::InvalidConfiguration(format!(
                "{} units need {} member addresses, address book has {}",
                total_units,
                members,
                self.endpoints.len()
            )));
        }

        Ok(self.endpoints[..members]
            .iter()
            .map(|(id, addr)| RosterEntry::new(*id, addr.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let book = AddressBook::parse(
            "127.0.0.1:7001\n\n# spare\n  127.0.0.1:7002  \n127.0.0.1:7003\n",
        );
        assert_eq!(
            book.list_member_endpoints(),
            &[
                (1, "127.0.0.1:7001".to_string()),
                (2, "127.0.0.1:7002".to_string()),
                (3, "127.0.0.1:7003".to_string()),
            ]
        );
    }

    #[test]
    fn test_roster_for_takes_prefix() {
        let book = AddressBook::from_addresses(["a:1", "b:2", "c:3"]);
        let roster = book.roster_for(3).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].id, 1);
        assert_eq!(roster[1].address, "b:2");
        assert!(roster.iter().all(|e| e.last_known_position.is_none()));
    }

    #[test]
    fn test_roster_for_too_short() {
        let book = AddressBook::from_addresses(["a:1"]);
        assert!(matches!(
            book.roster_for(3),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AddressBook::load("/nonexistent/peers.txt");
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}
