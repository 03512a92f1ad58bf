//! The resource-record cache.
//!
//! A process-local, single-threaded mapping from `(name, type)` to the set
//! of records seen for it.

use std::collections::HashMap;

use crate::codec::types::{DomainName, RecordType, ResourceRecord};

/// `(name, type) -> records` store.
///
/// Lookup is case-insensitive because [`DomainName`] is always constructed
/// already-lowercased; the cache itself does no further normalisation
/// beyond using it as a hash key.
///
/// This resolver is single-threaded and blocking, so there is no
/// `Arc<RwLock<_>>` wrapper here: a `ResolverContext` simply owns a `Cache`
/// directly.
#[derive(Debug, Default)]
pub struct Cache {
    entries: HashMap<(DomainName, RecordType), Vec<ResourceRecord>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any existing entry with the same
    /// `(name, type, rdata)` identity (TTL is not part of identity, so the
    /// newer TTL wins on a repeat insert).
    pub fn insert(&mut self, rr: ResourceRecord) {
        let key = (rr.name.clone(), rr.rtype);
        let bucket = self.entries.entry(key).or_default();
        if let Some(existing) = bucket.iter_mut().find(|existing| **existing == rr) {
            *existing = rr;
        } else {
            bucket.push(rr);
        }
    }

    /// Look up every cached record for `(name, type)`. Empty if there is no
    /// entry.
    pub fn lookup(&self, name: &DomainName, rtype: RecordType) -> Vec<ResourceRecord> {
        self.entries
            .get(&(name.clone(), rtype))
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &DomainName, rtype: RecordType) -> bool {
        self.entries
            .get(&(name.clone(), rtype))
            .is_some_and(|rrs| !rrs.is_empty())
    }

    /// Iterate every `(name, type) -> records` entry, in arbitrary order.
    /// Used by the REPL's `dump` command.
    pub fn for_each(&self, mut f: impl FnMut(&DomainName, RecordType, &[ResourceRecord])) {
        for ((name, rtype), rrs) in &self.entries {
            f(name, *rtype, rrs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::types::RData;
    use std::net::Ipv4Addr;

    fn a_record(name: &str, ip: [u8; 4], ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: DomainName::from_dotted(name),
            rtype: RecordType::A,
            ttl,
            rdata: RData::Ip(Ipv4Addr::from(ip).into()),
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let mut cache = Cache::new();
        cache.insert(a_record("example.com", [1, 2, 3, 4], 300));
        cache.insert(a_record("example.com", [1, 2, 3, 4], 300));

        assert_eq!(cache.lookup(&DomainName::from_dotted("example.com"), RecordType::A).len(), 1);
    }

    #[test]
    fn later_insert_replaces_ttl_of_same_identity() {
        let mut cache = Cache::new();
        cache.insert(a_record("example.com", [1, 2, 3, 4], 300));
        cache.insert(a_record("example.com", [1, 2, 3, 4], 60));

        let rrs = cache.lookup(&DomainName::from_dotted("example.com"), RecordType::A);
        assert_eq!(rrs.len(), 1);
        assert_eq!(rrs[0].ttl, 60);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut cache = Cache::new();
        cache.insert(a_record("Example.COM", [1, 2, 3, 4], 300));

        assert_eq!(cache.lookup(&DomainName::from_dotted("example.com"), RecordType::A).len(), 1);
    }

    #[test]
    fn lookup_miss_is_empty() {
        let cache = Cache::new();
        assert!(cache.lookup(&DomainName::from_dotted("example.com"), RecordType::A).is_empty());
    }
}
