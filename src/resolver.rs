//! The iterative resolution state machine: delegation following, glue
//! usage, CNAME chasing, and the single well-defined seam that turns
//! transport/parse failures into empty results.

use std::net::{IpAddr, Ipv4Addr};

use rand::Rng;

use crate::cache::Cache;
use crate::codec::{encode_query, ingest_response, DomainName, RData, RecordType, ResourceRecord};
use crate::transport::Transport;

/// The maximum number of CNAME hops a single `resolve` call will follow
/// before giving up. Indirection level 0 is the initial call; exceeding 10
/// (i.e. reaching level 11) trips the limit.
const MAX_INDIRECTION: u32 = 10;

/// Everything the resolver needs that would otherwise be global mutable
/// state: the transport, the cache, the current root server, and the trace
/// flag. Only the REPL's `server` command mutates `root_server`, and only
/// between lookups - never during one.
pub struct ResolverContext<T: Transport> {
    pub transport: T,
    pub cache: Cache,
    pub root_server: Ipv4Addr,
    pub trace: bool,
    /// `-p1`: one non-iterative query per lookup, no delegation walk, no
    /// CNAME chasing.
    pub single_query_mode: bool,
}

impl<T: Transport> ResolverContext<T> {
    pub fn new(transport: T, root_server: Ipv4Addr) -> Self {
        Self {
            transport,
            cache: Cache::new(),
            root_server,
            trace: false,
            single_query_mode: false,
        }
    }

    /// Resolve `(name, type)`, following delegations and CNAME chains as
    /// needed. Entry point for a user lookup.
    pub fn resolve(&mut self, name: &DomainName, rtype: RecordType) -> Vec<ResourceRecord> {
        if self.single_query_mode {
            self.query_server(name, rtype, self.root_server);
            return self.cache.lookup(name, rtype);
        }
        self.resolve_iterative(name, rtype, 0)
    }

    fn resolve_iterative(&mut self, name: &DomainName, rtype: RecordType, indirection: u32) -> Vec<ResourceRecord> {
        if indirection > MAX_INDIRECTION {
            eprintln!("Maximum number of indirection levels reached");
            tracing::warn!(%name, %indirection, "maximum indirection reached");
            return Vec::new();
        }

        let direct = self.cache.lookup(name, rtype);
        if !direct.is_empty() {
            return direct;
        }

        let cname_target = cname_target(&self.cache.lookup(name, RecordType::CNAME));
        let needs_query = match &cname_target {
            Some(target) => self.cache.lookup(target, rtype).is_empty(),
            None => true,
        };
        if needs_query {
            self.query_chain(name, rtype);
        }

        let direct = self.cache.lookup(name, rtype);
        if !direct.is_empty() {
            return direct;
        }

        for cname_rr in self.cache.lookup(name, RecordType::CNAME) {
            if let RData::Name(target) = cname_rr.rdata {
                let sub = self.resolve_iterative(&target, rtype, indirection + 1);
                for rr in sub {
                    self.cache.insert(ResourceRecord {
                        name: name.clone(),
                        rtype,
                        ttl: rr.ttl,
                        rdata: rr.rdata,
                    });
                }
            }
        }

        self.cache.lookup(name, rtype)
    }

    /// Iterative walk starting at the configured root server.
    fn query_chain(&mut self, name: &DomainName, rtype: RecordType) {
        let mut current_server = self.root_server;

        loop {
            let ns_set = self.query_server(name, rtype, current_server);

            if self.cache.contains(name, rtype) || self.cache.contains(name, RecordType::CNAME) {
                return;
            }

            let ns_records: Vec<&ResourceRecord> = ns_set.iter().filter(|rr| rr.rtype == RecordType::NS).collect();
            if ns_records.is_empty() {
                return;
            }

            if let Some(ip) = first_ns_with_cached_glue(&self.cache, &ns_records) {
                current_server = ip;
                continue;
            }

            // No NS has cached glue: resolve exactly one NS's A record from
            // the root, and attempt exactly one more query with it. We stop
            // after this whether or not it succeeds.
            if let Some(RData::Name(host)) = ns_records.first().map(|rr| rr.rdata.clone()) {
                self.query_chain(&host, RecordType::A);
                if let Some(ip) = first_cached_a(&self.cache, &host) {
                    self.query_server(name, rtype, ip);
                }
            }
            return;
        }
    }

    /// Send one query to `server` and fold its response into the cache.
    /// Transport and parse failures are swallowed here, the single seam
    /// through which I/O and protocol errors surface as an empty result.
    ///
    /// Wrapped in a span so a `trace on` session shows every hop of the
    /// delegation walk as it happens, not just a flat stream of events.
    fn query_server(&mut self, name: &DomainName, rtype: RecordType, server: Ipv4Addr) -> Vec<ResourceRecord> {
        let _hop = tracing::debug_span!("query_server", %server, %name, %rtype).entered();

        let id = rand::thread_rng().gen();
        let payload = encode_query(id, name, rtype);

        if self.trace {
            tracing::debug!("querying nameserver");
        }

        match self.transport.send_and_receive(&payload, server) {
            Ok(bytes) => {
                let authority = ingest_response(&bytes, &mut self.cache);
                if self.trace {
                    tracing::debug!(authority_count = authority.len(), "got response");
                }
                authority
            }
            Err(err) => {
                tracing::debug!(%err, "query failed");
                Vec::new()
            }
        }
    }
}

/// The target of a cached CNAME record, if any.
fn cname_target(cname_rrs: &[ResourceRecord]) -> Option<DomainName> {
    cname_rrs.first().and_then(|rr| match &rr.rdata {
        RData::Name(name) => Some(name.clone()),
        _ => None,
    })
}

/// The first NS record (in authority-section order) whose A record is
/// already cached, if any.
fn first_ns_with_cached_glue(cache: &Cache, ns_records: &[&ResourceRecord]) -> Option<Ipv4Addr> {
    for ns in ns_records {
        if let RData::Name(host) = &ns.rdata {
            if let Some(ip) = first_cached_a(cache, host) {
                return Some(ip);
            }
        }
    }
    None
}

fn first_cached_a(cache: &Cache, host: &DomainName) -> Option<Ipv4Addr> {
    cache.lookup(host, RecordType::A).into_iter().find_map(|rr| match rr.rdata {
        RData::Ip(IpAddr::V4(ip)) => Some(ip),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::test_util::{MockTransport, Step};
    use std::net::Ipv4Addr;

    const ROOT: Ipv4Addr = Ipv4Addr::new(198, 41, 0, 4);

    fn response(
        id_field_ignored: bool,
        aa: bool,
        qname: &str,
        qtype: u16,
        answers: &[(&str, u16, u32, Vec<u8>)],
        authority: &[(&str, u16, u32, Vec<u8>)],
        additional: &[(&str, u16, u32, Vec<u8>)],
    ) -> Vec<u8> {
        let _ = id_field_ignored;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes()); // transport doesn't correlate by ID
        let flags1 = 0b1000_0000 | if aa { 0b0000_0100 } else { 0 };
        bytes.push(flags1);
        bytes.push(0);
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&(answers.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&(authority.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&(additional.len() as u16).to_be_bytes());
        write_name(&mut bytes, qname);
        bytes.extend_from_slice(&qtype.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        for section in [answers, authority, additional] {
            for (name, rtype, ttl, rdata) in section {
                write_name(&mut bytes, name);
                bytes.extend_from_slice(&rtype.to_be_bytes());
                bytes.extend_from_slice(&1u16.to_be_bytes());
                bytes.extend_from_slice(&ttl.to_be_bytes());
                bytes.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
                bytes.extend_from_slice(rdata);
            }
        }
        bytes
    }

    fn write_name(bytes: &mut Vec<u8>, name: &str) {
        if !name.is_empty() {
            for label in name.split('.') {
                bytes.push(label.len() as u8);
                bytes.extend_from_slice(label.as_bytes());
            }
        }
        bytes.push(0);
    }

    fn name_rdata(name: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_name(&mut bytes, name);
        bytes
    }

    #[test]
    fn s1_direct_answer() {
        let payload = response(
            true,
            true,
            "example.com",
            RecordType::CODE_A,
            &[("example.com", RecordType::CODE_A, 3600, vec![93, 184, 216, 34])],
            &[],
            &[],
        );
        let transport = MockTransport::new(vec![Step::Reply(payload)]);
        let mut ctx = ResolverContext::new(transport, ROOT);

        let rrs = ctx.resolve(&DomainName::from_dotted("example.com"), RecordType::A);
        assert_eq!(rrs.len(), 1);
        assert_eq!(rrs[0].rdata, RData::Ip(Ipv4Addr::new(93, 184, 216, 34).into()));
        assert_eq!(ctx.transport.calls, 1);
    }

    #[test]
    fn s2_delegation_with_glue() {
        let delegation = response(
            true,
            false,
            "example.com",
            RecordType::CODE_A,
            &[],
            &[("example.com", RecordType::CODE_NS, 3600, name_rdata("a.iana-servers.net"))],
            &[("a.iana-servers.net", RecordType::CODE_A, 3600, vec![199, 43, 135, 53])],
        );
        let answer = response(
            true,
            true,
            "example.com",
            RecordType::CODE_A,
            &[("example.com", RecordType::CODE_A, 3600, vec![93, 184, 216, 34])],
            &[],
            &[],
        );
        let transport = MockTransport::new(vec![Step::Reply(delegation), Step::Reply(answer)]);
        let mut ctx = ResolverContext::new(transport, ROOT);

        let rrs = ctx.resolve(&DomainName::from_dotted("example.com"), RecordType::A);
        assert_eq!(rrs.len(), 1);
        assert_eq!(ctx.transport.calls, 2);

        let glue = ctx.cache.lookup(&DomainName::from_dotted("a.iana-servers.net"), RecordType::A);
        assert_eq!(glue.len(), 1);
    }

    #[test]
    fn s3_cname_chase_synthesises_merged_record() {
        let cname_response = response(
            true,
            true,
            "www.foo.com",
            RecordType::CODE_A,
            &[("www.foo.com", RecordType::CODE_CNAME, 3600, name_rdata("foo.com"))],
            &[],
            &[],
        );
        let a_response = response(
            true,
            true,
            "foo.com",
            RecordType::CODE_A,
            &[("foo.com", RecordType::CODE_A, 3600, vec![1, 2, 3, 4])],
            &[],
            &[],
        );
        let transport = MockTransport::new(vec![Step::Reply(cname_response), Step::Reply(a_response)]);
        let mut ctx = ResolverContext::new(transport, ROOT);

        let rrs = ctx.resolve(&DomainName::from_dotted("www.foo.com"), RecordType::A);

        assert_eq!(rrs.len(), 1);
        assert_eq!(rrs[0].rdata, RData::Ip(Ipv4Addr::new(1, 2, 3, 4).into()));

        let cname = ctx.cache.lookup(&DomainName::from_dotted("www.foo.com"), RecordType::CNAME);
        assert_eq!(cname.len(), 1);
        let foo_a = ctx.cache.lookup(&DomainName::from_dotted("foo.com"), RecordType::A);
        assert_eq!(foo_a.len(), 1);
    }

    #[test]
    fn s4_timeout_then_success() {
        let answer = response(
            true,
            true,
            "example.com",
            RecordType::CODE_A,
            &[("example.com", RecordType::CODE_A, 3600, vec![1, 2, 3, 4])],
            &[],
            &[],
        );
        let transport = MockTransport::new(vec![Step::Timeout, Step::Reply(answer)]);
        let mut ctx = ResolverContext::new(transport, ROOT);

        let rrs = ctx.resolve(&DomainName::from_dotted("example.com"), RecordType::A);
        assert_eq!(rrs.len(), 1);
        assert_eq!(ctx.transport.calls, 1);
        assert_eq!(ctx.transport.steps_consumed, 2);
    }

    #[test]
    fn s5_indirection_limit() {
        let letters: Vec<char> = ('a'..='l').collect();
        let mut steps = Vec::new();
        for i in 0..letters.len() - 1 {
            let from = letters[i].to_string();
            let to = letters[i + 1].to_string();
            steps.push(Step::Reply(response(
                true,
                true,
                &from,
                RecordType::CODE_A,
                &[(&from, RecordType::CODE_CNAME, 3600, name_rdata(&to))],
                &[],
                &[],
            )));
        }
        let transport = MockTransport::new(steps);
        let mut ctx = ResolverContext::new(transport, ROOT);

        let rrs = ctx.resolve(&DomainName::from_dotted("a"), RecordType::A);
        assert!(rrs.is_empty());
    }

    #[test]
    fn s6_rcode_error_yields_empty_result() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.push(0b1000_0000);
        bytes.push(3); // RCODE = 3
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        write_name(&mut bytes, "example.com");
        bytes.extend_from_slice(&RecordType::CODE_A.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());

        let transport = MockTransport::new(vec![Step::Reply(bytes)]);
        let mut ctx = ResolverContext::new(transport, ROOT);

        let rrs = ctx.resolve(&DomainName::from_dotted("example.com"), RecordType::A);
        assert!(rrs.is_empty());
    }

    #[test]
    fn p1_mode_makes_exactly_one_transport_call() {
        let answer = response(
            true,
            true,
            "example.com",
            RecordType::CODE_A,
            &[("example.com", RecordType::CODE_A, 3600, vec![1, 2, 3, 4])],
            &[],
            &[],
        );
        let transport = MockTransport::new(vec![Step::Reply(answer)]);
        let mut ctx = ResolverContext::new(transport, ROOT);
        ctx.single_query_mode = true;

        let rrs = ctx.resolve(&DomainName::from_dotted("example.com"), RecordType::A);
        assert_eq!(rrs.len(), 1);
        assert_eq!(ctx.transport.calls, 1);
    }
}
