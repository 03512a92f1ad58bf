//! Wire-level types shared between serialisation and deserialisation.
//!
//! See section 4.1 of RFC 1035 for the message format these mirror.

use std::fmt;
use std::net::IpAddr;

/// A domain name, canonicalised on construction to lowercase dotted form
/// with no trailing dot (e.g. `www.example.com`).
///
/// Domain names are case-insensitive per RFC 1035, so every constructor
/// lowercases the input; callers never need to remember to normalise
/// before comparing or indexing by name.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct DomainName(String);

impl DomainName {
    /// The root domain - the empty name.
    pub fn root() -> Self {
        DomainName(String::new())
    }

    /// Build a domain name from its dotted textual form, stripping a
    /// trailing dot and lowercasing every label.
    pub fn from_dotted(s: &str) -> Self {
        DomainName(s.trim_end_matches('.').to_ascii_lowercase())
    }

    /// Build a domain name directly from already-lowercased labels, as
    /// produced by the wire decoder.
    pub fn from_labels(labels: &[Vec<u8>]) -> Self {
        let parts: Vec<String> = labels
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect();
        DomainName(parts.join("."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The labels of this name, outermost first.
    pub fn labels(&self) -> Vec<&str> {
        if self.0.is_empty() {
            Vec::new()
        } else {
            self.0.split('.').collect()
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The record/query types this resolver understands on the wire.
///
/// `Other` is a sentinel for any numeric code this resolver doesn't have a
/// dedicated variant for: it is never queried, but responses may legally
/// contain such records (e.g. SOA, TXT) and those still need to round-trip
/// through the cache for display purposes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    MX,
    AAAA,
    Other(u16),
}

impl RecordType {
    pub const CODE_A: u16 = 1;
    pub const CODE_NS: u16 = 2;
    pub const CODE_CNAME: u16 = 5;
    pub const CODE_MX: u16 = 15;
    pub const CODE_AAAA: u16 = 28;

    pub fn code(self) -> u16 {
        match self {
            RecordType::A => Self::CODE_A,
            RecordType::NS => Self::CODE_NS,
            RecordType::CNAME => Self::CODE_CNAME,
            RecordType::MX => Self::CODE_MX,
            RecordType::AAAA => Self::CODE_AAAA,
            RecordType::Other(code) => code,
        }
    }
}

impl From<u16> for RecordType {
    fn from(code: u16) -> Self {
        match code {
            Self::CODE_A => RecordType::A,
            Self::CODE_NS => RecordType::NS,
            Self::CODE_CNAME => RecordType::CNAME,
            Self::CODE_MX => RecordType::MX,
            Self::CODE_AAAA => RecordType::AAAA,
            other => RecordType::Other(other),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::MX => write!(f, "MX"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::Other(code) => write!(f, "TYPE{code}"),
        }
    }
}

/// Parses the handful of record-type mnemonics the REPL accepts.
impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::NS),
            "CNAME" => Ok(RecordType::CNAME),
            "MX" => Ok(RecordType::MX),
            "AAAA" => Ok(RecordType::AAAA),
            other => Err(format!("unknown record type: {other}")),
        }
    }
}

/// The interpreted value of a resource record's RDATA, per the table in
/// RFC 1035 section 4.1.3: an IP address for A/AAAA, a name for NS/CNAME, and an
/// opaque placeholder for anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    Ip(IpAddr),
    Name(DomainName),
    Text(String),
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::Ip(addr) => write!(f, "{addr}"),
            RData::Name(name) => write!(f, "{name}"),
            RData::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Placeholder rdata text for record types this resolver doesn't interpret.
pub const UNSUPPORTED_RDATA: &str = "----";

/// A single `(name, type, ttl, rdata)` resource record.
///
/// Equality and hashing are by `(name, type, rdata)` only: TTL is not part
/// of a record's identity, so two records that differ only in TTL compare
/// equal and the later insertion wins when both land in the same cache
/// bucket.
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub rtype: RecordType,
    pub ttl: u32,
    pub rdata: RData,
}

impl PartialEq for ResourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.rtype == other.rtype && self.rdata == other.rdata
    }
}

impl Eq for ResourceRecord {}

/// A parsed question section entry.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Question {
    pub name: DomainName,
    pub qtype: RecordType,
    pub qclass: u16,
}

/// The fixed 12-byte header, decoded into its constituent fields.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Header {
    pub id: u16,
    pub is_response: bool,
    pub opcode: u8,
    pub is_authoritative: bool,
    pub is_truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    /// The header-level rejection rules: a response that fails any of
    /// these carries no usable information.
    pub fn is_acceptable(&self) -> bool {
        self.is_response && !self.is_truncated && self.rcode == 0 && !(self.is_authoritative && self.ancount == 0)
    }
}
