//! The DNS wire codec: byte-exact query encoding and response decoding,
//! including the cache insertion side-effects a decoded response triggers
//! for its answer/additional records.

pub mod deserialise;
pub mod serialise;
pub mod types;

pub use deserialise::{decode_message, ProtocolError};
pub use serialise::encode_query;
pub use types::{DomainName, Header, Question, RData, RecordType, ResourceRecord};

use crate::cache::Cache;

/// Decode a response datagram and apply the acceptance and caching rules:
///
/// - a header that fails [`Header::is_acceptable`] caches nothing and
///   returns an empty authority set;
/// - answer and additional records are inserted into `cache`;
/// - authority records are *not* inserted, only returned to the caller;
/// - if the response is authoritative and an answer is an `A`/`AAAA`
///   record, a second record is synthesised under the question's name (this
///   is how a CNAME-terminated answer chain surfaces an address record
///   under the originally queried name).
///
/// Returns the authority set (order preserved), or an empty set if the
/// datagram was malformed or rejected.
pub fn ingest_response(bytes: &[u8], cache: &mut Cache) -> Vec<ResourceRecord> {
    let decoded = match decode_message(bytes) {
        Ok(decoded) => decoded,
        Err(_) => return Vec::new(),
    };

    if !decoded.header.is_acceptable() {
        return Vec::new();
    }

    let qname = decoded.question.as_ref().map(|q| q.name.clone());

    for rr in decoded.answers {
        let synthesise = decoded.header.is_authoritative
            && matches!(rr.rtype, RecordType::A | RecordType::AAAA)
            && qname.as_ref().is_some_and(|n| *n != rr.name);
        if synthesise {
            if let Some(name) = qname.clone() {
                cache.insert(ResourceRecord {
                    name,
                    rtype: rr.rtype,
                    ttl: rr.ttl,
                    rdata: rr.rdata.clone(),
                });
            }
        }
        cache.insert(rr);
    }

    for rr in decoded.additional {
        cache.insert(rr);
    }

    decoded.authority
}
