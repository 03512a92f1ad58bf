//! Shared record-printing format, used by both `lookup` output and `dump`.

use crate::codec::{DomainName, RData, RecordType, ResourceRecord};

/// TTL and rdata printed for a name/type pair with nothing cached.
const NO_RECORD_TTL: i64 = -1;
const NO_RECORD_RDATA: &str = "0.0.0.0";

/// Format one line of `name type ttl rdata`, column-aligned.
pub fn format_record(name: &str, rtype: &str, ttl: i64, rdata: &str) -> String {
    format!("{name:<30} {rtype:<5} {ttl:<8} {rdata}")
}

/// Print every record in `rrs` under `name`/`rtype`, or a single sentinel
/// line if the set is empty.
pub fn print_records(name: &DomainName, rtype: RecordType, rrs: &[ResourceRecord]) {
    if rrs.is_empty() {
        println!(
            "{}",
            format_record(name.as_str(), &rtype.to_string(), NO_RECORD_TTL, NO_RECORD_RDATA)
        );
        return;
    }

    for rr in rrs {
        println!(
            "{}",
            format_record(name.as_str(), &rr.rtype.to_string(), rr.ttl as i64, &format_rdata(&rr.rdata))
        );
    }
}

fn format_rdata(rdata: &RData) -> String {
    rdata.to_string()
}
