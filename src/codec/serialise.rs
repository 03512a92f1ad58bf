//! Encoding of an iterative query, per RFC 1035 section 4.1.1.

use crate::codec::types::{DomainName, RecordType};

/// A buffer built up during encoding.
pub struct WritableBuffer {
    pub octets: Vec<u8>,
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self {
            octets: Vec::with_capacity(512),
        }
    }
}

impl WritableBuffer {
    pub fn write_u8(&mut self, octet: u8) {
        self.octets.push(octet);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    fn write_qname(&mut self, name: &DomainName) {
        for label in name.labels() {
            // the REPL is the only source of domain names for queries and
            // is assumed to hand us well-formed input - labels longer than
            // 63 octets are not rejected here.
            self.write_u8(label.len() as u8);
            self.octets.extend_from_slice(label.as_bytes());
        }
        self.write_u8(0);
    }
}

/// Encode a single-question, iterative (`RD=0`) query for `name`/`qtype`,
/// using `id` as the transaction ID.
///
/// The resulting payload is exactly `12 + qname_encoded_len + 4` octets, per
/// section 4.1.1.
pub fn encode_query(id: u16, name: &DomainName, qtype: RecordType) -> Vec<u8> {
    let mut buffer = WritableBuffer::default();

    buffer.write_u16(id);
    buffer.write_u8(0x00); // QR=0, Opcode=0, AA=0, TC=0, RD=0
    buffer.write_u8(0x00); // RA=0, Z=0, RCODE=0
    buffer.write_u16(1); // QDCOUNT
    buffer.write_u16(0); // ANCOUNT
    buffer.write_u16(0); // NSCOUNT
    buffer.write_u16(0); // ARCOUNT

    buffer.write_qname(name);
    buffer.write_u16(qtype.code());
    buffer.write_u16(1); // QCLASS = IN

    buffer.octets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_expected_length() {
        let name = DomainName::from_dotted("example.com");
        let payload = encode_query(1234, &name, RecordType::A);
        // 12 header + (1+7 "example" + 1+3 "com" + 1 terminator) + 4
        assert_eq!(payload.len(), 12 + (1 + 7 + 1 + 3 + 1) + 4);
    }

    #[test]
    fn encodes_header_fields() {
        let name = DomainName::from_dotted("example.com");
        let payload = encode_query(0xabcd, &name, RecordType::A);
        assert_eq!(&payload[0..2], &[0xab, 0xcd]);
        assert_eq!(&payload[2..4], &[0x00, 0x00]);
        assert_eq!(&payload[4..6], &[0x00, 0x01]);
        assert_eq!(&payload[6..8], &[0x00, 0x00]);
        assert_eq!(&payload[8..10], &[0x00, 0x00]);
        assert_eq!(&payload[10..12], &[0x00, 0x00]);
    }

    #[test]
    fn encodes_qtype_and_qclass() {
        let name = DomainName::from_dotted("example.com");
        let payload = encode_query(0, &name, RecordType::MX);
        let n = payload.len();
        assert_eq!(&payload[n - 4..n - 2], &RecordType::MX.code().to_be_bytes());
        assert_eq!(&payload[n - 2..n], &[0x00, 0x01]);
    }
}
