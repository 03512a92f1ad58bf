//! Decoding of a DNS response, including the RFC 1035 section 4.1.4
//! message-compression pointer scheme.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::codec::types::{DomainName, Header, Question, RData, RecordType, ResourceRecord, UNSUPPORTED_RDATA};

/// The total number of pointer expansions a single message decode may
/// perform, across every name it decodes. Bounds the cost of a maliciously
/// crafted chain of pointers.
const MAX_POINTER_EXPANSIONS: u32 = 128;

/// Errors encountered while parsing a datagram. Any of these leaves the
/// message unusable; the resolver treats them all as "no information" and
/// does not special-case individual variants.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProtocolError {
    /// Fewer than 12 octets - not even a full header.
    HeaderTooShort,
    QuestionTooShort,
    ResourceRecordTooShort,
    DomainTooShort,
    DomainTooLong,
    /// A pointer points forward, or the chain of pointers is too long.
    DomainPointerInvalid,
    /// A label length byte is in the reserved 64-191 range.
    DomainLabelInvalid,
}

/// A buffer consumed by the parsing process, tracking a cursor position.
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    position: usize,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self { octets, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn next_u8(&mut self) -> Option<u8> {
        let value = *self.octets.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    pub fn next_u16(&mut self) -> Option<u16> {
        let a = *self.octets.get(self.position)?;
        let b = *self.octets.get(self.position + 1)?;
        self.position += 2;
        Some(u16::from_be_bytes([a, b]))
    }

    pub fn next_u32(&mut self) -> Option<u32> {
        let bytes = self.octets.get(self.position..self.position + 4)?;
        self.position += 4;
        Some(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        let slice = self.octets.get(self.position..self.position + size)?;
        self.position += size;
        Some(slice)
    }

    /// A fresh cursor over the same underlying bytes, positioned at
    /// `position`. Used to follow compression pointers without disturbing
    /// the caller's own cursor.
    pub fn at_offset(&self, position: usize) -> ConsumableBuffer<'a> {
        Self {
            octets: self.octets,
            position,
        }
    }
}

/// Decode a domain name starting at the buffer's current position,
/// expanding any compression pointers it contains.
///
/// `budget` is decremented once per pointer followed and is shared across
/// the whole message decode, bounding the total work a crafted chain of
/// pointers can force.
fn decode_name(buffer: &mut ConsumableBuffer, budget: &mut u32) -> Result<DomainName, ProtocolError> {
    let mut labels: Vec<Vec<u8>> = Vec::new();

    loop {
        let size = buffer.next_u8().ok_or(ProtocolError::DomainTooShort)?;

        if size == 0 {
            break;
        } else if size <= 63 {
            let octets = buffer.take(size as usize).ok_or(ProtocolError::DomainTooShort)?;
            labels.push(octets.iter().map(|o| o.to_ascii_lowercase()).collect());
        } else if size >= 192 {
            if *budget == 0 {
                return Err(ProtocolError::DomainPointerInvalid);
            }
            *budget -= 1;

            let hi = size & 0b0011_1111;
            let lo = buffer.next_u8().ok_or(ProtocolError::DomainTooShort)?;
            let pointer = u16::from_be_bytes([hi, lo]) as usize;

            let mut target = buffer.at_offset(pointer);
            let rest = decode_name(&mut target, budget)?;
            for label in rest.labels() {
                labels.push(label.as_bytes().to_vec());
            }
            break;
        } else {
            return Err(ProtocolError::DomainLabelInvalid);
        }

        if labels.iter().map(|l| l.len() + 1).sum::<usize>() > 255 {
            return Err(ProtocolError::DomainTooLong);
        }
    }

    Ok(DomainName::from_labels(&labels))
}

impl Header {
    fn decode(buffer: &mut ConsumableBuffer) -> Result<Self, ProtocolError> {
        let id = buffer.next_u16().ok_or(ProtocolError::HeaderTooShort)?;
        let flags1 = buffer.next_u8().ok_or(ProtocolError::HeaderTooShort)?;
        let flags2 = buffer.next_u8().ok_or(ProtocolError::HeaderTooShort)?;
        let qdcount = buffer.next_u16().ok_or(ProtocolError::HeaderTooShort)?;
        let ancount = buffer.next_u16().ok_or(ProtocolError::HeaderTooShort)?;
        let nscount = buffer.next_u16().ok_or(ProtocolError::HeaderTooShort)?;
        let arcount = buffer.next_u16().ok_or(ProtocolError::HeaderTooShort)?;

        Ok(Header {
            id,
            is_response: flags1 & 0b1000_0000 != 0,
            opcode: (flags1 & 0b0111_1000) >> 3,
            is_authoritative: flags1 & 0b0000_0100 != 0,
            is_truncated: flags1 & 0b0000_0010 != 0,
            recursion_desired: flags1 & 0b0000_0001 != 0,
            recursion_available: flags2 & 0b1000_0000 != 0,
            rcode: flags2 & 0b0000_1111,
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}

fn decode_question(buffer: &mut ConsumableBuffer, budget: &mut u32) -> Result<Question, ProtocolError> {
    let name = decode_name(buffer, budget)?;
    let qtype = buffer.next_u16().ok_or(ProtocolError::QuestionTooShort)?;
    let qclass = buffer.next_u16().ok_or(ProtocolError::QuestionTooShort)?;

    Ok(Question {
        name,
        qtype: RecordType::from(qtype),
        qclass,
    })
}

fn decode_rr(buffer: &mut ConsumableBuffer, budget: &mut u32) -> Result<ResourceRecord, ProtocolError> {
    let name = decode_name(buffer, budget)?;
    let rtype = RecordType::from(buffer.next_u16().ok_or(ProtocolError::ResourceRecordTooShort)?);
    let _rclass = buffer.next_u16().ok_or(ProtocolError::ResourceRecordTooShort)?;
    let ttl = buffer.next_u32().ok_or(ProtocolError::ResourceRecordTooShort)?;
    let rdlength = buffer.next_u16().ok_or(ProtocolError::ResourceRecordTooShort)? as usize;

    let rdata = match rtype {
        RecordType::A => {
            let octets = buffer.take(rdlength).ok_or(ProtocolError::ResourceRecordTooShort)?;
            match <[u8; 4]>::try_from(octets) {
                Ok(b) => RData::Ip(Ipv4Addr::from(b).into()),
                Err(_) => RData::Text(UNSUPPORTED_RDATA.to_string()),
            }
        }
        RecordType::AAAA => {
            let octets = buffer.take(rdlength).ok_or(ProtocolError::ResourceRecordTooShort)?;
            match <[u8; 16]>::try_from(octets) {
                Ok(b) => RData::Ip(Ipv6Addr::from(b).into()),
                Err(_) => RData::Text(UNSUPPORTED_RDATA.to_string()),
            }
        }
        RecordType::NS | RecordType::CNAME => RData::Name(decode_name(buffer, budget)?),
        RecordType::MX | RecordType::Other(_) => {
            buffer.take(rdlength).ok_or(ProtocolError::ResourceRecordTooShort)?;
            RData::Text(UNSUPPORTED_RDATA.to_string())
        }
    };

    Ok(ResourceRecord {
        name,
        rtype,
        ttl,
        rdata,
    })
}

/// A fully parsed message: header plus the four sections.
#[derive(Debug)]
pub struct DecodedMessage {
    pub header: Header,
    pub question: Option<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

/// Parse a complete response datagram.
///
/// This only does structural parsing - it does not apply the header-level
/// acceptance rules (see [`Header::is_acceptable`]) nor insert anything
/// into a cache; callers combine the two (see
/// `crate::codec::ingest_response`).
pub fn decode_message(bytes: &[u8]) -> Result<DecodedMessage, ProtocolError> {
    let mut buffer = ConsumableBuffer::new(bytes);
    let mut budget = MAX_POINTER_EXPANSIONS;

    let header = Header::decode(&mut buffer)?;

    let mut question = None;
    for i in 0..header.qdcount {
        let q = decode_question(&mut buffer, &mut budget)?;
        if i == 0 {
            question = Some(q);
        }
    }

    let mut answers = Vec::with_capacity(header.ancount as usize);
    for _ in 0..header.ancount {
        answers.push(decode_rr(&mut buffer, &mut budget)?);
    }

    let mut authority = Vec::with_capacity(header.nscount as usize);
    for _ in 0..header.nscount {
        authority.push(decode_rr(&mut buffer, &mut budget)?);
    }

    let mut additional = Vec::with_capacity(header.arcount as usize);
    for _ in 0..header.arcount {
        additional.push(decode_rr(&mut buffer, &mut budget)?);
    }

    Ok(DecodedMessage {
        header,
        question,
        answers,
        authority,
        additional,
    })
}
