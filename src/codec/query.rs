use bitstream_io::{BigEndian, BitWrite, BitWriter};
use thiserror::Error;

use super::qtype::QType;

const MAX_UDP_MESSAGE: usize = 512;
const MAX_NAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;
const QCLASS_IN: u16 = 1;

/// Wire codec failures (§4.A). All are setup/per-line failures, never
/// panics: a malformed name is something an input file can trivially
/// contain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("label '{0}' exceeds 63 bytes")]
    LabelTooLong(String),
    #[error("domain name '{0}' exceeds 255 bytes")]
    NameTooLong(String),
    #[error("encoded message for '{0}' exceeds 512 bytes")]
    MessageTooLong(String),
}

/// Builds a standard DNS QUERY datagram for `(name, qtype)` with class IN,
/// stamping the caller-supplied transaction id into bytes 0-1 (§4.A).
/// `id` allocation is the engine's concern; the codec only serializes.
pub fn encode(id: u16, name: &str, qtype: QType) -> Result<Vec<u8>, CodecError> {
    let labels = split_labels(name)?;

    let mut buf = Vec::with_capacity(64);
    {
        let mut writer = BitWriter::<_, BigEndian>::new(&mut buf);
        write_header(&mut writer, id).expect("writing to a Vec<u8> cannot fail");
        write_labels(&mut writer, &labels).expect("writing to a Vec<u8> cannot fail");
        writer
            .write_var::<u16>(16, qtype.code())
            .expect("writing to a Vec<u8> cannot fail");
        writer
            .write_var::<u16>(16, QCLASS_IN)
            .expect("writing to a Vec<u8> cannot fail");
    }

    if buf.len() > MAX_UDP_MESSAGE {
        return Err(CodecError::MessageTooLong(name.to_string()));
    }
    Ok(buf)
}

/// Reads the leading two bytes of a received datagram as the big-endian
/// transaction id. Returns `None` only if the datagram is too short to
/// contain one; otherwise performs no further validation (§4.A) — we
/// correlate, we do not parse.
pub fn extract_id(bytes: &[u8]) -> Option<u16> {
    if bytes.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn split_labels(name: &str) -> Result<Vec<&str>, CodecError> {
    let labels: Vec<&str> = name.split('.').filter(|l| !l.is_empty()).collect();

    for label in &labels {
        if label.len() > MAX_LABEL_LEN {
            return Err(CodecError::LabelTooLong((*label).to_string()));
        }
    }

    // +1 length byte per label, +1 for the terminating root label.
    let encoded_len: usize = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
    if encoded_len > MAX_NAME_LEN {
        return Err(CodecError::NameTooLong(name.to_string()));
    }

    Ok(labels)
}

fn write_header<W: std::io::Write>(
    writer: &mut BitWriter<W, BigEndian>,
    id: u16,
) -> std::io::Result<()> {
    writer.write_var::<u16>(16, id)?;
    writer.write_bit(false)?; // QR: query
    writer.write_var::<u8>(4, 0)?; // OPCODE: standard query
    writer.write_bit(false)?; // AA
    writer.write_bit(false)?; // TC
    writer.write_bit(false)?; // RD: recursion not requested by this tool
    writer.write_bit(false)?; // RA
    writer.write_var::<u8>(3, 0)?; // Z
    writer.write_var::<u8>(4, 0)?; // RCODE
    writer.write_var::<u16>(16, 1)?; // QDCOUNT
    writer.write_var::<u16>(16, 0)?; // ANCOUNT
    writer.write_var::<u16>(16, 0)?; // NSCOUNT
    writer.write_var::<u16>(16, 0)?; // ARCOUNT
    Ok(())
}

fn write_labels<W: std::io::Write>(
    writer: &mut BitWriter<W, BigEndian>,
    labels: &[&str],
) -> std::io::Result<()> {
    for label in labels {
        writer.write_var::<u8>(8, label.len() as u8)?;
        for byte in label.as_bytes() {
            writer.write_var::<u8>(8, *byte)?;
        }
    }
    writer.write_var::<u8>(8, 0) // root label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_id_in_network_byte_order() {
        let packet = encode(0xABCD, "example.com", QType::A).unwrap();
        assert_eq!(&packet[0..2], &[0xAB, 0xCD]);
    }

    #[test]
    fn header_counts_match_single_question() {
        let packet = encode(1, "example.com", QType::A).unwrap();
        // QDCOUNT at bytes 4-5, must be 1; AN/NS/AR counts at 6-11, all 0.
        assert_eq!(&packet[4..6], &[0x00, 0x01]);
        assert_eq!(&packet[6..12], &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn encodes_labels_in_dns_wire_form() {
        let packet = encode(1, "a.bc", QType::A).unwrap();
        // Header is 12 bytes, then: len(1) 'a' len(2) 'b' 'c' 0x00
        let qname = &packet[12..];
        assert_eq!(qname, &[1, b'a', 2, b'b', b'c', 0]);
    }

    #[test]
    fn trailing_dot_does_not_add_an_empty_label() {
        let with_dot = encode(1, "example.com.", QType::A).unwrap();
        let without_dot = encode(1, "example.com", QType::A).unwrap();
        assert_eq!(with_dot, without_dot);
    }

    #[test]
    fn rejects_label_over_63_bytes() {
        let long_label = "a".repeat(64);
        let name = format!("{long_label}.com");
        assert!(matches!(
            encode(1, &name, QType::A),
            Err(CodecError::LabelTooLong(_))
        ));
    }

    #[test]
    fn rejects_name_over_255_bytes() {
        let label = "a".repeat(50);
        let name = vec![label; 6].join(".");
        assert!(matches!(
            encode(1, &name, QType::A),
            Err(CodecError::NameTooLong(_))
        ));
    }

    #[test]
    fn extract_id_reads_leading_two_bytes() {
        let packet = encode(0x1234, "example.com", QType::A).unwrap();
        assert_eq!(extract_id(&packet), Some(0x1234));
    }

    #[test]
    fn extract_id_is_none_for_short_datagrams() {
        assert_eq!(extract_id(&[0x12]), None);
        assert_eq!(extract_id(&[]), None);
    }

    #[test]
    fn qclass_is_always_in() {
        let packet = encode(1, "example.com", QType::Mx).unwrap();
        let len = packet.len();
        assert_eq!(&packet[len - 2..], &[0x00, 0x01]);
    }
}
