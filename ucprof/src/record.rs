//! The wire record.
//!
//! The channel carries back-to-back records with no framing:
//!
//! ```text
//! offset  size              field
//! 0       4                 label     'O' (enter) or 'C' (exit), then three zero bytes
//! 4       4                 timestamp u32, little-endian
//! 8       4                 context   u32, little-endian
//! 12      size_of::<usize>  function  address, little-endian
//! ```
//!
//! Host parsers hard-code this layout and find record boundaries by size alone, so it must not
//! change within a session.

use core::mem::size_of;

use byteorder::{ByteOrder, LittleEndian};

pub const LABEL_LEN: usize = 4;

const TIMESTAMP_OFFSET: usize = LABEL_LEN;
const CONTEXT_OFFSET: usize = TIMESTAMP_OFFSET + 4;
const FUNCTION_OFFSET: usize = CONTEXT_OFFSET + 4;

/// Size in bytes of one encoded record on the target.
pub const RECORD_SIZE: usize = FUNCTION_OFFSET + size_of::<usize>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Function entered.
    Enter,
    /// Function returned.
    Exit,
}

impl EventKind {
    pub const fn label(self) -> [u8; LABEL_LEN] {
        match self {
            EventKind::Enter => *b"O\0\0\0",
            EventKind::Exit => *b"C\0\0\0",
        }
    }

    pub fn from_label(label: &[u8]) -> Option<EventKind> {
        if label == EventKind::Enter.label() {
            Some(EventKind::Enter)
        } else if label == EventKind::Exit.label() {
            Some(EventKind::Exit)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub kind: EventKind,
    /// Tick count at capture.
    pub timestamp: u32,
    /// Opaque handle of the task that was running.
    pub context: u32,
    /// Address of the function entered or left.
    pub function: usize,
}

impl Record {
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[..LABEL_LEN].copy_from_slice(&self.kind.label());
        LittleEndian::write_u32(&mut out[TIMESTAMP_OFFSET..CONTEXT_OFFSET], self.timestamp);
        LittleEndian::write_u32(&mut out[CONTEXT_OFFSET..FUNCTION_OFFSET], self.context);
        LittleEndian::write_uint(
            &mut out[FUNCTION_OFFSET..],
            self.function as u64,
            size_of::<usize>(),
        );
        out
    }

    /// Decodes the record at the start of `bytes`.
    ///
    /// Returns `None` if fewer than [`RECORD_SIZE`] bytes are given or the label is not one of
    /// the two known markers.
    pub fn decode(bytes: &[u8]) -> Option<Record> {
        if bytes.len() < RECORD_SIZE {
            return None;
        }
        let kind = EventKind::from_label(&bytes[..LABEL_LEN])?;
        Some(Record {
            kind,
            timestamp: LittleEndian::read_u32(&bytes[TIMESTAMP_OFFSET..CONTEXT_OFFSET]),
            context: LittleEndian::read_u32(&bytes[CONTEXT_OFFSET..FUNCTION_OFFSET]),
            function: LittleEndian::read_uint(
                &bytes[FUNCTION_OFFSET..RECORD_SIZE],
                size_of::<usize>(),
            ) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_is_packed() {
        assert_eq!(RECORD_SIZE, 12 + size_of::<usize>());
    }

    #[test]
    fn enter_record_layout() {
        let record = Record {
            kind: EventKind::Enter,
            timestamp: 100,
            context: 7,
            function: 0x2000,
        };
        let bytes = record.encode();

        assert_eq!(&bytes[0..4], b"O\0\0\0");
        assert_eq!(&bytes[4..8], &[100, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[7, 0, 0, 0]);
        assert_eq!(&bytes[12..14], &[0x00, 0x20]);
        assert!(bytes[14..].iter().all(|b| *b == 0));
    }

    #[test]
    fn exit_label() {
        assert_eq!(EventKind::Exit.label(), [b'C', 0, 0, 0]);
        assert_eq!(EventKind::from_label(b"C\0\0\0"), Some(EventKind::Exit));
    }

    #[test]
    fn decode_reverses_encode() {
        let record = Record {
            kind: EventKind::Exit,
            timestamp: u32::MAX,
            context: 0xdead_beef,
            function: usize::MAX - 3,
        };
        assert_eq!(Record::decode(&record.encode()), Some(record));
    }

    #[test]
    fn decode_rejects_unknown_label_and_short_input() {
        let mut bytes = Record {
            kind: EventKind::Enter,
            timestamp: 1,
            context: 1,
            function: 1,
        }
        .encode();
        assert_eq!(Record::decode(&bytes[..RECORD_SIZE - 1]), None);

        bytes[1] = b'x';
        assert_eq!(Record::decode(&bytes), None);
    }
}
