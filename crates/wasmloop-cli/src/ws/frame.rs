//! Server-to-client frame encoding.

/// FIN bit of the first header byte.
const FIN: u8 = 0b1000_0000;

/// Largest payload whose length fits in the 7-bit field.
const MAX_INLINE_LEN: usize = 125;

/// Marker for a 16-bit extended length.
const EXTENDED_16: u8 = 126;

/// Marker for a 64-bit extended length.
const EXTENDED_64: u8 = 127;

/// Frame opcode. Only data frames are ever sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// UTF-8 text payload (`0x1`)
    Text,
    /// Arbitrary binary payload (`0x2`)
    Binary,
}

impl Opcode {
    /// Opcode for the given payload kind.
    pub fn for_payload(is_binary: bool) -> Self {
        if is_binary {
            Opcode::Binary
        } else {
            Opcode::Text
        }
    }

    /// Wire value of the opcode nibble.
    pub fn bits(self) -> u8 {
        match self {
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
        }
    }
}

/// A single, complete data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub opcode: Opcode,
    pub payload: &'a [u8],
}

impl Frame<'_> {
    /// Serialize header and payload into one contiguous buffer.
    ///
    /// Server frames are never masked.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.payload.len();
        let mut out = Vec::with_capacity(header_len(len) + len);
        out.push(FIN | self.opcode.bits());

        if len <= MAX_INLINE_LEN {
            out.push(len as u8);
        } else if let Ok(len16) = u16::try_from(len) {
            out.push(EXTENDED_16);
            out.extend_from_slice(&len16.to_be_bytes());
        } else {
            out.push(EXTENDED_64);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }

        out.extend_from_slice(self.payload);
        out
    }
}

/// Encode a payload as a single FIN frame.
pub fn encode_frame(payload: &[u8], is_binary: bool) -> Vec<u8> {
    Frame {
        opcode: Opcode::for_payload(is_binary),
        payload,
    }
    .to_bytes()
}

/// Header size for a payload of `len` bytes.
pub fn header_len(len: usize) -> usize {
    if len <= MAX_INLINE_LEN {
        2
    } else if len <= u16::MAX as usize {
        4
    } else {
        10
    }
}
