//! IEEE 488.2 definite-length binary blocks (`#<N><len><payload>`).

use crate::error::{ScpiError, ScpiResult};

/// A parsed definite-length block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBlock<'a> {
    /// Payload length announced by the header
    pub declared_len: usize,
    /// Header length (`2 + N`)
    pub header_len: usize,
    /// Everything after the header, trailing terminator included
    pub payload: &'a [u8],
}

impl BinaryBlock<'_> {
    /// Payload cut to the declared length when the data holds at least that
    /// many bytes.
    pub fn declared_payload(&self) -> &[u8] {
        &self.payload[..self.declared_len.min(self.payload.len())]
    }
}

/// Split `raw` into header and payload.
///
/// ```
/// use daq_scpi::instrument::binary_block::parse_definite_block;
///
/// let block = parse_definite_block(b"#15hello\n").unwrap();
/// assert_eq!(block.header_len, 3);
/// assert_eq!(block.payload, b"hello\n");
/// ```
pub fn parse_definite_block(raw: &[u8]) -> ScpiResult<BinaryBlock<'_>> {
    let (&first, rest) = raw
        .split_first()
        .ok_or_else(|| ScpiError::BinaryBlock("empty response".to_string()))?;
    if first != b'#' {
        return Err(ScpiError::BinaryBlock(format!(
            "expected '#', got 0x{:02x}",
            first
        )));
    }
    let digit = rest
        .first()
        .ok_or_else(|| ScpiError::BinaryBlock("missing length digit".to_string()))?;
    let width = match digit {
        // Indefinite length: the payload runs to the end of the data.
        b'0' => {
            return Ok(BinaryBlock {
                declared_len: raw.len() - 2,
                header_len: 2,
                payload: &raw[2..],
            })
        }
        b'1'..=b'9' => usize::from(digit - b'0'),
        other => {
            return Err(ScpiError::BinaryBlock(format!(
                "length digit must be 0-9, got '{}'",
                char::from(*other)
            )))
        }
    };
    let header_len = 2 + width;
    let field = raw.get(2..header_len).ok_or_else(|| {
        ScpiError::BinaryBlock(format!(
            "header needs {} bytes, got {}",
            header_len,
            raw.len()
        ))
    })?;
    if !field.iter().all(u8::is_ascii_digit) {
        return Err(ScpiError::BinaryBlock(format!(
            "length field '{}' is not decimal",
            String::from_utf8_lossy(field)
        )));
    }
    // At most nine ASCII digits, always fits in usize.
    let declared_len = field
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'));

    Ok(BinaryBlock {
        declared_len,
        header_len,
        payload: &raw[header_len..],
    })
}

/// Total header + payload length announced by a block prefix, if `raw`
/// starts with a complete header.
pub fn expected_len(raw: &[u8]) -> Option<usize> {
    parse_definite_block(raw)
        .ok()
        .map(|block| block.header_len + block.declared_len)
}
