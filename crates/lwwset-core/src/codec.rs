//! Binary encoding of a set, shared by gossip payloads and stored snapshots.
//!
//! ```text
//! block   := snappy_raw(payload)
//! payload := count:uvarint entry*count
//! entry   := key_len:uvarint key:bytes add:zigzag_varint del:zigzag_varint
//! ```
//!
//! Keys are raw bytes. Entries are written in ascending key order so equal
//! states always produce equal bytes; the decoder accepts any order but
//! refuses a key that appears twice. The snappy block header carries the payload length; the entry
//! count lives inside the payload. `{"A": (10, 50)}` encodes to
//! `05 10 01 01 41 14 64`.

use crate::entry::LWWTime;
use crate::error::{CodecError, Result};
use crate::state::LWWState;

// ---------------------------------------------------------------------------
// Varint helpers
// ---------------------------------------------------------------------------

/// Longest LEB128 encoding of a u64.
const MAX_VARINT_LEN: usize = 10;

/// Upper bound on how much a snappy block can expand per input byte.
const MAX_EXPANSION: usize = 64;

/// Encode an unsigned 64-bit value as LEB128.
pub(crate) fn encode_varint(value: u64, buf: &mut Vec<u8>) {
    let mut v = value;
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Decode a LEB128 varint from the front of `data`, returning the value and
/// the number of bytes consumed.
pub(crate) fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == MAX_VARINT_LEN || (i == MAX_VARINT_LEN - 1 && byte > 1) {
            return Err(CodecError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CodecError::UnexpectedEof)
}

/// Zigzag-encode a signed value so small magnitudes stay short.
#[inline]
pub(crate) const fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub(crate) const fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Cursor over a decompressed payload.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn varint(&mut self) -> Result<u64> {
        let (value, used) = decode_varint(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    fn timestamp(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.varint()?))
    }

    fn bytes(&mut self, len: u64) -> Result<&'a [u8]> {
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof)?;
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl LWWState {
    /// Encode the state as a snappy-compressed block.
    ///
    /// Fails only when the payload exceeds the snappy block limit (about 4 GiB).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = self.encode_payload();
        Ok(snap::raw::Encoder::new().compress_vec(&payload)?)
    }

    /// The uncompressed payload.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_VARINT_LEN + self.len() * 24);
        encode_varint(self.len() as u64, &mut buf);
        for (key, time) in self {
            encode_varint(key.len() as u64, &mut buf);
            buf.extend_from_slice(key);
            encode_varint(zigzag_encode(time.add_time), &mut buf);
            encode_varint(zigzag_encode(time.del_time), &mut buf);
        }
        buf
    }

    /// Decode a block produced by [`LWWState::encode`].
    pub fn decode(bytes: &[u8]) -> Result<LWWState> {
        let declared = snap::raw::decompress_len(bytes)?;
        if declared > bytes.len().saturating_mul(MAX_EXPANSION) {
            return Err(CodecError::ImplausibleLength {
                declared,
                input: bytes.len(),
            });
        }
        let payload = snap::raw::Decoder::new().decompress_vec(bytes)?;
        Self::decode_payload(&payload)
    }

    /// Decode an uncompressed payload.
    pub fn decode_payload(payload: &[u8]) -> Result<LWWState> {
        let mut reader = Reader::new(payload);
        let count = reader.varint()?;

        let mut state = LWWState::new();
        for _ in 0..count {
            let key_len = reader.varint()?;
            let key = reader.bytes(key_len)?;
            let add_time = reader.timestamp()?;
            let del_time = reader.timestamp()?;

            if let Some(negative) = [add_time, del_time].into_iter().find(|t| *t < 0) {
                return Err(CodecError::NegativeTimestamp(negative, key.to_vec()));
            }
            if state.insert(key, LWWTime::new(add_time, del_time)).is_some() {
                return Err(CodecError::DuplicateKey(key.to_vec()));
            }
        }

        match reader.remaining() {
            0 => Ok(state),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress(payload: &[u8]) -> Vec<u8> {
        snap::raw::Encoder::new().compress_vec(payload).unwrap()
    }

    #[test]
    fn test_golden_single_entry() {
        let state: LWWState = [("A", LWWTime::new(10, 50))].into_iter().collect();

        assert_eq!(state.encode_payload(), vec![0x01, 0x01, 0x41, 0x14, 0x64]);

        let enc = state.encode().unwrap();
        assert_eq!(enc, vec![0x05, 0x10, 0x01, 0x01, 0x41, 0x14, 0x64]);
        assert_eq!(LWWState::decode(&enc).unwrap(), state);
    }

    #[test]
    fn test_empty_state() {
        let enc = LWWState::new().encode().unwrap();
        assert_eq!(enc, vec![0x01, 0x00, 0x00]);
        assert!(LWWState::decode(&enc).unwrap().is_empty());
    }

    #[test]
    fn test_entries_written_in_key_order() {
        let state: LWWState = [("b", LWWTime::new(1, 0)), ("a", LWWTime::new(2, 0))]
            .into_iter()
            .collect();

        let payload = state.encode_payload();
        assert_eq!(payload, vec![0x02, 0x01, b'a', 0x04, 0x00, 0x01, b'b', 0x02, 0x00]);
    }

    #[test]
    fn test_varint_boundaries() {
        for n in [0u64, 1, 127, 128, 300, u64::from(u32::MAX), u64::MAX] {
            let mut buf = Vec::new();
            encode_varint(n, &mut buf);
            assert!(buf.len() <= MAX_VARINT_LEN);
            let (decoded, used) = decode_varint(&buf).unwrap();
            assert_eq!(decoded, n);
            assert_eq!(used, buf.len());
        }
    }

    #[test]
    fn test_varint_rejects_overlong() {
        let overlong = [0xFF; 11];
        assert!(matches!(decode_varint(&overlong), Err(CodecError::VarintOverflow)));

        // Ten bytes whose last byte would shift bits past 64.
        let mut too_big = [0xFF; 10];
        too_big[9] = 0x02;
        assert!(matches!(decode_varint(&too_big), Err(CodecError::VarintOverflow)));
    }

    #[test]
    fn test_zigzag_small_magnitudes() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(50), 100);
        for n in [i64::MIN, -1000, 0, 10, i64::MAX] {
            assert_eq!(zigzag_decode(zigzag_encode(n)), n);
        }
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let enc = [("key", LWWTime::new(10, 50))]
            .into_iter()
            .collect::<LWWState>()
            .encode()
            .unwrap();

        for len in 0..enc.len() {
            assert!(LWWState::decode(&enc[..len]).is_err(), "prefix of {len} bytes decoded");
        }
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        // Claims two entries, carries one.
        let block = compress(&[0x02, 0x01, 0x41, 0x14, 0x64]);
        assert!(matches!(LWWState::decode(&block), Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let block = compress(&[0x01, 0x01, 0x41, 0x14, 0x64, 0xAA]);
        assert!(matches!(LWWState::decode(&block), Err(CodecError::TrailingBytes(1))));
    }

    #[test]
    fn test_decode_accepts_binary_key() {
        let block = compress(&[0x01, 0x01, 0xFF, 0x14, 0x64]);
        let state = LWWState::decode(&block).unwrap();

        assert_eq!(state.get([0xFFu8]), Some(LWWTime::new(10, 50)));
        assert_eq!(state.encode().unwrap(), block);
    }

    #[test]
    fn test_decode_rejects_negative_timestamp() {
        let block = compress(&[0x01, 0x01, 0x41, 0x01, 0x00]);
        assert!(matches!(
            LWWState::decode(&block),
            Err(CodecError::NegativeTimestamp(-1, _))
        ));
    }

    #[test]
    fn test_decode_rejects_duplicate_keys() {
        let duplicate = compress(&[0x02, 0x01, b'a', 0x02, 0x00, 0x01, b'a', 0x04, 0x00]);
        assert!(matches!(
            LWWState::decode(&duplicate),
            Err(CodecError::DuplicateKey(key)) if key == b"a"
        ));
    }

    #[test]
    fn test_decode_accepts_keys_in_any_order() {
        let reversed = compress(&[0x02, 0x01, b'b', 0x02, 0x00, 0x01, b'a', 0x04, 0x00]);
        let state = LWWState::decode(&reversed).unwrap();

        let expected: LWWState = [("a", LWWTime::new(2, 0)), ("b", LWWTime::new(1, 0))]
            .into_iter()
            .collect();
        assert_eq!(state, expected);

        // Re-encoding restores ascending order.
        assert_eq!(
            state.encode_payload(),
            vec![0x02, 0x01, b'a', 0x04, 0x00, 0x01, b'b', 0x02, 0x00]
        );
    }

    #[test]
    fn test_decode_rejects_implausible_length_header() {
        // Header claims 2 MiB from a four-byte block.
        let block = [0x80, 0x80, 0x80, 0x01];
        assert!(matches!(
            LWWState::decode(&block),
            Err(CodecError::ImplausibleLength { input: 4, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage_block() {
        assert!(matches!(
            LWWState::decode(&[0xFF, 0xFF, 0xFF]),
            Err(CodecError::Compression(_))
        ));
    }

    #[test]
    fn test_compresses_shared_key_prefixes() {
        let base = 1_700_000_000_000_000_000i64;
        let state: LWWState = (0..1000)
            .map(|i| (format!("presence/room-42/user-{i:05}"), LWWTime::new(base + i, 0)))
            .collect();

        // Fixed-width layout: 8-byte length, key, two 8-byte timestamps.
        let baseline: usize = state.keys().map(|k| 8 + k.len() + 16).sum();
        let enc = state.encode().unwrap();

        assert!(enc.len() * 2 < baseline, "{} bytes vs {baseline} baseline", enc.len());
        assert_eq!(LWWState::decode(&enc).unwrap(), state);
    }
}
