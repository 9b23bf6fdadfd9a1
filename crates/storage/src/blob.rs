//! Safe embedding blob format.
//!
//! Legacy rows were written with Python's `pickle.dumps`, which on read back
//! can deserialize into arbitrary objects — a `published.embedding` blob is
//! attacker-reachable the moment anything upstream of the database is
//! compromised. The format here never calls into a general deserializer: a
//! blob is either our own self-describing `rmp-serde` encoding of `Vec<f32>`,
//! tagged with a magic prefix, or it is read through [`restricted_pickle`],
//! a decoder that recognizes only the handful of opcodes a flat float list
//! can legally produce and refuses everything else outright.

use crate::error::StorageError;

/// Prefix tag identifying a blob written by this crate's safe encoder.
const MAGIC: &[u8; 4] = b"PSE1";

/// Serialize an embedding into the safe, self-describing blob format.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAGIC.len() + vector.len() * 4 + 8);
    out.extend_from_slice(MAGIC);
    rmp_serde::encode::write(&mut out, vector).expect("Vec<f32> always serializes");
    out
}

/// Decode an embedding blob written by [`encode_embedding`], or migrate a
/// legacy pickle blob through the restricted opcode decoder.
///
/// Never invokes a general-purpose deserializer: a blob that is neither our
/// tagged format nor a pickle stream composed entirely of allow-listed
/// opcodes is rejected rather than guessed at.
pub fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>, StorageError> {
    if let Some(rest) = blob.strip_prefix(MAGIC.as_slice()) {
        return rmp_serde::from_slice(rest)
            .map_err(|e| StorageError::EmbeddingDecode(e.to_string()));
    }
    restricted_pickle::decode_float_list(blob)
        .map_err(|e| StorageError::UnsafeEmbeddingBlob(e.to_string()))
}

/// Re-encode a legacy blob into the safe format, if it decodes cleanly.
/// Idempotent: re-migrating an already-safe blob is a cheap no-op that
/// returns the input unchanged (well, re-encoded to the identical bytes).
pub fn migrate_blob(blob: &[u8]) -> Result<Vec<u8>, StorageError> {
    let vector = decode_embedding(blob)?;
    Ok(encode_embedding(&vector))
}

pub fn is_legacy_blob(blob: &[u8]) -> bool {
    !blob.starts_with(MAGIC.as_slice())
}

/// A pickle-opcode decoder restricted to exactly what `pickle.dumps(list_of_float)`
/// can produce. Any opcode outside the allow-list (in particular `GLOBAL`/`REDUCE`,
/// the opcodes that let a pickle stream construct and call arbitrary objects)
/// aborts the decode instead of being interpreted.
mod restricted_pickle {
    use std::fmt;

    #[derive(Debug)]
    pub struct RejectedOpcode(pub u8);

    impl fmt::Display for RejectedOpcode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "opcode 0x{:02x} is not in the float-list allow-list", self.0)
        }
    }
    impl std::error::Error for RejectedOpcode {}

    const PROTO: u8 = 0x80;
    const FRAME: u8 = 0x95;
    const EMPTY_LIST: u8 = b']';
    const MARK: u8 = b'(';
    const BINFLOAT: u8 = b'G';
    const BININT: u8 = b'J';
    const BININT1: u8 = b'K';
    const BININT2: u8 = b'M';
    const APPEND: u8 = b'a';
    const APPENDS: u8 = b'e';
    const STOP: u8 = b'.';

    enum Item {
        Float(f32),
        Mark,
    }

    /// Decode a pickle byte stream that is known to encode a flat list of
    /// floats, rejecting the stream the moment it contains any opcode that
    /// isn't needed to build one.
    pub fn decode_float_list(blob: &[u8]) -> Result<Vec<f32>, RejectedOpcode> {
        let mut pos = 0usize;
        let mut stack: Vec<Item> = Vec::new();
        let mut list: Vec<f32> = Vec::new();
        let mut have_list = false;

        while pos < blob.len() {
            let op = blob[pos];
            pos += 1;
            match op {
                PROTO => {
                    pos += 1; // protocol version byte
                }
                FRAME => {
                    pos += 8; // little-endian u64 frame length, payload follows inline
                }
                EMPTY_LIST => {
                    have_list = true;
                }
                MARK => {
                    stack.push(Item::Mark);
                }
                BINFLOAT => {
                    if pos + 8 > blob.len() {
                        return Err(RejectedOpcode(op));
                    }
                    let bytes: [u8; 8] = blob[pos..pos + 8].try_into().unwrap();
                    let value = f64::from_be_bytes(bytes) as f32;
                    pos += 8;
                    stack.push(Item::Float(value));
                }
                BININT => {
                    if pos + 4 > blob.len() {
                        return Err(RejectedOpcode(op));
                    }
                    let bytes: [u8; 4] = blob[pos..pos + 4].try_into().unwrap();
                    let value = i32::from_le_bytes(bytes) as f32;
                    pos += 4;
                    stack.push(Item::Float(value));
                }
                BININT1 => {
                    if pos + 1 > blob.len() {
                        return Err(RejectedOpcode(op));
                    }
                    stack.push(Item::Float(blob[pos] as f32));
                    pos += 1;
                }
                BININT2 => {
                    if pos + 2 > blob.len() {
                        return Err(RejectedOpcode(op));
                    }
                    let bytes: [u8; 2] = blob[pos..pos + 2].try_into().unwrap();
                    stack.push(Item::Float(u16::from_le_bytes(bytes) as f32));
                    pos += 2;
                }
                APPEND => {
                    if let Some(Item::Float(v)) = stack.pop() {
                        list.push(v);
                    } else {
                        return Err(RejectedOpcode(op));
                    }
                }
                APPENDS => {
                    let mut batch = Vec::new();
                    loop {
                        match stack.pop() {
                            Some(Item::Float(v)) => batch.push(v),
                            Some(Item::Mark) => break,
                            None => return Err(RejectedOpcode(op)),
                        }
                    }
                    batch.reverse();
                    list.extend(batch);
                }
                STOP => break,
                other => return Err(RejectedOpcode(other)),
            }
        }

        if !have_list {
            return Err(RejectedOpcode(0));
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_round_trip() {
        let v = vec![0.1f32, -0.2, 3.5, 0.0];
        let blob = encode_embedding(&v);
        let back = decode_embedding(&blob).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn migrate_is_idempotent() {
        let v = vec![1.0f32, 2.0];
        let blob = encode_embedding(&v);
        let migrated_once = migrate_blob(&blob).unwrap();
        let migrated_twice = migrate_blob(&migrated_once).unwrap();
        assert_eq!(migrated_once, migrated_twice);
    }

    #[test]
    fn legacy_pickle_float_list_decodes() {
        // Hand-built protocol-2 pickle for `[1.0, 2.5]`:
        // PROTO 2, EMPTY_LIST, MARK, BINFLOAT(1.0), BINFLOAT(2.5), APPENDS, STOP
        let mut blob = vec![0x80, 0x02, b']', b'('];
        blob.push(b'G');
        blob.extend_from_slice(&1.0f64.to_be_bytes());
        blob.push(b'G');
        blob.extend_from_slice(&2.5f64.to_be_bytes());
        blob.push(b'e');
        blob.push(b'.');

        assert!(is_legacy_blob(&blob));
        let decoded = decode_embedding(&blob).unwrap();
        assert_eq!(decoded, vec![1.0, 2.5]);
    }

    #[test]
    fn legacy_blob_with_global_opcode_is_rejected() {
        // GLOBAL ('c') is the opcode that lets a pickle stream import and
        // call an arbitrary callable — must never be interpreted.
        let blob = vec![0x80, 0x02, b'c', b'o', b's', b'\n', b's', b'y', b's', b'\n'];
        let err = decode_embedding(&blob).unwrap_err();
        assert!(matches!(err, StorageError::UnsafeEmbeddingBlob(_)));
    }

    #[test]
    fn garbage_blob_is_rejected_not_panicked() {
        let blob = vec![0xff, 0x00, 0x01, 0x02];
        let err = decode_embedding(&blob).unwrap_err();
        assert!(matches!(err, StorageError::UnsafeEmbeddingBlob(_)));
    }
}
