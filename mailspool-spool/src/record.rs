//! On-disk record format.
//!
//! A record is the 4 byte magic `MSPL`, a format version byte, then the
//! message encoded with bincode (standard configuration).

use mailspool_common::Message;

use crate::error::SerializationError;

const MAGIC: &[u8; 4] = b"MSPL";
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1;

/// Encode a message into a record
///
/// # Errors
/// If the message cannot be serialized
pub fn encode(message: &Message) -> Result<Vec<u8>, SerializationError> {
    let payload = bincode::serde::encode_to_vec(message, bincode::config::standard())?;

    let mut record = Vec::with_capacity(HEADER_LEN + payload.len());
    record.extend_from_slice(MAGIC);
    record.push(VERSION);
    record.extend_from_slice(&payload);

    Ok(record)
}

/// Decode a record produced by [`encode`]
///
/// # Errors
/// If the header is unknown or the payload is truncated or malformed
pub fn decode(record: &[u8]) -> Result<Message, SerializationError> {
    if record.len() < HEADER_LEN {
        return Err(SerializationError::Corrupted(format!(
            "record is {} bytes, shorter than its header",
            record.len()
        )));
    }

    let (header, payload) = record.split_at(HEADER_LEN);
    if &header[..MAGIC.len()] != MAGIC {
        return Err(SerializationError::InvalidFormat(
            "missing record magic".to_string(),
        ));
    }

    let version = header[MAGIC.len()];
    if version != VERSION {
        return Err(SerializationError::InvalidFormat(format!(
            "unsupported record version {version}"
        )));
    }

    let (message, read) =
        bincode::serde::decode_from_slice::<Message, _>(payload, bincode::config::standard())?;

    if read != payload.len() {
        return Err(SerializationError::Corrupted(format!(
            "{} trailing bytes after message",
            payload.len() - read
        )));
    }

    Ok(message)
}
