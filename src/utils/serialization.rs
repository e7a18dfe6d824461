use bincode::error::{DecodeError, EncodeError};

/// Largest encoded record accepted by [`serialize`] and [`deserialize`].
///
/// The same bound applies in both directions, so anything that was written
/// can be read back.
pub const MAX_RECORD_BYTES: usize = u32::MAX as usize;

/// Get the bincode configuration
fn get_config() -> impl bincode::config::Config {
    // Limit allocation to prevent memory exhaustion on corrupt data
    bincode::config::legacy().with_limit::<{ MAX_RECORD_BYTES }>()
}

/// Rejects an encoded record that [`deserialize`] would refuse.
fn check_encoded_len(len: usize) -> Result<(), EncodeError> {
    if len > MAX_RECORD_BYTES {
        return Err(EncodeError::OtherString(format!(
            "encoded record is {len} bytes, limit is {MAX_RECORD_BYTES}"
        )));
    }
    Ok(())
}

/// Serialize data using bincode v2.0 with serde
///
/// # Errors
///
/// Returns an error if serialization fails or the encoded record exceeds
/// [`MAX_RECORD_BYTES`]
pub fn serialize<T: serde::Serialize>(data: &T) -> Result<Vec<u8>, EncodeError> {
    let bytes = bincode::serde::encode_to_vec(data, get_config())?;
    check_encoded_len(bytes.len())?;
    Ok(bytes)
}

/// Deserialize data using bincode v2.0 with serde
///
/// Trailing bytes after the decoded value are rejected.
///
/// # Errors
///
/// Returns an error if:
/// - Data is truncated or malformed
/// - Data was written for an incompatible type
pub fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let (result, bytes_read) = bincode::serde::decode_from_slice(bytes, get_config())?;
    if bytes_read != bytes.len() {
        return Err(DecodeError::OtherString(format!(
            "{} trailing bytes after record",
            bytes.len() - bytes_read
        )));
    }
    Ok(result)
}
