use crate::error::DecodeError;
use flate2::read::GzDecoder;
use std::io::Read;

/// Decompress a gzip+tar buffer into the concatenated text of all its entries
///
/// Entries are read in archive order and their bytes appended without separators, so a
/// multi-entry archive merges into one payload. Invalid UTF-8 is replaced rather than
/// rejected.
pub fn decode_tgz(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut content = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        entry.read_to_end(&mut content)?;
    }

    Ok(String::from_utf8_lossy(&content).into_owned())
}
