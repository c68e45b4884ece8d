use sha1::{Digest, Sha1};

/// Length of a SHA-1 digest in bytes
pub const DIGEST_LEN: usize = 20;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("block does not start with the 0x00 0x02 header")]
    InvalidHeader,
    #[error("block has no zero delimiter after the padding")]
    MissingDelimiter,
    #[error("message is shorter than a SHA-1 digest")]
    TooShort,
    #[error("SHA-1 digest suffix does not match the message")]
    DigestMismatch,
}

/// Remove PKCS#1 v1.5 encryption padding from a decrypted block
///
/// The block is 0x00 || 0x02 || PS || 0x00 || M; returns M
pub fn unpad(block: &[u8]) -> Result<&[u8], Error> {
    if block.len() < 2 || block[..2] != [0x00, 0x02] {
        return Err(Error::InvalidHeader);
    }

    match block[2..].iter().position(|&b| b == 0x00) {
        Some(pos) => Ok(&block[2 + pos + 1..]),
        None => Err(Error::MissingDelimiter),
    }
}

/// Append SHA-1(msg) to msg
pub fn append_digest(msg: &[u8]) -> Vec<u8> {
    let mut res = msg.to_vec();
    res.extend_from_slice(&Sha1::digest(msg));
    res
}

/// Verify and remove a trailing SHA-1 digest
pub fn strip_digest(data: &[u8]) -> Result<&[u8], Error> {
    if data.len() < DIGEST_LEN {
        return Err(Error::TooShort);
    }

    let (msg, digest) = data.split_at(data.len() - DIGEST_LEN);
    if Sha1::digest(msg).as_slice() != digest {
        return Err(Error::DigestMismatch);
    }

    Ok(msg)
}

/// Keep only printable ASCII, for display of recovered plaintexts
pub fn printable(data: &[u8]) -> String {
    data.iter()
        .filter(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
        .map(|&b| b as char)
        .collect()
}
