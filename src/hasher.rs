use sha2::{Digest, Sha256};

/// Hex SHA-256 of the raw encoded bytes of an asset.
pub fn hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
