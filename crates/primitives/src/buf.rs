use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseBufError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// 32-byte buf, used for field elements, tree leaves and hashes.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, BorshSerialize, BorshDeserialize, Arbitrary,
)]
pub struct Buf32([u8; 32]);
impl_buf!(Buf32, 32);

impl Buf32 {
    /// Encodes a small integer big-endian into the low bytes, the way a field
    /// element holding that integer would be laid out.
    pub fn from_u64(v: u64) -> Self {
        let mut buf = [0; 32];
        buf[24..].copy_from_slice(&v.to_be_bytes());
        Self(buf)
    }
}
