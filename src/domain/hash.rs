use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of random bytes behind every hash (256 bits of entropy).
pub const HASH_BYTES: usize = 32;
/// Length of the base64url (unpadded) encoding of [`HASH_BYTES`].
pub const HASH_LEN: usize = 43;

/// Opaque public identifier of a payment request.
///
/// Generated from the operating system CSPRNG and encoded as unpadded base64url,
/// so it is safe to embed in a URL path segment. It never carries any storage key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentRequestHash(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a payment request hash")]
pub struct InvalidHash(pub String);

impl PaymentRequestHash {
    pub fn generate() -> Self {
        let mut bytes = [0u8; HASH_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PaymentRequestHash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == HASH_LEN
            && URL_SAFE_NO_PAD
                .decode(s)
                .is_ok_and(|bytes| bytes.len() == HASH_BYTES);
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidHash(s.to_string()))
        }
    }
}

impl TryFrom<String> for PaymentRequestHash {
    type Error = InvalidHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentRequestHash> for String {
    fn from(hash: PaymentRequestHash) -> Self {
        hash.0
    }
}

impl fmt::Display for PaymentRequestHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
