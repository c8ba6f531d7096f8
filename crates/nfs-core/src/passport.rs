//! Fobs: named signing identities.
//!
//! A fob is a keypair whose name is the SHA-512 of its public key. The kinds
//! (`Maid`, `Pmid`, `Anmpid`, `Mpid`) are type-level so a registration cannot
//! confuse which side of a binding a key belongs to.

use crate::Identity;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Kind of fob.
pub trait FobKind: 'static {
    const LABEL: &'static str;
}

macro_rules! fob_kinds {
    ($($kind:ident => $label:literal),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $kind;

            impl FobKind for $kind {
                const LABEL: &'static str = $label;
            }
        )*
    };
}

fob_kinds!(
    Maid => "maid",
    Pmid => "pmid",
    Anmpid => "anmpid",
    Mpid => "mpid",
);

/// Name of a fob of kind `K`.
pub struct FobName<K> {
    value: Identity,
    kind: PhantomData<fn() -> K>,
}

impl<K> FobName<K> {
    /// Wrap a raw identity as the name of a `K` fob.
    pub fn new(value: Identity) -> Self {
        Self {
            value,
            kind: PhantomData,
        }
    }

    pub fn value(&self) -> &Identity {
        &self.value
    }
}

impl<K> Clone for FobName<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for FobName<K> {}

impl<K> PartialEq for FobName<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K> Eq for FobName<K> {}

impl<K: FobKind> fmt::Debug for FobName<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}..)", K::LABEL, self.value.short())
    }
}

/// Private half of a fob.
pub struct Fob<K> {
    signing_key: SigningKey,
    name: FobName<K>,
}

impl<K: FobKind> Fob<K> {
    /// Generate a fresh fob from the OS entropy source.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Wrap an existing key. The name is derived from its public half.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let name = FobName::new(Identity::hash_of(signing_key.verifying_key().as_bytes()));
        Self { signing_key, name }
    }

    pub fn name(&self) -> FobName<K> {
        self.name
    }

    /// The shareable public half.
    pub fn public_fob(&self) -> PublicFob<K> {
        PublicFob {
            verifying_key: self.signing_key.verifying_key(),
            name: self.name,
        }
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl<K: FobKind> fmt::Debug for Fob<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fob")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Public half of a fob.
pub struct PublicFob<K> {
    verifying_key: VerifyingKey,
    name: FobName<K>,
}

impl<K: FobKind> PublicFob<K> {
    pub fn name(&self) -> FobName<K> {
        self.name
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

impl<K> Clone for PublicFob<K> {
    fn clone(&self) -> Self {
        Self {
            verifying_key: self.verifying_key,
            name: self.name,
        }
    }
}

impl<K: FobKind> fmt::Debug for PublicFob<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicFob")
            .field("name", &self.name)
            .finish()
    }
}

/// Opaque signature bytes.
///
/// Kept as a byte string so a present-but-malformed signature survives
/// decoding and is rejected at verification time instead.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wrap signature bytes as received, without checking their length.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = &self.0[..self.0.len().min(8)];
        write!(f, "Signature({})", hex::encode(prefix))
    }
}

/// Sign `data` with the private half of `fob`.
pub fn sign<K: FobKind>(data: &[u8], fob: &Fob<K>) -> Signature {
    Signature(fob.signing_key().sign(data).to_bytes().to_vec())
}

/// Verify a signature. Malformed signature bytes verify as false.
pub fn check_signature<K: FobKind>(
    data: &[u8],
    signature: &Signature,
    fob: &PublicFob<K>,
) -> bool {
    let Ok(bytes) = <[u8; 64]>::try_from(signature.as_bytes()) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&bytes);
    fob.verifying_key().verify(data, &signature).is_ok()
}
