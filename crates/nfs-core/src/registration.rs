//! Fob-pair registration.
//!
//! A registration binds an outer fob to an inner fob. The inner fob signs the
//! details `(outer name, inner name, unregister)`; the outer fob signs those
//! details together with the inner signature. Verifying the outer signature
//! therefore also attests to the inner one, so validation runs inner first.
//!
//! Serialised form, each level a separately encoded byte string:
//!
//! ```text
//! registration   = { serialised_signed_details, outer_fob_signature }
//! signed_details = { serialised_details, inner_fob_signature }
//! details        = { outer_fob_name, inner_fob_name, unregister }
//! ```

use crate::codec::{decode, encode};
use crate::passport::{Anmpid, FobKind, Maid, Mpid, Pmid, check_signature, sign};
use crate::{Fob, FobName, Identity, NfsError, PublicFob, Result, Signature};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Details {
    outer_fob_name: Vec<u8>,
    inner_fob_name: Vec<u8>,
    unregister: bool,
}

#[derive(Serialize, Deserialize)]
struct SignedDetails {
    serialised_details: Vec<u8>,
    inner_fob_signature: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct RegistrationWire {
    serialised_signed_details: Vec<u8>,
    outer_fob_signature: Vec<u8>,
}

fn serialise_details(outer: &Identity, inner: &Identity, unregister: bool) -> Result<Vec<u8>> {
    encode(&Details {
        outer_fob_name: outer.as_bytes().to_vec(),
        inner_fob_name: inner.as_bytes().to_vec(),
        unregister,
    })
}

fn serialise_signed_details(details: Vec<u8>, inner_sig: &Signature) -> Result<Vec<u8>> {
    encode(&SignedDetails {
        serialised_details: details,
        inner_fob_signature: inner_sig.as_bytes().to_vec(),
    })
}

/// Signed binding between an outer and an inner fob.
pub struct FobPairRegistration<Outer, Inner> {
    outer_fob_name: FobName<Outer>,
    inner_fob_name: FobName<Inner>,
    unregister: bool,
    outer_fob_signature: Signature,
    inner_fob_signature: Signature,
}

impl<Outer: FobKind, Inner: FobKind> FobPairRegistration<Outer, Inner> {
    /// Sign a fresh registration with both fobs.
    pub fn new(outer_fob: &Fob<Outer>, inner_fob: &Fob<Inner>, unregister: bool) -> Result<Self> {
        let outer_fob_name = outer_fob.name();
        let inner_fob_name = inner_fob.name();
        let (outer, inner) = (outer_fob_name.value(), inner_fob_name.value());
        let details = serialise_details(outer, inner, unregister)?;
        let inner_fob_signature = sign(&details, inner_fob);
        let signed_details = serialise_signed_details(details, &inner_fob_signature)?;
        let outer_fob_signature = sign(&signed_details, outer_fob);
        Ok(Self {
            outer_fob_name,
            inner_fob_name,
            unregister,
            outer_fob_signature,
            inner_fob_signature,
        })
    }

    /// Decode a serialised registration. The result still has to be validated.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_nested(bytes).inspect_err(|e| {
            tracing::error!(error = %e, "failed to parse fob pair registration");
        })
    }

    fn parse_nested(bytes: &[u8]) -> Result<Self> {
        let wire: RegistrationWire = decode(bytes)?;
        let signed_details: SignedDetails = decode(&wire.serialised_signed_details)?;
        let details: Details = decode(&signed_details.serialised_details)?;
        let name = |bytes: &[u8]| Identity::from_slice(bytes).map_err(NfsError::parsing);
        Ok(Self {
            outer_fob_name: FobName::new(name(&details.outer_fob_name)?),
            inner_fob_name: FobName::new(name(&details.inner_fob_name)?),
            unregister: details.unregister,
            outer_fob_signature: Signature::from_bytes(wire.outer_fob_signature),
            inner_fob_signature: Signature::from_bytes(signed_details.inner_fob_signature),
        })
    }

    /// Encode the three nested levels.
    pub fn serialise(&self) -> Result<Vec<u8>> {
        let details = serialise_details(
            self.outer_fob_name.value(),
            self.inner_fob_name.value(),
            self.unregister,
        )?;
        let signed_details = serialise_signed_details(details, &self.inner_fob_signature)?;
        encode(&RegistrationWire {
            serialised_signed_details: signed_details,
            outer_fob_signature: self.outer_fob_signature.as_bytes().to_vec(),
        })
    }

    /// Check both signatures, inner first.
    pub fn validate(
        &self,
        public_outer_fob: &PublicFob<Outer>,
        public_inner_fob: &PublicFob<Inner>,
    ) -> bool {
        let Ok(details) = serialise_details(
            self.outer_fob_name.value(),
            self.inner_fob_name.value(),
            self.unregister,
        ) else {
            return false;
        };
        if !check_signature(&details, &self.inner_fob_signature, public_inner_fob) {
            tracing::warn!(
                inner = ?self.inner_fob_name,
                "failed to validate {} signature",
                Inner::LABEL
            );
            return false;
        }
        let Ok(signed) = serialise_signed_details(details, &self.inner_fob_signature) else {
            return false;
        };
        if !check_signature(&signed, &self.outer_fob_signature, public_outer_fob) {
            tracing::warn!(
                outer = ?self.outer_fob_name,
                "failed to validate {} signature",
                Outer::LABEL
            );
            return false;
        }
        true
    }

    /// Whether this removes the binding rather than adding it.
    pub fn unregister(&self) -> bool {
        self.unregister
    }

    pub fn outer_fob_name(&self) -> FobName<Outer> {
        self.outer_fob_name
    }

    pub fn inner_fob_name(&self) -> FobName<Inner> {
        self.inner_fob_name
    }

    pub fn outer_fob_signature(&self) -> &Signature {
        &self.outer_fob_signature
    }

    pub fn inner_fob_signature(&self) -> &Signature {
        &self.inner_fob_signature
    }
}

impl<Outer: FobKind, Inner: FobKind> std::fmt::Debug for FobPairRegistration<Outer, Inner> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FobPairRegistration")
            .field("outer_fob_name", &self.outer_fob_name)
            .field("inner_fob_name", &self.inner_fob_name)
            .field("unregister", &self.unregister)
            .finish_non_exhaustive()
    }
}

macro_rules! registration {
    (
        $(#[$doc:meta])*
        $name:ident<$outer:ty, $inner:ty> { $outer_name:ident, $inner_name:ident }
    ) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name(FobPairRegistration<$outer, $inner>);

        impl $name {
            pub fn new(
                outer: &Fob<$outer>,
                inner: &Fob<$inner>,
                unregister: bool,
            ) -> Result<Self> {
                FobPairRegistration::new(outer, inner, unregister).map(Self)
            }

            pub fn parse(bytes: &[u8]) -> Result<Self> {
                FobPairRegistration::parse(bytes).map(Self)
            }

            pub fn serialise(&self) -> Result<Vec<u8>> {
                self.0.serialise()
            }

            pub fn validate(&self, outer: &PublicFob<$outer>, inner: &PublicFob<$inner>) -> bool {
                self.0.validate(outer, inner)
            }

            pub fn unregister(&self) -> bool {
                self.0.unregister()
            }

            pub fn $outer_name(&self) -> FobName<$outer> {
                self.0.outer_fob_name()
            }

            pub fn $inner_name(&self) -> FobName<$inner> {
                self.0.inner_fob_name()
            }
        }
    };
}

registration!(
    /// Binds a storage node's PMID to the MAID of the client that runs it.
    PmidRegistration<Maid, Pmid> { maid_name, pmid_name }
);

registration!(
    /// Binds a messaging MPID to the anonymous ANMPID that owns it.
    MpidRegistration<Anmpid, Mpid> { anmpid_name, mpid_name }
);
