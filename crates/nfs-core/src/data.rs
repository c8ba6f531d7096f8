//! Stored data types and the contents of get requests and responses.

use crate::{Contents, ErrorCode, Identity, NfsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Tag of a stored data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataTagValue {
    ImmutableData,
    MutableData,
}

/// A data type that can be fetched by name.
pub trait Data: Sized + Send + 'static {
    const TAG: DataTagValue;

    /// Name the data is stored under.
    fn name(&self) -> DataName<Self>;

    /// Rebuild from content returned by a holder, checking it against `name`.
    fn parse(name: &DataName<Self>, content: &[u8]) -> Result<Self>;

    /// Content as handed to holders.
    fn content(&self) -> &[u8];
}

/// Typed name of a piece of data.
pub struct DataName<D> {
    value: Identity,
    data: PhantomData<fn() -> D>,
}

impl<D: Data> DataName<D> {
    /// Wrap a raw identity.
    pub fn new(value: Identity) -> Self {
        Self {
            value,
            data: PhantomData,
        }
    }

    pub fn value(&self) -> &Identity {
        &self.value
    }

    /// Erase the data type, keeping its tag.
    pub fn variant(&self) -> DataNameVariant {
        DataNameVariant {
            tag: D::TAG,
            name: self.value,
        }
    }
}

impl<D> Clone for DataName<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for DataName<D> {}

impl<D> PartialEq for DataName<D> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<D> Eq for DataName<D> {}

impl<D: Data> fmt::Debug for DataName<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({}..)", D::TAG, self.value.short())
    }
}

/// Type-erased data name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataNameVariant {
    pub tag: DataTagValue,
    pub name: Identity,
}

impl Contents for DataNameVariant {}

/// Content-addressed chunk: the name is the SHA-512 of the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmutableData {
    name: Identity,
    content: Vec<u8>,
}

impl ImmutableData {
    /// Hash `content` to derive the name.
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            name: Identity::hash_of(&content),
            content,
        }
    }
}

impl Data for ImmutableData {
    const TAG: DataTagValue = DataTagValue::ImmutableData;

    fn name(&self) -> DataName<Self> {
        DataName::new(self.name)
    }

    fn parse(name: &DataName<Self>, content: &[u8]) -> Result<Self> {
        let data = Self::new(content.to_vec());
        if data.name != *name.value() {
            return Err(NfsError::DataValidation(format!(
                "content does not hash to {}",
                name.value().short()
            )));
        }
        Ok(data)
    }

    fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Owner-named data whose value can change between versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutableData {
    name: Identity,
    value: Vec<u8>,
}

impl MutableData {
    /// Create a value under an owner-chosen name.
    pub fn new(name: Identity, value: Vec<u8>) -> Self {
        Self { name, value }
    }
}

impl Data for MutableData {
    const TAG: DataTagValue = DataTagValue::MutableData;

    fn name(&self) -> DataName<Self> {
        DataName::new(self.name)
    }

    fn parse(name: &DataName<Self>, content: &[u8]) -> Result<Self> {
        Ok(Self::new(*name.value(), content.to_vec()))
    }

    fn content(&self) -> &[u8] {
        &self.value
    }
}

/// Answer of one holder to a get request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataNameAndContentOrReturnCode {
    Content {
        name: DataNameVariant,
        content: Vec<u8>,
    },
    ReturnCode {
        name: DataNameVariant,
        code: ErrorCode,
    },
}

impl DataNameAndContentOrReturnCode {
    pub fn name(&self) -> &DataNameVariant {
        match self {
            Self::Content { name, .. } | Self::ReturnCode { name, .. } => name,
        }
    }
}

impl Contents for DataNameAndContentOrReturnCode {}

/// One version of a mutable data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionName {
    pub index: u64,
    pub id: Identity,
}

/// A data name plus the version a branch request starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataNameAndVersion {
    pub name: DataNameVariant,
    pub version: VersionName,
}

impl Contents for DataNameAndVersion {}

/// Answer to a get-versions or get-branch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionsOrReturnCode {
    Versions {
        name: DataNameVariant,
        versions: Vec<VersionName>,
    },
    ReturnCode {
        name: DataNameVariant,
        code: ErrorCode,
    },
}

impl Contents for VersionsOrReturnCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immutable_data_checks_its_hash() {
        let chunk = ImmutableData::new(b"payload".to_vec());
        let name = chunk.name();
        assert_eq!(ImmutableData::parse(&name, b"payload").unwrap(), chunk);
        assert!(matches!(
            ImmutableData::parse(&name, b"tampered"),
            Err(NfsError::DataValidation(_))
        ));
    }

    #[test]
    fn mutable_data_takes_any_value() {
        let name = DataName::<MutableData>::new(Identity::hash_of(b"owner"));
        let data = MutableData::parse(&name, b"v2").unwrap();
        assert_eq!(data.content(), b"v2");
        assert_eq!(data.name(), name);
    }

    #[test]
    fn variant_carries_tag() {
        let chunk = ImmutableData::new(b"x".to_vec());
        let variant = chunk.name().variant();
        assert_eq!(variant.tag, DataTagValue::ImmutableData);
        assert_eq!(variant.name, *chunk.name().value());
    }

    #[test]
    fn response_contents_expose_name() {
        let name = ImmutableData::new(b"x".to_vec()).name().variant();
        let miss = DataNameAndContentOrReturnCode::ReturnCode {
            name,
            code: ErrorCode::NoSuchElement,
        };
        assert_eq!(miss.name(), &name);
        let parsed = DataNameAndContentOrReturnCode::parse(&miss.serialise().unwrap()).unwrap();
        assert_eq!(parsed, miss);
    }
}
