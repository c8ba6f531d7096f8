//! Core types for the NFS message layer.
//!
//! This crate provides the wire-level primitives: identities and personas,
//! the envelope codec, typed message wrappers, the outer signed envelope and
//! fob-pair registration. Request correlation and dispatch live in
//! `nfs-client`.

pub mod action;
pub mod codec;
mod data;
mod error;
mod generic_message;
mod identity;
mod ids;
mod message;
pub mod passport;
pub mod persona;
mod registration;
pub mod routes;
mod wrapper;

pub use action::{ActionTag, MessageAction};
pub use codec::TypeErasedMessageWrapper;
pub use data::{
    Data, DataName, DataNameAndContentOrReturnCode, DataNameAndVersion, DataNameVariant,
    DataTagValue, ImmutableData, MutableData, VersionName, VersionsOrReturnCode,
};
pub use error::{ErrorCode, NfsError, Result};
pub use generic_message::{GenericAction, GenericMessage, MessageToMpah, MpahAction};
pub use identity::{IDENTITY_SIZE, Identity, IdentityParseError};
pub use ids::{MessageId, TaskId};
pub use message::{Message, MessageCategory, MessageList};
pub use passport::{Fob, FobName, PublicFob, Signature};
pub use persona::{
    GroupId, GroupSource, NodeId, Persona, PersonaId, PersonaTag, SingleId, SingleSource,
};
pub use registration::{FobPairRegistration, MpidRegistration, PmidRegistration};
pub use wrapper::{Contents, MessageWrapper};
