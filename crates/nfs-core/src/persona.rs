//! Personas and routing address types.
//!
//! A persona is the logical role a node plays. Wrappers fix their source and
//! destination personas at compile time through the zero-sized tags below;
//! the routing address types name who concretely sent or should receive.

use crate::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network address of a node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Identity);

impl NodeId {
    /// Address of the node named `identity`.
    pub const fn new(identity: Identity) -> Self {
        Self(identity)
    }

    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

impl From<Identity> for NodeId {
    fn from(identity: Identity) -> Self {
        Self(identity)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}..)", self.0.short())
    }
}

/// Logical role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Persona {
    ClientMaid,
    ClientMpid,
    MaidNode,
    MpidNode,
    DataGetter,
    MaidManager,
    DataManager,
    PmidManager,
    PmidNode,
    MpidManager,
    VersionHandler,
    CacheHandler,
}

/// A persona together with the node currently acting in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId {
    pub persona: Persona,
    pub node_id: NodeId,
}

impl PersonaId {
    /// Pair a persona with the node acting in it.
    pub fn new(persona: Persona, node_id: NodeId) -> Self {
        Self { persona, node_id }
    }
}

/// Compile-time persona marker.
pub trait PersonaTag: 'static {
    const PERSONA: Persona;
}

macro_rules! persona_tags {
    ($($tag:ident),* $(,)?) => {
        $(
            #[doc = concat!("Marker for [`Persona::", stringify!($tag), "`].")]
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $tag;

            impl PersonaTag for $tag {
                const PERSONA: Persona = Persona::$tag;
            }
        )*
    };
}

/// Zero-sized persona markers used as wrapper type parameters.
pub mod tags {
    use super::{Persona, PersonaTag};

    persona_tags!(
        ClientMaid,
        ClientMpid,
        MaidNode,
        MpidNode,
        DataGetter,
        MaidManager,
        DataManager,
        PmidManager,
        PmidNode,
        MpidManager,
        VersionHandler,
        CacheHandler,
    );
}

/// A message sent by one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SingleSource(pub NodeId);

/// A message sent by one member on behalf of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupSource {
    pub group_id: GroupId,
    pub sender_id: SingleId,
}

/// A message addressed to one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SingleId(pub NodeId);

/// A message addressed to the group closest to a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub NodeId);
