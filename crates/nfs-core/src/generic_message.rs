//! Untyped client commands.
//!
//! Account-level commands (PMID registration, messaging-account management)
//! are not routed through typed wrappers. They travel as a [`GenericMessage`]
//! addressed to the group managing `name`, inside an outer
//! [`Message`](crate::Message) of category
//! [`GenericMessage`](crate::MessageCategory::GenericMessage).

use crate::codec::{decode, encode};
use crate::{Identity, Message, MessageCategory, NfsError, Persona, PersonaId, Result};
use serde::{Deserialize, Serialize};

/// Command carried by a generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericAction {
    RegisterPmid,
    UnregisterPmid,
    MsgToMpah,
}

/// A command addressed to the persona group responsible for `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericMessage {
    action: GenericAction,
    destination_persona: Persona,
    source: PersonaId,
    name: Identity,
    content: Vec<u8>,
}

impl GenericMessage {
    pub const MESSAGE_CATEGORY: MessageCategory = MessageCategory::GenericMessage;

    pub fn new(
        action: GenericAction,
        destination_persona: Persona,
        source: PersonaId,
        name: Identity,
        content: Vec<u8>,
    ) -> Self {
        Self {
            action,
            destination_persona,
            source,
            name,
            content,
        }
    }

    /// Decode a generic message body.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }

    /// Encode the body. Empty content is an invalid parameter.
    pub fn serialise(&self) -> Result<Vec<u8>> {
        if self.content.is_empty() {
            return Err(NfsError::invalid_parameter("generic message is empty"));
        }
        encode(self)
    }

    /// Serialise into an outer envelope of the generic category.
    pub fn to_message(&self) -> Result<Message> {
        Ok(Message::new(Self::MESSAGE_CATEGORY, self.serialise()?))
    }

    pub fn action(&self) -> GenericAction {
        self.action
    }

    pub fn destination_persona(&self) -> Persona {
        self.destination_persona
    }

    pub fn source(&self) -> &PersonaId {
        &self.source
    }

    pub fn name(&self) -> &Identity {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Command for the MPID account holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MpahAction {
    RegisterMpid,
    UnregisterMpid,
    ClientUp,
    ClientDown,
    GetOfflineMsg,
    AddContact,
    BlockContact,
    MarkSpamContact,
    UnMarkSpamContact,
    RemoveContact,
    GetContactList,
}

/// Payload of a [`GenericAction::MsgToMpah`] generic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToMpah {
    action: MpahAction,
    mpid_name: Identity,
    content: Option<Vec<u8>>,
}

impl MessageToMpah {
    pub fn new(action: MpahAction, mpid_name: Identity) -> Self {
        Self {
            action,
            mpid_name,
            content: None,
        }
    }

    /// Command with an attached payload such as a contact name.
    pub fn with_content(action: MpahAction, mpid_name: Identity, content: Vec<u8>) -> Self {
        Self {
            action,
            mpid_name,
            content: Some(content),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }

    pub fn serialise(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn action(&self) -> MpahAction {
        self.action
    }

    pub fn mpid_name(&self) -> &Identity {
        &self.mpid_name
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeId;

    #[test]
    fn generic_message_in_outer_envelope() {
        let name = Identity::hash_of(b"maid");
        let source = PersonaId::new(Persona::ClientMaid, NodeId::from(Identity::hash_of(b"me")));
        let generic = GenericMessage::new(
            GenericAction::RegisterPmid,
            Persona::MaidManager,
            source,
            name,
            b"registration".to_vec(),
        );
        let bytes = generic.to_message().unwrap().serialise().unwrap();
        let message = Message::parse(&bytes).unwrap();
        assert_eq!(
            message.inner_message_type(),
            MessageCategory::GenericMessage
        );
        let parsed = GenericMessage::parse(message.serialised_inner_message()).unwrap();
        assert_eq!(parsed, generic);
        assert_eq!(parsed.source().persona, Persona::ClientMaid);
    }

    #[test]
    fn empty_content_is_invalid() {
        let source = PersonaId::new(Persona::ClientMpid, NodeId::from(Identity::hash_of(b"me")));
        let generic = GenericMessage::new(
            GenericAction::MsgToMpah,
            Persona::MpidManager,
            source,
            Identity::hash_of(b"mpid"),
            Vec::new(),
        );
        assert!(matches!(
            generic.serialise(),
            Err(NfsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn mpah_content_is_optional() {
        let name = Identity::hash_of(b"mpid");
        let bare = MessageToMpah::new(MpahAction::ClientUp, name);
        let parsed = MessageToMpah::parse(&bare.serialise().unwrap()).unwrap();
        assert_eq!(parsed.content(), None);

        let contact = MessageToMpah::with_content(MpahAction::AddContact, name, b"bob".to_vec());
        let parsed = MessageToMpah::parse(&contact.serialise().unwrap()).unwrap();
        assert_eq!(parsed.content(), Some(&b"bob"[..]));
        assert_eq!(parsed.action(), MpahAction::AddContact);
    }
}
