//! Typed message wrappers.
//!
//! A [`MessageWrapper`] fixes its action, source persona, sender address type,
//! destination persona, receiver address type and contents type at compile
//! time. On the wire it erases to a [`TypeErasedMessageWrapper`]; rebuilding
//! it checks that the erased action and personas match the instantiation.

use crate::codec::{
    self, TypeErasedMessageWrapper, parse_message_wrapper, serialise_message_wrapper,
};
use crate::{
    ActionTag, Message, MessageAction, MessageCategory, MessageId, NfsError, Persona, PersonaTag,
    Result,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Payload carried by a wrapper.
pub trait Contents: Serialize + DeserializeOwned + PartialEq + Send + Sync + 'static {
    fn serialise(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }
}

/// A message id plus one shared, immutable payload.
pub struct MessageWrapper<A, S, Sn, D, Rv, C> {
    action: MessageAction,
    source: Persona,
    destination: Persona,
    message_id: MessageId,
    contents: Option<Arc<C>>,
    _types: PhantomData<fn() -> (A, S, Sn, D, Rv)>,
}

impl<A, S, Sn, D, Rv, C> MessageWrapper<A, S, Sn, D, Rv, C>
where
    A: ActionTag,
    S: PersonaTag,
    D: PersonaTag,
    C: Contents,
{
    fn from_parts(message_id: MessageId, contents: Option<Arc<C>>) -> Self {
        Self {
            action: A::ACTION,
            source: S::PERSONA,
            destination: D::PERSONA,
            message_id,
            contents,
            _types: PhantomData,
        }
    }

    /// Placeholder with a fresh id and no contents. It cannot be serialised.
    pub fn new() -> Self {
        Self::from_parts(MessageId::generate(), None)
    }

    /// New outgoing message with a fresh id.
    pub fn from_contents(contents: C) -> Self {
        Self::from_parts(MessageId::generate(), Some(Arc::new(contents)))
    }

    /// New outgoing message whose id the caller controls.
    pub fn with_id(message_id: MessageId, contents: C) -> Self {
        Self::from_parts(message_id, Some(Arc::new(contents)))
    }

    /// Rebuild from a parsed wire tuple, keeping its message id.
    pub fn from_parsed(parsed: &TypeErasedMessageWrapper) -> Result<Self> {
        if parsed.action != A::ACTION {
            return Err(NfsError::parsing(format_args!(
                "expected action {:?}, got {:?}",
                A::ACTION,
                parsed.action
            )));
        }
        if parsed.source != S::PERSONA {
            return Err(NfsError::parsing(format_args!(
                "expected source {:?}, got {:?}",
                S::PERSONA,
                parsed.source
            )));
        }
        if parsed.destination != D::PERSONA {
            return Err(NfsError::parsing(format_args!(
                "expected destination {:?}, got {:?}",
                D::PERSONA,
                parsed.destination
            )));
        }
        let contents = C::parse(&parsed.payload)?;
        Ok(Self::from_parts(parsed.message_id, Some(Arc::new(contents))))
    }

    /// Decode and check the erased tuple in one step.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::from_parsed(&parse_message_wrapper(bytes)?)
    }

    /// Encode as the erased tuple. A wrapper without contents is an invalid parameter.
    pub fn serialise(&self) -> Result<Vec<u8>> {
        let contents = self
            .contents
            .as_ref()
            .ok_or_else(|| NfsError::invalid_parameter("message wrapper has no contents"))?;
        serialise_message_wrapper(&TypeErasedMessageWrapper {
            action: self.action,
            source: self.source,
            destination: self.destination,
            message_id: self.message_id,
            payload: contents.serialise()?,
        })
    }

    /// Serialise into an outer envelope of category [`MessageCategory::MessageWrapper`].
    pub fn to_message(&self) -> Result<Message> {
        Ok(Message::new(MessageCategory::MessageWrapper, self.serialise()?))
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn contents(&self) -> Option<&C> {
        self.contents.as_deref()
    }

    /// Another handle to the same payload allocation.
    pub fn shared_contents(&self) -> Option<Arc<C>> {
        self.contents.clone()
    }

    pub fn action(&self) -> MessageAction {
        self.action
    }

    pub fn source(&self) -> Persona {
        self.source
    }

    pub fn destination(&self) -> Persona {
        self.destination
    }
}

impl<A, S, Sn, D, Rv, C> Default for MessageWrapper<A, S, Sn, D, Rv, C>
where
    A: ActionTag,
    S: PersonaTag,
    D: PersonaTag,
    C: Contents,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, S, Sn, D, Rv, C> Clone for MessageWrapper<A, S, Sn, D, Rv, C> {
    fn clone(&self) -> Self {
        Self {
            action: self.action,
            source: self.source,
            destination: self.destination,
            message_id: self.message_id,
            contents: self.contents.clone(),
            _types: PhantomData,
        }
    }
}

impl<A, S, Sn, D, Rv, C: PartialEq> PartialEq for MessageWrapper<A, S, Sn, D, Rv, C> {
    fn eq(&self, other: &Self) -> bool {
        tracing::trace!(
            lhs = %self.message_id,
            rhs = %other.message_id,
            "comparing message wrappers"
        );
        if self.message_id != other.message_id {
            tracing::trace!("message id mismatch");
            return false;
        }
        match (&self.contents, &other.contents) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            (None, None) => true,
            _ => {
                tracing::trace!("one of the messages has no contents");
                false
            }
        }
    }
}

impl<A, S, Sn, D, Rv, C: fmt::Debug> fmt::Debug for MessageWrapper<A, S, Sn, D, Rv, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageWrapper")
            .field("action", &self.action)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("message_id", &self.message_id)
            .field("contents", &self.contents)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tags::{GetRequest, GetResponse};
    use crate::persona::tags::{DataGetter, DataManager};
    use crate::{GroupId, GroupSource, SingleId, SingleSource};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl Contents for Note {}

    type Request =
        MessageWrapper<GetRequest, DataGetter, SingleSource, DataManager, GroupId, Note>;
    type Response =
        MessageWrapper<GetResponse, DataManager, GroupSource, DataGetter, SingleId, Note>;

    fn note(text: &str) -> Note {
        Note {
            text: text.to_string(),
        }
    }

    #[test]
    fn fresh_wrapper_survives_the_wire() {
        let request = Request::from_contents(note("hello"));
        let parsed = Request::parse(&request.serialise().unwrap()).unwrap();
        assert_eq!(parsed, request);
        assert_eq!(parsed.message_id(), request.message_id());
    }

    #[test]
    fn rebuilt_wrapper_keeps_the_wire_id() {
        let tuple = TypeErasedMessageWrapper {
            action: MessageAction::GetRequest,
            source: Persona::DataGetter,
            destination: Persona::DataManager,
            message_id: MessageId::new(5),
            payload: note("x").serialise().unwrap(),
        };
        let rebuilt = Request::from_parsed(&tuple).unwrap();
        assert_eq!(rebuilt.message_id(), MessageId::new(5));
        let reparsed = Request::parse(&rebuilt.serialise().unwrap()).unwrap();
        assert_eq!(reparsed, rebuilt);
    }

    #[test]
    fn wrong_action_is_a_parsing_error() {
        let request = Request::from_contents(note("hello"));
        let err = Response::parse(&request.serialise().unwrap()).unwrap_err();
        assert!(matches!(err, NfsError::Parsing(_)));
    }

    #[test]
    fn wrong_destination_is_a_parsing_error() {
        let tuple = TypeErasedMessageWrapper {
            action: MessageAction::GetRequest,
            source: Persona::DataGetter,
            destination: Persona::CacheHandler,
            message_id: MessageId::new(1),
            payload: note("x").serialise().unwrap(),
        };
        assert!(matches!(
            Request::from_parsed(&tuple),
            Err(NfsError::Parsing(_))
        ));
    }

    #[test]
    fn presence_of_contents_must_match() {
        let id = MessageId::new(9);
        let full = Request::with_id(id, note("a"));
        let empty = Request::from_parts(id, None);
        assert_ne!(full, empty);
        assert_ne!(empty, full);
        assert_eq!(empty, empty.clone());
    }

    #[test]
    fn same_id_different_contents_differ() {
        let id = MessageId::new(3);
        assert_ne!(
            Request::with_id(id, note("a")),
            Request::with_id(id, note("b"))
        );
    }

    #[test]
    fn placeholder_cannot_be_serialised() {
        let placeholder = Request::new();
        assert!(placeholder.contents().is_none());
        assert!(matches!(
            placeholder.serialise(),
            Err(NfsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn clones_share_contents() {
        let request = Request::from_contents(note("shared"));
        let copy = request.clone();
        let a = request.shared_contents().unwrap();
        let b = copy.shared_contents().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn fresh_ids_differ() {
        let a = Request::from_contents(note("a"));
        let b = Request::from_contents(note("a"));
        assert_ne!(a.message_id(), b.message_id());
    }

    #[test]
    fn outer_envelope_is_tagged_as_wrapper() {
        let request = Request::from_contents(note("hello"));
        let message = request.to_message().unwrap();
        assert_eq!(
            message.inner_message_type(),
            MessageCategory::MessageWrapper
        );
        let parsed = Request::parse(message.serialised_inner_message()).unwrap();
        assert_eq!(parsed, request);
    }
}
