//! Outer signed envelope.
//!
//! A [`Message`] classifies one serialised inner message with a category tag
//! and optionally carries a signature over it. Whether that signature is
//! valid is for the receiver to decide; the codec only preserves it.

use crate::codec::{decode, encode};
use crate::{NfsError, Result, Signature};
use serde::{Deserialize, Serialize};

/// Category of the inner message, carried as an `i32` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageCategory {
    Data = 1,
    GenericMessage = 2,
    MessageWrapper = 3,
}

impl TryFrom<i32> for MessageCategory {
    type Error = NfsError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::Data),
            2 => Ok(Self::GenericMessage),
            3 => Ok(Self::MessageWrapper),
            other => Err(NfsError::parsing(format_args!(
                "unknown message category {other}"
            ))),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct MessageWire {
    message_type: i32,
    serialised_message: Vec<u8>,
    signature: Option<Vec<u8>>,
}

impl MessageWire {
    fn into_message(self) -> Result<Message> {
        if self.serialised_message.is_empty() {
            return Err(NfsError::parsing("empty inner message"));
        }
        Ok(Message {
            inner_message_type: MessageCategory::try_from(self.message_type)?,
            serialised_inner_message: self.serialised_message,
            signature: self.signature.map(Signature::from_bytes),
        })
    }
}

/// A classified inner message with an optional signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    inner_message_type: MessageCategory,
    serialised_inner_message: Vec<u8>,
    signature: Option<Signature>,
}

impl Message {
    /// Unsigned envelope around an already serialised inner message.
    pub fn new(inner_message_type: MessageCategory, serialised_inner_message: Vec<u8>) -> Self {
        Self {
            inner_message_type,
            serialised_inner_message,
            signature: None,
        }
    }

    /// Envelope carrying a signature over the inner message.
    pub fn signed(
        inner_message_type: MessageCategory,
        serialised_inner_message: Vec<u8>,
        signature: Signature,
    ) -> Self {
        Self {
            inner_message_type,
            serialised_inner_message,
            signature: Some(signature),
        }
    }

    /// Decode an envelope. Unknown categories and empty inner messages fail.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        decode::<MessageWire>(bytes)?.into_message()
    }

    /// Encode for the wire. An empty inner message is an invalid parameter.
    pub fn serialise(&self) -> Result<Vec<u8>> {
        encode(&self.to_wire()?)
    }

    fn to_wire(&self) -> Result<MessageWire> {
        if self.serialised_inner_message.is_empty() {
            return Err(NfsError::invalid_parameter("empty inner message"));
        }
        Ok(MessageWire {
            message_type: self.inner_message_type as i32,
            serialised_message: self.serialised_inner_message.clone(),
            signature: self.signature.as_ref().map(|s| s.as_bytes().to_vec()),
        })
    }

    pub fn inner_message_type(&self) -> MessageCategory {
        self.inner_message_type
    }

    pub fn serialised_inner_message(&self) -> &[u8] {
        &self.serialised_inner_message
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
}

#[derive(Serialize, Deserialize)]
struct MessageListWire {
    messages: Vec<MessageWire>,
}

/// Ordered sequence of outer messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    /// List of `messages` in order.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Parse a whole list. Any malformed entry fails the list.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let wire: MessageListWire = decode(bytes)?;
        let messages = wire
            .messages
            .into_iter()
            .map(MessageWire::into_message)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { messages })
    }

    pub fn serialise(&self) -> Result<Vec<u8>> {
        let messages = self
            .messages
            .iter()
            .map(Message::to_wire)
            .collect::<Result<Vec<_>>>()?;
        encode(&MessageListWire { messages })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_present_signatures_are_distinguished() {
        let unsigned = Message::new(MessageCategory::Data, b"chunk".to_vec());
        let parsed = Message::parse(&unsigned.serialise().unwrap()).unwrap();
        assert_eq!(parsed.signature(), None);

        let garbage = Signature::from_bytes(vec![9; 5]);
        let signed = Message::signed(MessageCategory::Data, b"chunk".to_vec(), garbage.clone());
        let parsed = Message::parse(&signed.serialise().unwrap()).unwrap();
        assert_eq!(parsed.signature(), Some(&garbage));
        assert_eq!(parsed, signed);
    }

    #[test]
    fn unknown_category_fails_to_parse() {
        let wire = MessageWire {
            message_type: 42,
            serialised_message: vec![1],
            signature: None,
        };
        let bytes = encode(&wire).unwrap();
        assert!(matches!(Message::parse(&bytes), Err(NfsError::Parsing(_))));
    }

    #[test]
    fn empty_inner_message_cannot_be_serialised() {
        let message = Message::new(MessageCategory::GenericMessage, Vec::new());
        assert!(matches!(
            message.serialise(),
            Err(NfsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn garbage_is_a_parsing_error() {
        assert!(matches!(
            Message::parse(&[0xFF; 3]),
            Err(NfsError::Parsing(_))
        ));
    }

    #[test]
    fn list_preserves_order() {
        let list = MessageList::new(vec![
            Message::new(MessageCategory::Data, vec![1]),
            Message::new(MessageCategory::GenericMessage, vec![2]),
            Message::signed(
                MessageCategory::MessageWrapper,
                vec![3],
                Signature::from_bytes(vec![4; 64]),
            ),
        ]);
        let parsed = MessageList::parse(&list.serialise().unwrap()).unwrap();
        assert_eq!(parsed, list);
        assert_eq!(
            parsed.messages()[1].inner_message_type(),
            MessageCategory::GenericMessage
        );
    }

    #[test]
    fn one_bad_entry_fails_the_whole_list() {
        let wire = MessageListWire {
            messages: vec![
                MessageWire {
                    message_type: 1,
                    serialised_message: vec![1],
                    signature: None,
                },
                MessageWire {
                    message_type: 99,
                    serialised_message: vec![2],
                    signature: None,
                },
            ],
        };
        let bytes = encode(&wire).unwrap();
        assert!(MessageList::parse(&bytes).is_err());
    }
}
