//! In-memory network: one client, one group of holders, one maid manager.
//!
//! Every holder answers every get request, and each answer is delivered
//! twice to mimic at-least-once delivery.

use nfs_client::{ResponseFunctor, Routing};
use nfs_core::passport::{Maid, Pmid, check_signature};
use nfs_core::routes::{
    GetRequestFromDataGetterToDataManager, GetResponseFromDataManagerToDataGetter,
};
use nfs_core::{
    DataNameAndContentOrReturnCode, DataNameVariant, ErrorCode, GenericAction, GenericMessage,
    GroupId, Identity, Message, MessageAction, MessageCategory, MessageId, NfsError, NodeId,
    PmidRegistration, PublicFob, codec,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// Bytes on their way back to the client.
pub struct Delivery {
    pub bytes: Vec<u8>,
    pub sender: NodeId,
    pub group: Option<GroupId>,
}

struct Holder {
    id: NodeId,
    chunks: HashMap<Identity, Vec<u8>>,
}

#[derive(Default)]
struct KeyDirectory {
    maids: HashMap<Identity, PublicFob<Maid>>,
    pmids: HashMap<Identity, PublicFob<Pmid>>,
}

pub struct LoopbackNetwork {
    node_id: NodeId,
    holders: Mutex<Vec<Holder>>,
    keys: Mutex<KeyDirectory>,
    inbox: UnboundedSender<Delivery>,
}

impl LoopbackNetwork {
    pub fn new(node_id: NodeId, group_size: usize, inbox: UnboundedSender<Delivery>) -> Self {
        let holders = (0..group_size)
            .map(|index| Holder {
                id: NodeId::from(Identity::hash_of(format!("holder-{index}").as_bytes())),
                chunks: HashMap::new(),
            })
            .collect();
        Self {
            node_id,
            holders: Mutex::new(holders),
            keys: Mutex::new(KeyDirectory::default()),
            inbox,
        }
    }

    /// Store `content` under `name` on the holders at `indices`.
    pub fn store(&self, name: Identity, content: &[u8], indices: &[usize]) {
        let mut holders = self.holders.lock();
        for index in indices {
            if let Some(holder) = holders.get_mut(*index) {
                holder.chunks.insert(name, content.to_vec());
            }
        }
    }

    pub fn publish_keys(&self, maid: PublicFob<Maid>, pmid: PublicFob<Pmid>) {
        let mut keys = self.keys.lock();
        keys.maids.insert(*maid.name().value(), maid);
        keys.pmids.insert(*pmid.name().value(), pmid);
    }

    fn answer_get(&self, group: GroupId, message_id: MessageId, name: DataNameVariant) {
        let holders = self.holders.lock();
        for holder in holders.iter() {
            let contents = match holder.chunks.get(&name.name) {
                Some(content) => DataNameAndContentOrReturnCode::Content {
                    name,
                    content: content.clone(),
                },
                None => DataNameAndContentOrReturnCode::ReturnCode {
                    name,
                    code: ErrorCode::NoSuchElement,
                },
            };
            let response = GetResponseFromDataManagerToDataGetter::with_id(message_id, contents);
            let bytes = match response.to_message().and_then(|m| m.serialise()) {
                Ok(bytes) => bytes,
                Err(error) => {
                    tracing::error!(%error, "holder failed to build response");
                    continue;
                }
            };
            for _ in 0..2 {
                let delivery = Delivery {
                    bytes: bytes.clone(),
                    sender: holder.id,
                    group: Some(group),
                };
                if self.inbox.send(delivery).is_err() {
                    tracing::warn!("client inbox closed");
                    return;
                }
            }
        }
    }

    /// Maid manager side of a generic message. Returns the reply text.
    fn manage(&self, message: &Message) -> &'static str {
        let generic = match GenericMessage::parse(message.serialised_inner_message()) {
            Ok(generic) => generic,
            Err(error) => {
                tracing::warn!(%error, "manager received malformed generic message");
                return "malformed";
            }
        };
        let keys = self.keys.lock();
        let Some(maid) = keys.maids.get(generic.name()) else {
            return "unknown maid";
        };
        let inner = message.serialised_inner_message();
        let signed = match message.signature() {
            Some(signature) => check_signature(inner, signature, maid),
            None => false,
        };
        if !signed {
            tracing::warn!(maid = %generic.name().short(), "generic message signature rejected");
            return "bad signature";
        }
        match generic.action() {
            GenericAction::RegisterPmid | GenericAction::UnregisterPmid => {
                let Ok(registration) = PmidRegistration::parse(generic.content()) else {
                    return "malformed registration";
                };
                let Some(pmid) = keys.pmids.get(registration.pmid_name().value()) else {
                    return "unknown pmid";
                };
                if registration.validate(maid, pmid) {
                    if registration.unregister() {
                        "unregistered"
                    } else {
                        "registered"
                    }
                } else {
                    "rejected"
                }
            }
            GenericAction::MsgToMpah => "not a maid manager command",
        }
    }
}

impl Routing for LoopbackNetwork {
    fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn send_group(
        &self,
        destination: NodeId,
        message: Vec<u8>,
        _encrypted: bool,
        callback: Option<ResponseFunctor>,
    ) {
        let message = match Message::parse(&message) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, "dropping malformed message");
                return;
            }
        };
        match message.inner_message_type() {
            MessageCategory::GenericMessage => {
                let reply = self.manage(&message);
                if let Some(callback) = callback {
                    callback(reply.as_bytes().to_vec());
                }
            }
            MessageCategory::MessageWrapper => {
                let request = codec::parse_message_wrapper(message.serialised_inner_message())
                    .and_then(|tuple| match tuple.action {
                        MessageAction::GetRequest => {
                            GetRequestFromDataGetterToDataManager::from_parsed(&tuple)
                        }
                        other => Err(NfsError::Parsing(format!("holders do not serve {other:?}"))),
                    });
                match request {
                    Ok(request) => {
                        if let Some(name) = request.contents() {
                            self.answer_get(GroupId(destination), request.message_id(), *name);
                        }
                    }
                    Err(error) => tracing::warn!(%error, "holders dropped request"),
                }
            }
            MessageCategory::Data => tracing::debug!("ignoring raw data message"),
        }
    }
}
