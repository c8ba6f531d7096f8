//! Response ingress for the data getter.
//!
//! Every handler first checks the message was meant for this node, then hands
//! the contents to whichever task the message id names.

use crate::data_getter::DataGetter;
use crate::get_handler::ResponseDisposition;
use crate::routing::Routing;
use crate::timer::Timer;
use nfs_core::routes::{
    GetBranchResponseFromVersionHandlerToDataGetter, GetCachedResponseFromCacheHandlerToDataGetter,
    GetResponseFromDataManagerToDataGetter, GetVersionsResponseFromVersionHandlerToDataGetter,
};
use nfs_core::{
    ActionTag, Contents, GroupId, GroupSource, Message, MessageAction, MessageCategory,
    MessageWrapper, NfsError, NodeId, PersonaTag, Result, SingleId, SingleSource, TaskId,
    TypeErasedMessageWrapper, VersionsOrReturnCode, codec,
};
use tracing::{debug, warn};

/// Typed handlers for the responses a [`DataGetter`] waits on.
pub struct DataGetterService<'a, R> {
    getter: &'a DataGetter<R>,
}

impl<'a, R: Routing> DataGetterService<'a, R> {
    pub fn new(getter: &'a DataGetter<R>) -> Self {
        Self { getter }
    }

    /// One holder's answer to a get.
    pub fn handle_get_response(
        &self,
        message: &GetResponseFromDataManagerToDataGetter,
        sender: &GroupSource,
        receiver: &SingleId,
    ) -> Result<ResponseDisposition> {
        self.check_receiver(receiver)?;
        debug!(
            message_id = %message.message_id(),
            sender = ?sender.sender_id.0,
            "get response from data manager"
        );
        let contents = required_contents(message)?;
        let task_id = TaskId::from(message.message_id());
        let handler = self.getter.get_handler();
        Ok(handler.add_response(task_id, contents.clone()))
    }

    /// A cache answering a get on the holders' behalf.
    pub fn handle_get_cached_response(
        &self,
        message: &GetCachedResponseFromCacheHandlerToDataGetter,
        sender: &SingleSource,
        receiver: &SingleId,
    ) -> Result<ResponseDisposition> {
        self.check_receiver(receiver)?;
        debug!(
            message_id = %message.message_id(),
            sender = ?sender.0,
            "get response from cache handler"
        );
        let contents = required_contents(message)?;
        let task_id = TaskId::from(message.message_id());
        let handler = self.getter.get_handler();
        Ok(handler.add_response(task_id, contents.clone()))
    }

    /// A version handler's answer to a versions request.
    pub fn handle_get_versions_response(
        &self,
        message: &GetVersionsResponseFromVersionHandlerToDataGetter,
        sender: &GroupSource,
        receiver: &SingleId,
    ) -> Result<ResponseDisposition> {
        self.check_receiver(receiver)?;
        debug!(
            message_id = %message.message_id(),
            sender = ?sender.sender_id.0,
            "get versions response"
        );
        let contents = required_contents(message)?;
        Ok(forward(
            self.getter.versions_timer(),
            TaskId::from(message.message_id()),
            contents.clone(),
        ))
    }

    pub fn handle_get_branch_response(
        &self,
        message: &GetBranchResponseFromVersionHandlerToDataGetter,
        sender: &GroupSource,
        receiver: &SingleId,
    ) -> Result<ResponseDisposition> {
        self.check_receiver(receiver)?;
        debug!(
            message_id = %message.message_id(),
            sender = ?sender.sender_id.0,
            "get branch response"
        );
        let contents = required_contents(message)?;
        Ok(forward(
            self.getter.branch_timer(),
            TaskId::from(message.message_id()),
            contents.clone(),
        ))
    }

    /// Decode an outer message and route it to the matching typed handler.
    ///
    /// `group` is the group the sender answered for; responses from caching
    /// nodes carry none.
    pub fn handle_serialised(
        &self,
        bytes: &[u8],
        sender: NodeId,
        group: Option<GroupId>,
        receiver: SingleId,
    ) -> Result<ResponseDisposition> {
        let message = Message::parse(bytes)?;
        if message.inner_message_type() != MessageCategory::MessageWrapper {
            return Err(NfsError::Parsing(format!(
                "data getter cannot handle {:?} messages",
                message.inner_message_type()
            )));
        }
        let tuple = codec::parse_message_wrapper(message.serialised_inner_message())?;
        let group_source = |group: Option<GroupId>| {
            group
                .map(|group_id| GroupSource {
                    group_id,
                    sender_id: SingleId(sender),
                })
                .ok_or_else(|| {
                    NfsError::Parsing(format!("{:?} response without a group", tuple.action))
                })
        };
        match tuple.action {
            MessageAction::GetResponse => self.handle_get_response(
                &GetResponseFromDataManagerToDataGetter::from_parsed(&tuple)?,
                &group_source(group)?,
                &receiver,
            ),
            MessageAction::GetCachedResponse => self.handle_get_cached_response(
                &GetCachedResponseFromCacheHandlerToDataGetter::from_parsed(&tuple)?,
                &SingleSource(sender),
                &receiver,
            ),
            MessageAction::GetVersionsResponse => self.handle_get_versions_response(
                &GetVersionsResponseFromVersionHandlerToDataGetter::from_parsed(&tuple)?,
                &group_source(group)?,
                &receiver,
            ),
            MessageAction::GetBranchResponse => self.handle_get_branch_response(
                &GetBranchResponseFromVersionHandlerToDataGetter::from_parsed(&tuple)?,
                &group_source(group)?,
                &receiver,
            ),
            _ => Err(unexpected_action(&tuple)),
        }
    }

    fn check_receiver(&self, receiver: &SingleId) -> Result<()> {
        let node_id = self.getter.node_id();
        if receiver.0 != node_id {
            warn!(receiver = ?receiver.0, node_id = ?node_id, "response for another node");
            return Err(NfsError::InvalidParameter(format!(
                "receiver {:?} is not this node",
                receiver.0
            )));
        }
        Ok(())
    }
}

fn required_contents<A, S, Sn, D, Rv, C>(
    message: &MessageWrapper<A, S, Sn, D, Rv, C>,
) -> Result<&C>
where
    A: ActionTag,
    S: PersonaTag,
    D: PersonaTag,
    C: Contents,
{
    message
        .contents()
        .ok_or_else(|| NfsError::InvalidParameter("response has no contents".to_string()))
}

fn forward(
    timer: &Timer<VersionsOrReturnCode>,
    task_id: TaskId,
    response: VersionsOrReturnCode,
) -> ResponseDisposition {
    match timer.add_response(task_id, response) {
        Ok(()) => ResponseDisposition::Accepted,
        Err(error) => {
            warn!(task_id = %task_id, error = %error, "response for unknown or resolved task");
            ResponseDisposition::Discarded
        }
    }
}

fn unexpected_action(tuple: &TypeErasedMessageWrapper) -> NfsError {
    NfsError::Parsing(format!(
        "data getter does not accept {:?} from {:?}",
        tuple.action, tuple.source
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::routing::ResponseFunctor;
    use nfs_core::routes::GetRequestFromDataGetterToDataManager;
    use nfs_core::{
        Data, DataNameAndContentOrReturnCode, ErrorCode, Identity, ImmutableData, MessageId,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    #[derive(Default)]
    struct CapturingRouting {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl Routing for CapturingRouting {
        fn node_id(&self) -> NodeId {
            NodeId::from(Identity::hash_of(b"getter"))
        }

        fn send_group(&self, _: NodeId, message: Vec<u8>, _: bool, _: Option<ResponseFunctor>) {
            self.sent.lock().push(message);
        }
    }

    struct Fixture {
        routing: Arc<CapturingRouting>,
        getter: DataGetter<CapturingRouting>,
    }

    impl Fixture {
        fn new() -> Self {
            let routing = Arc::new(CapturingRouting::default());
            let getter = DataGetter::new(
                Arc::clone(&routing),
                ClientConfig::default(),
                Handle::current(),
            );
            Self { routing, getter }
        }

        fn me(&self) -> SingleId {
            SingleId(self.routing.node_id())
        }

        fn last_request_id(&self) -> MessageId {
            let sent = self.routing.sent.lock();
            let message = Message::parse(sent.last().unwrap()).unwrap();
            GetRequestFromDataGetterToDataManager::parse(message.serialised_inner_message())
                .unwrap()
                .message_id()
        }
    }

    fn holder() -> NodeId {
        NodeId::from(Identity::hash_of(b"holder"))
    }

    fn response_bytes(message_id: MessageId, contents: DataNameAndContentOrReturnCode) -> Vec<u8> {
        GetResponseFromDataManagerToDataGetter::with_id(message_id, contents)
            .to_message()
            .unwrap()
            .serialise()
            .unwrap()
    }

    #[tokio::test]
    async fn serialised_response_reaches_the_waiting_get() {
        let fixture = Fixture::new();
        let chunk = ImmutableData::new(b"payload".to_vec());
        let result = fixture.getter.get(chunk.name(), None);
        let bytes = response_bytes(
            fixture.last_request_id(),
            DataNameAndContentOrReturnCode::Content {
                name: chunk.name().variant(),
                content: chunk.content().to_vec(),
            },
        );

        let disposition = fixture.getter.service().handle_serialised(
            &bytes,
            holder(),
            Some(GroupId(NodeId::from(*chunk.name().value()))),
            fixture.me(),
        );

        assert_eq!(disposition, Ok(ResponseDisposition::Accepted));
        assert_eq!(result.await.unwrap(), Ok(chunk));
    }

    #[tokio::test]
    async fn wrong_receiver_is_rejected() {
        let fixture = Fixture::new();
        let chunk = ImmutableData::new(b"payload".to_vec());
        let _result = fixture.getter.get(chunk.name(), None);
        let bytes = response_bytes(
            fixture.last_request_id(),
            DataNameAndContentOrReturnCode::ReturnCode {
                name: chunk.name().variant(),
                code: ErrorCode::NoSuchElement,
            },
        );

        let outcome = fixture.getter.service().handle_serialised(
            &bytes,
            holder(),
            Some(GroupId(holder())),
            SingleId(holder()),
        );

        assert!(matches!(outcome, Err(NfsError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn unknown_message_id_is_swallowed() {
        let fixture = Fixture::new();
        let chunk = ImmutableData::new(b"payload".to_vec());
        let bytes = response_bytes(
            MessageId::new(9_999),
            DataNameAndContentOrReturnCode::ReturnCode {
                name: chunk.name().variant(),
                code: ErrorCode::NoSuchElement,
            },
        );

        let outcome = fixture.getter.service().handle_serialised(
            &bytes,
            holder(),
            Some(GroupId(holder())),
            fixture.me(),
        );

        assert_eq!(outcome, Ok(ResponseDisposition::Discarded));
    }

    #[tokio::test]
    async fn requests_are_not_accepted_as_responses() {
        let fixture = Fixture::new();
        let chunk = ImmutableData::new(b"payload".to_vec());
        let _result = fixture.getter.get(chunk.name(), None);
        let request = fixture.routing.sent.lock().last().cloned().unwrap();

        let outcome = fixture.getter.service().handle_serialised(
            &request,
            holder(),
            None,
            fixture.me(),
        );

        assert!(matches!(outcome, Err(NfsError::Parsing(_))));
    }

    #[tokio::test]
    async fn group_response_without_group_fails_to_parse() {
        let fixture = Fixture::new();
        let chunk = ImmutableData::new(b"payload".to_vec());
        let bytes = response_bytes(
            MessageId::new(1),
            DataNameAndContentOrReturnCode::ReturnCode {
                name: chunk.name().variant(),
                code: ErrorCode::NoSuchElement,
            },
        );
        let outcome = fixture
            .getter
            .service()
            .handle_serialised(&bytes, holder(), None, fixture.me());
        assert!(matches!(outcome, Err(NfsError::Parsing(_))));
    }

    #[test]
    fn garbage_fails_to_parse() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let routing = Arc::new(CapturingRouting::default());
        let getter = DataGetter::new(routing, ClientConfig::default(), runtime.handle().clone());
        let outcome = getter.service().handle_serialised(
            &[0xff; 7],
            holder(),
            None,
            SingleId(holder()),
        );
        assert!(matches!(outcome, Err(NfsError::Parsing(_))));
    }
}
