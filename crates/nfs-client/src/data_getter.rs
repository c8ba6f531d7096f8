//! The data getter persona on the client side.

use crate::config::ClientConfig;
use crate::dispatcher::DataGetterDispatcher;
use crate::get_handler::GetHandler;
use crate::op_data::OpData;
use crate::routing::Routing;
use crate::service::DataGetterService;
use crate::timer::{Timer, TimerEvent};
use nfs_core::{
    Data, DataName, DataNameAndVersion, DataNameVariant, NfsError, NodeId, Result, TaskId,
    VersionName, VersionsOrReturnCode,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Issues reads against replicated holder groups and correlates the answers.
pub struct DataGetter<R> {
    routing: Arc<R>,
    dispatcher: Arc<DataGetterDispatcher<R>>,
    get_handler: GetHandler<DataGetterDispatcher<R>>,
    versions_timer: Timer<VersionsOrReturnCode>,
    branch_timer: Timer<VersionsOrReturnCode>,
    config: ClientConfig,
}

impl<R: Routing> DataGetter<R> {
    /// Getter sending through `routing`, with deadlines running on `runtime`.
    pub fn new(routing: Arc<R>, config: ClientConfig, runtime: Handle) -> Self {
        let dispatcher = Arc::new(DataGetterDispatcher::new(Arc::clone(&routing)));
        let get_handler = GetHandler::new(
            Timer::new(runtime.clone()),
            Arc::clone(&dispatcher),
            &config,
        );
        Self {
            routing,
            dispatcher,
            get_handler,
            versions_timer: Timer::new(runtime.clone()),
            branch_timer: Timer::new(runtime),
            config,
        }
    }

    /// Address responses must be sent to.
    pub fn node_id(&self) -> NodeId {
        self.routing.node_id()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch one data item from the group holding it.
    pub fn get<T: Data>(
        &self,
        name: DataName<T>,
        timeout: Option<Duration>,
    ) -> oneshot::Receiver<Result<T>> {
        self.get_handler.get(name, timeout)
    }

    /// Fetch the version list of a mutable data item.
    pub fn get_versions(
        &self,
        name: DataNameVariant,
        timeout: Option<Duration>,
    ) -> oneshot::Receiver<Result<Vec<VersionName>>> {
        self.start_versions_task(&self.versions_timer, name, timeout, |task_id| {
            self.dispatcher.send_get_versions_request(task_id, &name)
        })
    }

    /// Fetch the branch of versions leading from `name_and_version`.
    pub fn get_branch(
        &self,
        name_and_version: DataNameAndVersion,
        timeout: Option<Duration>,
    ) -> oneshot::Receiver<Result<Vec<VersionName>>> {
        self.start_versions_task(
            &self.branch_timer,
            name_and_version.name,
            timeout,
            |task_id| {
                self.dispatcher
                    .send_get_branch_request(task_id, &name_and_version)
            },
        )
    }

    /// Response ingress bound to this getter.
    pub fn service(&self) -> DataGetterService<'_, R> {
        DataGetterService::new(self)
    }

    pub(crate) fn get_handler(&self) -> &GetHandler<DataGetterDispatcher<R>> {
        &self.get_handler
    }

    pub(crate) fn versions_timer(&self) -> &Timer<VersionsOrReturnCode> {
        &self.versions_timer
    }

    pub(crate) fn branch_timer(&self) -> &Timer<VersionsOrReturnCode> {
        &self.branch_timer
    }

    fn start_versions_task(
        &self,
        timer: &Timer<VersionsOrReturnCode>,
        name: DataNameVariant,
        timeout: Option<Duration>,
        send: impl FnOnce(TaskId) -> Result<()>,
    ) -> oneshot::Receiver<Result<Vec<VersionName>>> {
        let expected_count = self.config.expected_response_count();
        let task_id = timer.new_task_id();
        let (sink, result) = oneshot::channel();
        let op_data = Arc::new(Mutex::new(OpData::new(expected_count, sink)));

        let callback = {
            let op_data = Arc::clone(&op_data);
            let timer = timer.clone();
            move |event: TimerEvent<VersionsOrReturnCode>| {
                let resolved = match event {
                    TimerEvent::Response(response) => {
                        let outcome = versions_outcome(&name, response);
                        op_data.lock().handle_outcome(outcome)
                    }
                    TimerEvent::Timeout => {
                        warn!(task_id = %task_id, "versions request timed out");
                        op_data.lock().handle_timeout()
                    }
                };
                if resolved {
                    timer.cancel_task(task_id);
                    debug!(task_id = %task_id, "versions task resolved");
                }
            }
        };
        timer.add_task(
            timeout.unwrap_or_else(|| self.config.get_timeout()),
            Box::new(callback),
            expected_count,
            task_id,
        );

        if let Err(error) = send(task_id) {
            warn!(task_id = %task_id, error = %error, "failed to dispatch versions request");
            if op_data.lock().fail(error) {
                timer.cancel_task(task_id);
            }
        }
        result
    }
}

fn versions_outcome(
    requested: &DataNameVariant,
    response: VersionsOrReturnCode,
) -> Result<Vec<VersionName>> {
    match response {
        VersionsOrReturnCode::Versions { name, versions } if name == *requested => Ok(versions),
        VersionsOrReturnCode::Versions { name, .. } => Err(NfsError::DataValidation(format!(
            "versions for {} instead of {}",
            name.name.short(),
            requested.name.short()
        ))),
        VersionsOrReturnCode::ReturnCode { code, .. } => Err(NfsError::Remote(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ResponseFunctor;
    use nfs_core::{DataTagValue, ErrorCode, Identity, Message, MutableData, codec};

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

    fn getter() -> DataGetter<CapturingRouting> {
        DataGetter::new(
            Arc::new(CapturingRouting::default()),
            ClientConfig::default(),
            Handle::current(),
        )
    }

    /// Task id of the last request, read back from its message id.
    fn last_task_id(getter: &DataGetter<CapturingRouting>) -> TaskId {
        let sent = getter.routing.sent.lock();
        let message = Message::parse(sent.last().unwrap()).unwrap();
        let inner = message.serialised_inner_message();
        TaskId::from(codec::parse_message_wrapper(inner).unwrap().message_id)
    }

    fn version(index: u64) -> VersionName {
        VersionName {
            index,
            id: Identity::hash_of(&index.to_be_bytes()),
        }
    }

    fn directory() -> DataNameVariant {
        MutableData::new(Identity::hash_of(b"dir"), b"v".to_vec())
            .name()
            .variant()
    }

    #[test]
    fn versions_outcome_checks_name() {
        let requested = directory();
        let other = DataNameVariant {
            tag: DataTagValue::MutableData,
            name: Identity::hash_of(b"other"),
        };
        assert_eq!(
            versions_outcome(
                &requested,
                VersionsOrReturnCode::Versions {
                    name: requested,
                    versions: vec![version(1)],
                }
            ),
            Ok(vec![version(1)])
        );
        assert!(matches!(
            versions_outcome(
                &requested,
                VersionsOrReturnCode::Versions {
                    name: other,
                    versions: vec![],
                }
            ),
            Err(NfsError::DataValidation(_))
        ));
    }

    #[tokio::test]
    async fn versions_resolve_on_first_list() {
        let getter = getter();
        let name = directory();
        let result = getter.get_versions(name, None);
        let task_id = last_task_id(&getter);

        getter
            .versions_timer()
            .add_response(
                task_id,
                VersionsOrReturnCode::ReturnCode {
                    name,
                    code: ErrorCode::NoSuchElement,
                },
            )
            .unwrap();
        getter
            .versions_timer()
            .add_response(
                task_id,
                VersionsOrReturnCode::Versions {
                    name,
                    versions: vec![version(1), version(2)],
                },
            )
            .unwrap();

        assert_eq!(result.await.unwrap(), Ok(vec![version(1), version(2)]));
        assert!(!getter.versions_timer().is_pending(task_id));
    }

    #[tokio::test(start_paused = true)]
    async fn branch_times_out_without_answers() {
        let getter = getter();
        let request = DataNameAndVersion {
            name: directory(),
            version: version(4),
        };
        let result = getter.get_branch(request, Some(Duration::from_secs(1)));
        assert_eq!(result.await.unwrap(), Err(NfsError::Timeout));
        assert_eq!(getter.branch_timer().pending_count(), 0);
    }
}
