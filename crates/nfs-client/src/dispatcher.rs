//! Outgoing requests of the data getter.

use crate::routing::Routing;
use nfs_core::routes::{
    GetBranchRequestFromDataGetterToVersionHandler, GetRequestFromDataGetterToDataManager,
    GetVersionsRequestFromDataGetterToVersionHandler,
};
use nfs_core::{DataNameAndVersion, DataNameVariant, Message, NodeId, Result, TaskId};
use std::sync::Arc;
use tracing::debug;

/// Sends the initial request of a get task.
pub trait GetDispatcher: Send + Sync + 'static {
    /// Send a get for `name`, using `task_id` as the message id.
    fn send_get_request(&self, task_id: TaskId, name: &DataNameVariant) -> Result<()>;
}

/// Builds data getter requests and hands them to the routing layer.
///
/// Every request uses its task id as message id, which is how the responses
/// find their way back to the task.
pub struct DataGetterDispatcher<R> {
    routing: Arc<R>,
}

impl<R: Routing> DataGetterDispatcher<R> {
    pub fn new(routing: Arc<R>) -> Self {
        Self { routing }
    }

    /// Ask the version handlers for every version of `name`.
    pub fn send_get_versions_request(
        &self,
        task_id: TaskId,
        name: &DataNameVariant,
    ) -> Result<()> {
        let request =
            GetVersionsRequestFromDataGetterToVersionHandler::with_id(task_id.into(), *name);
        debug!(task_id = %task_id, name = %name.name.short(), "sending get versions request");
        self.send_to_group(NodeId::from(name.name), request.to_message()?)
    }

    /// Ask the version handlers for the branch that starts at a version.
    pub fn send_get_branch_request(
        &self,
        task_id: TaskId,
        name_and_version: &DataNameAndVersion,
    ) -> Result<()> {
        let request = GetBranchRequestFromDataGetterToVersionHandler::with_id(
            task_id.into(),
            *name_and_version,
        );
        debug!(
            task_id = %task_id,
            name = %name_and_version.name.name.short(),
            version = name_and_version.version.index,
            "sending get branch request"
        );
        let destination = NodeId::from(name_and_version.name.name);
        self.send_to_group(destination, request.to_message()?)
    }

    fn send_to_group(&self, destination: NodeId, message: Message) -> Result<()> {
        let bytes = message.serialise()?;
        self.routing.send_group(destination, bytes, false, None);
        Ok(())
    }
}

impl<R: Routing> GetDispatcher for DataGetterDispatcher<R> {
    fn send_get_request(&self, task_id: TaskId, name: &DataNameVariant) -> Result<()> {
        let request = GetRequestFromDataGetterToDataManager::with_id(task_id.into(), *name);
        debug!(
            task_id = %task_id,
            tag = ?name.tag,
            name = %name.name.short(),
            "sending get request"
        );
        self.send_to_group(NodeId::from(name.name), request.to_message()?)
    }
}
