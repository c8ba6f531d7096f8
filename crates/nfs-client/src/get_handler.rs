//! Correlation of replicated get requests.
//!
//! Flow:
//! 1. `get` takes a task id from the timer and records a [`GetInfo`]
//! 2. The timer is told to expect `group_size * response_multiplier` responses
//! 3. The dispatcher sends the request to the group holding the data
//! 4. The service feeds each response to `add_response`
//! 5. The first valid content, or the last expected failure, or the
//!    deadline resolves the caller's receiver exactly once
//!
//! Responses for tasks that are no longer tracked are expected under
//! replicated delivery; they are logged and dropped.

use crate::config::ClientConfig;
use crate::dispatcher::GetDispatcher;
use crate::op_data::OpData;
use crate::timer::{Timer, TimerEvent};
use nfs_core::{
    Data, DataName, DataNameAndContentOrReturnCode, DataNameVariant, NfsError, Result, TaskId,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Book-keeping for one outstanding get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetInfo {
    /// Responses delivered so far, including ones arriving after resolution.
    pub response_count: usize,
    pub task_id: TaskId,
    pub name: DataNameVariant,
}

/// What happened to a response handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// Delivered to a live task.
    Accepted,
    /// The task was unknown or already resolved.
    Discarded,
}

type GetInfoTable = Arc<Mutex<HashMap<TaskId, GetInfo>>>;

/// Issues gets and correlates their replicated responses.
///
/// `get` and `add_response` may be called concurrently from any thread.
pub struct GetHandler<D> {
    get_timer: Timer<DataNameAndContentOrReturnCode>,
    dispatcher: Arc<D>,
    get_info: GetInfoTable,
    expected_response_count: usize,
    default_timeout: Duration,
}

impl<D: GetDispatcher> GetHandler<D> {
    /// Handler expecting `config.expected_response_count()` responses per get.
    pub fn new(
        get_timer: Timer<DataNameAndContentOrReturnCode>,
        dispatcher: Arc<D>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            get_timer,
            dispatcher,
            get_info: Arc::new(Mutex::new(HashMap::new())),
            expected_response_count: config.expected_response_count(),
            default_timeout: config.get_timeout(),
        }
    }

    /// Start fetching `data_name`. Never blocks; the receiver resolves once.
    pub fn get<T: Data>(
        &self,
        data_name: DataName<T>,
        timeout: Option<Duration>,
    ) -> oneshot::Receiver<Result<T>> {
        let task_id = self.get_timer.new_task_id();
        let (sink, result) = oneshot::channel();
        let op_data = Arc::new(Mutex::new(OpData::new(self.expected_response_count, sink)));
        let variant = data_name.variant();

        let info = GetInfo {
            response_count: 0,
            task_id,
            name: variant,
        };
        self.get_info.lock().insert(task_id, info);

        let callback = {
            let op_data = Arc::clone(&op_data);
            let get_info = Arc::clone(&self.get_info);
            let timer = self.get_timer.clone();
            move |event: TimerEvent<DataNameAndContentOrReturnCode>| {
                let resolved = match event {
                    TimerEvent::Response(response) => {
                        debug!(task_id = %task_id, "handling get response contents");
                        let outcome = response_outcome(&data_name, response);
                        op_data.lock().handle_outcome(outcome)
                    }
                    TimerEvent::Timeout => {
                        warn!(task_id = %task_id, "get timed out");
                        op_data.lock().handle_timeout()
                    }
                };
                if resolved {
                    finish(&get_info, &timer, task_id);
                }
            }
        };
        self.get_timer.add_task(
            timeout.unwrap_or(self.default_timeout),
            Box::new(callback),
            self.expected_response_count,
            task_id,
        );

        if let Err(error) = self.dispatcher.send_get_request(task_id, &variant) {
            warn!(task_id = %task_id, error = %error, "failed to dispatch get request");
            if op_data.lock().fail(error) {
                finish(&self.get_info, &self.get_timer, task_id);
            }
        }
        result
    }

    /// Feed a holder's response to the task it answers.
    pub fn add_response(
        &self,
        task_id: TaskId,
        response: DataNameAndContentOrReturnCode,
    ) -> ResponseDisposition {
        {
            let mut get_info = self.get_info.lock();
            match get_info.get_mut(&task_id) {
                Some(info) => info.response_count += 1,
                None => {
                    warn!(task_id = %task_id, "response for unknown or resolved get task");
                    return ResponseDisposition::Discarded;
                }
            }
        }
        match self.get_timer.add_response(task_id, response) {
            Ok(()) => ResponseDisposition::Accepted,
            Err(error) => {
                warn!(task_id = %task_id, error = %error, "timer does not expect response");
                ResponseDisposition::Discarded
            }
        }
    }

    /// Snapshot of a live task's book-keeping.
    pub fn get_info(&self, task_id: TaskId) -> Option<GetInfo> {
        self.get_info.lock().get(&task_id).cloned()
    }

    /// Number of unresolved gets.
    pub fn pending_count(&self) -> usize {
        self.get_info.lock().len()
    }

    pub fn expected_response_count(&self) -> usize {
        self.expected_response_count
    }
}

fn finish(
    get_info: &Mutex<HashMap<TaskId, GetInfo>>,
    timer: &Timer<DataNameAndContentOrReturnCode>,
    task_id: TaskId,
) {
    get_info.lock().remove(&task_id);
    timer.cancel_task(task_id);
    debug!(task_id = %task_id, "get task resolved");
}

fn response_outcome<T: Data>(
    data_name: &DataName<T>,
    response: DataNameAndContentOrReturnCode,
) -> Result<T> {
    match response {
        DataNameAndContentOrReturnCode::Content { name, content } => {
            if name != data_name.variant() {
                return Err(NfsError::DataValidation(format!(
                    "response names {} instead of {}",
                    name.name.short(),
                    data_name.value().short()
                )));
            }
            T::parse(data_name, &content)
        }
        DataNameAndContentOrReturnCode::ReturnCode { code, .. } => Err(NfsError::Remote(code)),
    }
}
