//! Client side of the NFS message layer.
//!
//! A [`DataGetter`] sends get requests to replicated holder groups through a
//! [`Routing`] implementation and correlates their answers with a
//! [`GetHandler`]. The transport feeds received bytes to the getter's
//! [`DataGetterService`]. Account commands go through the post policies.

mod config;
mod data_getter;
mod dispatcher;
mod get_handler;
mod op_data;
mod post_policy;
mod routing;
mod service;
mod timer;

pub use config::{ClientConfig, ConfigError};
pub use data_getter::DataGetter;
pub use dispatcher::{DataGetterDispatcher, GetDispatcher};
pub use get_handler::{GetHandler, GetInfo, ResponseDisposition};
pub use op_data::OpData;
pub use post_policy::{ClientMaidPostPolicy, ClientMpidPostPolicy};
pub use routing::{ResponseFunctor, Routing};
pub use service::DataGetterService;
pub use timer::{TaskCallback, Timer, TimerEvent};
