//! Routing collaborator.

use nfs_core::NodeId;

/// Called with a reply delivered on the send path, if the transport has one.
pub type ResponseFunctor = Box<dyn FnOnce(Vec<u8>) + Send>;

/// The group-based transport this layer sends through.
pub trait Routing: Send + Sync + 'static {
    /// Address of this node.
    fn node_id(&self) -> NodeId;

    /// Send `message` to the group of nodes closest to `destination`.
    fn send_group(
        &self,
        destination: NodeId,
        message: Vec<u8>,
        encrypted: bool,
        callback: Option<ResponseFunctor>,
    );
}
