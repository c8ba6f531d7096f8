//! Message actions.

use serde::{Deserialize, Serialize};

/// What a wrapped message asks for or answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageAction {
    GetRequest,
    GetResponse,
    GetCachedResponse,
    GetVersionsRequest,
    GetVersionsResponse,
    GetBranchRequest,
    GetBranchResponse,
}

/// Compile-time action marker.
pub trait ActionTag: 'static {
    const ACTION: MessageAction;
}

/// Zero-sized action markers used as wrapper type parameters.
pub mod tags {
    use super::{ActionTag, MessageAction};

    macro_rules! action_tags {
        ($($tag:ident),* $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy, PartialEq, Eq)]
                pub struct $tag;

                impl ActionTag for $tag {
                    const ACTION: MessageAction = MessageAction::$tag;
                }
            )*
        };
    }

    action_tags!(
        GetRequest,
        GetResponse,
        GetCachedResponse,
        GetVersionsRequest,
        GetVersionsResponse,
        GetBranchRequest,
        GetBranchResponse,
    );
}
