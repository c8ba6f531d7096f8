//! Wrapper instantiations exchanged between the data getter and the holder
//! personas.

use crate::action::tags::{
    GetBranchRequest, GetBranchResponse, GetCachedResponse, GetRequest, GetResponse,
    GetVersionsRequest, GetVersionsResponse,
};
use crate::persona::tags::{CacheHandler, DataGetter, DataManager, VersionHandler};
use crate::{
    DataNameAndContentOrReturnCode, DataNameAndVersion, DataNameVariant, GroupId, GroupSource,
    MessageWrapper, SingleId, SingleSource, VersionsOrReturnCode,
};

/// Client asks the holder group for a chunk.
pub type GetRequestFromDataGetterToDataManager =
    MessageWrapper<GetRequest, DataGetter, SingleSource, DataManager, GroupId, DataNameVariant>;

/// One holder's answer to a [`GetRequestFromDataGetterToDataManager`].
pub type GetResponseFromDataManagerToDataGetter = MessageWrapper<
    GetResponse,
    DataManager,
    GroupSource,
    DataGetter,
    SingleId,
    DataNameAndContentOrReturnCode,
>;

/// A cache answering on the holders' behalf.
pub type GetCachedResponseFromCacheHandlerToDataGetter = MessageWrapper<
    GetCachedResponse,
    CacheHandler,
    SingleSource,
    DataGetter,
    SingleId,
    DataNameAndContentOrReturnCode,
>;

pub type GetVersionsRequestFromDataGetterToVersionHandler = MessageWrapper<
    GetVersionsRequest,
    DataGetter,
    SingleSource,
    VersionHandler,
    GroupId,
    DataNameVariant,
>;

pub type GetVersionsResponseFromVersionHandlerToDataGetter = MessageWrapper<
    GetVersionsResponse,
    VersionHandler,
    GroupSource,
    DataGetter,
    SingleId,
    VersionsOrReturnCode,
>;

pub type GetBranchRequestFromDataGetterToVersionHandler = MessageWrapper<
    GetBranchRequest,
    DataGetter,
    SingleSource,
    VersionHandler,
    GroupId,
    DataNameAndVersion,
>;

pub type GetBranchResponseFromVersionHandlerToDataGetter = MessageWrapper<
    GetBranchResponse,
    VersionHandler,
    GroupSource,
    DataGetter,
    SingleId,
    VersionsOrReturnCode,
>;
