//! Error types for the dispatcher.

use thiserror::Error;

use super::InterceptorError;
use crate::{
    Action,
    client::ClientError,
    codec::CodecError,
    data::DataError,
    package::PackageError,
};

/// Faults on the pack/send path and the per-frame receive path.
///
/// Outgoing stages carry the action being sent for context.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("action[{action}] pack data failed")]
    PackData {
        action: Action,
        #[source]
        source: DataError,
    },
    #[error("action[{action}] pack package failed")]
    PackPackage {
        action: Action,
        #[source]
        source: PackageError,
    },
    #[error("action[{action}] interceptor encode failed")]
    Encode {
        action: Action,
        #[source]
        source: InterceptorError,
    },
    #[error("action[{action}] marshal failed")]
    Marshal {
        action: Action,
        #[source]
        source: CodecError,
    },
    #[error("action[{action}] send failed")]
    Send {
        action: Action,
        #[source]
        source: ClientError,
    },
    #[error("interceptor decode failed")]
    Decode(#[source] InterceptorError),
    #[error("unpack package failed")]
    UnpackPackage(#[source] PackageError),
    #[error("action[{action}] unpack data failed")]
    UnpackData {
        action: Action,
        #[source]
        source: DataError,
    },
}

impl ServiceError {
    /// Pipeline stage that failed, for logging and metrics.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::PackData { .. } => "pack_data",
            Self::PackPackage { .. } => "pack_package",
            Self::Encode { .. } => "encode",
            Self::Marshal { .. } => "marshal",
            Self::Send { .. } => "send",
            Self::Decode(_) => "decode",
            Self::UnpackPackage(_) => "unpack_package",
            Self::UnpackData { .. } => "unpack_data",
        }
    }
}
