//! Error taxonomy for the model and diagram graphs.
//!
//! Every variant of [`ModelError`] is recoverable: the call that produced it
//! left all graphs exactly as they were. Broken internal invariants are not
//! errors; they go through [`invariant!`](crate::invariant) and panic.

use crate::uid::Uid;
use thiserror::Error;

pub type Result<T, E = ModelError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("malformed identifier `{0}`")]
    MalformedId(String),

    #[error("reference to missing element {0}")]
    DanglingReference(Uid),

    #[error("moving {element} under {owner} would create an ownership cycle")]
    CycleDetected { element: Uid, owner: Uid },

    #[error("element {element} is already shown in diagram {diagram}")]
    AlreadyPresent { element: Uid, diagram: Uid },

    #[error("element {element} cannot be shown in diagram {diagram}")]
    NotAddable { element: Uid, diagram: Uid },

    #[error("unknown element {0}")]
    UnknownElement(Uid),

    #[error("unknown diagram {0}")]
    UnknownDiagram(Uid),

    #[error("element {0} cannot own other elements")]
    InvalidOwner(Uid),

    #[error("the root package cannot be removed or moved")]
    RootElement,

    #[error("element {0} already exists")]
    DuplicateUid(Uid),

    #[error("element {0} still owns or is referenced by other elements")]
    HasDependents(Uid),

    #[error("invalid container: {0}")]
    InvalidContainer(String),
}

/// Failure while encoding or decoding a container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decoding failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Assert an internal invariant; on failure log and panic.
///
/// Reserved for conditions that indicate a bug in this crate or its callers
/// (out-of-order undo, a notification for an element nobody knows about),
/// never for bad user input.
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            let message = format!($($arg)+);
            $crate::__log::error!("invariant violation: {message}");
            panic!("invariant violation: {message}");
        }
    };
}
