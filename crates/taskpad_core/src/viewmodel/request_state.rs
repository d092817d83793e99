//! Request-result status for asynchronous reads.

use crate::model::task::UnknownPriorityError;
use crate::store::preference_store::PreferenceError;
use crate::store::task_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Status of one asynchronous read channel.
///
/// Transitions: `Idle -> Loading -> Success | Error`; `Success` is replaced
/// by every later snapshot, `Error` is final for the channel.
#[derive(Debug, Clone)]
pub enum RequestState<T> {
    Idle,
    Loading,
    Success(T),
    Error(Arc<ReadError>),
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> RequestState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Payload when `Success`.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Cause when `Error`.
    pub fn error(&self) -> Option<&ReadError> {
        match self {
            Self::Error(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl<T: PartialEq> PartialEq for RequestState<T> {
    /// Errors compare by identity of the shared cause.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Idle, Self::Idle) | (Self::Loading, Self::Loading) => true,
            (Self::Success(left), Self::Success(right)) => left == right,
            (Self::Error(left), Self::Error(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }
}

/// Cause that terminated a read channel.
#[derive(Debug)]
pub enum ReadError {
    Store(StoreError),
    PreferenceRead(PreferenceError),
    UnknownPriority(UnknownPriorityError),
    /// The live query ended without reporting a cause.
    SubscriptionClosed(&'static str),
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::PreferenceRead(err) => write!(f, "{err}"),
            Self::UnknownPriority(err) => write!(f, "{err}"),
            Self::SubscriptionClosed(query) => write!(f, "live query `{query}` closed"),
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::PreferenceRead(err) => Some(err),
            Self::UnknownPriority(err) => Some(err),
            Self::SubscriptionClosed(_) => None,
        }
    }
}

impl From<StoreError> for ReadError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PreferenceError> for ReadError {
    fn from(value: PreferenceError) -> Self {
        Self::PreferenceRead(value)
    }
}

impl From<UnknownPriorityError> for ReadError {
    fn from(value: UnknownPriorityError) -> Self {
        Self::UnknownPriority(value)
    }
}
