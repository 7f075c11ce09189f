use crate::model::Id;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const USER_HANDLE_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// Read model of a user, owned by the user aggregate. Also its JSON
/// projection.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub handle: UserHandle,
}

/// Non-empty handle of at most [`USER_HANDLE_MAX_LEN`] characters.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserHandle(String);

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("Invalid user handle {0:?}")]
pub struct InvalidUserHandleError(String);

impl UserHandle {
    pub fn new(handle: String) -> Result<Self, InvalidUserHandleError> {
        let len = handle.chars().count();
        if (1..=USER_HANDLE_MAX_LEN).contains(&len) {
            Ok(Self(handle))
        } else {
            Err(InvalidUserHandleError(handle))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserHandle {
    type Error = InvalidUserHandleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserHandle> for String {
    fn from(value: UserHandle) -> Self {
        value.0
    }
}
