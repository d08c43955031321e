//! Identifier assigned to a certificate request by the object store.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Store-assigned uid of a certificate request.
///
/// Only requests that have been persisted carry one, so the engine never
/// invents a uid. The nil UUID is rejected.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestUid(Uuid);

impl RequestUid {
    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl TryFrom<Uuid> for RequestUid {
    type Error = Error;

    fn try_from(uuid: Uuid) -> Result<Self, Self::Error> {
        if uuid.is_nil() {
            return Err(Error::InvalidObject {
                kind: "request uid",
                reason: "uid cannot be nil".into(),
            });
        }
        Ok(Self(uuid))
    }
}

impl FromStr for RequestUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())?.try_into()
    }
}

impl TryFrom<String> for RequestUid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RequestUid> for String {
    fn from(uid: RequestUid) -> Self {
        uid.to_string()
    }
}

impl Display for RequestUid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.hyphenated(), f)
    }
}
