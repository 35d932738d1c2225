/*!
Profile snapshot model: session identifiers, the identity block and the full snapshot.

A snapshot is kept as the host wrote it. Only the `info` block is typed; every other field
is carried through untouched so that a backup or restore never drops data the engine does
not understand.
*/

use crate::{AutoBackupError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Username prefix reserved for automated headless clients.
pub const HEADLESS_PREFIX: &str = "headless_";

/// Length of a host object id in hex characters.
const SESSION_ID_LEN: usize = 24;

/// Opaque identifier of one live session.
///
/// Well-formed ids are 24 ASCII hex characters. The id is used both as a store key and as a
/// path component, so anything else is rejected at the boundary. Parsing accepts either case
/// and keeps the lowercase form, so ids differing only in case name the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Parse and validate a session id
    ///
    /// # Example
    /// ```rust
    /// use autobackup_core::SessionId;
    ///
    /// let id = SessionId::parse("65f1c0ffee0123456789abcd").unwrap();
    /// assert_eq!(id.as_str(), "65f1c0ffee0123456789abcd");
    /// assert_eq!(SessionId::parse("65F1C0FFEE0123456789ABCD").unwrap(), id);
    /// assert!(SessionId::parse("../etc/passwd").is_err());
    /// ```
    pub fn parse<S: Into<String>>(raw: S) -> Result<Self> {
        let raw = raw.into();
        if Self::is_well_formed(&raw) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(AutoBackupError::InvalidSessionId(raw))
        }
    }

    /// True for exactly 24 ASCII hex characters
    pub fn is_well_formed(raw: &str) -> bool {
        raw.len() == SESSION_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = AutoBackupError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key of the identity block in the host format
const INFO_KEY: &str = "info";

/// Full state of one session at a point in time
///
/// Held as the raw top-level JSON object. The identity block is read through accessors
/// rather than typed fields, so explicit `null`s and missing keys both survive a round trip.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct SessionSnapshot {
    pub fields: Map<String, Value>,
}

impl SessionSnapshot {
    /// Build a minimal snapshot with just an identity block
    pub fn new(id: &SessionId, username: impl Into<String>) -> Self {
        let mut info = Map::new();
        info.insert("id".to_string(), Value::String(id.to_string()));
        info.insert("username".to_string(), Value::String(username.into()));

        let mut fields = Map::new();
        fields.insert(INFO_KEY.to_string(), Value::Object(info));
        Self { fields }
    }

    /// Attach an extra top-level field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Identity block, when present and an object
    pub fn info(&self) -> Option<&Map<String, Value>> {
        self.fields.get(INFO_KEY).and_then(Value::as_object)
    }

    /// Validated session id of this snapshot
    ///
    /// Fails when the identity block or its id is missing, or the id is malformed.
    pub fn session_id(&self) -> Result<SessionId> {
        let info = self
            .info()
            .ok_or_else(|| AutoBackupError::invalid_snapshot("missing info block"))?;

        let raw = info
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AutoBackupError::invalid_snapshot("missing info.id"))?;

        SessionId::parse(raw).map_err(|_| {
            AutoBackupError::invalid_snapshot(format!("malformed session id {raw:?}"))
        })
    }

    /// Username from the identity block, if present and non-empty
    pub fn username(&self) -> Option<&str> {
        self.info()
            .and_then(|info| info.get("username"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// True for usernames owned by automated headless clients, which are never backed up.
pub fn is_headless_username(username: &str) -> bool {
    username.starts_with(HEADLESS_PREFIX)
}
