/*!
Snapshot codecs.

The codec turns a live [`SessionSnapshot`] into the text written to disk and back. Whether
the output is compact is not decided here; the host's "compress profiles" feature flag is
passed straight through to [`JsonCodec::new`].
*/

use crate::{Result, SessionSnapshot};

/// Serialization abstraction for profile snapshots
///
/// Implementations must be full fidelity: `decode(encode(s))` yields a snapshot equal to `s`.
pub trait SnapshotCodec: Send + Sync {
    /// Serialize a snapshot to text
    ///
    /// An empty string is treated by callers as a failed serialization.
    fn encode(&self, snapshot: &SessionSnapshot) -> Result<String>;

    /// Deserialize a snapshot from raw file contents
    fn decode(&self, data: &[u8]) -> Result<SessionSnapshot>;

    /// Short name of the format, used in logs
    fn format_name(&self) -> &str;
}

/// JSON codec
///
/// # Example
/// ```rust
/// use autobackup_core::{JsonCodec, SessionId, SessionSnapshot, SnapshotCodec};
///
/// let codec = JsonCodec::new(true);
/// let id = SessionId::parse("65f1c0ffee0123456789abcd")?;
/// let text = codec.encode(&SessionSnapshot::new(&id, "operator"))?;
/// assert!(!text.contains('\n'));
/// # Ok::<(), autobackup_core::AutoBackupError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    compact: bool,
}

impl JsonCodec {
    /// Create a JSON codec; `compact` drops all indentation
    pub fn new(compact: bool) -> Self {
        Self { compact }
    }

    /// Indented output, matching how the host writes profiles by default
    pub fn pretty() -> Self {
        Self::new(false)
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }
}

impl SnapshotCodec for JsonCodec {
    fn encode(&self, snapshot: &SessionSnapshot) -> Result<String> {
        let text = if self.compact {
            serde_json::to_string(snapshot)?
        } else {
            serde_json::to_string_pretty(snapshot)?
        };
        Ok(text)
    }

    fn decode(&self, data: &[u8]) -> Result<SessionSnapshot> {
        Ok(serde_json::from_slice(data)?)
    }

    fn format_name(&self) -> &str {
        if self.compact {
            "json-compact"
        } else {
            "json"
        }
    }
}
