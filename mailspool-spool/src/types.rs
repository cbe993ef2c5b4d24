use std::sync::{LazyLock, Mutex, PoisonError};

/// Suffix of a queued message record
pub const MESSAGE_SUFFIX: &str = ".message";
/// Suffix of a record claimed by a flusher
pub const SENDING_SUFFIX: &str = ".message.sending";
/// Suffix of a record that could not be decoded during a flush
pub const CORRUPT_SUFFIX: &str = ".message.corrupt";
/// Prefix of a record that is still being written
pub const TEMP_PREFIX: &str = ".tmp_";

static GENERATOR: LazyLock<Mutex<ulid::Generator>> =
    LazyLock::new(|| Mutex::new(ulid::Generator::new()));

/// Identifier for a spooled message
///
/// A ULID that doubles as the record's file name. Identifiers generated by one
/// process are strictly increasing, so sorting them yields enqueue order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpooledMessageId {
    id: ulid::Ulid,
}

impl SpooledMessageId {
    /// Parse a message ID from a filename like `01ARYZ6S41....message`
    ///
    /// Rejects path separators, `..` and anything whose stem is not a ULID.
    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::from_filename_with_suffix(filename, MESSAGE_SUFFIX)
    }

    /// Parse a message ID from a claimed record (`....message.sending`)
    pub fn from_claimed_filename(filename: &str) -> Option<Self> {
        Self::from_filename_with_suffix(filename, SENDING_SUFFIX)
    }

    fn from_filename_with_suffix(filename: &str, suffix: &str) -> Option<Self> {
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return None;
        }

        let stem = filename.strip_suffix(suffix)?;
        let id = ulid::Ulid::from_string(stem).ok()?;

        Some(Self { id })
    }

    /// Create a new message ID from a ULID
    #[must_use]
    pub const fn new(id: ulid::Ulid) -> Self {
        Self { id }
    }

    /// Generate a new identifier, greater than every one this process generated before
    #[must_use]
    pub fn generate() -> Self {
        let mut generator = GENERATOR.lock().unwrap_or_else(PoisonError::into_inner);
        let id = generator.generate().unwrap_or_else(|_| ulid::Ulid::new());
        Self { id }
    }

    /// Get the underlying ULID
    #[must_use]
    pub const fn ulid(&self) -> ulid::Ulid {
        self.id
    }

    /// Milliseconds since the Unix epoch at which this ID was generated
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.id.timestamp_ms()
    }

    /// File name of the queued record
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}{MESSAGE_SUFFIX}", self.id)
    }

    /// File name of the record while claimed
    #[must_use]
    pub fn claimed_filename(&self) -> String {
        format!("{}{SENDING_SUFFIX}", self.id)
    }
}

impl std::fmt::Display for SpooledMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl serde::Serialize for SpooledMessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for SpooledMessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let id = ulid::Ulid::from_string(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { id })
    }
}
