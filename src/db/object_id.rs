use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Random bytes identifying this process, drawn once.
static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| {
    let random = ulid::Ulid::new().random().to_be_bytes();
    let mut bytes = [0u8; 5];
    bytes.copy_from_slice(&random[random.len() - 5..]);
    bytes
});

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| {
    let random = ulid::Ulid::new().random();
    // Only the low 24 bits are ever emitted.
    AtomicU32::new((random & 0x00FF_FFFF) as u32)
});

/// 12-byte document identifier, written as 24 lowercase hex characters.
///
/// Layout: 4-byte big-endian seconds timestamp, 5 process-unique bytes and a
/// 3-byte counter. In documents it appears as `{"$oid": "<hex>"}`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

/// A string that is not 24 hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseObjectIdError(pub String);

impl fmt::Display for ParseObjectIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a 24 character hex object id", self.0)
    }
}

impl std::error::Error for ParseObjectIdError {}

impl ObjectId {
    /// Generate a fresh id.
    #[must_use]
    pub fn new() -> Self {
        let seconds = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed).to_be_bytes();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count[1..]);
        Self(bytes)
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse 24 hex characters, either case.
    pub fn parse_str(s: &str) -> Result<Self, ParseObjectIdError> {
        let invalid = || ParseObjectIdError(s.to_string());
        if s.len() != 24 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Creation time in seconds since the epoch.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Extended-JSON form, `{"$oid": "<hex>"}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "$oid": self.to_hex() })
    }

    /// Read the extended-JSON form.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        map.get("$oid")?.as_str().and_then(|s| Self::parse_str(s).ok())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        id.to_value()
    }
}

/// Coerce a value to an id: an id value or a 24 hex character string.
///
/// Anything else gives `None`; coercion never fails loudly.
#[must_use]
pub fn object_id(value: &Value) -> Option<ObjectId> {
    match value {
        Value::String(s) => ObjectId::parse_str(s).ok(),
        Value::Object(_) => ObjectId::from_value(value),
        _ => None,
    }
}

/// Whether [`object_id`] would accept `value`.
#[must_use]
pub fn is_object_id(value: &Value) -> bool {
    object_id(value).is_some()
}

/// Coerce every valid id, dropping the rest.
#[must_use]
pub fn convert_ids(ids: &[Value]) -> Vec<ObjectId> {
    ids.iter().filter_map(object_id).collect()
}

/// Trim each string and keep those that are valid ids.
#[must_use]
pub fn filter_object_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| ObjectId::parse_str(id).is_ok())
        .map(str::to_string)
        .collect()
}
