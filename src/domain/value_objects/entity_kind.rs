use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of entity kinds the client mirrors. Values read back from the
/// store that do not match a known kind decode as `Unknown` so that a stale
/// row never prevents the rest of the queue from loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    Provider,
    Client,
    Product,
    Invoice,
    Unknown(String),
}

impl EntityKind {
    pub const KNOWN: [EntityKind; 4] = [
        EntityKind::Provider,
        EntityKind::Client,
        EntityKind::Product,
        EntityKind::Invoice,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Provider => "provider",
            EntityKind::Client => "client",
            EntityKind::Product => "product",
            EntityKind::Invoice => "invoice",
            EntityKind::Unknown(value) => value.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EntityKind::Unknown(_))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for EntityKind {
    fn from(value: &str) -> Self {
        match value {
            "provider" => EntityKind::Provider,
            "client" => EntityKind::Client,
            "product" => EntityKind::Product,
            "invoice" => EntityKind::Invoice,
            other => EntityKind::Unknown(other.to_string()),
        }
    }
}

impl From<String> for EntityKind {
    fn from(value: String) -> Self {
        EntityKind::from(value.as_str())
    }
}

impl From<EntityKind> for String {
    fn from(value: EntityKind) -> Self {
        value.as_str().to_string()
    }
}
