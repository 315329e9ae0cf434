use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    Unknown(String),
}

impl OperationType {
    pub fn as_str(&self) -> &str {
        match self {
            OperationType::Create => "CREATE",
            OperationType::Update => "UPDATE",
            OperationType::Delete => "DELETE",
            OperationType::Unknown(value) => value.as_str(),
        }
    }

    /// UPDATE and DELETE address an existing server record.
    pub fn requires_entity_id(&self) -> bool {
        matches!(self, OperationType::Update | OperationType::Delete)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for OperationType {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "CREATE" => OperationType::Create,
            "UPDATE" => OperationType::Update,
            "DELETE" => OperationType::Delete,
            _ => OperationType::Unknown(value.to_string()),
        }
    }
}

impl From<String> for OperationType {
    fn from(value: String) -> Self {
        OperationType::from(value.as_str())
    }
}

impl From<OperationType> for String {
    fn from(value: OperationType) -> Self {
        value.as_str().to_string()
    }
}
