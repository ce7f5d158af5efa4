//! Sink unit types: handle of an editable unit and options applied when creating one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Addresses one independently editable unit (e.g. a chat message). Transport-specific id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitHandle {
    pub id: String,
}

impl UnitHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Options applied to a newly created unit. Streaming sessions apply them to follow-up units only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOptions {
    /// Deliver without notifying the recipient.
    #[serde(default)]
    pub silent: bool,
    /// Ask the transport to prevent forwarding/saving of the unit.
    #[serde(default)]
    pub protect_content: bool,
}

impl UnitOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }
}
