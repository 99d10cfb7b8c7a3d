//! Message catalog injected into widgets at construction. Lookup is
//! synchronous; a missing entry falls back to the msgid itself.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

#[derive(Debug, Default, Clone)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    pub fn new(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }

    pub fn gettext(&self, msgid: &str) -> String {
        self.messages
            .get(msgid)
            .cloned()
            .unwrap_or_else(|| msgid.to_string())
    }

    /// Shared untranslated catalog for hosts without localization wired.
    pub fn empty() -> Arc<Catalog> {
        static EMPTY: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(Catalog::default()));
        EMPTY.clone()
    }
}
