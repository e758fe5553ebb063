//! Professional name lookup used to label feedback and rating buttons.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::info;

use crate::errors::StoreError;
use crate::registry::Registry;

/// Professional id (the registrant's user id) to full name
#[derive(Debug, Default)]
pub struct ProfessionalDirectory {
    names: RwLock<HashMap<String, String>>,
}

impl ProfessionalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            names: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Rebuild from every record in the registry. On failure the previous
    /// contents stay in place.
    pub async fn reload(&self, registry: &Registry) -> Result<usize, StoreError> {
        let records = registry.all().await?;
        let names: HashMap<String, String> = records
            .into_iter()
            .filter(|r| !r.full_name.trim().is_empty())
            .map(|r| (r.user_id.to_string(), r.full_name))
            .collect();

        let count = names.len();
        *self.names.write().unwrap() = names;
        info!(entries = count, "Professional directory loaded");
        Ok(count)
    }

    /// Full name for `id`, or the id itself when unknown
    pub fn display_name(&self, id: &str) -> String {
        self.names
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
