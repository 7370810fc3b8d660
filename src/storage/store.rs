use super::catalog::{Catalog, merge};
use super::source::{self, DefinitionSource};
use crate::core::Result;
use std::path::Path;
use tracing::debug;

/// Registry of raw definition sources.
///
/// Sources are registered at startup and frozen into a [`Catalog`] by
/// [`index`](Self::index). Registering another source drops the frozen
/// catalog so the next `index` call rebuilds it.
#[derive(Debug, Default)]
pub struct DefinitionStore {
    sources: Vec<DefinitionSource>,
    catalog: Option<Catalog>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, source: DefinitionSource) {
        debug!(owner = %source.owner_key(), "registered definition source");
        self.sources.push(source);
        self.catalog = None;
    }

    pub fn add_sources<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = DefinitionSource>,
    {
        for source in sources {
            self.add_source(source);
        }
    }

    /// Register the record (or array of records) in a JSON document.
    /// Returns how many records were added.
    pub fn load_json(&mut self, text: &str) -> Result<usize> {
        let sources = DefinitionSource::from_json(text)?;
        let count = sources.len();
        self.add_sources(sources);
        Ok(count)
    }

    /// Register every `*.sql.json` file of `dir`, in file-name order.
    pub fn scan_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let sources = source::read_dir(dir.as_ref())?;
        let count = sources.len();
        self.add_sources(sources);
        Ok(count)
    }

    pub fn sources(&self) -> &[DefinitionSource] {
        &self.sources
    }

    pub fn is_indexed(&self) -> bool {
        self.catalog.is_some()
    }

    /// Merge the registered sources into a catalog. Repeated calls without
    /// new sources return the catalog built the first time.
    pub fn index(&mut self) -> Result<&Catalog> {
        let catalog = match self.catalog.take() {
            Some(catalog) => catalog,
            None => {
                let catalog = Catalog::new(merge(&self.sources)?);
                debug!(
                    sources = self.sources.len(),
                    owners = catalog.len(),
                    "indexed definitions"
                );
                catalog
            }
        };
        Ok(self.catalog.insert(catalog))
    }

    /// The frozen catalog, if [`index`](Self::index) ran since the last
    /// registration.
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }
}
