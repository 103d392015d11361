use crate::metadata::AssetMetadata;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Original,
    DuplicateOf(&'a AssetMetadata),
}

#[cfg(test)]
impl Resolution<'_> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Resolution::DuplicateOf(_))
    }
}

/// Canonical asset per content hash for the lifetime of one scan.
///
/// The first asset resolved for a hash stays canonical; entries are never
/// replaced or removed.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    canonical: HashMap<String, AssetMetadata>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, hash: &str, metadata: &AssetMetadata) -> Resolution<'_> {
        match self.canonical.entry(hash.to_string()) {
            Entry::Occupied(entry) => {
                log::trace!("Hash {} already seen, {} is a duplicate", hash, metadata.id);
                Resolution::DuplicateOf(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                entry.insert(metadata.clone());
                Resolution::Original
            }
        }
    }

    #[cfg(test)]
    pub fn canonical(&self, hash: &str) -> Option<&AssetMetadata> {
        self.canonical.get(hash)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}
