use crate::metadata::{AssetMetadata, UNRESOLVED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Native,
    NonNative,
}

/// An asset is non-native when no maker could be resolved from EXIF or
/// container metadata. Missing maker data is the only signal available.
pub fn classify(metadata: &AssetMetadata) -> Origin {
    if metadata.lens_maker == UNRESOLVED {
        Origin::NonNative
    } else {
        Origin::Native
    }
}
