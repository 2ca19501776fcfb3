//! Track selection
//!
//! Identity resolution over the in-memory collection. Lookups are pure and
//! scan in collection order, so results are deterministic for a given
//! store: when an identity could match several tracks, the first in
//! document order wins.

use djcrate_common::{Collection, Track};

/// Find a track by identity: exact filename match, or the identity as a
/// trailing segment of the relative path. A blank identity matches nothing.
pub fn find_by_identity<'a>(collection: &'a Collection, identity: &str) -> Option<&'a Track> {
    find_index_by_identity(collection, identity).map(|i| &collection.tracks[i])
}

/// Index variant of [`find_by_identity`], for callers that mutate.
pub fn find_index_by_identity(collection: &Collection, identity: &str) -> Option<usize> {
    if identity.trim().is_empty() {
        return None;
    }
    collection
        .tracks
        .iter()
        .position(|t| t.filename == identity || t.relative_path.ends_with(identity))
}

/// First track with no assigned tags, in collection order.
pub fn find_first_untagged(collection: &Collection) -> Option<&Track> {
    find_first_untagged_index(collection).map(|i| &collection.tracks[i])
}

/// Index variant of [`find_first_untagged`].
pub fn find_first_untagged_index(collection: &Collection) -> Option<usize> {
    collection.tracks.iter().position(|t| t.is_untagged())
}
