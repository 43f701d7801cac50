//! Render-time like-state derivation.

use std::collections::HashSet;

/// Whether the current user has liked `listing_id`. Pure membership test;
/// like state lives in the profile-sourced set, not on listing records.
pub fn is_liked(listing_id: &str, liked_ids: &HashSet<String>) -> bool {
    liked_ids.contains(listing_id)
}
