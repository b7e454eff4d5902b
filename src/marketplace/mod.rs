//! Marketplace services: accounts, product catalog and the blog
//!
//! Each service owns clones of the store collections it needs and is cheap to
//! clone into handlers.

pub mod accounts;
pub mod blog;
pub mod catalog;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::{OnTymError, Result};

pub use accounts::{Accounts, NewAccount, ProfileBody, ProfileUpdate, PublicUser};
pub use blog::{AuthorRef, Blog, CommentView, PostChanges, PostDraft, PostView};
pub use catalog::{Catalog, ProductChanges, ProductDraft, ProductView, SellerContact};

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// 16-hex-digit record id from the current time in microseconds. Ids handed
/// out by one process are strictly increasing, so they sort in creation order.
#[must_use]
pub fn new_id() -> String {
    let now = u64::try_from(Utc::now().timestamp_micros()).unwrap_or_default();
    let previous = match LAST_ID.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
        Some(now.max(last + 1))
    }) {
        Ok(last) | Err(last) => last,
    };
    format!("{:016x}", now.max(previous + 1))
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(OnTymError::validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_shape() {
        let id = new_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn test_new_ids_sort_in_creation_order() {
        let ids: Vec<String> = (0..1000).map(|_| new_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("title", "Hello").is_ok());
        let err = require_text("title", "  ").unwrap_err();
        assert_eq!(err.user_message(), "Invalid input: title is required");
    }
}
