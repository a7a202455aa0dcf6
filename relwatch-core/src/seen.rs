//! Seen/unseen resolution
//!
//! Pure join of a repository's latest release with the user's last seen
//! event. No I/O happens here; [`crate::loader::SeenStatusBatch`] feeds it
//! in bulk.

use crate::models::{Release, SeenEvent, SeenStatus};

/// Compute the seen status for one repository and one user.
///
/// - No latest release: never unseen; the last-seen fields are passed through.
/// - Otherwise unseen unless the last seen release *is* the latest release.
///
/// The comparison is by id against current state, so if the latest release
/// is rolled back to one the user already saw, the status flips back to seen.
pub fn resolve(latest_release: Option<&Release>, last_seen: Option<&SeenEvent>) -> SeenStatus {
    let is_unseen = match (latest_release, last_seen) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(latest), Some(seen)) => seen.release_id != latest.id,
    };

    SeenStatus {
        release_id: last_seen.map(|s| s.release_id),
        seen_at: last_seen.map(|s| s.seen_at),
        is_unseen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReleaseId, RepositoryId, UserId};
    use chrono::{TimeZone, Utc};

    fn release(id: i64) -> Release {
        Release {
            id: ReleaseId(id),
            repository_id: RepositoryId(1),
            tag_name: format!("v{id}"),
            published_at: None,
            notes: None,
            html_url: None,
        }
    }

    fn seen(release_id: i64) -> SeenEvent {
        SeenEvent {
            user_id: UserId::from_raw(Some("alice")),
            repository_id: RepositoryId(1),
            release_id: ReleaseId(release_id),
            seen_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn nothing_known_is_seen() {
        assert_eq!(resolve(None, None), SeenStatus::default());
    }

    #[test]
    fn no_release_never_unseen_but_keeps_last_seen() {
        let event = seen(3);
        let status = resolve(None, Some(&event));
        assert!(!status.is_unseen);
        assert_eq!(status.release_id, Some(ReleaseId(3)));
        assert_eq!(status.seen_at, Some(event.seen_at));
    }

    #[test]
    fn release_never_seen_is_unseen() {
        let status = resolve(Some(&release(1)), None);
        assert!(status.is_unseen);
        assert_eq!(status.release_id, None);
        assert_eq!(status.seen_at, None);
    }

    #[test]
    fn seen_latest_is_not_unseen() {
        let status = resolve(Some(&release(2)), Some(&seen(2)));
        assert!(!status.is_unseen);
        assert_eq!(status.release_id, Some(ReleaseId(2)));
    }

    #[test]
    fn older_seen_release_is_unseen_and_reports_the_older_one() {
        let status = resolve(Some(&release(2)), Some(&seen(1)));
        assert!(status.is_unseen);
        assert_eq!(status.release_id, Some(ReleaseId(1)));
    }

    #[test]
    fn rollback_to_seen_release_flips_back() {
        // saw A(1); B(2) arrives; B disappears so A is latest again
        let seen_a = seen(1);
        assert!(resolve(Some(&release(2)), Some(&seen_a)).is_unseen);
        assert!(!resolve(Some(&release(1)), Some(&seen_a)).is_unseen);
    }
}
