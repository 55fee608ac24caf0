use super::model::{Classification, SessionStatus, Timestamp};

/// Seconds since last activity under which a detached session counts as alive
pub const ALIVE_THRESHOLD_SECS: i64 = 600;

/// Classify a session that belongs to a known working tree.
///
/// Orphan sessions never reach this function; the associator labels them directly.
pub fn classify(status: &SessionStatus, now: Timestamp) -> Classification {
    if status.attached {
        return Classification::Attached;
    }

    if now - status.last_activity < ALIVE_THRESHOLD_SECS {
        return Classification::Alive;
    }

    Classification::Idle
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = 1_700_000_000;

    fn detached(last_activity: Timestamp) -> SessionStatus {
        SessionStatus {
            attached: false,
            pane_count: 1,
            last_activity,
            ..SessionStatus::default()
        }
    }

    #[test]
    fn test_attached_wins_over_staleness() {
        let status = SessionStatus {
            attached: true,
            last_activity: 0,
            ..SessionStatus::default()
        };
        assert_eq!(classify(&status, NOW), Classification::Attached);
    }

    #[test]
    fn test_alive_threshold_boundary() {
        assert_eq!(classify(&detached(NOW - 599), NOW), Classification::Alive);
        assert_eq!(classify(&detached(NOW - 600), NOW), Classification::Idle);
    }

    #[test]
    fn test_unknown_activity_is_idle() {
        assert_eq!(classify(&detached(0), NOW), Classification::Idle);
    }
}
