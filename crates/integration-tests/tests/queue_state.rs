//! Logical tests for the sync queue state machine and dead-letter records.
//!
//! The queue's database transitions (CAS claim, requeue, mark failed) are
//! exercised against a live database in staging; these tests pin down the
//! pure decision logic and the snapshot shapes those transitions persist.

use chrono::Utc;
use uuid::Uuid;

use slabworks_core::Sku;
use slabworks_sync::db::dead_letter;
use slabworks_sync::db::sync_queue::{QueueAction, QueueItem, QueueStatus};
use slabworks_sync::inventory::{ErrorCategory, WriteError};
use slabworks_sync::queue::{Disposition, disposition, retry_backoff};

fn exhausted_item() -> QueueItem {
    QueueItem {
        id: Uuid::new_v4(),
        sku: Sku::new("BGS-95-0042").ok(),
        action: QueueAction::Update,
        payload: serde_json::json!({
            "op": "inventory_write",
            "kind": "sale",
            "quantity": 1,
            "expected_available": null,
            "inventory_item_id": 52_382_195,
            "location_id": 63_001,
            "store_key": "slabworks.myshopify.com",
            "source_function": "intake",
        }),
        status: QueueStatus::Processing,
        retry_count: 5,
        max_retries: 5,
        retry_after: None,
        error_message: Some("Server error 503: upstream timeout".to_string()),
        error_category: Some("SERVER_ERROR".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// =============================================================================
// Status state machine (logical)
// =============================================================================

/// Valid transitions:
/// queued -> processing -> completed
/// queued -> processing -> queued (retry)
/// queued -> processing -> failed (terminal, dead-lettered)
#[test]
fn test_valid_state_transitions() {
    let valid_transitions = [
        (QueueStatus::Queued, QueueStatus::Processing),
        (QueueStatus::Processing, QueueStatus::Completed),
        (QueueStatus::Processing, QueueStatus::Queued),
        (QueueStatus::Processing, QueueStatus::Failed),
    ];

    // The transition logic itself lives in guarded SQL updates; here we pin
    // that every modeled transition moves between distinct states.
    for (from, to) in valid_transitions {
        assert_ne!(from, to);
    }
}

#[test]
fn test_terminal_states_are_distinct() {
    // completed and failed are terminal; failed always pairs with exactly
    // one dead-letter row.
    assert_ne!(QueueStatus::Completed, QueueStatus::Failed);
    assert_ne!(QueueStatus::Completed, QueueStatus::Queued);
    assert_ne!(QueueStatus::Failed, QueueStatus::Queued);
}

#[test]
fn test_action_names_match_database_representation() {
    assert_eq!(QueueAction::Create.as_str(), "create");
    assert_eq!(QueueAction::Update.as_str(), "update");
    assert_eq!(QueueAction::Delete.as_str(), "delete");
}

// =============================================================================
// Retry budget
// =============================================================================

#[test]
fn test_retry_budget_allows_exactly_max_retries_requeues() {
    let max_retries = 3;

    // Attempts 1..=3 fail with retry_count 0, 1, 2: all re-queue.
    for retry_count in 0..max_retries {
        assert!(matches!(
            disposition(ErrorCategory::NetworkError, retry_count, max_retries),
            Disposition::Retry(_)
        ));
    }

    // The (max_retries + 1)-th failure dead-letters.
    assert_eq!(
        disposition(ErrorCategory::NetworkError, max_retries, max_retries),
        Disposition::DeadLetter
    );
}

#[test]
fn test_backoff_prefers_longer_waits_for_rate_limits() {
    for retry_count in 0..6 {
        assert!(
            retry_backoff(ErrorCategory::RateLimit, retry_count)
                >= retry_backoff(ErrorCategory::ServerError, retry_count)
        );
    }
}

// =============================================================================
// Dead-letter snapshots
// =============================================================================

#[test]
fn test_dead_letter_snapshot_preserves_item() {
    let item = exhausted_item();
    let snapshot = dead_letter::item_snapshot(&item);

    assert_eq!(snapshot["id"], serde_json::json!(item.id));
    assert_eq!(snapshot["sku"], serde_json::json!("BGS-95-0042"));
    assert_eq!(snapshot["action"], "update");
    assert_eq!(snapshot["retry_count"], 5);
    assert_eq!(snapshot["max_retries"], 5);
    // The full payload rides along for manual recovery.
    assert_eq!(snapshot["payload"]["op"], "inventory_write");
    assert_eq!(snapshot["payload"]["inventory_item_id"], 52_382_195);
}

#[test]
fn test_dead_letter_failure_context_carries_error_and_category() {
    let item = exhausted_item();
    let error = WriteError::new(ErrorCategory::ServerError, "Server error 503: upstream timeout");
    let context = dead_letter::failure_context(&item, &error);

    assert_eq!(context["category"], "SERVER_ERROR");
    assert_eq!(context["error"], "Server error 503: upstream timeout");
    assert_eq!(context["retry_count"], 5);
    assert!(context["failed_at"].is_string());
}
