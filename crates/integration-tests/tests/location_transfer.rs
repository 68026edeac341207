//! Integration tests for the location transfer saga.
//!
//! The two invariants under test: conservation on success
//! (`source_after + dest_after == source_before + dest_before`) and
//! restoration on rollback (`source_after == source_before`).

use uuid::Uuid;

use slabworks_core::{InventoryItemId, Sku};
use slabworks_integration_tests::{MockInventoryApi, test_pool};
use slabworks_sync::inventory::{
    ErrorCategory, InventoryWriteGateway, LocationTransferOrchestrator, TransferItem,
    TransferRequest, TransferStatus,
};

const ITEM: i64 = 44_210_997;
const OTHER_ITEM: i64 = 44_211_020;
const SOURCE: i64 = 63_001;
const DESTINATION: i64 = 63_002;

fn transfer(items: Vec<TransferItem>) -> TransferRequest {
    TransferRequest {
        transfer_id: Uuid::new_v4(),
        source_location: slabworks_core::LocationId::new(SOURCE),
        destination_location: slabworks_core::LocationId::new(DESTINATION),
        store_key: "slabworks.myshopify.com".to_string(),
        triggered_by: Some("warehouse@slabworks.cards".to_string()),
        items,
    }
}

fn line(item: i64, quantity: i64) -> TransferItem {
    TransferItem {
        inventory_item_id: InventoryItemId::new(item),
        sku: Sku::new(format!("RAW-{item}")).ok(),
        quantity,
    }
}

#[tokio::test]
async fn test_successful_transfer_conserves_total() {
    let api = MockInventoryApi::new()
        .with_level(ITEM, SOURCE, 10)
        .with_level(ITEM, DESTINATION, 0);
    let orchestrator =
        LocationTransferOrchestrator::new(InventoryWriteGateway::new(&api, test_pool()));

    let outcome = orchestrator.execute(&transfer(vec![line(ITEM, 3)])).await;

    assert_eq!(outcome.status, TransferStatus::Completed);
    let result = &outcome.items[0];
    assert!(result.success);
    assert!(!result.rolled_back);
    assert_eq!(result.source_before, Some(10));
    assert_eq!(result.source_after, Some(7));
    assert_eq!(result.destination_before, Some(0));
    assert_eq!(result.destination_after, Some(3));

    // Conservation.
    assert_eq!(
        result.source_after.unwrap() + result.destination_after.unwrap(),
        result.source_before.unwrap() + result.destination_before.unwrap()
    );
    assert_eq!(api.level(ITEM, SOURCE), 7);
    assert_eq!(api.level(ITEM, DESTINATION), 3);
}

#[tokio::test]
async fn test_destination_failure_rolls_back_source() {
    let api = MockInventoryApi::new()
        .with_level(ITEM, SOURCE, 10)
        .with_level(ITEM, DESTINATION, 0);
    // Only the destination leg fails; the source leg and the compensating
    // restore both succeed.
    api.fail_adjust_at(ITEM, DESTINATION);
    let orchestrator =
        LocationTransferOrchestrator::new(InventoryWriteGateway::new(&api, test_pool()));

    let outcome = orchestrator.execute(&transfer(vec![line(ITEM, 3)])).await;

    assert_eq!(outcome.status, TransferStatus::Failed);
    let result = &outcome.items[0];
    assert!(!result.success);
    assert!(result.rolled_back);
    assert_eq!(result.source_before, Some(10));
    assert_eq!(result.source_after, Some(10));
    assert_eq!(result.destination_after, Some(0));

    // Platform state restored.
    assert_eq!(api.level(ITEM, SOURCE), 10);
    assert_eq!(api.level(ITEM, DESTINATION), 0);
}

#[tokio::test]
async fn test_insufficient_source_fails_before_any_mutation() {
    let api = MockInventoryApi::new()
        .with_level(ITEM, SOURCE, 2)
        .with_level(ITEM, DESTINATION, 0);
    let orchestrator =
        LocationTransferOrchestrator::new(InventoryWriteGateway::new(&api, test_pool()));

    let outcome = orchestrator.execute(&transfer(vec![line(ITEM, 5)])).await;

    assert_eq!(outcome.status, TransferStatus::Failed);
    let result = &outcome.items[0];
    assert_eq!(
        result.error.as_ref().expect("must carry an error").category,
        ErrorCategory::InsufficientInventory
    );
    assert_eq!(api.adjust_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(api.level(ITEM, SOURCE), 2);
    assert_eq!(api.level(ITEM, DESTINATION), 0);
}

#[tokio::test]
async fn test_item_failures_are_independent() {
    let api = MockInventoryApi::new()
        .with_level(ITEM, SOURCE, 10)
        .with_level(ITEM, DESTINATION, 0)
        .with_level(OTHER_ITEM, SOURCE, 1)
        .with_level(OTHER_ITEM, DESTINATION, 0);
    let orchestrator =
        LocationTransferOrchestrator::new(InventoryWriteGateway::new(&api, test_pool()));

    // Second line asks for more than the source has; first line must still
    // move.
    let outcome = orchestrator
        .execute(&transfer(vec![line(ITEM, 4), line(OTHER_ITEM, 3)]))
        .await;

    assert_eq!(outcome.status, TransferStatus::Partial);
    assert!(outcome.items[0].success);
    assert!(!outcome.items[1].success);
    assert_eq!(api.level(ITEM, SOURCE), 6);
    assert_eq!(api.level(ITEM, DESTINATION), 4);
    assert_eq!(api.level(OTHER_ITEM, SOURCE), 1);
}

#[tokio::test]
async fn test_unknown_destination_fails_item_before_mutation() {
    // Destination level does not exist on the platform.
    let api = MockInventoryApi::new().with_level(ITEM, SOURCE, 10);
    let orchestrator =
        LocationTransferOrchestrator::new(InventoryWriteGateway::new(&api, test_pool()));

    let outcome = orchestrator.execute(&transfer(vec![line(ITEM, 3)])).await;

    assert_eq!(outcome.status, TransferStatus::Failed);
    let result = &outcome.items[0];
    assert_eq!(
        result.error.as_ref().expect("must carry an error").category,
        ErrorCategory::NotFound
    );
    assert_eq!(api.level(ITEM, SOURCE), 10);
    assert_eq!(api.adjust_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}
