//! Integration tests for the inventory write gateway.
//!
//! These exercise the write-safety contract end to end against a mock
//! platform: validation before any network call, optimistic-lock stale
//! rejection, the non-negative projection, and sign normalization.

use uuid::Uuid;

use slabworks_core::{InventoryItemId, LocationId, Sku};
use slabworks_integration_tests::{MockInventoryApi, test_pool};
use slabworks_sync::inventory::{
    ApiClass, ErrorCategory, InventoryWriteGateway, OperationKind, WriteRequest,
};

const ITEM: i64 = 801_424_551_002;
const LOCATION: i64 = 63_001;

fn request(kind: OperationKind, quantity: i64, expected: Option<i64>) -> WriteRequest {
    WriteRequest {
        kind,
        quantity,
        expected_available: expected,
        inventory_item_id: InventoryItemId::new(ITEM),
        location_id: LocationId::new(LOCATION),
        request_id: Uuid::new_v4(),
        sku: Some(Sku::new("PSA-10-82716401").expect("valid sku")),
        store_key: "slabworks.myshopify.com".to_string(),
        triggered_by: Some("tests".to_string()),
        source_function: "gateway_tests",
    }
}

// =============================================================================
// Delta operations
// =============================================================================

#[tokio::test]
async fn test_sale_decrements_available() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 5);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway.write(&request(OperationKind::Sale, 3, None)).await;

    assert!(result.success);
    assert_eq!(result.api_used, ApiClass::Delta);
    assert_eq!(result.previous_available, Some(5));
    assert_eq!(result.new_available, Some(2));
    assert!(!result.stale);
    assert_eq!(api.level(ITEM, LOCATION), 2);
}

#[tokio::test]
async fn test_insufficient_inventory_rejected_without_mutation() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 2);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway.write(&request(OperationKind::Sale, 5, None)).await;

    assert!(!result.success);
    let error = result.error.expect("must carry an error");
    assert_eq!(error.category, ErrorCategory::InsufficientInventory);
    assert_eq!(result.previous_available, Some(2));
    // Quantity untouched; no mutating call was issued.
    assert_eq!(api.level(ITEM, LOCATION), 2);
    assert_eq!(api.adjust_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_expectation_rejected_without_mutation() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 8);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway
        .write(&request(OperationKind::Receiving, 1, Some(10)))
        .await;

    assert!(!result.success);
    assert!(result.stale);
    assert_eq!(result.previous_available, Some(8));
    let error = result.error.expect("must carry an error");
    assert_eq!(error.category, ErrorCategory::StaleData);
    assert_eq!(api.level(ITEM, LOCATION), 8);
    assert_eq!(api.adjust_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_matching_expectation_allows_write() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 8);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway
        .write(&request(OperationKind::Receiving, 2, Some(8)))
        .await;

    assert!(result.success);
    assert_eq!(result.new_available, Some(10));
    assert_eq!(api.level(ITEM, LOCATION), 10);
}

#[tokio::test]
async fn test_subtractive_kinds_negate_caller_magnitude() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 9);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    // A caller passing a "negative" quantity for a sale still decrements.
    let result = gateway.write(&request(OperationKind::Sale, -4, None)).await;

    assert!(result.success);
    assert_eq!(api.level(ITEM, LOCATION), 5);
}

#[tokio::test]
async fn test_manual_adjust_passes_sign_through() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 9);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let down = gateway
        .write(&request(OperationKind::ManualAdjust, -4, None))
        .await;
    assert!(down.success);
    assert_eq!(api.level(ITEM, LOCATION), 5);

    let up = gateway
        .write(&request(OperationKind::ManualAdjust, 2, None))
        .await;
    assert!(up.success);
    assert_eq!(api.level(ITEM, LOCATION), 7);
}

// =============================================================================
// Absolute operations
// =============================================================================

#[tokio::test]
async fn test_enforce_graded_out_of_domain_makes_no_network_call() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 1);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway
        .write(&request(OperationKind::EnforceGraded, 2, None))
        .await;

    assert!(!result.success);
    let error = result.error.expect("must carry an error");
    assert_eq!(error.category, ErrorCategory::ValidationError);
    // Rejected before any platform traffic: no read, no write.
    assert_eq!(api.read_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(api.set_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(api.level(ITEM, LOCATION), 1);
}

#[tokio::test]
async fn test_enforce_graded_pins_slab_to_sold() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 1);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway
        .write(&request(OperationKind::EnforceGraded, 0, None))
        .await;

    assert!(result.success);
    assert_eq!(result.api_used, ApiClass::Absolute);
    assert_eq!(api.level(ITEM, LOCATION), 0);
}

#[tokio::test]
async fn test_cross_channel_zero_rejects_nonzero_target() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 4);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway
        .write(&request(OperationKind::CrossChannelZero, 1, None))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.expect("must carry an error").category,
        ErrorCategory::ValidationError
    );
    assert_eq!(api.set_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_initial_set_establishes_quantity() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 0);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway
        .write(&request(OperationKind::InitialSet, 12, None))
        .await;

    assert!(result.success);
    assert_eq!(api.level(ITEM, LOCATION), 12);
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_failed_read_fails_closed() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 6);
    api.fail_all_reads();
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway.write(&request(OperationKind::Sale, 1, None)).await;

    assert!(!result.success);
    assert_eq!(
        result.error.expect("must carry an error").category,
        ErrorCategory::ServerError
    );
    // No blind write happened.
    assert_eq!(api.adjust_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(api.level(ITEM, LOCATION), 6);
}

#[tokio::test]
async fn test_platform_omitting_new_value_falls_back_to_projection() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 5);
    api.omit_reported_value();
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let result = gateway.write(&request(OperationKind::Sale, 3, None)).await;

    assert!(result.success);
    assert_eq!(result.new_available, Some(2));
}

#[tokio::test]
async fn test_result_carries_correlation_id_and_sanitized_message() {
    let api = MockInventoryApi::new().with_level(ITEM, LOCATION, 2);
    let gateway = InventoryWriteGateway::new(&api, test_pool());

    let req = request(OperationKind::Sale, 5, None);
    let result = gateway.write(&req).await;

    assert_eq!(result.request_id, req.request_id);
    let message = result.client_message();
    assert!(message.contains("INSUFFICIENT_INVENTORY"));
    assert!(message.contains(&req.request_id.to_string()));
    // Raw diagnostic detail stays out of the client message.
    assert!(!message.contains("drive available below zero"));
}
