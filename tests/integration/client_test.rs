//! Integration tests for client creation
//!
//! These tests require a valid kubeconfig.
//! Run with: cargo test integration::client_test -- --ignored

use dscdiag::client::create_client;

/// Test creating client with default context
#[tokio::test]
#[ignore]
async fn test_create_client_default_context() {
    let client = create_client(None).await;
    assert!(client.is_ok(), "Should create client with default context");
}

/// Test creating client with invalid context
#[tokio::test]
#[ignore]
async fn test_create_client_invalid_context() {
    let client = create_client(Some("nonexistent-context-12345")).await;
    assert!(client.is_err(), "Should fail with nonexistent context");
}
