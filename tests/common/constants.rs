//! Shared constants for end-to-end tests

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a spawned server to answer `GET /`
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Per-request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Upstream catalog
// ============================================================================

/// Access token the mock upstream accepts
pub const VALID_ACCESS_TOKEN: &str = "shpat_test_token";

/// Admin API version the test server is configured with
pub const TEST_API_VERSION: &str = "2025-01";
