//! Canonical structured event names used across `busd-link`.

// Chain mutation events.
pub const CHAIN_FILTER_INSERT_OK: &str = "chain_filter_insert_ok";
pub const CHAIN_FILTER_INSERT_FAILED: &str = "chain_filter_insert_failed";
pub const CHAIN_FILTER_ROLLBACK: &str = "chain_filter_rollback";
pub const CHAIN_FILTER_UNLINK: &str = "chain_filter_unlink";

// Connect lifecycle events.
pub const LINK_SETUP_START: &str = "link_setup_start";
pub const LINK_SETUP_OK: &str = "link_setup_ok";
pub const LINK_START: &str = "link_start";
pub const LINK_STOP: &str = "link_stop";
pub const LINK_STARTED: &str = "link_started";
pub const LINK_STOPPED: &str = "link_stopped";

// Address pool events.
pub const ADDR_ACQUIRE_OK: &str = "addr_acquire_ok";
pub const ADDR_RELEASE: &str = "addr_release";

// Transport edge events.
pub const TRANSPORT_SEND_FAILED: &str = "transport_send_failed";

// Forwarding and filter events.
pub const FORWARD_DROPPED_EXPIRED: &str = "forward_dropped_expired";
pub const FILTER_LOG_TELEGRAM: &str = "filter_log_telegram";
pub const FILTER_LOG_BUSMONITOR: &str = "filter_log_busmonitor";

// Diagnostic sink rendering.
pub const DIAGNOSTIC: &str = "diagnostic";
