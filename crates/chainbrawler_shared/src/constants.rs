//! # Constants
//!
//! Defaults baked into the client. Most of them can be overridden through
//! the core crate's configuration.

// =============================================================================
// ERROR TAXONOMY
// =============================================================================

/// Sentinel code for failures that carried no recognizable code.
///
/// Sits outside every contract error band.
pub const UNKNOWN_ERROR_CODE: u32 = 5000;

// =============================================================================
// DISPLAY
// =============================================================================

/// Native currency symbol appended to formatted amounts.
pub const CURRENCY_SYMBOL: &str = "CFX";

/// Decimals of the native token (wei per ether = 10^18).
pub const TOKEN_DECIMALS: u32 = 18;

/// Decimals kept when formatting amounts for display.
pub const DISPLAY_DECIMALS: u32 = 4;

// =============================================================================
// EPOCHS
// =============================================================================

/// Assumed epoch length when the ledger cannot report time remaining.
pub const FALLBACK_EPOCH_SECS: u64 = 24 * 60 * 60;
