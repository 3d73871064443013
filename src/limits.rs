//! Shared hard limits and default timings.
//!
//! This module centralizes:
//! - Reply size limits for the line and binary readers
//! - Default adapter timeouts
//! - Bounds on error-queue draining

use std::time::Duration;

// =============================================================================
// Timeout Constants
// =============================================================================

/// Default read/write timeout for adapters (2 seconds).
///
/// Drivers that declare their own timeout (L303SP, 8808A) override this.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay the Fluke 8808A needs after `*RST` before it answers again.
pub const FLUKE_RESET_SETTLE: Duration = Duration::from_secs(3);

// =============================================================================
// Size Limits
// =============================================================================

/// Maximum allowed line reply in bytes (default: 1MB).
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Maximum allowed binary block in bytes (default: 64MB).
///
/// Large enough for a full-memory waveform dump of the DHO800.
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Maximum number of `SYST:ERR?` queries issued while draining the queue.
///
/// Real instruments hold at most a few dozen entries; a device that never
/// answers `0,"No error"` would otherwise loop forever.
pub const MAX_ERROR_QUEUE_DEPTH: usize = 64;
