//! Security validation constants and helpers
//!
//! Limits applied while resolving paths and materializing archive entries,
//! so a hostile archive (zip bomb, absurd nesting) cannot exhaust memory or
//! recurse without bound.

use crate::Error;

/// Maximum number of container ancestors a single path may have
pub const MAX_NESTING_DEPTH: usize = 16;

/// Maximum bytes materialized for a single entry (256 MB)
pub const MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

/// Maximum head length read for signature matching
pub const MAX_SIGNATURE_SPAN: usize = 4096;

/// Maximum length of a single path segment
pub const MAX_SEGMENT_LENGTH: usize = 4096;

/// Validate that a size is within allocation limits
///
/// # Security
/// Prevents memory exhaustion from entries that declare huge sizes
pub fn validate_allocation_size(size: u64, limit: u64, context: &str) -> crate::Result<usize> {
    if size > limit {
        return Err(Error::limit_exceeded(format!(
            "{} size {} exceeds limit {}",
            context, size, limit
        )));
    }

    size.try_into()
        .map_err(|_| Error::limit_exceeded(format!("{} size exceeds platform limits", context)))
}

/// Validate container nesting depth
pub fn validate_depth(depth: usize, limit: usize) -> crate::Result<()> {
    if depth > limit {
        return Err(Error::NestingTooDeep { depth, limit });
    }
    Ok(())
}

/// Validate a single atomic path segment
///
/// # Security
/// Rejects NUL bytes and control characters, which no filesystem or archive
/// name should carry and which confuse downstream consumers.
pub fn validate_segment(segment: &str) -> crate::Result<()> {
    if segment.contains('\0') {
        return Err(Error::invalid_path("Path segment contains null byte"));
    }

    if segment.chars().any(|c| c.is_control() && c != '\t') {
        return Err(Error::invalid_path(format!(
            "Path segment {:?} contains control characters",
            segment
        )));
    }

    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err(Error::invalid_path(format!(
            "Path segment length {} exceeds limit {}",
            segment.len(),
            MAX_SEGMENT_LENGTH
        )));
    }

    Ok(())
}
