//! Buffer sizing for streaming route I/O.
//!
//! These constants control memory usage vs I/O throughput tradeoffs.
//! Every open source holds one input buffer, so the per-input size is kept
//! well below the output size: a merge of hundreds of route files should
//! still stay within a few tens of megabytes.

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Low-memory output buffer size (256 KB).
pub const LOW_MEMORY_OUTPUT_BUFFER: usize = 256 * 1024;

/// Default input buffer size per source (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Low-memory input buffer size per source (64 KB).
pub const LOW_MEMORY_INPUT_BUFFER: usize = 64 * 1024;

/// Initial capacity of the scratch buffer a reader assembles records in.
/// Sufficient for a vehicle with a short inline route.
pub const DEFAULT_RECORD_BUFFER: usize = 1024;

/// Returns the appropriate output buffer size based on low_memory flag.
#[inline]
pub const fn output_buffer_size(low_memory: bool) -> usize {
    if low_memory {
        LOW_MEMORY_OUTPUT_BUFFER
    } else {
        DEFAULT_OUTPUT_BUFFER
    }
}

/// Returns the appropriate input buffer size based on low_memory flag.
#[inline]
pub const fn input_buffer_size(low_memory: bool) -> usize {
    if low_memory {
        LOW_MEMORY_INPUT_BUFFER
    } else {
        DEFAULT_INPUT_BUFFER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_memory_is_smaller() {
        assert!(input_buffer_size(true) < input_buffer_size(false));
        assert!(output_buffer_size(true) < output_buffer_size(false));
    }

    #[test]
    fn test_input_buffer_below_output_buffer() {
        assert!(input_buffer_size(false) <= output_buffer_size(false));
        assert!(input_buffer_size(true) <= output_buffer_size(true));
    }
}
