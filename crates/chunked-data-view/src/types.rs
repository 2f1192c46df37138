//! Core types shared by parts, extractors and the view.

use serde::{Deserialize, Serialize};

/// Layout of one record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayout {
    /// Number of values in one record.
    pub count_values: usize,
    /// Width of one value in the output buffer.
    pub bytes_per_value: usize,
}

impl DataLayout {
    pub fn new(count_values: usize, bytes_per_value: usize) -> Self {
        Self {
            count_values,
            bytes_per_value,
        }
    }

    /// Bytes occupied by one record.
    pub fn record_bytes(&self) -> usize {
        self.count_values * self.bytes_per_value
    }
}

/// How many records a chunk access actually deposited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChunkFill {
    pub filled: usize,
    pub expected: usize,
}

impl ChunkFill {
    pub fn new(filled: usize, expected: usize) -> Self {
        Self { filled, expected }
    }

    /// True when every expected record was written.
    pub fn is_complete(&self) -> bool {
        self.filled == self.expected
    }

    /// Number of records that were expected but not written.
    pub fn missing(&self) -> usize {
        self.expected.saturating_sub(self.filled)
    }

    /// Sum of two fills.
    pub fn combine(self, other: ChunkFill) -> ChunkFill {
        ChunkFill {
            filled: self.filled + other.filled,
            expected: self.expected + other.expected,
        }
    }
}

impl std::fmt::Display for ChunkFill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} fields", self.filled, self.expected)
    }
}
