// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the pixel pipeline model
//!
//! The pipeline stages themselves are total functions and never fail; a failed
//! alpha, destination alpha or depth test is reported through the write mask.
//! Errors only arise at the edges: decoding register writes, loading draw
//! configurations and fragment streams, and addressing the reference memory.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, GsError>;

/// Errors raised by configuration loading, register decode and memory access
#[derive(Debug, Error)]
pub enum GsError {
    /// A register field held a value outside its enumerated range
    #[error("Invalid value {value:#X} for field {field}")]
    InvalidField { field: &'static str, value: u64 },

    /// A dither matrix cell does not fit in a signed 3-bit value
    #[error("Dither offset {value} at row {row}, column {column} is outside -4..=3")]
    DitherOutOfRange { row: usize, column: usize, value: i8 },

    /// A pipeline array was requested with zero lanes
    #[error("Pipeline array requires at least one lane")]
    NoLanes,

    /// A fragment coordinate fell outside the reference memory
    #[error("Pixel ({x}, {y}) is outside the {width}x{height} buffer")]
    OutOfBounds {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },

    /// Worker pool could not be sized for the requested lanes
    #[error("Lane count {0} exceeds the worker pool limit")]
    TooManyLanes(usize),

    /// A lockstep clock supplied a different number of inputs than lanes
    #[error("Expected {expected} lane inputs, got {actual}")]
    LaneCountMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
