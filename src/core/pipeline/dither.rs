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

//! Dithering stage
//!
//! Adds a signed offset from the 4×4 DIMX matrix to the red, green and blue
//! channels. The cell is chosen by the integer pixel position:
//! row `y mod 4`, column `x mod 4`. The same offset is applied to all three
//! channels, and the 9-bit result is handed to the clamp stage.

use super::fragment::{Pixel, Q12_4};
use crate::core::error::{GsError, Result};
use serde::{Deserialize, Serialize};

/// 4×4 matrix of signed 3-bit dither offsets (DIMX)
///
/// Every cell is guaranteed to lie in `-4..=3`.
///
/// # Examples
///
/// ```
/// use gsrx::core::pipeline::{DitherMatrix, Q12_4};
///
/// let m = DitherMatrix::ORDERED;
/// assert_eq!(m.offset(Q12_4::from_pixel(1), Q12_4::from_pixel(0)), 2);
/// assert_eq!(m.offset(Q12_4::from_pixel(5), Q12_4::from_pixel(4)), 2);
/// assert!(DitherMatrix::new([[4, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "[[i8; 4]; 4]", into = "[[i8; 4]; 4]")]
pub struct DitherMatrix([[i8; 4]; 4]);

impl DitherMatrix {
    /// Smallest representable offset
    pub const MIN: i8 = -4;

    /// Largest representable offset
    pub const MAX: i8 = 3;

    /// All-zero matrix (dithering has no effect)
    pub const ZERO: Self = Self([[0; 4]; 4]);

    /// Ordered dither pattern commonly loaded by PS2 titles
    pub const ORDERED: Self = Self([
        [-4, 2, -3, 3],
        [0, -2, 1, -1],
        [-3, 3, -4, 2],
        [1, -1, 0, -2],
    ]);

    /// Build a matrix from rows of offsets
    ///
    /// # Errors
    ///
    /// [`GsError::DitherOutOfRange`] for the first cell outside `-4..=3`.
    pub fn new(rows: [[i8; 4]; 4]) -> Result<Self> {
        for (row, cells) in rows.iter().enumerate() {
            for (column, &value) in cells.iter().enumerate() {
                if !(Self::MIN..=Self::MAX).contains(&value) {
                    return Err(GsError::DitherOutOfRange { row, column, value });
                }
            }
        }
        Ok(Self(rows))
    }

    /// Sign-extend a 3-bit field into an offset
    pub fn offset_from_bits(bits: u8) -> i8 {
        ((bits << 5) as i8) >> 5
    }

    /// Offset at a matrix cell (row and column taken modulo 4)
    pub fn cell(&self, row: usize, column: usize) -> i8 {
        self.0[row & 3][column & 3]
    }

    /// Offset for a pixel position
    pub fn offset(&self, x: Q12_4, y: Q12_4) -> i8 {
        self.cell(y.pixel() as usize, x.pixel() as usize)
    }

    /// Matrix rows
    pub fn rows(&self) -> &[[i8; 4]; 4] {
        &self.0
    }
}

impl TryFrom<[[i8; 4]; 4]> for DitherMatrix {
    type Error = GsError;

    fn try_from(rows: [[i8; 4]; 4]) -> Result<Self> {
        Self::new(rows)
    }
}

impl From<DitherMatrix> for [[i8; 4]; 4] {
    fn from(matrix: DitherMatrix) -> Self {
        matrix.0
    }
}

/// Dithering fields (DTHE, DIMX)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DitherConfig {
    /// DTHE
    pub enable: bool,

    /// DIMX
    pub matrix: DitherMatrix,
}

/// Run the dithering stage
pub fn dither(config: &DitherConfig, pixel: Pixel) -> Pixel {
    if !config.enable {
        return pixel;
    }

    let offset = config.matrix.offset(pixel.x, pixel.y) as i16;
    Pixel {
        rgb: pixel.rgb.map(|v| v.wrapping_add_signed(offset)),
        ..pixel
    }
}
