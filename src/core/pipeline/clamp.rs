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

//! Colour clamp and alpha correction stage
//!
//! Narrows the 9-bit colour channels back to 8 bits. With COLCLAMP set each
//! channel saturates at 255; otherwise only the low 8 bits are kept. Alpha
//! has its MSB replaced by FBA. Write-enable flags pass through unchanged.

use super::fragment::{Pixel, Rgb9};
use serde::{Deserialize, Serialize};

/// Colour narrowing mode (COLCLAMP.CLAMP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorClamp {
    /// Keep the low 8 bits (wrap)
    #[default]
    Mask,
    /// Saturate at 255
    Clamp,
}

impl ColorClamp {
    /// Decode the COLCLAMP bit
    pub fn from_bits(bits: u8) -> Self {
        if bits & 1 != 0 {
            ColorClamp::Clamp
        } else {
            ColorClamp::Mask
        }
    }

    /// Narrow one 9-bit channel to 8 bits
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::pipeline::ColorClamp;
    ///
    /// assert_eq!(ColorClamp::Clamp.narrow(300), 255);
    /// assert_eq!(ColorClamp::Mask.narrow(300), 44);
    /// assert_eq!(ColorClamp::Clamp.narrow(17), 17);
    /// ```
    #[inline]
    pub fn narrow(self, value: u16) -> u16 {
        match self {
            ColorClamp::Clamp => value.min(0xFF),
            ColorClamp::Mask => value & 0xFF,
        }
    }
}

/// Clamp fields (COLCLAMP, FBA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClampConfig {
    /// COLCLAMP
    pub mode: ColorClamp,

    /// FBA: value forced into the alpha MSB
    pub fba: bool,
}

impl ClampConfig {
    /// Apply alpha correction
    #[inline]
    pub fn correct_alpha(&self, alpha: u8) -> u8 {
        (alpha & 0x7F) | ((self.fba as u8) << 7)
    }
}

/// Run the colour clamp stage
pub fn clamp(config: &ClampConfig, pixel: Pixel) -> Pixel {
    let mode = config.mode;
    Pixel {
        rgb: Rgb9::new(
            mode.narrow(pixel.rgb.r()),
            mode.narrow(pixel.rgb.g()),
            mode.narrow(pixel.rgb.b()),
        ),
        alpha: config.correct_alpha(pixel.alpha),
        ..pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{Fragment, WriteMask};

    fn pixel(rgb: Rgb9, alpha: u8) -> Pixel {
        Pixel {
            rgb,
            alpha,
            ..Pixel::from(Fragment::at(0, 0))
        }
    }

    #[test]
    fn test_clamp_saturates() {
        let cfg = ClampConfig {
            mode: ColorClamp::Clamp,
            fba: false,
        };
        let out = clamp(&cfg, pixel(Rgb9::new(300, 255, 511), 0));
        assert_eq!((out.rgb.r(), out.rgb.g(), out.rgb.b()), (255, 255, 255));
    }

    #[test]
    fn test_mask_keeps_low_byte() {
        let cfg = ClampConfig::default();
        let out = clamp(&cfg, pixel(Rgb9::new(300, 256, 42), 0));
        assert_eq!((out.rgb.r(), out.rgb.g(), out.rgb.b()), (44, 0, 42));
    }

    #[test]
    fn test_fba_forces_alpha_msb() {
        let set = ClampConfig {
            mode: ColorClamp::Mask,
            fba: true,
        };
        let clear = ClampConfig::default();

        assert_eq!(clamp(&set, pixel(Rgb9::default(), 0x00)).alpha, 0x80);
        assert_eq!(clamp(&set, pixel(Rgb9::default(), 0x7F)).alpha, 0xFF);
        assert_eq!(clamp(&clear, pixel(Rgb9::default(), 0x80)).alpha, 0x00);
        assert_eq!(clamp(&clear, pixel(Rgb9::default(), 0xC1)).alpha, 0x41);
    }

    #[test]
    fn test_output_always_fits_eight_bits() {
        for mode in [ColorClamp::Mask, ColorClamp::Clamp] {
            let cfg = ClampConfig { mode, fba: false };
            for v in 0..=Rgb9::MASK {
                let out = clamp(&cfg, pixel(Rgb9::new(v, v, v), 0));
                assert!(out.rgb.r() <= 0xFF, "{:?} {}", mode, v);
            }
        }
    }

    #[test]
    fn test_write_mask_and_depth_pass_through() {
        let mut px = pixel(Rgb9::new(1, 2, 3), 4);
        px.write = WriteMask::ALPHA | WriteMask::DEPTH;
        px.z = 0x1234;
        let out = clamp(&ClampConfig::default(), px);
        assert_eq!(out.write, px.write);
        assert_eq!(out.z, 0x1234);
    }
}
