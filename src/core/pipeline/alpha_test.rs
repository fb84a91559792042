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

//! Alpha test stage
//!
//! Compares the fragment's source alpha against TEST.AREF and, depending on
//! TEST.AFAIL, narrows a subset of the write-enable flags. Colour, alpha,
//! position and depth pass through unchanged.
//!
//! # Fail Modes
//!
//! | AFAIL    | COLOR  | ALPHA  | DEPTH  |
//! |----------|--------|--------|--------|
//! | KEEP     | gated  | gated  | gated  |
//! | FB_ONLY  | kept   | kept   | gated  |
//! | ZB_ONLY  | gated  | gated  | kept   |
//! | RGB_ONLY | kept   | gated  | gated  |
//!
//! RGB_ONLY only applies to PSMCT32 framebuffers; for every other format it
//! behaves exactly like FB_ONLY.

use super::config::PixelFormat;
use super::fragment::{Pixel, WriteMask};
use serde::{Deserialize, Serialize};

/// Alpha comparison (TEST.ATST)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaTestMode {
    /// All pixels fail
    #[default]
    Never,
    /// All pixels pass
    Always,
    /// alpha < AREF passes
    Less,
    /// alpha <= AREF passes
    Lequal,
    /// alpha == AREF passes
    Equal,
    /// alpha >= AREF passes
    Gequal,
    /// alpha > AREF passes
    Greater,
    /// alpha != AREF passes
    Notequal,
}

impl AlphaTestMode {
    /// Decode the 3-bit ATST field (every encoding is defined)
    pub fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => AlphaTestMode::Never,
            1 => AlphaTestMode::Always,
            2 => AlphaTestMode::Less,
            3 => AlphaTestMode::Lequal,
            4 => AlphaTestMode::Equal,
            5 => AlphaTestMode::Gequal,
            6 => AlphaTestMode::Greater,
            _ => AlphaTestMode::Notequal,
        }
    }

    /// Evaluate the comparison for a source alpha and reference
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::pipeline::AlphaTestMode;
    ///
    /// assert!(AlphaTestMode::Gequal.passes(0x80, 0x40));
    /// assert!(!AlphaTestMode::Less.passes(0x80, 0x40));
    /// assert!(!AlphaTestMode::Never.passes(0, 0));
    /// ```
    pub fn passes(self, alpha: u8, reference: u8) -> bool {
        match self {
            AlphaTestMode::Never => false,
            AlphaTestMode::Always => true,
            AlphaTestMode::Less => alpha < reference,
            AlphaTestMode::Lequal => alpha <= reference,
            AlphaTestMode::Equal => alpha == reference,
            AlphaTestMode::Gequal => alpha >= reference,
            AlphaTestMode::Greater => alpha > reference,
            AlphaTestMode::Notequal => alpha != reference,
        }
    }
}

/// Processing applied when the alpha test fails (TEST.AFAIL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaFailMode {
    /// Neither framebuffer nor depth buffer is updated
    #[default]
    Keep,
    /// Only the framebuffer is updated
    FbOnly,
    /// Only the depth buffer is updated
    ZbOnly,
    /// Only framebuffer RGB is updated (PSMCT32 only)
    RgbOnly,
}

impl AlphaFailMode {
    /// Decode the 2-bit AFAIL field (every encoding is defined)
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => AlphaFailMode::Keep,
            1 => AlphaFailMode::FbOnly,
            2 => AlphaFailMode::ZbOnly,
            _ => AlphaFailMode::RgbOnly,
        }
    }

    /// Write-enable flags a failed test clears for the given framebuffer
    /// format
    pub fn gated_flags(self, frame_psm: PixelFormat) -> WriteMask {
        match self {
            AlphaFailMode::Keep => WriteMask::all(),
            AlphaFailMode::FbOnly => WriteMask::DEPTH,
            AlphaFailMode::ZbOnly => WriteMask::COLOR | WriteMask::ALPHA,
            AlphaFailMode::RgbOnly if frame_psm.is_rgba32() => WriteMask::ALPHA | WriteMask::DEPTH,
            AlphaFailMode::RgbOnly => WriteMask::DEPTH,
        }
    }
}

/// Alpha test fields of the TEST register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaTestConfig {
    /// TEST.ATE
    pub enable: bool,

    /// TEST.ATST
    pub mode: AlphaTestMode,

    /// TEST.AREF
    pub reference: u8,

    /// TEST.AFAIL
    pub fail: AlphaFailMode,
}

impl AlphaTestConfig {
    /// Test result for a source alpha; a disabled test always passes
    pub fn passes(&self, alpha: u8) -> bool {
        !self.enable || self.mode.passes(alpha, self.reference)
    }
}

/// Run the alpha test stage
///
/// The fail mode is applied whether or not the test is enabled; a disabled
/// test passes, so nothing is cleared.
pub fn alpha_test(config: &AlphaTestConfig, frame_psm: PixelFormat, pixel: Pixel) -> Pixel {
    let pass = config.passes(pixel.alpha);
    if !pass {
        log::trace!(
            "Alpha test failed at ({}, {}): alpha=0x{:02X} aref=0x{:02X} {:?}/{:?}",
            pixel.x.pixel(),
            pixel.y.pixel(),
            pixel.alpha,
            config.reference,
            config.mode,
            config.fail
        );
    }

    Pixel {
        write: pixel.write.gate(config.fail.gated_flags(frame_psm), pass),
        ..pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::Fragment;

    fn pixel(alpha: u8) -> Pixel {
        Pixel::from(Fragment::at(1, 1).with_color(10, 20, 30, alpha))
    }

    fn config(mode: AlphaTestMode, reference: u8, fail: AlphaFailMode) -> AlphaTestConfig {
        AlphaTestConfig {
            enable: true,
            mode,
            reference,
            fail,
        }
    }

    #[test]
    fn test_comparisons() {
        let cases = [
            (AlphaTestMode::Less, [false, false, true]),
            (AlphaTestMode::Lequal, [false, true, true]),
            (AlphaTestMode::Equal, [false, true, false]),
            (AlphaTestMode::Gequal, [true, true, false]),
            (AlphaTestMode::Greater, [true, false, false]),
            (AlphaTestMode::Notequal, [true, false, true]),
        ];

        // alpha above, equal to and below the reference
        for (mode, expected) in cases {
            for (alpha, want) in [0x41u8, 0x40, 0x3F].into_iter().zip(expected) {
                assert_eq!(mode.passes(alpha, 0x40), want, "{:?} alpha={:#X}", mode, alpha);
            }
        }
    }

    #[test]
    fn test_disabled_always_passes() {
        let cfg = AlphaTestConfig {
            enable: false,
            mode: AlphaTestMode::Never,
            reference: 0,
            fail: AlphaFailMode::Keep,
        };
        let out = alpha_test(&cfg, PixelFormat::Psmct32, pixel(0));
        assert_eq!(out.write, WriteMask::all());
    }

    #[test]
    fn test_keep_clears_everything() {
        let cfg = config(AlphaTestMode::Never, 0, AlphaFailMode::Keep);
        let out = alpha_test(&cfg, PixelFormat::Psmct32, pixel(0xFF));
        assert_eq!(out.write, WriteMask::empty());
    }

    #[test]
    fn test_fb_only_clears_depth() {
        let cfg = config(AlphaTestMode::Never, 0, AlphaFailMode::FbOnly);
        let out = alpha_test(&cfg, PixelFormat::Psmct32, pixel(0));
        assert_eq!(out.write, WriteMask::COLOR | WriteMask::ALPHA);
    }

    #[test]
    fn test_zb_only_clears_color_and_alpha() {
        let cfg = config(AlphaTestMode::Never, 0, AlphaFailMode::ZbOnly);
        let out = alpha_test(&cfg, PixelFormat::Psmct32, pixel(0));
        assert_eq!(out.write, WriteMask::DEPTH);
    }

    #[test]
    fn test_rgb_only_depends_on_format() {
        let cfg = config(AlphaTestMode::Never, 0, AlphaFailMode::RgbOnly);

        let out = alpha_test(&cfg, PixelFormat::Psmct32, pixel(0));
        assert_eq!(out.write, WriteMask::COLOR);

        for psm in [PixelFormat::Psmct24, PixelFormat::Psmct16, PixelFormat::Psmct16s] {
            let out = alpha_test(&cfg, psm, pixel(0));
            assert_eq!(out.write, WriteMask::COLOR | WriteMask::ALPHA, "{:?}", psm);
        }
    }

    #[test]
    fn test_never_widens_flags() {
        let cfg = config(AlphaTestMode::Always, 0, AlphaFailMode::Keep);
        let mut px = pixel(0x80);
        px.write = WriteMask::ALPHA;
        assert_eq!(alpha_test(&cfg, PixelFormat::Psmct32, px).write, WriteMask::ALPHA);
    }

    #[test]
    fn test_values_pass_through() {
        let cfg = config(AlphaTestMode::Never, 0, AlphaFailMode::Keep);
        let px = pixel(0x33);
        let out = alpha_test(&cfg, PixelFormat::Psmct32, px);
        assert_eq!(out.rgb, px.rgb);
        assert_eq!(out.alpha, px.alpha);
        assert_eq!((out.x, out.y, out.z), (px.x, px.y, px.z));
    }

    #[test]
    fn test_field_decode() {
        assert_eq!(AlphaTestMode::from_bits(5), AlphaTestMode::Gequal);
        assert_eq!(AlphaTestMode::from_bits(0xF), AlphaTestMode::Notequal);
        assert_eq!(AlphaFailMode::from_bits(3), AlphaFailMode::RgbOnly);
    }
}
