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

//! Destination alpha test stage
//!
//! Compares the most significant bit of the fragment's alpha with TEST.DATM
//! and narrows all three write-enable flags on failure. The test is skipped
//! when disabled or when the framebuffer (PSMCT24) has no alpha channel.

use super::config::PixelFormat;
use super::fragment::{Pixel, WriteMask};
use serde::{Deserialize, Serialize};

/// Destination alpha test fields of the TEST register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestAlphaConfig {
    /// TEST.DATE
    pub enable: bool,

    /// TEST.DATM: value of the alpha MSB that passes
    pub pass_msb: bool,
}

impl DestAlphaConfig {
    /// Test result for an alpha value against a framebuffer format
    pub fn passes(&self, alpha: u8, frame_psm: PixelFormat) -> bool {
        if !self.enable || !frame_psm.has_alpha() {
            return true;
        }
        (alpha & 0x80 != 0) == self.pass_msb
    }
}

/// Run the destination alpha test stage
pub fn dest_alpha_test(config: &DestAlphaConfig, frame_psm: PixelFormat, pixel: Pixel) -> Pixel {
    let pass = config.passes(pixel.alpha, frame_psm);
    if !pass {
        log::trace!(
            "Destination alpha test failed at ({}, {}): alpha=0x{:02X} datm={}",
            pixel.x.pixel(),
            pixel.y.pixel(),
            pixel.alpha,
            config.pass_msb as u8
        );
    }

    Pixel {
        write: pixel.write.gate(WriteMask::all(), pass),
        ..pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::Fragment;

    fn pixel(alpha: u8) -> Pixel {
        Pixel::from(Fragment::at(0, 0).with_color(1, 2, 3, alpha))
    }

    #[test]
    fn test_msb_comparison() {
        let cfg = DestAlphaConfig {
            enable: true,
            pass_msb: true,
        };
        assert_eq!(
            dest_alpha_test(&cfg, PixelFormat::Psmct32, pixel(0x80)).write,
            WriteMask::all()
        );
        assert_eq!(
            dest_alpha_test(&cfg, PixelFormat::Psmct32, pixel(0x7F)).write,
            WriteMask::empty()
        );

        let cfg = DestAlphaConfig {
            enable: true,
            pass_msb: false,
        };
        assert_eq!(
            dest_alpha_test(&cfg, PixelFormat::Psmct16, pixel(0x7F)).write,
            WriteMask::all()
        );
        assert_eq!(
            dest_alpha_test(&cfg, PixelFormat::Psmct16, pixel(0xFF)).write,
            WriteMask::empty()
        );
    }

    #[test]
    fn test_skipped_without_alpha_channel() {
        for pass_msb in [false, true] {
            let cfg = DestAlphaConfig {
                enable: true,
                pass_msb,
            };
            for alpha in [0x00, 0x7F, 0x80, 0xFF] {
                let out = dest_alpha_test(&cfg, PixelFormat::Psmct24, pixel(alpha));
                assert_eq!(out.write, WriteMask::all());
            }
        }
    }

    #[test]
    fn test_disabled_is_noop() {
        let cfg = DestAlphaConfig {
            enable: false,
            pass_msb: true,
        };
        let out = dest_alpha_test(&cfg, PixelFormat::Psmct32, pixel(0));
        assert_eq!(out, pixel(0));
    }

    #[test]
    fn test_gates_only_incoming_flags() {
        let cfg = DestAlphaConfig {
            enable: true,
            pass_msb: true,
        };
        let mut px = pixel(0x80);
        px.write = WriteMask::DEPTH;
        assert_eq!(
            dest_alpha_test(&cfg, PixelFormat::Psmct32, px).write,
            WriteMask::DEPTH
        );
    }
}
