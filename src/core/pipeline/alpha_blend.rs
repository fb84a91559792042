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

//! Alpha blending stage
//!
//! Each colour channel is computed as
//!
//! ```text
//! Cv = (((A - B) * C) >> 7) + D
//! ```
//!
//! where A, B and D each select a colour triple (source, framebuffer or zero)
//! and C selects an alpha (source, framebuffer or the FIX constant). The
//! arithmetic runs in `i32` and the result is wrapped to the 9-bit datapath;
//! negative results therefore wrap to large 9-bit values, which the clamp
//! stage later treats as overflow.
//!
//! Blending applies when PRIM.ABE is set and, with PABE set, only to
//! fragments whose source alpha MSB is 1. Otherwise the source colour passes
//! through untouched. This stage never changes the write mask.

use super::fragment::{FramebufferSample, Pixel, Rgb9};
use crate::core::error::{GsError, Result};
use serde::{Deserialize, Serialize};

/// Colour operand selector for A, B and D (ALPHA.A/B/D)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendColor {
    /// Source (fragment) colour
    #[default]
    Source,
    /// Framebuffer colour
    Framebuffer,
    /// Zero
    Zero,
}

impl BlendColor {
    /// Decode a 2-bit colour selector
    ///
    /// # Errors
    ///
    /// Encoding 3 is reserved and rejected with [`GsError::InvalidField`].
    pub fn from_bits(bits: u8, field: &'static str) -> Result<Self> {
        match bits & 3 {
            0 => Ok(BlendColor::Source),
            1 => Ok(BlendColor::Framebuffer),
            2 => Ok(BlendColor::Zero),
            other => Err(GsError::InvalidField {
                field,
                value: other as u64,
            }),
        }
    }

    fn select(self, source: Rgb9, framebuffer: &FramebufferSample) -> [i32; 3] {
        match self {
            BlendColor::Source => [source.r() as i32, source.g() as i32, source.b() as i32],
            BlendColor::Framebuffer => [
                framebuffer.r as i32,
                framebuffer.g as i32,
                framebuffer.b as i32,
            ],
            BlendColor::Zero => [0; 3],
        }
    }
}

/// Alpha operand selector for C (ALPHA.C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendAlpha {
    /// Source (fragment) alpha
    #[default]
    SourceAlpha,
    /// Framebuffer alpha
    FramebufferAlpha,
    /// ALPHA.FIX constant
    Fixed,
}

impl BlendAlpha {
    /// Decode the 2-bit C selector
    ///
    /// # Errors
    ///
    /// Encoding 3 is reserved and rejected with [`GsError::InvalidField`].
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits & 3 {
            0 => Ok(BlendAlpha::SourceAlpha),
            1 => Ok(BlendAlpha::FramebufferAlpha),
            2 => Ok(BlendAlpha::Fixed),
            other => Err(GsError::InvalidField {
                field: "ALPHA.C",
                value: other as u64,
            }),
        }
    }

    fn select(self, source_alpha: u8, framebuffer: &FramebufferSample, fix: u8) -> i32 {
        match self {
            BlendAlpha::SourceAlpha => source_alpha as i32,
            BlendAlpha::FramebufferAlpha => framebuffer.a as i32,
            BlendAlpha::Fixed => fix as i32,
        }
    }
}

/// Blend equation and enables (ALPHA, PABE, PRIM.ABE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// PRIM.ABE (or PRMODE.ABE): alpha blending enabled for the primitive
    pub enable: bool,

    /// PABE: blend only fragments whose alpha MSB is set
    pub per_pixel: bool,

    /// ALPHA.A
    pub a: BlendColor,

    /// ALPHA.B
    pub b: BlendColor,

    /// ALPHA.C
    pub c: BlendAlpha,

    /// ALPHA.D
    pub d: BlendColor,

    /// ALPHA.FIX
    pub fix: u8,
}

impl BlendConfig {
    /// True when a fragment with this source alpha is blended
    pub fn applies(&self, alpha: u8) -> bool {
        self.enable && (!self.per_pixel || alpha & 0x80 != 0)
    }
}

/// Evaluate the blend equation for one channel, wrapped to 9 bits
///
/// # Examples
///
/// ```
/// use gsrx::core::pipeline::blend_channel;
///
/// assert_eq!(blend_channel(200, 0, 128, 0), 200);
/// assert_eq!(blend_channel(255, 0, 128, 255), 510);
/// // 0 - 100 wraps to 412 in 9 bits
/// assert_eq!(blend_channel(0, 100, 128, 0), 412);
/// ```
#[inline]
pub fn blend_channel(a: i32, b: i32, c: i32, d: i32) -> u16 {
    let value = (((a - b) * c) >> 7) + d;
    (value & Rgb9::MASK as i32) as u16
}

/// Run the alpha blending stage
pub fn alpha_blend(config: &BlendConfig, sample: &FramebufferSample, pixel: Pixel) -> Pixel {
    if !config.applies(pixel.alpha) {
        return pixel;
    }

    let a = config.a.select(pixel.rgb, sample);
    let b = config.b.select(pixel.rgb, sample);
    let c = config.c.select(pixel.alpha, sample, config.fix);
    let d = config.d.select(pixel.rgb, sample);

    Pixel {
        rgb: Rgb9::new(
            blend_channel(a[0], b[0], c, d[0]),
            blend_channel(a[1], b[1], c, d[1]),
            blend_channel(a[2], b[2], c, d[2]),
        ),
        ..pixel
    }
}
