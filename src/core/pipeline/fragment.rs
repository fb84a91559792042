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

//! Fragment data model
//!
//! A fragment enters the pipeline with 8-bit colour channels, is widened to
//! 9 bits while alpha blending and dithering may overflow, and leaves the
//! clamp stage with 8-bit channels again. Position is carried in the GS
//! Q12.4 fixed-point format and depth as an opaque 32-bit ordinal.
//!
//! # Write Mask
//!
//! Every fragment carries three write-enable flags (colour, alpha, depth).
//! They start as the render-enable flags supplied by the rasterizer and the
//! test stages may only clear them:
//!
//! ```text
//! AlphaTest ─► DestAlphaTest ─► ZTest ─► AlphaBlend ─► Dither ─► Clamp
//!   narrows       narrows       narrows   passes        passes    passes
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Q12.4 fixed-point screen coordinate
///
/// 12 integer bits and 4 fractional bits packed in 16 bits, as delivered by
/// the rasterizer.
///
/// # Examples
///
/// ```
/// use gsrx::core::pipeline::Q12_4;
///
/// let x = Q12_4::from_pixel(37);
/// assert_eq!(x.raw(), 37 << 4);
/// assert_eq!(x.pixel(), 37);
/// assert_eq!(Q12_4(0x0258).pixel(), 0x25);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Q12_4(pub u16);

impl Q12_4 {
    /// Number of fractional bits
    pub const FRACTION_BITS: u32 = 4;

    /// Build a coordinate on an integer pixel boundary
    ///
    /// Only the low 12 bits of `pixel` are representable.
    pub const fn from_pixel(pixel: u16) -> Self {
        Self((pixel & 0x0FFF) << Self::FRACTION_BITS)
    }

    /// Raw 16-bit encoding
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Integer pixel coordinate (the 12 integer bits)
    pub const fn pixel(self) -> u16 {
        self.0 >> Self::FRACTION_BITS
    }

    /// Fractional part in sixteenths of a pixel
    pub const fn fraction(self) -> u16 {
        self.0 & 0xF
    }
}

bitflags! {
    /// Write-enable flags carried by every fragment
    ///
    /// Test stages narrow this set; nothing in the pipeline ever inserts a flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct WriteMask: u8 {
        /// Fragment may write the framebuffer RGB channels
        const COLOR = 1 << 0;
        /// Fragment may write the framebuffer alpha channel
        const ALPHA = 1 << 1;
        /// Fragment may write the depth buffer
        const DEPTH = 1 << 2;
    }
}

impl WriteMask {
    /// Clear `flags` when `pass` is false
    ///
    /// Flags outside `flags` are left untouched, so the result is always a
    /// subset of `self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::pipeline::WriteMask;
    ///
    /// let mask = WriteMask::all().gate(WriteMask::DEPTH, false);
    /// assert_eq!(mask, WriteMask::COLOR | WriteMask::ALPHA);
    /// assert_eq!(mask.gate(WriteMask::all(), true), mask);
    /// ```
    #[inline]
    pub fn gate(self, flags: WriteMask, pass: bool) -> WriteMask {
        if pass {
            self
        } else {
            self.difference(flags)
        }
    }
}

/// 9-bit-per-channel colour used between alpha blending and clamping
///
/// Each channel is stored in a `u16` and kept within `0..=0x1FF`; arithmetic
/// that leaves that range wraps, matching the width of the hardware datapath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb9 {
    r: u16,
    g: u16,
    b: u16,
}

impl Rgb9 {
    /// Mask selecting the 9 channel bits
    pub const MASK: u16 = 0x1FF;

    /// Build a colour, wrapping each channel to 9 bits
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self {
            r: r & Self::MASK,
            g: g & Self::MASK,
            b: b & Self::MASK,
        }
    }

    /// Zero-extend an 8-bit colour
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as u16, g as u16, b as u16)
    }

    /// Red channel (0-511)
    pub const fn r(self) -> u16 {
        self.r
    }

    /// Green channel (0-511)
    pub const fn g(self) -> u16 {
        self.g
    }

    /// Blue channel (0-511)
    pub const fn b(self) -> u16 {
        self.b
    }

    /// Apply `f` to every channel, wrapping the result to 9 bits
    pub fn map(self, mut f: impl FnMut(u16) -> u16) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }
}

/// A fragment as produced by the rasterizer
///
/// # Examples
///
/// ```
/// use gsrx::core::pipeline::{Fragment, WriteMask};
///
/// let frag = Fragment::at(10, 20).with_color(10, 20, 30, 0x80).with_z(0x1234);
/// assert_eq!(frag.x.pixel(), 10);
/// assert_eq!(frag.write, WriteMask::all());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// X coordinate (Q12.4)
    pub x: Q12_4,

    /// Y coordinate (Q12.4)
    pub y: Q12_4,

    /// Depth ordinal, compared as an unsigned integer
    #[serde(default)]
    pub z: u32,

    /// Red channel
    pub r: u8,

    /// Green channel
    pub g: u8,

    /// Blue channel
    pub b: u8,

    /// Alpha channel
    pub a: u8,

    /// Render-enable flags supplied by the rasterizer
    #[serde(default = "WriteMask::all")]
    pub write: WriteMask,
}

impl Fragment {
    /// Black, half-alpha fragment at an integer pixel position with every
    /// write enabled
    pub fn at(x: u16, y: u16) -> Self {
        Self {
            x: Q12_4::from_pixel(x),
            y: Q12_4::from_pixel(y),
            z: 0,
            r: 0,
            g: 0,
            b: 0,
            a: 0x80,
            write: WriteMask::all(),
        }
    }

    /// Replace the colour and alpha channels
    pub fn with_color(mut self, r: u8, g: u8, b: u8, a: u8) -> Self {
        self.r = r;
        self.g = g;
        self.b = b;
        self.a = a;
        self
    }

    /// Replace the depth ordinal
    pub fn with_z(mut self, z: u32) -> Self {
        self.z = z;
        self
    }

    /// Replace the render-enable flags
    pub fn with_write(mut self, write: WriteMask) -> Self {
        self.write = write;
        self
    }
}

/// Framebuffer and depth-buffer contents at a fragment's coordinate
///
/// Supplied by the memory collaborator; used only as blend and test operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FramebufferSample {
    /// Stored red channel
    pub r: u8,

    /// Stored green channel
    pub g: u8,

    /// Stored blue channel
    pub b: u8,

    /// Stored alpha channel
    pub a: u8,

    /// Stored depth ordinal (reference value for the depth test)
    pub z: u32,
}

/// One unit of pipeline input: a fragment plus the memory it will be tested
/// and blended against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    /// Incoming fragment
    pub fragment: Fragment,

    /// Framebuffer/depth-buffer sample at the fragment's coordinate
    #[serde(default)]
    pub sample: FramebufferSample,
}

impl From<Fragment> for PipelineInput {
    fn from(fragment: Fragment) -> Self {
        Self {
            fragment,
            sample: FramebufferSample::default(),
        }
    }
}

/// Fragment state between pipeline stages
///
/// Every stage consumes and produces a `Pixel`. Colour is 9 bits wide for the
/// whole trip; after the clamp stage each channel fits in 8 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    /// X coordinate (Q12.4)
    pub x: Q12_4,

    /// Y coordinate (Q12.4)
    pub y: Q12_4,

    /// Depth ordinal
    pub z: u32,

    /// Colour channels
    pub rgb: Rgb9,

    /// Alpha channel
    pub alpha: u8,

    /// Write-enable flags
    pub write: WriteMask,
}

impl From<Fragment> for Pixel {
    fn from(fragment: Fragment) -> Self {
        Self {
            x: fragment.x,
            y: fragment.y,
            z: fragment.z,
            rgb: Rgb9::from_rgb8(fragment.r, fragment.g, fragment.b),
            alpha: fragment.a,
            write: fragment.write,
        }
    }
}

impl Pixel {
    /// Final 8-bit view of the pixel
    ///
    /// Channels are truncated to their low 8 bits; after the clamp stage this
    /// is lossless.
    pub fn into_output(self) -> PipelineOutput {
        PipelineOutput {
            x: self.x,
            y: self.y,
            z: self.z,
            r: (self.rgb.r() & 0xFF) as u8,
            g: (self.rgb.g() & 0xFF) as u8,
            b: (self.rgb.b() & 0xFF) as u8,
            a: self.alpha,
            write: self.write,
        }
    }
}

/// Final fragment handed to the memory collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// X coordinate (Q12.4)
    pub x: Q12_4,

    /// Y coordinate (Q12.4)
    pub y: Q12_4,

    /// Depth ordinal to store when DEPTH is set
    pub z: u32,

    /// Red channel
    pub r: u8,

    /// Green channel
    pub g: u8,

    /// Blue channel
    pub b: u8,

    /// Alpha channel
    pub a: u8,

    /// Final write-enable flags
    pub write: WriteMask,
}

impl Default for PipelineOutput {
    fn default() -> Self {
        Self {
            x: Q12_4::default(),
            y: Q12_4::default(),
            z: 0,
            r: 0,
            g: 0,
            b: 0,
            a: 0,
            write: WriteMask::empty(),
        }
    }
}
