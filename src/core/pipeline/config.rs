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

//! Per-draw pipeline configuration
//!
//! [`PipelineConfig`] is the read-only snapshot every stage is evaluated
//! against. It is produced either by the register decoder
//! ([`crate::core::registers::RegisterFile::snapshot`]) or loaded from a TOML
//! draw description.
//!
//! # TOML Layout
//!
//! ```toml
//! frame_psm = "PSMCT32"
//! zbuf_psm = "PSMZ32"
//!
//! [alpha_test]
//! enable = true
//! mode = "GEQUAL"
//! reference = 64
//! fail = "KEEP"
//!
//! [blend]
//! enable = true
//! a = "SOURCE"
//! b = "FRAMEBUFFER"
//! c = "SOURCE_ALPHA"
//! d = "FRAMEBUFFER"
//!
//! [dither]
//! enable = true
//! matrix = [[-4, 0, -3, 1], [2, -2, 3, -1], [-3, 1, -4, 0], [3, -1, 2, -2]]
//! ```

use super::alpha_blend::BlendConfig;
use super::alpha_test::AlphaTestConfig;
use super::clamp::ClampConfig;
use super::dest_alpha_test::DestAlphaConfig;
use super::dither::DitherConfig;
use super::z_test::DepthTestConfig;
use crate::core::error::{GsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Framebuffer and depth-buffer pixel storage formats
///
/// Discriminants are the PSM field encodings from the FRAME and ZBUF
/// registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixelFormat {
    /// R8 G8 B8 A8
    Psmct32 = 0x00,
    /// R8 G8 B8, no alpha
    Psmct24 = 0x01,
    /// R5 G5 B5 A1
    Psmct16 = 0x02,
    /// R5 G5 B5 A1, alternate page layout
    Psmct16s = 0x0A,
    /// 32-bit depth
    Psmz32 = 0x30,
    /// 24-bit depth
    Psmz24 = 0x31,
    /// 16-bit depth
    Psmz16 = 0x32,
    /// 16-bit depth, alternate page layout
    Psmz16s = 0x3A,
}

impl PixelFormat {
    /// Decode a 6-bit PSM field
    ///
    /// # Errors
    ///
    /// Returns [`GsError::InvalidField`] for encodings this pipeline does not
    /// render into (texture-only and reserved formats).
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::pipeline::PixelFormat;
    ///
    /// assert_eq!(PixelFormat::from_bits(0x01).unwrap(), PixelFormat::Psmct24);
    /// assert_eq!(PixelFormat::from_bits(0x3A).unwrap(), PixelFormat::Psmz16s);
    /// assert!(PixelFormat::from_bits(0x13).is_err());
    /// ```
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits & 0x3F {
            0x00 => Ok(PixelFormat::Psmct32),
            0x01 => Ok(PixelFormat::Psmct24),
            0x02 => Ok(PixelFormat::Psmct16),
            0x0A => Ok(PixelFormat::Psmct16s),
            0x30 => Ok(PixelFormat::Psmz32),
            0x31 => Ok(PixelFormat::Psmz24),
            0x32 => Ok(PixelFormat::Psmz16),
            0x3A => Ok(PixelFormat::Psmz16s),
            other => Err(GsError::InvalidField {
                field: "PSM",
                value: other as u64,
            }),
        }
    }

    /// PSM field encoding
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// True for formats that store an alpha channel
    ///
    /// Depth formats are never framebuffers; they report `true` so that only
    /// the 24-bit colour layout disables the destination alpha test.
    pub fn has_alpha(self) -> bool {
        self != PixelFormat::Psmct24
    }

    /// True only for the 32-bit RGBA layout
    pub fn is_rgba32(self) -> bool {
        self == PixelFormat::Psmct32
    }

    /// True for depth-buffer formats
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            PixelFormat::Psmz32 | PixelFormat::Psmz24 | PixelFormat::Psmz16 | PixelFormat::Psmz16s
        )
    }
}

/// Snapshot of every register field the pixel pipeline reads
///
/// Constant for the duration of a draw and shared read-only by every
/// pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// FRAME.PSM: framebuffer storage format
    pub frame_psm: PixelFormat,

    /// ZBUF.PSM: depth-buffer storage format
    pub zbuf_psm: PixelFormat,

    /// TEST: alpha test
    pub alpha_test: AlphaTestConfig,

    /// TEST: destination alpha test
    pub dest_alpha: DestAlphaConfig,

    /// TEST: depth test
    pub depth_test: DepthTestConfig,

    /// ALPHA / PABE / PRIM.ABE: alpha blending
    pub blend: BlendConfig,

    /// DIMX / DTHE: dithering
    pub dither: DitherConfig,

    /// COLCLAMP / FBA: colour clamping and alpha correction
    pub clamp: ClampConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_psm: PixelFormat::Psmct32,
            zbuf_psm: PixelFormat::Psmz32,
            alpha_test: AlphaTestConfig::default(),
            dest_alpha: DestAlphaConfig::default(),
            depth_test: DepthTestConfig::default(),
            blend: BlendConfig::default(),
            dither: DitherConfig::default(),
            clamp: ClampConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check cross-field constraints that the type system does not encode
    ///
    /// # Errors
    ///
    /// [`GsError::InvalidField`] if `frame_psm` is a depth format or
    /// `zbuf_psm` is a colour format.
    pub fn validate(&self) -> Result<()> {
        if self.frame_psm.is_depth() {
            return Err(GsError::InvalidField {
                field: "FRAME.PSM",
                value: self.frame_psm.bits() as u64,
            });
        }
        if !self.zbuf_psm.is_depth() {
            return Err(GsError::InvalidField {
                field: "ZBUF.PSM",
                value: self.zbuf_psm.bits() as u64,
            });
        }
        Ok(())
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// I/O, parse and validation errors are all reported as [`GsError`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
