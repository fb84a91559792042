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

//! Reference local memory
//!
//! A flat framebuffer and depth buffer that plays the memory collaborator
//! around the pixel pipeline: it supplies the [`FramebufferSample`] for each
//! fragment and commits the pipeline's final writes. Fragments are drawn
//! strictly in stream order, so later fragments observe earlier writes to
//! the same pixel.
//!
//! # Storage
//!
//! Every pixel holds one 32-bit colour word and one 32-bit depth word,
//! regardless of format. Formats narrower than 32 bits are modelled by
//! truncating values on commit:
//!
//! | Format         | Colour                    | Alpha                |
//! |----------------|---------------------------|----------------------|
//! | PSMCT32        | 8 bits per channel        | 8 bits               |
//! | PSMCT24        | 8 bits per channel        | none (reads as 0x80) |
//! | PSMCT16/16S    | top 5 bits per channel    | MSB only             |
//!
//! PSMZ24 keeps the low 24 depth bits and PSMZ16/16S the low 16.
//!
//! Colour words are packed `0xAABBGGRR`.

use crate::core::error::{GsError, Result};
use crate::core::pipeline::{
    process, Fragment, FramebufferSample, PipelineConfig, PipelineInput, PipelineOutput,
    PixelFormat, WriteMask,
};
use serde::Serialize;

/// Counters reported by [`LocalMemory::draw`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DrawStats {
    /// Fragments processed by the pipeline
    pub fragments: usize,
    /// Fragments outside the buffer, skipped before sampling
    pub clipped: usize,
    /// Colour writes committed
    pub color_writes: usize,
    /// Alpha writes committed
    pub alpha_writes: usize,
    /// Depth writes committed
    pub depth_writes: usize,
}

/// Framebuffer plus depth buffer
pub struct LocalMemory {
    width: u16,
    height: u16,
    frame_psm: PixelFormat,
    zbuf_psm: PixelFormat,
    color: Vec<u32>,
    depth: Vec<u32>,
}

impl LocalMemory {
    /// Create a zero-filled buffer pair
    ///
    /// # Errors
    ///
    /// [`GsError::InvalidField`] if `frame_psm` is a depth format or
    /// `zbuf_psm` is a colour format.
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::memory::LocalMemory;
    /// use gsrx::core::pipeline::PixelFormat;
    ///
    /// let mem = LocalMemory::new(640, 448, PixelFormat::Psmct32, PixelFormat::Psmz24).unwrap();
    /// assert_eq!(mem.sample(639, 447).unwrap().z, 0);
    /// assert!(mem.sample(640, 0).is_err());
    /// ```
    pub fn new(
        width: u16,
        height: u16,
        frame_psm: PixelFormat,
        zbuf_psm: PixelFormat,
    ) -> Result<Self> {
        if frame_psm.is_depth() {
            return Err(GsError::InvalidField {
                field: "FRAME.PSM",
                value: frame_psm.bits() as u64,
            });
        }
        if !zbuf_psm.is_depth() {
            return Err(GsError::InvalidField {
                field: "ZBUF.PSM",
                value: zbuf_psm.bits() as u64,
            });
        }

        let len = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            frame_psm,
            zbuf_psm,
            color: vec![0; len],
            depth: vec![0; len],
        })
    }

    /// Buffer width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Buffer height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Framebuffer storage format
    pub fn frame_psm(&self) -> PixelFormat {
        self.frame_psm
    }

    /// Depth-buffer storage format
    pub fn zbuf_psm(&self) -> PixelFormat {
        self.zbuf_psm
    }

    fn index(&self, x: u16, y: u16) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(GsError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    /// Fill both buffers
    ///
    /// Values are truncated to the buffer formats as if committed.
    pub fn clear(&mut self, color: u32, depth: u32) {
        let color = self.truncate_color(color);
        let depth = depth & self.depth_mask();
        self.color.fill(color);
        self.depth.fill(depth);
    }

    /// Packed colour word at a pixel
    pub fn color_at(&self, x: u16, y: u16) -> Result<u32> {
        Ok(self.color[self.index(x, y)?])
    }

    /// Depth word at a pixel
    pub fn depth_at(&self, x: u16, y: u16) -> Result<u32> {
        Ok(self.depth[self.index(x, y)?])
    }

    /// Read the framebuffer and depth buffer at a pixel
    pub fn sample(&self, x: u16, y: u16) -> Result<FramebufferSample> {
        let idx = self.index(x, y)?;
        let [r, g, b, a] = self.color[idx].to_le_bytes();
        Ok(FramebufferSample {
            r,
            g,
            b,
            a: if self.frame_psm.has_alpha() { a } else { 0x80 },
            z: self.depth[idx],
        })
    }

    /// Apply a pipeline result
    ///
    /// Colour is written when COLOR is set, alpha when ALPHA is set and the
    /// format stores alpha, depth when DEPTH is set.
    pub fn commit(&mut self, output: &PipelineOutput) -> Result<()> {
        let idx = self.index(output.x.pixel(), output.y.pixel())?;

        let incoming =
            self.truncate_color(u32::from_le_bytes([output.r, output.g, output.b, output.a]));
        let mut word = self.color[idx];
        if output.write.contains(WriteMask::COLOR) {
            word = (word & 0xFF00_0000) | (incoming & 0x00FF_FFFF);
        }
        if output.write.contains(WriteMask::ALPHA) && self.frame_psm.has_alpha() {
            word = (word & 0x00FF_FFFF) | (incoming & 0xFF00_0000);
        }
        self.color[idx] = word;

        if output.write.contains(WriteMask::DEPTH) {
            self.depth[idx] = output.z & self.depth_mask();
        }
        Ok(())
    }

    /// Draw a fragment stream through the pipeline
    ///
    /// Each fragment is sampled, processed and committed before the next one
    /// is sampled. Fragments outside the buffer are skipped and counted as
    /// clipped.
    pub fn draw(&mut self, config: &PipelineConfig, fragments: &[Fragment]) -> Result<DrawStats> {
        let mut stats = DrawStats::default();

        for fragment in fragments {
            let sample = match self.sample(fragment.x.pixel(), fragment.y.pixel()) {
                Ok(sample) => sample,
                Err(e) => {
                    log::trace!("Skipping fragment: {}", e);
                    stats.clipped += 1;
                    continue;
                }
            };

            let output = process(
                config,
                &PipelineInput {
                    fragment: *fragment,
                    sample,
                },
            );
            self.commit(&output)?;

            stats.fragments += 1;
            stats.color_writes += output.write.contains(WriteMask::COLOR) as usize;
            stats.alpha_writes +=
                (output.write.contains(WriteMask::ALPHA) && self.frame_psm.has_alpha()) as usize;
            stats.depth_writes += output.write.contains(WriteMask::DEPTH) as usize;
        }

        if stats.clipped > 0 {
            log::warn!(
                "{} fragments fell outside the {}x{} buffer",
                stats.clipped,
                self.width,
                self.height
            );
        }
        Ok(stats)
    }

    fn truncate_color(&self, word: u32) -> u32 {
        match self.frame_psm {
            PixelFormat::Psmct16 | PixelFormat::Psmct16s => word & 0x80F8_F8F8,
            PixelFormat::Psmct24 => word & 0x00FF_FFFF,
            _ => word,
        }
    }

    fn depth_mask(&self) -> u32 {
        match self.zbuf_psm {
            PixelFormat::Psmz24 => 0x00FF_FFFF,
            PixelFormat::Psmz16 | PixelFormat::Psmz16s => 0x0000_FFFF,
            _ => u32::MAX,
        }
    }
}
