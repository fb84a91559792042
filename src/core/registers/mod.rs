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

//! GS register decoder
//!
//! Turns writes on the GS register bus into the [`PipelineConfig`] snapshot
//! the pixel pipeline consumes. Only the registers that feed the output
//! merger are decoded here; every other address belongs to another GS unit
//! and is ignored.
//!
//! # Register Map
//!
//! | Address | Register   | Fields used                                        |
//! |---------|------------|----------------------------------------------------|
//! | 0x00    | PRIM       | ABE (6), CTXT (9)                                  |
//! | 0x1A    | PRMODECONT | AC (0)                                             |
//! | 0x1B    | PRMODE     | ABE (6), CTXT (9)                                  |
//! | 0x42/43 | ALPHA_1/2  | A (0-1), B (2-3), C (4-5), D (6-7), FIX (32-39)    |
//! | 0x44    | DIMX       | DMrc (16r+4c, 3 bits signed)                       |
//! | 0x45    | DTHE       | DTHE (0)                                           |
//! | 0x46    | COLCLAMP   | CLAMP (0)                                          |
//! | 0x47/48 | TEST_1/2   | ATE, ATST, AREF, AFAIL, DATE, DATM, ZTE, ZTST      |
//! | 0x49    | PABE       | PABE (0)                                           |
//! | 0x4A/4B | FBA_1/2    | FBA (0)                                            |
//! | 0x4C/4D | FRAME_1/2  | PSM (24-29)                                        |
//! | 0x4E/4F | ZBUF_1/2   | PSM (24-27)                                        |
//!
//! Registers with a `_1`/`_2` suffix exist once per drawing context. The
//! context used for a snapshot is the CTXT bit of whichever primitive
//! attribute register PRMODECONT.AC selects.
//!
//! # References
//!
//! - GS User's Manual, chapter 7 "Registers"

use crate::core::error::{GsError, Result};
use crate::core::pipeline::{
    AlphaFailMode, AlphaTestConfig, AlphaTestMode, BlendAlpha, BlendColor, BlendConfig,
    ClampConfig, ColorClamp, DepthTestConfig, DepthTestMode, DestAlphaConfig, DitherConfig,
    DitherMatrix, PipelineConfig, PixelFormat,
};
use serde::{Deserialize, Serialize};

/// Register addresses decoded by [`RegisterFile`]
pub mod address {
    pub const PRIM: u8 = 0x00;
    pub const PRMODECONT: u8 = 0x1A;
    pub const PRMODE: u8 = 0x1B;
    pub const ALPHA_1: u8 = 0x42;
    pub const ALPHA_2: u8 = 0x43;
    pub const DIMX: u8 = 0x44;
    pub const DTHE: u8 = 0x45;
    pub const COLCLAMP: u8 = 0x46;
    pub const TEST_1: u8 = 0x47;
    pub const TEST_2: u8 = 0x48;
    pub const PABE: u8 = 0x49;
    pub const FBA_1: u8 = 0x4A;
    pub const FBA_2: u8 = 0x4B;
    pub const FRAME_1: u8 = 0x4C;
    pub const FRAME_2: u8 = 0x4D;
    pub const ZBUF_1: u8 = 0x4E;
    pub const ZBUF_2: u8 = 0x4F;
}

/// One write on the GS register bus
///
/// Used for register dumps stored as JSON:
///
/// ```json
/// [{ "address": 71, "data": 1035 }]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWrite {
    /// Register address
    pub address: u8,
    /// 64-bit register value
    pub data: u64,
}

/// Primitive attributes read from PRIM or PRMODE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PrimitiveAttributes {
    /// ABE: alpha blending enabled
    blend: bool,
    /// CTXT: drawing context (0 or 1)
    context: usize,
}

impl PrimitiveAttributes {
    fn decode(data: u64) -> Self {
        Self {
            blend: (data >> 6) & 1 != 0,
            context: ((data >> 9) & 1) as usize,
        }
    }
}

/// Per-context register state (the `_1`/`_2` registers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Context {
    alpha_test: AlphaTestConfig,
    dest_alpha: DestAlphaConfig,
    depth_test: DepthTestConfig,
    blend: BlendConfig,
    fba: bool,
    frame_psm: PixelFormat,
    zbuf_psm: PixelFormat,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            alpha_test: AlphaTestConfig::default(),
            dest_alpha: DestAlphaConfig::default(),
            depth_test: DepthTestConfig::default(),
            blend: BlendConfig::default(),
            fba: false,
            frame_psm: PixelFormat::Psmct32,
            zbuf_psm: PixelFormat::Psmz32,
        }
    }
}

/// Decoded GS register state relevant to the pixel pipeline
///
/// # Examples
///
/// ```
/// use gsrx::core::pipeline::{AlphaTestMode, ColorClamp};
/// use gsrx::core::registers::{address, RegisterFile};
///
/// let mut regs = RegisterFile::new();
///
/// // TEST_1: ATE=1, ATST=GEQUAL, AREF=0x40
/// regs.write(address::TEST_1, 1 | (5 << 1) | (0x40 << 4)).unwrap();
/// regs.write(address::COLCLAMP, 1).unwrap();
///
/// let config = regs.snapshot();
/// assert!(config.alpha_test.enable);
/// assert_eq!(config.alpha_test.mode, AlphaTestMode::Gequal);
/// assert_eq!(config.alpha_test.reference, 0x40);
/// assert_eq!(config.clamp.mode, ColorClamp::Clamp);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    contexts: [Context; 2],
    prim: PrimitiveAttributes,
    prmode: PrimitiveAttributes,
    /// PRMODECONT.AC: true selects PRIM, false selects PRMODE
    use_prim: bool,
    dither_matrix: DitherMatrix,
    dither_enable: bool,
    color_clamp: ColorClamp,
    per_pixel_blend: bool,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Create a register file in its power-on state
    pub fn new() -> Self {
        Self {
            contexts: [Context::default(); 2],
            prim: PrimitiveAttributes::default(),
            prmode: PrimitiveAttributes::default(),
            use_prim: true,
            dither_matrix: DitherMatrix::ZERO,
            dither_enable: false,
            color_clamp: ColorClamp::Mask,
            per_pixel_blend: false,
        }
    }

    /// Restore the power-on state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Decode one register write
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address on the GS bus
    /// * `data` - 64-bit register value
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the register feeds the pixel pipeline and was updated
    /// - `Ok(false)` if the address belongs to another GS unit
    /// - `Err(GsError::InvalidField)` if a field holds a reserved value; the
    ///   register keeps its previous contents
    pub fn write(&mut self, addr: u8, data: u64) -> Result<bool> {
        match addr {
            address::PRIM => {
                self.prim = PrimitiveAttributes::decode(data);
                log::debug!("PRIM: abe={} ctxt={}", self.prim.blend, self.prim.context);
            }
            address::PRMODECONT => {
                self.use_prim = data & 1 != 0;
                log::debug!("PRMODECONT: ac={}", self.use_prim as u8);
            }
            address::PRMODE => {
                self.prmode = PrimitiveAttributes::decode(data);
                log::debug!(
                    "PRMODE: abe={} ctxt={}",
                    self.prmode.blend,
                    self.prmode.context
                );
            }
            address::ALPHA_1 | address::ALPHA_2 => {
                let ctx = (addr - address::ALPHA_1) as usize;
                self.write_alpha(ctx, data)?;
            }
            address::DIMX => {
                self.dither_matrix = decode_dimx(data)?;
                log::debug!("DIMX: {:?}", self.dither_matrix.rows());
            }
            address::DTHE => {
                self.dither_enable = data & 1 != 0;
                log::debug!("DTHE: {}", self.dither_enable as u8);
            }
            address::COLCLAMP => {
                self.color_clamp = ColorClamp::from_bits(data as u8);
                log::debug!("COLCLAMP: {:?}", self.color_clamp);
            }
            address::TEST_1 | address::TEST_2 => {
                let ctx = (addr - address::TEST_1) as usize;
                self.write_test(ctx, data);
            }
            address::PABE => {
                self.per_pixel_blend = data & 1 != 0;
                log::debug!("PABE: {}", self.per_pixel_blend as u8);
            }
            address::FBA_1 | address::FBA_2 => {
                let ctx = (addr - address::FBA_1) as usize;
                self.contexts[ctx].fba = data & 1 != 0;
                log::debug!("FBA_{}: {}", ctx + 1, self.contexts[ctx].fba as u8);
            }
            address::FRAME_1 | address::FRAME_2 => {
                let ctx = (addr - address::FRAME_1) as usize;
                let psm = reject_logged(addr, decode_frame_psm(data))?;
                self.contexts[ctx].frame_psm = psm;
                log::debug!("FRAME_{}: psm={:?}", ctx + 1, psm);
            }
            address::ZBUF_1 | address::ZBUF_2 => {
                let ctx = (addr - address::ZBUF_1) as usize;
                let psm = reject_logged(addr, decode_zbuf_psm(data))?;
                self.contexts[ctx].zbuf_psm = psm;
                log::debug!("ZBUF_{}: psm={:?}", ctx + 1, psm);
            }
            _ => {
                log::trace!(
                    "Ignoring write to GS register 0x{:02X} = 0x{:016X}",
                    addr,
                    data
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Decode a sequence of register writes in order
    ///
    /// Stops at the first rejected write.
    pub fn write_all(&mut self, writes: &[RegisterWrite]) -> Result<usize> {
        let mut consumed = 0;
        for w in writes {
            if self.write(w.address, w.data)? {
                consumed += 1;
            }
        }
        Ok(consumed)
    }

    fn write_alpha(&mut self, ctx: usize, data: u64) -> Result<()> {
        let (a, b, c, d) = reject_logged(address::ALPHA_1 + ctx as u8, decode_alpha(data))?;
        let fix = ((data >> 32) & 0xFF) as u8;

        let blend = &mut self.contexts[ctx].blend;
        blend.a = a;
        blend.b = b;
        blend.c = c;
        blend.d = d;
        blend.fix = fix;

        log::debug!(
            "ALPHA_{}: A={:?} B={:?} C={:?} D={:?} FIX=0x{:02X}",
            ctx + 1,
            a,
            b,
            c,
            d,
            fix
        );
        Ok(())
    }

    fn write_test(&mut self, ctx: usize, data: u64) {
        let context = &mut self.contexts[ctx];

        context.alpha_test = AlphaTestConfig {
            enable: data & 1 != 0,
            mode: AlphaTestMode::from_bits(((data >> 1) & 7) as u8),
            reference: ((data >> 4) & 0xFF) as u8,
            fail: AlphaFailMode::from_bits(((data >> 12) & 3) as u8),
        };
        context.dest_alpha = DestAlphaConfig {
            enable: (data >> 14) & 1 != 0,
            pass_msb: (data >> 15) & 1 != 0,
        };
        context.depth_test = DepthTestConfig {
            enable: (data >> 16) & 1 != 0,
            mode: DepthTestMode::from_bits(((data >> 17) & 3) as u8),
        };

        log::debug!(
            "TEST_{}: ate={} atst={:?} aref=0x{:02X} afail={:?} date={} datm={} zte={} ztst={:?}",
            ctx + 1,
            context.alpha_test.enable as u8,
            context.alpha_test.mode,
            context.alpha_test.reference,
            context.alpha_test.fail,
            context.dest_alpha.enable as u8,
            context.dest_alpha.pass_msb as u8,
            context.depth_test.enable as u8,
            context.depth_test.mode
        );
    }

    /// Index of the drawing context selected by the active primitive
    /// attributes
    pub fn active_context(&self) -> usize {
        self.attributes().context
    }

    fn attributes(&self) -> PrimitiveAttributes {
        if self.use_prim {
            self.prim
        } else {
            self.prmode
        }
    }

    /// Build the pipeline configuration for the active context
    pub fn snapshot(&self) -> PipelineConfig {
        let attrs = self.attributes();
        let ctx = &self.contexts[attrs.context];

        PipelineConfig {
            frame_psm: ctx.frame_psm,
            zbuf_psm: ctx.zbuf_psm,
            alpha_test: ctx.alpha_test,
            dest_alpha: ctx.dest_alpha,
            depth_test: ctx.depth_test,
            blend: BlendConfig {
                enable: attrs.blend,
                per_pixel: self.per_pixel_blend,
                ..ctx.blend
            },
            dither: DitherConfig {
                enable: self.dither_enable,
                matrix: self.dither_matrix,
            },
            clamp: ClampConfig {
                mode: self.color_clamp,
                fba: ctx.fba,
            },
        }
    }
}

fn reject_logged<T>(address: u8, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::warn!("Rejected write to GS register 0x{:02X}: {}", address, e);
    }
    result
}

fn decode_alpha(data: u64) -> Result<(BlendColor, BlendColor, BlendAlpha, BlendColor)> {
    let field = |shift: u32| ((data >> shift) & 3) as u8;
    Ok((
        BlendColor::from_bits(field(0), "ALPHA.A")?,
        BlendColor::from_bits(field(2), "ALPHA.B")?,
        BlendAlpha::from_bits(field(4))?,
        BlendColor::from_bits(field(6), "ALPHA.D")?,
    ))
}

fn decode_dimx(data: u64) -> Result<DitherMatrix> {
    let mut rows = [[0i8; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            let bits = ((data >> (16 * r + 4 * c)) & 7) as u8;
            *cell = DitherMatrix::offset_from_bits(bits);
        }
    }
    DitherMatrix::new(rows)
}

fn decode_frame_psm(data: u64) -> Result<PixelFormat> {
    let bits = ((data >> 24) & 0x3F) as u8;
    match PixelFormat::from_bits(bits)? {
        psm if psm.is_depth() => Err(GsError::InvalidField {
            field: "FRAME.PSM",
            value: bits as u64,
        }),
        psm => Ok(psm),
    }
}

fn decode_zbuf_psm(data: u64) -> Result<PixelFormat> {
    let bits = 0x30 | ((data >> 24) & 0xF) as u8;
    PixelFormat::from_bits(bits).map_err(|_| GsError::InvalidField {
        field: "ZBUF.PSM",
        value: bits as u64,
    })
}
