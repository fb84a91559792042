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

//! GS pixel pipeline (output merger)
//!
//! This module models the per-pixel back end of the PlayStation 2 Graphics
//! Synthesizer. A fragment produced by the rasterizer flows through six
//! stages in fixed order:
//!
//! ```text
//! ┌───────────┐  ┌───────────────┐  ┌───────┐  ┌────────────┐  ┌────────┐  ┌───────┐
//! │ AlphaTest │─►│ DestAlphaTest │─►│ ZTest │─►│ AlphaBlend │─►│ Dither │─►│ Clamp │
//! └───────────┘  └───────────────┘  └───────┘  └────────────┘  └────────┘  └───────┘
//! ```
//!
//! Every stage is a pure function of the shared [`PipelineConfig`], the
//! framebuffer sample at the fragment's coordinate and the incoming
//! [`Pixel`]. The test stages only clear write-enable flags; blending and
//! dithering work on 9-bit colour and the clamp stage narrows back to 8 bits.
//!
//! Two front ends drive the stages:
//! - [`process`] runs one fragment through all six stages at once
//! - [`PixelPipeline`] advances one stage per clock, with a latency of six
//!   cycles and one result per cycle once full
//!
//! Both produce bit-identical outputs for the same input.
//!
//! # References
//!
//! - GS User's Manual, "Pixel Operation"

mod alpha_blend;
mod alpha_test;
mod clamp;
mod clocked;
mod config;
mod dest_alpha_test;
mod dither;
mod fragment;
mod tracer;
#[cfg(test)]
mod tests;

pub use alpha_blend::{alpha_blend, blend_channel, BlendAlpha, BlendColor, BlendConfig};
pub use alpha_test::{alpha_test, AlphaFailMode, AlphaTestConfig, AlphaTestMode};
pub use clamp::{clamp, ClampConfig, ColorClamp};
pub use clocked::PixelPipeline;
pub use config::{PipelineConfig, PixelFormat};
pub use dest_alpha_test::{dest_alpha_test, DestAlphaConfig};
pub use dither::{dither, DitherConfig, DitherMatrix};
pub use fragment::{
    Fragment, FramebufferSample, PipelineInput, PipelineOutput, Pixel, Q12_4, Rgb9, WriteMask,
};
pub use tracer::PipelineTracer;
pub use z_test::{z_test, DepthTestConfig, DepthTestMode};

/// Pipeline stages in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    AlphaTest,
    DestAlphaTest,
    DepthTest,
    AlphaBlend,
    Dither,
    Clamp,
}

impl Stage {
    /// All stages in the order a fragment visits them
    pub const ALL: [Stage; 6] = [
        Stage::AlphaTest,
        Stage::DestAlphaTest,
        Stage::DepthTest,
        Stage::AlphaBlend,
        Stage::Dither,
        Stage::Clamp,
    ];

    /// Evaluate this stage
    #[inline]
    pub fn apply(self, config: &PipelineConfig, sample: &FramebufferSample, pixel: Pixel) -> Pixel {
        match self {
            Stage::AlphaTest => alpha_test(&config.alpha_test, config.frame_psm, pixel),
            Stage::DestAlphaTest => dest_alpha_test(&config.dest_alpha, config.frame_psm, pixel),
            Stage::DepthTest => z_test(&config.depth_test, sample.z, pixel),
            Stage::AlphaBlend => alpha_blend(&config.blend, sample, pixel),
            Stage::Dither => dither(&config.dither, pixel),
            Stage::Clamp => clamp(&config.clamp, pixel),
        }
    }

    /// Short name used in traces
    pub fn name(self) -> &'static str {
        match self {
            Stage::AlphaTest => "ATST",
            Stage::DestAlphaTest => "DATE",
            Stage::DepthTest => "ZTST",
            Stage::AlphaBlend => "ABLD",
            Stage::Dither => "DTHR",
            Stage::Clamp => "CLMP",
        }
    }
}

/// Run one fragment through all six stages
///
/// # Arguments
///
/// * `config` - Register snapshot for the current draw
/// * `input` - Fragment and the framebuffer sample at its coordinate
///
/// # Returns
///
/// The final fragment with 8-bit colour and its narrowed write mask
///
/// # Examples
///
/// ```
/// use gsrx::core::pipeline::{process, Fragment, PipelineConfig, PipelineInput};
///
/// let config = PipelineConfig::default();
/// let input = PipelineInput::from(Fragment::at(1, 2).with_color(10, 20, 30, 0x80));
/// let out = process(&config, &input);
/// assert_eq!((out.r, out.g, out.b), (10, 20, 30));
/// // FBA is clear, so the alpha MSB is cleared
/// assert_eq!(out.a, 0x00);
/// ```
pub fn process(config: &PipelineConfig, input: &PipelineInput) -> PipelineOutput {
    Stage::ALL
        .iter()
        .fold(Pixel::from(input.fragment), |pixel, stage| {
            stage.apply(config, &input.sample, pixel)
        })
        .into_output()
}
