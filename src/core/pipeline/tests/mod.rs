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

//! Composition and property tests for the pixel pipeline


use super::*;
use proptest::prelude::*;

/// Framebuffer formats the pipeline renders into
pub(super) const COLOR_FORMATS: [PixelFormat; 4] = [
    PixelFormat::Psmct32,
    PixelFormat::Psmct24,
    PixelFormat::Psmct16,
    PixelFormat::Psmct16s,
];

pub(super) fn arb_write_mask() -> impl Strategy<Value = WriteMask> {
    (0u8..8).prop_map(WriteMask::from_bits_truncate)
}

pub(super) fn arb_fragment() -> impl Strategy<Value = Fragment> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u32>(),
        any::<[u8; 4]>(),
        arb_write_mask(),
    )
        .prop_map(|(x, y, z, [r, g, b, a], write)| Fragment {
            x: Q12_4(x),
            y: Q12_4(y),
            z,
            r,
            g,
            b,
            a,
            write,
        })
}

pub(super) fn arb_sample() -> impl Strategy<Value = FramebufferSample> {
    (any::<[u8; 4]>(), any::<u32>())
        .prop_map(|([r, g, b, a], z)| FramebufferSample { r, g, b, a, z })
}

pub(super) fn arb_input() -> impl Strategy<Value = PipelineInput> {
    (arb_fragment(), arb_sample()).prop_map(|(fragment, sample)| PipelineInput { fragment, sample })
}

fn arb_blend_color() -> impl Strategy<Value = BlendColor> {
    prop_oneof![
        Just(BlendColor::Source),
        Just(BlendColor::Framebuffer),
        Just(BlendColor::Zero),
    ]
}

fn arb_blend_alpha() -> impl Strategy<Value = BlendAlpha> {
    prop_oneof![
        Just(BlendAlpha::SourceAlpha),
        Just(BlendAlpha::FramebufferAlpha),
        Just(BlendAlpha::Fixed),
    ]
}

pub(super) fn arb_alpha_test() -> impl Strategy<Value = AlphaTestConfig> {
    (any::<bool>(), 0u8..8, any::<u8>(), 0u8..4).prop_map(|(enable, mode, reference, fail)| {
        AlphaTestConfig {
            enable,
            mode: AlphaTestMode::from_bits(mode),
            reference,
            fail: AlphaFailMode::from_bits(fail),
        }
    })
}

pub(super) fn arb_blend() -> impl Strategy<Value = BlendConfig> {
    (
        any::<bool>(),
        any::<bool>(),
        arb_blend_color(),
        arb_blend_color(),
        arb_blend_alpha(),
        arb_blend_color(),
        any::<u8>(),
    )
        .prop_map(|(enable, per_pixel, a, b, c, d, fix)| BlendConfig {
            enable,
            per_pixel,
            a,
            b,
            c,
            d,
            fix,
        })
}

pub(super) fn arb_dither_matrix() -> impl Strategy<Value = DitherMatrix> {
    prop::array::uniform4(prop::array::uniform4(DitherMatrix::MIN..=DitherMatrix::MAX))
        .prop_map(|rows| DitherMatrix::new(rows).unwrap())
}

pub(super) fn arb_config() -> impl Strategy<Value = PipelineConfig> {
    (
        arb_alpha_test(),
        (any::<bool>(), any::<bool>()),
        (any::<bool>(), 0u8..4),
        arb_blend(),
        (any::<bool>(), arb_dither_matrix()),
        (any::<bool>(), any::<bool>()),
        prop::sample::select(COLOR_FORMATS.to_vec()),
    )
        .prop_map(
            |(alpha_test, (date, datm), (zte, ztst), blend, dither, clamp, frame_psm)| {
                let (dthe, matrix) = dither;
                let (colclamp, fba) = clamp;
                PipelineConfig {
                    frame_psm,
                    zbuf_psm: PixelFormat::Psmz32,
                    alpha_test,
                    dest_alpha: DestAlphaConfig {
                        enable: date,
                        pass_msb: datm,
                    },
                    depth_test: DepthTestConfig {
                        enable: zte,
                        mode: DepthTestMode::from_bits(ztst),
                    },
                    blend,
                    dither: DitherConfig {
                        enable: dthe,
                        matrix,
                    },
                    clamp: ClampConfig {
                        mode: ColorClamp::from_bits(colclamp as u8),
                        fba,
                    },
                }
            },
        )
}
