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

//! Cycle-stepped pipeline
//!
//! Models the registered hardware datapath: each call to
//! [`PixelPipeline::clock`] advances every in-flight fragment by one stage and
//! may accept one new fragment. A fragment accepted on cycle `n` is returned
//! on cycle `n + LATENCY`.
//!
//! Each in-flight fragment keeps a handle to the configuration it entered
//! with, so loading a new configuration mid-stream only affects fragments
//! accepted afterwards.

use super::config::PipelineConfig;
use super::fragment::{FramebufferSample, PipelineInput, PipelineOutput, Pixel};
use super::Stage;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct InFlight {
    config: Arc<PipelineConfig>,
    sample: FramebufferSample,
    pixel: Pixel,
}

impl InFlight {
    fn advance(self, stage: Stage) -> Self {
        let pixel = stage.apply(&self.config, &self.sample, self.pixel);
        Self { pixel, ..self }
    }
}

/// Six-stage pixel pipeline stepped one clock at a time
///
/// # Examples
///
/// ```
/// use gsrx::core::pipeline::{Fragment, PipelineConfig, PipelineInput, PixelPipeline};
/// use std::sync::Arc;
///
/// let config = Arc::new(PipelineConfig::default());
/// let mut pipe = PixelPipeline::new();
///
/// let input = PipelineInput::from(Fragment::at(3, 4).with_color(1, 2, 3, 0));
/// assert!(pipe.clock(&config, Some(input)).is_none());
/// for _ in 1..PixelPipeline::LATENCY {
///     assert!(pipe.clock(&config, None).is_none());
/// }
/// let out = pipe.clock(&config, None).unwrap();
/// assert_eq!((out.r, out.g, out.b), (1, 2, 3));
/// assert!(pipe.is_idle());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PixelPipeline {
    /// `slots[i]` holds the fragment that has completed stage `i`
    slots: [Option<InFlight>; 6],
    cycles: u64,
}

impl PixelPipeline {
    /// Clocks between accepting a fragment and emitting its result
    pub const LATENCY: usize = Stage::ALL.len();

    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one clock
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration applied to `input` for its whole trip
    /// * `input` - Fragment entering the first stage this cycle, if any
    ///
    /// # Returns
    ///
    /// The fragment leaving the clamp stage this cycle, if any
    pub fn clock(
        &mut self,
        config: &Arc<PipelineConfig>,
        input: Option<PipelineInput>,
    ) -> Option<PipelineOutput> {
        let output = self.shift();

        self.slots[0] = input.map(|input| {
            InFlight {
                config: Arc::clone(config),
                sample: input.sample,
                pixel: Pixel::from(input.fragment),
            }
            .advance(Stage::ALL[0])
        });

        output
    }

    /// Drain every in-flight fragment
    ///
    /// Clocks the pipeline with no new input until it is empty and returns the
    /// drained outputs in order.
    pub fn flush(&mut self) -> Vec<PipelineOutput> {
        let mut drained = Vec::with_capacity(self.in_flight());
        while !self.is_idle() {
            drained.extend(self.shift());
        }
        drained
    }

    /// Retire the last slot and move every other fragment one stage on,
    /// leaving the first slot empty
    fn shift(&mut self) -> Option<PipelineOutput> {
        self.cycles += 1;

        let last = Self::LATENCY - 1;
        let output = self.slots[last].take().map(|f| f.pixel.into_output());
        for i in (1..=last).rev() {
            self.slots[i] = self.slots[i - 1].take().map(|f| f.advance(Stage::ALL[i]));
        }
        output
    }

    /// Number of fragments currently in flight
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when no fragment is in flight
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Clocks elapsed since creation or the last reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Discard every in-flight fragment and reset the cycle counter
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
