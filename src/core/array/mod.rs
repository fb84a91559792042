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

//! Parallel pipeline array
//!
//! The GS scales pixel throughput by running several identical pixel
//! pipelines side by side. [`PipelineArray`] models that: N independent
//! [`PixelPipeline`] lanes share one read-only [`PipelineConfig`] snapshot,
//! and nothing else.
//!
//! # Configuration Broadcast
//!
//! A configuration load replaces the shared `Arc` snapshot for every lane at
//! once. Fragments already inside a stepped lane finish with the snapshot they
//! were admitted with.
//!
//! # Batch Evaluation
//!
//! [`PipelineArray::process_batch`] splits a fragment batch into contiguous
//! chunks, evaluates each chunk on a worker thread and writes results back in
//! input order. Because lanes never read each other's state the result is
//! identical to sequential evaluation.

use crate::core::error::{GsError, Result};
use crate::core::pipeline::{
    process, PipelineConfig, PipelineInput, PipelineOutput, PixelPipeline,
};
use crate::core::registers::RegisterFile;
use scoped_threadpool::Pool;
use std::sync::Arc;

/// N-wide array of pixel pipelines sharing one configuration
///
/// # Examples
///
/// ```
/// use gsrx::core::array::PipelineArray;
/// use gsrx::core::pipeline::{Fragment, PipelineConfig, PipelineInput};
///
/// let mut array = PipelineArray::new(4).unwrap();
/// array.load_config(PipelineConfig::default()).unwrap();
///
/// let inputs: Vec<PipelineInput> = (0..16)
///     .map(|i| PipelineInput::from(Fragment::at(i, 0).with_color(i as u8, 0, 0, 0)))
///     .collect();
/// let outputs = array.process_batch(&inputs);
///
/// assert_eq!(outputs.len(), 16);
/// assert_eq!(outputs[7].r, 7);
/// ```
pub struct PipelineArray {
    /// Stepped pipelines, one per lane
    lanes: Vec<PixelPipeline>,
    /// Snapshot broadcast to every lane
    config: Arc<PipelineConfig>,
    /// Worker threads for batch evaluation
    pool: Pool,
}

impl PipelineArray {
    /// Create an array with `lanes` pipelines and the default configuration
    ///
    /// # Errors
    ///
    /// - [`GsError::NoLanes`] if `lanes` is zero
    /// - [`GsError::TooManyLanes`] if the worker pool cannot be that wide
    pub fn new(lanes: usize) -> Result<Self> {
        if lanes == 0 {
            return Err(GsError::NoLanes);
        }
        let threads = u32::try_from(lanes).map_err(|_| GsError::TooManyLanes(lanes))?;

        log::debug!("Creating pipeline array with {} lanes", lanes);

        Ok(Self {
            lanes: vec![PixelPipeline::new(); lanes],
            config: Arc::new(PipelineConfig::default()),
            pool: Pool::new(threads),
        })
    }

    /// Create an array with one lane per available CPU
    pub fn with_available_parallelism() -> Result<Self> {
        Self::new(num_cpus::get().max(1))
    }

    /// Number of lanes
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Snapshot currently broadcast to every lane
    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    /// Broadcast a new configuration snapshot to every lane
    ///
    /// # Errors
    ///
    /// The configuration is validated first; on error the previous snapshot
    /// stays active.
    pub fn load_config(&mut self, config: PipelineConfig) -> Result<()> {
        config.validate()?;
        self.config = Arc::new(config);
        log::debug!(
            "Broadcast pipeline config to {} lanes: frame={:?} zbuf={:?}",
            self.lanes.len(),
            self.config.frame_psm,
            self.config.zbuf_psm
        );
        Ok(())
    }

    /// Broadcast the snapshot decoded from a register file
    pub fn load_registers(&mut self, registers: &RegisterFile) -> Result<()> {
        self.load_config(registers.snapshot())
    }

    /// Evaluate a batch of fragments across all lanes
    ///
    /// # Returns
    ///
    /// One output per input, in input order
    pub fn process_batch(&mut self, inputs: &[PipelineInput]) -> Vec<PipelineOutput> {
        if inputs.is_empty() {
            return Vec::new();
        }

        let mut outputs = vec![PipelineOutput::default(); inputs.len()];
        let chunk_size = inputs.len().div_ceil(self.lanes.len());
        let config: &PipelineConfig = &self.config;

        self.pool.scoped(|scope| {
            for (ins, outs) in inputs.chunks(chunk_size).zip(outputs.chunks_mut(chunk_size)) {
                scope.execute(move || {
                    for (input, output) in ins.iter().zip(outs.iter_mut()) {
                        *output = process(config, input);
                    }
                });
            }
        });

        log::trace!(
            "Processed batch of {} fragments in chunks of {}",
            inputs.len(),
            chunk_size
        );
        outputs
    }

    /// Advance every lane by one clock in lockstep
    ///
    /// # Arguments
    ///
    /// * `inputs` - One optional fragment per lane
    ///
    /// # Returns
    ///
    /// One optional output per lane
    ///
    /// # Errors
    ///
    /// [`GsError::LaneCountMismatch`] if `inputs` does not have one entry per
    /// lane; no lane is clocked in that case.
    pub fn clock_all(
        &mut self,
        inputs: Vec<Option<PipelineInput>>,
    ) -> Result<Vec<Option<PipelineOutput>>> {
        if inputs.len() != self.lanes.len() {
            return Err(GsError::LaneCountMismatch {
                expected: self.lanes.len(),
                actual: inputs.len(),
            });
        }

        let config = &self.config;
        Ok(self
            .lanes
            .iter_mut()
            .zip(inputs)
            .map(|(lane, input)| lane.clock(config, input))
            .collect())
    }

    /// Drain every lane, returning each lane's remaining outputs
    pub fn flush_all(&mut self) -> Vec<Vec<PipelineOutput>> {
        self.lanes.iter_mut().map(PixelPipeline::flush).collect()
    }

    /// True when no lane has a fragment in flight
    pub fn is_idle(&self) -> bool {
        self.lanes.iter().all(PixelPipeline::is_idle)
    }
}
