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

//! Pipeline stage tracer for debugging
//!
//! Runs fragments through the pipeline one stage at a time and logs the
//! intermediate state after every stage to a file.

use super::config::PipelineConfig;
use super::fragment::{PipelineInput, PipelineOutput, Pixel, WriteMask};
use super::Stage;
use crate::core::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Per-stage pipeline tracer
///
/// Each traced fragment produces one line per stage showing:
/// - Fragment sequence number and stage name
/// - Integer pixel position and depth
/// - 9-bit colour and alpha
/// - Write-enable flags as `CAZ` with `-` for cleared flags
///
/// # Example
/// ```no_run
/// use gsrx::core::pipeline::{Fragment, PipelineConfig, PipelineInput, PipelineTracer};
///
/// let config = PipelineConfig::default();
/// let mut tracer = PipelineTracer::new("pipeline.log").unwrap();
///
/// let input = PipelineInput::from(Fragment::at(0, 0));
/// let out = tracer.trace(&config, &input).unwrap();
/// tracer.flush().unwrap();
/// # let _ = out;
/// ```
pub struct PipelineTracer {
    /// Enable/disable tracing
    enabled: bool,
    /// Fragments traced so far
    sequence: u64,
    /// Output file handle
    output: BufWriter<File>,
}

impl PipelineTracer {
    /// Create a new tracer
    ///
    /// Opens a file for writing trace output. If the file exists, it will be
    /// overwritten.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the output trace file
    ///
    /// # Returns
    ///
    /// - `Ok(PipelineTracer)` if the file was opened successfully
    /// - `Err(GsError)` if file creation fails
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let output = File::create(path)?;
        Ok(Self {
            enabled: true,
            sequence: 0,
            output: BufWriter::new(output),
        })
    }

    /// Enable or disable tracing
    ///
    /// When disabled, `trace()` still processes the fragment but writes
    /// nothing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check if tracing is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Process one fragment, logging its state after every stage
    ///
    /// # Returns
    ///
    /// - `Ok(PipelineOutput)` identical to [`process`](super::process)
    /// - `Err(GsError)` if writing fails
    pub fn trace(
        &mut self,
        config: &PipelineConfig,
        input: &PipelineInput,
    ) -> Result<PipelineOutput> {
        let mut pixel = Pixel::from(input.fragment);
        let seq = self.sequence;
        self.sequence += 1;

        if self.enabled {
            self.write_line(seq, "IN  ", &pixel)?;
        }

        for stage in Stage::ALL {
            pixel = stage.apply(config, &input.sample, pixel);
            if self.enabled {
                self.write_line(seq, stage.name(), &pixel)?;
            }
        }

        Ok(pixel.into_output())
    }

    fn write_line(&mut self, seq: u64, label: &str, pixel: &Pixel) -> Result<()> {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        if let Err(e) = writeln!(
            self.output,
            "#{:<6} {:4} ({:4},{:4}) z=0x{:08X} rgb=({:3},{:3},{:3}) a=0x{:02X} [{}{}{}]",
            seq,
            label,
            pixel.x.pixel(),
            pixel.y.pixel(),
            pixel.z,
            pixel.rgb.r(),
            pixel.rgb.g(),
            pixel.rgb.b(),
            pixel.alpha,
            flag(pixel.write.contains(WriteMask::COLOR), 'C'),
            flag(pixel.write.contains(WriteMask::ALPHA), 'A'),
            flag(pixel.write.contains(WriteMask::DEPTH), 'Z'),
        ) {
            log::warn!("Failed to write trace line: {}", e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Flush the output buffer
    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }
}

impl Drop for PipelineTracer {
    fn drop(&mut self) {
        // Flush any remaining data when tracer is dropped
        let _ = self.output.flush();
    }
}
