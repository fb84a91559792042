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

//! gsrx: A model of the PlayStation 2 Graphics Synthesizer pixel pipeline
//!
//! This crate implements the per-pixel output merger of the GS: the six
//! stages that decide whether, and with what colour, a rasterized fragment
//! is written to the framebuffer and depth buffer.
//!
//! # Architecture
//!
//! - [`core::pipeline`]: Fragment model, per-draw configuration and the six
//!   stages (alpha test, destination alpha test, depth test, alpha blend,
//!   dither, clamp), run either at once or one clock at a time
//! - [`core::array`]: N-wide pipeline array sharing one configuration
//! - [`core::registers`]: GS register decode into a configuration snapshot
//! - [`core::memory`]: Reference framebuffer and depth buffer
//!
//! # Example
//!
//! ```
//! use gsrx::core::pipeline::{process, AlphaTestMode, Fragment, PipelineConfig, PipelineInput};
//!
//! let mut config = PipelineConfig::default();
//! config.alpha_test.enable = true;
//! config.alpha_test.mode = AlphaTestMode::Gequal;
//! config.alpha_test.reference = 0x40;
//!
//! let input = PipelineInput::from(Fragment::at(10, 20).with_color(10, 20, 30, 0x80));
//! let out = process(&config, &input);
//! assert_eq!((out.r, out.g, out.b), (10, 20, 30));
//! # Ok::<(), gsrx::core::error::GsError>(())
//! ```
//!
//! # Error Handling
//!
//! The pipeline stages never fail. Fallible operations at the edges (register
//! decode, configuration files, memory access) return
//! [`core::error::Result<T>`], an alias for `Result<T, GsError>`.

pub mod core;

// Re-export commonly used types
pub use core::error::{GsError, Result};
