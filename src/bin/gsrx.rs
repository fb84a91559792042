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

//! gsrx command-line entry point
//!
//! Runs fragment streams through the pixel pipeline, decodes GS register
//! dumps into draw configurations and renders into a reference framebuffer.

use clap::{Parser, Subcommand};
use gsrx::core::array::PipelineArray;
use gsrx::core::memory::LocalMemory;
use gsrx::core::pipeline::{Fragment, PipelineConfig, PipelineInput, PipelineTracer};
use gsrx::core::registers::{RegisterFile, RegisterWrite};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gsrx")]
#[command(about = "GS pixel pipeline model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a fragment stream and write the pipeline outputs as JSON
    Run {
        /// Draw configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Pipeline inputs (JSON array of {fragment, sample})
        #[arg(short, long)]
        fragments: PathBuf,

        /// Number of pipeline lanes (default: GSRX_LANES or one per CPU)
        #[arg(short, long)]
        lanes: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a per-stage trace to this file
        #[arg(long)]
        trace: Option<PathBuf>,
    },
    /// Decode a GS register write list into a draw configuration
    Decode {
        /// Register writes (JSON array of {address, data})
        #[arg(short, long)]
        writes: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Draw fragments into a reference framebuffer and report write counts
    Render {
        /// Draw configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Fragments (JSON array)
        #[arg(short, long)]
        fragments: PathBuf,

        /// Framebuffer width in pixels
        #[arg(long, default_value = "640")]
        width: u16,

        /// Framebuffer height in pixels
        #[arg(long, default_value = "448")]
        height: u16,

        /// Clear colour, packed 0xAABBGGRR
        #[arg(long, default_value = "0", value_parser = parse_u32)]
        clear_color: u32,

        /// Clear depth
        #[arg(long, default_value = "0", value_parser = parse_u32)]
        clear_depth: u32,
    },
}

/// Parse a decimal or 0x-prefixed hexadecimal value
fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid value '{}': {}", s, e))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> gsrx::Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_text(path: Option<&Path>, text: &str) -> gsrx::Result<()> {
    match path {
        Some(path) => std::fs::write(path, text)?,
        None => println!("{}", text),
    }
    Ok(())
}

fn lanes_from_env() -> Option<usize> {
    let value = std::env::var("GSRX_LANES").ok()?;
    match value.parse() {
        Ok(lanes) => Some(lanes),
        Err(e) => {
            log::warn!("Ignoring GSRX_LANES={}: {}", value, e);
            None
        }
    }
}

fn run(
    config: &Path,
    fragments: &Path,
    lanes: Option<usize>,
    output: Option<&Path>,
    trace: Option<&Path>,
) -> gsrx::Result<()> {
    let config = PipelineConfig::load(config)?;
    let inputs: Vec<PipelineInput> = read_json(fragments)?;
    log::info!("Loaded {} fragments", inputs.len());

    let outputs = match trace {
        Some(trace) => {
            log::info!("Tracing to {}", trace.display());
            let mut tracer = PipelineTracer::new(trace)?;
            let outputs = inputs
                .iter()
                .map(|input| tracer.trace(&config, input))
                .collect::<gsrx::Result<Vec<_>>>()?;
            tracer.flush()?;
            outputs
        }
        None => {
            let mut array = match lanes.or_else(lanes_from_env) {
                Some(lanes) => PipelineArray::new(lanes)?,
                None => PipelineArray::with_available_parallelism()?,
            };
            log::info!("Processing on {} lanes", array.lane_count());
            array.load_config(config)?;
            array.process_batch(&inputs)
        }
    };

    write_text(output, &serde_json::to_string_pretty(&outputs)?)
}

fn decode(writes: &Path, output: Option<&Path>) -> gsrx::Result<()> {
    let writes: Vec<RegisterWrite> = read_json(writes)?;
    let mut registers = RegisterFile::new();
    let consumed = registers.write_all(&writes)?;
    log::info!(
        "Decoded {} of {} register writes (context {})",
        consumed,
        writes.len(),
        registers.active_context() + 1
    );

    let config = registers.snapshot();
    match output {
        Some(path) => config.save(path),
        None => write_text(None, &toml::to_string_pretty(&config)?),
    }
}

fn render(
    config: &Path,
    fragments: &Path,
    width: u16,
    height: u16,
    clear_color: u32,
    clear_depth: u32,
) -> gsrx::Result<()> {
    let config = PipelineConfig::load(config)?;
    let fragments: Vec<Fragment> = read_json(fragments)?;

    let mut memory = LocalMemory::new(width, height, config.frame_psm, config.zbuf_psm)?;
    memory.clear(clear_color, clear_depth);

    log::info!(
        "Rendering {} fragments into {}x{} {:?}/{:?}",
        fragments.len(),
        width,
        height,
        config.frame_psm,
        config.zbuf_psm
    );
    let stats = memory.draw(&config, &fragments)?;

    write_text(None, &serde_json::to_string_pretty(&stats)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            fragments,
            lanes,
            output,
            trace,
        } => run(
            &config,
            &fragments,
            lanes,
            output.as_deref(),
            trace.as_deref(),
        )?,
        Commands::Decode { writes, output } => decode(&writes, output.as_deref())?,
        Commands::Render {
            config,
            fragments,
            width,
            height,
            clear_color,
            clear_depth,
        } => render(
            &config,
            &fragments,
            width,
            height,
            clear_color,
            clear_depth,
        )?,
    }

    Ok(())
}
