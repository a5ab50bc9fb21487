//! WebGPU backend for mtsweep.
//!
//! Runs the Bernoulli Mersenne Twister kernel on any adapter wgpu can open
//! (Vulkan, Metal, DX12). Device calls are driven synchronously with
//! `pollster`, and each dispatch waits for the queue to drain before
//! returning.
//!
//! # Example
//!
//! ```ignore
//! use mtsweep_core::prelude::*;
//! use mtsweep_wgpu::WgpuAccelerator;
//!
//! let accelerator = WgpuAccelerator::new(128)?;
//! let mut session = AcceleratorSession::initialize(
//!     accelerator,
//!     std::fs::File::open("data/MersenneTwister.dat")?,
//!     1,
//!     SessionOptions::default(),
//! )?;
//! let run = session.run(1_000_000)?;
//! println!("mean = {}", run.sample_mean());
//! ```

#![warn(missing_docs)]

pub mod accelerator;
pub mod adapter;
pub mod memory;
pub mod shader;

pub use accelerator::WgpuAccelerator;
pub use adapter::{is_wgpu_available, WgpuAdapter};
pub use memory::WgpuBuffer;
pub use shader::{bernoulli_shader_source, BernoulliPipeline, BERNOULLI_WGSL};
