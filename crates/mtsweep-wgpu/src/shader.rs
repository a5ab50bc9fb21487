//! WGSL source and compute pipeline for the Bernoulli sampling kernel.

use mtsweep_core::error::{Result, SweepError};
use mtsweep_core::host::MT_MM;
use mtsweep_core::stream::{STATE_WIDTH, WORDS_PER_LANE};

use crate::adapter::WgpuAdapter;

/// Entry point of [`BERNOULLI_WGSL`].
pub const ENTRY_POINT: &str = "main";

/// Bernoulli(0.5) sampling kernel.
///
/// Placeholders in braces are substituted by [`bernoulli_shader_source`].
/// Outcomes are packed four per `u32` in little-endian byte order and set
/// with `atomicOr`, so the result buffer must be cleared before dispatch.
pub const BERNOULLI_WGSL: &str = r#"
struct MtParams {
    matrix_a: u32,
    mask_b: u32,
    mask_c: u32,
    seed: u32,
}

@group(0) @binding(0) var<storage, read> params: array<MtParams>;
@group(0) @binding(1) var<storage, read> trials_per_lane: u32;
@group(0) @binding(2) var<storage, read> lane_count: u32;
@group(0) @binding(3) var<storage, read_write> results: array<atomic<u32>>;
@group(0) @binding(4) var<storage, read_write> state: array<u32>;

const MT_NN: u32 = {STATE_WIDTH}u;
const MT_MM: u32 = {MT_MM}u;
const MT_WORDS: u32 = {WORDS_PER_LANE}u;
const MT_UMASK: u32 = 0xFFFFFFFEu;
const MT_LMASK: u32 = 0x00000001u;

@compute @workgroup_size({WORKGROUP_SIZE})
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let lane = gid.x;
    if (lane >= lane_count) {
        return;
    }

    let p = params[lane % arrayLength(&params)];
    let base = lane * MT_WORDS;
    let first = lane * trials_per_lane;
    var i = state[base + MT_NN] % MT_NN;

    for (var t = 0u; t < trials_per_lane; t = t + 1u) {
        let i1 = (i + 1u) % MT_NN;
        let im = (i + MT_MM) % MT_NN;

        var x = (state[base + i] & MT_UMASK) | (state[base + i1] & MT_LMASK);
        var mag = 0u;
        if ((x & 1u) != 0u) {
            mag = p.matrix_a;
        }
        x = state[base + im] ^ (x >> 1u) ^ mag;
        state[base + i] = x;
        i = i1;

        x = x ^ (x >> 12u);
        x = x ^ ((x << 7u) & p.mask_b);
        x = x ^ ((x << 15u) & p.mask_c);
        x = x ^ (x >> 18u);

        if (x < 0x80000000u) {
            let idx = first + t;
            atomicOr(&results[idx >> 2u], 1u << ((idx & 3u) * 8u));
        }
    }

    state[base + MT_NN] = i;
}
"#;

/// Kernel source with the work-group size and generator constants filled in.
pub fn bernoulli_shader_source(work_group_size: u32) -> String {
    BERNOULLI_WGSL
        .replace("{STATE_WIDTH}", &STATE_WIDTH.to_string())
        .replace("{MT_MM}", &MT_MM.to_string())
        .replace("{WORDS_PER_LANE}", &WORDS_PER_LANE.to_string())
        .replace("{WORKGROUP_SIZE}", &work_group_size.to_string())
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compiled Bernoulli compute pipeline.
pub struct BernoulliPipeline {
    /// The wgpu pipeline.
    pipeline: wgpu::ComputePipeline,
    /// Bind group layout.
    bind_group_layout: wgpu::BindGroupLayout,
    /// Workgroup size.
    work_group_size: u32,
}

impl BernoulliPipeline {
    /// Compile the kernel for a given work-group size.
    ///
    /// Validation errors raised while building the shader or pipeline are
    /// reported as [`SweepError::KernelCompilationFailed`].
    pub fn new(adapter: &WgpuAdapter, work_group_size: u32) -> Result<Self> {
        let max = adapter.max_lanes_per_group();
        if work_group_size == 0 || work_group_size > max {
            return Err(SweepError::KernelCompilationFailed(format!(
                "work-group size {} outside device range 1..={}",
                work_group_size, max
            )));
        }

        let device = adapter.device();
        let source = bernoulli_shader_source(work_group_size);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mtsweep bernoulli"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mtsweep bind group layout"),
            entries: &[
                // Parameters
                storage_entry(0, true),
                // Trials per lane
                storage_entry(1, true),
                // Lane count
                storage_entry(2, true),
                // Results
                storage_entry(3, false),
                // State
                storage_entry(4, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mtsweep pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("mtsweep compute pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: ENTRY_POINT,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(SweepError::KernelCompilationFailed(error.to_string()));
        }

        tracing::debug!(work_group_size, "compiled Bernoulli kernel");

        Ok(Self {
            pipeline,
            bind_group_layout,
            work_group_size,
        })
    }

    /// Get the pipeline.
    pub fn pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    /// Get bind group layout.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Work-group size the kernel was compiled for.
    pub fn work_group_size(&self) -> u32 {
        self.work_group_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_source_substitution() {
        let source = bernoulli_shader_source(128);
        assert!(source.contains("@workgroup_size(128)"));
        assert!(source.contains("const MT_NN: u32 = 19u;"));
        assert!(source.contains("const MT_MM: u32 = 9u;"));
        assert!(source.contains("const MT_WORDS: u32 = 20u;"));
        for placeholder in ["{STATE_WIDTH}", "{MT_MM}", "{WORDS_PER_LANE}", "{WORKGROUP_SIZE}"] {
            assert!(!source.contains(placeholder));
        }
    }

    #[test]
    fn test_bindings_declared_in_order() {
        let source = bernoulli_shader_source(64);
        let positions: Vec<usize> = (0..5)
            .map(|b| source.find(&format!("@binding({})", b)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
