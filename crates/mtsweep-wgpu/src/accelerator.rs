//! [`Accelerator`] implementation on top of wgpu.

use mtsweep_core::accelerator::{Accelerator, KernelArgs};
use mtsweep_core::dispatch::DispatchPlan;
use mtsweep_core::error::{Result, SweepError};

use crate::adapter::WgpuAdapter;
use crate::memory::WgpuBuffer;
use crate::shader::BernoulliPipeline;

/// GPU device running the Bernoulli kernel through WebGPU.
///
/// The kernel is compiled once for a fixed work-group size; dispatches
/// requesting a different size are rejected.
pub struct WgpuAccelerator {
    /// Compiled kernel. Released before the device.
    pipeline: BernoulliPipeline,
    /// Display name.
    name: String,
    /// Device and queue.
    adapter: WgpuAdapter,
}

impl WgpuAccelerator {
    /// Open the default adapter and compile the kernel.
    pub fn new(work_group_size: u32) -> Result<Self> {
        let adapter = WgpuAdapter::new()?;
        Self::with_adapter(adapter, work_group_size)
    }

    /// Compile the kernel on an already opened adapter.
    pub fn with_adapter(adapter: WgpuAdapter, work_group_size: u32) -> Result<Self> {
        let pipeline = BernoulliPipeline::new(&adapter, work_group_size)?;
        let name = format!("{} ({:?})", adapter.name(), adapter.backend());
        Ok(Self {
            pipeline,
            name,
            adapter,
        })
    }

    /// The underlying adapter.
    pub fn adapter(&self) -> &WgpuAdapter {
        &self.adapter
    }

    /// Work-group size the kernel was compiled for.
    pub fn work_group_size(&self) -> u32 {
        self.pipeline.work_group_size()
    }
}

impl Accelerator for WgpuAccelerator {
    type Buffer = WgpuBuffer;

    fn name(&self) -> &str {
        &self.name
    }

    fn lane_ceiling(&self) -> u32 {
        self.adapter.max_lanes_per_group()
    }

    fn allocate(&self, len: usize, label: &str) -> Result<WgpuBuffer> {
        WgpuBuffer::new(&self.adapter, len, Some(label))
    }

    fn write(&self, buffer: &mut WgpuBuffer, data: &[u8]) -> Result<()> {
        buffer.copy_from_host(data)
    }

    fn read(&self, buffer: &WgpuBuffer, out: &mut [u8]) -> Result<()> {
        buffer.copy_to_host(out)
    }

    fn dispatch(
        &self,
        args: KernelArgs<'_, WgpuBuffer>,
        plan: &DispatchPlan,
        work_group_size: u32,
    ) -> Result<()> {
        if work_group_size != self.pipeline.work_group_size() {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "kernel compiled for work-group size {}, dispatch requested {}",
                self.pipeline.work_group_size(),
                work_group_size
            )));
        }

        let groups = plan.work_groups(work_group_size);
        let max_groups = self.adapter.limits().max_compute_workgroups_per_dimension;
        if groups > max_groups {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "{} work groups exceed device limit of {}",
                groups, max_groups
            )));
        }

        let device = self.adapter.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let buffers = args.in_binding_order();
        let entries: Vec<wgpu::BindGroupEntry<'_>> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mtsweep bind group"),
            layout: self.pipeline.bind_group_layout(),
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mtsweep dispatch"),
        });

        // Outcomes are OR-ed into the packed words.
        encoder.clear_buffer(args.results.inner(), 0, None);

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("mtsweep bernoulli pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(self.pipeline.pipeline());
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }

        self.adapter.queue().submit(Some(encoder.finish()));
        self.adapter.wait_idle();

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(SweepError::AcceleratorExecutionFailed(error.to_string()));
        }

        tracing::trace!(
            lanes = plan.lane_count,
            trials_per_lane = plan.trials_per_lane,
            groups,
            "dispatch complete"
        );
        Ok(())
    }
}

impl std::fmt::Debug for WgpuAccelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuAccelerator")
            .field("name", &self.name)
            .field("work_group_size", &self.pipeline.work_group_size())
            .finish()
    }
}
