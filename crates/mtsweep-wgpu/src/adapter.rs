//! WebGPU adapter management.

use std::sync::Arc;

use mtsweep_core::error::{Result, SweepError};

/// Wrapper around wgpu adapter and device.
pub struct WgpuAdapter {
    /// The command queue.
    queue: Arc<wgpu::Queue>,
    /// The device.
    device: Arc<wgpu::Device>,
    /// The selected adapter.
    #[allow(dead_code)]
    adapter: wgpu::Adapter,
    /// The wgpu instance.
    #[allow(dead_code)]
    instance: wgpu::Instance,
    /// Adapter info.
    info: wgpu::AdapterInfo,
}

impl WgpuAdapter {
    /// Select a high-performance adapter and open a device on it.
    ///
    /// The device is requested with the adapter's own limits so that large
    /// result buffers fit.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            SweepError::AcceleratorUnavailable("No WebGPU adapter found".to_string())
        })?;

        let info = adapter.get_info();

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mtsweep device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|e| {
            SweepError::AcceleratorUnavailable(format!("Failed to create device: {}", e))
        })?;

        tracing::info!(
            "Created WebGPU adapter: {} ({:?})",
            info.name,
            info.backend
        );

        Ok(Self {
            queue: Arc::new(queue),
            device: Arc::new(device),
            adapter,
            instance,
            info,
        })
    }

    /// Get the adapter name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Get the backend type.
    pub fn backend(&self) -> wgpu::Backend {
        self.info.backend
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the command queue.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Get device limits.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Maximum invocations a single work group can run.
    pub fn max_lanes_per_group(&self) -> u32 {
        let limits = self.limits();
        limits
            .max_compute_invocations_per_workgroup
            .min(limits.max_compute_workgroup_size_x)
    }

    /// Block until all submitted work has completed.
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

/// Check whether a WebGPU adapter can be found on this system.
pub fn is_wgpu_available() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // May not have GPU in CI
    fn test_adapter_creation() {
        let adapter = WgpuAdapter::new().unwrap();
        println!("Adapter: {} ({:?})", adapter.name(), adapter.backend());
        assert!(adapter.max_lanes_per_group() >= 64);
    }
}
