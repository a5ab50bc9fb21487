//! WebGPU memory management.

use std::sync::Arc;

use mtsweep_core::accelerator::DeviceBuffer;
use mtsweep_core::error::{Result, SweepError};

use crate::adapter::WgpuAdapter;

/// Copies between host and device must be multiples of this many bytes.
const COPY_ALIGNMENT: usize = wgpu::COPY_BUFFER_ALIGNMENT as usize;

/// Round `len` up to a non-zero multiple of the copy alignment.
pub(crate) fn padded_size(len: usize) -> usize {
    len.div_ceil(COPY_ALIGNMENT).max(1) * COPY_ALIGNMENT
}

/// Storage buffer usable as a kernel binding.
///
/// The allocation is padded to a multiple of four bytes; [`len`](DeviceBuffer::len)
/// reports the logical size requested by the caller.
pub struct WgpuBuffer {
    /// The wgpu buffer.
    buffer: wgpu::Buffer,
    /// Logical size in bytes.
    len: usize,
    /// Allocated size in bytes.
    padded: usize,
    /// Reference to device.
    device: Arc<wgpu::Device>,
    /// Reference to queue.
    queue: Arc<wgpu::Queue>,
}

impl WgpuBuffer {
    /// Create a new zeroed storage buffer.
    pub fn new(adapter: &WgpuAdapter, len: usize, label: Option<&str>) -> Result<Self> {
        let padded = padded_size(len);
        let max = adapter.limits().max_storage_buffer_binding_size as usize;
        if padded > max {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "buffer {} of {} bytes exceeds device binding limit of {} bytes",
                label.unwrap_or("<unnamed>"),
                len,
                max
            )));
        }

        let buffer = adapter.device().create_buffer(&wgpu::BufferDescriptor {
            label,
            size: padded as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        Ok(Self {
            buffer,
            len,
            padded,
            device: Arc::clone(adapter.device()),
            queue: Arc::clone(adapter.queue()),
        })
    }

    /// Get the underlying wgpu buffer.
    pub fn inner(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Allocated size, including alignment padding.
    pub fn padded_len(&self) -> usize {
        self.padded
    }

    /// Create a binding for this buffer.
    pub fn as_entire_binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /// Upload `data` to the start of the buffer.
    pub fn copy_from_host(&self, data: &[u8]) -> Result<()> {
        if data.len() > self.len {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "write of {} bytes overflows buffer of {} bytes",
                data.len(),
                self.len
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        if data.len() % COPY_ALIGNMENT == 0 {
            self.queue.write_buffer(&self.buffer, 0, data);
        } else {
            let mut aligned = vec![0u8; padded_size(data.len())];
            aligned[..data.len()].copy_from_slice(data);
            self.queue.write_buffer(&self.buffer, 0, &aligned);
        }
        Ok(())
    }

    /// Download the start of the buffer into `data`.
    pub fn copy_to_host(&self, data: &mut [u8]) -> Result<()> {
        if data.len() > self.len {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "read of {} bytes overflows buffer of {} bytes",
                data.len(),
                self.len
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        let copy_len = padded_size(data.len()) as u64;

        // Create a staging buffer for reading
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mtsweep staging"),
            size: copy_len,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mtsweep readback"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, copy_len);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the poll below.
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| SweepError::AcceleratorExecutionFailed(format!("Channel error: {}", e)))?
            .map_err(|e| SweepError::AcceleratorExecutionFailed(format!("Map error: {}", e)))?;

        {
            let mapped = slice.get_mapped_range();
            data.copy_from_slice(&mapped[..data.len()]);
        }
        staging.unmap();

        Ok(())
    }
}

impl DeviceBuffer for WgpuBuffer {
    fn len(&self) -> usize {
        self.len
    }
}

impl std::fmt::Debug for WgpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBuffer")
            .field("len", &self.len)
            .field("padded", &self.padded)
            .finish()
    }
}
