//! Device abstraction for the Bernoulli sampling kernel.
//!
//! An [`Accelerator`] owns a device, its command channel and the compiled
//! kernel. It hands out device-visible buffers and runs one dispatch at a
//! time, returning only once the device has signalled completion.
//!
//! # Kernel contract
//!
//! The kernel receives five buffers in a fixed order:
//!
//! | Binding | Buffer | Contents |
//! |---|---|---|
//! | 0 | parameters | one [`ParameterRecord`](crate::params::ParameterRecord) per hardware lane |
//! | 1 | trials per lane | a single `u32` |
//! | 2 | lane count | a single `u32` |
//! | 3 | results | one byte (0 or 1) per trial, lane-major |
//! | 4 | state | [`WORDS_PER_LANE`](crate::stream::WORDS_PER_LANE) `u32`s per lane |
//!
//! Lane `i` uses parameter record `i % records`, consumes and advances its
//! own state slice, and writes `trials_per_lane` outcomes starting at byte
//! `i * trials_per_lane`.

use crate::dispatch::DispatchPlan;
use crate::error::Result;

/// A device-visible buffer.
pub trait DeviceBuffer {
    /// Logical length in bytes.
    fn len(&self) -> usize;

    /// True for zero-length buffers.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Buffers bound to one kernel dispatch, in binding order.
#[derive(Debug)]
pub struct KernelArgs<'a, B> {
    /// Parameter table.
    pub parameters: &'a B,
    /// Trials-per-lane scalar.
    pub trials_per_lane: &'a B,
    /// Lane-count scalar.
    pub lane_count: &'a B,
    /// Result bytes.
    pub results: &'a B,
    /// Generator state.
    pub state: &'a B,
}

impl<'a, B> KernelArgs<'a, B> {
    /// Buffers in binding order 0..=4.
    pub fn in_binding_order(&self) -> [&'a B; 5] {
        [
            self.parameters,
            self.trials_per_lane,
            self.lane_count,
            self.results,
            self.state,
        ]
    }
}

/// Compute device able to run the Bernoulli sampling kernel.
pub trait Accelerator {
    /// Buffer type allocated by this device.
    type Buffer: DeviceBuffer;

    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Maximum number of lanes the device runs concurrently in one group.
    fn lane_ceiling(&self) -> u32;

    /// Allocate a zero-initialised buffer of `len` bytes.
    fn allocate(&self, len: usize, label: &str) -> Result<Self::Buffer>;

    /// Overwrite the start of `buffer` with `data`.
    fn write(&self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<()>;

    /// Copy the first `out.len()` bytes of `buffer` to the host.
    fn read(&self, buffer: &Self::Buffer, out: &mut [u8]) -> Result<()>;

    /// Run the kernel over `plan.lane_count` lanes and block until it completes.
    fn dispatch(
        &self,
        args: KernelArgs<'_, Self::Buffer>,
        plan: &DispatchPlan,
        work_group_size: u32,
    ) -> Result<()>;
}
