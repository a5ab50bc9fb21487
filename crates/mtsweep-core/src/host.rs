//! Host execution of the Bernoulli sampling kernel.
//!
//! [`HostAccelerator`] implements the kernel contract on the CPU with the
//! same twist and tempering arithmetic as the WGSL kernel, spreading lanes
//! over the rayon thread pool. It is used when no GPU is available and as a
//! reference for checking device output.

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::accelerator::{Accelerator, DeviceBuffer, KernelArgs};
use crate::dispatch::DispatchPlan;
use crate::error::{Result, SweepError};
use crate::params::{ParameterRecord, RECORD_SIZE};
use crate::stream::{STATE_WIDTH, WORDS_PER_LANE};

/// Twist offset.
pub const MT_MM: usize = 9;
const MT_UMASK: u32 = 0xFFFF_FFFE;
const MT_LMASK: u32 = 0x0000_0001;
const MT_SHIFT0: u32 = 12;
const MT_SHIFTB: u32 = 7;
const MT_SHIFTC: u32 = 15;
const MT_SHIFT1: u32 = 18;

/// Default lane ceiling of the host device.
pub const DEFAULT_HOST_LANE_CEILING: u32 = 64;

/// Advance one lane's generator and return the next tempered word.
///
/// `slot` is the lane's state: [`STATE_WIDTH`] words followed by the
/// position counter.
pub fn next_tempered(record: &ParameterRecord, slot: &mut [u32]) -> u32 {
    let i = slot[STATE_WIDTH] as usize % STATE_WIDTH;
    let i1 = (i + 1) % STATE_WIDTH;
    let im = (i + MT_MM) % STATE_WIDTH;

    let mut x = (slot[i] & MT_UMASK) | (slot[i1] & MT_LMASK);
    x = slot[im] ^ (x >> 1) ^ if x & 1 != 0 { record.matrix_a } else { 0 };
    slot[i] = x;
    slot[STATE_WIDTH] = i1 as u32;

    x ^= x >> MT_SHIFT0;
    x ^= (x << MT_SHIFTB) & record.mask_b;
    x ^= (x << MT_SHIFTC) & record.mask_c;
    x ^= x >> MT_SHIFT1;
    x
}

/// Bernoulli(0.5) outcome of a tempered word: 1 when the uniform falls below one half.
#[inline]
pub fn bernoulli(word: u32) -> u8 {
    u8::from(word < 0x8000_0000)
}

/// Fill `out` with outcomes of a single lane.
pub fn sample_lane(record: &ParameterRecord, slot: &mut [u32], out: &mut [u8]) {
    for outcome in out.iter_mut() {
        *outcome = bernoulli(next_tempered(record, slot));
    }
}

/// Host memory buffer.
#[derive(Debug)]
pub struct HostBuffer {
    data: Mutex<Vec<u8>>,
    label: String,
}

impl HostBuffer {
    /// Buffer label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl DeviceBuffer for HostBuffer {
    fn len(&self) -> usize {
        self.data.lock().len()
    }
}

/// CPU implementation of [`Accelerator`].
#[derive(Debug, Clone)]
pub struct HostAccelerator {
    lane_ceiling: u32,
    name: String,
}

impl HostAccelerator {
    /// Create a host device with a given lane ceiling.
    pub fn new(lane_ceiling: u32) -> Self {
        Self {
            lane_ceiling,
            name: format!("host ({} threads)", rayon::current_num_threads()),
        }
    }
}

impl Default for HostAccelerator {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_LANE_CEILING)
    }
}

fn read_u32(buffer: &HostBuffer, what: &str) -> Result<u32> {
    let data = buffer.data.lock();
    let bytes: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            SweepError::AcceleratorExecutionFailed(format!("{} buffer holds no u32", what))
        })?;
    Ok(u32::from_ne_bytes(bytes))
}

impl Accelerator for HostAccelerator {
    type Buffer = HostBuffer;

    fn name(&self) -> &str {
        &self.name
    }

    fn lane_ceiling(&self) -> u32 {
        self.lane_ceiling
    }

    fn allocate(&self, len: usize, label: &str) -> Result<HostBuffer> {
        Ok(HostBuffer {
            data: Mutex::new(vec![0u8; len]),
            label: label.to_string(),
        })
    }

    fn write(&self, buffer: &mut HostBuffer, data: &[u8]) -> Result<()> {
        let mut dst = buffer.data.lock();
        if data.len() > dst.len() {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "write of {} bytes overflows {} buffer of {} bytes",
                data.len(),
                buffer.label,
                dst.len()
            )));
        }
        dst[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, buffer: &HostBuffer, out: &mut [u8]) -> Result<()> {
        let src = buffer.data.lock();
        if out.len() > src.len() {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "read of {} bytes overflows {} buffer of {} bytes",
                out.len(),
                buffer.label,
                src.len()
            )));
        }
        out.copy_from_slice(&src[..out.len()]);
        Ok(())
    }

    fn dispatch(
        &self,
        args: KernelArgs<'_, HostBuffer>,
        plan: &DispatchPlan,
        _work_group_size: u32,
    ) -> Result<()> {
        let trials_per_lane = read_u32(args.trials_per_lane, "trials per lane")? as usize;
        let lane_count = read_u32(args.lane_count, "lane count")? as usize;
        debug_assert_eq!(lane_count, plan.lane_count as usize);

        let records: Vec<ParameterRecord> = {
            let bytes = args.parameters.data.lock();
            bytes
                .chunks_exact(RECORD_SIZE)
                .filter_map(|chunk| chunk.try_into().ok())
                .map(ParameterRecord::from_le_bytes)
                .collect()
        };
        if records.is_empty() {
            return Err(SweepError::AcceleratorExecutionFailed(
                "parameter buffer is empty".to_string(),
            ));
        }

        let mut state_bytes = args.state.data.lock();
        let mut results = args.results.data.lock();

        if state_bytes.len() < lane_count * WORDS_PER_LANE * 4 {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "state buffer covers fewer than {} lanes",
                lane_count
            )));
        }
        if results.len() < lane_count * trials_per_lane {
            return Err(SweepError::AcceleratorExecutionFailed(format!(
                "result buffer of {} bytes is smaller than {} lanes x {} trials",
                results.len(),
                lane_count,
                trials_per_lane
            )));
        }
        if trials_per_lane == 0 {
            return Ok(());
        }

        let mut state: Vec<u32> =
            bytemuck::pod_collect_to_vec(&state_bytes[..lane_count * WORDS_PER_LANE * 4]);

        results[..lane_count * trials_per_lane]
            .par_chunks_mut(trials_per_lane)
            .zip(state.par_chunks_mut(WORDS_PER_LANE))
            .enumerate()
            .for_each(|(lane, (out, slot))| {
                sample_lane(&records[lane % records.len()], slot, out);
            });

        state_bytes[..lane_count * WORDS_PER_LANE * 4]
            .copy_from_slice(bytemuck::cast_slice(&state));

        Ok(())
    }
}
