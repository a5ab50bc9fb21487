//! WebGPU backend integration tests.
//!
//! These tests require GPU hardware and the `wgpu-tests` feature.
//! Run with: cargo test -p mtsweep-wgpu --features wgpu-tests -- --ignored

#![cfg(feature = "wgpu-tests")]

use mtsweep_core::host::HostAccelerator;
use mtsweep_core::prelude::*;
use mtsweep_wgpu::WgpuAccelerator;

const WORK_GROUP_SIZE: u32 = 64;

/// Helper to check if WebGPU is available on this system.
fn wgpu_available() -> bool {
    mtsweep_wgpu::is_wgpu_available()
}

fn test_table(lanes: u32) -> ParameterTable {
    let records = (0..lanes)
        .map(|lane| ParameterRecord {
            matrix_a: 0xB400_0000 ^ (lane << 1),
            mask_b: 0x3A7F_8000,
            mask_c: 0x7FF6_0000,
            seed: lane,
        })
        .collect();
    ParameterTable::from_records(records)
}

fn options() -> SessionOptions {
    SessionOptions {
        oversubscription_factor: 2,
        work_group_size: WORK_GROUP_SIZE,
    }
}

#[test]
#[ignore] // Requires GPU
fn test_wgpu_accelerator_creation() {
    if !wgpu_available() {
        eprintln!("Skipping test: WebGPU not available");
        return;
    }

    let accelerator = WgpuAccelerator::new(WORK_GROUP_SIZE).expect("Failed to open device");
    assert_eq!(accelerator.work_group_size(), WORK_GROUP_SIZE);
    assert!(accelerator.lane_ceiling() >= WORK_GROUP_SIZE);
    println!("Device: {}", accelerator.name());
}

#[test]
#[ignore] // Requires GPU
fn test_wgpu_rejects_oversized_work_group() {
    if !wgpu_available() {
        eprintln!("Skipping test: WebGPU not available");
        return;
    }

    let result = WgpuAccelerator::new(u32::MAX);
    assert!(matches!(
        result,
        Err(SweepError::KernelCompilationFailed(_))
    ));
}

#[test]
#[ignore] // Requires GPU
fn test_wgpu_matches_host_kernel() {
    if !wgpu_available() {
        eprintln!("Skipping test: WebGPU not available");
        return;
    }

    let gpu = WgpuAccelerator::new(WORK_GROUP_SIZE).expect("Failed to open device");
    let lanes = gpu.lane_ceiling();
    let table = test_table(lanes);
    let host = HostAccelerator::new(lanes);

    let mut gpu_session = AcceleratorSession::with_parameters(gpu, &table, 7, options()).unwrap();
    let mut host_session =
        AcceleratorSession::with_parameters(host, &table, 7, options()).unwrap();

    // Odd length exercises the partial final word of the packed results.
    for &trials in &[1_001u64, 50_000] {
        let gpu_run = gpu_session.run(trials).unwrap();
        let host_run = host_session.run(trials).unwrap();
        assert_eq!(gpu_run.plan(), host_run.plan());
        assert_eq!(gpu_run.outcomes(), host_run.outcomes());
    }

    assert_eq!(
        gpu_session.read_state().unwrap(),
        host_session.read_state().unwrap()
    );

    gpu_session.close();
    host_session.close();
}

#[test]
#[ignore] // Requires GPU
fn test_wgpu_sample_mean_near_half() {
    if !wgpu_available() {
        eprintln!("Skipping test: WebGPU not available");
        return;
    }

    let gpu = WgpuAccelerator::new(WORK_GROUP_SIZE).expect("Failed to open device");
    let table = test_table(gpu.lane_ceiling());
    let mut session = AcceleratorSession::with_parameters(gpu, &table, 1, options()).unwrap();

    let run = session.run(1_000_000).unwrap();
    assert!(run.outcomes().iter().all(|&b| b <= 1));
    assert!((run.sample_mean() - 0.5).abs() < 0.01);
}

#[test]
#[ignore] // Requires GPU
fn test_wgpu_dispatch_with_wrong_work_group_size_fails() {
    if !wgpu_available() {
        eprintln!("Skipping test: WebGPU not available");
        return;
    }

    let gpu = WgpuAccelerator::new(WORK_GROUP_SIZE).expect("Failed to open device");
    let table = test_table(gpu.lane_ceiling());
    let mismatched = SessionOptions {
        work_group_size: WORK_GROUP_SIZE * 2,
        ..options()
    };
    let mut session = AcceleratorSession::with_parameters(gpu, &table, 1, mismatched).unwrap();

    assert!(matches!(
        session.run(1_000),
        Err(SweepError::AcceleratorExecutionFailed(_))
    ));
}
