//! Direct channel shared memory
//!
//! `SharedMemory` is the byte-addressable region the HAL writes
//! `DirectReportRecord`s into and the suite reads back.

use bytemuck::{Pod, Zeroable};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ContractError;

/// Memory kind backing a direct channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedMemType {
    /// Anonymous shared memory
    Ashmem,
    /// Graphics-buffer-backed memory
    Gralloc,
}

impl std::fmt::Display for SharedMemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SharedMemType::Ashmem => f.write_str("ashmem"),
            SharedMemType::Gralloc => f.write_str("gralloc"),
        }
    }
}

/// Shared byte region.
///
/// Clones alias the same bytes.
#[derive(Debug, Clone, Default)]
pub struct SharedMemory {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedMemory {
    /// Allocate `size` zeroed bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(vec![0; size])),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Overwrite every byte with `value`.
    pub fn fill(&self, value: u8) {
        self.lock().fill(value);
    }

    /// Copy `data` to `offset`.
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<(), ContractError> {
        let mut bytes = self.lock();
        let size = bytes.len();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= size)
            .ok_or(ContractError::MemoryOutOfBounds {
                offset,
                len: data.len(),
                size,
            })?;
        bytes[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Point-in-time copy of the whole region.
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.lock())
    }
}

/// Memory descriptor passed to `register_direct_channel`.
#[derive(Debug, Clone)]
pub struct SharedMemInfo {
    pub mem_type: SharedMemType,
    /// Usable size in bytes
    pub size: usize,
    pub memory: SharedMemory,
}

impl SharedMemInfo {
    /// Allocate a region large enough for `records` direct report records.
    pub fn with_record_capacity(mem_type: SharedMemType, records: usize) -> Self {
        let size = records * DirectReportRecord::SIZE;
        Self {
            mem_type,
            size,
            memory: SharedMemory::new(size),
        }
    }

    /// Number of whole records the region holds.
    pub fn record_capacity(&self) -> usize {
        self.size / DirectReportRecord::SIZE
    }
}

/// One direct report record as laid out in shared memory.
///
/// | offset | field |
/// |---|---|
/// | 0 | size (`i32`, always 104) |
/// | 4 | report token |
/// | 8 | sensor type |
/// | 12 | atomic counter, starts at 1 |
/// | 16 | timestamp (ns) |
/// | 24 | data `f32[16]` |
/// | 88 | reserved `i32[4]` |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectReportRecord {
    pub size: i32,
    pub report_token: i32,
    pub sensor_type: i32,
    pub counter: u32,
    pub timestamp: i64,
    pub data: [f32; 16],
    pub reserved: [i32; 4],
}

impl DirectReportRecord {
    pub const SIZE: usize = std::mem::size_of::<DirectReportRecord>();

    /// Record with the size field set and `data[..values.len()]` filled.
    pub fn new(report_token: i32, sensor_type: i32, counter: u32, timestamp: i64, values: &[f32]) -> Self {
        let mut data = [0.0; 16];
        let n = values.len().min(data.len());
        data[..n].copy_from_slice(&values[..n]);
        Self {
            size: Self::SIZE as i32,
            report_token,
            sensor_type,
            counter,
            timestamp,
            data,
            reserved: [0; 4],
        }
    }

    /// Decode record `index` from a region snapshot.
    pub fn read_at(region: &[u8], index: usize) -> Option<Self> {
        let start = index.checked_mul(Self::SIZE)?;
        let bytes = region.get(start..start.checked_add(Self::SIZE)?)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(DirectReportRecord::SIZE, 104);
        assert_eq!(std::mem::offset_of!(DirectReportRecord, counter), 12);
        assert_eq!(std::mem::offset_of!(DirectReportRecord, timestamp), 16);
        assert_eq!(std::mem::offset_of!(DirectReportRecord, data), 24);
        assert_eq!(std::mem::offset_of!(DirectReportRecord, reserved), 88);
    }

    #[test]
    fn test_write_and_read_back() {
        let info = SharedMemInfo::with_record_capacity(SharedMemType::Ashmem, 4);
        assert_eq!(info.record_capacity(), 4);
        info.memory.fill(0xCC);

        let record = DirectReportRecord::new(7, 1, 1, 1_000, &[0.0, 0.0, 9.8]);
        info.memory
            .write_at(DirectReportRecord::SIZE, record.as_bytes())
            .unwrap();

        let snapshot = info.memory.snapshot();
        let decoded = DirectReportRecord::read_at(&snapshot, 1).unwrap();
        assert_eq!(decoded, record);

        let untouched = DirectReportRecord::read_at(&snapshot, 0).unwrap();
        assert_ne!(untouched.size, 104);
        assert!(DirectReportRecord::read_at(&snapshot, 4).is_none());
    }

    #[test]
    fn test_write_out_of_bounds() {
        let mem = SharedMemory::new(8);
        let err = mem.write_at(4, &[0; 8]).unwrap_err();
        assert!(matches!(err, ContractError::MemoryOutOfBounds { size: 8, .. }));
    }
}
