mod ingest;
mod region;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::{DVec2, DVec3};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::host::SimValue;
use crate::registry::{Registry, STORE_FORMAT_VERSION, Slot, SlotKind};

pub use ingest::{Ingest, IngestSummary};
pub use region::SlotValue;

pub(crate) use region::{decode, read_f64};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub format_version: u32,
    /// Advances by one (wrapping) per completed tick.
    pub update_counter: u32,
    /// Set once the first tick has completed.
    pub data_valid: bool,
    /// Microseconds since the UNIX epoch, never decreasing.
    pub timestamp_us: u64,
}

#[derive(Debug)]
struct StoreInner {
    header: StoreHeader,
    region: Vec<u8>,
}

/// The single synchronized snapshot of every slot value.
///
/// One writer applies a whole tick under the exclusive lock; readers hold the
/// shared lock for a full serialize or copy pass, so a reader never sees two
/// ticks mixed.
#[derive(Debug)]
pub struct CanonicalStore {
    registry: Arc<Registry>,
    inner: RwLock<StoreInner>,
}

impl CanonicalStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        let mut region = vec![0u8; registry.region_size()];
        for slot in registry.iter() {
            if matches!(slot.kind, SlotKind::Text { .. }) {
                region::write_text(&mut region, slot, slot.default_text);
            }
        }

        Self {
            inner: RwLock::new(StoreInner {
                header: StoreHeader {
                    format_version: STORE_FORMAT_VERSION,
                    update_counter: 0,
                    data_valid: false,
                    timestamp_us: 0,
                },
                region,
            }),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Runs one write pass. The counter and timestamp advance once the
    /// closure returns, while the exclusive lock is still held.
    pub fn write_tick<R>(&self, apply: impl FnOnce(&mut TickWriter<'_>) -> R) -> R {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let mut writer = TickWriter {
            registry: &self.registry,
            region: &mut inner.region,
            written: 0,
        };
        let result = apply(&mut writer);

        let header = &mut inner.header;
        header.update_counter = header.update_counter.wrapping_add(1);
        header.timestamp_us = now_us().max(header.timestamp_us);
        header.data_valid = true;
        result
    }

    /// Takes the shared lock for a full read pass.
    pub fn read(&self) -> StoreView<'_> {
        StoreView {
            registry: &self.registry,
            guard: self.inner.read(),
        }
    }

    pub fn header(&self) -> StoreHeader {
        self.inner.read().header
    }
}

pub(crate) fn code_from_f64(value: f64) -> Option<u32> {
    let integral = value.is_finite() && value.fract() == 0.0;
    (integral && (0.0..=u32::MAX as f64).contains(&value)).then_some(value as u32)
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Exclusive access to the region for the duration of one tick.
pub struct TickWriter<'a> {
    registry: &'a Registry,
    region: &'a mut [u8],
    written: usize,
}

impl<'a> TickWriter<'a> {
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Number of successful writes in this pass.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Code slots only take doubles that hold an exact `u32`.
    pub fn set_scalar(&mut self, slot: &Slot, value: f64) -> bool {
        match slot.kind {
            SlotKind::Scalar => {
                region::write_f64(self.region, slot.offset, value);
                self.written += 1;
                true
            }
            SlotKind::Code => match code_from_f64(value) {
                Some(code) => self.set_code(slot, code),
                None => false,
            },
            _ => false,
        }
    }

    pub fn set_code(&mut self, slot: &Slot, code: u32) -> bool {
        if slot.kind != SlotKind::Code {
            return false;
        }
        region::write_f64(self.region, slot.offset, code as f64);
        self.written += 1;
        true
    }

    pub fn set_vector2(&mut self, slot: &Slot, value: DVec2) -> bool {
        if slot.kind != SlotKind::Vector2 {
            return false;
        }
        region::write_f64(self.region, slot.offset, value.x);
        region::write_f64(self.region, slot.offset + 8, value.y);
        self.written += 1;
        true
    }

    pub fn set_vector3(&mut self, slot: &Slot, value: DVec3) -> bool {
        if slot.kind != SlotKind::Vector3 {
            return false;
        }
        region::write_f64(self.region, slot.offset, value.x);
        region::write_f64(self.region, slot.offset + 8, value.y);
        region::write_f64(self.region, slot.offset + 16, value.z);
        self.written += 1;
        true
    }

    /// Empty strings restore the slot's default text.
    pub fn set_text(&mut self, slot: &Slot, value: &str) -> bool {
        if !matches!(slot.kind, SlotKind::Text { .. }) {
            return false;
        }
        let value = if value.is_empty() {
            slot.default_text
        } else {
            value
        };
        region::write_text(self.region, slot, value);
        self.written += 1;
        true
    }

    /// Dispatches a simulation value to the setter for the slot's kind.
    /// Mismatched kinds are ignored and return `false`.
    pub fn apply(&mut self, slot: &Slot, value: &SimValue) -> bool {
        match (slot.kind, value) {
            (SlotKind::Scalar | SlotKind::Code, SimValue::Double(v)) => self.set_scalar(slot, *v),
            (SlotKind::Code, SimValue::Code(code)) => self.set_code(slot, *code),
            (SlotKind::Vector2, SimValue::Vector2(v)) => self.set_vector2(slot, *v),
            (SlotKind::Vector3, SimValue::Vector3(v)) => self.set_vector3(slot, *v),
            (SlotKind::Text { .. }, SimValue::Text(text)) => self.set_text(slot, text),
            _ => false,
        }
    }
}

/// A consistent view of the store, valid while the shared lock is held.
pub struct StoreView<'a> {
    registry: &'a Registry,
    guard: RwLockReadGuard<'a, StoreInner>,
}

impl<'a> StoreView<'a> {
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn header(&self) -> StoreHeader {
        self.guard.header
    }

    /// Raw slot bytes, laid out as described by the registry.
    pub fn region(&self) -> &[u8] {
        &self.guard.region
    }

    pub fn value(&self, slot: &Slot) -> SlotValue<'_> {
        decode(slot, &self.guard.region)
    }

    pub fn scalar(&self, slot: &Slot) -> f64 {
        read_f64(&self.guard.region, slot.offset)
    }

    pub fn vector2(&self, slot: &Slot) -> DVec2 {
        match self.value(slot) {
            SlotValue::Vector2(v) => v,
            _ => DVec2::ZERO,
        }
    }

    pub fn vector3(&self, slot: &Slot) -> DVec3 {
        match self.value(slot) {
            SlotValue::Vector3(v) => v,
            _ => DVec3::ZERO,
        }
    }

    pub fn text(&self, slot: &Slot) -> &str {
        match self.value(slot) {
            SlotValue::Text(text) => text,
            _ => "",
        }
    }
}
