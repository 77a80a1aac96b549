use glam::{DVec2, DVec3};

use crate::registry::{Slot, SlotKind};

/// A decoded slot value borrowed from a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotValue<'a> {
    Number(f64),
    Code(u32),
    Vector2(DVec2),
    Vector3(DVec3),
    Text(&'a str),
}

pub(crate) fn read_f64(region: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&region[offset..offset + 8]);
    f64::from_le_bytes(raw)
}

pub(crate) fn write_f64(region: &mut [u8], offset: usize, value: f64) {
    region[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Reads a NUL-terminated string. Bytes that are not valid UTF-8 end the
/// string early.
pub(crate) fn read_text(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    match std::str::from_utf8(&bytes[..end]) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    }
}

pub(crate) fn decode<'a>(slot: &Slot, region: &'a [u8]) -> SlotValue<'a> {
    let at = slot.offset;
    match slot.kind {
        SlotKind::Scalar => SlotValue::Number(read_f64(region, at)),
        SlotKind::Code => SlotValue::Code(read_f64(region, at) as u32),
        SlotKind::Vector2 => {
            SlotValue::Vector2(DVec2::new(read_f64(region, at), read_f64(region, at + 8)))
        }
        SlotKind::Vector3 => SlotValue::Vector3(DVec3::new(
            read_f64(region, at),
            read_f64(region, at + 8),
            read_f64(region, at + 16),
        )),
        SlotKind::Text { .. } => SlotValue::Text(read_text(&region[slot.range()])),
    }
}

/// Copies `value` into a text slot: at most `capacity - 1` bytes, cut on a
/// char boundary, NUL-filled to the slot width.
pub(crate) fn write_text(region: &mut [u8], slot: &Slot, value: &str) {
    let SlotKind::Text { capacity } = slot.kind else {
        return;
    };
    let mut end = value.len().min(capacity - 1);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let bytes = &value.as_bytes()[..end];
    let dest = &mut region[slot.range()];
    dest.fill(0);
    dest[..bytes.len()].copy_from_slice(bytes);
}
