use std::fmt;

pub type SlotId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Scalar,
    Vector2,
    Vector3,
    Text { capacity: usize },
    /// Integer state or warning code, stored as a double.
    Code,
}

impl SlotKind {
    /// Bytes occupied in the store region. Text capacity is padded to keep
    /// every following double 8-byte aligned.
    pub const fn width(&self) -> usize {
        match self {
            SlotKind::Scalar | SlotKind::Code => 8,
            SlotKind::Vector2 => 16,
            SlotKind::Vector3 => 24,
            SlotKind::Text { capacity } => (*capacity).div_ceil(8) * 8,
        }
    }

    pub const fn axes(&self) -> usize {
        match self {
            SlotKind::Vector2 => 2,
            SlotKind::Vector3 => 3,
            SlotKind::Scalar | SlotKind::Code => 1,
            SlotKind::Text { .. } => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Scalar => "double",
            SlotKind::Vector2 => "vector2d",
            SlotKind::Vector3 => "vector3d",
            SlotKind::Text { .. } => "string",
            SlotKind::Code => "uint32",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const UNIT: Bounds = Bounds { min: 0.0, max: 1.0 };
    pub const BIPOLAR: Bounds = Bounds { min: -1.0, max: 1.0 };

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
    /// Write-only trigger. Accepts commands, never published.
    Event,
}

/// Static description of one telemetry value, as listed in the catalog.
#[derive(Debug, Clone, Copy)]
pub struct SlotSpec {
    pub name: &'static str,
    pub kind: SlotKind,
    pub access: Access,
    pub bounds: Option<Bounds>,
    pub default_text: &'static str,
}

impl SlotSpec {
    const fn new(name: &'static str, kind: SlotKind) -> Self {
        Self {
            name,
            kind,
            access: Access::ReadWrite,
            bounds: None,
            default_text: "",
        }
    }

    pub const fn scalar(name: &'static str) -> Self {
        Self::new(name, SlotKind::Scalar)
    }

    pub const fn vector2(name: &'static str) -> Self {
        Self::new(name, SlotKind::Vector2)
    }

    pub const fn vector3(name: &'static str) -> Self {
        Self::new(name, SlotKind::Vector3)
    }

    pub const fn text(name: &'static str, capacity: usize) -> Self {
        Self::new(name, SlotKind::Text { capacity })
    }

    pub const fn code(name: &'static str) -> Self {
        Self::new(name, SlotKind::Code)
    }

    /// Normalized control in `[0, 1]`.
    pub const fn unit(name: &'static str) -> Self {
        Self::scalar(name).bounded(Bounds::UNIT)
    }

    /// Bipolar control in `[-1, 1]`.
    pub const fn bipolar(name: &'static str) -> Self {
        Self::scalar(name).bounded(Bounds::BIPOLAR)
    }

    /// Write-only trigger carrying a single number.
    pub const fn event(name: &'static str) -> Self {
        let mut spec = Self::scalar(name);
        spec.access = Access::Event;
        spec
    }

    pub const fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub const fn bounded(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub const fn default_text(mut self, text: &'static str) -> Self {
        self.default_text = text;
        self
    }
}

/// A registered slot: the catalog entry plus its id and place in the store.
#[derive(Debug, Clone)]
pub struct Slot {
    pub index: usize,
    pub id: SlotId,
    pub name: &'static str,
    pub kind: SlotKind,
    pub access: Access,
    pub bounds: Option<Bounds>,
    pub default_text: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl Slot {
    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }

    pub fn is_internal(&self) -> bool {
        self.access == Access::Event
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width
    }
}

/// Per-axis keys used when a vector slot is flattened into the JSON map.
pub const AXIS_SUFFIXES: [&str; 3] = ["X", "Y", "Z"];

pub fn axis_key(name: &str, axis: usize) -> String {
    format!("{}.{}", name, AXIS_SUFFIXES[axis])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_width_is_padded() {
        assert_eq!(SlotKind::Text { capacity: 8 }.width(), 8);
        assert_eq!(SlotKind::Text { capacity: 33 }.width(), 40);
        assert_eq!(SlotKind::Text { capacity: 64 }.width(), 64);
    }

    #[test]
    fn builders_compose() {
        const SPEC: SlotSpec = SlotSpec::unit("Controls.Throttle");
        assert_eq!(SPEC.access, Access::ReadWrite);
        assert_eq!(SPEC.bounds, Some(Bounds::UNIT));

        let ro = SlotSpec::text("Aircraft.Name", 32).read_only().default_text("Unknown");
        assert_eq!(ro.access, Access::ReadOnly);
        assert_eq!(ro.default_text, "Unknown");
    }

    #[test]
    fn bounds_clamp() {
        assert_eq!(Bounds::UNIT.clamp(1.5), 1.0);
        assert_eq!(Bounds::BIPOLAR.clamp(-3.0), -1.0);
        assert!(Bounds::UNIT.contains(0.75));
    }
}
