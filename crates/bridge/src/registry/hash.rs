const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the message name. This is the stable id the simulation
/// attaches to every value it delivers.
pub const fn message_id(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Fingerprint(u64);

impl Fingerprint {
    pub fn new() -> Self {
        Self(FNV_OFFSET_BASIS)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write(&value.to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_reference_values() {
        assert_eq!(message_id(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(message_id("a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(message_id("foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn fingerprint_matches_message_id_for_same_bytes() {
        let mut fp = Fingerprint::new();
        fp.write(b"Aircraft.Altitude");
        assert_eq!(fp.finish(), message_id("Aircraft.Altitude"));
    }
}
