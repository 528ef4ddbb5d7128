/// FNV-1a, 64-bit.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    pub(crate) const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new_default() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

/// Map a 0..=255 byte (opacity, fill opacity) onto `[0, 1]`.
pub(crate) fn unit_from_u8(v: u8) -> f64 {
    f64::from(v) / 255.0
}

pub(crate) fn clamp01(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Undo the signed wraparound used by path-record coordinates.
///
/// The fixed-point integer part is stored as an unsigned byte, so `-0.25` shows up as `255.75`.
pub(crate) fn unwrap_signed_coord(v: f64) -> f64 {
    if v >= 200.0 { v - 256.0 } else { v }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
