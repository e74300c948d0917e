//! Integer rounding and alignment helpers shared by the buffer sizing code and
//! the executor.
//!
//! Everything here works on item counts, never on bytes or samples, and never
//! allocates. All functions treat a zero `multiple` as "no constraint" so call
//! sites can pass an unset output multiple straight through.

/// Greatest common divisor (Euclid). `gcd(0, b) == b`.
#[inline]
pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Greatest common divisor on `u64`, used by [`RelativeRate`](crate::RelativeRate).
#[inline]
pub fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Least common multiple. Returns the non-zero argument if either is zero.
#[inline]
pub fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        return a.max(b);
    }
    a / gcd(a, b) * b
}

/// Least common multiple of every value in `values`, ignoring zeros.
///
/// Returns 1 for an empty slice.
pub fn lcm_all(values: &[usize]) -> usize {
    values.iter().copied().filter(|&v| v != 0).fold(1, lcm)
}

/// Rounds `value` down to the nearest multiple of `multiple`.
#[inline]
pub fn round_down(value: usize, multiple: usize) -> usize {
    if multiple <= 1 {
        return value;
    }
    value - value % multiple
}

/// Rounds `value` up to the nearest multiple of `multiple`.
#[inline]
pub fn round_up(value: usize, multiple: usize) -> usize {
    if multiple <= 1 {
        return value;
    }
    match value % multiple {
        0 => value,
        r => value + (multiple - r),
    }
}

/// Smallest item count whose byte size is a whole number of `granule` bytes.
///
/// For a 4096-byte page and 12-byte items this is 1024 items (12288 bytes,
/// three pages).
#[inline]
pub fn granularity_items(item_size: usize, granule: usize) -> usize {
    if item_size == 0 || granule == 0 {
        return 1;
    }
    granule / gcd(item_size, granule)
}
