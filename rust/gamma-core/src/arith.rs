//! Modular arithmetic primitives on i128 intermediates.
//!
//! Generators are stored as i64; every product of two reduced entries is
//! formed in i128 so a single modular multiplication cannot overflow as long
//! as the reduction modulus fits in 63 bits.

use num_integer::Integer;

/// Reduce `x` into `[0, m)`. `m` must be positive.
pub fn reduce(x: i128, m: i128) -> i128 {
    x.mod_floor(&m)
}

/// a*b + c*d mod m for operands already reduced into `[0, m)`.
///
/// With m < 2^63 each product is below 2^126, so the sum stays below 2^127.
pub fn mod_dot(a: i128, b: i128, c: i128, d: i128, m: i128) -> i128 {
    reduce(a * b + c * d, m)
}

/// Determinant of a row-major 2x2 matrix, reduced mod m.
pub fn det_mod(entries: &[i64; 4], m: i128) -> i128 {
    let [a, b, c, d] = entries.map(|e| reduce(e as i128, m));
    reduce(a * d - b * c, m)
}

/// m = n^power, or `None` when the result does not fit in 63 bits.
pub fn reduction_modulus(n: u64, power: u32) -> Option<i128> {
    if n == 0 || power == 0 {
        return None;
    }
    let m = n.checked_pow(power)?;
    if m > i64::MAX as u64 {
        return None;
    }
    Some(m as i128)
}
