//! Unit-in-the-last-place arithmetic.
//!
//! Doubles are mapped onto a signed integer line (sign-magnitude to two's
//! complement) so that adding `n` moves a value by exactly `n` representable
//! steps, crossing zero without a gap.

#[inline]
fn to_ordered(f: f64) -> i64 {
    if f.is_sign_negative() {
        -((-f).to_bits() as i64)
    } else {
        f.to_bits() as i64
    }
}

#[inline]
fn from_ordered(i: i64) -> f64 {
    if i < 0 {
        -f64::from_bits(i.unsigned_abs())
    } else {
        f64::from_bits(i as u64)
    }
}

/// Move `f` by `ulps` representable doubles (negative moves towards -inf).
#[inline]
pub fn add_ulps(f: f64, ulps: i64) -> f64 {
    from_ordered(to_ordered(f).wrapping_add(ulps))
}
