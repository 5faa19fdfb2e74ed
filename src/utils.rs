/// Values whose magnitude falls below this are treated as exactly zero when
/// taking signs.
pub const ZERO_TOLERANCE: f64 = 1e-13;

/// Returns -1, 0 or 1 for `value`, with anything inside `ZERO_TOLERANCE` of
/// zero counting as zero.
#[inline]
pub fn signum(value: f64) -> f64 {
    if value.abs() < ZERO_TOLERANCE {
        0.0
    } else if value > 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// A trait that provides easy access to the first element of a slice.
pub trait Front<T> {
    fn front(&self) -> &T;
}

/// A trait that provides easy access to the last element of a slice.
pub trait Back<T> {
    fn back(&self) -> &T;
}

impl<T> Front<T> for [T] {
    #[inline(always)]
    fn front(&self) -> &T {
        &self[0]
    }
}

impl<T> Back<T> for [T] {
    #[inline(always)]
    fn back(&self) -> &T {
        &self[self.len() - 1]
    }
}

/// A trait to replace all elements in a container with zeros.
pub trait ZeroOut {
    fn zero_out(&mut self);
}

impl ZeroOut for f64 {
    fn zero_out(&mut self) {
        *self = 0.0;
    }
}

impl<T> ZeroOut for [T]
where
    T: ZeroOut,
{
    fn zero_out(&mut self) {
        for elem in self {
            elem.zero_out();
        }
    }
}

impl<T> ZeroOut for Vec<T>
where
    T: ZeroOut,
{
    fn zero_out(&mut self) {
        self.as_mut_slice().zero_out();
    }
}
