//! Injectable randomness for typing and keep-awake jitter.
//!
//! Timing jitter is the only source of nondeterminism in the core. Tests
//! pass [`NoJitter`] or a seeded `SmallRng`; firmware seeds `SmallRng`
//! from the hardware RNG.

use rand::{Rng, RngCore};

pub trait JitterSource {
    /// Uniform offset in `-bound..=bound`. A zero bound yields zero.
    fn offset(&mut self, bound: u32) -> i32;
}

/// Always returns zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn offset(&mut self, _bound: u32) -> i32 {
        0
    }
}

/// Adapts any `rand` generator.
#[derive(Clone, Debug)]
pub struct RngJitter<R>(pub R);

impl<R: RngCore> JitterSource for RngJitter<R> {
    fn offset(&mut self, bound: u32) -> i32 {
        if bound == 0 {
            return 0;
        }
        let bound = bound.min(i32::MAX as u32) as i32;
        self.0.gen_range(-bound..=bound)
    }
}

/// `base ± jitter`, clamped below at `floor`.
pub fn jittered(base: u32, jitter: u32, floor: u32, source: &mut impl JitterSource) -> u32 {
    let value = i64::from(base) + i64::from(source.offset(jitter));
    value.clamp(i64::from(floor), i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn offsets_stay_in_bounds() {
        let mut source = RngJitter(SmallRng::seed_from_u64(7));
        for _ in 0..1000 {
            let o = source.offset(20);
            assert!((-20..=20).contains(&o));
        }
    }

    #[test]
    fn zero_bound_is_zero() {
        let mut source = RngJitter(SmallRng::seed_from_u64(1));
        assert_eq!(source.offset(0), 0);
    }

    #[test]
    fn jittered_respects_floor() {
        let mut source = RngJitter(SmallRng::seed_from_u64(3));
        for _ in 0..1000 {
            assert!(jittered(12, 40, 10, &mut source) >= 10);
        }
        assert_eq!(jittered(50, 20, 10, &mut NoJitter), 50);
        assert_eq!(jittered(0, 0, 0, &mut NoJitter), 0);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RngJitter(SmallRng::seed_from_u64(42));
        let mut b = RngJitter(SmallRng::seed_from_u64(42));
        for _ in 0..16 {
            assert_eq!(a.offset(100), b.offset(100));
        }
    }
}
