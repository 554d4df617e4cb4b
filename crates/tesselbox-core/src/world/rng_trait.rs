//! RNG trait abstraction for world randomness
//!
//! Drop resolution takes any `WorldRng`, so the world can own a seeded
//! generator while tests pass in their own fixed source.

/// Random number generator trait for world mutation
pub trait WorldRng {
    /// Generate random f32 in [0.0, 1.0)
    fn gen_f32(&mut self) -> f32;

    /// Uniform integer in `[min, max]`, both ends inclusive
    fn gen_range_inclusive(&mut self, min: u32, max: u32) -> u32;

    /// Check if random value is less than probability threshold
    fn check_probability(&mut self, probability: f32) -> bool {
        self.gen_f32() < probability
    }
}

impl<T: ?Sized + rand::Rng> WorldRng for T {
    fn gen_f32(&mut self) -> f32 {
        rand::Rng::r#gen(self)
    }

    fn gen_range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        rand::Rng::gen_range(self, min..=max)
    }
}
