//! Seeded value noise.
//!
//! Every function here is a pure function of its arguments. The sine-based
//! lattice hash matches the shipped world layout, so a given seed reproduces
//! the same terrain on every load.

use serde::{Deserialize, Serialize};

/// Base frequency of the first fractal octave.
pub const BASE_FREQUENCY: f64 = 0.05;

/// Seed offset between successive fractal octaves.
pub const OCTAVE_SEED_STRIDE: f64 = 1000.0;

/// Largest value strictly below 1.0 that noise functions may return.
const MAX_UNIT: f64 = 1.0 - f64::EPSILON;

/// World seed, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldSeed(u32);

impl WorldSeed {
    /// Creates a new world seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns the seed shifted by `salt`, as consumed by the noise functions.
    #[must_use]
    pub fn salted(self, salt: u32) -> f64 {
        f64::from(self.0) + f64::from(salt)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(12345)
    }
}

/// Fractional part in `[0, 1)`.
#[inline]
#[must_use]
pub fn fract(value: f64) -> f64 {
    let f = value - value.floor();
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

/// Deterministic scalar in `[0, 1)` from a single seed value.
#[inline]
#[must_use]
pub fn hash(seed: f64) -> f64 {
    fract(seed.sin() * 10000.0)
}

/// Raw lattice value in `[0, 1)` at `(x, y)`.
#[inline]
#[must_use]
pub fn lattice(x: f64, y: f64, seed: f64) -> f64 {
    fract((x * 12.9898 + y * 78.233 + seed).sin() * 43758.5453)
}

/// Lattice value smoothed over its 3×3 neighbourhood.
///
/// Corners weigh 1/16, edges 1/8 and the centre 1/4; the weights sum to one.
#[must_use]
pub fn value_noise_2d(x: f64, y: f64, seed: f64) -> f64 {
    let corners = (lattice(x - 1.0, y - 1.0, seed)
        + lattice(x + 1.0, y - 1.0, seed)
        + lattice(x - 1.0, y + 1.0, seed)
        + lattice(x + 1.0, y + 1.0, seed))
        / 16.0;
    let sides = (lattice(x - 1.0, y, seed)
        + lattice(x + 1.0, y, seed)
        + lattice(x, y - 1.0, seed)
        + lattice(x, y + 1.0, seed))
        / 8.0;
    let center = lattice(x, y, seed) / 4.0;
    (corners + sides + center).min(MAX_UNIT)
}

/// Bilinear interpolation of [`value_noise_2d`] between integer lattice points.
#[must_use]
pub fn smoothed_noise_2d(x: f64, y: f64, seed: f64) -> f64 {
    let int_x = x.floor();
    let frac_x = x - int_x;
    let int_y = y.floor();
    let frac_y = y - int_y;

    let v1 = value_noise_2d(int_x, int_y, seed);
    let v2 = value_noise_2d(int_x + 1.0, int_y, seed);
    let v3 = value_noise_2d(int_x, int_y + 1.0, seed);
    let v4 = value_noise_2d(int_x + 1.0, int_y + 1.0, seed);

    let i1 = v1 * (1.0 - frac_x) + v2 * frac_x;
    let i2 = v3 * (1.0 - frac_x) + v4 * frac_x;

    (i1 * (1.0 - frac_y) + i2 * frac_y).min(MAX_UNIT)
}

/// Multi-octave sum of [`smoothed_noise_2d`], normalised to `[0, 1)`.
///
/// Frequency doubles and amplitude is multiplied by `persistence` per octave.
/// Zero octaves are treated as one.
#[must_use]
pub fn fractal_noise_2d(x: f64, y: f64, octaves: u32, persistence: f64, seed: f64) -> f64 {
    let mut total = 0.0;
    let mut frequency = BASE_FREQUENCY;
    let mut amplitude = 1.0;
    let mut max_value = 0.0;

    for octave in 0..octaves.max(1) {
        let octave_seed = seed + f64::from(octave) * OCTAVE_SEED_STRIDE;
        total += smoothed_noise_2d(x * frequency, y * frequency, octave_seed) * amplitude;
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= 2.0;
    }

    (total / max_value).min(MAX_UNIT)
}
