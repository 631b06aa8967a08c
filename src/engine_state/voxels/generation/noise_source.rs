//! # Noise Source Module
//!
//! The coherent-noise source terrain heights are sampled from.
//!
//! One source is created per world from the world seed and handed to the generator, so
//! every chunk samples the same continuous field and borders line up.

use noise::{NoiseFn, Perlin};

/// A deterministic 2D fractal noise field.
pub trait NoiseSource: Send + Sync {
    /// Samples the field at `(x, z)`.
    ///
    /// # Arguments
    /// * `x`, `z` - Sample coordinates, already scaled by the terrain frequency
    /// * `octaves` - Number of layers summed, each at double the frequency of the previous
    /// * `persistence` - Amplitude multiplier between consecutive octaves
    ///
    /// # Returns
    /// A value in `[-1, 1]`.
    fn sample(&self, x: f64, z: f64, octaves: u32, persistence: f64) -> f64;
}

/// Octave-summed Perlin noise from a single seeded generator.
pub struct PerlinNoiseSource {
    perlin: Perlin,
}

impl PerlinNoiseSource {
    /// Creates the noise field for a world seed.
    pub fn new(seed: u32) -> Self {
        PerlinNoiseSource {
            perlin: Perlin::new(seed),
        }
    }
}

impl NoiseSource for PerlinNoiseSource {
    fn sample(&self, x: f64, z: f64, octaves: u32, persistence: f64) -> f64 {
        let mut total = 0.0;
        let mut max_amplitude = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        for _ in 0..octaves.max(1) {
            total += self.perlin.get([x * frequency, z * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }
        if max_amplitude == 0.0 {
            return 0.0;
        }
        (total / max_amplitude).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_field() {
        let a = PerlinNoiseSource::new(42);
        let b = PerlinNoiseSource::new(42);
        for i in 0..32 {
            let (x, z) = (i as f64 * 0.37, i as f64 * -0.21);
            assert_eq!(a.sample(x, z, 4, 0.5), b.sample(x, z, 4, 0.5));
        }
    }

    #[test]
    fn test_samples_stay_in_range() {
        let source = PerlinNoiseSource::new(7);
        for i in 0..256 {
            let value = source.sample(i as f64 * 0.113, i as f64 * 0.071, 6, 0.8);
            assert!((-1.0..=1.0).contains(&value));
        }
    }
}
