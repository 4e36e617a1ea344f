//! Noise generation utilities for terrain generation.
//!
//! Provides deterministic multi-octave Perlin noise used to carve cave pockets.

use noise::{NoiseFn, Perlin};

/// Configuration for multi-octave noise generation.
#[derive(Debug, Clone)]
pub struct NoiseConfig {
    /// Number of octaves (layers of detail)
    pub octaves: u32,
    /// Frequency multiplier between octaves
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves (persistence)
    pub persistence: f64,
    /// Base frequency (scale)
    pub frequency: f64,
    /// Seed for deterministic generation
    pub seed: u32,
}

impl NoiseConfig {
    /// Config for cave pockets: small blobs a few tiles across.
    pub fn caves(world_seed: u64) -> Self {
        Self {
            octaves: 3,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 0.09,
            seed: (world_seed ^ 0xCAFE_1234) as u32,
        }
    }
}

/// Noise generator using Perlin noise.
pub struct NoiseGenerator {
    perlin: Perlin,
    config: NoiseConfig,
}

impl NoiseGenerator {
    /// Create a new noise generator with the given configuration.
    pub fn new(config: NoiseConfig) -> Self {
        Self {
            perlin: Perlin::new(config.seed),
            config,
        }
    }

    /// Generate noise value at 2D coordinates with multi-octave sampling.
    ///
    /// Returns value in range [-1.0, 1.0].
    pub fn sample_2d(&self, x: f64, y: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.config.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.config.octaves {
            value += self.perlin.get([x * frequency, y * frequency]) * amplitude;
            max_value += amplitude;

            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }

        // Normalize to [-1.0, 1.0]
        value / max_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_determinism() {
        let gen1 = NoiseGenerator::new(NoiseConfig::caves(12345));
        let gen2 = NoiseGenerator::new(NoiseConfig::caves(12345));

        for x in 0..10 {
            for y in 0..10 {
                let val1 = gen1.sample_2d(x as f64, y as f64);
                let val2 = gen2.sample_2d(x as f64, y as f64);
                assert_eq!(val1, val2, "Noise not deterministic at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_noise_range() {
        let gen = NoiseGenerator::new(NoiseConfig::caves(42));

        for x in 0..100 {
            for y in 0..100 {
                let val = gen.sample_2d(x as f64 * 1.7, y as f64 * 1.7);
                assert!(
                    (-1.0..=1.0).contains(&val),
                    "Noise value {} out of range at ({}, {})",
                    val,
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_different_seeds_produce_different_noise() {
        let gen1 = NoiseGenerator::new(NoiseConfig::caves(1));
        let gen2 = NoiseGenerator::new(NoiseConfig::caves(2));

        let any_different = (0..20).any(|x| {
            (0..20).any(|y| {
                let val1 = gen1.sample_2d(x as f64 * 1.3, y as f64 * 1.3);
                let val2 = gen2.sample_2d(x as f64 * 1.3, y as f64 * 1.3);
                (val1 - val2).abs() > 0.001
            })
        });

        assert!(
            any_different,
            "Different seeds should produce different noise"
        );
    }
}
