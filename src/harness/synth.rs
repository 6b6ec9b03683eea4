//! Synthesizer
//!
//! The harness only needs to know when rendering finished, so the engine is
//! hidden behind `Synthesizer`. `SineSynthesizer` provides a predictable CPU
//! load: a bank of detuned sine voices with preallocated state.

use crate::error::{JitterError, Result};

/// Voice engine that fills interleaved buffers
pub trait Synthesizer {
    /// Start `voices` notes. Called once before the run, never on the callback path.
    fn note_on(&mut self, voices: u32) -> Result<()>;

    /// Render one interleaved buffer. Must not allocate.
    fn render(&mut self, buffer: &mut [f32], channels: usize);
}

/// Upper bound on simultaneously sounding voices
pub const MAX_VOICES: usize = 1024;

const BASE_FREQUENCY_HZ: f32 = 110.0;

pub struct SineSynthesizer {
    sample_rate: f32,
    phases: Vec<f32>,
    increments: Vec<f32>,
    active: usize,
}

impl SineSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        SineSynthesizer {
            sample_rate: sample_rate.max(1) as f32,
            phases: vec![0.0; MAX_VOICES],
            increments: vec![0.0; MAX_VOICES],
            active: 0,
        }
    }

    pub fn active_voices(&self) -> usize {
        self.active
    }
}

impl Synthesizer for SineSynthesizer {
    fn note_on(&mut self, voices: u32) -> Result<()> {
        let voices = voices as usize;
        if voices > MAX_VOICES {
            return Err(JitterError::Audio(format!(
                "{} voices requested, at most {} supported",
                voices, MAX_VOICES
            )));
        }
        for voice in 0..voices {
            // Spread voices over a few octaves with slight detune
            let frequency = BASE_FREQUENCY_HZ * (1.0 + voice as f32 * 0.0137) * (1 + voice % 4) as f32;
            self.increments[voice] = std::f32::consts::TAU * frequency / self.sample_rate;
            self.phases[voice] = 0.0;
        }
        self.active = voices;
        Ok(())
    }

    fn render(&mut self, buffer: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let gain = if self.active == 0 {
            0.0
        } else {
            1.0 / self.active as f32
        };
        for frame in buffer.chunks_mut(channels) {
            let mut sample = 0.0f32;
            for voice in 0..self.active {
                sample += self.phases[voice].sin();
                self.phases[voice] += self.increments[voice];
                if self.phases[voice] >= std::f32::consts::TAU {
                    self.phases[voice] -= std::f32::consts::TAU;
                }
            }
            frame.fill(sample * gain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_without_voices() {
        let mut synth = SineSynthesizer::new(48_000);
        let mut buffer = vec![1.0f32; 64];
        synth.render(&mut buffer, 2);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_output_is_bounded_and_stereo_matched() {
        let mut synth = SineSynthesizer::new(48_000);
        synth.note_on(8).unwrap();
        let mut buffer = vec![0.0f32; 512];
        synth.render(&mut buffer, 2);
        assert!(buffer.iter().all(|s| s.abs() <= 1.0 + 1e-6));
        assert!(buffer.chunks(2).all(|frame| frame[0] == frame[1]));
        assert!(buffer.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_too_many_voices() {
        let mut synth = SineSynthesizer::new(48_000);
        assert!(synth.note_on(MAX_VOICES as u32 + 1).is_err());
        assert_eq!(synth.active_voices(), 0);
    }
}
