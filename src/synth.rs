use std::f32::consts::PI;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{debug, error};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::scan::SweepScan;

/// Lowest power reported by the synthetic source.
pub const SYNTH_FLOOR_DB: f32 = -150.0; // also what log10(0) is clamped to

/// A sinusoid placed at a fraction of the band, optionally wandering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Center position in `[0, 1]` of the band.
    pub position: f32,
    /// Peak excursion of the position, as a fraction of the band.
    pub drift: f32,
    /// Drift cycles per generated scan.
    pub drift_rate: f32,
    pub amplitude: f32,
}

impl Tone {
    pub fn fixed(position: f32, amplitude: f32) -> Self {
        Self {
            position,
            drift: 0.0,
            drift_rate: 0.0,
            amplitude,
        }
    }

    fn position_at(&self, frame: u64) -> f32 {
        let phase = 2.0 * PI * self.drift_rate * frame as f32;
        (self.position + self.drift * phase.sin()).clamp(0.0, 1.0)
    }
}

/// Produces scans of a virtual band by running an FFT over generated tones.
pub struct SyntheticSweep {
    start_hz: f64,
    stop_hz: f64,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    tones: Vec<Tone>,
    frame: u64,
}

impl SyntheticSweep {
    pub fn new(start_hz: f64, stop_hz: f64, fft_size: usize, tones: Vec<Tone>) -> Result<Self> {
        if fft_size < 4 || fft_size % 2 != 0 {
            return Err(anyhow!("FFT size must be even and at least 4, got {}", fft_size));
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();
        debug!(
            "Synthetic source {:.0}-{:.0} Hz, FFT size {}, {} tones",
            start_hz,
            stop_hz,
            fft_size,
            tones.len()
        );
        Ok(Self {
            start_hz,
            stop_hz,
            fft,
            window: hanning_window(fft_size),
            input,
            output,
            tones,
            frame: 0,
        })
    }

    /// A band with a few steady carriers and one slowly sweeping signal.
    pub fn demo(start_hz: f64, stop_hz: f64) -> Result<Self> {
        let tones = vec![
            Tone::fixed(0.12, 0.02),
            Tone::fixed(0.47, 0.2),
            Tone::fixed(0.81, 0.005),
            Tone {
                position: 0.6,
                drift: 0.25,
                drift_rate: 0.002,
                amplitude: 0.05,
            },
        ];
        Self::new(start_hz, stop_hz, 4096, tones)
    }

    pub fn bin_count(&self) -> usize {
        self.output.len()
    }

    /// Generates the next scan.
    pub fn next_scan(&mut self) -> Result<SweepScan> {
        let fft_size = self.input.len();
        let half = (fft_size / 2) as f32;

        for (n, (sample, &w)) in self.input.iter_mut().zip(self.window.iter()).enumerate() {
            let value: f32 = self
                .tones
                .iter()
                .map(|tone| {
                    // Band position 1.0 is the Nyquist frequency of the block
                    let cycles_per_sample = 0.5 * tone.position_at(self.frame);
                    tone.amplitude * (2.0 * PI * cycles_per_sample * n as f32).sin()
                })
                .sum();
            *sample = value * w;
        }

        if let Err(e) = self.fft.process(&mut self.input, &mut self.output) {
            error!("FFT computation error: {:?}", e);
            return Err(anyhow!("FFT computation failed: {}", e));
        }
        self.frame += 1;

        let bins = self.output.len();
        let bin_width_hz = (self.stop_hz - self.start_hz) / (bins - 1) as f64;
        let samples = self
            .output
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let magnitude = c.norm() / half;
                let db = if magnitude > 1e-10 {
                    (20.0 * magnitude.log10()).max(SYNTH_FLOOR_DB)
                } else {
                    SYNTH_FLOOR_DB
                };
                (self.start_hz + i as f64 * bin_width_hz, db)
            })
            .collect();

        Ok(SweepScan::new(self.start_hz, self.stop_hz, bin_width_hz, samples))
    }
}

fn hanning_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / (len - 1) as f32;
            0.5 * (1.0 - x.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::SpectrumScan;

    #[test]
    fn odd_fft_size_is_rejected() {
        assert!(SyntheticSweep::new(0.0, 1.0, 1023, Vec::new()).is_err());
        assert!(SyntheticSweep::new(0.0, 1.0, 2, Vec::new()).is_err());
    }

    #[test]
    fn scan_covers_the_band() {
        let mut source = SyntheticSweep::new(88e6, 108e6, 1024, vec![Tone::fixed(0.5, 0.1)]).unwrap();
        let scan = source.next_scan().unwrap();
        assert_eq!(scan.sample_count(), 513);
        assert_eq!(source.bin_count(), 513);
        assert_eq!(scan.frequency_at(0), 88e6);
        assert!((scan.frequency_at(512) - 108e6).abs() < 1.0);
        assert!(scan.samples.iter().all(|&(_, p)| p >= SYNTH_FLOOR_DB));
    }

    #[test]
    fn tone_peaks_at_its_position() {
        let mut source = SyntheticSweep::new(0.0, 1e6, 1024, vec![Tone::fixed(0.25, 0.5)]).unwrap();
        let scan = source.next_scan().unwrap();
        let (peak_index, _) = scan
            .samples
            .iter()
            .enumerate()
            .max_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .unwrap();
        assert!((peak_index as i64 - 128).abs() <= 1, "peak at {}", peak_index);
        assert!(scan.power_at(peak_index) > -20.0);
    }

    #[test]
    fn silence_sits_on_the_floor() {
        let mut source = SyntheticSweep::new(0.0, 1e6, 64, Vec::new()).unwrap();
        let scan = source.next_scan().unwrap();
        assert!(scan.samples.iter().all(|&(_, p)| p == SYNTH_FLOOR_DB));
    }
}
