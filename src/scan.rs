/// Read-only view of one frequency/power sweep.
///
/// Frequencies are in Hz, powers in dB. Implementors are borrowed for the
/// duration of a single ingest call, so they can wrap whatever buffer the
/// source already holds.
pub trait SpectrumScan {
    fn start_freq_hz(&self) -> f64;
    fn stop_freq_hz(&self) -> f64;
    fn bin_width_hz(&self) -> f64;
    fn sample_count(&self) -> usize;
    fn frequency_at(&self, index: usize) -> f64;
    fn power_at(&self, index: usize) -> f32;
}

/// Owned sweep, as produced by the CSV reader and the synthetic source.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepScan {
    pub start_hz: f64,
    pub stop_hz: f64,
    pub bin_width_hz: f64,
    pub samples: Vec<(f64, f32)>, // (frequency Hz, power dB)
}

impl SweepScan {
    pub fn new(start_hz: f64, stop_hz: f64, bin_width_hz: f64, samples: Vec<(f64, f32)>) -> Self {
        Self {
            start_hz,
            stop_hz,
            bin_width_hz,
            samples,
        }
    }
}

impl SpectrumScan for SweepScan {
    fn start_freq_hz(&self) -> f64 {
        self.start_hz
    }

    fn stop_freq_hz(&self) -> f64 {
        self.stop_hz
    }

    fn bin_width_hz(&self) -> f64 {
        self.bin_width_hz
    }

    fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn frequency_at(&self, index: usize) -> f64 {
        self.samples[index].0
    }

    fn power_at(&self, index: usize) -> f32 {
        self.samples[index].1
    }
}
