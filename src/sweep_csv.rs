//! Reader for the text output of `hackrf_sweep`.
//!
//! Each line covers one slice of the band:
//! `date, time, hz_low, hz_high, hz_bin_width, num_samples, dB, dB, ...`.
//! Lines arrive in ascending `hz_low` order until the sweep wraps back to (or
//! repeats) a start frequency, which is where one full scan ends.

use std::io::BufRead;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use nom::bytes::complete::take_till;
use nom::character::complete::{char, space0, u32 as parse_u32};
use nom::combinator::{all_consuming, map};
use nom::multi::many1;
use nom::number::complete::double;
use nom::sequence::{preceded, tuple};
use nom::IResult;

use crate::scan::SweepScan;

/// One parsed output line.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepLine {
    pub hz_low: f64,
    pub hz_high: f64,
    pub bin_width_hz: f64,
    pub powers: Vec<f32>,
}

impl SweepLine {
    /// Center frequency of bin `index`.
    pub fn bin_center(&self, index: usize) -> f64 {
        self.hz_low + (index as f64 + 0.5) * self.bin_width_hz
    }
}

fn separator(input: &str) -> IResult<&str, ()> {
    map(tuple((space0, char(','), space0)), |_| ())(input)
}

fn text_field(input: &str) -> IResult<&str, &str> {
    take_till(|c: char| c == ',')(input)
}

fn sweep_line(input: &str) -> IResult<&str, SweepLine> {
    let (input, _date) = text_field(input)?;
    let (input, _time) = preceded(separator, text_field)(input)?;
    let (input, hz_low) = preceded(separator, double)(input)?;
    let (input, hz_high) = preceded(separator, double)(input)?;
    let (input, bin_width_hz) = preceded(separator, double)(input)?;
    // FFT size of the capture; the bin width already carries what we need
    let (input, _num_samples) = preceded(separator, parse_u32)(input)?;
    let (input, powers) = many1(preceded(separator, double))(input)?;
    let (input, _) = space0(input)?;
    Ok((
        input,
        SweepLine {
            hz_low,
            hz_high,
            bin_width_hz,
            powers: powers.into_iter().map(|p| p as f32).collect(),
        },
    ))
}

/// Parses a single line of `hackrf_sweep` output.
pub fn parse_line(line: &str) -> Result<SweepLine> {
    let trimmed = line.trim();
    all_consuming(sweep_line)(trimmed)
        .map(|(_, parsed)| parsed)
        .map_err(|e| anyhow!("Malformed sweep line {:?}: {}", trimmed, e))
}

/// Groups consecutive lines into whole-band scans.
#[derive(Debug, Default)]
pub struct SweepAssembler {
    samples: Vec<(f64, f32)>,
    start_hz: f64,
    stop_hz: f64,
    bin_width_hz: f64,
    last_hz_low: Option<f64>,
}

impl SweepAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one text line, returning the previous sweep once the band wraps.
    pub fn push_line(&mut self, line: &str) -> Result<Option<SweepScan>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let parsed = parse_line(line)?;
        Ok(self.push(parsed))
    }

    pub fn push(&mut self, line: SweepLine) -> Option<SweepScan> {
        let wrapped = matches!(self.last_hz_low, Some(last) if line.hz_low <= last);
        let finished = if wrapped { self.take_sweep() } else { None };

        if self.samples.is_empty() {
            self.start_hz = line.hz_low;
            self.stop_hz = line.hz_high;
            self.bin_width_hz = line.bin_width_hz;
        } else {
            self.start_hz = self.start_hz.min(line.hz_low);
            self.stop_hz = self.stop_hz.max(line.hz_high);
        }
        for (i, &power) in line.powers.iter().enumerate() {
            self.samples.push((line.bin_center(i), power));
        }
        self.last_hz_low = Some(line.hz_low);
        finished
    }

    /// Flushes whatever has been accumulated since the last wrap.
    pub fn finish(&mut self) -> Option<SweepScan> {
        self.last_hz_low = None;
        self.take_sweep()
    }

    fn take_sweep(&mut self) -> Option<SweepScan> {
        if self.samples.is_empty() {
            return None;
        }
        let mut samples = std::mem::take(&mut self.samples);
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        debug!(
            "Assembled sweep {:.0}-{:.0} Hz with {} bins",
            self.start_hz,
            self.stop_hz,
            samples.len()
        );
        Some(SweepScan::new(self.start_hz, self.stop_hz, self.bin_width_hz, samples))
    }
}

/// Reads sweeps from `reader` until it ends or `on_sweep` returns `false`.
///
/// Malformed lines are logged and skipped; I/O errors end the read.
pub fn read_sweeps<R, F>(reader: R, mut on_sweep: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(SweepScan) -> bool,
{
    let mut assembler = SweepAssembler::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read sweep input at line {}", number + 1))?;
        match assembler.push_line(&line) {
            Ok(Some(scan)) => {
                if !on_sweep(scan) {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping line {}: {}", number + 1, e),
        }
    }
    if let Some(scan) = assembler.finish() {
        on_sweep(scan);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LINE_A: &str = "2019-01-01, 12:00:00.123456, 2400000000, 2405000000, 1000000.00, 20, -70.1, -68.2, -71.3, -69.0, -72.5";
    const LINE_B: &str = "2019-01-01, 12:00:00.123456, 2410000000, 2415000000, 1000000.00, 20, -60.0, -61.0, -62.0, -63.0, -64.0";

    #[test]
    fn parses_a_hackrf_line() {
        let line = parse_line(LINE_A).unwrap();
        assert_eq!(line.hz_low, 2_400_000_000.0);
        assert_eq!(line.hz_high, 2_405_000_000.0);
        assert_eq!(line.bin_width_hz, 1_000_000.0);
        assert_eq!(line.powers.len(), 5);
        assert!((line.powers[0] + 70.1).abs() < 1e-4);
        assert_eq!(line.bin_center(0), 2_400_500_000.0);
    }

    #[test]
    fn tolerates_trailing_whitespace() {
        let line = parse_line(&format!("{}  \r\n", LINE_B)).unwrap();
        assert_eq!(line.powers.len(), 5);
    }

    #[test]
    fn rejects_lines_without_powers() {
        assert!(parse_line("2019-01-01, 12:00:00, 1, 2, 1, 20").is_err());
        assert!(parse_line("garbage").is_err());
        assert!(parse_line(&format!("{}, nope", LINE_A)).is_err());
        assert!(parse_line("2019-01-01, 12:00:00, 1, 2, 1, 2.5, -70.0").is_err());
    }

    #[test]
    fn wrap_emits_the_finished_sweep() {
        let mut assembler = SweepAssembler::new();
        assert!(assembler.push_line(LINE_A).unwrap().is_none());
        assert!(assembler.push_line(LINE_B).unwrap().is_none());
        assert!(assembler.push_line("").unwrap().is_none());

        let scan = assembler.push_line(LINE_A).unwrap().expect("sweep on wrap");
        assert_eq!(scan.start_hz, 2_400_000_000.0);
        assert_eq!(scan.stop_hz, 2_415_000_000.0);
        assert_eq!(scan.samples.len(), 10);
        assert!(scan.samples.windows(2).all(|w| w[0].0 <= w[1].0));

        let rest = assembler.finish().expect("partial sweep");
        assert_eq!(rest.samples.len(), 5);
        assert!(assembler.finish().is_none());
    }

    #[test]
    fn single_slice_sweeps_split_on_repeat() {
        let mut assembler = SweepAssembler::new();
        assert!(assembler.push_line(LINE_B).unwrap().is_none());
        let scan = assembler.push_line(LINE_B).unwrap().expect("sweep on repeat");
        assert_eq!(scan.samples.len(), 5);
        assert_eq!(scan.bin_width_hz, 1_000_000.0);
    }

    #[test]
    fn reader_skips_bad_lines_and_flushes_the_tail() {
        let input = format!("{}\nnot a sweep line\n{}\n{}\n{}\n", LINE_A, LINE_B, LINE_A, LINE_B);
        let mut sweeps = Vec::new();
        read_sweeps(Cursor::new(input), |scan| {
            sweeps.push(scan);
            true
        })
        .unwrap();
        assert_eq!(sweeps.len(), 2);
        assert_eq!(sweeps[0].samples.len(), 10);
        assert_eq!(sweeps[1].samples.len(), 10);
    }

    #[test]
    fn reader_stops_when_asked() {
        let input = format!("{}\n{}\n{}\n{}\n{}\n", LINE_A, LINE_B, LINE_A, LINE_B, LINE_A);
        let mut count = 0;
        read_sweeps(Cursor::new(input), |_| {
            count += 1;
            false
        })
        .unwrap();
        assert_eq!(count, 1);
    }
}
