/// Smooths periodic rate samples for display.
pub trait RateEstimator {
    fn add_sample(&mut self, rate: f64);
    fn current_estimate(&self) -> f64;
}

/// Exponential moving average over roughly `period` samples.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            alpha: 2.0 / (period.max(1) as f64 + 1.0),
            value: None,
        }
    }
}

impl Default for Ema {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RateEstimator for Ema {
    fn add_sample(&mut self, rate: f64) {
        self.value = Some(match self.value {
            Some(prev) => prev + self.alpha * (rate - prev),
            None => rate,
        });
    }

    fn current_estimate(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_the_average() {
        let mut ema = Ema::new(3);
        assert_eq!(ema.current_estimate(), 0.0);
        ema.add_sample(12.0);
        assert_eq!(ema.current_estimate(), 12.0);
    }

    #[test]
    fn converges_towards_steady_input() {
        let mut ema = Ema::new(3);
        ema.add_sample(0.0);
        for _ in 0..20 {
            ema.add_sample(10.0);
        }
        assert!((ema.current_estimate() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn period_three_halves_the_step() {
        let mut ema = Ema::new(3);
        ema.add_sample(0.0);
        ema.add_sample(8.0);
        assert_eq!(ema.current_estimate(), 4.0);
    }
}
