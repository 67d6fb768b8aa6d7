use rand::Rng;

use crate::error::{Result, WorkchatError};

/// Parameters for a synthetic trend + seasonality + noise series, used to
/// produce plausible demo input for the forecast feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesConfig {
    pub length: usize,
    /// Linear trend added per period.
    pub trend: f64,
    /// Periods per seasonal cycle.
    pub seasonal_period: usize,
    /// Amplitude of the seasonal sine wave.
    pub seasonal_strength: f64,
    /// Standard deviation of the Gaussian noise term.
    pub noise_std: f64,
    pub base_value: f64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            length: 48,
            trend: 0.5,
            seasonal_period: 12,
            seasonal_strength: 0.3,
            noise_std: 0.1,
            base_value: 100.0,
        }
    }
}

/// Named generator configurations for common reporting cadences.
pub const PRESETS: &[(&str, SeriesConfig)] = &[
    (
        "monthly-sales",
        SeriesConfig {
            length: 36,
            trend: 2.0,
            seasonal_period: 12,
            seasonal_strength: 0.4,
            noise_std: 5.0,
            base_value: 100.0,
        },
    ),
    (
        "quarterly-revenue",
        SeriesConfig {
            length: 24,
            trend: 1.5,
            seasonal_period: 4,
            seasonal_strength: 0.3,
            noise_std: 3.0,
            base_value: 200.0,
        },
    ),
    (
        "weekly-traffic",
        SeriesConfig {
            length: 104,
            trend: 0.8,
            seasonal_period: 52,
            seasonal_strength: 0.5,
            noise_std: 2.0,
            base_value: 50.0,
        },
    ),
    (
        "daily-orders",
        SeriesConfig {
            length: 365,
            trend: 0.3,
            seasonal_period: 7,
            seasonal_strength: 0.6,
            noise_std: 1.0,
            base_value: 25.0,
        },
    ),
];

pub fn preset(name: &str) -> Option<SeriesConfig> {
    PRESETS
        .iter()
        .find(|(label, _)| *label == name)
        .map(|(_, config)| *config)
}

impl SeriesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.length == 0 {
            return Err(WorkchatError::Validation(
                "series length must be positive".to_string(),
            ));
        }
        if self.seasonal_period == 0 {
            return Err(WorkchatError::Validation(
                "seasonal period must be positive".to_string(),
            ));
        }
        if self.noise_std < 0.0 {
            return Err(WorkchatError::Validation(
                "noise standard deviation must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate the series: `base + i*trend + sin(2*pi*i/period)*strength +
    /// N(0, noise_std^2)`, clamped at zero.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f64>> {
        self.validate()?;

        let mut values = Vec::with_capacity(self.length);
        for i in 0..self.length {
            let trend = i as f64 * self.trend;
            let angle = 2.0 * std::f64::consts::PI * i as f64 / self.seasonal_period as f64;
            let seasonal = angle.sin() * self.seasonal_strength;
            let noise = gaussian(rng, 0.0, self.noise_std);
            values.push((self.base_value + trend + seasonal + noise).max(0.0));
        }
        Ok(values)
    }
}

/// One normal draw via the Box-Muller transform. Uniform draws are re-drawn
/// while exactly zero so the log stays finite.
fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let mut u: f64 = 0.0;
    while u == 0.0 {
        u = rng.gen_range(0.0..1.0);
    }
    let mut v: f64 = 0.0;
    while v == 0.0 {
        v = rng.gen_range(0.0..1.0);
    }
    let z = (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos();
    mean + z * std
}

/// Basic statistics over a generated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

pub fn summarize(values: &[f64]) -> Option<SeriesSummary> {
    if values.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    Some(SeriesSummary {
        count: values.len(),
        min,
        max,
        mean: sum / values.len() as f64,
    })
}

/// Render a series as two-column CSV, one row per period.
pub fn to_csv(values: &[f64]) -> String {
    let mut csv = String::from("Period,Value\n");
    for (i, value) in values.iter().enumerate() {
        csv.push_str(&format!("{},{:.2}\n", i + 1, value));
    }
    csv
}
