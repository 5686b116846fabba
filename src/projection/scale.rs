/// Linear map from a data domain onto a pixel range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        Self { domain, range }
    }

    /// Domain `[-pad * 1.5, pad * 1.5]` where `pad` is half the largest magnitude in `extent`.
    pub fn symmetric(extent: (f64, f64), range: (f32, f32)) -> Self {
        let pad = extent.1.abs().max(extent.0.abs()) * 0.5;
        Self::new((-pad * 1.5, pad * 1.5), range)
    }

    /// A zero-width domain maps everything to the middle of the range.
    pub fn map(&self, value: f64) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = (self.range.0 as f64, self.range.1 as f64);
        let span = d1 - d0;
        if span.abs() < f64::EPSILON {
            return ((r0 + r1) * 0.5) as f32;
        }
        (r0 + (value - d0) / span * (r1 - r0)) as f32
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (start, stop) = (self.domain.0.min(self.domain.1), self.domain.0.max(self.domain.1));
        tick_values(start, stop, count)
    }
}

pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

/// Tick step rounded to 1, 2, 5 or 10 times a power of ten.
pub fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let raw = (stop - start) / count.max(1) as f64;
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }

    let power = raw.log10().floor();
    let error = raw / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * 10f64.powf(power)
}

fn tick_values(start: f64, stop: f64, count: usize) -> Vec<f64> {
    let step = tick_step(start, stop, count);
    if step <= 0.0 {
        return if start == stop && start.is_finite() {
            vec![start]
        } else {
            Vec::new()
        };
    }

    let first = (start / step).ceil() as i64;
    let last = (stop / step).floor() as i64;
    (first..=last).map(|index| index as f64 * step).collect()
}

/// Decimal places needed to print ticks spaced `step` apart.
pub fn tick_precision(step: f64) -> usize {
    if step <= 0.0 || !step.is_finite() {
        return 0;
    }
    (-step.log10().floor()).max(0.0) as usize
}
