use std::fmt;

use super::model::{Table, TableError};

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Arithmetic mean ignoring NaN. NaN when nothing is left.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Sample standard deviation (n - 1 denominator). NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Linear-interpolated quantile of already sorted data, `q` in [0, 1].
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Finite values in ascending order; NaN and infinities are dropped.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Column means, in the order requested.
pub fn column_means(table: &Table, columns: &[&str]) -> Result<Vec<(String, f64)>, TableError> {
    columns
        .iter()
        .map(|&name| table.numeric(name).map(|vals| (name.to_string(), mean(&vals))))
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlation over the rows where both values are present.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Square, symmetric matrix of pairwise correlations keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Pearson correlation between every pair of `columns`.
    pub fn compute(table: &Table, columns: &[&str]) -> Result<Self, TableError> {
        let data = columns
            .iter()
            .map(|&c| table.numeric(c))
            .collect::<Result<Vec<_>, _>>()?;
        let n = data.len();
        let mut values = vec![vec![f64::NAN; n]; n];

        for i in 0..n {
            for j in i..n {
                let r = pearson(&data[i], &data[j]);
                // Self-correlation is exactly 1 whenever it is defined.
                let r = if i == j && !r.is_nan() { 1.0 } else { r };
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Ok(CorrelationMatrix {
            labels: columns.iter().map(|c| c.to_string()).collect(),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self.labels.iter().map(|l| l.len()).max().unwrap_or(0);
        let widths: Vec<usize> = self.labels.iter().map(|l| l.len().max(9)).collect();

        write!(f, "{:label_width$}", "")?;
        for (label, w) in self.labels.iter().zip(widths.iter().copied()) {
            write!(f, "  {label:>w$}")?;
        }
        for (i, label) in self.labels.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{label:<label_width$}")?;
            for (j, w) in widths.iter().copied().enumerate() {
                write!(f, "  {:>w$.6}", self.values[i][j])?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Distribution summaries used by the plots
// ---------------------------------------------------------------------------

/// Tukey box-and-whisker summary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Most extreme values within 1.5 IQR of the box.
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// `None` when every value is missing.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let sorted = sorted_finite(values);
        if sorted.is_empty() {
            return None;
        }
        let q1 = quantile_sorted(&sorted, 0.25);
        let median = quantile_sorted(&sorted, 0.5);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let whisker_low = sorted.iter().copied().find(|v| *v >= lo_fence).unwrap_or(q1);
        let whisker_high = sorted.iter().rev().copied().find(|v| *v <= hi_fence).unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < lo_fence || *v > hi_fence)
            .collect();

        Some(BoxStats {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

/// Upper bound on the number of histogram bins.
pub const MAX_BINS: usize = 1000;

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin the finite values using the larger bin count of the Sturges and
    /// Freedman-Diaconis rules (numpy's "auto"), capped at [`MAX_BINS`].
    pub fn auto(values: &[f64]) -> Option<Self> {
        let sorted = sorted_finite(values);
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let n = sorted.len() as f64;

        let (lo, hi, bins) = if max == min {
            (min - 0.5, max + 0.5, 1)
        } else {
            let span = max - min;
            let sturges = span / (n.log2() + 1.0);
            let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
            let fd = 2.0 * iqr * n.powf(-1.0 / 3.0);
            let width = if fd > 0.0 { fd.min(sturges) } else { sturges };
            (min, max, ((span / width).ceil() as usize).clamp(1, MAX_BINS))
        };

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for v in &sorted {
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Some(Histogram { edges, counts })
    }

    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Gaussian kernel density estimate with Scott's bandwidth.
#[derive(Debug, Clone)]
pub struct Kde {
    samples: Vec<f64>,
    bandwidth: f64,
}

impl Kde {
    /// `None` for fewer than two finite values or zero spread.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let samples = sorted_finite(values);
        let std = sample_std(&samples);
        if std.is_nan() || std == 0.0 {
            return None;
        }
        let bandwidth = std * (samples.len() as f64).powf(-0.2);
        Some(Kde { samples, bandwidth })
    }

    pub fn density(&self, x: f64) -> f64 {
        let norm = 1.0 / (self.samples.len() as f64 * self.bandwidth * (2.0 * std::f64::consts::PI).sqrt());
        self.samples
            .iter()
            .map(|s| (-0.5 * ((x - s) / self.bandwidth).powi(2)).exp())
            .sum::<f64>()
            * norm
    }

    /// `points` evenly spaced evaluations across `[lo, hi]`.
    pub fn curve(&self, lo: f64, hi: f64, points: usize) -> Vec<(f64, f64)> {
        let step = if points > 1 { (hi - lo) / (points - 1) as f64 } else { 0.0 };
        (0..points)
            .map(|i| {
                let x = lo + step * i as f64;
                (x, self.density(x))
            })
            .collect()
    }
}
