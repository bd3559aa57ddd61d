//! Numerical computations over recorded series.
//!
//! Everything here is pure. Callers guarantee non-empty series; empty input
//! yields NaN rather than an error.

use crate::models::Stats;

/// Compute the population mean and standard deviation of a series.
///
/// ```text
/// stats([3, 4, 5]) => mean: 4.0, stdev: 0.816
/// ```
pub fn stats(values: &[f64]) -> Stats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sq_diff_sum: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();

    Stats {
        mean,
        stdev: (sq_diff_sum / n).sqrt(),
        values: values.to_vec(),
    }
}

/// Subtract each pair from two sequences.
///
/// A missing element in `b` produces NaN for that position.
pub fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter()
        .enumerate()
        .map(|(i, x)| x - b.get(i).copied().unwrap_or(f64::NAN))
        .collect()
}

/// Compare two stats by their one-stdev ranges around the mean.
///
/// Returns the distance between the ranges when they don't overlap (negative
/// when `after` got lower), or exactly 0 when they do.
///
/// ```text
/// a = stats([3, 4, 5])       // range 3.18 ... 4.82
/// b = stats([1.0, 1.5, 2.0]) // range 1.09 ... 1.91
/// diff_stdev(a, b) => -1.275
/// ```
pub fn diff_stdev(before: &Stats, after: &Stats) -> f64 {
    let before_start = before.mean - before.stdev;
    let before_end = before.mean + before.stdev;

    let after_start = after.mean - after.stdev;
    let after_end = after.mean + after.stdev;

    if after_end < before_start {
        return after_end - before_start;
    }
    if before_end < after_start {
        return after_start - before_end;
    }
    0.0
}

/// Ranks of a series, in the series' own order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// 1-based rank per input position; tied values share the mean rank.
    pub ranks: Vec<f64>,
    /// Sum of `t^3 - t` over every group of `t` tied values.
    pub tie_term: f64,
}

/// Assign ranks to values, averaging the ranks of ties.
pub fn rank(values: &[f64]) -> Ranking {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }

        // Positions i..=j hold ranks i+1..=j+1.
        let shared = (i + j + 2) as f64 / 2.0;
        for &index in &order[i..=j] {
            ranks[index] = shared;
        }

        let t = (j - i + 1) as f64;
        if t > 1.0 {
            tie_term += t.powi(3) - t;
        }
        i = j + 1;
    }

    Ranking { ranks, tie_term }
}

/// One-sided Mann-Whitney U test with tie correction.
///
/// Uses the normal approximation of U and a logistic approximation of the
/// normal CDF. Low values mean `before` tends to be lower than `after`.
/// Returns exactly 1 when every value in both series is the same.
pub fn mann_whitney(before: &Stats, after: &Stats) -> f64 {
    let n1 = before.values.len() as f64;
    let n2 = after.values.len() as f64;
    let n = n1 + n2;

    let combined: Vec<f64> = before
        .values
        .iter()
        .chain(after.values.iter())
        .copied()
        .collect();
    let ranking = rank(&combined);

    let rank_sum: f64 = ranking.ranks[..before.values.len()].iter().sum();
    let u = rank_sum - n1 * (n1 + 1.0) / 2.0;
    let offset = u - n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - ranking.tie_term / (n * (n - 1.0)));

    if offset == 0.0 && variance == 0.0 {
        return 1.0;
    }

    let z = offset / variance.sqrt();
    1.0 / (1.0 + (0.0054 - 1.6101 * z - 0.0674 * z.powi(3)).exp())
}

/// Evidence that `after` increased compared to `before`, from 0 to 1.
pub fn diff_mann_whitney(before: &Stats, after: &Stats) -> f64 {
    1.0 - mann_whitney(before, after)
}
