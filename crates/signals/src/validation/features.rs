//! Hourly feature and target series derived from the master table.
//!
//! Every series is aligned to the input index: position `t` always refers to
//! hour `t`, with `None` where the value is undefined (series edges, missing
//! prices).

/// Percent change from `t` to `t + horizon`, aligned back to `t`.
#[must_use]
pub fn future_returns(close: &[Option<f64>], horizon: usize) -> Vec<Option<f64>> {
    (0..close.len())
        .map(|t| {
            let now = close[t]?;
            let later = (*close.get(t + horizon)?)?;
            (now != 0.0).then(|| later / now - 1.0)
        })
        .collect()
}

/// Percent change from `t - window` to `t`.
#[must_use]
pub fn past_returns(close: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..close.len())
        .map(|t| {
            let now = close[t]?;
            let before = close[t.checked_sub(window)?]?;
            (before != 0.0).then(|| now / before - 1.0)
        })
        .collect()
}

/// Trailing mean over the last `window` values including `t`, with a minimum
/// of one period (the first values average over what is available).
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for t in 0..values.len() {
        sum += values[t];
        if t >= window {
            sum -= values[t - window];
        }
        let count = (t + 1).min(window);
        out.push(sum / count as f64);
    }

    out
}

/// Shifts a series forward by `lag`: the value at `t` is the input at `t - lag`.
#[must_use]
pub fn lagged<T: Copy>(values: &[T], lag: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|t| t.checked_sub(lag).map(|src| values[src]))
        .collect()
}

/// Sample standard deviation of 1-hour returns over the trailing `window`
/// returns ending at `t`. Undefined until `window` returns exist.
#[must_use]
pub fn rolling_volatility(close: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let hourly = past_returns(close, 1);
    (0..close.len())
        .map(|t| {
            if window < 2 || t + 1 < window {
                return None;
            }
            let slice = &hourly[t + 1 - window..=t];
            let values: Option<Vec<f64>> = slice.iter().copied().collect();
            let values = values?;
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            Some(var.sqrt())
        })
        .collect()
}

/// Keeps the positions where both series are defined.
#[must_use]
pub fn paired(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .unzip()
}
