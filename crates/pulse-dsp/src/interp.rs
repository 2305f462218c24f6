//! Uniform grids and piecewise-linear interpolation

/// `n` evenly spaced points over the closed interval `[start, end]`
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at each point of `x`.
///
/// `xp` must be ascending. Points outside `[xp[0], xp[last]]` take the
/// nearest endpoint value. Returns an empty vector when `xp` is empty or the
/// lengths of `xp` and `fp` differ.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    if xp.is_empty() || xp.len() != fp.len() {
        return Vec::new();
    }
    let last = xp.len() - 1;

    x.iter()
        .map(|&xi| {
            if xi <= xp[0] {
                return fp[0];
            }
            if xi >= xp[last] {
                return fp[last];
            }
            // First knot strictly greater than xi; 1 <= hi <= last here.
            let hi = xp.partition_point(|&k| k <= xi);
            let lo = hi - 1;
            let span = xp[hi] - xp[lo];
            if span == 0.0 {
                return fp[lo];
            }
            let t = (xi - xp[lo]) / span;
            fp[lo] + t * (fp[hi] - fp[lo])
        })
        .collect()
}
