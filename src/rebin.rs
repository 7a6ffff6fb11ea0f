//! Flux-conserving rebinning of piecewise-constant signals.
//!
//! A row or column of pixels is treated as a piecewise-constant density:
//! pixel `k` spreads its value uniformly between `edges[k]` and
//! `edges[k + 1]`. The cumulative flux is then piecewise linear, and the flux
//! falling into any output interval is the difference of the cumulative flux
//! at its two ends. Whatever the output intervals, the sum of the rebinned
//! values equals the input flux inside the covered range.

/// Cumulative flux of a piecewise-constant signal.
#[derive(Debug, Clone)]
pub struct CumulativeFlux {
    edges: Vec<f64>,
    cumsum: Vec<f64>,
}

impl CumulativeFlux {
    /// Build from `n + 1` strictly increasing edges and `n` pixel values.
    pub fn new(edges: Vec<f64>, values: &[f64]) -> Self {
        assert_eq!(
            edges.len(),
            values.len() + 1,
            "edges must have one more element than values"
        );
        let mut cumsum = Vec::with_capacity(edges.len());
        let mut acc = 0.0;
        cumsum.push(acc);
        for &v in values {
            acc += v;
            cumsum.push(acc);
        }
        Self { edges, cumsum }
    }

    /// Build for unit-width pixels whose centres sit at `0, 1, …, n-1`.
    pub fn unit_pixels(values: &[f64]) -> Self {
        let edges = (0..=values.len()).map(|k| k as f64 - 0.5).collect();
        Self::new(edges, values)
    }

    /// Flux accumulated from the first edge up to `t`.
    pub fn at(&self, t: f64) -> f64 {
        let n = self.edges.len() - 1;
        if n == 0 || t <= self.edges[0] {
            return 0.0;
        }
        if t >= self.edges[n] {
            return self.cumsum[n];
        }
        // edges[k] <= t < edges[k + 1]
        let k = self.edges.partition_point(|&e| e <= t) - 1;
        let frac = (t - self.edges[k]) / (self.edges[k + 1] - self.edges[k]);
        self.cumsum[k] + frac * (self.cumsum[k + 1] - self.cumsum[k])
    }

    /// Flux between `a` and `b`, independent of their order.
    pub fn integral(&self, a: f64, b: f64) -> f64 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.at(hi) - self.at(lo)
    }

    /// Rebin onto output pixels bounded by `out_edges` (`m + 1` increasing
    /// edges), writing `m` values into `out`.
    pub fn rebin_into(&self, out_edges: &[f64], out: &mut [f64]) {
        assert_eq!(out_edges.len(), out.len() + 1);
        let mut previous = self.at(out_edges[0]);
        for (value, &edge) in out.iter_mut().zip(&out_edges[1..]) {
            let current = self.at(edge);
            *value = current - previous;
            previous = current;
        }
    }
}

/// Returns `true` if `values` is strictly increasing.
pub fn strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] > w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cumulative_flux_interpolates() {
        let c = CumulativeFlux::unit_pixels(&[1.0, 2.0, 3.0]);
        assert_eq!(c.at(2.5), 6.0);
        assert_eq!(c.at(-0.5), 0.0);
        assert_eq!(c.at(-10.0), 0.0);
        assert_eq!(c.at(0.0), 0.5);
        assert_eq!(c.at(0.5), 1.0);
        assert_eq!(c.at(1.0), 2.0);
        assert_eq!(c.at(7.0), 6.0);
        assert_eq!(c.integral(1.5, 0.5), 2.0);
    }

    #[test]
    fn test_rebin_conserves_flux_when_covering() {
        let values = [0.0, 4.0, 10.0, 3.0, 1.0, 0.0, 2.5];
        let edges: Vec<f64> = (0..=values.len()).map(|k| 100.0 + 1.3 * k as f64).collect();
        let c = CumulativeFlux::new(edges, &values);

        // coarser, shifted output grid that extends past both ends
        let out_edges: Vec<f64> = (0..=7).map(|k| 98.0 + 1.7 * k as f64).collect();
        let mut out = vec![0.0; 7];
        c.rebin_into(&out_edges, &mut out);
        assert_relative_eq!(out.iter().sum::<f64>(), values.iter().sum::<f64>(), epsilon = 1e-12);
    }

    #[test]
    fn test_rebin_identity_grid() {
        let values = [1.0, 5.0, 2.0];
        let c = CumulativeFlux::unit_pixels(&values);
        let out_edges = [-0.5, 0.5, 1.5, 2.5];
        let mut out = [0.0; 3];
        c.rebin_into(&out_edges, &mut out);
        assert_eq!(out, values);
    }

    #[test]
    fn test_strictly_increasing() {
        assert!(strictly_increasing(&[1.0, 2.0, 3.0]));
        assert!(!strictly_increasing(&[1.0, 1.0, 3.0]));
        assert!(strictly_increasing(&[]));
    }
}
