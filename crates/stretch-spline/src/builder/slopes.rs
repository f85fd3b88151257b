//! Knot slopes for local-control Hermite spans.
//!
//! Each generator maps knot data to one slope per knot. With two knots every
//! generator returns the secant at both ends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::validate_knots;
use crate::error::{SplineError, SplineResult};

/// Local slope estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SlopeGenerator {
    /// Three-point parabolic slopes (Bessel / Parabolic).
    #[default]
    Bessel,
    /// Bessel slopes clipped into the Hyman (1983) monotone region.
    Hyman83,
    /// Bessel slopes passed through the Dougherty-Edelman-Hyman (1989) filter.
    Hyman89,
    /// Fritsch-Butland weighted harmonic mean.
    Harmonic,
    /// Van Leer limiter.
    VanLeer,
    /// Huynh / Le Floch limiter.
    HuynhLeFloch,
    /// Kruger's harmonic mean with sign check.
    Kruger,
    /// Akima's weighted slopes with extrapolated end slopes.
    Akima,
}

impl SlopeGenerator {
    /// All generators.
    pub const ALL: [SlopeGenerator; 8] = [
        Self::Bessel,
        Self::Hyman83,
        Self::Hyman89,
        Self::Harmonic,
        Self::VanLeer,
        Self::HuynhLeFloch,
        Self::Kruger,
        Self::Akima,
    ];

    /// Generator name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bessel => "Bessel",
            Self::Hyman83 => "Hyman83",
            Self::Hyman89 => "Hyman89",
            Self::Harmonic => "Harmonic",
            Self::VanLeer => "VanLeer",
            Self::HuynhLeFloch => "HuynhLeFloch",
            Self::Kruger => "Kruger",
            Self::Akima => "Akima",
        }
    }

    /// One slope per knot.
    pub fn slopes(self, x: &[f64], y: &[f64]) -> SplineResult<Vec<f64>> {
        validate_knots(x, y)?;
        let knots = Knots::new(x, y);
        if x.len() == 2 {
            return Ok(vec![knots.s[0]; 2]);
        }
        Ok(match self {
            Self::Bessel => knots.bessel(),
            Self::Hyman83 => knots.hyman83(),
            Self::Hyman89 => knots.hyman89(),
            Self::Harmonic => knots.harmonic(),
            Self::VanLeer => knots.limited(van_leer),
            Self::HuynhLeFloch => knots.limited(huynh_le_floch),
            Self::Kruger => knots.kruger(),
            Self::Akima => knots.akima(),
        })
    }
}

impl fmt::Display for SlopeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SlopeGenerator {
    type Err = SplineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SplineError::invalid_input(format!("unknown slope generator '{s}'")))
    }
}

/// Interval widths `h` and secants `s` of validated knot data.
struct Knots {
    h: Vec<f64>,
    s: Vec<f64>,
}

impl Knots {
    fn new(x: &[f64], y: &[f64]) -> Self {
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let s = y
            .windows(2)
            .zip(&h)
            .map(|(w, &width)| (w[1] - w[0]) / width)
            .collect();
        Self { h, s }
    }

    fn count(&self) -> usize {
        self.s.len() + 1
    }

    /// Parabolic end slopes `(left, right)`.
    fn parabolic_ends(&self) -> (f64, f64) {
        let (h, s) = (&self.h, &self.s);
        let n = s.len();
        let left = ((2.0 * h[0] + h[1]) * s[0] - h[0] * s[1]) / (h[0] + h[1]);
        let right = ((2.0 * h[n - 1] + h[n - 2]) * s[n - 1] - h[n - 1] * s[n - 2])
            / (h[n - 1] + h[n - 2]);
        (left, right)
    }

    fn bessel(&self) -> Vec<f64> {
        let (h, s) = (&self.h, &self.s);
        let n = self.count();
        let mut t = vec![0.0; n];
        for i in 1..n - 1 {
            t[i] = (h[i - 1] * s[i] + h[i] * s[i - 1]) / (h[i - 1] + h[i]);
        }
        (t[0], t[n - 1]) = self.parabolic_ends();
        t
    }

    /// Clamps end slopes to the sign and `3|s|` bound of the adjacent secant.
    fn correct_ends(&self, t: &mut [f64]) {
        let n = t.len();
        for (i, secant) in [(0, self.s[0]), (n - 1, self.s[n - 2])] {
            if t[i] * secant <= 0.0 {
                t[i] = 0.0;
            } else if t[i].abs() > 3.0 * secant.abs() {
                t[i] = t[i].signum() * 3.0 * secant.abs();
            }
        }
    }

    fn hyman83(&self) -> Vec<f64> {
        let s = &self.s;
        let mut t = self.bessel();
        let n = t.len();
        for i in 1..n - 1 {
            let (a, b) = (s[i - 1], s[i]);
            t[i] = if a * b > 0.0 && t[i] * a > 0.0 {
                t[i].signum() * t[i].abs().min(3.0 * a.abs().min(b.abs()))
            } else {
                0.0
            };
        }
        self.correct_ends(&mut t);
        t
    }

    #[allow(clippy::many_single_char_names)]
    fn hyman89(&self) -> Vec<f64> {
        let (h, s) = (&self.h, &self.s);
        let mut t = self.bessel();
        let n = t.len();
        for i in 1..n - 1 {
            let pm = (s[i - 1] * h[i] + s[i] * h[i - 1]) / (h[i - 1] + h[i]);
            let mut bound = 3.0 * s[i - 1].abs().min(s[i].abs()).min(pm.abs());

            if i > 1 && (s[i - 1] - s[i - 2]) * (s[i] - s[i - 1]) > 0.0 {
                let pd = (s[i - 1] * (2.0 * h[i - 1] + h[i - 2]) - s[i - 2] * h[i - 1])
                    / (h[i - 2] + h[i - 1]);
                if pm * pd > 0.0 && pm * (s[i - 1] - s[i - 2]) > 0.0 {
                    bound = bound.max(1.5 * pm.abs().min(pd.abs()));
                }
            }
            if i < n - 2 && (s[i] - s[i - 1]) * (s[i + 1] - s[i]) > 0.0 {
                let pu = (s[i] * (2.0 * h[i] + h[i + 1]) - s[i + 1] * h[i]) / (h[i] + h[i + 1]);
                if pm * pu > 0.0 && -pm * (s[i] - s[i - 1]) > 0.0 {
                    bound = bound.max(1.5 * pm.abs().min(pu.abs()));
                }
            }

            t[i] = if t[i] * pm > 0.0 {
                t[i].signum() * t[i].abs().min(bound)
            } else {
                0.0
            };
        }
        self.correct_ends(&mut t);
        t
    }

    fn harmonic(&self) -> Vec<f64> {
        let (h, s) = (&self.h, &self.s);
        let n = self.count();
        let mut t = vec![0.0; n];
        for i in 1..n - 1 {
            if s[i - 1] * s[i] > 0.0 {
                let w1 = 2.0 * h[i] + h[i - 1];
                let w2 = h[i] + 2.0 * h[i - 1];
                t[i] = (w1 + w2) / (w1 / s[i - 1] + w2 / s[i]);
            }
        }
        (t[0], t[n - 1]) = self.parabolic_ends();
        self.correct_ends(&mut t);
        t
    }

    /// Interior slopes from a two-secant limiter, secant slopes at the ends.
    fn limited(&self, limiter: fn(f64, f64) -> f64) -> Vec<f64> {
        let s = &self.s;
        let n = self.count();
        let mut t = vec![0.0; n];
        for i in 1..n - 1 {
            t[i] = if s[i - 1] * s[i] > 0.0 {
                limiter(s[i - 1], s[i])
            } else {
                0.0
            };
        }
        t[0] = s[0];
        t[n - 1] = s[n - 2];
        t
    }

    fn kruger(&self) -> Vec<f64> {
        let s = &self.s;
        let n = self.count();
        let mut t = vec![0.0; n];
        for i in 1..n - 1 {
            if s[i - 1] * s[i] > 0.0 {
                t[i] = 2.0 / (1.0 / s[i - 1] + 1.0 / s[i]);
            }
        }
        t[0] = (3.0 * s[0] - t[1]) / 2.0;
        t[n - 1] = (3.0 * s[n - 2] - t[n - 2]) / 2.0;
        t
    }

    fn akima(&self) -> Vec<f64> {
        let s = &self.s;
        let m = s.len();
        let mut extended = Vec::with_capacity(m + 4);
        extended.push(3.0 * s[0] - 2.0 * s[1]);
        extended.push(2.0 * s[0] - s[1]);
        extended.extend_from_slice(s);
        extended.push(2.0 * s[m - 1] - s[m - 2]);
        extended.push(3.0 * s[m - 1] - 2.0 * s[m - 2]);

        (0..self.count())
            .map(|i| {
                let k = i + 2;
                let w1 = (extended[k + 1] - extended[k]).abs();
                let w2 = (extended[k - 1] - extended[k - 2]).abs();
                if w1 + w2 == 0.0 {
                    0.5 * (extended[k - 1] + extended[k])
                } else {
                    (w1 * extended[k - 1] + w2 * extended[k]) / (w1 + w2)
                }
            })
            .collect()
    }
}

fn van_leer(a: f64, b: f64) -> f64 {
    2.0 * a * b / (a + b)
}

fn huynh_le_floch(a: f64, b: f64) -> f64 {
    3.0 * a * b * (a + b) / (a * a + 4.0 * a * b + b * b)
}
