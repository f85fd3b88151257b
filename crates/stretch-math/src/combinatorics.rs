//! Small combinatorial helpers used by basis-function derivatives.

/// Binomial coefficient `C(n, k)` as `f64`; zero when `k > n`.
#[must_use]
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Falling factorial `n (n-1) ... (n-k+1)`; zero when `k > n`.
#[must_use]
pub fn falling_factorial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_binomial() {
        assert_relative_eq!(binomial(4, 2), 6.0);
        assert_relative_eq!(binomial(5, 0), 1.0);
        assert_relative_eq!(binomial(5, 5), 1.0);
        assert_relative_eq!(binomial(10, 3), 120.0);
        assert_eq!(binomial(2, 3), 0.0);
    }

    #[test]
    fn test_falling_factorial() {
        assert_relative_eq!(falling_factorial(5, 2), 20.0);
        assert_relative_eq!(falling_factorial(3, 3), 6.0);
        assert_relative_eq!(falling_factorial(3, 0), 1.0);
        assert_eq!(falling_factorial(2, 3), 0.0);
    }
}
