//! Runtime knobs for the Boolean pipeline.
//!
//! ```
//! use meshwind::BooleanConfig;
//!
//! let config = BooleanConfig::default()
//!     .with_exact_output(false)
//!     .with_parallel(false);
//! assert!(!config.exact_output);
//! ```

/// Configuration shared by every stage of a Boolean call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanConfig {
    /// Round exact output coordinates correctly (`true`) or take the faster
    /// numerator/denominator division, which may be off by an ulp (`false`).
    pub exact_output: bool,

    /// Run the per-pair and per-face loops on rayon's pool.
    /// Only has an effect when the `parallel` feature is enabled.
    pub parallel: bool,

    /// How many different rays are tried when placing one connected component
    /// inside the cells of another before the result is flagged invalid.
    pub max_probe_attempts: usize,
}

impl Default for BooleanConfig {
    fn default() -> Self {
        Self {
            exact_output: true,
            parallel: true,
            max_probe_attempts: 64,
        }
    }
}

impl BooleanConfig {
    /// Sequential, correctly rounded configuration. Handy for reproducible tests.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub const fn with_exact_output(mut self, exact_output: bool) -> Self {
        self.exact_output = exact_output;
        self
    }

    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_max_probe_attempts(mut self, attempts: usize) -> Self {
        self.max_probe_attempts = attempts.max(1);
        self
    }

    /// Whether loops should actually fan out on this build.
    #[inline]
    pub(crate) const fn use_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = BooleanConfig::default()
            .with_exact_output(false)
            .with_parallel(false)
            .with_max_probe_attempts(0);
        assert!(!config.exact_output);
        assert!(!config.parallel);
        assert_eq!(config.max_probe_attempts, 1);
    }

    #[test]
    fn sequential_preset_keeps_exact_output() {
        let config = BooleanConfig::sequential();
        assert!(config.exact_output);
        assert!(!config.use_parallel());
    }
}
