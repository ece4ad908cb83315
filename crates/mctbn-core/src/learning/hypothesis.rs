//! Hypothesis tests driving the constraint-based searches.
//!
//! - [`CategoricalTester`]: chi-squared conditional independence test between
//!   two discrete (class) variables given a separating set.
//! - [`TransitionTester`]: the continuous-time pair of tests comparing a node's
//!   fit under "separating set" against "separating set + candidate parent":
//!   an F-test on the leaving intensities followed, for nodes with more than
//!   two states, by a chi-squared test on the destination-state counts.
//!
//! Critical values are memoized per degrees of freedom; each search context
//! owns its own tester, so the memo tables are never shared between threads.

use rustc_hash::FxHashMap;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use crate::errors::LearnError;
use crate::model::parent_set::ParentConfigurations;
use crate::model::statistics::{CimStatistics, DiscreteStatistics, NodeFit};

/// Checks that a significance level is a probability.
pub fn validate_significance(name: &str, value: f64) -> Result<f64, LearnError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(LearnError::Configuration(format!(
            "{} must be in [0, 1], got {}",
            name, value
        )));
    }
    Ok(value)
}

/// Upper-tail chi-squared critical value at `significance`.
fn chi_squared_critical(df: f64, significance: f64) -> Result<f64, LearnError> {
    if significance <= 0.0 {
        return Ok(f64::INFINITY);
    }
    if significance >= 1.0 {
        return Ok(0.0);
    }
    let dist = ChiSquared::new(df).map_err(|e| {
        LearnError::Numerical(format!("chi-squared with {} degrees of freedom: {}", df, e))
    })?;
    Ok(dist.inverse_cdf(1.0 - significance))
}

/// Two-sided F acceptance interval at `significance`.
fn f_bounds(df1: f64, df2: f64, significance: f64) -> Result<(f64, f64), LearnError> {
    if significance <= 0.0 {
        return Ok((0.0, f64::INFINITY));
    }
    let dist = FisherSnedecor::new(df1, df2).map_err(|e| {
        LearnError::Numerical(format!("F({}, {}) distribution: {}", df1, df2, e))
    })?;
    Ok((
        dist.inverse_cdf(significance / 2.0),
        dist.inverse_cdf(1.0 - significance / 2.0),
    ))
}

/// Result of a chi-squared independence test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquaredOutcome {
    pub statistic: f64,
    pub degrees_of_freedom: f64,
    pub critical_value: f64,
}

impl ChiSquaredOutcome {
    /// Independence is rejected once the statistic reaches the critical value.
    pub fn independent(&self) -> bool {
        self.statistic < self.critical_value
    }
}

/// Chi-squared conditional independence test for discrete variables.
#[derive(Debug, Clone)]
pub struct CategoricalTester {
    significance: f64,
    critical: FxHashMap<u64, f64>,
    tests: usize,
}

impl CategoricalTester {
    pub fn new(significance: f64) -> Result<Self, LearnError> {
        Ok(Self {
            significance: validate_significance("significance", significance)?,
            critical: FxHashMap::default(),
            tests: 0,
        })
    }

    /// Number of tests evaluated so far.
    pub fn tests_performed(&self) -> usize {
        self.tests
    }

    /// Tests `X ⟂ Y | S`.
    ///
    /// - `x_given_s`, `y_given_s`: counts of X and of Y indexed by `s_configs`
    /// - `x_given_ys`: counts of X indexed by `ys_configs`, the configurations
    ///   of `{Y} ∪ S`; `y` is Y's node index.
    ///
    /// Separating-set configurations without samples and cells with a zero
    /// expected count add nothing to the statistic; degrees of freedom
    /// `(|X|-1)(|Y|-1)` are accumulated per configuration with samples.
    #[allow(clippy::too_many_arguments)]
    pub fn test(
        &mut self,
        variable: &str,
        x_given_s: &DiscreteStatistics,
        y_given_s: &DiscreteStatistics,
        x_given_ys: &DiscreteStatistics,
        s_configs: &ParentConfigurations,
        ys_configs: &ParentConfigurations,
        y: usize,
    ) -> Result<ChiSquaredOutcome, LearnError> {
        self.tests += 1;

        let y_pos = ys_configs.parents().binary_search(&y).map_err(|_| {
            LearnError::Internal(format!("{} is not part of the conditioning set", y))
        })?;
        let num_x = x_given_s.nx.first().map(Vec::len).unwrap_or(0);
        let num_y = y_given_s.nx.first().map(Vec::len).unwrap_or(0);
        let per_config = (num_x as f64 - 1.0) * (num_y as f64 - 1.0);

        let samples: Vec<f64> = (0..s_configs.len()).map(|s| x_given_s.samples(s)).collect();
        let degrees_of_freedom: f64 = samples
            .iter()
            .filter(|&&n| n > 0.0)
            .map(|_| per_config)
            .sum();
        if degrees_of_freedom <= 0.0 {
            return Err(LearnError::degrees_of_freedom(
                variable,
                format!(
                    "chi-squared test has {} degrees of freedom ({} x {} states)",
                    degrees_of_freedom, num_x, num_y
                ),
            ));
        }

        let mut statistic = 0.0;
        for c in 0..ys_configs.len() {
            let s = ys_configs.project(c, s_configs)?;
            let n_s = samples[s];
            if n_s <= 0.0 {
                continue;
            }
            let y_state = ys_configs.state_at(c, y_pos);
            for x_state in 0..num_x {
                let expected = x_given_s.nx[s][x_state] * y_given_s.nx[s][y_state] / n_s;
                if expected <= 0.0 {
                    continue;
                }
                let observed = x_given_ys.nx[c][x_state];
                statistic += (observed - expected).powi(2) / expected;
            }
        }

        let critical_value = self.critical_value(degrees_of_freedom)?;
        Ok(ChiSquaredOutcome {
            statistic,
            degrees_of_freedom,
            critical_value,
        })
    }

    fn critical_value(&mut self, df: f64) -> Result<f64, LearnError> {
        let key = df.to_bits();
        if let Some(&value) = self.critical.get(&key) {
            return Ok(value);
        }
        let value = chi_squared_critical(df, self.significance)?;
        self.critical.insert(key, value);
        Ok(value)
    }
}

/// Time-to-transition and state-to-state tests for continuous-time nodes.
#[derive(Debug, Clone)]
pub struct TransitionTester {
    significance_time: f64,
    significance_state: f64,
    f_bounds: FxHashMap<(u64, u64), (f64, f64)>,
    chi_critical: FxHashMap<u64, f64>,
    tests: usize,
}

impl TransitionTester {
    pub fn new(significance_time: f64, significance_state: f64) -> Result<Self, LearnError> {
        Ok(Self {
            significance_time: validate_significance(
                "significance_time_to_transition",
                significance_time,
            )?,
            significance_state: validate_significance(
                "significance_state_to_state",
                significance_state,
            )?,
            f_bounds: FxHashMap::default(),
            chi_critical: FxHashMap::default(),
            tests: 0,
        })
    }

    pub fn tests_performed(&self) -> usize {
        self.tests
    }

    /// Whether the candidate parent can be dropped: `true` when neither test
    /// rejects the null hypothesis that the parent adds nothing given the
    /// separating set.
    ///
    /// `separating` is the node's fit under `sep_configs`, `with_parent` its
    /// fit under `full_configs` (separating set plus candidate). The
    /// state-to-state test only runs when the time-to-transition test did not
    /// reject, and only for nodes with more than two states.
    pub fn independent(
        &mut self,
        variable: &str,
        separating: &NodeFit,
        sep_configs: &ParentConfigurations,
        with_parent: &NodeFit,
        full_configs: &ParentConfigurations,
    ) -> Result<bool, LearnError> {
        self.tests += 1;

        let sep = cim_of(variable, separating)?;
        let full = cim_of(variable, with_parent)?;
        let sep_qx = separating
            .parameters
            .qx()
            .ok_or_else(|| LearnError::Internal(format!("'{}' has no intensities", variable)))?;
        let full_qx = with_parent
            .parameters
            .qx()
            .ok_or_else(|| LearnError::Internal(format!("'{}' has no intensities", variable)))?;

        let projection = (0..full_configs.len())
            .map(|c| full_configs.project(c, sep_configs))
            .collect::<Result<Vec<_>, _>>()?;

        if !self.time_to_transition(variable, sep, sep_qx, full, full_qx, &projection)? {
            return Ok(false);
        }

        let num_states = full.mx.first().map(Vec::len).unwrap_or(0);
        if num_states > 2 {
            return self.state_to_state(sep, full, &projection);
        }
        Ok(true)
    }

    fn time_to_transition(
        &mut self,
        variable: &str,
        sep: &CimStatistics,
        sep_qx: &[Vec<f64>],
        full: &CimStatistics,
        full_qx: &[Vec<f64>],
        projection: &[usize],
    ) -> Result<bool, LearnError> {
        for (c, &s) in projection.iter().enumerate() {
            for x in 0..full.mx[c].len() {
                let df1 = sep.mx[s][x];
                let df2 = full.mx[c][x];
                if df1 <= 0.0 || df2 <= 0.0 {
                    return Err(LearnError::degrees_of_freedom(
                        variable,
                        format!(
                            "no transitions out of state {} (F-test needs df > 0, got {} and {})",
                            x, df1, df2
                        ),
                    ));
                }

                let f = sep_qx[s][x] / full_qx[c][x];
                let (lower, upper) = self.f_bounds(df1, df2)?;
                if f < lower || f > upper {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn state_to_state(
        &mut self,
        sep: &CimStatistics,
        full: &CimStatistics,
        projection: &[usize],
    ) -> Result<bool, LearnError> {
        for (c, &s) in projection.iter().enumerate() {
            let num_states = full.mx[c].len();
            let critical = self.chi_critical((num_states - 1) as f64)?;
            for x in 0..num_states {
                let mx1 = sep.mx[s][x];
                let mx2 = full.mx[c][x];
                if mx1 <= 0.0 || mx2 <= 0.0 {
                    continue;
                }
                let k = (mx2 / mx1).sqrt();
                let l = 1.0 / k;

                let mut statistic = 0.0;
                for y in (0..num_states).filter(|&y| y != x) {
                    let m1 = sep.mxy[s][x][y];
                    let m2 = full.mxy[c][x][y];
                    if m1 + m2 > 0.0 {
                        statistic += (k * m1 - l * m2).powi(2) / (m1 + m2);
                    }
                }
                if statistic > critical {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn f_bounds(&mut self, df1: f64, df2: f64) -> Result<(f64, f64), LearnError> {
        let key = (df1.to_bits(), df2.to_bits());
        if let Some(&bounds) = self.f_bounds.get(&key) {
            return Ok(bounds);
        }
        let bounds = f_bounds(df1, df2, self.significance_time)?;
        self.f_bounds.insert(key, bounds);
        Ok(bounds)
    }

    fn chi_critical(&mut self, df: f64) -> Result<f64, LearnError> {
        let key = df.to_bits();
        if let Some(&value) = self.chi_critical.get(&key) {
            return Ok(value);
        }
        let value = chi_squared_critical(df, self.significance_state)?;
        self.chi_critical.insert(key, value);
        Ok(value)
    }
}

fn cim_of<'a>(variable: &str, fit: &'a NodeFit) -> Result<&'a CimStatistics, LearnError> {
    fit.statistics.as_cim().ok_or_else(|| {
        LearnError::Internal(format!("'{}' is not a continuous-time node", variable))
    })
}
