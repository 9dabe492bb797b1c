// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Evaluation settings.
//!
//! Settings are layered: built-in defaults, then an optional configuration
//! file (any format the `config` crate detects from the extension), then
//! `SEGEVAL_*` environment variables. List values in the environment are
//! comma-separated, e.g. `SEGEVAL_THRESHOLDS=0.3,0.5,0.7`.

use crate::{Error, classify::SignificanceRule, evaluate::Evaluator, reader::RegionReadOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SEGEVAL";

/// Name of a significance rule as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleName {
    #[default]
    Reference,
    Smaller,
    Union,
    Coverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Thresholds evaluated when none are given on the command line.
    pub thresholds: Vec<f64>,
    pub rule: RuleName,
    /// Margin share required by the coverage rule.
    pub relative: f64,
    /// Label restriction; empty keeps every region.
    pub labels: Vec<String>,
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![0.5],
            rule: RuleName::Reference,
            relative: 0.2,
            labels: Vec::new(),
            parallel: true,
        }
    }
}

impl EvalConfig {
    /// Load settings from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("thresholds")
                    .with_list_parse_key("labels"),
            )
            .build()?;
        let config: EvalConfig = settings.try_deserialize()?;
        log::debug!("loaded configuration {:?}", config);
        Ok(config)
    }

    /// The configured significance rule.
    pub fn significance_rule(&self) -> Result<SignificanceRule, Error> {
        Ok(match self.rule {
            RuleName::Reference => SignificanceRule::Reference,
            RuleName::Smaller => SignificanceRule::Smaller,
            RuleName::Union => SignificanceRule::Union,
            RuleName::Coverage => {
                if !(self.relative > 0.0 && self.relative <= 1.0) {
                    return Err(Error::InvalidParameters(format!(
                        "coverage relative share must be in (0, 1], got {}",
                        self.relative
                    )));
                }
                SignificanceRule::Coverage {
                    relative: self.relative,
                }
            }
        })
    }

    pub fn evaluator(&self) -> Result<Evaluator, Error> {
        Ok(Evaluator::new()
            .with_rule(self.significance_rule()?)
            .with_parallel(self.parallel))
    }

    pub fn read_options(&self) -> RegionReadOptions {
        RegionReadOptions {
            label_filter: self.labels.clone(),
        }
    }
}

/// Largest number of thresholds a sweep may expand to.
pub const MAX_SWEEP_POINTS: usize = 10_000;

/// Expand a `START:END:STEP` sweep into thresholds, both ends included.
///
/// Values are rounded to nine decimals so `0.1:0.3:0.1` yields exactly
/// `0.1, 0.2, 0.3`. The range must lie in `(0, 1]` and expand to at most
/// [`MAX_SWEEP_POINTS`] thresholds.
pub fn parse_sweep(range: &str) -> Result<Vec<f64>, Error> {
    let invalid = || Error::InvalidParameters(format!("invalid sweep '{}'", range));
    let parts = range
        .split(':')
        .map(|part| part.trim().parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    let [start, end, step] = parts.as_slice() else {
        return Err(invalid());
    };
    let (start, end, step) = (*start, *end, *step);
    if step.is_nan() || step <= 0.0 || !start.is_finite() || !end.is_finite() || start > end {
        return Err(invalid());
    }
    if start <= 0.0 || end > 1.0 {
        return Err(Error::InvalidParameters(format!(
            "sweep '{}' leaves the threshold range (0, 1]",
            range
        )));
    }

    let steps = ((end - start) / step + 1e-9).floor();
    if !steps.is_finite() || steps >= MAX_SWEEP_POINTS as f64 {
        return Err(Error::InvalidParameters(format!(
            "sweep '{}' expands to more than {} thresholds",
            range, MAX_SWEEP_POINTS
        )));
    }
    let count = steps as usize + 1;
    Ok((0..count)
        .map(|k| ((start + k as f64 * step) * 1e9).round() / 1e9)
        .collect())
}
