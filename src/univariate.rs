use serde::{Deserialize, Serialize};

use crate::error::{PhaseSpaceError, Result};
use crate::random::{check_random_number, RandomSource};

/// The analytic or tabulated form of a univariate distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnivariateDistributionForm {
    Delta,
    Uniform,
    Power,
    Exponential,
    Discrete,
    Histogram,
}

/// A point mass at `location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaDistribution {
    pub location: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct UniformData {
    min: f64,
    max: f64,
    height: f64,
}

/// Constant density `height` over `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UniformData")]
pub struct UniformDistribution {
    pub min: f64,
    pub max: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PowerData {
    exponent: f64,
    constant: f64,
    min: f64,
    max: f64,
}

/// Density proportional to `x^exponent` over `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PowerData")]
pub struct PowerDistribution {
    pub exponent: f64,
    pub constant: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ExponentialData {
    constant: f64,
    rate: f64,
    min: f64,
    max: Option<f64>,
}

/// Density proportional to `exp(-rate x)` over `[min, max]`, where a missing
/// `max` means the distribution is unbounded above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExponentialData")]
pub struct ExponentialDistribution {
    pub constant: f64,
    pub rate: f64,
    pub min: f64,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiscreteData {
    values: Vec<f64>,
    probabilities: Vec<f64>,
}

/// Point masses at strictly increasing `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DiscreteData", into = "DiscreteData")]
pub struct DiscreteDistribution {
    values: Vec<f64>,
    probabilities: Vec<f64>,
    cdf: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistogramData {
    bin_boundaries: Vec<f64>,
    bin_values: Vec<f64>,
}

/// Piecewise-constant density over strictly increasing bin boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramData", into = "HistogramData")]
pub struct HistogramDistribution {
    bin_boundaries: Vec<f64>,
    bin_values: Vec<f64>,
    cdf: Vec<f64>,
    area: f64,
}

/// Univariate distributions available to independent dimensions and to the
/// bins of bivariate distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UnivariateDistribution {
    Delta(DeltaDistribution),
    Uniform(UniformDistribution),
    Power(PowerDistribution),
    Exponential(ExponentialDistribution),
    Discrete(DiscreteDistribution),
    Histogram(HistogramDistribution),
}

fn invalid(message: impl Into<String>) -> PhaseSpaceError {
    PhaseSpaceError::InvalidDistribution(message.into())
}

impl DeltaDistribution {
    fn evaluate(&self, x: f64) -> f64 {
        if x == self.location {
            self.multiplier
        } else {
            0.0
        }
    }

    fn pdf(&self, x: f64) -> f64 {
        if x == self.location {
            1.0
        } else {
            0.0
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        if x < self.location {
            0.0
        } else {
            1.0
        }
    }
}

impl UniformDistribution {
    fn evaluate(&self, x: f64) -> f64 {
        if x >= self.min && x <= self.max {
            self.height
        } else {
            0.0
        }
    }

    fn pdf(&self, x: f64) -> f64 {
        if x >= self.min && x <= self.max {
            1.0 / (self.max - self.min)
        } else {
            0.0
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        if x < self.min {
            0.0
        } else if x > self.max {
            1.0
        } else {
            (x - self.min) / (self.max - self.min)
        }
    }

    fn invert(&self, u: f64) -> f64 {
        self.min + u * (self.max - self.min)
    }
}

impl PowerDistribution {
    fn norm(&self) -> f64 {
        let n1 = self.exponent + 1.0;
        self.max.powf(n1) - self.min.powf(n1)
    }

    fn evaluate(&self, x: f64) -> f64 {
        if x >= self.min && x <= self.max {
            self.constant * x.powf(self.exponent)
        } else {
            0.0
        }
    }

    fn pdf(&self, x: f64) -> f64 {
        if x >= self.min && x <= self.max {
            (self.exponent + 1.0) * x.powf(self.exponent) / self.norm()
        } else {
            0.0
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        if x < self.min {
            0.0
        } else if x > self.max {
            1.0
        } else {
            let n1 = self.exponent + 1.0;
            (x.powf(n1) - self.min.powf(n1)) / self.norm()
        }
    }

    fn invert(&self, u: f64) -> f64 {
        let n1 = self.exponent + 1.0;
        (self.min.powf(n1) + u * self.norm()).powf(1.0 / n1)
    }
}

impl ExponentialDistribution {
    fn upper(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }

    // exp(-rate min) - exp(-rate max)
    fn norm(&self) -> f64 {
        let tail = match self.max {
            Some(max) => (-self.rate * max).exp(),
            None => 0.0,
        };
        (-self.rate * self.min).exp() - tail
    }

    fn evaluate(&self, x: f64) -> f64 {
        if x >= self.min && x <= self.upper() {
            self.constant * (-self.rate * x).exp()
        } else {
            0.0
        }
    }

    fn pdf(&self, x: f64) -> f64 {
        if x >= self.min && x <= self.upper() {
            self.rate * (-self.rate * x).exp() / self.norm()
        } else {
            0.0
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        if x < self.min {
            0.0
        } else if x >= self.upper() {
            1.0
        } else {
            ((-self.rate * self.min).exp() - (-self.rate * x).exp()) / self.norm()
        }
    }

    fn invert(&self, u: f64) -> f64 {
        let x = -((-self.rate * self.min).exp() - u * self.norm()).ln() / self.rate;
        x.clamp(self.min, self.upper())
    }
}

impl TryFrom<UniformData> for UniformDistribution {
    type Error = PhaseSpaceError;

    fn try_from(data: UniformData) -> Result<Self> {
        if !(data.min < data.max) || !data.min.is_finite() || !data.max.is_finite() {
            return Err(invalid(format!(
                "uniform distribution bounds [{}, {}] are invalid",
                data.min, data.max
            )));
        }
        if !(data.height > 0.0) {
            return Err(invalid("uniform distribution height must be positive"));
        }
        Ok(Self {
            min: data.min,
            max: data.max,
            height: data.height,
        })
    }
}

impl TryFrom<PowerData> for PowerDistribution {
    type Error = PhaseSpaceError;

    fn try_from(data: PowerData) -> Result<Self> {
        if !(data.exponent >= 0.0) || !data.exponent.is_finite() {
            return Err(invalid("power distribution exponent must be non-negative"));
        }
        if !(data.min >= 0.0) || !(data.min < data.max) || !data.max.is_finite() {
            return Err(invalid(format!(
                "power distribution bounds [{}, {}] are invalid",
                data.min, data.max
            )));
        }
        if !(data.constant > 0.0) {
            return Err(invalid("power distribution constant must be positive"));
        }
        Ok(Self {
            exponent: data.exponent,
            constant: data.constant,
            min: data.min,
            max: data.max,
        })
    }
}

impl TryFrom<ExponentialData> for ExponentialDistribution {
    type Error = PhaseSpaceError;

    fn try_from(data: ExponentialData) -> Result<Self> {
        if !(data.rate > 0.0) || !data.rate.is_finite() {
            return Err(invalid("exponential distribution rate must be positive"));
        }
        if !(data.constant > 0.0) {
            return Err(invalid("exponential distribution constant must be positive"));
        }
        let min = data.min;
        if !min.is_finite() || data.max.map_or(false, |max| !(max > min) || !max.is_finite()) {
            return Err(invalid("exponential distribution bounds are invalid"));
        }
        Ok(Self {
            constant: data.constant,
            rate: data.rate,
            min,
            max: data.max,
        })
    }
}

impl TryFrom<DiscreteData> for DiscreteDistribution {
    type Error = PhaseSpaceError;

    fn try_from(data: DiscreteData) -> Result<Self> {
        if data.values.is_empty() || data.values.len() != data.probabilities.len() {
            return Err(invalid(
                "discrete distribution needs one probability per value",
            ));
        }
        if data.values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("discrete values must be strictly increasing"));
        }
        if data.probabilities.iter().any(|&p| !(p >= 0.0)) {
            return Err(invalid("discrete probabilities must be non-negative"));
        }
        let total: f64 = data.probabilities.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(invalid("discrete probabilities must have a positive sum"));
        }

        let mut running = 0.0;
        let mut cdf: Vec<f64> = data
            .probabilities
            .iter()
            .map(|p| {
                running += p;
                running / total
            })
            .collect();
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }

        Ok(Self {
            values: data.values,
            probabilities: data.probabilities,
            cdf,
        })
    }
}

impl From<DiscreteDistribution> for DiscreteData {
    fn from(dist: DiscreteDistribution) -> Self {
        Self {
            values: dist.values,
            probabilities: dist.probabilities,
        }
    }
}

impl DiscreteDistribution {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    fn position(&self, x: f64) -> Option<usize> {
        self.values.iter().position(|&v| v == x)
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.position(x).map_or(0.0, |i| self.probabilities[i])
    }

    fn pdf(&self, x: f64) -> f64 {
        match self.position(x) {
            Some(0) => self.cdf[0],
            Some(i) => self.cdf[i] - self.cdf[i - 1],
            None => 0.0,
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        let count = self.values.partition_point(|&v| v <= x);
        if count == 0 {
            0.0
        } else {
            self.cdf[count - 1]
        }
    }

    fn invert(&self, u: f64) -> (f64, usize) {
        let index = self
            .cdf
            .partition_point(|&c| c <= u)
            .min(self.values.len() - 1);
        (self.values[index], index)
    }
}

impl TryFrom<HistogramData> for HistogramDistribution {
    type Error = PhaseSpaceError;

    fn try_from(data: HistogramData) -> Result<Self> {
        if data.bin_boundaries.len() < 2
            || data.bin_boundaries.len() != data.bin_values.len() + 1
        {
            return Err(invalid(
                "histogram distribution needs one more boundary than bin values",
            ));
        }
        if data.bin_boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("histogram boundaries must be strictly increasing"));
        }
        if data.bin_values.iter().any(|&v| !(v >= 0.0)) {
            return Err(invalid("histogram bin values must be non-negative"));
        }

        let mut cdf = Vec::with_capacity(data.bin_boundaries.len());
        cdf.push(0.0);
        let mut area = 0.0;
        for (i, value) in data.bin_values.iter().enumerate() {
            area += value * (data.bin_boundaries[i + 1] - data.bin_boundaries[i]);
            cdf.push(area);
        }
        if !(area > 0.0) || !area.is_finite() {
            return Err(invalid("histogram must have a positive area"));
        }
        for c in cdf.iter_mut() {
            *c /= area;
        }

        Ok(Self {
            bin_boundaries: data.bin_boundaries,
            bin_values: data.bin_values,
            cdf,
            area,
        })
    }
}

impl From<HistogramDistribution> for HistogramData {
    fn from(dist: HistogramDistribution) -> Self {
        Self {
            bin_boundaries: dist.bin_boundaries,
            bin_values: dist.bin_values,
        }
    }
}

impl HistogramDistribution {
    pub fn bin_boundaries(&self) -> &[f64] {
        &self.bin_boundaries
    }

    pub fn bin_values(&self) -> &[f64] {
        &self.bin_values
    }

    fn lower(&self) -> f64 {
        self.bin_boundaries[0]
    }

    fn upper(&self) -> f64 {
        self.bin_boundaries[self.bin_boundaries.len() - 1]
    }

    // The upper boundary belongs to the last bin. NaN is in no bin.
    fn bin(&self, x: f64) -> Option<usize> {
        if !(x >= self.lower() && x <= self.upper()) {
            None
        } else {
            let index = self.bin_boundaries.partition_point(|&b| b <= x) - 1;
            Some(index.min(self.bin_values.len() - 1))
        }
    }

    fn evaluate(&self, x: f64) -> f64 {
        self.bin(x).map_or(0.0, |i| self.bin_values[i])
    }

    fn pdf(&self, x: f64) -> f64 {
        self.evaluate(x) / self.area
    }

    fn cdf(&self, x: f64) -> f64 {
        match self.bin(x) {
            None if x > self.upper() => 1.0,
            None => 0.0,
            Some(i) => {
                self.cdf[i] + (x - self.bin_boundaries[i]) * self.bin_values[i] / self.area
            }
        }
    }

    fn invert(&self, u: f64) -> (f64, usize) {
        let index = (self.cdf.partition_point(|&c| c <= u) - 1).min(self.bin_values.len() - 1);
        let value = self.bin_values[index];
        if value <= 0.0 {
            return (self.bin_boundaries[index], index);
        }
        let x = self.bin_boundaries[index] + (u - self.cdf[index]) * self.area / value;
        (x.min(self.bin_boundaries[index + 1]), index)
    }
}

impl UnivariateDistribution {
    /// Point mass with unit multiplier.
    pub fn delta(location: f64) -> Self {
        Self::delta_with_multiplier(location, 1.0)
    }

    pub fn delta_with_multiplier(location: f64, multiplier: f64) -> Self {
        UnivariateDistribution::Delta(DeltaDistribution {
            location,
            multiplier,
        })
    }

    pub fn uniform(min: f64, max: f64, height: f64) -> Result<Self> {
        UniformDistribution::try_from(UniformData { min, max, height })
            .map(UnivariateDistribution::Uniform)
    }

    pub fn power(exponent: f64, constant: f64, min: f64, max: f64) -> Result<Self> {
        PowerDistribution::try_from(PowerData {
            exponent,
            constant,
            min,
            max,
        })
        .map(UnivariateDistribution::Power)
    }

    pub fn exponential(constant: f64, rate: f64, min: f64, max: Option<f64>) -> Result<Self> {
        ExponentialDistribution::try_from(ExponentialData {
            constant,
            rate,
            min,
            max,
        })
        .map(UnivariateDistribution::Exponential)
    }

    pub fn discrete(values: Vec<f64>, probabilities: Vec<f64>) -> Result<Self> {
        DiscreteDistribution::try_from(DiscreteData {
            values,
            probabilities,
        })
        .map(UnivariateDistribution::Discrete)
    }

    pub fn histogram(bin_boundaries: Vec<f64>, bin_values: Vec<f64>) -> Result<Self> {
        HistogramDistribution::try_from(HistogramData {
            bin_boundaries,
            bin_values,
        })
        .map(UnivariateDistribution::Histogram)
    }

    pub fn form(&self) -> UnivariateDistributionForm {
        match self {
            UnivariateDistribution::Delta(_) => UnivariateDistributionForm::Delta,
            UnivariateDistribution::Uniform(_) => UnivariateDistributionForm::Uniform,
            UnivariateDistribution::Power(_) => UnivariateDistributionForm::Power,
            UnivariateDistribution::Exponential(_) => UnivariateDistributionForm::Exponential,
            UnivariateDistribution::Discrete(_) => UnivariateDistributionForm::Discrete,
            UnivariateDistribution::Histogram(_) => UnivariateDistributionForm::Histogram,
        }
    }

    pub fn has_form(&self, form: UnivariateDistributionForm) -> bool {
        self.form() == form
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            UnivariateDistribution::Delta(_) => "Delta Distribution",
            UnivariateDistribution::Uniform(_) => "Uniform Distribution",
            UnivariateDistribution::Power(_) => "Power Distribution",
            UnivariateDistribution::Exponential(_) => "Exponential Distribution",
            UnivariateDistribution::Discrete(_) => "Discrete Distribution",
            UnivariateDistribution::Histogram(_) => "Histogram Distribution",
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            UnivariateDistribution::Uniform(_)
                | UnivariateDistribution::Power(_)
                | UnivariateDistribution::Exponential(_)
                | UnivariateDistribution::Histogram(_)
        )
    }

    /// Tabular distributions support CDF evaluation and bin-indexed sampling.
    pub fn is_tabular(&self) -> bool {
        matches!(
            self,
            UnivariateDistribution::Delta(_)
                | UnivariateDistribution::Uniform(_)
                | UnivariateDistribution::Discrete(_)
                | UnivariateDistribution::Histogram(_)
        )
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, UnivariateDistribution::Uniform(_))
    }

    pub fn lower_bound(&self) -> f64 {
        match self {
            UnivariateDistribution::Delta(d) => d.location,
            UnivariateDistribution::Uniform(d) => d.min,
            UnivariateDistribution::Power(d) => d.min,
            UnivariateDistribution::Exponential(d) => d.min,
            UnivariateDistribution::Discrete(d) => d.values[0],
            UnivariateDistribution::Histogram(d) => d.lower(),
        }
    }

    pub fn upper_bound(&self) -> f64 {
        match self {
            UnivariateDistribution::Delta(d) => d.location,
            UnivariateDistribution::Uniform(d) => d.max,
            UnivariateDistribution::Power(d) => d.max,
            UnivariateDistribution::Exponential(d) => d.upper(),
            UnivariateDistribution::Discrete(d) => d.values[d.values.len() - 1],
            UnivariateDistribution::Histogram(d) => d.upper(),
        }
    }

    /// Evaluate the unnormalized distribution.
    pub fn evaluate(&self, x: f64) -> f64 {
        match self {
            UnivariateDistribution::Delta(d) => d.evaluate(x),
            UnivariateDistribution::Uniform(d) => d.evaluate(x),
            UnivariateDistribution::Power(d) => d.evaluate(x),
            UnivariateDistribution::Exponential(d) => d.evaluate(x),
            UnivariateDistribution::Discrete(d) => d.evaluate(x),
            UnivariateDistribution::Histogram(d) => d.evaluate(x),
        }
    }

    pub fn evaluate_pdf(&self, x: f64) -> f64 {
        match self {
            UnivariateDistribution::Delta(d) => d.pdf(x),
            UnivariateDistribution::Uniform(d) => d.pdf(x),
            UnivariateDistribution::Power(d) => d.pdf(x),
            UnivariateDistribution::Exponential(d) => d.pdf(x),
            UnivariateDistribution::Discrete(d) => d.pdf(x),
            UnivariateDistribution::Histogram(d) => d.pdf(x),
        }
    }

    pub fn evaluate_cdf(&self, x: f64) -> Result<f64> {
        if !self.is_tabular() {
            return Err(PhaseSpaceError::UnsupportedOperation {
                operation: "CDF evaluation",
                distribution: self.type_name().to_string(),
            });
        }
        Ok(self.cdf(x))
    }

    fn cdf(&self, x: f64) -> f64 {
        match self {
            UnivariateDistribution::Delta(d) => d.cdf(x),
            UnivariateDistribution::Uniform(d) => d.cdf(x),
            UnivariateDistribution::Power(d) => d.cdf(x),
            UnivariateDistribution::Exponential(d) => d.cdf(x),
            UnivariateDistribution::Discrete(d) => d.cdf(x),
            UnivariateDistribution::Histogram(d) => d.cdf(x),
        }
    }

    // Inverse CDF, also returning the bin the value came from
    fn invert(&self, u: f64) -> (f64, usize) {
        match self {
            UnivariateDistribution::Delta(d) => (d.location, 0),
            UnivariateDistribution::Uniform(d) => (d.invert(u), 0),
            UnivariateDistribution::Power(d) => (d.invert(u), 0),
            UnivariateDistribution::Exponential(d) => (d.invert(u), 0),
            UnivariateDistribution::Discrete(d) => d.invert(u),
            UnivariateDistribution::Histogram(d) => d.invert(u),
        }
    }

    fn draw<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<(f64, usize)> {
        match self {
            // A point mass never needs a random number
            UnivariateDistribution::Delta(d) => Ok((d.location, 0)),
            _ => {
                let u = rng.random_number()?;
                Ok(self.invert(u))
            }
        }
    }

    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        self.draw(rng).map(|(x, _)| x)
    }

    /// Sample and add the number of trials it took to `trials`.
    pub fn sample_and_record_trials<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        trials: &mut u64,
    ) -> Result<f64> {
        *trials += 1;
        self.sample(rng)
    }

    /// Sample and report the index of the bin the sample came from.
    pub fn sample_and_record_bin_index<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(f64, usize)> {
        if !self.is_tabular() {
            return Err(PhaseSpaceError::UnsupportedOperation {
                operation: "bin-indexed sampling",
                distribution: self.type_name().to_string(),
            });
        }
        self.draw(rng)
    }

    pub fn sample_with_random_number(&self, random_number: f64) -> Result<f64> {
        check_random_number(random_number)?;
        Ok(self.invert(random_number).0)
    }

    pub fn sample_in_subrange<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        max_indep_var: f64,
    ) -> Result<f64> {
        self.check_subrange(max_indep_var)?;
        match self {
            UnivariateDistribution::Delta(d) => Ok(d.location),
            _ => {
                let u = rng.random_number()?;
                Ok(self.invert_in_subrange(u, max_indep_var))
            }
        }
    }

    pub fn sample_with_random_number_in_subrange(
        &self,
        random_number: f64,
        max_indep_var: f64,
    ) -> Result<f64> {
        check_random_number(random_number)?;
        self.check_subrange(max_indep_var)?;
        Ok(self.invert_in_subrange(random_number, max_indep_var))
    }

    fn check_subrange(&self, max_indep_var: f64) -> Result<()> {
        let lower = self.lower_bound();
        if max_indep_var > lower {
            Ok(())
        } else {
            Err(PhaseSpaceError::InvalidSubrange {
                max: max_indep_var,
                lower,
            })
        }
    }

    fn invert_in_subrange(&self, u: f64, max_indep_var: f64) -> f64 {
        let max = max_indep_var.min(self.upper_bound());
        match self {
            UnivariateDistribution::Uniform(d) => d.min + u * (max - d.min),
            _ => self.invert(u * self.cdf(max)).0.min(max),
        }
    }
}
