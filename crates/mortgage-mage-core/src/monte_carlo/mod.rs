//! Stochastic driver: repeated pro-forma draws over sampled rent, tax,
//! appreciation and interest inputs.

pub mod driver;
pub mod sampler;

pub use driver::{
    run_monte_carlo, DrawInputs, DrawRecord, HistogramBin, McPercentiles, MetricSummary,
    ScenarioTemplate, SkippedDraw, StochasticResult,
};
pub use sampler::{
    DistributionSampler, EmpiricalRateSampler, McDistribution, Sampler, Samplers,
    StochasticInputs,
};
