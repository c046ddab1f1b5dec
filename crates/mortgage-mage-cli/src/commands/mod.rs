pub mod analyze;
pub mod financing;
pub mod monte_carlo;
pub mod rates;
pub mod simulate;
