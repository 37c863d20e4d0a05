pub mod masked;
pub mod one_sided_scaler;
pub mod params;

pub use one_sided_scaler::OneSidedScaler;
pub use params::OneSidedParams;
