use std::str::FromStr;

/// What to do when a value falls in a partition without a positive extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegeneratePolicy {
    /// Fail the transform with `ScalerError::DegenerateColumn`
    Error,
    /// Emit `0.0` for the affected element
    Zero,
    /// Emit the raw division result (`±inf` or `NaN`)
    NonFinite,
}

impl Default for DegeneratePolicy {
    fn default() -> Self {
        DegeneratePolicy::Error
    }
}

impl FromStr for DegeneratePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(DegeneratePolicy::Error),
            "zero" => Ok(DegeneratePolicy::Zero),
            "non-finite" | "nonfinite" => Ok(DegeneratePolicy::NonFinite),
            other => Err(format!("unknown degenerate policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalerConfig {
    pub on_degenerate: DegeneratePolicy,
}

impl ScalerConfig {
    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.on_degenerate = policy;
        self
    }
}
