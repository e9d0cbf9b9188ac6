use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChartError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("limit needs exactly one of max or wingspan (max={max:?}, wingspan={wingspan:?})")]
    LimitMisconfigured {
        max: Option<f64>,
        wingspan: Option<f64>,
    },

    #[error("limit bound must be finite and non-negative: {value}")]
    InvalidLimit { value: f64 },

    #[error("hemicycle holds {positions} positions but {seats} seats were requested")]
    HemicycleOverCapacity { seats: usize, positions: usize },

    #[error("hemicycle has no positions")]
    EmptyHemicycle,
}

impl ChartError {
    #[must_use]
    pub fn over_capacity(seats: usize, positions: usize) -> Self {
        Self::HemicycleOverCapacity { seats, positions }
    }
}
