//! Value-label formatting for bars and swings.

/// Label shown in place of a value that cannot be computed yet.
pub const AWAITING_DATA: &str = "WAITING...";

/// How a value is rendered as a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueKind {
    /// Plain number.
    #[default]
    Number,
    /// Fraction rendered as a percentage (`0.25` -> `25%`).
    Percent,
}

/// Number format for value labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValueFormat {
    pub kind: ValueKind,
    pub decimals: usize,
    /// Always print a sign, for gain/loss values.
    pub signed: bool,
}

impl ValueFormat {
    #[must_use]
    pub const fn number(decimals: usize) -> Self {
        Self {
            kind: ValueKind::Number,
            decimals,
            signed: false,
        }
    }

    #[must_use]
    pub const fn percent(decimals: usize) -> Self {
        Self {
            kind: ValueKind::Percent,
            decimals,
            signed: false,
        }
    }

    #[must_use]
    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Format `value`. `NaN` becomes [`AWAITING_DATA`].
    #[must_use]
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return AWAITING_DATA.to_string();
        }
        let scaled = match self.kind {
            ValueKind::Number => value,
            ValueKind::Percent => value * 100.0,
        };
        let body = if self.signed {
            format!("{:+.*}", self.decimals, scaled)
        } else {
            format!("{:.*}", self.decimals, scaled)
        };
        match self.kind {
            ValueKind::Number => body,
            ValueKind::Percent => body + "%",
        }
    }
}
