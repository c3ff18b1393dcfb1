use serde::{Deserialize, Serialize};

/// Largest number of decimals a price is formatted with.
pub const MAX_DECIMALS: u32 = 6;

/// Where the currency symbol goes relative to the amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyPosition {
    Left,
    Right,
    LeftSpace,
    RightSpace,
}

/// Shop price formatting settings used by the `[precio-prod]` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
    pub decimal_separator: String,
    pub thousand_separator: String,
    pub position: CurrencyPosition,
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            symbol: "$".to_string(),
            decimals: 2,
            decimal_separator: ".".to_string(),
            thousand_separator: ",".to_string(),
            position: CurrencyPosition::Left,
        }
    }
}

impl Currency {
    pub fn new(symbol: impl Into<String>, decimals: u32) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: decimals.min(MAX_DECIMALS),
            ..Self::default()
        }
    }

    /// Formats an amount with separators and the currency symbol.
    pub fn format(&self, amount: f64) -> String {
        let decimals = self.decimals.min(MAX_DECIMALS) as usize;
        let fixed = format!("{:.*}", decimals, amount.abs());
        let (integer, fraction) = match fixed.split_once('.') {
            Some((integer, fraction)) => (integer.to_string(), Some(fraction.to_string())),
            None => (fixed.clone(), None),
        };

        let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
        for (index, digit) in integer.chars().enumerate() {
            if index > 0 && (integer.len() - index) % 3 == 0 {
                grouped.push_str(&self.thousand_separator);
            }
            grouped.push(digit);
        }

        let mut number = grouped;
        if let Some(fraction) = fraction {
            number.push_str(&self.decimal_separator);
            number.push_str(&fraction);
        }
        if amount < 0.0 {
            number.insert(0, '-');
        }

        match self.position {
            CurrencyPosition::Left => format!("{}{}", self.symbol, number),
            CurrencyPosition::Right => format!("{}{}", number, self.symbol),
            CurrencyPosition::LeftSpace => format!("{} {}", self.symbol, number),
            CurrencyPosition::RightSpace => format!("{} {}", number, self.symbol),
        }
    }
}
