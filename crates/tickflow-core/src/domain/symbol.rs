use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Ticker used when originating a provider request.
///
/// Normalized to uppercase and restricted to the provider's ticker grammar:
/// ASCII letters and digits, `.` for class shares (`BRK.B`), and `-` for
/// dash-separated listings. Anything else would be URL-encoded into a request
/// the provider cannot answer, so it is rejected here instead.
///
/// Wire-level records carry the symbol as a plain string; this type is only
/// for the places where we control the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a ticker to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        match normalized
            .char_indices()
            .find(|(_, ch)| !is_ticker_char(*ch))
        {
            Some((index, ch)) => Err(ValidationError::SymbolInvalidChar { ch, index }),
            None => Ok(Self(normalized)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_ticker_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '.' || ch == '-'
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
