//! Operation discriminants carried by arithmetic requests.

use crate::domain::error::EndpointError;
use std::fmt;
use std::str::FromStr;

/// One of the four arithmetic operations a request can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// All operations in declaration order.
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    /// Canonical lowercase name, also used as the metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = EndpointError;

    /// Parse a discriminant, ignoring ASCII case. Only exact names match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EndpointError::InvalidRequestType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("add".parse::<Operation>().unwrap(), Operation::Add);
        assert_eq!("ADD".parse::<Operation>().unwrap(), Operation::Add);
        assert_eq!("SubTract".parse::<Operation>().unwrap(), Operation::Subtract);
        assert_eq!("multiply".parse::<Operation>().unwrap(), Operation::Multiply);
        assert_eq!("Divide".parse::<Operation>().unwrap(), Operation::Divide);
    }

    #[test]
    fn test_parse_rejects_unknown_and_partial() {
        for input in ["power", "", "ad", "adds", " add", "substract", "div"] {
            assert_eq!(
                input.parse::<Operation>(),
                Err(EndpointError::InvalidRequestType(input.to_string())),
                "{:?} should not parse",
                input
            );
        }
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for op in Operation::ALL {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
    }
}
