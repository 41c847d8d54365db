//! Equation Text Format
//!
//! The host keeps global parameters and dimension bindings as plain equation
//! strings. Every piece of quoting, name matching and parsing of that text
//! lives in this module; the rest of the crate works with structured values.

use serde::{Deserialize, Serialize};

/// Classification of a single equation string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquationKind {
    /// `"Name"=Expression`
    ParameterDefinition {
        /// Parameter name without quotes
        name: String,
        /// Right-hand side, verbatim
        expression: String,
    },

    /// `"D1@Sketch1@Part1.SLDPRT" = "Name"`
    DimensionBinding {
        /// Dimension full name without quotes
        dimension: String,
        /// Bound parameter name without quotes
        parameter: String,
    },

    /// Anything this crate does not interpret; preserved untouched
    Other,
}

/// An equation at a given position in the document's equation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationEntry {
    /// Zero-based position, stable until the list is mutated
    pub index: usize,
    /// Raw equation text
    pub text: String,
    /// Parsed kind
    pub kind: EquationKind,
}

impl EquationEntry {
    /// Parse an equation at the given index
    pub fn parse(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = classify(&text);
        Self { index, text, kind }
    }
}

/// Wrap a name in double quotes as the host expects
pub fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

/// Serialize a parameter definition: `"Name"=Expression`
pub fn parameter_definition(name: &str, expression: &str) -> String {
    format!("{}={}", quoted(name), expression)
}

/// Serialize a dimension binding: `"Dimension" = "Parameter"`
pub fn dimension_binding(dimension: &str, parameter: &str) -> String {
    format!("{} = {}", quoted(dimension), quoted(parameter))
}

/// Whether the equation's left-hand side is the quoted name (prefix match)
pub fn defines_name(text: &str, name: &str) -> bool {
    !name.is_empty() && text.starts_with(&quoted(name))
}

/// Find the first equation defining `name`
pub fn find_definition<'a>(
    equations: impl IntoIterator<Item = &'a str>,
    name: &str,
) -> Option<usize> {
    equations
        .into_iter()
        .position(|text| defines_name(text, name))
}

/// Classify equation text
pub fn classify(text: &str) -> EquationKind {
    let Some((lhs, rhs)) = split_equation(text) else {
        return EquationKind::Other;
    };

    // Dimension names always carry an `@` qualifier; global variables never do
    if lhs.contains('@') {
        return match unquote(rhs) {
            Some(parameter) => EquationKind::DimensionBinding {
                dimension: lhs.to_string(),
                parameter: parameter.to_string(),
            },
            None => EquationKind::Other,
        };
    }

    EquationKind::ParameterDefinition {
        name: lhs.to_string(),
        expression: rhs.to_string(),
    }
}

/// Split `"lhs" = rhs` into the unquoted left side and trimmed right side
fn split_equation(text: &str) -> Option<(&str, &str)> {
    let rest = text.trim_start().strip_prefix('"')?;
    let close = rest.find('"')?;
    let lhs = &rest[..close];
    if lhs.is_empty() {
        return None;
    }
    let rhs = rest[close + 1..].trim_start().strip_prefix('=')?;
    Some((lhs, rhs.trim()))
}

/// Strip one pair of surrounding double quotes, rejecting anything else
pub fn unquote(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner)
}

/// Evaluate a length literal such as `150mm`, `0.2 m` or `3in` to metres.
///
/// A bare number is taken as millimetres, the default part unit system.
/// Returns `None` for anything that is not a single literal.
pub fn parse_length(expression: &str) -> Option<f64> {
    let expression = expression.trim();
    let split = expression
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e'))
        .unwrap_or(expression.len());
    let (number, unit) = expression.split_at(split);
    let value: f64 = number.trim().parse().ok()?;

    let metres = match unit.trim() {
        "" | "mm" => value / 1000.0,
        "cm" => value / 100.0,
        "m" => value,
        "in" => value * 0.0254,
        "ft" => value * 0.3048,
        _ => return None,
    };
    Some(metres)
}
