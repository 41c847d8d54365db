//! Parametric Ledger
//!
//! Structured view over a document's equations and configurations, with
//! create-or-update operations keyed by name. Re-running the same upserts
//! against a document never duplicates a parameter or configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::equation::{self, EquationEntry, EquationKind};
use crate::host::{ConfigOption, Configuration, Document, HostError};

/// Ledger-related errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("No configuration manager available")]
    NoConfigurationManager,

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A named global parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Unique name
    pub name: String,
    /// Value or formula, e.g. `150mm` or `"Width"*2`
    pub expression: String,
}

impl Parameter {
    /// Create a parameter
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// A dimension bound to a parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Position in the equation list
    pub index: usize,
    /// Dimension full name
    pub dimension: String,
    /// Parameter name
    pub parameter: String,
}

/// What `define_parameter` did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterChange {
    /// Appended a new equation
    Created { index: usize },
    /// Overwrote an existing equation in place
    Updated { index: usize, previous: String },
}

/// What `ensure_configuration` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationChange {
    /// Created with `DontActivate`
    Created,
    /// Comment and alternate name overwritten
    Updated,
}

/// Parametric ledger over a borrowed document
pub struct Ledger<'d, D: Document + ?Sized> {
    document: &'d mut D,
}

impl<'d, D: Document + ?Sized> Ledger<'d, D> {
    /// Wrap a document
    pub fn new(document: &'d mut D) -> Self {
        Self { document }
    }

    /// Raw equation texts in order
    fn equation_texts(&self) -> LedgerResult<Vec<String>> {
        (0..self.document.equation_count())
            .map(|i| self.document.equation(i).map_err(LedgerError::from))
            .collect()
    }

    // ============== Read Side ==============

    /// All equations, classified
    pub fn entries(&self) -> LedgerResult<Vec<EquationEntry>> {
        Ok(self
            .equation_texts()?
            .into_iter()
            .enumerate()
            .map(|(index, text)| EquationEntry::parse(index, text))
            .collect())
    }

    /// All parameter definitions in equation order
    pub fn parameters(&self) -> LedgerResult<Vec<Parameter>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter_map(|entry| match entry.kind {
                EquationKind::ParameterDefinition { name, expression } => {
                    Some(Parameter { name, expression })
                }
                _ => None,
            })
            .collect())
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> LedgerResult<Option<Parameter>> {
        Ok(self.parameters()?.into_iter().find(|p| p.name == name))
    }

    /// All dimension bindings in equation order
    pub fn bindings(&self) -> LedgerResult<Vec<Binding>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter_map(|entry| match entry.kind {
                EquationKind::DimensionBinding {
                    dimension,
                    parameter,
                } => Some(Binding {
                    index: entry.index,
                    dimension,
                    parameter,
                }),
                _ => None,
            })
            .collect())
    }

    // ============== Upserts ==============

    /// Create or update a global parameter, then rebuild the document.
    ///
    /// An existing definition is overwritten at its index; otherwise the new
    /// definition is appended.
    pub fn define_parameter(
        &mut self,
        name: &str,
        expression: &str,
    ) -> LedgerResult<ParameterChange> {
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }

        let texts = self.equation_texts()?;
        let text = equation::parameter_definition(name, expression);

        let change = match equation::find_definition(texts.iter().map(String::as_str), name) {
            Some(index) => {
                self.document.set_equation(index, &text)?;
                ParameterChange::Updated {
                    index,
                    previous: texts[index].clone(),
                }
            }
            None => {
                let index = self.document.add_equation(None, &text)?;
                ParameterChange::Created { index }
            }
        };

        tracing::info!("Parameter {} = {} ({:?})", name, expression, change);
        self.document.rebuild()?;
        Ok(change)
    }

    /// Create a configuration without activating it, or update the comment
    /// and alternate name of an existing one.
    pub fn ensure_configuration(
        &mut self,
        name: &str,
        comment: &str,
        alternate_name: &str,
    ) -> LedgerResult<ConfigurationChange> {
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        if !self.document.has_configuration_manager() {
            return Err(LedgerError::NoConfigurationManager);
        }

        let change = if self.document.configuration(name).is_some() {
            self.document
                .set_configuration_details(name, comment, alternate_name)?;
            ConfigurationChange::Updated
        } else {
            self.document.add_configuration(
                Configuration::new(name)
                    .with_comment(comment)
                    .with_alternate_name(alternate_name)
                    .with_option(ConfigOption::DontActivate),
            )?;
            ConfigurationChange::Created
        };

        tracing::info!("Configuration {} {:?}", name, change);
        Ok(change)
    }

    /// Append a binding equation tying `dimension` to `parameter`
    pub fn add_binding(&mut self, dimension: &str, parameter: &str) -> LedgerResult<usize> {
        if dimension.is_empty() || parameter.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        let text = equation::dimension_binding(dimension, parameter);
        let index = self.document.add_equation(None, &text)?;
        tracing::debug!("Bound {} to {} at {}", dimension, parameter, index);
        Ok(index)
    }
}
