//! Macro runner
//!
//! Runs a recipe against a host: parameters first, then the configuration,
//! then the constrained rectangle. Recoverable failures are reported to the
//! user and the run moves on to the next step; host errors end the run.
//! Changes applied before a failure are never rolled back.

use thiserror::Error;

use crate::binder::{BinderError, BindingReport};
use crate::host::HostApplication;
use crate::ledger::{ConfigurationChange, LedgerError, ParameterChange};
use crate::recipe::MacroRecipe;
use crate::report;
use crate::session::Session;

/// Errors surfaced by a macro run
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MacroError {
    #[error("Host application is not running: {0}")]
    HostNotRunning(String),

    #[error("No active document")]
    NoActiveDocument,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Binder(#[from] BinderError),
}

impl MacroError {
    /// Whether the run may continue with its next step
    pub fn is_recoverable(&self) -> bool {
        match self {
            MacroError::HostNotRunning(_) => false,
            MacroError::NoActiveDocument => true,
            MacroError::Ledger(e) => !matches!(e, LedgerError::Host(_)),
            MacroError::Binder(e) => !matches!(
                e,
                BinderError::Host(_) | BinderError::Ledger(LedgerError::Host(_))
            ),
        }
    }
}

/// What one step of a run did
#[derive(Debug, Clone, PartialEq)]
pub enum StepReport {
    /// A parameter was defined
    Parameter {
        name: String,
        change: ParameterChange,
    },
    /// A configuration was ensured
    Configuration {
        name: String,
        change: ConfigurationChange,
    },
    /// The rectangle was created and bound
    Rectangle(BindingReport),
    /// The step failed and was skipped
    Failed { step: String, error: MacroError },
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Steps in execution order
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Failed steps
    pub fn failures(&self) -> impl Iterator<Item = &MacroError> {
        self.steps.iter().filter_map(|s| match s {
            StepReport::Failed { error, .. } => Some(error),
            _ => None,
        })
    }

    /// Whether every step succeeded
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Runs a recipe against a host
#[derive(Debug, Clone, Default)]
pub struct MacroRunner {
    recipe: MacroRecipe,
}

impl MacroRunner {
    /// Create a runner for `recipe`
    pub fn new(recipe: MacroRecipe) -> Self {
        Self { recipe }
    }

    /// Run the recipe.
    ///
    /// Fails only when the host is not running or the host itself reports
    /// an error; every other failure is recorded in the report.
    pub fn run<H: HostApplication>(&self, host: &mut H) -> Result<RunReport, MacroError> {
        let mut session = Session::attach(host)?;
        session.notify(report::MACRO_STARTED);

        let mut run = RunReport::default();

        for parameter in &self.recipe.parameters {
            let result = session
                .ledger()
                .and_then(|mut ledger| {
                    ledger
                        .define_parameter(&parameter.name, &parameter.expression)
                        .map_err(MacroError::from)
                })
                .map(|change| StepReport::Parameter {
                    name: parameter.name.clone(),
                    change,
                });
            record(&mut session, &mut run, format!("parameter {}", parameter.name), result)?;
        }

        if let Some(configuration) = &self.recipe.configuration {
            let result = session
                .ledger()
                .and_then(|mut ledger| {
                    ledger
                        .ensure_configuration(
                            &configuration.name,
                            &configuration.comment,
                            &configuration.alternate_name,
                        )
                        .map_err(MacroError::from)
                })
                .map(|change| StepReport::Configuration {
                    name: configuration.name.clone(),
                    change,
                });
            record(
                &mut session,
                &mut run,
                format!("configuration {}", configuration.name),
                result,
            )?;
        }

        if let Some(rectangle) = &self.recipe.rectangle {
            let result = session
                .binder()
                .and_then(|mut binder| {
                    binder
                        .create_constrained_rectangle(rectangle)
                        .map_err(MacroError::from)
                })
                .map(StepReport::Rectangle);
            record(&mut session, &mut run, "rectangle".to_string(), result)?;
        }

        session.notify(report::MACRO_COMPLETED);
        Ok(run)
    }
}

/// Report a step to the user and keep it, or end the run on a fatal error
fn record<H: HostApplication>(
    session: &mut Session<'_, H>,
    run: &mut RunReport,
    step: String,
    result: Result<StepReport, MacroError>,
) -> Result<(), MacroError> {
    match result {
        Ok(entry) => {
            for message in report::step_messages(&entry) {
                session.notify(&message);
            }
            run.steps.push(entry);
            Ok(())
        }
        Err(error) if error.is_recoverable() => {
            tracing::warn!("Step {} failed: {}", step, error);
            session.notify(&report::error_message(&error));
            run.steps.push(StepReport::Failed { step, error });
            Ok(())
        }
        Err(error) => {
            tracing::error!("Step {} aborted the run: {}", step, error);
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Document, HostError, MemoryDocument, MemoryHost};

    #[test]
    fn test_recoverable_classification() {
        assert!(MacroError::NoActiveDocument.is_recoverable());
        assert!(MacroError::from(LedgerError::NoConfigurationManager).is_recoverable());
        assert!(
            MacroError::from(BinderError::NoPlaneSelected {
                candidates: Vec::new()
            })
            .is_recoverable()
        );
        assert!(!MacroError::HostNotRunning("memory".into()).is_recoverable());
        assert!(!MacroError::from(LedgerError::Host(HostError::NoActiveSketch)).is_recoverable());
        assert!(
            !MacroError::from(BinderError::Ledger(LedgerError::Host(
                HostError::NoActiveSketch
            )))
            .is_recoverable()
        );
    }

    #[test]
    fn test_run_without_document_reports_each_step() {
        let mut host = MemoryHost::new();
        let report = MacroRunner::default().run(&mut host).unwrap();

        assert_eq!(report.failures().count(), 4);
        assert_eq!(
            host.messages(),
            [
                "Macro started successfully.",
                "No active document.",
                "No active document.",
                "No active document.",
                "No active document.",
                "Macro completed successfully.",
            ]
        );
        assert!(!host.command_in_progress());
    }

    #[test]
    fn test_host_not_running_is_fatal() {
        let mut host = MemoryHost::not_running();
        assert_eq!(
            MacroRunner::default().run(&mut host),
            Err(MacroError::HostNotRunning("memory".into()))
        );
        assert!(host.messages().is_empty());
    }

    #[test]
    fn test_missing_configuration_manager_does_not_stop_run() {
        let mut doc = MemoryDocument::default();
        doc.faults_mut().no_configuration_manager = true;
        let mut host = MemoryHost::with_document(doc);

        let report = MacroRunner::default().run(&mut host).unwrap();

        assert_eq!(
            report.failures().collect::<Vec<_>>(),
            [&MacroError::Ledger(LedgerError::NoConfigurationManager)]
        );
        assert!(
            host.messages()
                .contains(&"No configuration manager available.".to_string())
        );
        assert_eq!(host.document().unwrap().equation_count(), 4);
    }
}
