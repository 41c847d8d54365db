//! User-facing status text
//!
//! Translates step outcomes and errors into the short messages sent through
//! the host's status channel. Nothing else in the crate formats user text.

use crate::binder::{BinderError, BindingOutcome};
use crate::ledger::{ConfigurationChange, LedgerError};
use crate::runner::{MacroError, StepReport};

/// Sent when a run begins
pub const MACRO_STARTED: &str = "Macro started successfully.";

/// Sent when a run reaches its end
pub const MACRO_COMPLETED: &str = "Macro completed successfully.";

/// Messages announcing a successful step
pub fn step_messages(step: &StepReport) -> Vec<String> {
    match step {
        StepReport::Parameter { .. } => Vec::new(),
        StepReport::Configuration { name, change } => {
            let verb = match change {
                ConfigurationChange::Created => "created",
                ConfigurationChange::Updated => "updated",
            };
            vec![format!("Configuration '{}' {}.", name, verb)]
        }
        StepReport::Rectangle(report) => [&report.width, &report.height]
            .into_iter()
            .filter_map(|outcome| match outcome {
                BindingOutcome::Bound {
                    dimension,
                    parameter,
                    ..
                } => Some(format!("{} = \"{}\"", dimension.name, parameter)),
                // Skipped bindings stay silent
                BindingOutcome::Skipped { .. } => None,
            })
            .collect(),
        StepReport::Failed { error, .. } => vec![error_message(error)],
    }
}

/// Message describing a failure
pub fn error_message(error: &MacroError) -> String {
    match error {
        MacroError::HostNotRunning(name) => {
            format!("Could not connect to the {} host application.", name)
        }
        MacroError::NoActiveDocument => "No active document.".into(),
        MacroError::Ledger(e) => ledger_message(e),
        MacroError::Binder(e) => binder_message(e),
    }
}

fn ledger_message(error: &LedgerError) -> String {
    match error {
        LedgerError::EmptyName => "A name is required.".into(),
        LedgerError::NoConfigurationManager => "No configuration manager available.".into(),
        LedgerError::Host(e) => format!("Host error: {}", e),
    }
}

fn binder_message(error: &BinderError) -> String {
    match error {
        BinderError::NotAPart(_) => "Active document must be a part.".into(),
        BinderError::NoPlaneSelected { candidates } => format!(
            "Could not select {}. Please select a plane manually and re-run the macro.",
            candidates.first().map_or("a sketch plane", String::as_str)
        ),
        BinderError::TooFewSegments { .. } => {
            "Could not get sketch segments for dimensioning.".into()
        }
        BinderError::SegmentNotFound(role) => {
            format!("Could not find a {} segment for dimensioning.", role)
        }
        BinderError::SegmentNotSelected { index, .. } => {
            format!("Could not select line{}", index + 1)
        }
        BinderError::Ledger(e) => ledger_message(e),
        BinderError::Host(e) => format!("Host error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{BindingReport, EdgeRole};
    use crate::host::Dimension;

    #[test]
    fn test_configuration_messages() {
        let created = StepReport::Configuration {
            name: "pla".into(),
            change: ConfigurationChange::Created,
        };
        assert_eq!(step_messages(&created), ["Configuration 'pla' created."]);
    }

    #[test]
    fn test_rectangle_messages_skip_missing_dimensions() {
        let report = BindingReport {
            plane: "Front Plane".into(),
            width: BindingOutcome::Skipped {
                parameter: "BaseLength".into(),
                segment_index: 0,
            },
            height: BindingOutcome::Bound {
                dimension: Dimension {
                    name: "D1@Sketch1".into(),
                    full_name: "D1@Sketch1@Part1.SLDPRT".into(),
                    value: 0.14,
                },
                parameter: "BaseHeight".into(),
                equation_index: 2,
            },
        };
        assert_eq!(
            step_messages(&StepReport::Rectangle(report)),
            ["D1@Sketch1 = \"BaseHeight\""]
        );
    }

    #[test]
    fn test_binder_messages() {
        let no_plane = MacroError::from(BinderError::NoPlaneSelected {
            candidates: vec!["Front Plane".into(), "Front".into()],
        });
        assert_eq!(
            error_message(&no_plane),
            "Could not select Front Plane. Please select a plane manually and re-run the macro."
        );

        let line = MacroError::from(BinderError::SegmentNotSelected {
            role: EdgeRole::Height,
            index: 1,
        });
        assert_eq!(error_message(&line), "Could not select line2");
    }
}
