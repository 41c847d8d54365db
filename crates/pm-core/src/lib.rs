//! Parametric Macro Core
//!
//! This crate provides:
//! - An automation seam (`HostApplication` / `Document`) over a CAD host
//! - An in-memory host for tests and offline runs
//! - The textual equation format and its name matching
//! - A parametric ledger with create-or-update semantics
//! - A sketch binder that ties rectangle dimensions to parameters
//! - The macro runner and its user-facing status reporting

pub mod binder;
pub mod equation;
pub mod host;
pub mod ledger;
pub mod recipe;
pub mod report;
pub mod runner;
pub mod session;

// Re-exports for convenience
pub use binder::{
    BinderError, BinderResult, BindingOutcome, BindingReport, EdgeRole, RectangleSpec,
    SegmentOrder, SketchBinder,
};
pub use equation::{EquationEntry, EquationKind};
pub use host::{
    ConfigOption, Configuration, Dimension, Document, DocumentError, DocumentKind, EntityKind,
    Faults, HostApplication, HostError, HostResult, MemoryDocument, MemoryHost, SketchSegment,
};
pub use ledger::{
    Binding, ConfigurationChange, Ledger, LedgerError, LedgerResult, Parameter, ParameterChange,
};
pub use recipe::{ConfigurationRecipe, MacroRecipe, RecipeError};
pub use runner::{MacroError, MacroRunner, RunReport, StepReport};
pub use session::Session;
