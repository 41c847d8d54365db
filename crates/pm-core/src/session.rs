//! Macro session
//!
//! Explicit context for one run against a host. The session owns the
//! host's advisory "command in progress" flag for its lifetime and restores
//! the previous value when dropped.

use crate::binder::SketchBinder;
use crate::host::HostApplication;
use crate::ledger::Ledger;
use crate::runner::MacroError;

/// A connection to a running host for the duration of one macro run
pub struct Session<'h, H: HostApplication> {
    host: &'h mut H,
    previous_command_state: bool,
}

impl<'h, H: HostApplication> Session<'h, H> {
    /// Attach to a running host
    pub fn attach(host: &'h mut H) -> Result<Self, MacroError> {
        if !host.is_running() {
            return Err(MacroError::HostNotRunning(host.name().to_string()));
        }

        let previous_command_state = host.command_in_progress();
        host.set_command_in_progress(true);
        tracing::debug!("Attached to host {}", host.name());

        Ok(Self {
            host,
            previous_command_state,
        })
    }

    /// Send a status line to the user
    pub fn notify(&mut self, message: &str) {
        self.host.send_message(message);
    }

    /// The active document
    pub fn document(&mut self) -> Result<&mut H::Doc, MacroError> {
        self.host
            .active_document()
            .ok_or(MacroError::NoActiveDocument)
    }

    /// Ledger over the active document
    pub fn ledger(&mut self) -> Result<Ledger<'_, H::Doc>, MacroError> {
        self.document().map(Ledger::new)
    }

    /// Sketch binder over the active document
    pub fn binder(&mut self) -> Result<SketchBinder<'_, H::Doc>, MacroError> {
        self.document().map(SketchBinder::new)
    }
}

impl<H: HostApplication> Drop for Session<'_, H> {
    fn drop(&mut self) {
        self.host
            .set_command_in_progress(self.previous_command_state);
    }
}
