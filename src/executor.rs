//! What happens when the user activates a result.
//!
//! Orbit never launches processes or touches the clipboard itself. An
//! [`ExecutionAction`] is pure data handed to whichever frontend owns the
//! window, which performs the side effect.

/// The action to perform when a result is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionAction {
    /// Launch an application by its exec command
    LaunchApp { exec: String, name: String },

    /// Run a shell command
    RunShellCommand { command: String },

    /// Open a URL in the default browser
    OpenUrl { url: String },

    /// Copy text to clipboard with notification
    CopyToClipboard {
        content: String,
        notification: String,
    },

    /// Open a file or directory
    OpenFile { path: String },

    /// Replace the input text (e.g. complete a trigger)
    SetInput { text: String },
}

impl ExecutionAction {
    /// Whether the frontend should hide its window after executing this.
    pub fn closes_window(&self) -> bool {
        !matches!(self, ExecutionAction::SetInput { .. })
    }
}
