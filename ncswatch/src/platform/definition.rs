//! Platform definition for vendor-specific configurations.

use std::fmt;

use regex::bytes::Regex;

/// Everything the session needs to know about a device's CLI.
#[derive(Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_iosxr").
    pub name: String,

    /// Pattern matching the exec-mode prompt at the end of output.
    pub exec_prompt: Regex,

    /// Patterns that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when connection is established.
    pub on_open_commands: Vec<String>,

    /// Command that leaves a nested execution context.
    pub context_exit_command: String,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>, exec_prompt: Regex) -> Self {
        Self {
            name: name.into(),
            exec_prompt,
            failed_when_contains: vec![],
            on_open_commands: vec![],
            context_exit_command: "exit".to_string(),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set the command that leaves a nested context.
    pub fn with_context_exit_command(mut self, command: impl Into<String>) -> Self {
        self.context_exit_command = command.into();
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// First failure marker present in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|marker| output.contains(marker.as_str()))
            .map(String::as_str)
    }
}

impl fmt::Debug for PlatformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDefinition")
            .field("name", &self.name)
            .field("exec_prompt", &self.exec_prompt.as_str())
            .field("failed_when_contains", &self.failed_when_contains)
            .field("on_open_commands", &self.on_open_commands)
            .field("context_exit_command", &self.context_exit_command)
            .field("terminal_width", &self.terminal_width)
            .field("terminal_height", &self.terminal_height)
            .finish()
    }
}
