//! Platform definitions.
//!
//! A platform captures the CLI conventions of one family of devices: what
//! its prompt looks like, what it prints when a command is rejected, and how
//! raw output is cleaned up.

mod definition;
pub mod vendors;

pub use definition::PlatformDefinition;

/// Strip the echoed command line and the trailing prompt line.
pub fn normalize_output(raw: &str, command: &str) -> String {
    let output = raw.trim_start_matches(['\r', '\n']);

    // The echo is the first line when it carries the command
    let output = match output.split_once('\n') {
        Some((first, rest)) if !command.is_empty() && first.trim_end().ends_with(command) => rest,
        None if output.trim_end().ends_with(command) && !command.is_empty() => "",
        _ => output,
    };

    // Strip trailing prompt (last line)
    match output.rfind('\n') {
        Some(pos) => output[..pos].trim_end_matches('\r').to_string(),
        None => String::new(),
    }
}
