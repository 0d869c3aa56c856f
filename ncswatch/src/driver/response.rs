//! Response type for command execution results.

use std::time::Duration;

use regex::bytes::Regex;

use crate::channel::extract_prompt;
use crate::platform::{PlatformDefinition, normalize_output};

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - command echo and trailing prompt removed).
    pub result: String,

    /// The raw output before normalization, carriage returns removed.
    pub raw_result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Failure marker found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    /// Build a response from the bytes read up to and including the prompt.
    pub(crate) fn from_output(
        command: &str,
        data: &[u8],
        prompt_pattern: &Regex,
        elapsed: Duration,
        platform: &PlatformDefinition,
    ) -> Self {
        let raw_result = String::from_utf8_lossy(data).replace('\r', "");
        let result = normalize_output(&raw_result, command);
        let failure_message = platform.detect_failure(&result).map(str::to_string);

        Self {
            command: command.to_string(),
            result,
            raw_result,
            prompt: extract_prompt(data, prompt_pattern),
            elapsed,
            failure_message,
        }
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::cisco_xr;

    #[test]
    fn test_from_output() {
        let platform = cisco_xr::platform();
        let data = b"show clock\r\nThu Oct 16 10:00:00.000 UTC\r\nRP/0/RP0/CPU0:r1#";
        let response = Response::from_output(
            "show clock",
            data,
            &platform.exec_prompt,
            Duration::from_millis(5),
            &platform,
        );

        assert_eq!(response.result, "Thu Oct 16 10:00:00.000 UTC");
        assert_eq!(response.prompt, "RP/0/RP0/CPU0:r1#");
        assert!(!response.raw_result.contains('\r'));
        assert!(response.is_success());
    }

    #[test]
    fn test_failure_marker() {
        let platform = cisco_xr::platform();
        let data = b"show bogus\r\n% Invalid input detected at '^' marker.\r\nRP/0/RP0/CPU0:r1#";
        let response = Response::from_output(
            "show bogus",
            data,
            &platform.exec_prompt,
            Duration::ZERO,
            &platform,
        );

        assert!(!response.is_success());
        assert_eq!(
            response.failure_message.as_deref(),
            Some("% Invalid input detected")
        );
    }
}
