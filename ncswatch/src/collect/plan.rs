//! The command sequence run against each device.

use super::expand::PLACEHOLDER;

/// Commands and prompts for one collection run.
///
/// Templates use `{item}` for the interface or slot identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    /// Lists the interfaces to discover.
    pub discovery_command: String,

    /// Opens the line-card shell for a slot.
    pub attach_template: String,

    /// Run inside each line-card shell.
    pub linecard_commands: Vec<String>,

    /// Expanded over discovered interfaces.
    pub interface_templates: Vec<String>,

    /// Expanded over discovered slots.
    pub slot_templates: Vec<String>,

    /// Prompt expected after entering and leaving a line-card shell.
    pub subcontext_prompt: String,
}

impl Default for CommandPlan {
    /// The NCS-55xx link-flap collection.
    fn default() -> Self {
        Self {
            discovery_command: "show ip int brief | i Hun".to_string(),
            attach_template: "attach location 0/{item}/CPU0".to_string(),
            linecard_commands: vec![
                "epm_show_ltrace -T 0x1 | grep dispatch_link_notify".to_string(),
                "ofa_show_ltrace | grep dispatch_link_notify | grep linkstatus".to_string(),
            ],
            interface_templates: vec![
                "show controllers optics {item}".to_string(),
                "show interface HundredGigE{item}".to_string(),
                "show controllers HundredGigE{item} phy".to_string(),
            ],
            slot_templates: vec![
                r#"show controllers fia diagshell 0 "counter pbm=all" location 0/{item}/CPU0"#
                    .to_string(),
                r#"show controllers fia diagshell 0 "show counters full" location 0/{item}/CPU0"#
                    .to_string(),
            ],
            subcontext_prompt: r"[#$]".to_string(),
        }
    }
}

impl CommandPlan {
    /// Attach command for `slot`.
    pub fn attach_command(&self, slot: &str) -> String {
        self.attach_template.replace(PLACEHOLDER, slot)
    }
}
