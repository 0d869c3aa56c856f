//! Interface and slot discovery.

use std::cmp::Ordering;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::driver::Session;
use crate::error::{DiscoveryError, Result};

static HUNDRED_GIG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"HundredGigE(?P<interface>\d+/(?P<slot>\d+)/\d+/\d+)")
        .expect("valid interface pattern")
});

/// Interfaces and line-card slots found on a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    /// Interface suffixes (`0/1/0/3`) in order of appearance.
    pub interfaces: Vec<String>,

    /// Distinct slots, ascending.
    pub slots: Vec<String>,
}

/// Extract interfaces and slots from `show ip int brief` style output.
///
/// Interfaces keep duplicates and output order. Slots are deduplicated and
/// sorted with [`compare_slots`]. No match yields an empty topology.
pub fn parse_topology(output: &str) -> Topology {
    let mut interfaces = Vec::new();
    let mut slots: Vec<String> = Vec::new();

    for caps in HUNDRED_GIG.captures_iter(output) {
        interfaces.push(caps["interface"].to_string());
        slots.push(caps["slot"].to_string());
    }

    slots.sort_by(|a, b| compare_slots(a, b));
    slots.dedup();

    Topology { interfaces, slots }
}

/// Natural order for slot tokens.
///
/// Numeric tokens compare by value and sort before anything else; equal
/// values (`1` and `01`) fall back to text so the order is total.
pub fn compare_slots(a: &str, b: &str) -> Ordering {
    match (numeric_value(a), numeric_value(b)) {
        // Without leading zeros, a longer digit string is a larger number
        (Some(x), Some(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| x.cmp(y))
            .then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Significant digits of an all-digit token.
fn numeric_value(token: &str) -> Option<&str> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = token.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

/// Run the discovery command and parse its output.
pub async fn discover<S: Session>(
    session: &mut S,
    command: &str,
    timeout: Duration,
) -> Result<Topology> {
    let response = session.send(command, timeout).await?;

    if let Some(marker) = response.failure_message {
        return Err(DiscoveryError::Rejected {
            command: command.to_string(),
            marker,
            output: response.result,
        }
        .into());
    }

    Ok(parse_topology(&response.result))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIEF: &str = "\
HundredGigE0/0/0/0             10.0.0.1        Up              Up       default
HundredGigE0/0/0/1             unassigned      Shutdown        Down     default
HundredGigE0/10/0/2            10.0.10.1       Up              Up       default
HundredGigE0/2/0/0             10.0.2.1        Up              Up       default
HundredGigE0/0/0/0.100         10.0.100.1      Up              Up       default
";

    #[test]
    fn test_interfaces_in_order_with_duplicates() {
        let topology = parse_topology(BRIEF);
        assert_eq!(
            topology.interfaces,
            vec!["0/0/0/0", "0/0/0/1", "0/10/0/2", "0/2/0/0", "0/0/0/0"]
        );
    }

    #[test]
    fn test_slots_distinct_and_sorted() {
        let topology = parse_topology(BRIEF);
        assert_eq!(topology.slots, vec!["0", "2", "10"]);
    }

    #[test]
    fn test_no_matches() {
        let topology = parse_topology("Bundle-Ether1  10.1.1.1  Up  Up  default\n");
        assert_eq!(topology, Topology::default());
    }

    #[test]
    fn test_compare_slots() {
        let mut slots = vec!["10", "RP0", "2", "02", "0"];
        slots.sort_by(|a, b| compare_slots(a, b));
        assert_eq!(slots, vec!["0", "02", "2", "10", "RP0"]);
    }

    #[test]
    fn test_compare_slots_beyond_u64() {
        let mut slots = vec!["99999999999999999999999", "7", "000", "4294967296", "0"];
        slots.sort_by(|a, b| compare_slots(a, b));
        assert_eq!(
            slots,
            vec!["0", "000", "7", "4294967296", "99999999999999999999999"]
        );
    }
}
