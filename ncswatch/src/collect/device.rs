//! One device, end to end.

use log::{debug, info, warn};

use super::discovery::discover;
use super::expand::expand;
use super::output::OutputBuffer;
use super::plan::CommandPlan;
use crate::config::{DeviceConfig, Globals};
use crate::driver::{Connector, Response, Session};
use crate::error::Result;

/// Connect to `device`, run `plan` and record everything into `buffer`.
///
/// The session is closed on every path once it has been opened. On error
/// `buffer` keeps whatever was captured before the failure, including the
/// header of the command that failed.
pub async fn run_device<C: Connector>(
    connector: &C,
    name: &str,
    device: &DeviceConfig,
    globals: &Globals,
    plan: &CommandPlan,
    buffer: &mut OutputBuffer,
) -> Result<()> {
    info!("[{}] Starting session to {}", name, device.address);
    let mut session = connector
        .connect(name, device, globals.timeout_std())
        .await?;

    let result = collect(&mut session, name, globals, plan, buffer).await;

    if let Err(e) = session.close().await {
        match &result {
            Ok(()) => warn!("[{}] Error closing session: {}", name, e),
            Err(_) => debug!("[{}] Error closing session after failure: {}", name, e),
        }
    }

    result
}

async fn collect<S: Session>(
    session: &mut S,
    name: &str,
    globals: &Globals,
    plan: &CommandPlan,
    buffer: &mut OutputBuffer,
) -> Result<()> {
    let timeout_std = globals.timeout_std();
    let timeout_ext = globals.timeout_ext();

    let topology = discover(session, &plan.discovery_command, timeout_std).await?;
    info!(
        "[{}] Slots: {}, Interfaces: {}",
        name,
        topology.slots.len(),
        topology.interfaces.len()
    );

    info!("[{}] Starting line-card section", name);
    for slot in &topology.slots {
        session
            .enter_context(&plan.attach_command(slot), timeout_std, &plan.subcontext_prompt)
            .await?;

        for command in &plan.linecard_commands {
            info!("[{}][slot {}] Sending '{}'", name, slot, command);
            buffer.push_header(name, Some(slot), command);
            let response = session.send(command, timeout_ext).await?;
            record(buffer, name, response);
        }

        session
            .exit_context(timeout_std, &plan.subcontext_prompt)
            .await?;
    }
    info!("[{}] Finished line-card section", name);

    let commands = expand(&plan.interface_templates, &topology.interfaces)
        .chain(expand(&plan.slot_templates, &topology.slots));
    for command in commands {
        info!("[{}] Sending '{}'", name, command);
        buffer.push_header(name, None, &command);
        let response = session.send(&command, timeout_ext).await?;
        record(buffer, name, response);
    }

    Ok(())
}

fn record(buffer: &mut OutputBuffer, name: &str, response: Response) {
    if let Some(marker) = &response.failure_message {
        warn!("[{}] '{}' reported '{}'", name, response.command, marker);
    }
    debug!(
        "[{}] '{}' answered in {:?}",
        name, response.command, response.elapsed
    );
    buffer.push_response(response.result);
}
