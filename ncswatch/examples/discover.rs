//! Discovery example: connect to one router and list what would be collected
//!
//! Opens a session, runs the discovery command, and prints the interfaces,
//! slots and the commands the full collection would send. Nothing is written
//! to disk.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example discover -- --host 192.0.2.10 --user admin --password secret
//! cargo run --example discover -- --host 192.0.2.11 --user admin --password secret --telnet
//! ```

use std::time::Duration;

use clap::Parser;

use ncswatch::collect::{CommandPlan, discover, expand};
use ncswatch::driver::{Session, SessionBuilder};
use ncswatch::platform::vendors::cisco_xr;
use ncswatch::transport::TransportKind;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    host: String,

    #[arg(short, long)]
    user: String,

    #[arg(short, long, env = "NCSWATCH_PASSWORD")]
    password: String,

    /// Connect over telnet instead of SSH
    #[arg(long)]
    telnet: bool,

    /// Timeout in seconds
    #[arg(short, long, default_value = "30")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let timeout = Duration::from_secs(args.timeout);
    let transport = if args.telnet {
        TransportKind::Telnet
    } else {
        TransportKind::Ssh
    };

    let mut session = SessionBuilder::new(&args.host)
        .transport(transport)
        .username(&args.user)
        .password(args.password)
        .platform(cisco_xr::platform())
        .timeout(timeout)
        .build()?;

    println!("Connecting to {}...", args.host);
    session.open().await?;

    let plan = CommandPlan::default();
    let result = discover(&mut session, &plan.discovery_command, timeout).await;
    session.close().await?;
    let topology = result?;

    println!("Interfaces: {}", topology.interfaces.join(", "));
    println!("Slots: {}", topology.slots.join(", "));

    println!("\nLine-card commands:");
    for slot in &topology.slots {
        println!("  {}", plan.attach_command(slot));
        for command in &plan.linecard_commands {
            println!("    {}", command);
        }
    }

    println!("\nDevice commands:");
    for command in expand(&plan.interface_templates, &topology.interfaces)
        .chain(expand(&plan.slot_templates, &topology.slots))
    {
        println!("  {}", command);
    }

    Ok(())
}
