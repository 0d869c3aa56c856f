//! Subset of the OpenSSH client config format.
//!
//! Supports `Host` blocks with `*`/`?` wildcards and `!` negation, and the
//! keywords that matter for reaching a router: `HostName`, `Port`, `User`,
//! `IdentityFile`, `StrictHostKeyChecking`, `UserKnownHostsFile` and
//! `ConnectTimeout`. As with OpenSSH, the first value obtained for a keyword
//! wins, except `IdentityFile` which accumulates.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use super::config::HostKeyVerification;
use crate::error::ConfigError;

/// Parsed OpenSSH client configuration.
#[derive(Debug, Clone, Default)]
pub struct OpenSshConfig {
    blocks: Vec<HostBlock>,
}

#[derive(Debug, Clone)]
struct HostBlock {
    patterns: Vec<String>,
    options: Vec<(String, String)>,
}

/// Settings resolved for one host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostParams {
    pub host_name: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub identity_files: Vec<PathBuf>,
    pub strict_host_key_checking: Option<HostKeyVerification>,
    pub user_known_hosts_file: Option<PathBuf>,
    pub connect_timeout: Option<Duration>,
}

impl OpenSshConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::TransportConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Parse config text. Unknown keywords are ignored.
    pub fn parse(text: &str) -> Self {
        // Options before the first Host line apply to every host
        let mut blocks = vec![HostBlock {
            patterns: vec!["*".to_string()],
            options: Vec::new(),
        }];

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((keyword, value)) = split_keyword(line) else {
                continue;
            };
            let keyword = keyword.to_ascii_lowercase();

            match keyword.as_str() {
                "host" => blocks.push(HostBlock {
                    patterns: value.split_whitespace().map(str::to_string).collect(),
                    options: Vec::new(),
                }),
                "match" => {
                    debug!("ssh config: Match blocks are not supported, skipping");
                    blocks.push(HostBlock {
                        patterns: Vec::new(),
                        options: Vec::new(),
                    });
                }
                "proxyjump" | "proxycommand" => {
                    warn!("ssh config: {} is not supported and will be ignored", keyword);
                }
                _ => {
                    if let Some(block) = blocks.last_mut() {
                        block.options.push((keyword, unquote(value).to_string()));
                    }
                }
            }
        }

        Self { blocks }
    }

    /// Resolve the settings that apply to `host`.
    pub fn resolve(&self, host: &str) -> HostParams {
        let mut params = HostParams::default();

        for block in self.blocks.iter().filter(|b| host_matches(&b.patterns, host)) {
            for (keyword, value) in &block.options {
                match keyword.as_str() {
                    "hostname" if params.host_name.is_none() => {
                        params.host_name = Some(value.replace("%h", host));
                    }
                    "port" if params.port.is_none() => params.port = value.parse().ok(),
                    "user" if params.user.is_none() => params.user = Some(value.clone()),
                    "identityfile" => params.identity_files.push(expand_home(value)),
                    "stricthostkeychecking" if params.strict_host_key_checking.is_none() => {
                        params.strict_host_key_checking = parse_strict(value);
                    }
                    "userknownhostsfile" if params.user_known_hosts_file.is_none() => {
                        params.user_known_hosts_file = Some(expand_home(value));
                    }
                    "connecttimeout" if params.connect_timeout.is_none() => {
                        params.connect_timeout = value.parse().ok().map(Duration::from_secs);
                    }
                    _ => {}
                }
            }
        }

        params
    }
}

fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let keyword = &line[..idx];
    let value = line[idx..]
        .trim_start_matches(|c: char| c.is_whitespace())
        .trim_start_matches('=')
        .trim();
    Some((keyword, value))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_strict(value: &str) -> Option<HostKeyVerification> {
    match value.to_ascii_lowercase().as_str() {
        "yes" => Some(HostKeyVerification::Strict),
        "accept-new" | "ask" => Some(HostKeyVerification::AcceptNew),
        "no" | "off" => Some(HostKeyVerification::Disabled),
        _ => None,
    }
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

/// A host matches when some pattern matches and no negated pattern does.
fn host_matches(patterns: &[String], host: &str) -> bool {
    let mut matched = false;
    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            if wildcard_match(negated, host) {
                return false;
            }
        } else if wildcard_match(pattern, host) {
            matched = true;
        }
    }
    matched
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi].eq_ignore_ascii_case(&t[ti])) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
