//! Credential lookup for authenticated gateways
//!
//! Gateways sit behind HTTP basic auth. Credentials come from an rc
//! file (`alhrc` in the working directory, `/etc/alhrc`, `~/.alhrc`)
//! keyed by host, with an interactive prompt as the last resort.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::debug;

/// A username/password pair for one gateway host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Source of credentials for a gateway host
pub trait CredentialProvider {
    /// Resolve credentials for `host`, or `None` when unavailable.
    fn lookup(&self, host: &str) -> Option<Credentials>;
}

/// Reads credentials from `alhrc`-style files.
///
/// File format, one directive per line, `#` starts a comment:
///
/// ```text
/// Host crn.example.com
/// User joe
/// Password hunter2
/// ```
///
/// The first `Host` block matching the request host that carries both
/// a `User` and a `Password` line wins.
pub struct RcFileProvider {
    paths: Vec<PathBuf>,
}

impl RcFileProvider {
    /// Search the standard locations: `./alhrc`, `/etc/alhrc`, `~/.alhrc`.
    pub fn new() -> Self {
        let mut paths = vec![PathBuf::from("alhrc"), PathBuf::from("/etc/alhrc")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".alhrc"));
        }
        Self { paths }
    }

    /// Search an explicit list of files instead of the standard path.
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl Default for RcFileProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialProvider for RcFileProvider {
    fn lookup(&self, host: &str) -> Option<Credentials> {
        for path in &self.paths {
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            if let Some(found) = parse_rc(&content, host) {
                debug!(path = %path.display(), host, "credentials found");
                return Some(found);
            }
        }
        None
    }
}

fn parse_rc(content: &str, host: &str) -> Option<Credentials> {
    let mut matching = false;
    let mut user: Option<String> = None;
    let mut password: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.splitn(2, char::is_whitespace);
        let key = fields.next().unwrap_or("");
        let value = fields.next().unwrap_or("").trim();

        match key {
            "Host" => {
                matching = value == host;
                user = None;
                password = None;
            }
            "User" if matching => user = Some(value.to_string()),
            "Password" if matching => password = Some(value.to_string()),
            _ => {}
        }

        if matching {
            if let (Some(user), Some(password)) = (&user, &password) {
                return Some(Credentials {
                    user: user.clone(),
                    password: password.clone(),
                });
            }
        }
    }
    None
}

/// Asks for credentials on the controlling terminal.
///
/// Last resort when no rc file matches; prompts go to stderr, both
/// fields are read from stdin.
pub struct PromptProvider;

impl CredentialProvider for PromptProvider {
    fn lookup(&self, host: &str) -> Option<Credentials> {
        let user = prompt(&format!("Username for {}: ", host))?;
        let password = prompt("Password: ")?;
        Some(Credentials { user, password })
    }
}

fn prompt(label: &str) -> Option<String> {
    let mut err = io::stderr();
    err.write_all(label.as_bytes()).ok()?;
    err.flush().ok()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Default lookup chain: rc file search path, then interactive prompt.
pub struct StandardCredentials {
    files: RcFileProvider,
}

impl StandardCredentials {
    pub fn new() -> Self {
        Self {
            files: RcFileProvider::new(),
        }
    }
}

impl Default for StandardCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialProvider for StandardCredentials {
    fn lookup(&self, host: &str) -> Option<Credentials> {
        self.files
            .lookup(host)
            .or_else(|| PromptProvider.lookup(host))
    }
}
