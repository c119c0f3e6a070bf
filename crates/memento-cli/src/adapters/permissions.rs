use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use memento_core::device::{Capability, PermissionGate};

use crate::config_profiles::PermissionDefaults;

/// Answers from the profile first, then a y/N prompt on an interactive terminal.
///
/// Grants are remembered for the rest of the process.
pub struct PromptPermissionGate {
    defaults: PermissionDefaults,
    interactive: bool,
    granted: Mutex<HashSet<Capability>>,
}

impl PromptPermissionGate {
    pub fn new(defaults: PermissionDefaults, interactive: bool) -> Self {
        Self {
            defaults,
            interactive,
            granted: Mutex::default(),
        }
    }

    fn remembered(&self, capability: Capability) -> bool {
        self.granted
            .lock()
            .is_ok_and(|granted| granted.contains(&capability))
    }

    fn remember(&self, capability: Capability) {
        if let Ok(mut granted) = self.granted.lock() {
            granted.insert(capability);
        }
    }
}

#[async_trait]
impl PermissionGate for PromptPermissionGate {
    async fn acquire(&self, capability: Capability) -> bool {
        if self.remembered(capability) {
            return true;
        }

        let granted = match self.defaults.get(capability) {
            Some(answer) => answer,
            None if self.interactive => tokio::task::spawn_blocking(move || ask(capability))
                .await
                .unwrap_or(false),
            None => {
                tracing::warn!(
                    "No stored answer for {capability} permission and stdin is not a terminal"
                );
                false
            }
        };

        if granted {
            self.remember(capability);
        }
        granted
    }
}

fn ask(capability: Capability) -> bool {
    let mut stderr = io::stderr();
    if write!(stderr, "Allow Memento to use the {capability}? [y/N] ").is_err() {
        return false;
    }
    stderr.flush().ok();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => parse_answer(&line),
        Err(_) => false,
    }
}

/// Only an explicit yes grants.
pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
