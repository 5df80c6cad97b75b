//! Confirmation seam for destructive restore steps

use dialoguer::Confirm;
use tracing::warn;

/// Asks the operator before a destructive action
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Accepts every prompt (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirmation for AssumeYes {
    fn confirm(&self, prompt: &str) -> bool {
        warn!("{} -> yes (assumed)", prompt);
        true
    }
}

/// Declines every prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

impl Confirmation for AssumeNo {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Interactive terminal prompt, defaulting to "no"
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

impl Confirmation for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        match Confirm::new().with_prompt(prompt).default(false).interact() {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Confirmation prompt unavailable: {}", e);
                false
            }
        }
    }
}

impl<F> Confirmation for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
