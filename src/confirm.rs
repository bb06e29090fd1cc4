//! Confirmation prompts for destructive actions.

use async_trait::async_trait;
use dialoguer::Confirm as DialoguerPrompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub body: String,
    pub confirm_label: String,
}

impl ConfirmPrompt {
    pub fn delete_folder(name: &str) -> Self {
        Self {
            title: format!("Delete Folder: {name}"),
            body: "All files inside it will also be permanently deleted. This action cannot be undone."
                .into(),
            confirm_label: "Delete Folder and All Files".into(),
        }
    }

    pub fn delete_file(name: &str) -> Self {
        Self {
            title: format!("Delete {name}"),
            body: "This action is permanent and cannot be undone.".into(),
            confirm_label: "Delete File".into(),
        }
    }
}

/// Asks the user to approve an action. Resolves once the user has answered.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// Answers every prompt the same way (`--yes`, tests).
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        self.0
    }
}

/// Interactive terminal prompt. A closed or non-interactive terminal counts
/// as "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerConfirm;

#[async_trait]
impl Confirm for DialoguerConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        let prompt = prompt.clone();
        let answer = tokio::task::spawn_blocking(move || {
            DialoguerPrompt::new()
                .with_prompt(format!(
                    "{}\n{}\n{}?",
                    prompt.title, prompt.body, prompt.confirm_label
                ))
                .default(false)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(yes)) => yes,
            Ok(Err(err)) => {
                tracing::warn!("confirmation prompt failed: {err}");
                false
            }
            Err(err) => {
                tracing::warn!("confirmation prompt task failed: {err}");
                false
            }
        }
    }
}
