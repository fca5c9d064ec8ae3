use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use db::models::project::Project;
use services::services::project_sync::{ConfirmDeletion, DELETE_PROMPT};

/// Asks on the terminal. Anything but an explicit yes declines.
pub struct StdinConfirm;

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "j" | "ja" | "y" | "yes"
    )
}

#[async_trait]
impl ConfirmDeletion for StdinConfirm {
    async fn confirm(&self, project: &Project) -> bool {
        let name = project.name.clone();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(stdout, "{DELETE_PROMPT} ({name}) [j/N] ")?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(err)) => {
                tracing::warn!("Failed to read confirmation: {err}");
                false
            }
            Err(err) => {
                tracing::warn!("Confirmation prompt failed: {err}");
                false
            }
        }
    }
}
