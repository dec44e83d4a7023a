use crate::tempo::Operator;
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use tracing::debug;

/// Asks on the terminal. EOF, an interrupt or a plain Enter all mean no.
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    fn confirm_batch(&mut self, count: usize) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Are you sure you want to upload {count} new worklog entries?"
            ))
            .default(false)
            .interact()
            .unwrap_or_else(|error| {
                debug!(error = %error, "confirmation prompt aborted");
                false
            })
    }
}

/// Answers yes without asking, for `--yes`.
pub struct AssumeYes;

impl Operator for AssumeYes {
    fn confirm_batch(&mut self, count: usize) -> bool {
        debug!(count, "large batch confirmed by --yes");
        true
    }
}
