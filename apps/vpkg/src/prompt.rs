//! Terminal confirmation prompts

use crate::events::{drain, SharedPump};
use dialoguer::{theme::ColorfulTheme, Confirm};
use vpkg_ops::Prompter;

/// Lists the changes on stdout and asks on the terminal
pub struct TerminalPrompter {
    assume_yes: bool,
    /// Print the list; off for JSON output
    show_items: bool,
    pump: SharedPump,
}

impl TerminalPrompter {
    pub fn new(pump: SharedPump, assume_yes: bool, show_items: bool) -> Self {
        Self {
            assume_yes,
            show_items,
            pump,
        }
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, title: &str, items: &[String]) -> bool {
        // Everything reported so far must be on screen above the prompt
        drain(&self.pump);

        if self.show_items {
            println!("{title}");
            for item in items {
                println!("  {item}");
            }
        }
        if self.assume_yes {
            return true;
        }

        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Do you want to continue?")
            .default(true)
            .interact();
        match answer {
            Ok(confirmed) => confirmed,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read confirmation");
                false
            }
        }
    }
}
