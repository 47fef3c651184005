//! Terminal progress reporting for fleet execution.

use colored::Colorize;
use fleet::{Outcome, ProgressCallback, Step, VmResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Prints one line per step and a spinner while a VM provisions.
pub struct ConsoleProgress {
    quiet: bool,
    spinner: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: None,
        }
    }

    fn clear_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_step(&mut self, vm: &str, step: Step) {
        self.clear_spinner();
        if self.quiet {
            return;
        }

        if step == Step::Provision {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("{vm}: waiting for provisioning..."));
            pb.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(pb);
            return;
        }

        let what = match step {
            Step::Create => "creating (this may take several minutes)...",
            Step::Start => "starting...",
            Step::Stop => "stopping...",
            Step::Delete => "deleting...",
            Step::Provision => "waiting for provisioning...",
        };
        println!("{} {vm}: {what}", "[>]".blue());
    }

    fn on_complete(&mut self, result: &VmResult) {
        self.clear_spinner();
        print_result(result, self.quiet);
    }
}

/// Print the final line for one VM.
pub fn print_result(result: &VmResult, quiet: bool) {
    let name = &result.name;
    match &result.outcome {
        Outcome::Denied { reason } => {
            eprintln!("{} {name}: skipped: {reason}", "[!]".yellow());
        }
        Outcome::Failed { step, error } => {
            eprintln!("{} {name}: {step} failed: {error}", "[x]".red());
        }
        _ if quiet => {}
        Outcome::Unchanged => println!("{} {name}: already running", "[ ]".dimmed()),
        Outcome::Created | Outcome::Started => println!("{} {name}: running", "[+]".green()),
        Outcome::Stopped => println!("{} {name}: stopped", "[+]".green()),
        Outcome::Destroyed => println!("{} {name}: deleted", "[+]".green()),
    }
}
