use std::fmt::Write;

use clap::ValueEnum;
use wizard_spec::{
    Navigation, PrefillOutcome, Receipt, ValidationError, Wizard, build_step_payload,
    render_json_ui, render_text,
};

/// How step views are printed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Controls which bits of state the shell prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Step views only when the step changes.
    Clean,
    /// Step view after every action, plus navigation notes.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

pub struct Presenter {
    format: OutputFormat,
    verbosity: Verbosity,
    header_printed: bool,
}

impl Presenter {
    pub fn new(format: OutputFormat, verbosity: Verbosity) -> Self {
        Self {
            format,
            verbosity,
            header_printed: false,
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity.is_verbose()
    }

    pub fn show_header(&mut self, wizard: &Wizard) {
        if self.header_printed || self.format == OutputFormat::Json {
            return;
        }
        let form = wizard.form();
        println!("{} ({} steps)", form.title(), form.step_count());
        if self.is_verbose()
            && let Some(description) = &form.spec().description
        {
            println!("{}", description);
        }
        self.header_printed = true;
    }

    pub fn show_step(&self, wizard: &Wizard) {
        let payload = build_step_payload(wizard);
        match self.format {
            OutputFormat::Text => print!("{}", render_text(&payload)),
            OutputFormat::Json => {
                let ui = render_json_ui(&payload);
                match serde_json::to_string_pretty(&ui) {
                    Ok(pretty) => println!("{}", pretty),
                    Err(err) => eprintln!("Failed to serialize step view: {}", err),
                }
            }
        }
    }

    pub fn show_navigation(&self, navigation: &Navigation) {
        if navigation.moved {
            if self.is_verbose() {
                println!("Moved to step {}", navigation.step);
            }
        } else if navigation.errors.is_empty() {
            println!("Stayed on step {}", navigation.step);
        } else {
            println!("Step {} is incomplete:", navigation.step);
            self.show_errors(&navigation.errors);
        }
    }

    pub fn show_errors(&self, errors: &[ValidationError]) {
        for error in errors {
            println!("  {} - {}", error.path, error.message);
        }
    }

    pub fn show_derived(&self, derived: &[String]) {
        if self.is_verbose() && !derived.is_empty() {
            println!("Derived: {}", derived.join(", "));
        }
    }

    pub fn show_prefill(&self, outcome: &PrefillOutcome) {
        println!("Prefilled: {}", outcome.applied.join(", "));
        if !outcome.skipped.is_empty() {
            println!("Ignored: {}", outcome.skipped.join(", "));
        }
    }

    pub fn show_failure(&self, err: &dyn std::error::Error) {
        eprintln!("Rejected: {}", err);
    }

    pub fn show_receipt(&self, receipt: &Receipt) {
        println!("Submitted: {}", receipt.reference);
        match receipt.application.to_cbor() {
            Ok(bytes) => {
                if self.is_verbose() {
                    println!("Application (CBOR hex): {}", encode_hex(&bytes));
                }
            }
            Err(err) => eprintln!("Failed to serialize application to CBOR: {}", err),
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_pairs() {
        assert_eq!(encode_hex(&[0x0a, 0xff, 0x00]), "0aff00");
    }
}
