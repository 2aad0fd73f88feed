//! Recover command - run reply recovery alone on a saved model reply.

use std::path::PathBuf;

use clap::Args;
use console::style;

use docfield_core::{ErrorRecord, KeyPolicy, recover};

/// Arguments for the recover command.
#[derive(Args)]
pub struct RecoverArgs {
    /// Saved model reply (e.g. a `_resposta.txt` file)
    #[arg(required = true)]
    response_file: PathBuf,

    /// How keys are mapped onto output keys
    #[arg(short, long, value_enum, default_value = "verbatim")]
    keys: KeyMode,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum KeyMode {
    /// Keys as written by the model
    Verbatim,
    /// Accent-free, uppercased, punctuation-free keys
    Canonical,
}

impl From<KeyMode> for KeyPolicy {
    fn from(mode: KeyMode) -> Self {
        match mode {
            KeyMode::Verbatim => KeyPolicy::Verbatim,
            KeyMode::Canonical => KeyPolicy::Canonical,
        }
    }
}

pub fn run(args: RecoverArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.response_file)?;

    match recover(&raw, args.keys.into()) {
        Ok(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            eprintln!(
                "{} Recovered {} fields ({} filled)",
                style("✓").green(),
                record.len(),
                record.filled_count()
            );
            Ok(())
        }
        Err(err) => {
            let record = ErrorRecord::new(err.to_string());
            println!("{}", serde_json::to_string_pretty(&record)?);
            anyhow::bail!("{}", err)
        }
    }
}
