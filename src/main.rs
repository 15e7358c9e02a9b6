use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use forumdown::{Converter, ConverterOptions};

/// Convert forum-style Markdown to HTML
#[derive(Parser, Debug)]
#[command(name = "forumdown", version, about, long_about = None)]
struct Cli {
    /// Markdown file to convert (reads stdin when omitted)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Strip tags outside the whitelist from the output
    #[arg(long)]
    sanitize: bool,

    /// Drop unpaired opening and closing tags from the output
    #[arg(long)]
    balance: bool,

    /// Leave <user@host> untouched instead of linking it
    #[arg(long)]
    no_email_autolinks: bool,

    /// JSON file with converter options
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> Result<ConverterOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                ConverterOptions::from_json(&json)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => ConverterOptions::default(),
        };

        options.sanitize |= self.sanitize;
        options.balance_tags |= self.balance;
        if self.no_email_autolinks {
            options.email_autolinks = false;
        }
        Ok(options)
    }

    fn read_input(&self) -> Result<String> {
        match &self.file {
            Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
            None => {
                let mut input = String::new();
                io::stdin()
                    .read_to_string(&mut input)
                    .context("failed to read stdin")?;
                Ok(input)
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let options = cli.options()?;
    log::debug!("options: {:?}", options);

    let input = cli.read_input()?;
    let output = Converter::with_options(options).convert(&input);
    println!("{}", output);
    Ok(())
}
