use std::io::{self, BufRead, IsTerminal, Read, Write};

use clap::{CommandFactory, Parser, Subcommand};
use pwcheck_store::{CredentialStore, StoredPassword};
use serde::Serialize;

use crate::config::Config;
use crate::error::Error;
use crate::generator::MAX_ENTROPY_BITS;
use crate::interactive::run_interactive;
use crate::service::{Assessment, Service};

/// Shown instead of a stored password unless `--reveal` is given.
const PASSWORD_MASK: &str = "********";

#[derive(Parser, Debug)]
#[command(name = "pwcheck", version)]
#[command(about = "Check password strength and breach exposure, generate and store passwords")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Evaluate a password for strength and known breaches
    Check {
        /// Password to evaluate; read from standard input when omitted
        #[arg(short, long)]
        password: Option<String>,

        /// Render the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a secure password
    Generate {
        /// Entropy of the generated password in bits [default: GENERATOR_DEFAULT_BITS]
        #[arg(short, long, value_parser = bits_parser())]
        bits: Option<u32>,
    },

    /// Save a password under a label, generating one when no password is given
    Save {
        /// Label to store the password under (case-insensitive)
        #[arg(short, long)]
        label: String,

        /// Password to store; it is evaluated before saving
        #[arg(short, long)]
        password: Option<String>,

        /// Entropy of the generated password in bits
        #[arg(short, long, conflicts_with = "password", value_parser = bits_parser())]
        bits: Option<u32>,
    },

    /// List saved passwords sorted by label
    List {
        /// Render the entries as JSON
        #[arg(long)]
        json: bool,

        /// Show stored passwords instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Launch the interactive menu
    Interactive,
}

fn bits_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_ENTROPY_BITS))
}

impl Command {
    fn needs_storage(&self) -> bool {
        matches!(self, Command::Save { .. } | Command::List { .. } | Command::Interactive)
    }
}

/// Runs the parsed command line against the process environment and terminal.
pub async fn run(args: Args) -> Result<(), Error> {
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let config = Config::from_env()?;
    let mut service = Service::from_config(&config)?;
    if command.needs_storage() {
        service = service.with_store(CredentialStore::open(&config.storage.path)?);
    }

    let command = match command {
        Command::Check { password: None, json } => {
            Command::Check { password: read_piped_stdin()?, json }
        }
        other => other,
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(command, &config, &service, stdin.lock(), &mut out).await
}

/// Executes one command, reading prompts from `input` and writing to `out`.
pub async fn execute<R, W>(
    command: Command,
    config: &Config,
    service: &Service,
    input: R,
    out: &mut W,
) -> Result<(), Error>
where
    R: BufRead,
    W: Write,
{
    match command {
        Command::Check { password, json } => {
            let password = password.filter(|p| !p.is_empty()).ok_or_else(|| {
                Error::Validation(
                    "no password provided; use --password or pipe a password to stdin".into(),
                )
            })?;
            let assessment = service.evaluate_password(&password).await?;
            if json {
                write_json(out, &assessment)?;
            } else {
                print_assessment(out, &assessment)?;
            }
        }
        Command::Generate { bits } => {
            let bits = bits.unwrap_or(config.generator.default_bits);
            let password = service.generate_password(bits)?;
            writeln!(out, "{password}")?;
        }
        Command::Save { label, password, bits } => {
            let password = match password {
                Some(password) => {
                    let assessment = service.evaluate_password(&password).await?;
                    print_assessment(out, &assessment)?;
                    password
                }
                None => {
                    let password = service
                        .generate_password(bits.unwrap_or(config.generator.default_bits))?;
                    writeln!(out, "Generated password: {password}")?;
                    password
                }
            };
            let record = service.save_password(&label, &password).await?;
            writeln!(out, "Saved password for '{}'.", record.label)?;
        }
        Command::List { json, reveal } => {
            let entries = service.list_saved_passwords().await?;
            if json {
                let entries: Vec<StoredPassword> =
                    entries.into_iter().map(|entry| mask(entry, reveal)).collect();
                write_json(out, &entries)?;
            } else {
                print_entries(out, &entries, reveal)?;
            }
        }
        Command::Interactive => run_interactive(service, config, input, out).await?,
    }
    Ok(())
}

fn read_piped_stdin() -> Result<Option<String>, Error> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut data = String::new();
    stdin.read_to_string(&mut data)?;
    let password = data.trim();
    Ok((!password.is_empty()).then(|| password.to_string()))
}

pub(crate) fn print_assessment<W: Write>(out: &mut W, assessment: &Assessment) -> io::Result<()> {
    writeln!(out, "Strength: {}", assessment.strength.as_str().to_uppercase())?;
    if assessment.findings.is_empty() {
        writeln!(out, "No policy violations found.")?;
    } else {
        writeln!(out, "Findings:")?;
        for finding in &assessment.findings {
            writeln!(
                out,
                " - [{}] {}",
                finding.severity.as_str().to_uppercase(),
                finding.message
            )?;
        }
    }
    if assessment.breached {
        writeln!(out, "Warning: this password appears in known data breaches.")
    } else {
        writeln!(out, "No matches in known data breaches.")
    }
}

pub(crate) fn print_entries<W: Write>(
    out: &mut W,
    entries: &[StoredPassword],
    reveal: bool,
) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "No saved passwords.");
    }

    let width = entries.iter().map(|entry| entry.label.chars().count()).max().unwrap_or(0);
    for entry in entries {
        let password = if reveal { entry.password.as_str() } else { PASSWORD_MASK };
        writeln!(
            out,
            "{:<width$}  {}  (updated {})",
            entry.label,
            password,
            entry.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )?;
    }
    Ok(())
}

fn mask(mut entry: StoredPassword, reveal: bool) -> StoredPassword {
    if !reveal {
        entry.password = PASSWORD_MASK.to_string();
    }
    entry
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
