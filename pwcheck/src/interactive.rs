//! The menu-driven terminal mode.

use std::io::{BufRead, Write};

use tracing::warn;

use crate::cli::{print_assessment, print_entries};
use crate::config::Config;
use crate::error::Error;
use crate::service::Service;

const MENU: &str = "\
Password Checker
  1) Check a password
  2) Generate a password
  3) Save a password
  4) List saved passwords
  5) Quit";

enum Choice {
    Check,
    Generate,
    Save,
    List,
    Quit,
}

impl Choice {
    fn parse(input: &str) -> Option<Self> {
        match input {
            "1" => Some(Choice::Check),
            "2" => Some(Choice::Generate),
            "3" => Some(Choice::Save),
            "4" => Some(Choice::List),
            "5" | "q" | "quit" => Some(Choice::Quit),
            _ => None,
        }
    }
}

/// Runs the menu until the user quits or input ends.
///
/// Consecutive invalid selections are capped by `cli.max_prompt_retries`. Failures of a
/// single action are reported and the menu continues; I/O errors on the terminal end
/// the session.
pub async fn run_interactive<R, W>(
    service: &Service,
    config: &Config,
    mut input: R,
    out: &mut W,
) -> Result<(), Error>
where
    R: BufRead,
    W: Write,
{
    let max_retries = config.cli.max_prompt_retries;
    let mut invalid = 0;

    loop {
        writeln!(out, "\n{MENU}")?;
        let Some(line) = prompt(&mut input, out, "Select an option: ")? else {
            break;
        };

        let Some(choice) = Choice::parse(line.trim()) else {
            invalid += 1;
            if invalid >= max_retries {
                return Err(Error::PromptRetriesExceeded(max_retries));
            }
            writeln!(out, "Invalid selection, choose 1-5 ({invalid}/{max_retries}).")?;
            continue;
        };
        invalid = 0;

        let result = match choice {
            Choice::Check => check(service, &mut input, out).await,
            Choice::Generate => generate(service, config, &mut input, out).await,
            Choice::Save => save(service, config, &mut input, out).await,
            Choice::List => list(service, &mut input, out).await,
            Choice::Quit => break,
        };
        match result {
            Ok(Flow::Continue) => {}
            Ok(Flow::Eof) => break,
            Err(err @ Error::Io(_)) => return Err(err),
            Err(err) => {
                warn!(error = %err, "interactive action failed");
                writeln!(out, "Error: {err}")?;
            }
        }
    }

    writeln!(out, "Goodbye!")?;
    Ok(())
}

enum Flow {
    Continue,
    Eof,
}

async fn check<R: BufRead, W: Write>(
    service: &Service,
    input: &mut R,
    out: &mut W,
) -> Result<Flow, Error> {
    let Some(password) = prompt_password(input, out, "Password: ")? else {
        return Ok(Flow::Eof);
    };
    if password.is_empty() {
        writeln!(out, "No password entered.")?;
        return Ok(Flow::Continue);
    }

    let assessment = service.evaluate_password(&password).await?;
    print_assessment(out, &assessment)?;
    Ok(Flow::Continue)
}

async fn generate<R: BufRead, W: Write>(
    service: &Service,
    config: &Config,
    input: &mut R,
    out: &mut W,
) -> Result<Flow, Error> {
    let Some(bits) = prompt_bits(input, out, config.generator.default_bits)? else {
        return Ok(Flow::Eof);
    };

    let password = service.generate_password(bits)?;
    writeln!(out, "Generated password: {password}")?;
    Ok(Flow::Continue)
}

async fn save<R: BufRead, W: Write>(
    service: &Service,
    config: &Config,
    input: &mut R,
    out: &mut W,
) -> Result<Flow, Error> {
    let Some(label) = prompt(input, out, "Label: ")? else {
        return Ok(Flow::Eof);
    };
    let label = label.trim().to_string();
    if label.is_empty() {
        writeln!(out, "No label entered.")?;
        return Ok(Flow::Continue);
    }

    let Some(password) = prompt_password(input, out, "Password (leave empty to generate): ")?
    else {
        return Ok(Flow::Eof);
    };
    let password = if password.is_empty() {
        let password = service.generate_password(config.generator.default_bits)?;
        writeln!(out, "Generated password: {password}")?;
        password
    } else {
        let assessment = service.evaluate_password(&password).await?;
        print_assessment(out, &assessment)?;
        password
    };

    let record = service.save_password(&label, &password).await?;
    writeln!(out, "Saved password for '{}'.", record.label)?;
    Ok(Flow::Continue)
}

async fn list<R: BufRead, W: Write>(
    service: &Service,
    input: &mut R,
    out: &mut W,
) -> Result<Flow, Error> {
    let entries = service.list_saved_passwords().await?;
    if entries.is_empty() {
        print_entries(out, &entries, false)?;
        return Ok(Flow::Continue);
    }

    let Some(answer) = prompt(input, out, "Reveal passwords? [y/N]: ")? else {
        return Ok(Flow::Eof);
    };
    let reveal = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    print_entries(out, &entries, reveal)?;
    Ok(Flow::Continue)
}

fn prompt_bits<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    default_bits: u32,
) -> Result<Option<u32>, Error> {
    let Some(line) = prompt(input, out, &format!("Entropy in bits [{default_bits}]: "))? else {
        return Ok(None);
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(Some(default_bits));
    }

    match line.parse::<u32>() {
        Ok(bits) if bits > 0 => Ok(Some(bits)),
        _ => Err(Error::Validation(format!("invalid number of bits: {line}"))),
    }
}

/// Reads a password, keeping interior and surrounding spaces.
fn prompt_password<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    message: &str,
) -> Result<Option<String>, Error> {
    Ok(prompt(input, out, message)?
        .map(|line| line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Writes `message` and reads one line. Returns `None` at end of input.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    message: &str,
) -> Result<Option<String>, Error> {
    write!(out, "{message}")?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
