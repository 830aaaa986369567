//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::app::{self, AppInitConfig};
use crate::core::config::data::Config;
use crate::core::dispatch::Dispatcher;
use crate::core::providers::ProviderSession;
use crate::core::session::{Session, TurnOutcome};

pub async fn run_say(
    prompt: Vec<String>,
    init: AppInitConfig,
    config: &Config,
    provider: &ProviderSession,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: drawbot say <prompt>");
        std::process::exit(1);
    }

    let mut session = app::new_session(init, config, provider)?;
    let outcome = say_once(&mut session, &prompt, &mut io::stdout()).await?;
    if !matches!(outcome, TurnOutcome::Answered(_)) {
        std::process::exit(1);
    }
    Ok(())
}

/// Run a single turn through the same retry path as the interactive chat.
pub async fn say_once<D: Dispatcher, W: Write>(
    session: &mut Session<D>,
    prompt: &str,
    out: &mut W,
) -> io::Result<TurnOutcome> {
    let outcome = session.respond(prompt, out).await?;
    out.flush()?;
    Ok(outcome)
}
