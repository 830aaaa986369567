//! Interactive prompt loop: one dispatch per input line, bounded retry, and
//! history bookkeeping once a turn completes.

use std::io::{self, BufRead, Write};

use tracing::{debug, warn};

use crate::core::classifier::TerminalResponse;
use crate::core::dispatch::{DispatchError, Dispatcher};
use crate::core::message::ConversationHistory;
use crate::utils::logging::TranscriptLog;

pub const USER_PROMPT: &str = "[user]>>> ";
pub const ASSISTANT_PREFIX: &str = "[assistant]>>> ";
pub const EXIT_COMMAND: &str = "/exit";

pub const MAX_ATTEMPTS: usize = 2;
/// A trimmed message must be longer than this to count as a usable answer.
pub const MIN_MESSAGE_CHARS: usize = 10;

pub const FALLBACK_MESSAGE: &str = "Sorry, I couldn't process your request.";
pub const EMPTY_MESSAGE_PLACEHOLDER: &str = "No response from assistant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered(TerminalResponse),
    /// The model's final response left out a required field.
    Incomplete { field: &'static str },
    Fallback,
}

pub fn is_usable(response: &TerminalResponse) -> bool {
    response.chatbot_message.trim().chars().count() > MIN_MESSAGE_CHARS
}

pub struct Session<D> {
    dispatcher: D,
    history: ConversationHistory,
    transcript: TranscriptLog,
}

impl<D: Dispatcher> Session<D> {
    pub fn new(dispatcher: D, transcript: TranscriptLog) -> Self {
        Self {
            dispatcher,
            history: ConversationHistory::new(),
            transcript,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Read lines until `/exit` or end of input, answering each one.
    pub async fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> io::Result<()> {
        loop {
            write!(out, "{USER_PROMPT}")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if line == EXIT_COMMAND {
                break;
            }

            self.respond(line, &mut out).await?;
        }
        Ok(())
    }

    /// Answer one user message, print the result, and record the exchange.
    pub async fn respond<W: Write>(&mut self, input: &str, out: &mut W) -> io::Result<TurnOutcome> {
        let mut last_response: Option<TerminalResponse> = None;
        let mut last_error: Option<DispatchError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.dispatcher.dispatch(&self.history, input).await {
                Ok(response) => {
                    let usable = is_usable(&response);
                    last_response = Some(response);
                    if usable {
                        break;
                    }
                    debug!(attempt, "Response too short, retrying");
                }
                Err(err) => {
                    warn!(attempt, error = %err, "Dispatch attempt failed");
                    writeln!(out, "Attempt {attempt} failed: {err}")?;
                    last_error = Some(err);
                }
            }
        }

        self.history.add_user_message(input);
        self.log(&format!("{USER_PROMPT}{input}"));

        let outcome = match last_response {
            Some(mut response) => {
                if response.chatbot_message.is_empty() {
                    response.chatbot_message = EMPTY_MESSAGE_PLACEHOLDER.to_string();
                }
                self.history
                    .add_assistant_message(&response.chatbot_message, response.url.as_deref());
                TurnOutcome::Answered(response)
            }
            None => match last_error.as_ref().and_then(DispatchError::missing_field) {
                Some(field) => TurnOutcome::Incomplete { field },
                None => TurnOutcome::Fallback,
            },
        };

        let rendered = render_outcome(&outcome);
        self.log(&rendered);
        writeln!(out, "{rendered}")?;
        Ok(outcome)
    }

    fn log(&self, entry: &str) {
        if let Err(err) = self.transcript.append(entry) {
            warn!(error = %err, "Failed to write transcript");
        }
    }
}

pub fn render_outcome(outcome: &TurnOutcome) -> String {
    match outcome {
        TurnOutcome::Answered(response) => match response.url.as_deref() {
            Some(url) => format!(
                "{ASSISTANT_PREFIX}{}\nImage URL: {url}",
                response.chatbot_message
            ),
            None => format!("{ASSISTANT_PREFIX}{}", response.chatbot_message),
        },
        TurnOutcome::Incomplete { field } => {
            format!("{ASSISTANT_PREFIX}Incomplete response. Missing field: {field}")
        }
        TurnOutcome::Fallback => format!("{ASSISTANT_PREFIX}{FALLBACK_MESSAGE}"),
    }
}
