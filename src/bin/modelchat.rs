//! Interactive chat against a hosted chat-completion endpoint.
//!
//! # Usage
//!
//! ```bash
//! # Pick a model from the catalog, then chat
//! modelchat
//!
//! # Chat with a specific model
//! modelchat gpt-4o
//!
//! # Ask one question and exit
//! modelchat gpt-4o "Why is the sky blue?"
//! cat notes.txt | modelchat gpt-4o "Summarize these notes"
//! ```
//!
//! The credential is read from `MODELCHAT_TOKEN`, falling back to `GITHUB_TOKEN`.
//! Logging is controlled with `MODELCHAT_LOG` (for example `MODELCHAT_LOG=modelchat=debug`).

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use arrrg::CommandLine;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use modelchat::catalog::{HttpCatalog, ModelCatalog, select_model};
use modelchat::chat::{
    ChatArgs, ChatConfig, ChatSession, EditorInput, InputSource, PlainTextRenderer, Renderer,
    ScriptedInput, TERMINAL_TOKEN_DELAY,
};
use modelchat::{EnvTokenProvider, Error, InferenceClient, require_token};

const USAGE: &str = "modelchat [OPTIONS] [MODEL] [PROMPT...]";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MODELCHAT_LOG").unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let (args, free) = ChatArgs::from_command_line_relaxed(USAGE);
    let config = match ChatConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => return report(&mut PlainTextRenderer::new(), Failure::Run(err)),
    };
    let mut renderer = renderer_for(&config);

    let outcome = match require_token(&EnvTokenProvider::default()) {
        Ok(token) => run(config, token, free, &mut renderer).await.map_err(Failure::Run),
        Err(err) => Err(Failure::MissingToken(err)),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => report(&mut renderer, failure),
    }
}

/// Why the program stopped early.
#[derive(Debug)]
enum Failure {
    /// No credential was configured; the session never started.
    MissingToken(Error),
    /// Anything that went wrong after startup, including a rejected credential.
    Run(Error),
}

impl Failure {
    fn status(&self) -> u8 {
        match self {
            Failure::MissingToken(_) => 0,
            Failure::Run(_) => 1,
        }
    }

    fn error(&self) -> &Error {
        match self {
            Failure::MissingToken(err) | Failure::Run(err) => err,
        }
    }
}

fn report(renderer: &mut dyn Renderer, failure: Failure) -> ExitCode {
    renderer.print_error(&failure.error().to_string());
    ExitCode::from(failure.status())
}

fn renderer_for(config: &ChatConfig) -> PlainTextRenderer {
    PlainTextRenderer::with_color(config.use_color)
}

async fn run(
    mut config: ChatConfig,
    token: String,
    free: Vec<String>,
    renderer: &mut dyn Renderer,
) -> Result<(), Error> {
    let mut free = free.into_iter();
    config.model = free.next().filter(|model| !model.trim().is_empty());
    let prompt = initial_prompt(free.collect::<Vec<_>>().join(" "))?;

    config.spinner = config.spinner && io::stderr().is_terminal();
    if io::stdout().is_terminal() {
        config.token_delay = Some(TERMINAL_TOKEN_DELAY);
    }

    let client = InferenceClient::with_options(token, config.base_url.clone(), None)?;

    let catalog = match &config.catalog_url {
        Some(url) => HttpCatalog::with_url(url.clone())?,
        None => HttpCatalog::new()?,
    };
    let models = catalog.list_models().await?;
    debug!(models = models.len(), "loaded model catalog");

    let one_shot = !prompt.is_empty();
    let mut input: Box<dyn InputSource> = if one_shot && config.model.is_some() {
        Box::new(ScriptedInput::default())
    } else {
        Box::new(EditorInput::new()?)
    };
    let model = select_model(config.model.as_deref(), &models, input.as_mut(), renderer)?;

    let interrupt = CancellationToken::new();
    let handler_token = interrupt.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %err, "could not install interrupt handler");
    }

    if !one_shot {
        renderer.print_info(&format!(
            "Chatting with {model}. Type /help for commands, /bye to exit."
        ));
    }

    let mut session = ChatSession::new(client, model, &config)
        .with_initial_prompt(prompt)
        .with_interrupt(interrupt);
    session.run(input.as_mut(), renderer).await
}

/// Joins the prompt arguments with anything piped on stdin.
fn initial_prompt(from_args: String) -> Result<String, Error> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(from_args);
    }
    let mut piped = String::new();
    stdin
        .lock()
        .read_to_string(&mut piped)
        .map_err(|err| Error::io("failed to read standard input", err))?;
    let piped = piped.trim();
    Ok(match (from_args.trim().is_empty(), piped.is_empty()) {
        (_, true) => from_args,
        (true, false) => piped.to_string(),
        (false, false) => format!("{from_args}\n{piped}"),
    })
}
