use std::io::{self, BufRead, Write};
use std::time::Duration;

use kamusi_client::{ClientHandle, HealthPoller};
use kamusi_core::{update, AppState, Language, Msg, SearchForm, TOP_K_CHOICES};
use kamusi_logging::kamusi_debug;

use super::effects::EffectRunner;
use super::render::TerminalRenderer;

const POLL_INTERVAL: Duration = Duration::from_millis(75);

/// Owns the core state and drives it with messages from the user and the
/// client, rendering whenever the state reports itself dirty.
pub struct Session<W: Write> {
    state: AppState,
    runner: EffectRunner,
    renderer: TerminalRenderer<W>,
}

impl<W: Write> Session<W> {
    pub fn new(form: SearchForm, client: ClientHandle, out: W) -> Self {
        Self {
            state: AppState::with_form(form),
            runner: EffectRunner::new(client),
            renderer: TerminalRenderer::new(out),
        }
    }

    pub fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;

        self.runner.enqueue(effects);
        if was_dirty {
            self.renderer.render(&view)?;
        }
        Ok(())
    }

    /// Submits `query` and pumps client events until the stream ends.
    /// Returns the error message if the query failed.
    pub fn search(&mut self, query: &str) -> io::Result<Option<String>> {
        self.dispatch(Msg::QueryChanged(query.to_string()))?;
        self.renderer.reset_query();
        self.dispatch(Msg::SearchSubmitted)?;
        while self.state.is_loading() {
            let msg = self.runner.next_msg(POLL_INTERVAL).unwrap_or(Msg::Tick);
            self.dispatch(msg)?;
        }
        Ok(self.state.error().map(ToOwned::to_owned))
    }

    /// Applies whatever the client has already delivered.
    pub fn drain(&mut self) -> io::Result<()> {
        while let Some(msg) = self.runner.try_next_msg() {
            self.dispatch(msg)?;
        }
        Ok(())
    }

    pub fn check_health(&mut self) -> io::Result<()> {
        self.renderer.show_health(true);
        self.runner.check_health();
        while self.state.health().is_none() {
            match self.runner.next_msg(POLL_INTERVAL) {
                Some(Msg::HealthFailed(message)) => {
                    return Err(io::Error::other(message));
                }
                Some(msg) => self.dispatch(msg)?,
                None => {}
            }
        }
        Ok(())
    }

    pub fn poll_health(&mut self, interval: Duration) -> HealthPoller {
        self.renderer.show_health(true);
        self.runner.poll_health(interval)
    }

    /// Blocks on health updates forever, printing each change.
    pub fn watch_health(&mut self, interval: Duration) -> io::Result<()> {
        let _poller = self.poll_health(interval);
        loop {
            if let Some(msg) = self.runner.next_msg(POLL_INTERVAL) {
                if let Msg::HealthFailed(message) = &msg {
                    eprintln!("Health check failed: {message}");
                }
                self.dispatch(msg)?;
            }
        }
    }
}

/// Line-oriented loop: each line is a query; `:`-prefixed lines adjust the form.
pub fn run_interactive<W: Write>(
    session: &mut Session<W>,
    health_interval: Duration,
) -> io::Result<()> {
    let _poller = session.poll_health(health_interval);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Kamusi interactive search. Type :help for commands, :quit to exit.");
    loop {
        session.drain()?;
        print!("kamusi> ");
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        session.drain()?;
        match parse_line(&line) {
            Input::Quit => break,
            Input::Empty => {}
            Input::Help => println!("{HELP}"),
            Input::Form(msg) => session.dispatch(msg)?,
            Input::Invalid(message) => println!("{message}"),
            Input::Query(query) => {
                if let Some(error) = session.search(&query)? {
                    kamusi_debug!("Interactive query failed: {}", error);
                }
            }
        }
    }
    Ok(())
}

const HELP: &str = "\
:k <3|5>            entries to retrieve
:lang <auto|sw|en>  query language
:steps <on|off>     show pipeline steps
:quit               exit";

#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Quit,
    Help,
    Form(Msg),
    Invalid(String),
    Query(String),
}

fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Input::Query(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("q" | "quit" | "exit"), _) => Input::Quit,
        (Some("help"), _) => Input::Help,
        (Some("k"), Some(value)) => match value.parse::<u32>() {
            Ok(k) if TOP_K_CHOICES.contains(&k) => Input::Form(Msg::TopKChanged(k)),
            _ => Input::Invalid(format!("k must be one of {:?}", TOP_K_CHOICES)),
        },
        (Some("lang"), Some(value)) => match value.parse::<Language>() {
            Ok(language) => Input::Form(Msg::LanguageChanged(language)),
            Err(message) => Input::Invalid(message),
        },
        (Some("steps"), Some("on")) => Input::Form(Msg::PipelineStepsToggled(true)),
        (Some("steps"), Some("off")) => Input::Form(Msg::PipelineStepsToggled(false)),
        _ => Input::Invalid(format!("unknown command ':{command}', try :help")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_queries_and_commands() {
        assert_eq!(parse_line("  "), Input::Empty);
        assert_eq!(parse_line(" chakula "), Input::Query("chakula".into()));
        assert_eq!(parse_line(":quit"), Input::Quit);
        assert_eq!(parse_line(":k 5"), Input::Form(Msg::TopKChanged(5)));
        assert!(matches!(parse_line(":k 4"), Input::Invalid(_)));
        assert_eq!(
            parse_line(":lang sw"),
            Input::Form(Msg::LanguageChanged(Language::Swahili))
        );
        assert_eq!(
            parse_line(":steps off"),
            Input::Form(Msg::PipelineStepsToggled(false))
        );
        assert!(matches!(parse_line(":frobnicate"), Input::Invalid(_)));
    }
}
