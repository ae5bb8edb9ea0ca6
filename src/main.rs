mod app;
mod cli;
mod domain;
mod infra;
mod ui;

use crate::app::{AppCommand, AppError, AppEvent, AppModel, BackendEvent};
use crate::cli::CliInvocation;
use crate::domain::FileId;
use crate::infra::{
    ApiError, AppConfig, BackendClient, LogTarget, copy_text_to_clipboard, init_logging,
    run_analysis,
};
use crossterm::event::{
    self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    Event, KeyEventKind,
};
use crossterm::terminal::size as terminal_size;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::sync::mpsc::{Sender, channel};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui { api, file } => Ok(run_tui(api.as_deref(), file)?),
        CliInvocation::Command { api, command } => {
            let config = load_config(api.as_deref())?;
            let _logging =
                init_logging(&config.log_dir, LogTarget::FileAndStderr).map_err(AppError::from)?;
            crate::cli::run(command, &config)?;
            Ok(())
        }
    }
}

fn print_help() {
    let text = crate::cli::help_text(env!("CARGO_PKG_NAME"));
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}

fn load_config(api: Option<&str>) -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    Ok(match api {
        Some(url) => config.with_api_url(url)?,
        None => config,
    })
}

fn run_tui(api: Option<&str>, file: Option<FileId>) -> Result<(), AppError> {
    let config = load_config(api)?;
    let logging = init_logging(&config.log_dir, LogTarget::FileOnly)?;
    info!(
        api = %config.api_base_url,
        log = %logging.log_path.display(),
        "starting tui"
    );

    let client = BackendClient::new(&config.api_base_url, config.request_timeout);
    let mut model = AppModel::new(config.api_base_url.clone(), config.per_page);
    let mut terminal = setup_terminal()?;
    if let Ok(size) = terminal_size() {
        model.terminal_size = size;
    }
    let result = run(&mut terminal, &mut model, &client, file);
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let _ = stdout.execute(EnableBracketedPaste);
    let _ = stdout.execute(EnableMouseCapture);
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), AppError> {
    disable_raw_mode()?;
    let _ = execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        DisableMouseCapture
    );
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    model: &mut AppModel,
    client: &BackendClient,
    file: Option<FileId>,
) -> Result<(), AppError> {
    let (backend_tx, backend_rx) = channel::<BackendEvent>();

    let command = app::startup(model, file);
    if execute_command(command, model, client, &backend_tx) == Flow::Quit {
        return Ok(());
    }

    loop {
        while let Ok(signal) = backend_rx.try_recv() {
            let command = dispatch(model, AppEvent::Backend(signal));
            if execute_command(command, model, client, &backend_tx) == Flow::Quit {
                return Ok(());
            }
        }

        terminal.draw(|frame| ui::render(frame, model))?;

        if event::poll(Duration::from_millis(100))? {
            let command = match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    dispatch(model, AppEvent::Key(key))
                }
                Event::Paste(text) => dispatch(model, AppEvent::Paste(text)),
                Event::Mouse(mouse) => dispatch(model, AppEvent::Mouse(mouse)),
                Event::Resize(width, height) => {
                    model.terminal_size = (width, height);
                    AppCommand::None
                }
                _ => AppCommand::None,
            };
            if execute_command(command, model, client, &backend_tx) == Flow::Quit {
                return Ok(());
            }
        }
    }
}

fn dispatch(model: &mut AppModel, event: AppEvent) -> AppCommand {
    let (next, command) = app::update(model.clone(), event);
    *model = next;
    command
}

fn execute_command(
    command: AppCommand,
    model: &mut AppModel,
    client: &BackendClient,
    tx: &Sender<BackendEvent>,
) -> Flow {
    match command {
        AppCommand::None => {}
        AppCommand::Quit => return Flow::Quit,
        AppCommand::LoadFiles => {
            spawn_request(client, tx, |client| {
                BackendEvent::FilesLoaded(client.list_files().map_err(report))
            });
        }
        AppCommand::FetchConfig => {
            spawn_request(client, tx, |client| {
                BackendEvent::ConfigLoaded(client.fetch_config().map_err(report))
            });
        }
        AppCommand::FetchPage(request) => {
            spawn_request(client, tx, move |client| BackendEvent::PageLoaded {
                seq: request.seq,
                result: client
                    .fetch_entries(request.file_id, request.page, request.per_page)
                    .map_err(report),
            });
        }
        AppCommand::FetchSuggestions { file_id } => {
            spawn_request(client, tx, move |client| BackendEvent::SuggestionsLoaded {
                file_id,
                result: client.fetch_suggestions(file_id).map_err(report),
            });
        }
        AppCommand::Analyze(ticket) => {
            spawn_request(client, tx, move |client| BackendEvent::AnalysisFinished {
                seq: ticket.seq,
                result: run_analysis(client, &ticket.request),
            });
        }
        AppCommand::FetchHistory { file_id } => {
            spawn_request(client, tx, move |client| BackendEvent::HistoryLoaded {
                file_id,
                result: client.fetch_history(file_id).map_err(report),
            });
        }
        AppCommand::CopyResult => {
            let notice = match model.analysis.result() {
                Some(result) => match copy_text_to_clipboard(&ui::result_plain_text(result)) {
                    Ok(()) => "Copied analysis to clipboard.".to_string(),
                    Err(error) => {
                        warn!(%error, "copy to clipboard failed");
                        format!("Copy failed: {error}")
                    }
                },
                None => "No analysis result to copy yet.".to_string(),
            };
            model.notice = Some(notice);
        }
        AppCommand::Batch(commands) => {
            for command in commands {
                if execute_command(command, model, client, tx) == Flow::Quit {
                    return Flow::Quit;
                }
            }
        }
    }
    Flow::Continue
}

/// Runs one blocking request on its own thread and posts the outcome back
/// to the event loop.
fn spawn_request<F>(client: &BackendClient, tx: &Sender<BackendEvent>, job: F)
where
    F: FnOnce(&BackendClient) -> BackendEvent + Send + 'static,
{
    let client = client.clone();
    let tx = tx.clone();
    std::thread::spawn(move || {
        let _ = tx.send(job(&client));
    });
}

fn report(error: ApiError) -> String {
    warn!(%error, "backend request failed");
    error.user_message()
}
