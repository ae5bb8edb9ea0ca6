use crate::domain::{
    AnalysisRequest, AnalysisResult, EntryFilter, FileId, LogEntry, MIN_SELECTION_CHARS,
    filter_entries, qualify_selection,
};
use crate::infra::{ApiError, AppConfig, BackendClient, run_analysis};
use std::io::{self, Read, Write};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing::info;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui {
        api: Option<String>,
        file: Option<FileId>,
    },
    Command {
        api: Option<String>,
        command: CliCommand,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TextSource {
    Inline(String),
    Stdin,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Files,
    Entries {
        file_id: FileId,
        page: u64,
        per_page: Option<u64>,
        search: Option<String>,
        level: Option<String>,
    },
    Analyze {
        file_id: FileId,
        text: TextSource,
        issue: Option<String>,
    },
    Suggestions {
        file_id: FileId,
    },
    Config,
    History {
        file_id: FileId,
    },
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut iter = args.iter().skip(1).peekable();
    let mut api: Option<String> = None;
    let mut file: Option<FileId> = None;
    while let Some(arg) = iter.peek() {
        match arg.as_str() {
            "--api" => {
                let _ = iter.next();
                api = Some(take_value(&mut iter, "--api")?.to_string());
            }
            "--file" | "-f" => {
                let _ = iter.next();
                let value = take_value(&mut iter, "--file")?;
                file = Some(parse_file_id("--file", value)?);
            }
            "--" => {
                let _ = iter.next();
                break;
            }
            other if other.starts_with('-') => {
                return Err(CliParseError::UnknownFlag(other.to_string()));
            }
            _ => break,
        }
    }

    let Some(subcommand) = iter.next() else {
        return Ok(CliInvocation::Tui { api, file });
    };
    if file.is_some() {
        return Err(CliParseError::UnexpectedArgument("--file".to_string()));
    }

    let command = match subcommand.as_str() {
        "files" => {
            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--api" => api = Some(take_value(&mut args, "--api")?.to_string()),
                    _ => return Err(unexpected(arg)),
                }
            }
            CliCommand::Files
        }
        "entries" => {
            let mut file_id: Option<FileId> = None;
            let mut page = 1u64;
            let mut per_page: Option<u64> = None;
            let mut search: Option<String> = None;
            let mut level: Option<String> = None;

            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--api" => api = Some(take_value(&mut args, "--api")?.to_string()),
                    "--page" | "-p" => {
                        let value = take_value(&mut args, "--page")?;
                        page = parse_positive_flag("--page", value)?;
                    }
                    "--per-page" => {
                        let value = take_value(&mut args, "--per-page")?;
                        per_page = Some(parse_positive_flag("--per-page", value)?);
                    }
                    "--search" | "-s" => {
                        let value = take_value(&mut args, "--search")?;
                        search = Some(value.to_string()).filter(|value| !value.trim().is_empty());
                    }
                    "--level" | "-l" => {
                        let value = take_value(&mut args, "--level")?;
                        level = parse_level_flag("--level", value)?;
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => {
                        if file_id.is_some() {
                            return Err(CliParseError::UnexpectedArgument(arg.to_string()));
                        }
                        file_id = Some(parse_file_id("FILE_ID", arg)?);
                    }
                }
            }

            CliCommand::Entries {
                file_id: require_file_id(file_id)?,
                page,
                per_page,
                search,
                level,
            }
        }
        "analyze" => {
            let mut file_id: Option<FileId> = None;
            let mut text: Option<TextSource> = None;
            let mut issue: Option<String> = None;

            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--api" => api = Some(take_value(&mut args, "--api")?.to_string()),
                    "--text" | "-t" => {
                        let value = take_value(&mut args, "--text")?;
                        if text.is_some() {
                            return Err(CliParseError::UnexpectedArgument("--text".to_string()));
                        }
                        text = Some(TextSource::Inline(value.to_string()));
                    }
                    "--issue" | "-i" => {
                        let value = take_value(&mut args, "--issue")?;
                        issue = Some(value.trim().to_string()).filter(|value| !value.is_empty());
                    }
                    "-" => {
                        if text.is_some() {
                            return Err(CliParseError::UnexpectedArgument("-".to_string()));
                        }
                        text = Some(TextSource::Stdin);
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => {
                        if file_id.is_some() {
                            return Err(CliParseError::UnexpectedArgument(arg.to_string()));
                        }
                        file_id = Some(parse_file_id("FILE_ID", arg)?);
                    }
                }
            }

            let file_id = require_file_id(file_id)?;
            let text = text.ok_or_else(|| CliParseError::MissingArgument("--text".to_string()))?;
            CliCommand::Analyze {
                file_id,
                text,
                issue,
            }
        }
        "suggestions" | "history" => {
            let mut file_id: Option<FileId> = None;
            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--api" => api = Some(take_value(&mut args, "--api")?.to_string()),
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => {
                        if file_id.is_some() {
                            return Err(CliParseError::UnexpectedArgument(arg.to_string()));
                        }
                        file_id = Some(parse_file_id("FILE_ID", arg)?);
                    }
                }
            }
            let file_id = require_file_id(file_id)?;
            if subcommand == "history" {
                CliCommand::History { file_id }
            } else {
                CliCommand::Suggestions { file_id }
            }
        }
        "config" => {
            let mut args = iter.peekable();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--api" => api = Some(take_value(&mut args, "--api")?.to_string()),
                    _ => return Err(unexpected(arg)),
                }
            }
            CliCommand::Config
        }
        other => return Err(CliParseError::UnknownSubcommand(other.to_string())),
    };

    Ok(CliInvocation::Command { api, command })
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),

    #[error("failed to read text from stdin: {0}")]
    ReadStdin(#[source] io::Error),

    #[error(
        "text is too short to analyze: it needs more than {} characters after trimming",
        MIN_SELECTION_CHARS
    )]
    TextTooShort,

    #[error("{0}")]
    AnalysisFailed(String),

    #[error(transparent)]
    WriteOutput(#[from] io::Error),
}

pub fn run(command: CliCommand, config: &AppConfig) -> Result<(), CliRunError> {
    let client = BackendClient::new(&config.api_base_url, config.request_timeout);
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let stderr = io::stderr();
    let mut err = io::BufWriter::new(stderr.lock());

    match command {
        CliCommand::Files => {
            let files = client.list_files()?;
            for file in &files {
                let line = format!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    file.id,
                    file.display_name(),
                    file.file_size,
                    file.log_type.as_deref().unwrap_or("-"),
                    file.entry_count,
                    if file.processed { "processed" } else { "pending" },
                );
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
            Ok(())
        }
        CliCommand::Entries {
            file_id,
            page,
            per_page,
            search,
            level,
        } => {
            let per_page = per_page.unwrap_or(config.per_page);
            let fetched = client.fetch_entries(file_id, page, per_page)?;
            let filter = EntryFilter {
                search: search.unwrap_or_default(),
                level,
            };
            let visible = filter_entries(&fetched.entries, &filter);
            for entry in &visible {
                if !write_line(&mut out, &entry_line(entry))? {
                    return Ok(());
                }
            }
            out.flush()?;

            let pagination = fetched.pagination;
            let summary = format!(
                "page {}/{}: showing {} of {} on this page, {} entries total",
                pagination.page,
                pagination.pages.max(1),
                visible.len(),
                fetched.entries.len(),
                pagination.total,
            );
            write_line(&mut err, &summary)?;
            Ok(())
        }
        CliCommand::Analyze {
            file_id,
            text,
            issue,
        } => {
            let text = match text {
                TextSource::Inline(text) => text,
                TextSource::Stdin => read_stdin()?,
            };
            let text = qualify_selection(&text).ok_or(CliRunError::TextTooShort)?;
            info!(%file_id, chars = text.chars().count(), "analyze from cli");

            let request = AnalysisRequest {
                text,
                file_id,
                issue_description: issue,
            };
            let result = run_analysis(&client, &request);
            if let AnalysisResult::Failure { error_message } = result {
                return Err(CliRunError::AnalysisFailed(error_message));
            }
            for line in crate::ui::result_plain_text(&result).lines() {
                if !write_line(&mut out, line)? {
                    return Ok(());
                }
            }
            Ok(())
        }
        CliCommand::Suggestions { file_id } => {
            for suggestion in client.fetch_suggestions(file_id)? {
                if !write_line(&mut out, &single_line(&suggestion))? {
                    return Ok(());
                }
            }
            Ok(())
        }
        CliCommand::Config => {
            let analysis = client.fetch_config()?;
            let lines = [
                format!("api_url\t{}", client.base_url()),
                format!("configured\t{}", analysis.configured),
                format!("provider\t{}", analysis.provider.as_deref().unwrap_or("-")),
                format!("model\t{}", analysis.model.as_deref().unwrap_or("-")),
                format!("per_page\t{}", config.per_page),
                format!("timeout_secs\t{}", config.request_timeout.as_secs()),
                format!("log_dir\t{}", config.log_dir.display()),
            ];
            for line in lines {
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
            Ok(())
        }
        CliCommand::History { file_id } => {
            for item in client.fetch_history(file_id)? {
                let line = format!(
                    "{}\t{}\t{}",
                    item.id,
                    item.created_at.as_deref().unwrap_or("-"),
                    single_line(&item.analysis_summary),
                );
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
            Ok(())
        }
    }
}

pub fn help_text(name: &str) -> String {
    format!(
        "{name} - browse log files and ask for analysis of selected lines\n\n\
USAGE:\n  \
{name} [--api URL] [--file ID]          Start the TUI (optionally opening a file)\n  \
{name} files                            List uploaded log files\n  \
{name} entries FILE_ID [flags]          Print one page of entries\n  \
{name} analyze FILE_ID (--text TEXT | -) [--issue TEXT]  Analyze text (- reads stdin)\n  \
{name} suggestions FILE_ID              Print suggested questions for a file\n  \
{name} config                           Print analysis service configuration\n  \
{name} history FILE_ID                  Print past analyses for a file\n  \
{name} --help | --version\n\n\
ENTRIES FLAGS:\n  \
--page N        Page to fetch (default: 1)\n  \
--per-page N    Entries per page (default: config)\n  \
--search TEXT   Keep lines containing TEXT (this page only)\n  \
--level LEVEL   Keep lines whose level is exactly LEVEL (error, warning, fatal, ...)\n\n\
OUTPUT:\n  \
files:   id<TAB>name<TAB>size_bytes<TAB>type<TAB>entries<TAB>status\n  \
entries: line<TAB>timestamp<TAB>level<TAB>raw_line  (page summary on stderr)\n  \
history: id<TAB>created_at<TAB>summary\n\n\
ENV:\n  \
LOGSCOPE_API_URL       Backend base URL (default: http://127.0.0.1:5000/api)\n  \
LOGSCOPE_PER_PAGE      Entries per page (default: 100)\n  \
LOGSCOPE_TIMEOUT_SECS  Request timeout in seconds (default: 60)\n  \
LOGSCOPE_LOG_DIR       Directory for logscope.log (default: ~/.logscope/logs)\n  \
RUST_LOG               Log filter (default: info)\n"
    )
}

fn entry_line(entry: &LogEntry) -> String {
    let timestamp = entry
        .timestamp
        .and_then(|timestamp| timestamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t{}\t{}",
        entry.line_number,
        timestamp,
        entry.level.as_ref().map(|level| level.as_str()).unwrap_or("-"),
        entry.raw_line.trim_end(),
    )
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn read_stdin() -> Result<String, CliRunError> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .map_err(CliRunError::ReadStdin)?;
    Ok(text)
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}

fn take_value<'a, I>(args: &mut I, flag: &str) -> Result<&'a String, CliParseError>
where
    I: Iterator<Item = &'a String>,
{
    args.next()
        .ok_or_else(|| CliParseError::MissingFlagValue(flag.to_string()))
}

fn unexpected(arg: &str) -> CliParseError {
    if arg.starts_with('-') {
        CliParseError::UnknownFlag(arg.to_string())
    } else {
        CliParseError::UnexpectedArgument(arg.to_string())
    }
}

fn require_file_id(file_id: Option<FileId>) -> Result<FileId, CliParseError> {
    file_id.ok_or_else(|| CliParseError::MissingArgument("FILE_ID".to_string()))
}

fn parse_file_id(flag: &str, value: &str) -> Result<FileId, CliParseError> {
    FileId::parse(value).ok_or_else(|| CliParseError::InvalidFlagValue {
        flag: flag.to_string(),
        value: value.to_string(),
    })
}

fn parse_positive_flag(flag: &str, value: &str) -> Result<u64, CliParseError> {
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Levels are matched exactly, so `warn` and `warning` select different lines.
fn parse_level_flag(flag: &str, value: &str) -> Result<Option<String>, CliParseError> {
    let normalized = value.trim().to_ascii_uppercase();
    if normalized == "ALL" {
        return Ok(None);
    }
    if normalized.is_empty() || normalized.contains(char::is_whitespace) {
        return Err(CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        });
    }
    Ok(Some(normalized))
}
