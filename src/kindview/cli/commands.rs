use super::render::{
    render_browse_help, render_config, render_kinds, render_messages, render_page,
    render_page_json, use_color, Message,
};
use super::setup::{
    print_grouped_help, print_help_for_command, print_subcommand_help, BrowseCommands, Cli,
    Commands, MiscCommands,
};
use clap::Parser;
use kindview::api::BrowserApi;
use kindview::config::{default_config_dir, BrowserConfig};
use kindview::controller::PageView;
use kindview::error::{BrowseError, Result};
use kindview::model::SortDirection;
use kindview::store::emulator::EmulatorStore;
use kindview::store::fs::FileStore;
use kindview::store::DataStore;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const CONFIG_FILENAME: &str = "config.json";
const PROMPT: &str = "kindview> ";

struct AppContext {
    /// Effective settings: config file plus command-line overrides.
    config: BrowserConfig,
    config_path: Option<PathBuf>,
    use_color: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.help {
        if cli.command.is_none() {
            print_grouped_help();
        } else {
            print_subcommand_help(&cli.command);
        }
        return Ok(());
    }

    init_tracing(cli.quiet, cli.verbose);
    let ctx = init_context(&cli)?;

    match cli.command {
        Some(Commands::Browse(cmd)) => match cmd {
            BrowseCommands::Kinds => handle_kinds(&ctx),
            BrowseCommands::Show {
                kind,
                sort,
                desc: _,
                asc,
                page,
                page_size,
                json,
            } => {
                let request = ShowRequest {
                    kind: &kind,
                    sort: sort.as_deref(),
                    ascending: asc,
                    page,
                    page_size,
                    json,
                };
                handle_show(&ctx, &request)
            }
            BrowseCommands::Browse { kind, page_size } => handle_browse(&ctx, kind, page_size),
        },
        Some(Commands::Misc(cmd)) => match cmd {
            MiscCommands::Config { key, value } => handle_config(&ctx, key, value),
            MiscCommands::Help { command } => handle_help(command),
        },
        None => handle_kinds(&ctx),
    }
}

/// Logs go to stderr: `--quiet` silences them, `--verbose` shows debug output,
/// otherwise `RUST_LOG` applies with `warn` as the fallback.
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("kindview=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| default_config_dir().map(|dir| dir.join(CONFIG_FILENAME)));

    let mut config = match &config_path {
        Some(path) => BrowserConfig::load_file(path)?,
        None => BrowserConfig::default(),
    };

    if let Some(data_file) = &cli.data_file {
        config.data_file = Some(data_file.clone());
    }
    if let Some(project) = &cli.project {
        config.project_id = project.clone();
    }
    if let Some(host) = &cli.host {
        config.datastore_host = host.clone();
    }
    if let Some(namespace) = &cli.namespace {
        config.namespace = Some(namespace.clone());
    }

    Ok(AppContext {
        config,
        config_path,
        use_color: use_color(cli.no_color),
    })
}

fn open_store(config: &BrowserConfig) -> Result<Box<dyn DataStore>> {
    match &config.data_file {
        Some(path) => {
            tracing::debug!(path = %path.display(), "browsing dump file");
            Ok(Box::new(FileStore::new(path)))
        }
        None => Ok(Box::new(EmulatorStore::new(config)?)),
    }
}

fn resolve_page_size(requested: Option<usize>, config: &BrowserConfig) -> Result<usize> {
    match requested.unwrap_or(config.page_size) {
        0 => Err(BrowseError::Config(
            "page size must be a positive number".to_string(),
        )),
        size => Ok(size),
    }
}

fn handle_kinds(ctx: &AppContext) -> Result<()> {
    let store = open_store(&ctx.config)?;
    let kinds = store.list_kinds()?;
    print!("{}", render_kinds(&kinds, ctx.use_color));
    Ok(())
}

struct ShowRequest<'a> {
    kind: &'a str,
    sort: Option<&'a str>,
    ascending: bool,
    page: usize,
    page_size: Option<usize>,
    json: bool,
}

fn handle_show(ctx: &AppContext, request: &ShowRequest) -> Result<()> {
    if request.page == 0 {
        return Err(BrowseError::Config("pages start at 1".to_string()));
    }
    let page_size = resolve_page_size(request.page_size, &ctx.config)?;
    let mut api = BrowserApi::new(open_store(&ctx.config)?, page_size);

    let direction = if request.ascending {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    let sort = request.sort.map(|property| (property, direction));
    let view = api.open(request.kind, sort, request.page)?;

    if request.json {
        println!("{}", render_page_json(&view, &api.display_records())?);
    } else {
        print!("{}", render_page(&view, ctx.use_color));
    }
    Ok(())
}

/// One parsed line of the interactive browser.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseAction {
    Next,
    Prev,
    Sort(String),
    Kind(String),
    Kinds,
    Refresh,
    Help,
    Quit,
    Nothing,
    Invalid(String),
}

fn parse_action(line: &str) -> BrowseAction {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return BrowseAction::Nothing;
    };
    let argument = parts.collect::<Vec<_>>().join(" ");

    match (command, argument.is_empty()) {
        ("n" | "next", _) => BrowseAction::Next,
        ("p" | "prev", _) => BrowseAction::Prev,
        ("s" | "sort", false) => BrowseAction::Sort(argument),
        ("s" | "sort", true) => BrowseAction::Invalid("usage: sort <property>".to_string()),
        ("k" | "kind", false) => BrowseAction::Kind(argument),
        ("k" | "kind", true) => BrowseAction::Invalid("usage: kind <kind>".to_string()),
        ("kinds", _) => BrowseAction::Kinds,
        ("r" | "refresh", _) => BrowseAction::Refresh,
        ("h" | "help" | "?", _) => BrowseAction::Help,
        ("q" | "quit" | "exit", _) => BrowseAction::Quit,
        (other, _) => BrowseAction::Invalid(format!("unknown command '{other}', try 'help'")),
    }
}

fn handle_browse(ctx: &AppContext, kind: Option<String>, page_size: Option<usize>) -> Result<()> {
    let page_size = resolve_page_size(page_size, &ctx.config)?;
    let mut api = BrowserApi::new(open_store(&ctx.config)?, page_size);
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    browse_session(
        &mut api,
        kind,
        stdin.lock(),
        &mut io::stdout(),
        interactive,
        ctx.use_color,
    )
}

/// Runs the line-command loop until `quit` or end of input.
///
/// Paging errors are reported and the session carries on with its state intact.
fn browse_session<S: DataStore, R: BufRead, W: Write>(
    api: &mut BrowserApi<S>,
    kind: Option<String>,
    input: R,
    out: &mut W,
    interactive: bool,
    use_color: bool,
) -> Result<()> {
    match kind {
        Some(kind) => show_result(out, api.select_kind(&kind), use_color)?,
        None => {
            write!(out, "{}", render_kinds(&api.list_kinds()?, use_color))?;
            write!(out, "{}", render_browse_help(use_color))?;
        }
    }

    let mut lines = input.lines();
    loop {
        if interactive {
            write!(out, "{PROMPT}")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let result = match parse_action(&line) {
            BrowseAction::Nothing => continue,
            BrowseAction::Quit => break,
            BrowseAction::Next => api.next_page(),
            BrowseAction::Prev => api.prev_page(),
            BrowseAction::Sort(property) => api.toggle_sort(&property),
            BrowseAction::Kind(kind) => api.select_kind(&kind),
            BrowseAction::Refresh => api.view(),
            BrowseAction::Kinds => {
                match api.list_kinds() {
                    Ok(kinds) => write!(out, "{}", render_kinds(&kinds, use_color))?,
                    Err(e) => report(out, &e, use_color)?,
                }
                continue;
            }
            BrowseAction::Help => {
                write!(out, "{}", render_browse_help(use_color))?;
                continue;
            }
            BrowseAction::Invalid(message) => {
                write!(out, "{}", render_messages(&[Message::warning(message)], use_color))?;
                continue;
            }
        };
        show_result(out, result, use_color)?;
    }
    Ok(())
}

fn show_result<W: Write>(out: &mut W, result: Result<PageView>, use_color: bool) -> Result<()> {
    match result {
        Ok(view) => write!(out, "{}", render_page(&view, use_color))?,
        Err(e) => report(out, &e, use_color)?,
    }
    Ok(())
}

fn report<W: Write>(out: &mut W, error: &BrowseError, use_color: bool) -> Result<()> {
    let message = match error {
        BrowseError::InvalidPageState(reason) => Message::warning(reason.clone()),
        BrowseError::NoKindSelected => Message::warning("select a kind first: kind <kind>"),
        other => Message::error(other.to_string()),
    };
    write!(out, "{}", render_messages(&[message], use_color))?;
    Ok(())
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let stored = match &ctx.config_path {
        Some(path) => BrowserConfig::load_file(path)?,
        None => BrowserConfig::default(),
    };

    match (key, value) {
        (None, _) => {
            print!("{}", render_config(&ctx.config.entries(), ctx.use_color));
        }
        (Some(key), None) => {
            let value = ctx
                .config
                .get(&key)
                .ok_or_else(|| BrowseError::Config(format!("Unknown config key: {key}")))?;
            println!("{}", value);
        }
        (Some(key), Some(value)) => {
            let path = ctx.config_path.as_ref().ok_or_else(|| {
                BrowseError::Config("no config directory available; pass --config".to_string())
            })?;
            let mut config = stored;
            config.set(&key, &value)?;
            config.save_file(path)?;
            let shown = config.get(&key).unwrap_or(value);
            let message = if shown.is_empty() {
                Message::info(format!("{key} cleared"))
            } else {
                Message::success(format!("{key} set to {shown}"))
            };
            print!("{}", render_messages(&[message], ctx.use_color));
        }
    }
    Ok(())
}

fn handle_help(command: Option<String>) -> Result<()> {
    match command {
        Some(name) => print_help_for_command(&name),
        None => print_grouped_help(),
    }
    Ok(())
}
