use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "kindview",
    bin_name = "kindview",
    version = get_version(),
    disable_help_flag = true,
    disable_help_subcommand = true
)]
#[command(about = "Page through the kinds of a Datastore emulator or entity dump", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Browse a JSON entity dump instead of the emulator
    #[arg(long, global = true, value_name = "PATH", help_heading = "Options")]
    pub data_file: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true, value_name = "PATH", help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Project id on the emulator
    #[arg(long, global = true, help_heading = "Options")]
    pub project: Option<String>,

    /// Base URL of the emulator's REST endpoint
    #[arg(long, global = true, value_name = "URL", help_heading = "Options")]
    pub host: Option<String>,

    /// Namespace to browse
    #[arg(long, global = true, help_heading = "Options")]
    pub namespace: Option<String>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Silence all logging
    #[arg(short, long, global = true, conflicts_with = "verbose", help_heading = "Options")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, help_heading = "Options")]
    pub no_color: bool,

    /// Print help
    #[arg(short, long, global = true)]
    pub help: bool,
}

/// Command group definitions for help output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Browse,
    Misc,
}

impl CommandGroup {
    pub fn heading(&self) -> &'static str {
        match self {
            CommandGroup::Browse => "Browse Commands:",
            CommandGroup::Misc => "Miscellaneous:",
        }
    }

    /// Returns the group for a given command name
    pub fn for_command(name: &str) -> Option<Self> {
        match name {
            "kinds" | "show" | "browse" => Some(CommandGroup::Browse),
            "config" | "help" => Some(CommandGroup::Misc),
            _ => None,
        }
    }

    /// Returns all groups in display order
    pub fn all() -> &'static [CommandGroup] {
        &[CommandGroup::Browse, CommandGroup::Misc]
    }
}

/// Returns the custom grouped help output as a string
pub fn get_grouped_help() -> String {
    let cmd = Cli::command();
    let version = cmd.get_version().unwrap_or("unknown");

    let mut output = String::new();
    output.push_str(&format!("kindview {version}\n"));
    output.push_str("Page through the kinds of a Datastore emulator or entity dump\n");
    output.push('\n');
    output.push_str("Usage: kindview [OPTIONS] [COMMAND]\n");

    let subcommands: Vec<_> = cmd.get_subcommands().collect();

    for group in CommandGroup::all() {
        let group_cmds: Vec<_> = subcommands
            .iter()
            .filter(|sc| {
                !sc.is_hide_set() && CommandGroup::for_command(sc.get_name()) == Some(*group)
            })
            .collect();

        if !group_cmds.is_empty() {
            output.push('\n');
            output.push_str(&format!("{}\n", group.heading()));
            for sc in group_cmds {
                let name = sc.get_name();
                let about = sc.get_about().map(|s| s.to_string()).unwrap_or_default();
                output.push_str(&format!("  {:<12} {}\n", name, about));
            }
        }
    }

    output.push('\n');
    output.push_str("Options:\n");
    output.push_str("      --data-file <PATH>  Browse a JSON entity dump instead of the emulator\n");
    output.push_str("      --config <PATH>     Use this config file instead of the default one\n");
    output.push_str("      --project <ID>      Project id on the emulator\n");
    output.push_str("      --host <URL>        Base URL of the emulator's REST endpoint\n");
    output.push_str("      --namespace <NS>    Namespace to browse\n");
    output.push_str("  -v, --verbose           Verbose output (debug logging)\n");
    output.push_str("  -q, --quiet             Silence all logging\n");
    output.push_str("      --no-color          Disable colored output\n");
    output.push_str("  -h, --help              Print help\n");
    output.push_str("  -V, --version           Print version\n");

    output
}

pub fn print_grouped_help() {
    print!("{}", get_grouped_help());
}

/// Prints help for a specific subcommand using clap's built-in rendering
pub fn print_subcommand_help(command: &Option<Commands>) {
    let subcommand_name = match command {
        Some(Commands::Browse(c)) => match c {
            BrowseCommands::Kinds => "kinds",
            BrowseCommands::Show { .. } => "show",
            BrowseCommands::Browse { .. } => "browse",
        },
        Some(Commands::Misc(c)) => match c {
            MiscCommands::Config { .. } => "config",
            MiscCommands::Help { .. } => "help",
        },
        None => {
            print_grouped_help();
            return;
        }
    };

    print_help_for_command(subcommand_name);
}

/// Prints help for a command by name
pub fn print_help_for_command(name: &str) {
    let mut cmd = Cli::command();

    for subcmd in cmd.get_subcommands_mut() {
        if subcmd.get_name() == name {
            let help = subcmd.render_help();
            print!("{}", help);
            return;
        }
    }

    eprintln!("Unknown command: {}", name);
    eprintln!();
    print_grouped_help();
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Browse(BrowseCommands),

    #[command(flatten)]
    Misc(MiscCommands),
}

#[derive(Subcommand, Debug)]
pub enum BrowseCommands {
    /// List the kinds in the store
    #[command(alias = "ls", display_order = 1)]
    Kinds,

    /// Print one page of a kind
    #[command(alias = "s", display_order = 2)]
    Show {
        /// Kind to show
        kind: String,

        /// Property to sort by (descending unless --asc)
        #[arg(long, value_name = "PROPERTY")]
        sort: Option<String>,

        /// Sort descending (default when --sort is given)
        #[arg(long, requires = "sort", conflicts_with = "asc")]
        desc: bool,

        /// Sort ascending
        #[arg(long, requires = "sort")]
        asc: bool,

        /// Page to show, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Rows per page (overrides the configured page size)
        #[arg(long, value_name = "ROWS")]
        page_size: Option<usize>,

        /// Print the page as JSON entities instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Page through a kind interactively
    #[command(alias = "b", display_order = 3)]
    Browse {
        /// Kind to open right away
        kind: Option<String>,

        /// Rows per page (overrides the configured page size)
        #[arg(long, value_name = "ROWS")]
        page_size: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MiscCommands {
    /// Get or set configuration
    #[command(display_order = 30)]
    Config {
        /// Configuration key (e.g., page-size, project, data-file)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },

    /// Print help for kindview or a subcommand
    #[command(display_order = 31)]
    Help {
        /// Subcommand to get help for
        command: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show_with_sort() {
        let cli = Cli::try_parse_from([
            "kindview", "show", "Fruit", "--sort", "weight", "--asc", "--page", "2",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Browse(BrowseCommands::Show {
                kind,
                sort,
                asc,
                desc,
                page,
                page_size,
                json,
            })) => {
                assert_eq!(kind, "Fruit");
                assert_eq!(sort.as_deref(), Some("weight"));
                assert!(asc);
                assert!(!desc);
                assert_eq!(page, 2);
                assert!(page_size.is_none());
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn direction_flags_need_a_sort_key() {
        assert!(Cli::try_parse_from(["kindview", "show", "Fruit", "--asc"]).is_err());
        assert!(
            Cli::try_parse_from(["kindview", "show", "Fruit", "--sort", "w", "--asc", "--desc"])
                .is_err()
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["kindview", "kinds", "--data-file", "dump.json", "-q"]).unwrap();
        assert_eq!(cli.data_file, Some(PathBuf::from("dump.json")));
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Some(Commands::Browse(BrowseCommands::Kinds))
        ));
    }

    #[test]
    fn grouped_help_lists_every_group() {
        let help = get_grouped_help();
        assert!(help.contains("Browse Commands:"));
        assert!(help.contains("Miscellaneous:"));
        assert!(help.contains("show"));
        assert!(help.contains("config"));
    }
}
