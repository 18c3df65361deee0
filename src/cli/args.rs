use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lazypick",
    version,
    about = "lazily-paged record browser with cross-page bulk selection",
    long_about = "lazypick pages through a remote record listing one page at a time and lets you select the first N records, even ones on pages that have not been fetched yet, on top of rows you toggle by hand.\n\nExamples:\n  lazypick\n  lazypick --page-size 24 --policy merge\n  lazypick --offline 100\n  lazypick --config ~/.lazypick/config.yml\n\nTip: Use --init-config to write a commented config file you can edit."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.lazypick/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write the default config file if it does not exist, then exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "base-url",
        value_name = "URL",
        help_heading = "Source",
        help = "Listing endpoint to page through."
    )]
    pub base_url: Option<String>,

    #[arg(
        long = "off",
        visible_alias = "offline",
        value_name = "N",
        help_heading = "Source",
        help = "Browse N generated records instead of the remote source."
    )]
    pub offline: Option<u64>,

    #[arg(
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'r',
        long = "rt",
        visible_alias = "rate",
        value_name = "RPS",
        help_heading = "HTTP",
        help = "Page fetch rate limit (requests per second)."
    )]
    pub rate: Option<u32>,

    #[arg(
        short = 'n',
        long = "ps",
        visible_alias = "page-size",
        value_name = "ROWS",
        help_heading = "Selection",
        help = "Rows per page."
    )]
    pub page_size: Option<usize>,

    #[arg(
        short = 'p',
        long = "pol",
        visible_alias = "policy",
        value_name = "POLICY",
        help_heading = "Selection",
        help = "What a bulk count does to manual toggles: reset or merge."
    )]
    pub policy: Option<String>,

    #[arg(
        short = 's',
        long = "sel",
        visible_alias = "select",
        value_name = "N",
        help_heading = "Selection",
        help = "Select the first N records on startup."
    )]
    pub select: Option<String>,
}
