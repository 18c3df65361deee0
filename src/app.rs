use std::future::Future;
use std::io::Write as _;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::browser::{Browser, BrowserOptions};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::intake::BulkIntake;
use crate::loader::LoadOutcome;
use crate::output::{self, StatusLine};
use crate::selection::BulkPolicy;
use crate::source::{Artwork, HttpSource, HttpSourceOptions, InlineSource, PageSource};

fn print_banner() {
    const BANNER: &str = r#"
    __                      _      __
   / /___ _____  __  ______(_)____/ /__
  / / __ `/_  / / / / / __ \/ / ___/ //_/
 / / /_/ / / /_/ /_/ / /_/ / / /__/ ,<
/_/\__,_/ /___/\__, / .___/_/\___/_/|_|
              /____/_/
       v0.1.0 - paged record browser
    "#;
    print!("{}", BANNER);
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn print_problem(message: &str) {
    println!("{} {}", "[!]".bold().red(), message);
}

fn flag_label(arg: &clap::Arg) -> String {
    let mut label = arg
        .get_short()
        .map(|short| format!("-{short}"))
        .into_iter()
        .chain(arg.get_long().map(|long| format!("--{long}")))
        .chain(
            arg.get_visible_aliases()
                .unwrap_or_default()
                .into_iter()
                .map(|alias| format!("--{alias}")),
        )
        .collect::<Vec<_>>()
        .join(", ");
    if arg.get_action().takes_values() {
        let value = arg
            .get_value_names()
            .and_then(|names| names.first())
            .map(|name| name.to_string())
            .unwrap_or_else(|| arg.get_id().to_string().to_uppercase());
        label.push_str(&format!(" <{value}>"));
    }
    label
}

/// Flag table grouped by help heading, followed by the in-session commands.
fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = format!(
        "{} {}\n{}\n\nUsage: {} [OPTIONS]\n",
        cmd.get_name(),
        cmd.get_version().unwrap_or_default(),
        cmd.get_long_about()
            .or(cmd.get_about())
            .map(|a| a.to_string())
            .unwrap_or_default(),
        cmd.get_name(),
    );

    let mut sections: Vec<(&str, Vec<(String, String)>)> = Vec::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options");
        let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
        let row = (flag_label(arg), help.trim().to_string());
        match sections.iter_mut().find(|(h, _)| *h == heading) {
            Some((_, rows)) => rows.push(row),
            None => sections.push((heading, vec![row])),
        }
    }

    let width = sections
        .iter()
        .flat_map(|(_, rows)| rows.iter().map(|(flags, _)| flags.len()))
        .max()
        .unwrap_or(0);
    for (heading, rows) in &sections {
        out.push_str(&format!("\n{heading}:\n"));
        for (flags, help) in rows {
            out.push_str(&format!("  {flags:<width$}  {help}\n"));
        }
    }

    out.push_str("\nSession commands:\n");
    for line in output::render_help().lines() {
        out.push_str(&format!("  {line}\n"));
    }
    if let Some(path) = config::default_config_path() {
        out.push_str(&format!("\nConfig: {}\n", path.display()));
    }
    out
}

#[derive(Clone, Debug)]
struct RunConfig {
    config_path: Option<std::path::PathBuf>,
    init_config: bool,
    verbose: u8,
    no_color: bool,
    base_url: String,
    offline_records: Option<u64>,
    proxy: Option<String>,
    timeout: u64,
    rate: u32,
    page_size: usize,
    policy: BulkPolicy,
    initial_select: Option<String>,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    let base_url = args
        .base_url
        .or(cfg.base_url)
        .unwrap_or_else(|| crate::source::DEFAULT_BASE_URL.to_string());
    reqwest::Url::parse(&base_url).map_err(|e| format!("invalid base_url '{base_url}': {e}"))?;

    let page_size = args
        .page_size
        .or(cfg.page_size)
        .unwrap_or(crate::DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > validation::MAX_PAGE_SIZE {
        return Err(format!(
            "invalid page_size {page_size}, expected 1 to {}",
            validation::MAX_PAGE_SIZE
        ));
    }

    let policy_raw = args
        .policy
        .or(cfg.policy)
        .unwrap_or_else(|| "reset".to_string());
    let policy = BulkPolicy::parse(&policy_raw)
        .ok_or_else(|| format!("invalid policy '{policy_raw}', expected reset or merge"))?;

    let rate = args.rate.or(cfg.rate).unwrap_or(5);
    if rate == 0 {
        return Err("invalid rate 0, expected positive integer".to_string());
    }

    let proxy = args
        .proxy
        .or(cfg.proxy)
        .filter(|p| !p.trim().is_empty());

    Ok(RunConfig {
        config_path: args
            .config
            .map(|p| config::expand_tilde(&p))
            .or_else(config::default_config_path),
        init_config: args.init_config,
        verbose: args.verbose,
        no_color,
        base_url,
        offline_records: args.offline.or(cfg.offline_records),
        proxy,
        timeout: args.timeout.or(cfg.timeout).unwrap_or(10),
        rate,
        page_size,
        policy,
        initial_select: args.select,
    })
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Next,
    Prev,
    Goto(u64),
    Toggle(usize),
    SelectPage,
    ClearPage,
    Bulk(Option<String>),
    Reload,
    Json,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or("").to_lowercase();
    let arg = parts.next();
    let positive = |raw: Option<&str>, what: &str| -> Result<u64, String> {
        let raw = raw.ok_or_else(|| format!("missing {what}"))?;
        match raw.parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("invalid {what} '{raw}'")),
        }
    };
    match head.as_str() {
        "n" | "next" => Ok(Command::Next),
        "p" | "prev" => Ok(Command::Prev),
        "g" | "goto" => positive(arg, "page").map(Command::Goto),
        "t" | "toggle" => positive(arg, "row").map(|n| Command::Toggle(n as usize - 1)),
        "a" | "all" => Ok(Command::SelectPage),
        "none" => Ok(Command::ClearPage),
        "s" | "select" => Ok(Command::Bulk(arg.map(|s| s.to_string()))),
        "r" | "reload" => Ok(Command::Reload),
        "j" | "json" => Ok(Command::Json),
        "h" | "help" | "?" => Ok(Command::Help),
        "q" | "quit" | "exit" => Ok(Command::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command '{other}' (h for help)")),
    }
}

fn loading_spinner(no_color: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    let template = if no_color {
        ":: {spinner} {msg}"
    } else {
        ":: {spinner:.blue} {msg}"
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        pb.set_style(style);
    }
    pb
}

async fn with_spinner<T, F>(no_color: bool, message: String, fut: F) -> T
where
    F: Future<Output = T>,
{
    let pb = loading_spinner(no_color);
    pb.set_message(message);
    let outcome = fut.await;
    pb.finish_and_clear();
    outcome
}

fn report_outcome(outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Failed(err) => print_problem(&format!("{err} (showing previous page)")),
        LoadOutcome::Installed | LoadOutcome::Stale => {}
    }
}

fn render<S: PageSource<Record = Artwork>>(browser: &Browser<S>) {
    println!();
    print!("{}", output::render_rows(&browser.visible_rows()));
    println!(
        "{}",
        output::render_status(&StatusLine {
            state: browser.state(),
            page_index: browser.current_page_index(),
            page_count: browser.page_count(),
            total_records: browser.total_records(),
            total_selected: browser.total_selected_count(),
            bulk: browser.selection().bulk(),
        })
    );
}

async fn run_session<S: PageSource<Record = Artwork>>(
    mut browser: Browser<S>,
    run: &RunConfig,
) -> Result<(), String> {
    let mut intake = BulkIntake::new();

    let outcome = with_spinner(
        run.no_color,
        "loading page 1".to_string(),
        browser.go_to_page(0),
    )
    .await;
    report_outcome(&outcome);

    if let Some(raw) = run.initial_select.as_deref() {
        intake.open();
        intake.set_input(raw);
        intake
            .submit(&mut browser)
            .map_err(|e| format!("invalid --select: {e}"))?;
    }
    render(&browser);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if intake.is_open() {
            print!("count> ");
        } else {
            print!("> ");
        }
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read input: {e}")),
        };

        if intake.is_open() {
            if line.trim().is_empty() {
                intake.close();
                println!(":: bulk selection cancelled");
                continue;
            }
            intake.set_input(&line);
            match intake.submit(&mut browser) {
                Ok(count) => {
                    debug!(count, "bulk directive from prompt");
                    render(&browser);
                }
                Err(e) => print_problem(&format!("{e} (empty line cancels)")),
            }
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) if line.trim().is_empty() => {
                debug!("{e}");
                continue;
            }
            Err(e) => {
                print_problem(&e);
                continue;
            }
        };

        match command {
            Command::Next => match browser.current_page_index() {
                Some(index) => {
                    let message = format!("loading page {}", index + 2);
                    match with_spinner(run.no_color, message, browser.next_page()).await {
                        Some(outcome) => report_outcome(&outcome),
                        None => print_problem("already on the last page"),
                    }
                }
                None => print_problem("no page loaded yet, try r to retry"),
            },
            Command::Prev => match browser.current_page_index() {
                Some(index) if index > 0 => {
                    let message = format!("loading page {index}");
                    if let Some(outcome) =
                        with_spinner(run.no_color, message, browser.prev_page()).await
                    {
                        report_outcome(&outcome);
                    }
                }
                _ => print_problem("already on the first page"),
            },
            Command::Goto(page) => {
                if let Some(count) = browser.page_count() {
                    if page > count.max(1) {
                        print_problem(&format!("page {page} is past the last page {count}"));
                        continue;
                    }
                }
                let outcome = with_spinner(
                    run.no_color,
                    format!("loading page {page}"),
                    browser.go_to_page(page - 1),
                )
                .await;
                report_outcome(&outcome);
            }
            Command::Toggle(position) => {
                if browser.toggle_position(position).is_none() {
                    print_problem(&format!("no row {} on this page", position + 1));
                    continue;
                }
            }
            Command::SelectPage => browser.set_page_selected(true),
            Command::ClearPage => browser.set_page_selected(false),
            Command::Bulk(None) => {
                intake.open();
                continue;
            }
            Command::Bulk(Some(raw)) => {
                intake.open();
                intake.set_input(&raw);
                if let Err(e) = intake.submit(&mut browser) {
                    intake.close();
                    print_problem(&e.to_string());
                    continue;
                }
            }
            Command::Reload => {
                let outcome =
                    with_spinner(run.no_color, "reloading".to_string(), browser.reload()).await;
                report_outcome(&outcome);
            }
            Command::Json => {
                let snapshot = browser.selection().snapshot();
                match output::render_json(&snapshot) {
                    Ok(json) => println!("{json}"),
                    Err(e) => print_problem(&format!("failed to encode selection: {e}")),
                }
                continue;
            }
            Command::Help => {
                println!("{}", output::render_help());
                continue;
            }
            Command::Quit => break,
        }
        render(&browser);
    }

    println!();
    println!(
        ":: Done :: {} records selected ::",
        browser.total_selected_count()
    );
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let options = BrowserOptions {
        page_size: run.page_size,
        policy: run.policy,
    };

    format_kv_line("Page size", &run.page_size.to_string());
    format_kv_line("Policy", run.policy.label());

    match run.offline_records {
        Some(count) => {
            format_kv_line("Source", &format!("offline ({count} records)"));
            let source = InlineSource::synthetic(count, run.page_size);
            run_session(Browser::new(source, options), &run).await
        }
        None => {
            format_kv_line("Source", &run.base_url);
            let source = HttpSource::new(HttpSourceOptions {
                base_url: run.base_url.clone(),
                page_size: run.page_size,
                timeout_seconds: run.timeout,
                rate: run.rate,
                proxy: run.proxy.clone(),
            })
            .map_err(|e| e.to_string())?;
            run_session(Browser::new(source, options), &run).await
        }
    }
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let explicit_config = args.config.is_some();
    let config_path = args
        .config
        .as_deref()
        .map(config::expand_tilde)
        .or_else(config::default_config_path);
    let cfg = match config_path.as_ref() {
        Some(path) if !args.init_config => config::load_config(path, !explicit_config)?,
        _ => ConfigFile::default(),
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose);

    if run.init_config {
        let path = run
            .config_path
            .as_ref()
            .ok_or_else(|| "could not determine a config path".to_string())?;
        if config::ensure_default_config_file(path)? {
            println!(":: wrote default config to {}", path.display());
        } else {
            println!(":: config already exists at {}", path.display());
        }
        return Ok(());
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
