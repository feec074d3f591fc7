// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod oneshot;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use oneshot::OneshotQuery;
use runtime::Backend;
use std::env;
use std::io;
use std::path::PathBuf;
use tabula_app::{ResourceKind, TabbedPanel};
use tabula_client::Client;
use tabula_testkit::{DEFAULT_SEED, DemoBackend};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tabula --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let log_file = config.log_file()?;
    logging::init(config.log_level(), &log_file)?;
    tracing::info!(config = %options.config_path.display(), "starting tabula");

    let mut backend = if options.demo {
        Backend::Demo(Box::new(DemoBackend::seeded(DEFAULT_SEED)))
    } else {
        let client = Client::new(&config.base_url(), config.timeout()?)
            .with_context(|| {
                format!(
                    "invalid [server] config in {}; fix base_url/timeout or set TABULA_BASE_URL",
                    options.config_path.display()
                )
            })?
            .with_token(config.token())
            .with_step_up_path(config.step_up_path());
        let client = match config.return_to() {
            Some(base) => client.with_return_to(base).with_context(|| {
                format!(
                    "invalid server.return_to in {}",
                    options.config_path.display()
                )
            })?,
            None => client,
        };
        Backend::Remote(client)
    };
    tracing::info!(backend = %backend.describe(), "backend ready");

    let mut panel_options = config.panel_options()?;
    if let Some(per_page) = options.per_page {
        panel_options.per_page = per_page;
    }
    if options.check_only {
        return Ok(());
    }

    if let Some(resource) = options.query {
        let query = OneshotQuery {
            search: options.search,
            page: options.page,
        };
        let stdout = io::stdout();
        return oneshot::run(
            &mut backend,
            resource,
            &panel_options,
            &query,
            &mut stdout.lock(),
        );
    }

    let mut panel = TabbedPanel::new(&panel_options);
    tabula_tui::run_app(&mut panel, config.initial_tab()?, &mut backend)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    show_help: bool,
    query: Option<ResourceKind>,
    search: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        show_help: false,
        query: None,
        search: None,
        page: None,
        per_page: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            "--query" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--query requires a resource name"))?;
                options.query = Some(config::parse_resource(value.as_ref())?);
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires search text"))?;
                options.search = Some(value.as_ref().to_owned());
            }
            "--page" => {
                options.page = Some(positive_arg("--page", iter.next())?);
            }
            "--per-page" => {
                options.per_page = Some(positive_arg("--per-page", iter.next())?);
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    if options.query.is_none() && (options.search.is_some() || options.page.is_some()) {
        bail!("--search and --page only apply to --query <resource>");
    }

    Ok(options)
}

fn positive_arg<S: AsRef<str>>(flag: &str, value: Option<S>) -> Result<u32> {
    let value = value.ok_or_else(|| anyhow!("{flag} requires a number"))?;
    match value.as_ref().trim().parse::<u32>() {
        Ok(number) if number > 0 => Ok(number),
        _ => bail!(
            "{flag} must be a positive whole number, got {:?}",
            value.as_ref()
        ),
    }
}

fn print_help() {
    println!("tabula");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Browse seeded demo data instead of the server");
    println!("  --check                  Validate config, logging, and client setup");
    println!("  --query <resource>       Print one page of a resource and exit");
    println!("  --search <text>          Global search for --query");
    println!("  --page <n>               Page number for --query");
    println!("  --per-page <n>           Rows per page");
    println!("  --help                   Show this help");
}
