use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{crate_version, Arg, ArgAction, ArgMatches, Command};
use gitday::config::Config;
use gitday::discovery::Prober;
use gitday::prompt::TerminalPrompter;
use gitday::sync::{Orchestrator, RunEnd};
use gitday::{display, logger, notify, pull_all};

fn cli() -> Command {
    Command::new("gitday")
        .version(crate_version!())
        .about("End-of-day commit and push across every repository under your projects root.")
        .after_help(format!(
            "Configuration lives in {}. Set GITDAY_CONFIG_HOME to use another directory.",
            Config::default_path().display()
        ))
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Show what would be staged, committed, pushed or stashed without doing it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .help("List repositories that have something to sync and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Print the configuration and its location")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("init")
                .long("init")
                .help("Create a starter configuration if none exists")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .value_name("KEY=VALUE")
                .help("Change one configuration key, keeping a backup of the old file"),
        )
        .arg(
            Arg::new("remind")
                .long("remind")
                .help("Send a desktop reminder if anything needs syncing (run from cron)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pull-all")
                .long("pull-all")
                .help("Fetch every repository and fast-forward the clean ones")
                .action(ArgAction::SetTrue),
        )
}

fn main() {
    let matches = match cli().try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = run(&matches) {
        display::error(format!("{e:#}"));
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let path = Config::default_path();
    let loaded = Config::load();

    let level = loaded.as_ref().map(|c| c.log_level).unwrap_or_default();
    logger::init(level, Some(&Config::config_home().join("gitday.log")));

    if matches.get_flag("init") {
        return init_config(&path);
    }

    if let Some(pair) = matches.get_one::<String>("set") {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--set expects KEY=VALUE, got '{pair}'"))?;
        let config = Config::set_key(&path, key.trim(), value.trim())?;
        println!("Updated {}", key.trim());
        config.print(&path);
        return Ok(());
    }

    let config = loaded?;
    tracing::debug!(path = %path.display(), "configuration loaded");

    if matches.get_flag("config") {
        config.print(&path);
        return Ok(());
    }

    let prober = Prober::from_config(&config)?;

    if matches.get_flag("status") {
        let repos = prober.discover();
        if repos.is_empty() {
            println!("Nothing to sync under {}", config.projects_root.display());
        }
        for repo in &repos {
            println!("{}", display::status_block(repo));
        }
        return Ok(());
    }

    if matches.get_flag("remind") {
        return remind(&config, &prober);
    }

    if matches.get_flag("pull-all") {
        pull_all::pull_all(&prober);
        return Ok(());
    }

    sync(&config, &prober, matches.get_flag("dry-run"))
}

fn init_config(path: &std::path::Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("{} already exists", path.display());
        return Ok(());
    }
    let config = Config::starter();
    config
        .save_to_path(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    config.print(path);
    Ok(())
}

fn remind(config: &Config, prober: &Prober) -> anyhow::Result<()> {
    let count = prober.discover().len();
    match notify::reminder_text(count) {
        Some(text) if config.notification_enabled => {
            if !notify::send(notify::TITLE, &text) {
                println!("{text}");
            }
        }
        Some(text) => println!("{text}"),
        None => tracing::info!("nothing to remind about"),
    }

    let exe = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "gitday".to_string());
    println!("Schedule with: {}", notify::cron_line(config, &exe)?);
    Ok(())
}

fn sync(config: &Config, prober: &Prober, dry_run: bool) -> anyhow::Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    if dry_run {
        display::info("Dry run: nothing will be changed");
    }

    let repos = prober.discover();
    if repos.is_empty() {
        println!("Nothing to sync under {}", config.projects_root.display());
    }

    let report = Orchestrator::new(config, TerminalPrompter, dry_run)
        .with_interrupt_flag(interrupted)
        .run(&repos);

    match report.end {
        RunEnd::Completed => tracing::info!("sync finished"),
        RunEnd::Quit => tracing::info!("sync stopped by user"),
        RunEnd::Interrupted => display::warn("Interrupted"),
    }
    print!("{}", display::summary_block(&report.summary));
    tracing::info!(
        synced = report.summary.synced,
        skipped = report.summary.skipped,
        errored = report.summary.errored,
        "summary"
    );
    Ok(())
}
