use std::path::PathBuf;
use std::process;

use anyhow::anyhow;
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use gitday::config::{Config, LogLevel};
use gitday::relocate::{Direction, RelocateOptions, Relocator, Transfer};
use gitday::{display, logger};

fn cli() -> Command {
    Command::new("mdshelf")
        .version(crate_version!())
        .about("Shelve documents from a working tree into an archive, and bring them back.")
        .arg(
            Arg::new("operation")
                .required(true)
                .value_parser(["store", "restore"])
                .help("store: working -> archive, restore: archive -> working"),
        )
        .arg(
            Arg::new("from_dir")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("to_dir")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print what would happen without touching any file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("copy")
                .long("copy")
                .help("Copy instead of move")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("flat")
                .long("flat")
                .help("Put every file directly under the destination root")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("restore-exact")
                .long("restore-exact")
                .help("Put files back at the paths recorded when they were stored")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-cleanup")
                .long("no-cleanup")
                .help("Keep directories emptied by a store")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ext")
                .long("ext")
                .value_name("EXT")
                .default_value("md")
                .help("File extension to relocate"),
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

    logger::init(LogLevel::Info, Some(&Config::config_home().join("mdshelf.log")));

    if let Err(e) = run(&matches) {
        display::error(format!("{e:#}"));
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let operation = matches
        .get_one::<String>("operation")
        .map(String::as_str)
        .unwrap_or_default();
    let direction =
        Direction::parse(operation).ok_or_else(|| anyhow!("unknown operation '{operation}'"))?;
    let from = matches
        .get_one::<PathBuf>("from_dir")
        .ok_or_else(|| anyhow!("missing from_dir"))?;
    let to = matches
        .get_one::<PathBuf>("to_dir")
        .ok_or_else(|| anyhow!("missing to_dir"))?;

    let mut opts = RelocateOptions::new(direction);
    if matches.get_flag("copy") {
        opts.transfer = Transfer::Copy;
    }
    opts.flat = matches.get_flag("flat");
    opts.restore_exact = matches.get_flag("restore-exact");
    opts.cleanup = !matches.get_flag("no-cleanup");
    opts.dry_run = matches.get_flag("dry-run");
    if let Some(ext) = matches.get_one::<String>("ext") {
        opts.extension = ext.trim_start_matches('.').to_string();
    }
    let dry_run = opts.dry_run;

    let relocator = Relocator::new(from, to, opts)?;
    let report = relocator.run()?;

    let prefix = if dry_run { "[dry-run] " } else { "" };
    println!(
        "\n{prefix}{} file(s) from {} to {}",
        report.transferred,
        relocator.source_root().display(),
        relocator.dest_root().display()
    );
    if report.backups > 0 {
        println!("{} existing file(s) backed up", report.backups);
    }
    if report.fallbacks > 0 {
        display::warn(format!(
            "{} file(s) had no metadata record and were placed by file name",
            report.fallbacks
        ));
    }
    if report.removed_dirs > 0 {
        println!("{} empty director(ies) removed", report.removed_dirs);
    }
    Ok(())
}
