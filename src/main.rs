use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use log::{debug, info};
use repo_inspect::{
    apt, rpm,
    utils::{format_duration, format_size},
    AptArchive, ArchiveLocation, Config, InspectError, InspectResult, PackageIndex, PackageRecord,
    RpmArchive, RpmLocation, Verbosity,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;

const DESCRIPTION: &str = "Download and inspect APT and RPM repository package indexes.

Package indexes are cached under the cache directory and reused until they
are older than --max-cache-age seconds.

Examples:

    # list the packages of Debian stable/main for amd64
    repo-inspect apt --dist=stable --area=main list-packages
    # show one package stanza
    repo-inspect apt --repo=http://archive.ubuntu.com/ubuntu --dist=focal show-package bash
    # discover the components of a distribution
    repo-inspect apt --repo=http://packages.microsoft.com/repos/code --dist=stable components

    # download primary.xml.gz of an RPM repository
    repo-inspect rpm --repo=https://vault.centos.org/7.9.2009/os/Source download-package-list --dest=centos-7-src.xml.gz
    # show a particular package
    repo-inspect rpm --repo=http://download.opensuse.org/tumbleweed/repo/src-oss show-package curl";

fn main() {
    let matches = build_cli().get_matches();
    let verbose = matches.get_flag("verbose");
    if matches.get_flag("no-color") {
        colored::control::set_override(false);
    }
    let start_time = Instant::now();

    if let Err(e) = run_command(&matches) {
        println!("{}: {}", "Error".red().bold(), e);
        if verbose {
            let mut source = e.source();
            while let Some(cause) = source {
                println!("  {}: {}", "caused by".dimmed(), cause);
                source = cause.source();
            }
            println!("{:#?}", e);
        }
        std::process::exit(e.exit_code());
    }

    debug!(
        "Operation completed in {}",
        format_duration(start_time.elapsed().as_secs())
    );
}

fn build_cli() -> Command {
    Command::new("repo-inspect")
        .version(repo_inspect::INSPECT_VERSION)
        .about("Download and inspect APT and RPM repository package indexes")
        .long_about(DESCRIPTION)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Print the full cause chain of errors"))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .global(true)
            .value_name("CONFIG")
            .help("Configuration file (TOML)"))
        .arg(Arg::new("log-level")
            .long("log-level")
            .global(true)
            .env("LOG_LEVEL")
            .value_name("LEVEL")
            .help("Log verbosity: quiet, info or debug"))
        .arg(Arg::new("max-cache-age")
            .long("max-cache-age")
            .global(true)
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .help("Max cache age in seconds [default: 86400]"))
        .arg(Arg::new("cache-dir")
            .long("cache-dir")
            .global(true)
            .value_name("DIR")
            .value_parser(value_parser!(PathBuf))
            .help("Directory holding cached index files"))
        .arg(Arg::new("timeout")
            .long("timeout")
            .global(true)
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .help("Request timeout in seconds [default: none]"))
        .arg(Arg::new("no-color")
            .long("no-color")
            .global(true)
            .action(ArgAction::SetTrue))
        .subcommand(Command::new("apt")
            .about("Inspect an APT (Debian/Ubuntu) repository")
            .subcommand_required(true)
            .arg(Arg::new("repo")
                .long("repo")
                .default_value(apt::DEFAULT_REPO)
                .help("APT repository such as `http://se.archive.ubuntu.com/ubuntu`"))
            .arg(Arg::new("dist")
                .long("dist")
                .default_value(apt::DEFAULT_DIST)
                .help("Distribution. For example `focal`, `stable` or `buster`"))
            .arg(Arg::new("area")
                .long("area")
                .default_value(apt::DEFAULT_AREA)
                .help("Archive area. For example `main`, `contrib`, `non-free`"))
            .arg(Arg::new("arch")
                .long("arch")
                .default_value(apt::DEFAULT_ARCH)
                .help("Architecture (binary packages only). For example `i386`, `amd64`"))
            .subcommand(Command::new("download-packages-file")
                .about("Download the Packages.gz index")
                .arg(dest_arg("Packages.gz")))
            .subcommand(Command::new("download-sources-file")
                .about("Download the Sources.gz index")
                .arg(dest_arg("Sources.gz")))
            .subcommand(Command::new("list-packages")
                .about("List all packages found in the Packages.gz index"))
            .subcommand(Command::new("show-package")
                .about("Show a particular package found in the Packages.gz index")
                .arg(package_arg()))
            .subcommand(Command::new("list-sources")
                .about("List all source packages found in the Sources.gz index"))
            .subcommand(Command::new("show-source")
                .about("Show a particular source package found in the Sources.gz index")
                .arg(package_arg()))
            .subcommand(Command::new("components")
                .about("Discover release components for a particular repo+distro")))
        .subcommand(Command::new("rpm")
            .about("Inspect an RPM (repodata) repository")
            .subcommand_required(true)
            .arg(Arg::new("repo")
                .long("repo")
                .default_value(rpm::DEFAULT_REPO)
                .help("RPM repository such as `http://download.opensuse.org/tumbleweed/repo/oss`"))
            .subcommand(Command::new("download-package-list")
                .about("Download the primary.xml.gz package list")
                .arg(dest_arg("primary.xml.gz")))
            .subcommand(Command::new("list-packages")
                .about("List all packages found in the package list"))
            .subcommand(Command::new("show-package")
                .about("Show a particular package found in the package list. Only the first occurrence is shown.")
                .arg(package_arg())))
}

fn dest_arg(default: &'static str) -> Arg {
    Arg::new("dest")
        .long("dest")
        .default_value(default)
        .value_parser(value_parser!(PathBuf))
        .help("Download destination")
}

fn package_arg() -> Arg {
    Arg::new("package").required(true).help("Package name")
}

fn string_arg<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

fn path_arg<'a>(matches: &'a ArgMatches, id: &str) -> &'a Path {
    matches
        .get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .unwrap_or_else(|| Path::new("."))
}

fn load_config(matches: &ArgMatches) -> InspectResult<Config> {
    let mut config = Config::load(matches.get_one::<String>("config").map(String::as_str))?;
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.log_level = level.parse::<Verbosity>()?;
    }
    if let Some(age) = matches.get_one::<u64>("max-cache-age") {
        config.max_cache_age_seconds = *age;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("cache-dir") {
        config.cache_dir = dir.clone();
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.timeout_seconds = Some(*timeout);
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .format_target(false)
        .init();
}

fn run_command(matches: &ArgMatches) -> InspectResult<()> {
    let config = load_config(matches)?;
    init_logging(config.log_level);
    debug!(
        "cache dir {}, max cache age {}",
        config.cache_dir.display(),
        format_duration(config.max_cache_age_seconds)
    );

    match matches.subcommand() {
        Some(("apt", sub_matches)) => run_apt(sub_matches, &config),
        Some(("rpm", sub_matches)) => run_rpm(sub_matches, &config),
        _ => Err(InspectError::ConfigError(
            "please specify a subcommand (--help for usage)".to_string(),
        )),
    }
}

fn run_apt(matches: &ArgMatches, config: &Config) -> InspectResult<()> {
    let location = ArchiveLocation::new(
        string_arg(matches, "repo"),
        string_arg(matches, "dist"),
        string_arg(matches, "area"),
        string_arg(matches, "arch"),
    );
    let archive = AptArchive::from_config(location, config)?;

    match matches.subcommand() {
        Some(("download-packages-file", sub_matches)) => {
            let dest = path_arg(sub_matches, "dest");
            let written = archive.download_packages(dest)?;
            report_download(written, dest);
        }
        Some(("download-sources-file", sub_matches)) => {
            let dest = path_arg(sub_matches, "dest");
            let written = archive.download_sources(dest)?;
            report_download(written, dest);
        }
        Some(("list-packages", _)) => print_records(&archive.list_packages()?)?,
        Some(("show-package", sub_matches)) => {
            println!("{}", archive.show_package(string_arg(sub_matches, "package"))?);
        }
        Some(("list-sources", _)) => print_records(&archive.list_sources()?)?,
        Some(("show-source", sub_matches)) => {
            println!("{}", archive.show_source(string_arg(sub_matches, "package"))?);
        }
        Some(("components", _)) => println!("{}", archive.components()?.join(" ")),
        _ => {
            return Err(InspectError::ConfigError(
                "please specify an apt subcommand (--help for usage)".to_string(),
            ));
        }
    }
    Ok(())
}

fn run_rpm(matches: &ArgMatches, config: &Config) -> InspectResult<()> {
    let location = RpmLocation::new(string_arg(matches, "repo"));
    let archive = RpmArchive::from_config(location, config)?;

    match matches.subcommand() {
        Some(("download-package-list", sub_matches)) => {
            let dest = path_arg(sub_matches, "dest");
            let written = archive.download_package_list(dest)?;
            report_download(written, dest);
        }
        Some(("list-packages", _)) => print_records(&archive.list_packages()?)?,
        Some(("show-package", sub_matches)) => {
            println!("{}", archive.show_package(string_arg(sub_matches, "package"))?);
        }
        _ => {
            return Err(InspectError::ConfigError(
                "please specify an rpm subcommand (--help for usage)".to_string(),
            ));
        }
    }
    Ok(())
}

fn print_records(records: &[PackageRecord]) -> InspectResult<()> {
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}

fn report_download(written: u64, dest: &Path) {
    info!("downloaded {} to {}", format_size(written), dest.display());
}
