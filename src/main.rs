use anyhow::Result;
use clap::Parser;
use log::debug;
use targe::{
    catalog::{Catalog, remote::RemoteCatalogSource},
    cli::{Cli, Command},
    commands,
    config::{self, Config, ConfigFile},
    logging::init_logging,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.no_color);

    let targe_home = config::targe_home()?;

    if let Command::Config { action } = &cli.command {
        if let Some(line) = commands::run_config(action, &targe_home)? {
            println!("{line}");
        }
        return Ok(());
    }

    let file = ConfigFile::load(&config::config_path(&targe_home))?;
    let config = Config::resolve(cli.openai_api_key, cli.requirements_dir, &file, &targe_home);
    debug!("Requirements directory: {}", config.requirements_dir.display());

    match &cli.command {
        Command::Requirements { action } => {
            let catalog = Catalog::new(&config.requirements_dir);
            let outcome = commands::run_requirements(action, &catalog, &RemoteCatalogSource)?;
            println!("{}", commands::describe_install(outcome, &catalog));
        }
        Command::Aws { target } => {
            let outcome = commands::run_aws(target, &config)?;
            if let Some(line) = commands::describe_outcome(&outcome) {
                println!("{line}");
            }
        }
        Command::Config { .. } => {}
    }

    Ok(())
}
