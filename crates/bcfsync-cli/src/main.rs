//! bcfsync CLI: the `bcfsync` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_logging(cli.verbose);

    match cli.command {
        Commands::Init { dir, json } => commands::init::run(dir, json),

        Commands::Topics { archive, json } => {
            let config = support::load_config_or_exit(&cli.config);
            commands::topics::run(&config, archive, json)
        }

        Commands::Preview {
            archive,
            project,
            json,
        } => {
            let config = support::load_config_or_exit(&cli.config);
            commands::preview::run(&config, archive, project, json)
        }

        Commands::Import {
            archive,
            project,
            actor,
            invite_unknown,
            invite_roles,
            add_non_members,
            member_roles,
            anonymize_invalid,
            json,
        } => {
            let config = support::load_config_or_exit(&cli.config);
            commands::import::run(
                &config,
                commands::import::Args {
                    archive,
                    project,
                    actor,
                    invite_unknown,
                    invite_roles,
                    add_non_members,
                    member_roles,
                    anonymize_invalid,
                    json,
                },
            )
        }

        Commands::User { command } => {
            let config = support::load_config_or_exit(&cli.config);
            commands::user::run(&config, command)
        }
    }
}
