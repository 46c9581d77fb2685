use clap::{ArgAction, Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = ".bcfsync/config.toml";

#[derive(Parser)]
#[command(
    name = "bcfsync",
    about = "bcfsync: import BCF topics into a project issue tracker",
    version
)]
pub struct Cli {
    /// Configuration file (optional; defaults apply when absent)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a config file and empty issue and directory stores
    Init {
        /// Directory to initialize
        #[arg(long, default_value = ".")]
        dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the topics of an archive
    Topics {
        /// BCF archive path
        archive: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how the people of an archive reconcile against the directory
    Preview {
        /// BCF archive path
        archive: String,

        /// Target project identifier
        #[arg(long)]
        project: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import every topic of an archive into a project
    Import {
        /// BCF archive path
        archive: String,

        /// Target project identifier
        #[arg(long)]
        project: String,

        /// Directory id of the user running the import
        #[arg(long)]
        actor: String,

        /// Provision directory accounts for unknown mail addresses
        #[arg(long)]
        invite_unknown: bool,

        /// Role granted to invited users (repeatable; default from config)
        #[arg(long = "invite-role")]
        invite_roles: Vec<String>,

        /// Add known users who are not project members to the project
        #[arg(long)]
        add_non_members: bool,

        /// Role granted to added members (repeatable)
        #[arg(long = "member-role")]
        member_roles: Vec<String>,

        /// Clear free-text people that are not mail addresses
        #[arg(long)]
        anonymize_invalid: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage directory users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add an active directory user
    Add {
        /// Mail address (also the login)
        mail: String,

        /// Grant administrative privilege
        #[arg(long)]
        admin: bool,

        /// Project to add the user to
        #[arg(long)]
        project: Option<String>,

        /// Role in `--project` (repeatable)
        #[arg(long = "role", requires = "project")]
        roles: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
