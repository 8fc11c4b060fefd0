use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use client_core::{ClientError, SortKey, StatusFilter};
use shared::domain::{EventStatus, Role};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

/// Command-line client for the EventSphere event-management API.
#[derive(Parser, Debug)]
#[command(name = "eventsphere", version)]
struct Cli {
    /// Base URL of the API, e.g. http://localhost:8081
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Where the login credential is kept between runs.
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
    /// Log filter, e.g. `info` or `client_core=debug`.
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the credential.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and log into it.
    Register(AccountArgs),
    /// Forget the stored credential.
    Logout,
    /// Show the logged-in user.
    Whoami,
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Events(EventsCommand),
    #[command(subcommand)]
    Reviews(ReviewsCommand),
    /// User administration (ADMIN only).
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Args, Debug)]
struct AccountArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    password: String,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Change your own username, email or phone number.
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum EventsCommand {
    /// List events, filtered by status and sorted.
    List {
        /// all, draft, published or cancelled
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// date-asc, date-desc, title-asc, title-desc, price-asc or price-desc
        #[arg(long, default_value = "date-asc")]
        sort: SortKey,
        /// Only events run by this organizer.
        #[arg(long, conflicts_with = "mine")]
        organizer: Option<String>,
        /// Only events you organize.
        #[arg(long)]
        mine: bool,
    },
    /// Show one event with its rating summary.
    Show { id: String },
    Create(EventFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: EventPatch,
    },
    Publish { id: String },
    Cancel { id: String },
    SetStatus { id: String, status: EventStatus },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct EventFields {
    #[arg(long)]
    title: String,
    /// YYYY-MM-DD, today or later.
    #[arg(long)]
    date: String,
    #[arg(long)]
    location: String,
    #[arg(long, default_value_t = 0.0)]
    price: f64,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, default_value = "DRAFT")]
    status: EventStatus,
}

#[derive(Args, Debug)]
struct EventPatch {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<EventStatus>,
}

#[derive(Subcommand, Debug)]
enum ReviewsCommand {
    List { event_id: String },
    /// Review a finished event.
    Add {
        event_id: String,
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Edit your review of an event.
    Edit {
        event_id: String,
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Delete your review of an event.
    Delete { event_id: String },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    List,
    Show { id: String },
    Delete { id: String },
    /// Create an ADMIN or ORGANIZER account.
    CreateAccount {
        #[command(flatten)]
        account: AccountArgs,
        #[arg(long, default_value = "ORGANIZER")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = config::load_settings().with_overrides(config::Overrides {
        api_url: cli.api_url,
        session_file: cli.session_file,
        log: cli.log,
    });

    let filter = EnvFilter::try_new(&settings.log).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match commands::run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

/// The outermost context names the failed operation; a client error below
/// it supplies the message the user sees.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ClientError>() {
        Some(client_err) => client_err.user_message(&err.to_string()),
        None => format!("{err:#}"),
    }
}
