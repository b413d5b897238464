//! Subcommand implementations.

mod login;
mod logout;
mod poll;
mod serve;
mod status;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API and poll on a schedule
    Serve(serve::ServeArgs),

    /// Poll once and print the result
    Poll(poll::PollArgs),

    /// Log in now, replacing any stored session
    Login(login::LoginArgs),

    /// Show the stored session
    Status(status::StatusArgs),

    /// Discard the stored session
    Logout(logout::LogoutArgs),
}

pub async fn handle(cmd: Commands, config: Config) -> Result<()> {
    match cmd {
        Commands::Serve(args) => serve::run(args, &config).await,
        Commands::Poll(args) => poll::run(args, &config).await,
        Commands::Login(args) => login::run(args, &config).await,
        Commands::Status(args) => status::run(args, &config).await,
        Commands::Logout(args) => logout::run(args, &config).await,
    }
}
