use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "STT Manager CLI - manage staff accounts")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a superuser (admin) account
    CreateSuperuser(CreateSuperuserArgs),
}

#[derive(ClapArgs, Debug)]
pub struct CreateSuperuserArgs {
    /// Username for the superuser
    #[arg(short, long, help = "Username for the superuser")]
    pub username: String,

    /// Email address for the superuser
    #[arg(short, long, help = "Email address for the superuser")]
    pub email: String,

    /// Password for the superuser
    #[arg(short, long, help = "Password for the superuser")]
    pub password: String,
}
