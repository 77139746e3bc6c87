mod args;

pub use args::{Args, Commands, CreateSuperuserArgs};
use clap::Parser;
use common::{Database, User};

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::CreateSuperuser(superuser_args)) => {
            if let Err(e) = create_superuser(
                &superuser_args.username,
                &superuser_args.email,
                &superuser_args.password,
            )
            .await
            {
                eprintln!("Failed to create superuser: {e}");
            }
            true
        }
        None => false,
    }
}

/// Creates a superuser: validates input, hashes the password, checks for
/// duplicates, and saves to the database.
async fn create_superuser(username: &str, email: &str, password: &str) -> anyhow::Result<()> {
    let user = User::new(username, email, password, true)
        .map_err(|e| anyhow::anyhow!("Validation error: {e}"))?;

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
    let db = Database::new(&database_url).await?;

    if db.get_user(username).await?.is_some() {
        return Err(anyhow::anyhow!(
            "A user with username '{}' already exists.",
            username
        ));
    }

    db.save_user(&user)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {e}"))?;

    println!("Superuser '{}' created successfully.", username);
    Ok(())
}
