use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_app::Application;
use libris_db::Database;
use libris_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "libris", version, about = "Books and authors catalogue API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve HTTP (default)
    Serve {
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending module migrations and exit
    Migrate,
    /// Print every documented route
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load libris settings")?;
    libris_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            tracing::info!(env = ?settings.environment, "libris serve");
            Application::connect(settings).await?.run().await
        }
        Command::Migrate => {
            let app = Application::connect(settings).await?;
            let applied = app.migrate().await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Routes => {
            // Route discovery needs no real data
            let db = Database::connect_in_memory().await?;
            let app = Application::with_database(settings, db)?;
            for (method, path) in libris_http::router::route_table(app.registry()) {
                println!("{method:<7} {path}");
            }
            Ok(())
        }
    }
}
