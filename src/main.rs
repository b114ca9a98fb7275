use anyhow::Context;
use clap::{Parser, Subcommand};
use oikosystem_lib::{logging, AppConfig, PersonaRegistry};

#[derive(Parser)]
#[command(name = "oikosystem", version, about = "Philosopher persona chat, debate and journal service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8888
        #[arg(long, env = "OIKOS_BIND")]
        bind: Option<String>,
    },
    /// List the built-in philosophers
    Personas,
    /// Print a rendered system prompt
    Prompt {
        id: String,
        #[arg(long, default_value = "chat")]
        context: String,
        #[arg(long, default_value = "")]
        user_context: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }

            let _guard = logging::init_logging(config.log_dir.as_deref())
                .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
            if let Some(dir) = &config.log_dir {
                match logging::cleanup_old_logs(dir) {
                    Ok(removed) if removed > 0 => tracing::info!("Removed {} old log files", removed),
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Log cleanup failed: {}", e),
                }
            }

            let bind = config.bind.clone();
            oikosystem_lib::run(config)
                .await
                .with_context(|| format!("server on {} stopped", bind))?;
        }
        Command::Personas => {
            let registry = PersonaRegistry::builtin();
            for persona in registry.personas() {
                println!("{:<12} {:<12} {}", persona.id.as_str(), persona.name, persona.era);
            }
        }
        Command::Prompt {
            id,
            context,
            user_context,
        } => {
            let registry = PersonaRegistry::builtin();
            let id = registry
                .find_by_name(&id)
                .map(|p| p.id.as_str().to_string())
                .unwrap_or(id);
            let prompt = registry
                .render_prompt(&id, &context, &user_context)
                .with_context(|| format!("unknown philosopher '{}'", id))?;
            println!("{}", prompt);
        }
    }

    Ok(())
}
