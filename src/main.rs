use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use voiceloop::app::{run_chat_command, run_sweep_command};
use voiceloop::cli::{Cli, Commands, ConfigAction};
use voiceloop::config::Config;
use voiceloop::conversation::{Role, Turn};
use voiceloop::daemon::run_daemon;
use voiceloop::ipc::client::send_command;
use voiceloop::ipc::protocol::{Command, Response};
use voiceloop::ipc::server::IpcServer;
use voiceloop::pipeline::TurnResult;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Chat { audio, voice, json } => {
            let config = load_config(cli.config.as_deref())?;
            let result = run_chat_command(config, &audio, voice).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_turn(&result);
            }
        }
        Commands::Daemon { socket } => {
            let config = load_config(cli.config.as_deref())?;
            run_daemon(config, socket).await?;
        }
        Commands::Send {
            audio,
            session,
            socket,
        } => {
            // The daemon resolves paths against its own working directory
            let audio = std::fs::canonicalize(&audio)
                .map_err(|e| anyhow::anyhow!("Cannot open {}: {}", audio.display(), e))?;
            handle_ipc_command(socket, Command::Chat { audio, session }).await?;
        }
        Commands::History { session, socket } => {
            handle_ipc_command(socket, Command::History { session }).await?;
        }
        Commands::Reset { session, socket } => {
            handle_ipc_command(socket, Command::Reset { session }).await?;
        }
        Commands::Status { socket } => {
            handle_ipc_command(socket, Command::Status).await?;
        }
        Commands::Stop { socket } => {
            handle_ipc_command(socket, Command::Shutdown).await?;
        }
        Commands::Sweep => {
            let config = load_config(cli.config.as_deref())?;
            match run_sweep_command(&config)? {
                Some(removed) => println!("Removed {} expired audio file(s)", removed),
                None => println!("{}", "Retention is disabled; nothing swept.".dimmed()),
            }
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            clap_complete::generate(shell, &mut Cli::command(), "voiceloop", &mut stdout);
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over the -q/-v flags.
fn init_tracing(quiet: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "voiceloop=info,warn",
            (false, 1) => "voiceloop=debug,info",
            (false, _) => "voiceloop=trace,debug",
        })
    });
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("voiceloop: logging unavailable: {e}");
    }
}

/// Load configuration from custom path or default location.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::default_path);
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn print_turn(result: &TurnResult) {
    if result.is_rejected() {
        println!("{}", "(nothing heard)".dimmed());
        return;
    }
    println!("{} {}", "You:".dimmed(), result.user_text);
    println!("{} {}", "Bot:".green(), result.reply_text);
    for url in &result.audio_urls {
        println!("  {}", url);
    }
}

fn print_history(turns: &[Turn]) {
    if turns.is_empty() {
        println!("{}", "(empty)".dimmed());
        return;
    }
    for turn in turns {
        match turn.role {
            Role::User => println!("{} {}", "You:".dimmed(), turn.content),
            Role::Assistant => println!("{} {}", "Bot:".green(), turn.content),
        }
    }
}

/// Send a command to the daemon and print the response.
async fn handle_ipc_command(socket: Option<PathBuf>, command: Command) -> Result<()> {
    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);

    match send_command(&socket_path, command).await {
        Ok(response) => match response {
            Response::Ok => println!("{}", "OK".green()),
            Response::Turn {
                user_text,
                reply_text,
                audio_urls,
            } => print_turn(&TurnResult {
                user_text,
                reply_text,
                audio_urls,
            }),
            Response::History { turns } => print_history(&turns),
            Response::Status {
                transcriber,
                chat_model,
                sessions,
                audio_dir,
            } => {
                println!("Status:");
                println!("  {}      {}", "Client:".dimmed(), voiceloop::version_string());
                println!("  {} {}", "Transcriber:".dimmed(), transcriber);
                println!("  {}  {}", "Chat model:".dimmed(), chat_model);
                println!("  {}    {}", "Sessions:".dimmed(), sessions);
                println!("  {}   {}", "Audio dir:".dimmed(), audio_dir.display());
            }
            Response::Error { message } => {
                eprintln!("{} {}", "Error:".red(), message);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            eprintln!(
                "Is the daemon running? Start it with `voiceloop daemon` (socket: {})",
                socket_path.display()
            );
            std::process::exit(1);
        }
    }

    Ok(())
}
