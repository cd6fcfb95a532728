use clap::{Args, Parser, Subcommand};
use lib::chat::{ChatSession, TurnSettings};
use lib::config::Config;
use lib::flow::{extract_message, FlowClient, FlowRunner};
use lib::tweaks::StyleProfile;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stylesense")]
#[command(about = "StyleSense CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json (flow address, endpoint, tweaks).
    Init {
        /// Config file path (default: STYLESENSE_CONFIG_PATH or ~/.stylesense/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Chat with the fashion flow (interactive). Type /help for commands.
    Chat {
        #[command(flatten)]
        flow: FlowArgs,
    },

    /// Send one message and print the reply.
    Ask {
        /// Message to send.
        message: String,

        #[command(flatten)]
        flow: FlowArgs,

        /// Print the full JSON response instead of the extracted reply.
        #[arg(long)]
        raw: bool,
    },
}

/// Options shared by `chat` and `ask`.
#[derive(Args)]
struct FlowArgs {
    /// Config file path (default: STYLESENSE_CONFIG_PATH or ~/.stylesense/config.json)
    #[arg(long, short, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Flow service base URL (default from config or http://127.0.0.1:7860)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Endpoint name or flow id (default from config or "fashion")
    #[arg(long, short, value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// Body shape passed to the flow.
    #[arg(long, value_name = "TEXT", default_value = "")]
    body_shape: String,

    /// Skin tone passed to the flow.
    #[arg(long, value_name = "TEXT", default_value = "")]
    skin_tone: String,
}

impl FlowArgs {
    fn load(&self) -> anyhow::Result<Config> {
        let (mut config, path) = lib::config::load_config(self.config.clone())?;
        log::debug!("using config {}", path.display());
        if let Some(ref url) = self.base_url {
            config.flow.base_url = url.clone();
        }
        if let Some(ref endpoint) = self.endpoint {
            config.flow.endpoint = endpoint.clone();
        }
        Ok(config)
    }

    fn profile(&self) -> StyleProfile {
        StyleProfile::new(self.body_shape.clone(), self.skin_tone.clone())
    }
}

const HELP: &str = "available commands:

/body <text>  - set body shape (empty clears it)
/skin <text>  - set skin tone (empty clears it)
/style        - show current style parameters
/history      - show the conversation so far
/clear        - clear the conversation shown here
/help         - show this help message
/exit, /quit  - leave";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("stylesense {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { flow }) => {
            if let Err(e) = run_chat(flow).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { message, flow, raw }) => {
            if let Err(e) = run_ask(message, flow, raw).await {
                log::error!("ask failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_ask(message: String, args: FlowArgs, raw: bool) -> anyhow::Result<()> {
    let config = args.load()?;
    let client = FlowClient::from_config(&config.flow)?;
    let settings = TurnSettings::from_config(&config);
    let request = settings.build_request(&message, &args.profile());
    let response = client.run(&request).await?;
    if raw {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", extract_message(&response).trim());
    }
    Ok(())
}

async fn run_chat(args: FlowArgs) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let config = args.load()?;
    let client = FlowClient::from_config(&config.flow)?;
    let mut profile = args.profile();
    let mut chat = ChatSession::new(client, TurnSettings::from_config(&config));
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!(
        "StyleSense chat — flow {} at {} (/help for commands)",
        chat.settings().endpoint,
        config.flow.base_url
    );

    loop {
        write!(stdout, "👩 > ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.starts_with('/') {
            handle_command(input, &mut profile, &mut chat);
            continue;
        }

        match chat.turn(input, &profile).await {
            Ok(reply) => {
                println!("🧶 < {}", reply.trim());
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}

fn handle_command<R: FlowRunner>(input: &str, profile: &mut StyleProfile, chat: &mut ChatSession<R>) {
    let (cmd, arg) = input
        .split_once(char::is_whitespace)
        .map(|(c, a)| (c, a.trim()))
        .unwrap_or((input, ""));
    match cmd.to_ascii_lowercase().as_str() {
        "/body" => {
            profile.body_shape = arg.to_string();
            println!("body shape: {}", display_or_unset(&profile.body_shape));
        }
        "/skin" => {
            profile.skin_tone = arg.to_string();
            println!("skin tone: {}", display_or_unset(&profile.skin_tone));
        }
        "/style" => {
            println!("body shape: {}", display_or_unset(&profile.body_shape));
            println!("skin tone: {}", display_or_unset(&profile.skin_tone));
        }
        "/history" => {
            if chat.transcript().is_empty() {
                println!("no messages yet");
            }
            for m in chat.transcript().messages() {
                println!("[{}] {} {}", m.at.format("%H:%M:%S"), m.role.avatar(), m.content.trim());
            }
        }
        "/clear" => {
            chat.clear_transcript();
            println!("conversation cleared");
        }
        "/help" => println!("{}", HELP),
        _ => println!("unknown command {} (try /help)", cmd),
    }
}

fn display_or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "(not set)"
    } else {
        value
    }
}
