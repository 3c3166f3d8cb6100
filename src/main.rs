use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bss", author, version, about = "Boot script server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Load and validate the config file without starting the server.
    CheckConfig {
        /// Path to the config file. Defaults to `BSS_CONFIG_PATH` or `config/bss.yaml`.
        #[arg(long)]
        path: Option<String>,
    },
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt::fmt().pretty();
    let subscriber = subscriber.with_max_level(config::settings().logging.max_level);

    if let Some(output_file) = config::settings().logging.log_file.clone() {
        let file = std::fs::File::create(&output_file).expect("couldn't open log file");
        let file = std::sync::Mutex::new(file);
        let subscriber = subscriber.with_writer(file).finish();
        tracing::subscriber::set_global_default(subscriber).expect("couldn't set up tracing");
    } else {
        let subscriber = subscriber.finish();
        tracing::subscriber::set_global_default(subscriber).expect("couldn't set up tracing");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::CheckConfig { path }) => match config::validate(path.as_deref()) {
            Ok(_) => {
                println!("config is valid");
            }
            Err(e) => {
                eprintln!("config is invalid: {e}");
                std::process::exit(1);
            }
        },
        Some(Command::Serve) | None => {
            init_tracing();
            tracing::info!("tracing has been started");

            tracing::info!("starting web");
            web::entry().await;
            tracing::info!("web exited");
        }
    }
}
