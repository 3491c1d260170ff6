use clap::Parser;
use verdict::cli::{
    backends, evaluate, handle_completions, handle_config_init, BackendsCommands, Cli, Commands,
    ConfigCommands,
};
use verdict::config::VerdictConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Evaluate(args) => match evaluate::run_evaluate(args).await {
            Ok(output) => {
                println!("{}", output);
                Ok(())
            }
            Err(e) => Err(e),
        },
        Commands::Backends(cmd) => match cmd {
            BackendsCommands::List(args) => {
                let config = if args.config.exists() {
                    VerdictConfig::load(Some(&args.config))
                } else {
                    Ok(VerdictConfig::default())
                };
                match config {
                    Ok(config) => match backends::handle_backends_list(&args, &config) {
                        Ok(output) => {
                            println!("{}", output);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e.into()),
                }
            }
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
