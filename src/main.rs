//! cardiorisk - Main Entry Point

use cardiorisk::cli::{cmd_predict, cmd_preprocess, cmd_serve, cmd_train, storage_from, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardiorisk=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let store = storage_from(cli.storage_root);

    match cli.command {
        Commands::Preprocess { container, key } => {
            cmd_preprocess(store, &container, &key).await?;
        }
        Commands::Train { container, key } => {
            cmd_train(store, container, key).await?;
        }
        Commands::Serve { host, port } => {
            cmd_serve(store, host, port).await?;
        }
        Commands::Predict { bmi, score, smoke, stroke, sex, age, diabetic, kidney } => {
            let fields = [
                ("bmi", bmi.to_string()),
                ("score", score.to_string()),
                ("smoke", smoke.to_string()),
                ("stroke", stroke.to_string()),
                ("sex", sex.to_string()),
                ("age", age.to_string()),
                ("diabetic", diabetic.to_string()),
                ("kidney", kidney.to_string()),
            ];
            cmd_predict(store, &fields).await?;
        }
    }

    Ok(())
}
