use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    docpatch::logging::init().context("init logging")?;

    let cli = docpatch::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        docpatch::cli::Command::Compile(args) => {
            docpatch::commands::compile(args).await.context("compile")?;
        }
        docpatch::cli::Command::Substitute(args) => {
            docpatch::commands::substitute_values(args)
                .await
                .context("substitute")?;
        }
        docpatch::cli::Command::Fill(args) => {
            docpatch::commands::fill(args).await.context("fill")?;
        }
    }

    Ok(())
}
