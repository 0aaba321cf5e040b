//! Subcommand entry points. Results go to stdout as JSON (or a bare link
//! for `fill`); logs go to stderr.

use std::io::Write as _;

use anyhow::Context as _;
use serde::Serialize;

use crate::cli::{CompileArgs, FillArgs, SubstituteArgs};
use crate::config::Config;
use crate::docs::GoogleDocsClient;
use crate::formats::{CompiledPatch, parse_document_id, read_input, read_replacements};
use crate::patch::compile_markdown;
use crate::substitute::substitute;
use crate::template::fill_template;

pub async fn compile(args: CompileArgs) -> anyhow::Result<()> {
    let markdown = read_input(&args.input).await?;
    let compiled = CompiledPatch::from(compile_markdown(&markdown, args.start));
    tracing::debug!(
        requests = compiled.requests.len(),
        length = compiled.length,
        "compiled markdown"
    );
    print_json(&compiled)
}

pub async fn substitute_values(args: SubstituteArgs) -> anyhow::Result<()> {
    let document_id = parse_document_id(&args.document)?;
    let replacements = read_replacements(&args.values).await?;
    let client = client_from_env()?;

    let report = substitute(&client, &document_id, replacements).await?;
    if !report.unresolved.is_empty() {
        tracing::warn!(
            %document_id,
            unresolved = report.unresolved.len(),
            "document still contains unresolved sentinels"
        );
    }
    print_json(&report)
}

pub async fn fill(args: FillArgs) -> anyhow::Result<()> {
    let template_id = parse_document_id(&args.template)?;
    let replacements = read_replacements(&args.values).await?;
    let client = client_from_env()?;

    let filled = fill_template(&client, &template_id, &args.title, replacements).await?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", filled.web_view_link).context("write document link")?;
    Ok(())
}

fn client_from_env() -> anyhow::Result<GoogleDocsClient> {
    let config = Config::from_env().context("load config")?;
    GoogleDocsClient::new(&config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value).context("serialize output")?;
    stdout.write_all(b"\n").context("write output newline")?;
    stdout.flush().context("flush output")?;
    Ok(())
}
