use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile markdown into document edit requests without touching any document.
    Compile(CompileArgs),
    /// Replace `{{Key}}` placeholders in a document with formatted markdown.
    Substitute(SubstituteArgs),
    /// Copy a template document and fill its placeholders.
    Fill(FillArgs),
}

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Markdown input file (`-` for stdin).
    #[arg(long)]
    pub input: String,

    /// Document offset the compiled text is inserted at.
    #[arg(long, default_value_t = 1)]
    pub start: usize,
}

#[derive(Debug, Args)]
pub struct SubstituteArgs {
    /// Document id or document URL.
    #[arg(long)]
    pub document: String,

    /// JSON object mapping placeholder keys to markdown values (`-` for stdin).
    #[arg(long)]
    pub values: String,
}

#[derive(Debug, Args)]
pub struct FillArgs {
    /// Template document id or URL. The template is copied, never modified.
    #[arg(long)]
    pub template: String,

    /// Title of the new document.
    #[arg(long)]
    pub title: String,

    /// JSON object mapping placeholder keys to markdown values (`-` for stdin).
    #[arg(long)]
    pub values: String,
}
