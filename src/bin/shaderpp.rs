// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use shaderpp::{preprocess, Define, FsIncludeResolver};

/// Runs the shader preprocessor over a single source file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Source file to preprocess.
    input: PathBuf,

    /// Write the reformatted output here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed a macro as NAME or NAME=VALUE. May be repeated.
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Increase log verbosity (-v, -vv). Overridden by RUST_LOG if set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn install_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_define(raw: &str) -> Define {
    match raw.split_once('=') {
        Some((name, value)) => Define::new(name, value),
        None => Define::new(raw, ""),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    install_logging(cli.verbose);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let defines: Vec<Define> = cli.defines.iter().map(|raw| parse_define(raw)).collect();
    let filename = cli.input.to_string_lossy().into_owned();

    let mut resolver = FsIncludeResolver::new();
    let result = preprocess(Some(&filename), &source, &defines, &mut resolver);

    if !result.diagnostics.is_empty() {
        report_diagnostics(&filename, &source, &result.diagnostics);
    }

    match cli.output {
        Some(path) => fs::write(&path, result.output).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", result.output),
    }

    if result.diagnostics.iter().any(|d| d.severity != shaderpp::Severity::Warning) {
        anyhow::bail!("preprocessing reported {} diagnostic(s)", result.diagnostics.len());
    }
    Ok(())
}

fn report_diagnostics(filename: &str, source: &str, diagnostics: &[shaderpp::Diagnostic]) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(filename, source);
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();

    for diag in diagnostics {
        let line_start = source.lines().take(diag.line.saturating_sub(1) as usize).map(|l| l.len() + 1).sum();
        let codespan_diag = CodespanDiagnostic::new(diag.severity.into())
            .with_message(&diag.message)
            .with_labels(vec![Label::primary(file_id, line_start..line_start)]);
        let _ = term::emit(&mut writer.lock(), &config, &files, &codespan_diag);
    }
}
