use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mdwidget::{Config, Widget, WidgetSettings};

#[derive(Parser)]
#[command(name = "mdwidget")]
#[command(about = "Convert Markdown to sanitized HTML")]
struct Cli {
    /// Input Markdown file (reads stdin when omitted or `-`)
    input: Option<PathBuf>,

    /// Output HTML file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pass raw HTML and all link targets through unchanged
    #[arg(long = "unsafe")]
    unsafe_mode: bool,

    /// Wrap output in the widget container `<div>`
    #[arg(long)]
    wrap: bool,

    /// Print the math typesetter options as JSON and exit
    #[arg(long)]
    math_options: bool,

    /// Log parse and render details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => Config::compiled_default(),
    };
    if cli.unsafe_mode {
        config.render.safe_mode = false;
    }

    if cli.math_options {
        let json = config
            .math
            .to_json()
            .context("serializing math options")?;
        return write_output(cli.output.as_ref(), &format!("{json}\n"));
    }

    let markdown = read_input(cli.input.as_ref())?;
    let html = if cli.wrap {
        let settings = WidgetSettings {
            content: markdown,
            safe_mode: config.render.safe_mode,
        };
        let widget = Widget::new(config);
        let mut html = widget.render(&settings);
        if !html.is_empty() {
            html.push('\n');
        }
        html
    } else {
        mdwidget::markdown_to_html_with_config(&markdown, &config)
    };

    write_output(cli.output.as_ref(), &html)
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut markdown = String::new();
            io::stdin()
                .read_to_string(&mut markdown)
                .context("reading stdin")?;
            Ok(markdown)
        }
    }
}

fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = content.len(), "wrote html");
        }
        None => print!("{content}"),
    }
    Ok(())
}
