use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use nanobanana_contracts::config::{load_config, resolve_settings, SettingsFlags};
use nanobanana_contracts::output::{resolve_output_path, write_output};
use nanobanana_contracts::providers::CredentialEnv;
use nanobanana_contracts::{GenerationRequest, ProviderChoice, ProviderKind};
use nanobanana_engine::ProviderSettings;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str = "warn,nanobanana=debug,nanobanana_contracts=debug,nanobanana_engine=debug";

#[derive(Debug, Parser)]
#[command(
    name = "nanobanana",
    version,
    about = "Generate or edit images with Gemini image models"
)]
struct Cli {
    /// Reference image to include; repeat for several.
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    inputs: Vec<PathBuf>,
    /// Output file. Defaults to image_YYYYMMDD_HHMMSS with the returned format's extension.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Aspect ratio, e.g. 1:1, 16:9, 9:16.
    #[arg(short, long, value_name = "RATIO")]
    aspect: Option<String>,
    /// Image size: 1K, 2K or 4K.
    #[arg(short, long, value_name = "SIZE")]
    size: Option<String>,
    /// OpenRouter model; forces the OpenRouter API.
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,
    #[arg(short, long)]
    verbose: bool,
    #[arg(value_name = "PROMPT", trailing_var_arg = true)]
    prompt: Vec<String>,
}

impl Cli {
    fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }

    fn settings_flags(&self) -> SettingsFlags {
        SettingsFlags {
            aspect: self.aspect.clone(),
            size: self.size.clone(),
            model: self.model.clone(),
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let prompt = cli.prompt_text();
    if prompt.trim().is_empty() {
        bail!("no prompt provided");
    }

    let file_config = load_config()?;
    let settings = resolve_settings(
        &cli.settings_flags(),
        file_config.as_ref(),
        &CredentialEnv::from_env(),
    )?;
    let request = GenerationRequest::new(prompt)?
        .with_reference_images(cli.inputs.clone())
        .with_aspect_ratio(settings.aspect_ratio)
        .with_size(settings.size)
        .with_model(Some(settings.choice.model.clone()));

    println!("Generating image...");
    println!("  Prompt: {}", request.prompt);
    if !cli.inputs.is_empty() {
        let inputs = cli
            .inputs
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>();
        println!("  Inputs: {}", inputs.join(", "));
    }
    println!("  Aspect: {}", request.aspect_ratio);
    println!("  Size:   {}", request.size);
    println!("  API:    {}", api_label(&settings.choice));

    let result = nanobanana_engine::generate(
        &settings.choice,
        &request,
        &ProviderSettings::from_env(),
    )?;
    debug!(
        mime = %result.mime_type,
        bytes = result.bytes.len(),
        "received image"
    );

    let output = resolve_output_path(
        cli.output.as_deref(),
        &result.mime_type,
        &chrono::Local::now(),
    );
    if output.adjusted {
        println!(
            "Info: API returned {} format, adjusted output to: {}",
            result.mime_type,
            output.path.display()
        );
    }
    write_output(&output.path, &result.bytes)?;
    println!("\nImage saved to: {}", output.path.display());
    Ok(())
}

fn api_label(choice: &ProviderChoice) -> String {
    match choice.provider {
        ProviderKind::Gemini => ProviderKind::Gemini.to_string(),
        ProviderKind::OpenRouter => format!("OpenRouter ({})", choice.model),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
