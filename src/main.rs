use anyhow::Result;
use clap::Parser;
use letterforge::{archive::ARCHIVE_NAME, pipeline, LetterError, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Generate one appointment letter per spreadsheet row and zip them"
)]
struct Args {
    /// Employee spreadsheet (.xls / .xlsx)
    #[arg(short, long)]
    data: PathBuf,
    /// Word template containing {input_*} markers
    #[arg(short, long)]
    template: PathBuf,
    #[arg(short, long, default_value = ARCHIVE_NAME)]
    output: PathBuf,
    /// Worksheet name (defaults to the first sheet)
    #[arg(long)]
    sheet: Option<String>,
    /// Keep the generated letters in this directory
    #[arg(long)]
    letters_dir: Option<PathBuf>,
    /// Write a JSON summary of the generated letters
    #[arg(long)]
    report: Option<PathBuf>,
}

impl From<Args> for PipelineConfig {
    fn from(args: Args) -> Self {
        PipelineConfig {
            data: args.data,
            template: args.template,
            output: args.output,
            sheet: args.sheet,
            letters_dir: args.letters_dir,
            report: args.report,
        }
    }
}

fn main() -> Result<ExitCode> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = PipelineConfig::from(Args::parse());
    info!(data = %config.data.display(), template = %config.template.display(), "startup");

    match pipeline::run(&config) {
        Ok(report) => {
            info!(
                letters = report.letters.len(),
                archive = %config.output.display(),
                "all letters generated"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => match err.downcast_ref::<LetterError>() {
            Some(LetterError::MissingColumns(_)) => {
                error!("{}", err);
                Ok(ExitCode::FAILURE)
            }
            _ => Err(err),
        },
    }
}
