use anyhow::Context;
use clap::Parser;
use dicom_render::input::InputSource;
use dicom_render::output::{version_info, DEFAULT_JPEG_QUALITY};
use dicom_render::{pipeline, OutputFormat, RenderConfig};
use std::io::{self, Write};
use std::path::PathBuf;

/// Render a DICOM image headlessly and print JSON or JPEG to stdout.
#[derive(Parser, Debug)]
#[command(name = "dicom-render", version, about)]
struct Cli {
    /// DICOM file to render; standard input is read when omitted
    file: Option<PathBuf>,

    /// Print pipeline and protocol version as JSON and exit
    #[arg(short = 'v', long = "version-info")]
    version_info: bool,

    /// Output format: json or jpeg
    #[arg(long, default_value_t = OutputFormat::Json)]
    output: OutputFormat,

    /// Log to stderr (level from DICOM_RENDER_LOG, default debug)
    #[arg(long)]
    debug: bool,

    /// Record checkpoints; dumped to stderr and attached to JSON output
    #[arg(long)]
    perf: bool,

    /// Render completion timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Fail if a grayscale render has unequal color channels
    #[arg(long)]
    verify_grayscale: bool,
}

impl Cli {
    fn config(&self) -> RenderConfig {
        RenderConfig {
            output: self.output,
            render_timeout_ms: self.timeout_ms,
            jpeg_quality: self.quality,
            perf: self.perf,
            verify_grayscale: self.verify_grayscale,
            ..Default::default()
        }
    }
}

fn init_logging(debug: bool) {
    if !debug {
        return;
    }
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("DICOM_RENDER_LOG", "debug"))
        .target(env_logger::Target::Stderr)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.version_info {
        let info = serde_json::to_string(&version_info())?;
        let mut stdout = io::stdout();
        stdout.write_all(info.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }

    let config = cli.config();
    let source = InputSource::from_arg(cli.file.clone());
    let stdout = io::stdout();
    let stderr = io::stderr();
    pipeline::run(&config, &source, &mut stdout.lock(), &mut stderr.lock())
        .await
        .with_context(|| format!("{} render failed", config.output))?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(&cli).await {
        log::error!("{:#}", e);
        if !cli.debug {
            eprintln!("dicom-render: {:#}", e);
        }
        std::process::exit(1);
    }
}
