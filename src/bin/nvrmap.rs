// NVRMap command line entry point
//
// Usage:
//   nvrmap 123456 789012                  PlainMap directory ./nvrmap
//   nvrmap -e -s report.csv 123456        DetailedReport as one CSV
//   nvrmap -p -b 500                      LegacyReport for a property
//   cargo run --features api --bin nvrmap -- --web --port 5000

use anyhow::Context;
use clap::Parser;
use nvrmap_rust::data::parse_pfi;
use nvrmap_rust::{
    load_config, EnvOverrides, OutputMode, Pipeline, ProcessingOptions, ZoneScheme,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "nvrmap", version, about = "Generate NVRMap / EnSym offset mapping tables")]
struct Cli {
    /// Parcel view PFIs (property PFIs with --property)
    #[arg(value_name = "N", value_parser = pfi_arg)]
    ids: Vec<String>,

    /// Output target: a directory name, or a .csv / .parquet file
    #[arg(short = 's', long = "shapefile", value_name = "NAME", default_value = "nvrmap")]
    shapefile: PathBuf,

    /// Gain score overriding the configured default
    #[arg(short = 'g', long = "gainscore", value_name = "F")]
    gain_score: Option<f64>,

    /// Treat ids as property view PFIs
    #[arg(short = 'p', long = "property")]
    property: bool,

    /// EnSym (2017) report layout
    #[arg(short = 'e', long = "ensym")]
    ensym: bool,

    /// EnSym (2013) layout, takes precedence over --ensym
    #[arg(short = 'b', long = "sbeu")]
    sbeu: bool,

    /// Doubled-letter zone labels after Z (AA, BB, ...) instead of AA, AB, ...
    #[arg(long = "legacy-zones")]
    legacy_zones: bool,

    /// Serve the upload form instead of running once
    #[arg(long)]
    web: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 5000)]
    port: u16,
}

fn pfi_arg(raw: &str) -> Result<String, String> {
    parse_pfi(raw).ok_or_else(|| format!("'{}' is not a PFI (digits only)", raw))
}

impl Cli {
    fn mode(&self) -> OutputMode {
        if self.sbeu {
            OutputMode::LegacyReport
        } else if self.ensym {
            OutputMode::DetailedReport
        } else {
            OutputMode::PlainMap
        }
    }

    fn options(&self) -> ProcessingOptions {
        ProcessingOptions {
            ids: self.ids.clone(),
            output: self.shapefile.clone(),
            gain_score: self.gain_score,
            property_view: self.property,
            mode: self.mode(),
            zone_scheme: if self.legacy_zones {
                ZoneScheme::DoubledLetter
            } else {
                ZoneScheme::Bijective
            },
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "nvrmap_rust=info,nvrmap=info,tower_http=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(feature = "api")]
fn serve(pipeline: Pipeline, host: &str, port: u16) -> anyhow::Result<()> {
    use nvrmap_rust::{create_router, AppState};

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let app = create_router(AppState::new(pipeline));
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app).await?;
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(not(feature = "api"))]
fn serve(_pipeline: Pipeline, _host: &str, _port: u16) -> anyhow::Result<()> {
    anyhow::bail!("--web needs a build with the `api` feature (cargo run --features api)")
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.ids.is_empty() && !cli.web {
        anyhow::bail!("no PFI values given (pass one or more ids, or --web)");
    }

    let config = load_config(&EnvOverrides::from_env()).context("failed to load configuration")?;
    let pipeline = Pipeline::from_config(config)?;

    if cli.web {
        return serve(pipeline, &cli.host, cli.port);
    }

    let options = cli.options();
    tracing::info!("Output: {}", options.output.display());
    let df = pipeline.generate(&options)?;
    tracing::info!("Wrote {} rows", df.height());
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
