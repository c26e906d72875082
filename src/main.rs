use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, anyhow};

use gpu_blur::assets::{FileSource, ImageSource};
use gpu_blur::blur::{BlurConfig, BlurRenderer};
use gpu_blur::gpu::GpuContext;
use gpu_blur::kernel::{MAX_RADIUS, SigmaPolicy, WeightNormalization};
use gpu_blur::pipeline::ConvolutionStrategy;
use gpu_blur::snapshot::{Snapshot, SnapshotFormat};

#[derive(Debug, Default, Clone)]
struct Cli {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    radius: Option<u32>,
    naive: bool,
    sigma_policy: Option<SigmaPolicy>,
    legacy_weights: bool,
    data_uri: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --input"));
                };
                cli.input = Some(PathBuf::from(v));
                i += 2;
            }
            "--output" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output"));
                };
                cli.output = Some(PathBuf::from(v));
                i += 2;
            }
            "--config" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --config"));
                };
                cli.config = Some(PathBuf::from(v));
                i += 2;
            }
            "--radius" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --radius"));
                };
                let radius: u32 = v
                    .parse()
                    .map_err(|e| anyhow!("invalid --radius {v}: {e}"))?;
                cli.radius = Some(radius);
                i += 2;
            }
            "--naive" => {
                cli.naive = true;
                i += 1;
            }
            "--sigma-policy" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --sigma-policy"));
                };
                cli.sigma_policy = Some(match v.as_str() {
                    "boost" => SigmaPolicy::SmallRadiusBoost,
                    "decay-corrected" => SigmaPolicy::DecayCorrected,
                    other => {
                        return Err(anyhow!(
                            "unknown sigma policy: {other} (supported: boost, decay-corrected)"
                        ));
                    }
                });
                i += 2;
            }
            "--legacy-weights" => {
                cli.legacy_weights = true;
                i += 1;
            }
            "--data-uri" => {
                cli.data_uri = true;
                i += 1;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --input <image>, --output <png>, \
                     --config <json>, --radius <0..={MAX_RADIUS}>, --naive, \
                     --sigma-policy <boost|decay-corrected>, --legacy-weights, --data-uri)"
                ));
            }
        }
    }
    Ok(cli)
}

/// Config file first, then CLI flags override individual fields.
fn resolve_config(cli: &Cli) -> Result<BlurConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow!("failed to read --config file {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| anyhow!("invalid config in {}: {e}", path.display()))?
        }
        None => BlurConfig::default(),
    };
    if let Some(radius) = cli.radius {
        config.radius = radius;
    }
    if cli.naive {
        config.strategy = ConvolutionStrategy::Naive2d;
    }
    if let Some(policy) = cli.sigma_policy {
        config.sigma_policy = policy;
    }
    if cli.legacy_weights {
        config.normalization = WeightNormalization::Legacy;
    }
    if cli.data_uri {
        config.output = SnapshotFormat::DataUri;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let input = cli
        .input
        .ok_or_else(|| anyhow!("--input <image> is required"))?;
    if config.radius > MAX_RADIUS {
        eprintln!(
            "[gpu-blur] radius {} exceeds the kernel bound, clamping to {MAX_RADIUS}",
            config.radius
        );
    }

    let source = FileSource::new(&input);
    let image = source.load().map_err(|e| anyhow!("{e}"))?;
    eprintln!(
        "[gpu-blur] loaded {} ({}x{})",
        source.describe(),
        image.width(),
        image.height()
    );

    let ctx = GpuContext::new().map_err(|e| anyhow!("{e}"))?;
    let mut renderer = BlurRenderer::new(ctx, &image, &config).map_err(|e| anyhow!("{e}"))?;

    let started = Instant::now();
    let pixels = renderer.render(config.radius).map_err(|e| anyhow!("{e}"))?;
    eprintln!(
        "[gpu-blur] rendered radius {} ({:?}) in {:.1} ms",
        config.radius.min(MAX_RADIUS),
        config.strategy,
        started.elapsed().as_secs_f64() * 1000.0
    );

    match Snapshot::from_pixels(pixels, config.output).map_err(|e| anyhow!("{e}"))? {
        Snapshot::Pixels(image) => {
            let out = cli
                .output
                .ok_or_else(|| anyhow!("--output <png> is required unless --data-uri is set"))?;
            image
                .save(&out)
                .map_err(|e| anyhow!("failed to save {}: {e}", out.display()))?;
            println!("[gpu-blur] saved: {}", out.display());
        }
        Snapshot::DataUri(uri) => match cli.output {
            Some(out) => {
                std::fs::write(&out, &uri)
                    .map_err(|e| anyhow!("failed to write {}: {e}", out.display()))?;
                println!("[gpu-blur] saved: {}", out.display());
            }
            None => println!("{uri}"),
        },
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_cli(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("[gpu-blur] {e:#}");
            std::process::exit(2);
        }
    };
    if let Err(e) = run(cli) {
        eprintln!("[gpu-blur] {e:#}");
        std::process::exit(1);
    }
}
