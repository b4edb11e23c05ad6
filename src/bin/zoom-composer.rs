use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use zoom_composer::{
    CancelToken, Dimension, Direction, EASING_NAMES, EngineKind, JobSpec, Resampling, ZoomError,
};

#[derive(Parser, Debug)]
#[command(name = "zoom-composer", version)]
struct Cli {
    /// Log debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an infinite-zoom video from nested images (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// List the supported easing functions.
    Easings,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Image files or directories of images, outermost first.
    #[arg(required_unless_present = "job")]
    images: Vec<PathBuf>,

    /// Job description JSON; flags given on the command line override its values.
    #[arg(long)]
    job: Option<PathBuf>,

    /// Audio track added to the video, trimmed to its duration.
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Zoom ratio between consecutive images [default: 2.0].
    #[arg(short, long)]
    zoom: Option<f64>,

    /// Video duration in seconds [default: 10].
    #[arg(short, long)]
    duration: Option<f64>,

    /// Easing function, see `zoom-composer easings` [default: easeInOutSine].
    #[arg(short, long)]
    easing: Option<String>,

    /// Exponent of the easeInPow/easeOutPow/easeInOutPow easings [default: 2.0].
    #[arg(long)]
    easing_power: Option<f64>,

    /// Fraction of the video spent accelerating for linearWithInOutEase [default: 0.1].
    #[arg(long)]
    ease_duration: Option<f64>,

    /// Zoom direction: in, out, inout or outin [default: out].
    #[arg(short = 'r', long)]
    direction: Option<Direction>,

    /// Output video file [default: output.mp4].
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Worker threads; 0 or negative means available cores minus that many [default: -1].
    #[arg(short, long, allow_negative_numbers = true)]
    threads: Option<i64>,

    /// Directory holding the resumable frame caches [default: tmp].
    #[arg(long)]
    tmp_dir: Option<PathBuf>,

    /// Frames per second [default: 30].
    #[arg(short, long)]
    fps: Option<u32>,

    /// Output width; values <= 1 are a fraction of the first image [default: 1].
    #[arg(short, long)]
    width: Option<Dimension>,

    /// Output height; values <= 1 are a fraction of the first image [default: 1].
    #[arg(short = 'H', long)]
    height: Option<Dimension>,

    /// Resampling filter: nearest, box, bilinear, hamming, bicubic or lanczos [default: lanczos].
    #[arg(short = 's', long)]
    resampling: Option<Resampling>,

    /// Image engine: image or skia [default: image].
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Blend margin; values <= 1 are a fraction of the smaller image side [default: 0.05].
    #[arg(short, long)]
    margin: Option<Dimension>,

    /// Keep the rendered frames after the video is written.
    #[arg(long)]
    keep_frames: bool,

    /// Only render frames; implies --keep-frames.
    #[arg(long)]
    skip_video_generation: bool,

    /// Reverse the order of the images.
    #[arg(long)]
    reverse_images: bool,

    /// Save the blended pyramid layers for inspection and stop.
    #[arg(long)]
    inspect_blend: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Easings => {
            for name in EASING_NAMES {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    if let Err(e) = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("warning: logging disabled: {e}");
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let spec = build_spec(args)?;
    let cancel = CancelToken::new();
    watch_ctrl_c(cancel.clone());

    let outcome = match zoom_composer::run_job(&spec, &cancel) {
        Err(ZoomError::Interrupted) => {
            anyhow::bail!("interrupted; run the same command again to resume")
        }
        other => other?,
    };

    if !outcome.blend_layers.is_empty() {
        eprintln!(
            "wrote {} blend layers to {}",
            outcome.blend_layers.len(),
            outcome.job_dir.display()
        );
    } else if let Some(video) = &outcome.video {
        eprintln!("wrote {}", video.display());
    } else {
        eprintln!(
            "wrote {} frames to {}",
            outcome.frames_total,
            outcome.job_dir.display()
        );
    }
    Ok(())
}

fn build_spec(args: RenderArgs) -> anyhow::Result<JobSpec> {
    let mut spec = match &args.job {
        Some(path) => JobSpec::from_json_file(path)?,
        None => JobSpec::default(),
    };

    if !args.images.is_empty() {
        spec.images = args.images;
    }
    if args.audio.is_some() {
        spec.audio = args.audio;
    }
    if let Some(v) = args.zoom {
        spec.zoom = v;
    }
    if let Some(v) = args.duration {
        spec.duration = v;
    }
    if let Some(v) = args.easing {
        spec.easing = v;
    }
    if let Some(v) = args.easing_power {
        spec.easing_power = v;
    }
    if let Some(v) = args.ease_duration {
        spec.ease_duration = v;
    }
    if let Some(v) = args.direction {
        spec.direction = v;
    }
    if let Some(v) = args.output {
        spec.output = v;
    }
    if let Some(v) = args.threads {
        spec.threads = v;
    }
    if let Some(v) = args.tmp_dir {
        spec.tmp_dir = v;
    }
    if let Some(v) = args.fps {
        spec.fps = v;
    }
    if let Some(v) = args.width {
        spec.width = v;
    }
    if let Some(v) = args.height {
        spec.height = v;
    }
    if let Some(v) = args.resampling {
        spec.resampling = v;
    }
    if let Some(v) = args.engine {
        spec.engine = v;
    }
    if let Some(v) = args.margin {
        spec.margin = v;
    }
    spec.keep_frames |= args.keep_frames;
    spec.skip_video_generation |= args.skip_video_generation;
    spec.reverse_images |= args.reverse_images;
    spec.inspect_blend |= args.inspect_blend;
    Ok(spec)
}

// The first Ctrl-C lets in-flight frames finish; a second one exits immediately.
fn watch_ctrl_c(cancel: CancelToken) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!("cannot watch for Ctrl-C: {e}");
                return;
            }
        };
        rt.block_on(async {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            tracing::warn!("interrupt received, finishing frames in flight");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    });
}
