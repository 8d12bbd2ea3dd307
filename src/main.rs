use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use slope_pose::{
    replay::ReplayFactory, scheduler::IntervalScheduler, video::SyntheticVideo, Canvas, Config,
    DetectorGateway, DetectorOptions, FrameLoopController, PlaybackBinder, PlaybackDecision,
    PlaybackEvent,
};
use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;
use tokio::sync::Notify;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Landmark recording to replay. Overrides `detector.model_asset` from the config.
    #[structopt(parse(from_os_str))]
    landmarks: Option<PathBuf>,

    /// TOML config file.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Native width of the video.
    #[structopt(short, long, default_value = "1280")]
    width: u32,

    /// Native height of the video.
    #[structopt(short = "-H", long, default_value = "720")]
    height: u32,

    /// Write the last overlay frame to this PNG.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(short, long)]
    show_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(opt.log_level),
    )?;

    let mut config = match &opt.config {
        Some(path) => Config::load(path).context("failed loading config")?,
        None => Config::default(),
    };
    if let Some(landmarks) = opt.landmarks {
        config.detector.model_asset = landmarks;
    }
    config.validate().context("invalid config")?;

    let gateway = Arc::new(DetectorGateway::new(
        ReplayFactory,
        DetectorOptions::from(&config.detector),
    ));
    let controller = FrameLoopController::new(
        gateway.clone(),
        Arc::new(IntervalScheduler::new(config.frame_rate)),
        &config,
    );
    let video = Arc::new(SyntheticVideo::new(opt.width, opt.height));
    let surface = Arc::new(Mutex::new(Canvas::new(opt.width, opt.height)));
    let binder = PlaybackBinder::new(controller.clone(), video.clone(), surface.clone());

    binder
        .mount()
        .await
        .context("failed initializing pose detector")?;
    let duration = gateway.get_instance().await?.duration();

    let interrupted = Arc::new(Notify::new());
    let interrupted_ctrl_c = interrupted.clone();
    ctrlc::set_handler(move || interrupted_ctrl_c.notify_one())
        .context("failed setting Ctrl-C handler")?;

    if binder.handle(PlaybackEvent::Play).await? == PlaybackDecision::Rejected {
        bail!("playback rejected: pose detector is not ready");
    }
    video.play();
    info!(message = "playing", ?duration);

    let pb_angles = if opt.show_progress {
        Some(
            ProgressBar::new_spinner().with_style(
                ProgressStyle::default_spinner()
                    .template("{prefix:.bold.dim} {spinner} {wide_msg}")
                    .context("failed building progress style")?
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
            ),
        )
    } else {
        None
    };

    let mut angles = controller.subscribe_angles();
    let ended = tokio::time::sleep(duration);
    tokio::pin!(ended);

    loop {
        tokio::select! {
            _ = &mut ended => {
                video.pause();
                binder.handle(PlaybackEvent::Ended).await?;
                break;
            }
            _ = interrupted.notified() => {
                video.pause();
                binder.handle(PlaybackEvent::Pause).await?;
                info!(message = "interrupted");
                break;
            }
            changed = angles.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *angles.borrow_and_update();
                debug!(message = "angles", %current);
                if let Some(pb_angles) = &pb_angles {
                    pb_angles.set_message(current.to_string());
                    pb_angles.inc(1);
                }
            }
        }
    }

    if let Some(pb_angles) = pb_angles {
        pb_angles.finish_and_clear();
    }
    info!(message = "playback finished", angles = %controller.angles());

    if let Some(output) = &opt.output {
        surface
            .lock()
            .save(output)
            .context("failed writing overlay image")?;
        info!(message = "wrote overlay", path = ?output);
    }

    binder.unmount();
    Ok(())
}
