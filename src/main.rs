use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use secure_viewer::display::{MemorySlot, SlotContent};
use secure_viewer::guard::{CopyGuard, DocumentEvent, KeyEvent, MemoryDocument};
use secure_viewer::{catalog, Navigation, RenderStatus, Viewer, ViewerConfig, ViewerParts};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "secure-viewer", about = "Rasterizing lesson viewer")]
struct Cli {
    /// Log pipeline activity to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the steps of the built-in lesson
    List,
    /// Navigate to a step, rasterize it, and write the PNG
    Render {
        /// Zero-based step index
        #[arg(long, default_value_t = 0)]
        step: usize,
        #[arg(long)]
        out: PathBuf,
        /// Override the device pixel ratio
        #[arg(long)]
        dpr: Option<f32>,
        /// JSON viewer config
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show which sample events the copy guard suppresses
    GuardDemo,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    // `log` records from the library are bridged through tracing-log
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>, dpr: Option<f32>) -> anyhow::Result<ViewerConfig> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            ViewerConfig::from_json(&text).with_context(|| format!("parsing {}", p.display()))?
        }
        None => ViewerConfig::default(),
    };
    if let Some(dpr) = dpr {
        cfg.device_pixel_ratio = dpr;
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn render(step: usize, out: PathBuf, dpr: Option<f32>, config: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = load_config(config.as_ref(), dpr)?;
    let slot = Arc::new(MemorySlot::new());
    let parts = ViewerParts::software(&cfg, slot.clone())?;
    let viewer = Viewer::new(catalog::default_catalog(), parts, cfg)?;

    if step >= viewer.step_count() {
        bail!("step {} out of range (lesson has {} steps)", step, viewer.step_count());
    }

    let mut last = viewer.start().await;
    while viewer.current_index() < step {
        last = viewer.advance().await;
        if matches!(last, Navigation::Refused { .. } | Navigation::AtBoundary { .. }) {
            bail!("navigation stopped at step {}", viewer.current_index());
        }
    }

    match (last, slot.content()) {
        (Navigation::Rendered { status: RenderStatus::Ready(_), .. }, SlotContent::Image(bitmap)) => {
            std::fs::write(&out, &bitmap.png_data).with_context(|| format!("writing {}", out.display()))?;
            println!(
                "step {} -> {} ({}x{}, attempt {}, sha256 {})",
                step,
                out.display(),
                bitmap.width,
                bitmap.height,
                bitmap.attempt,
                bitmap.digest()
            );
            Ok(())
        }
        (Navigation::Rendered { status: RenderStatus::Failed(reason), .. }, _) => {
            bail!("step {} could not be rasterized: {}", step, reason)
        }
        (other, _) => bail!("unexpected navigation outcome {:?}", other),
    }
}

fn guard_demo() {
    let doc = Arc::new(MemoryDocument::new());
    let samples = [
        ("contextmenu", DocumentEvent::ContextMenu),
        ("copy", DocumentEvent::Copy),
        ("selectstart", DocumentEvent::SelectStart),
        ("ctrl+u", DocumentEvent::KeyDown(KeyEvent::ctrl("u"))),
        ("ctrl+v", DocumentEvent::KeyDown(KeyEvent::ctrl("v"))),
        ("F12", DocumentEvent::KeyDown(KeyEvent::plain("F12"))),
        ("ArrowRight", DocumentEvent::KeyDown(KeyEvent::plain("ArrowRight"))),
    ];

    let handle = CopyGuard::activate(doc.clone());
    for (name, ev) in &samples {
        println!("{:<12} {:?}", name, doc.dispatch(ev));
    }
    let removed = handle.deactivate();
    println!("released {} listeners, {} remaining", removed, doc.listener_count());
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::List => {
            for (i, step) in catalog::default_catalog().iter().enumerate() {
                match &step.subtitle {
                    Some(sub) => println!("{}: {} ({})", i, step.title, sub),
                    None => println!("{}: {}", i, step.title),
                }
            }
            Ok(())
        }
        Command::Render { step, out, dpr, config } => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("building runtime")?;
            rt.block_on(render(step, out, dpr, config))
        }
        Command::GuardDemo => {
            guard_demo();
            Ok(())
        }
    }
}
