//! Kestrel Browser CLI
//!
//! A headless browser for testing and debugging. Loads one document,
//! optionally drives the compositor for a few frames and writes the result
//! as a PNG, and dumps the pipeline's intermediate trees.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use kestrel_browser::css::{BoxKind, LayoutBoxId, LayoutTree};
use kestrel_browser::dom::NodeId;
use kestrel_browser::html::format_tree;
use kestrel_browser::{
    BrowserConfig, Compositor, DocumentLoader, FileLoader, FontCache, HeadlessPresenter,
    LoadedDocument, MemoryLoader, load_document, no_script,
};
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// URL under which an inline `--html` document is served.
const INLINE_URL: &str = "kestrel://inline/";

#[derive(Parser, Debug)]
#[command(name = "kestrel", version, about = "Headless Kestrel browser")]
struct Cli {
    /// HTML file to load.
    #[arg(required_unless_present = "html", conflicts_with = "html")]
    file: Option<PathBuf>,

    /// Load this HTML string instead of a file.
    #[arg(long)]
    html: Option<String>,

    /// Window width in pixels.
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Window height in pixels, address bar included.
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Drive the compositor and save the final frame to this PNG.
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Frames to draw before taking the screenshot.
    #[arg(long, default_value_t = 2)]
    frames: usize,

    /// Print the display list as JSON.
    #[arg(long)]
    display_list: bool,

    /// Print the layout tree.
    #[arg(long)]
    layout: bool,

    /// Print the DOM tree.
    #[arg(long)]
    dom: bool,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = BrowserConfig {
        width: cli.width,
        height: cli.height,
        ..BrowserConfig::default()
    };
    let fonts = Arc::new(FontCache::load_system());
    let (url, loader) = document_source(&cli);
    debug!(%url, width = cli.width, height = cli.height, "starting");

    let dumps = cli.dom || cli.layout || cli.display_list;
    if dumps || cli.screenshot.is_none() {
        let document = load_document(&url, loader.as_ref(), &config, fonts.as_ref())
            .with_context(|| format!("failed to load '{url}'"))?;
        print_dumps(&cli, &document)?;
    }

    if let Some(path) = &cli.screenshot {
        screenshot(&cli, config, fonts, loader, &url, path)?;
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The URL to open and the loader that serves it.
fn document_source(cli: &Cli) -> (String, Arc<dyn DocumentLoader>) {
    match (&cli.html, &cli.file) {
        (Some(html), _) => (
            INLINE_URL.to_string(),
            Arc::new(MemoryLoader::new().with(INLINE_URL, html)),
        ),
        (None, Some(path)) => (path.display().to_string(), Arc::new(FileLoader)),
        (None, None) => (String::from("about:blank"), Arc::new(FileLoader)),
    }
}

fn print_dumps(cli: &Cli, document: &LoadedDocument) -> Result<()> {
    let everything = !(cli.dom || cli.layout || cli.display_list);

    if cli.dom || everything {
        println!("{}", "=== DOM Tree ===".bold());
        print!("{}", format_tree(&document.dom, NodeId::ROOT));
    }
    if everything {
        println!("\n{}", "=== Stylesheet ===".bold());
        println!("{} rules", document.rules.len());
    }
    if cli.layout || everything {
        println!("\n{}", "=== Layout Tree ===".bold());
        print!("{}", format_layout(&document.layout));
        println!("document height: {:.1}", document.layout.height());
    }
    if cli.display_list {
        println!("\n{}", "=== Display List ===".bold());
        let json = serde_json::to_string_pretty(&document.display_list)
            .context("failed to serialize display list")?;
        println!("{json}");
    } else if everything {
        println!("\n{}", "=== Display List ===".bold());
        println!("{} commands", document.display_list.flatten().len());
    }
    Ok(())
}

/// One line per box, indented by depth.
fn format_layout(tree: &LayoutTree) -> String {
    fn write(tree: &LayoutTree, id: LayoutBoxId, depth: usize, out: &mut String) {
        let Some(layout_box) = tree.get(id) else {
            return;
        };
        let label = match &layout_box.kind {
            BoxKind::Document => "Document".to_string(),
            BoxKind::Block => "Block".to_string(),
            BoxKind::Line => "Line".to_string(),
            BoxKind::Text { word, .. } => format!("Text {word:?}"),
            BoxKind::Input { .. } => "Input".to_string(),
        };
        out.push_str(&format!(
            "{}{} {}\n",
            "  ".repeat(depth),
            label.cyan(),
            format!(
                "({:.1}, {:.1}) {:.1}x{:.1}",
                layout_box.x, layout_box.y, layout_box.width, layout_box.height
            )
            .dimmed()
        ));
        for &child in tree.children(id) {
            write(tree, child, depth + 1, out);
        }
    }

    let mut out = String::new();
    if !tree.is_empty() {
        write(tree, tree.root(), 0, &mut out);
    }
    out
}

fn screenshot(
    cli: &Cli,
    config: BrowserConfig,
    fonts: Arc<FontCache>,
    loader: Arc<dyn DocumentLoader>,
    url: &str,
    path: &Path,
) -> Result<()> {
    let presenter = HeadlessPresenter::new();
    let compositor = Compositor::new(
        config,
        fonts,
        loader,
        no_script(),
        Box::new(presenter.clone()),
    )?;
    let _ = compositor.new_tab(url)?;

    // The first frame is usually the blank one shown before the load commits.
    let drawn = compositor.pump(cli.frames.max(1), Duration::from_secs(5))?;
    compositor.handle_quit();
    if drawn == 0 {
        bail!("no frame was drawn");
    }

    let image = compositor
        .screenshot()
        .context("compositor has no frame to save")?;
    image
        .save(path)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    eprintln!(
        "{} {} ({} frames)",
        "saved".green(),
        path.display(),
        presenter.frames()
    );
    Ok(())
}
