use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use psd2scene::{
    ConvertOptions, Converter, Diagnostics, FontdbResolver, GroupNode, LayerKind, MemoryScene,
    Node, ParsedDocument, Severity,
};

#[derive(Parser, Debug)]
#[command(name = "psd2scene", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert parsed document JSON into a scene JSON.
    Convert(ConvertArgs),
    /// Print the classified layer tree.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input document JSON (one document or an array of documents).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output scene JSON path.
    #[arg(long)]
    out: PathBuf,

    /// Conversion options JSON; flags below override it.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Create hidden layers as invisible blocks.
    #[arg(long, default_value_t = false)]
    hidden: bool,

    /// Do not group blocks that shared a source group.
    #[arg(long, default_value_t = false)]
    no_group: bool,

    /// Do not run the letter-spacing fit search on paragraph text.
    #[arg(long, default_value_t = false)]
    no_fit: bool,

    /// Target DPI used to scale font sizes.
    #[arg(long)]
    dpi: Option<f64>,

    /// Font directory to load (repeatable).
    #[arg(long = "fonts")]
    fonts: Vec<PathBuf>,

    /// Also load system fonts.
    #[arg(long, default_value_t = false)]
    system_fonts: bool,

    /// Directory receiving every image fill as `<hash>.png`.
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Write diagnostics as JSON to this path.
    #[arg(long)]
    diagnostics: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input document JSON (one document or an array of documents).
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "psd2scene=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Convert(args) => cmd_convert(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn read_documents(path: &Path) -> anyhow::Result<Vec<ParsedDocument>> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("read document '{}'", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&src)
        .with_context(|| format!("parse document json '{}'", path.display()))?;
    let docs = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|doc| vec![doc])
    }
    .with_context(|| format!("decode document '{}'", path.display()))?;
    Ok(docs)
}

fn load_options(args: &ConvertArgs) -> anyhow::Result<ConvertOptions> {
    let mut opts = match &args.options {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("read options '{}'", path.display()))?;
            ConvertOptions::from_json_str(&src)?
        }
        None => ConvertOptions::default(),
    };
    if args.hidden {
        opts.create_hidden_layers = true;
    }
    if args.no_group {
        opts.group_layers = false;
    }
    if args.no_fit {
        opts.fit_text_boxes = false;
    }
    if let Some(dpi) = args.dpi {
        opts.target_dpi = dpi;
    }
    opts.validate()?;
    Ok(opts)
}

fn build_resolver(args: &ConvertArgs) -> anyhow::Result<FontdbResolver> {
    let mut resolver = FontdbResolver::new();
    if args.system_fonts {
        resolver.load_system_fonts();
    }
    for dir in &args.fonts {
        let n = resolver.load_fonts_dir(dir)?;
        tracing::debug!(dir = %dir.display(), faces = n, "loaded font directory");
    }
    Ok(resolver)
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let docs = read_documents(&args.in_path)?;
    let opts = load_options(&args)?;
    let resolver = build_resolver(&args)?;

    let mut scene = MemoryScene::new();
    let mut converter = Converter::new(opts)?.with_resolver(resolver);
    let report = converter.convert_pages(&mut scene, &docs)?;

    write_file(&args.out, scene.to_json_pretty()?.as_bytes())?;

    if let Some(dir) = &args.assets_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create assets dir '{}'", dir.display()))?;
        for (uri, png) in scene.images() {
            let name = uri.strip_prefix("buffer://").unwrap_or(uri);
            write_file(&dir.join(format!("{name}.png")), png)?;
        }
    }

    if let Some(path) = &args.diagnostics {
        let json = serde_json::to_string_pretty(&report.diagnostics)
            .context("serialize diagnostics")?;
        write_file(path, json.as_bytes())?;
    }

    print_summary(&report.diagnostics);
    eprintln!(
        "converted {} page(s): {} layer(s), {} skipped, {} group(s)",
        report.pages.len(),
        report.layers_converted,
        report.layers_skipped,
        report.groups_created
    );
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn print_summary(diagnostics: &Diagnostics) {
    eprintln!(
        "diagnostics: {} error(s), {} warning(s), {} info",
        diagnostics.count(Severity::Error),
        diagnostics.count(Severity::Warning),
        diagnostics.count(Severity::Info)
    );
    for d in diagnostics.entries() {
        if d.severity == Severity::Info {
            continue;
        }
        match &d.layer {
            Some(layer) => eprintln!("  [{:?}] {layer}: {}", d.severity, d.message),
            None => eprintln!("  [{:?}] {}", d.severity, d.message),
        }
    }
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    for doc in read_documents(&args.in_path)? {
        doc.validate()?;
        println!(
            "{} ({}x{}, {} layers)",
            doc.name,
            doc.width,
            doc.height,
            doc.layer_count()
        );
        let mut ancestors = Vec::new();
        print_nodes(&doc.children, &mut ancestors, 1);
    }
    Ok(())
}

fn print_nodes<'a>(nodes: &'a [Node], ancestors: &mut Vec<&'a GroupNode>, depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            Node::Group(g) => {
                println!(
                    "{indent}group '{}' opacity={} blend={:?}{}{}",
                    g.name,
                    g.opacity,
                    g.blend_mode,
                    if g.vector_mask.is_some() { " masked" } else { "" },
                    if g.visible { "" } else { " hidden" },
                );
                ancestors.push(g);
                print_nodes(&g.children, ancestors, depth + 1);
                ancestors.pop();
            }
            Node::Layer(l) => {
                let kind = LayerKind::classify(l);
                // Raster blocks carry baked-in layer opacity.
                let mut scratch = Diagnostics::new();
                let opacity = psd2scene::effective_opacity(
                    l,
                    ancestors,
                    kind.is_raster(),
                    &mut scratch,
                );
                println!(
                    "{indent}{} '{}' at ({}, {}) {}x{} opacity={opacity:.3} blend={:?}{}",
                    kind.label(),
                    l.name,
                    l.left,
                    l.top,
                    l.width,
                    l.height,
                    l.blend_mode,
                    if l.visible { "" } else { " hidden" },
                );
            }
        }
    }
}
