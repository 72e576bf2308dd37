use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use lookbook_contracts::events::EventWriter;
use lookbook_contracts::store::{
    ImageCategory, ImageRecord, NewImage, ShootStore, ShotType,
};
use lookbook_engine::{
    compress_image, run_project_shoot, GeminiGateway, ShootMode, ShootOptions, ShotOverrides,
};

#[derive(Debug, Parser)]
#[command(name = "lookbook", version, about = "AI product photo shoot generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a project from product photos and generate its shots.
    Shoot(ShootArgs),
    /// List stored projects.
    Projects(ProjectsArgs),
    /// Write a project's generated shots to a directory.
    Export(ExportArgs),
    /// Compress a single image the way uploads are compressed.
    Compress(CompressArgs),
}

#[derive(Debug, Parser)]
struct ShootArgs {
    #[arg(long, default_value = "lookbook.json")]
    store: PathBuf,
    #[arg(long, default_value = "Untitled shoot")]
    name: String,
    /// Product photo paths; at least one is required.
    #[arg(long, required = true)]
    product: Vec<PathBuf>,
    /// Style reference photos; when present they replace the random scene.
    #[arg(long)]
    style: Vec<PathBuf>,
    #[arg(long)]
    accessory: Vec<PathBuf>,
    #[arg(long)]
    persona: Option<String>,
    #[arg(long)]
    body_type: Option<String>,
    /// composite (one contact sheet) or per-shot (seven chained calls).
    #[arg(long, default_value = "composite")]
    mode: String,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    hero_prompt: Option<String>,
    #[arg(long)]
    full_body_prompt: Option<String>,
    #[arg(long)]
    half_body_prompt: Option<String>,
    #[arg(long)]
    close_up_prompt: Option<String>,
    #[arg(long, default_value = "out")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct ProjectsArgs {
    #[arg(long, default_value = "lookbook.json")]
    store: PathBuf,
}

#[derive(Debug, Parser)]
struct ExportArgs {
    #[arg(long, default_value = "lookbook.json")]
    store: PathBuf,
    #[arg(long)]
    project: u64,
    #[arg(long, default_value = "out")]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct CompressArgs {
    #[arg(long)]
    input: PathBuf,
    /// Optional path for the re-encoded JPEG.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("lookbook error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Shoot(args) => run_shoot(args),
        Command::Projects(args) => run_projects(args),
        Command::Export(args) => run_export(args),
        Command::Compress(args) => run_compress(args),
    }
}

fn run_shoot(args: ShootArgs) -> Result<()> {
    let gateway = GeminiGateway::from_env()?;
    let mut store = ShootStore::open(&args.store)?;

    let project = store.create_project(
        &args.name,
        None,
        args.persona.as_deref(),
        args.body_type.as_deref(),
    )?;
    ingest_images(&mut store, project.id, &args.product, ImageCategory::Product)?;
    ingest_images(&mut store, project.id, &args.style, ImageCategory::Style)?;
    ingest_images(&mut store, project.id, &args.accessory, ImageCategory::Accessory)?;

    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let events = EventWriter::new(&events_path, project.id);

    let options = ShootOptions {
        mode: parse_mode(&args.mode)?,
        seed: args.seed,
        custom_prompts: overrides_from(&args),
    };

    let outcome = run_project_shoot(
        &mut store,
        project.id,
        &gateway,
        &options,
        Some(&events),
        &mut |current, total| {
            eprint!("\rgenerating shot {current}/{total}...");
            let _ = std::io::stderr().flush();
        },
    )?;
    eprintln!();

    for result in &outcome.results {
        match &result.error {
            None => println!("{} #{}: ok", result.shot.as_str(), result.ordinal),
            Some(error) => println!("{} #{}: {error}", result.shot.as_str(), result.ordinal),
        }
    }

    let exported = export_results(&store, project.id, &args.out)?;
    println!(
        "project {} {}: {} shot(s) written to {}",
        project.id,
        outcome.status.as_str(),
        exported,
        args.out.display()
    );
    Ok(())
}

fn run_projects(args: ProjectsArgs) -> Result<()> {
    let store = ShootStore::open(&args.store)?;
    if store.projects().is_empty() {
        println!("no projects in {}", args.store.display());
        return Ok(());
    }
    for project in store.projects() {
        let results = store
            .images_by_category(project.id, ImageCategory::Result)
            .len();
        println!(
            "{:>4}  {:<10}  {:<24}  {} result(s)  updated {}",
            project.id,
            project.status.as_str(),
            project.name,
            results,
            project.updated_at
        );
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    let store = ShootStore::open(&args.store)?;
    if store.get_project(args.project).is_none() {
        bail!("unknown project {}", args.project);
    }
    let exported = export_results(&store, args.project, &args.out)?;
    if exported == 0 {
        bail!("project {} has no generated shots", args.project);
    }
    println!("{exported} shot(s) written to {}", args.out.display());
    Ok(())
}

fn run_compress(args: CompressArgs) -> Result<()> {
    let bytes = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let compressed = compress_image(&bytes)?;
    println!(
        "{}x{} {} quality {} ({} bytes)",
        compressed.width,
        compressed.height,
        compressed.mime_type,
        compressed.quality,
        compressed.size
    );
    if let Some(out) = args.out {
        let decoded = BASE64
            .decode(compressed.data.as_bytes())
            .context("compressed payload base64 decode failed")?;
        fs::write(&out, decoded).with_context(|| format!("failed to write {}", out.display()))?;
        println!("written to {}", out.display());
    }
    Ok(())
}

fn ingest_images(
    store: &mut ShootStore,
    project_id: u64,
    paths: &[PathBuf],
    category: ImageCategory,
) -> Result<()> {
    for path in paths {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let compressed = compress_image(&bytes)
            .with_context(|| format!("failed to compress {}", path.display()))?;
        store.insert_image(
            project_id,
            NewImage::new(category, compressed.data, compressed.mime_type),
        )?;
    }
    Ok(())
}

fn export_results(store: &ShootStore, project_id: u64, out_dir: &Path) -> Result<usize> {
    let results = store.images_by_category(project_id, ImageCategory::Result);
    if !results.is_empty() {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;
    }
    for record in &results {
        let path = out_dir.join(result_file_name(record));
        let decoded = BASE64
            .decode(record.data.as_bytes())
            .with_context(|| format!("result {} is not valid base64", record.id))?;
        fs::write(&path, decoded)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(results.len())
}

fn result_file_name(record: &ImageRecord) -> String {
    let shot = record.shot.as_ref().map(ShotType::as_str).unwrap_or("shot");
    let ordinal = record.ordinal.unwrap_or(0);
    let ext = match record.mime_type.as_str() {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    };
    format!("{shot}-{ordinal}.{ext}")
}

fn parse_mode(raw: &str) -> Result<ShootMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "composite" => Ok(ShootMode::Composite),
        "per-shot" | "per_shot" => Ok(ShootMode::PerShot),
        other => bail!("unknown mode '{other}' (expected composite or per-shot)"),
    }
}

fn overrides_from(args: &ShootArgs) -> ShotOverrides {
    let mut overrides = ShotOverrides::new();
    let pairs = [
        (ShotType::Hero, args.hero_prompt.as_ref()),
        (ShotType::FullBody, args.full_body_prompt.as_ref()),
        (ShotType::HalfBody, args.half_body_prompt.as_ref()),
        (ShotType::CloseUp, args.close_up_prompt.as_ref()),
    ];
    for (shot, prompt) in pairs {
        if let Some(prompt) = prompt {
            overrides.insert(shot, prompt.clone());
        }
    }
    overrides
}

#[cfg(test)]
mod tests {
    use super::{parse_mode, result_file_name};
    use lookbook_contracts::store::{ImageCategory, ImageRecord, ShotType};
    use lookbook_engine::ShootMode;

    #[test]
    fn mode_parsing_accepts_both_spellings() {
        assert_eq!(parse_mode("composite").unwrap(), ShootMode::Composite);
        assert_eq!(parse_mode("per-shot").unwrap(), ShootMode::PerShot);
        assert_eq!(parse_mode("PER_SHOT").unwrap(), ShootMode::PerShot);
        assert!(parse_mode("parallel").is_err());
    }

    #[test]
    fn result_files_are_named_by_shot_and_ordinal() {
        let record = ImageRecord {
            id: 1,
            project_id: 1,
            category: ImageCategory::Result,
            data: "AA==".to_string(),
            mime_type: "image/png".to_string(),
            prompt: None,
            shot: Some(ShotType::FullBody),
            ordinal: Some(2),
        };
        assert_eq!(result_file_name(&record), "full_body-2.png");
    }
}
