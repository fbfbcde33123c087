use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use timeline::{
    format_timestamp, prepare_render, seconds_to_frame, unresolved_fonts, AudioEnvelope,
    EditCommand, Editor, EditorConfig, FontEntry, MemoryFontCatalog, OverlayId, Project,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "studio-cli")]
#[command(about = "Creative studio CLI - Headless timeline editing and render checks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Editor configuration (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty project
    New {
        /// Project name
        name: String,

        /// Output project file
        #[arg(short, long)]
        output: PathBuf,

        /// Frame rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Duration in frames
        #[arg(long, default_value = "900")]
        duration: i64,

        /// Number of empty tracks to create
        #[arg(long, default_value = "1")]
        tracks: usize,
    },

    /// Print tracks and overlays of a project
    Inspect {
        /// Project file path
        project: PathBuf,
    },

    /// Apply a JSON list of edit commands to a project
    Apply {
        /// Project file path
        #[arg(short, long)]
        project: PathBuf,

        /// File containing a JSON array of edit commands
        #[arg(long)]
        commands: PathBuf,

        /// Output project file (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip commands that fail instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// List font families missing from a catalog
    CheckFonts {
        /// Project file path
        #[arg(short, long)]
        project: PathBuf,

        /// Font catalog (JSON array of font entries)
        #[arg(long)]
        fonts: PathBuf,
    },

    /// Resolve fonts and write the render request for the renderer
    PrepareRender {
        /// Project file path
        #[arg(short, long)]
        project: PathBuf,

        /// Font catalog (JSON array of font entries)
        #[arg(long)]
        fonts: PathBuf,

        /// Output render request file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the audio gain of an overlay
    Envelope {
        /// Project file path
        #[arg(short, long)]
        project: PathBuf,

        /// Overlay id
        #[arg(long)]
        overlay: String,

        /// Single frame (relative to the overlay start); whole curve if omitted
        #[arg(long, conflicts_with = "seconds")]
        frame: Option<i64>,

        /// Single point in seconds (relative to the overlay start)
        #[arg(long)]
        seconds: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::New {
            name,
            output,
            fps,
            duration,
            tracks,
        } => new_command(name, output, fps, duration, tracks),
        Commands::Inspect { project } => inspect_command(&config, project),
        Commands::Apply {
            project,
            commands,
            output,
            keep_going,
        } => apply_command(&config, project, commands, output, keep_going),
        Commands::CheckFonts { project, fonts } => check_fonts_command(project, fonts),
        Commands::PrepareRender {
            project,
            fonts,
            output,
        } => prepare_render_command(project, fonts, output),
        Commands::Envelope {
            project,
            overlay,
            frame,
            seconds,
        } => envelope_command(&config, project, overlay, frame, seconds),
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EditorConfig::from_json_str(&json)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!("Loaded config from {:?}", path);
    Ok(config)
}

fn load_project(path: &Path) -> Result<Project> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading project {}", path.display()))?;
    Project::from_json(&json).with_context(|| format!("loading project {}", path.display()))
}

fn save_project(project: &Project, path: &Path) -> Result<()> {
    std::fs::write(path, project.to_json()?)
        .with_context(|| format!("writing project {}", path.display()))
}

fn load_catalog(path: &Path) -> Result<MemoryFontCatalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading font catalog {}", path.display()))?;
    let entries: Vec<FontEntry> = serde_json::from_str(&json)
        .with_context(|| format!("parsing font catalog {}", path.display()))?;
    Ok(MemoryFontCatalog::new(entries))
}

fn new_command(
    name: String,
    output: PathBuf,
    fps: u32,
    duration: i64,
    tracks: usize,
) -> Result<()> {
    if fps == 0 {
        return Err(anyhow::anyhow!("fps must be positive"));
    }
    let mut project = Project::new(name, fps, duration);
    for i in 0..tracks {
        project.add_track(format!("Track {}", i + 1));
    }
    project.validate()?;
    save_project(&project, &output)?;
    info!(
        "Created project '{}' ({} tracks, {} frames at {} fps) at {:?}",
        project.name,
        project.tracks.len(),
        duration,
        fps,
        output
    );
    Ok(())
}

fn inspect_command(config: &EditorConfig, path: PathBuf) -> Result<()> {
    let project = load_project(&path)?;
    println!(
        "{}: {} fps, {} frames ({}, {:.2}s)",
        project.name,
        project.fps,
        project.duration_in_frames,
        format_timestamp(project.duration_in_frames, project.fps),
        project.duration_seconds()
    );
    for (index, track) in project.tracks.iter().enumerate() {
        println!("track {} {} [{}]", index, track.name, track.id);
        for overlay in &track.overlays {
            let source = overlay
                .start_from_source()
                .map(|s| format!(" source+{}", s))
                .unwrap_or_default();
            let (left, width) = config.scale.item_rect(
                overlay.start,
                overlay.duration_in_frames,
                project.duration_in_frames,
                project.fps,
            );
            println!(
                "  {:<8} {} {} -> {} ({} frames, x={:.1}px w={:.1}px){}",
                overlay.kind.name(),
                overlay.id,
                format_timestamp(overlay.start, project.fps),
                format_timestamp(overlay.end(), project.fps),
                overlay.duration_in_frames,
                left,
                width,
                source
            );
        }
    }
    Ok(())
}

fn apply_command(
    config: &EditorConfig,
    project_path: PathBuf,
    commands_path: PathBuf,
    output: Option<PathBuf>,
    keep_going: bool,
) -> Result<()> {
    let mut project = load_project(&project_path)?;
    let json = std::fs::read_to_string(&commands_path)
        .with_context(|| format!("reading commands {}", commands_path.display()))?;
    let commands: Vec<EditCommand> = serde_json::from_str(&json)
        .with_context(|| format!("parsing commands {}", commands_path.display()))?;

    info!("Applying {} commands to {:?}", commands.len(), project_path);

    let editor = Editor::new(config.edit);
    let mut applied = 0;
    for (index, command) in commands.into_iter().enumerate() {
        let name = command.name();
        match editor.apply(&project, command) {
            Ok(outcome) => {
                for id in &outcome.created {
                    info!("Command {} ({}) created overlay {}", index, name, id);
                }
                for id in &outcome.removed_tracks {
                    info!("Command {} ({}) removed empty track {}", index, name, id);
                }
                project = outcome.project;
                applied += 1;
            }
            Err(e) if keep_going => {
                warn!("Skipping command {} ({}): {}", index, name, e);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("command {} ({}) failed", index, name));
            }
        }
    }

    let output = output.unwrap_or(project_path);
    save_project(&project, &output)?;
    info!("Applied {} commands, wrote {:?}", applied, output);
    Ok(())
}

fn check_fonts_command(project_path: PathBuf, fonts_path: PathBuf) -> Result<()> {
    let project = load_project(&project_path)?;
    let catalog = load_catalog(&fonts_path)?;
    let missing = unresolved_fonts(&project, &catalog);

    if missing.is_empty() {
        info!("All fonts resolved ({} catalog entries)", catalog.len());
        return Ok(());
    }
    for family in &missing {
        println!("{}", family);
    }
    Err(anyhow::anyhow!("{} font families unresolved", missing.len()))
}

fn prepare_render_command(
    project_path: PathBuf,
    fonts_path: PathBuf,
    output: PathBuf,
) -> Result<()> {
    let project = load_project(&project_path)?;
    let catalog = load_catalog(&fonts_path)?;
    let request = prepare_render(&project, &catalog)?;
    std::fs::write(&output, serde_json::to_string_pretty(&request)?)
        .with_context(|| format!("writing render request {}", output.display()))?;
    info!("Render request written to {:?}", output);
    Ok(())
}

fn envelope_command(
    config: &EditorConfig,
    project_path: PathBuf,
    overlay: String,
    frame: Option<i64>,
    seconds: Option<f64>,
) -> Result<()> {
    let project = load_project(&project_path)?;
    let id = OverlayId(overlay.parse().with_context(|| format!("invalid overlay id {}", overlay))?);
    let item = project
        .overlay(id)
        .ok_or(timeline::TimelineError::OverlayNotFound(id))?;
    let envelope = AudioEnvelope::for_overlay(item, config.envelope_fps)
        .ok_or_else(|| anyhow::anyhow!("overlay {} ({}) has no audio", id, item.kind.name()))?;

    let frame = frame.or_else(|| seconds.map(|s| seconds_to_frame(s, project.fps)));
    match frame {
        Some(frame) => println!("{:.4}", envelope.gain_at(frame)),
        None => {
            for (frame, gain) in envelope.curve().iter().enumerate() {
                println!("{}\t{:.4}", frame, gain);
            }
        }
    }
    Ok(())
}
