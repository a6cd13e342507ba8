//! gridsketch CLI
//!
//! Composes images onto the grid canvas and writes the result as a PNG.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridsketch::{
    Configurable, Editor, EditorSettings, GridLayout, GridSettings, Result, SketchSettings,
};

/// Grid layout presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// 32px cells.
    Cells,
    /// 3×3 divisions.
    Nine,
    /// 48×33 divisions.
    Large,
}

/// Compose images on a 1051×1500 grid canvas.
#[derive(Parser, Debug)]
#[command(name = "gridsketch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input images, inserted in order (the last one ends up on top).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output PNG. Defaults to the suggested export name.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings JSON applied before the command-line overrides.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Grid layout preset.
    #[arg(long, value_enum, conflicts_with_all = ["rows", "cols"])]
    preset: Option<Preset>,

    /// Grid rows (with --cols).
    #[arg(long, requires = "cols")]
    rows: Option<u32>,

    /// Grid columns (with --rows).
    #[arg(long, requires = "rows")]
    cols: Option<u32>,

    /// Grid colour as #rrggbb.
    #[arg(long)]
    color: Option<String>,

    /// Grid opacity (0.0-1.0).
    #[arg(long)]
    opacity: Option<f32>,

    /// Add a sketch of the last input as a new layer.
    #[arg(long)]
    sketch: bool,

    /// Sketch darkness (0.0-1.0).
    #[arg(long)]
    darkness: Option<f32>,
}

impl Cli {
    fn layout(&self) -> Option<GridLayout> {
        if let (Some(rows), Some(cols)) = (self.rows, self.cols) {
            return Some(GridLayout::Divisions { rows, cols });
        }
        self.preset.map(|preset| match preset {
            Preset::Cells => GridLayout::default(),
            Preset::Nine => GridLayout::NINE_GRID,
            Preset::Large => GridLayout::LARGE_GRID,
        })
    }

    fn settings(&self) -> Result<EditorSettings> {
        let mut settings = match &self.settings {
            Some(path) => EditorSettings::from_json(&fs::read_to_string(path)?)?,
            None => EditorSettings::default(),
        };

        let grid = &mut settings.grid;
        if let Some(layout) = self.layout() {
            grid.layout = layout.into();
        }
        if let Some(color) = &self.color {
            grid.color = color.clone();
        }
        if let Some(opacity) = self.opacity {
            grid.opacity = opacity;
        }
        if let Some(darkness) = self.darkness {
            settings.sketch = SketchSettings { darkness };
        }
        Ok(settings)
    }
}

fn mime_for(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;
    let mut editor = Editor::with_settings(&settings)?;

    let mut last = None;
    for path in &cli.inputs {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        last = editor.add_image(&bytes, mime_for(path), &name).or(last);
    }

    if cli.sketch {
        match last {
            Some(index) => {
                editor.select(Some(index))?;
                editor.apply_sketch_to_selected();
            }
            None => info!("no image to sketch"),
        }
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(editor.export_file_name()));
    let png = editor.export_png()?;
    fs::write(&output, &png)?;

    let GridSettings { layout, .. } = editor.export_settings().grid;
    info!(
        path = %output.display(),
        layers = editor.document().len(),
        ?layout,
        bytes = png.len(),
        "exported"
    );
    Ok(())
}
