// SPDX-License-Identifier: MIT OR Apache-2.0
//! `cellgrid_editor` - headless maintenance for scene-cell folders
//!
//! Lists the cells of a scene folder, prints the entities of one cell,
//! re-saves a cell in normalized form, or writes a default settings file.

use cellgrid_editor_core::persistence::PersistenceError;
use cellgrid_editor_core::settings::SettingsError;
use cellgrid_editor_core::{CellCoord, EditorSettings, SceneGrid, TypeRegistry};
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Settings file read when `--settings` is not given
const DEFAULT_SETTINGS_FILE: &str = "cellgrid_editor.ron";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List,
    Inspect(CellCoord),
    Resave(CellCoord),
    InitSettings(PathBuf),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Options {
    settings: Option<PathBuf>,
    folder: Option<PathBuf>,
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cellgrid_editor_core=info,warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    tracing::debug!("Starting cellgrid_editor v{}", env!("CARGO_PKG_VERSION"));

    let args = env::args().skip(1).collect::<Vec<_>>();
    let result = parse_args(&args).and_then(|(options, command)| {
        run(&command, &options, &mut io::stdout().lock())
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ CliError::Usage(_)) => {
            eprintln!("{e}\n\n{}", usage_text());
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
    }
}

fn parse_args(args: &[String]) -> Result<(Options, Command), CliError> {
    let mut options = Options::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok((options, Command::Help)),
            "--settings" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| CliError::Usage("missing value for --settings".into()))?;
                options.settings = Some(PathBuf::from(value));
                index += 2;
            }
            "--folder" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| CliError::Usage("missing value for --folder".into()))?;
                options.folder = Some(PathBuf::from(value));
                index += 2;
            }
            _ => break,
        }
    }

    let command = args
        .get(index)
        .ok_or_else(|| CliError::Usage("missing command".into()))?
        .as_str();
    let command_args = &args[(index + 1)..];

    let command = match command {
        "list" => {
            if !command_args.is_empty() {
                return Err(CliError::Usage("list takes no arguments".into()));
            }
            Command::List
        }
        "inspect" => Command::Inspect(parse_coord(command, command_args)?),
        "resave" => Command::Resave(parse_coord(command, command_args)?),
        "init-settings" => match command_args {
            [path] => Command::InitSettings(PathBuf::from(path)),
            _ => return Err(CliError::Usage("init-settings requires one file path".into())),
        },
        other => return Err(CliError::Usage(format!("unknown command '{other}'"))),
    };
    Ok((options, command))
}

fn parse_coord(command: &str, args: &[String]) -> Result<CellCoord, CliError> {
    let [x, y] = args else {
        return Err(CliError::Usage(format!("{command} requires <x> <y>")));
    };
    let parse = |value: &String| {
        value
            .parse::<u32>()
            .map_err(|_| CliError::Usage(format!("invalid cell coordinate '{value}'")))
    };
    Ok(CellCoord::new(parse(x)?, parse(y)?))
}

fn load_settings(options: &Options) -> Result<EditorSettings, CliError> {
    let path = options
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let mut settings = EditorSettings::load_or_default(&path)?;
    if let Some(folder) = &options.folder {
        settings.scene_folder = folder.clone();
    }
    Ok(settings)
}

fn open_grid(options: &Options) -> Result<SceneGrid, CliError> {
    let settings = load_settings(options)?;
    let mut grid = SceneGrid::from_settings(&settings);
    grid.discover()?;
    Ok(grid)
}

fn run(command: &Command, options: &Options, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::Help => {
            writeln!(out, "{}", usage_text())?;
        }
        Command::List => {
            let grid = open_grid(options)?;
            let mut found = 0;
            for cell in grid.cells() {
                if let Some(path) = &cell.path {
                    writeln!(out, "{} {} {}", cell.coord, cell.name, path.display())?;
                    found += 1;
                }
            }
            if found == 0 {
                writeln!(out, "No scene files in {}", grid.folder().display())?;
            }
        }
        Command::Inspect(coord) => {
            let types = TypeRegistry::with_builtins();
            let mut grid = open_grid(options)?;
            let report = grid.load(*coord, &types)?;
            let Some(scene) = grid.cell(*coord).and_then(|c| c.loaded.as_ref()) else {
                return Err(PersistenceError::NotLoaded(coord.to_string()).into());
            };
            let registry = &scene.state.registry;
            for (index, entity) in registry.iter().enumerate() {
                let world = registry.world_transform(&entity.id).unwrap_or(entity.transform);
                let parent = entity
                    .parent
                    .and_then(|p| registry.index_of(&p))
                    .map(|i| format!(" parent={i}"))
                    .unwrap_or_default();
                writeln!(
                    out,
                    "{index}: {} \"{}\" at ({:.3}, {:.3}, {:.3}){parent}",
                    entity.type_name,
                    entity.name(),
                    world.position.x,
                    world.position.y,
                    world.position.z,
                )?;
            }
            writeln!(
                out,
                "{} entities, {} placeholders, {} raw fields",
                report.entities, report.placeholders, report.raw_fields
            )?;
        }
        Command::Resave(coord) => {
            let types = TypeRegistry::with_builtins();
            let mut grid = open_grid(options)?;
            grid.load(*coord, &types)?;
            let saved = grid.save(*coord, &types)?;
            writeln!(
                out,
                "Wrote {} rows x {} columns to {}",
                saved.rows,
                saved.columns,
                saved.path.display()
            )?;
        }
        Command::InitSettings(path) => {
            write_default_settings(path)?;
            writeln!(out, "Wrote default settings to {}", path.display())?;
        }
    }
    Ok(())
}

fn write_default_settings(path: &Path) -> Result<(), CliError> {
    EditorSettings::default().save(path)?;
    Ok(())
}

fn usage_text() -> String {
    [
        "cellgrid_editor - scene-cell folder maintenance",
        "",
        "Usage:",
        "  cellgrid_editor [--settings <file>] [--folder <dir>] list",
        "  cellgrid_editor [--settings <file>] [--folder <dir>] inspect <x> <y>",
        "  cellgrid_editor [--settings <file>] [--folder <dir>] resave <x> <y>",
        "  cellgrid_editor init-settings <file>",
        "",
        "Defaults:",
        "  --settings cellgrid_editor.ron (built-in defaults when missing)",
    ]
    .join("\n")
}
