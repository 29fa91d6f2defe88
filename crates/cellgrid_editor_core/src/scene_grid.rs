// SPDX-License-Identifier: MIT OR Apache-2.0
//! The world as a fixed grid of scene cells, one scene file per cell.

use crate::persistence::{self, LoadReport, PersistenceError, SaveReport};
use crate::scene::{LoadedScene, SceneState};
use crate::settings::EditorSettings;
use crate::types::TypeRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default file stem of a cell without a file
pub const UNTITLED_PREFIX: &str = "untitled_scene";

/// Position of a cell in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellCoord {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl CellCoord {
    /// Create a coordinate
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Parse the first `[x,y]` tag in a file stem
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let open = stem.find('[')?;
        let close = open + stem[open..].find(']')?;
        let (x, y) = stem[open + 1..close].split_once(',')?;
        Some(Self::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

/// One cell of the grid
#[derive(Debug)]
pub struct SceneCell {
    /// Grid position
    pub coord: CellCoord,
    /// Display name, the file stem once a file is known
    pub name: String,
    /// Scene file, if one exists
    pub path: Option<PathBuf>,
    /// Contents while loaded
    pub loaded: Option<LoadedScene>,
}

impl SceneCell {
    fn untitled(coord: CellCoord) -> Self {
        Self {
            coord,
            name: format!("{UNTITLED_PREFIX}{coord}"),
            path: None,
            loaded: None,
        }
    }

    /// Whether the cell is loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }
}

/// Grid of scene cells backed by a folder of scene files
#[derive(Debug)]
pub struct SceneGrid {
    width: u32,
    height: u32,
    folder: PathBuf,
    extension: String,
    delimiter: char,
    max_undo_depth: usize,
    cells: Vec<SceneCell>,
    current: Option<CellCoord>,
}

impl SceneGrid {
    /// Create a grid of untitled cells with the default file format
    pub fn new(folder: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        let defaults = EditorSettings::default();
        let width = width.max(1);
        let height = height.max(1);
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| SceneCell::untitled(CellCoord::new(x, y))))
            .collect();
        Self {
            width,
            height,
            folder: folder.into(),
            extension: defaults.scene_extension,
            delimiter: defaults.delimiter,
            max_undo_depth: defaults.max_undo_depth,
            cells,
            current: None,
        }
    }

    /// Create a grid laid out and formatted per `settings`
    pub fn from_settings(settings: &EditorSettings) -> Self {
        let mut grid = Self::new(
            settings.scene_folder.clone(),
            settings.grid_width,
            settings.grid_height,
        );
        grid.extension = settings.scene_extension.clone();
        grid.delimiter = settings.delimiter;
        grid.max_undo_depth = settings.max_undo_depth;
        grid
    }

    /// Grid width in cells
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Folder holding the scene files
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Field delimiter of the scene files
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// All cells, row by row
    pub fn cells(&self) -> impl Iterator<Item = &SceneCell> {
        self.cells.iter()
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        (coord.x < self.width && coord.y < self.height)
            .then(|| (coord.y * self.width + coord.x) as usize)
    }

    /// Look up a cell
    pub fn cell(&self, coord: CellCoord) -> Option<&SceneCell> {
        self.index(coord).and_then(|i| self.cells.get(i))
    }

    /// Look up a cell mutably
    pub fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut SceneCell> {
        self.index(coord).and_then(|i| self.cells.get_mut(i))
    }

    fn require_cell_mut(&mut self, coord: CellCoord) -> Result<&mut SceneCell, PersistenceError> {
        self.cell_mut(coord)
            .ok_or_else(|| PersistenceError::OutOfGrid(coord.to_string()))
    }

    /// Scan the folder and attach scene files to their cells.
    ///
    /// Returns the number of files attached. A missing folder is an empty grid.
    pub fn discover(&mut self) -> Result<usize, PersistenceError> {
        let entries = match std::fs::read_dir(&self.folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Scene folder {:?} does not exist yet", self.folder);
                return Ok(0);
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.folder.clone(),
                    source,
                })
            }
        };

        let mut found = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.contains("__") {
                continue;
            }
            let Some(coord) = CellCoord::from_file_stem(stem) else {
                tracing::debug!("Ignoring scene file without a cell tag: {:?}", path);
                continue;
            };
            let stem = stem.to_string();
            match self.cell_mut(coord) {
                Some(cell) => {
                    cell.name = stem;
                    cell.path = Some(path);
                    found += 1;
                }
                None => tracing::warn!("Scene file {:?} is outside the grid", path),
            }
        }
        tracing::info!("Discovered {} scene files in {:?}", found, self.folder);
        Ok(found)
    }

    /// File a cell saves to: its known file, or `<folder>/<name>.<ext>`
    pub fn file_path_for(&self, coord: CellCoord) -> Option<PathBuf> {
        let cell = self.cell(coord)?;
        Some(cell.path.clone().unwrap_or_else(|| {
            self.folder
                .join(format!("{}.{}", cell.name, self.extension))
        }))
    }

    /// Current cell, if any
    pub fn current(&self) -> Option<CellCoord> {
        self.current
    }

    /// Contents of the current cell
    pub fn current_scene(&self) -> Option<&LoadedScene> {
        self.current
            .and_then(|c| self.cell(c))
            .and_then(|cell| cell.loaded.as_ref())
    }

    /// Contents of the current cell, mutably
    pub fn current_scene_mut(&mut self) -> Option<&mut LoadedScene> {
        let coord = self.current?;
        self.cell_mut(coord).and_then(|cell| cell.loaded.as_mut())
    }

    /// Coordinates of the loaded cells
    pub fn loaded_cells(&self) -> Vec<CellCoord> {
        self.cells
            .iter()
            .filter(|c| c.is_loaded())
            .map(|c| c.coord)
            .collect()
    }

    /// Unload everything, make `coord` current and load it.
    ///
    /// A cell without a file starts empty. If its file fails to load the
    /// error is returned and the grid is left exactly as it was.
    pub fn goto(
        &mut self,
        coord: CellCoord,
        types: &TypeRegistry,
    ) -> Result<Option<LoadReport>, PersistenceError> {
        let path = self.require_cell_mut(coord)?.path.clone();
        let (state, report) = match path {
            Some(path) => {
                let (registry, report) = persistence::load_scene(&path, types, self.delimiter)?;
                (SceneState::from_registry(registry), Some(report))
            }
            None => (SceneState::new(), None),
        };

        for cell in &mut self.cells {
            cell.loaded = None;
        }
        self.current = Some(coord);
        let depth = self.max_undo_depth;
        self.require_cell_mut(coord)?.loaded = Some(LoadedScene::new(state, depth));
        Ok(report)
    }

    /// Load a cell from its file, leaving other cells as they are.
    ///
    /// On failure the cell keeps whatever it held before.
    pub fn load(
        &mut self,
        coord: CellCoord,
        types: &TypeRegistry,
    ) -> Result<LoadReport, PersistenceError> {
        let delimiter = self.delimiter;
        let depth = self.max_undo_depth;
        let cell = self.require_cell_mut(coord)?;
        let path = cell
            .path
            .clone()
            .ok_or_else(|| PersistenceError::NoScenePath(coord.to_string()))?;
        let (registry, report) = persistence::load_scene(&path, types, delimiter)?;
        cell.loaded = Some(LoadedScene::new(SceneState::from_registry(registry), depth));
        Ok(report)
    }

    /// Drop the contents of a cell. Returns whether it was loaded.
    pub fn unload(&mut self, coord: CellCoord) -> bool {
        self.cell_mut(coord)
            .and_then(|cell| cell.loaded.take())
            .is_some()
    }

    /// Write a loaded cell to its file, creating the file if needed
    pub fn save(
        &mut self,
        coord: CellCoord,
        types: &TypeRegistry,
    ) -> Result<SaveReport, PersistenceError> {
        let delimiter = self.delimiter;
        let path = self
            .file_path_for(coord)
            .ok_or_else(|| PersistenceError::OutOfGrid(coord.to_string()))?;
        let cell = self.require_cell_mut(coord)?;
        let Some(scene) = cell.loaded.as_ref() else {
            return Err(PersistenceError::NotLoaded(coord.to_string()));
        };
        if cell.path.is_none() && scene.state.registry.is_empty() {
            return Err(PersistenceError::NothingToSave(coord.to_string()));
        }
        let report = persistence::save_scene(&scene.state.registry, types, &path, delimiter)?;
        cell.path = Some(path);
        Ok(report)
    }

    /// Neighbouring coordinate, clamped to the grid
    pub fn neighbor(&self, coord: CellCoord, dx: i32, dy: i32) -> CellCoord {
        let clamp = |value: u32, delta: i32, size: u32| {
            (i64::from(value) + i64::from(delta)).clamp(0, i64::from(size) - 1) as u32
        };
        CellCoord::new(
            clamp(coord.x, dx, self.width),
            clamp(coord.y, dy, self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[test]
    fn test_new_grid_names_cells() {
        let grid = SceneGrid::new("scenes", 3, 2);
        assert_eq!(grid.cells().count(), 6);
        assert_eq!(grid.cell(CellCoord::new(2, 1)).unwrap().name, "untitled_scene[2,1]");
        assert!(grid.cell(CellCoord::new(3, 0)).is_none());
        assert_eq!(
            grid.file_path_for(CellCoord::new(1, 0)),
            Some(PathBuf::from("scenes").join("untitled_scene[1,0].csv"))
        );
    }

    #[test]
    fn test_parse_cell_tag() {
        assert_eq!(CellCoord::from_file_stem("forest[2,3]"), Some(CellCoord::new(2, 3)));
        assert_eq!(CellCoord::from_file_stem("a[ 1 , 0 ]b"), Some(CellCoord::new(1, 0)));
        assert_eq!(CellCoord::from_file_stem("forest"), None);
        assert_eq!(CellCoord::from_file_stem("forest[-1,0]"), None);
    }

    #[test]
    fn test_discover_assigns_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("forest[1,0].csv"), "type\n").unwrap();
        std::fs::write(dir.path().join("backup__forest[0,0].csv"), "type\n").unwrap();
        std::fs::write(dir.path().join("notes[0,1].txt"), "").unwrap();
        std::fs::write(dir.path().join("far[9,9].csv"), "type\n").unwrap();

        let mut grid = SceneGrid::new(dir.path(), 2, 2);
        assert_eq!(grid.discover().unwrap(), 1);
        let cell = grid.cell(CellCoord::new(1, 0)).unwrap();
        assert_eq!(cell.name, "forest[1,0]");
        assert!(cell.path.is_some());
        assert!(grid.cell(CellCoord::new(0, 0)).unwrap().path.is_none());
        assert!(grid.cell(CellCoord::new(0, 1)).unwrap().path.is_none());
    }

    #[test]
    fn test_discover_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut grid = SceneGrid::new(dir.path().join("absent"), 2, 2);
        assert_eq!(grid.discover().unwrap(), 0);
    }

    #[test]
    fn test_goto_unloads_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a[0,0].csv"), "type\nWhiteCube\nRock\n").unwrap();
        let types = TypeRegistry::with_builtins();
        let mut grid = SceneGrid::new(dir.path(), 2, 1);
        grid.discover().unwrap();

        let report = grid.goto(CellCoord::new(0, 0), &types).unwrap();
        assert_eq!(report.map(|r| r.entities), Some(2));
        assert_eq!(grid.current_scene().unwrap().state.registry.len(), 2);

        assert!(grid.goto(CellCoord::new(1, 0), &types).unwrap().is_none());
        assert_eq!(grid.loaded_cells(), vec![CellCoord::new(1, 0)]);
        assert!(grid.current_scene().unwrap().state.registry.is_empty());

        grid.load(CellCoord::new(0, 0), &types).unwrap();
        assert_eq!(grid.loaded_cells().len(), 2);
        assert!(grid.unload(CellCoord::new(0, 0)));
        assert!(!grid.unload(CellCoord::new(0, 0)));
    }

    #[test]
    fn test_failed_load_leaves_grid_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a[0,0].csv"), "type\nWhiteCube\nRock\n").unwrap();
        // Unreadable as a file.
        std::fs::create_dir(dir.path().join("broken[1,0].csv")).unwrap();
        let types = TypeRegistry::with_builtins();
        let mut grid = SceneGrid::new(dir.path(), 2, 1);
        assert_eq!(grid.discover().unwrap(), 2);
        let good = CellCoord::new(0, 0);
        let broken = CellCoord::new(1, 0);
        grid.goto(good, &types).unwrap();

        assert!(matches!(grid.goto(broken, &types), Err(PersistenceError::Io { .. })));
        assert_eq!(grid.current(), Some(good));
        assert_eq!(grid.loaded_cells(), vec![good]);
        assert_eq!(grid.current_scene().unwrap().state.registry.len(), 2);

        assert!(matches!(grid.load(broken, &types), Err(PersistenceError::Io { .. })));
        assert_eq!(grid.loaded_cells(), vec![good]);
        assert!(matches!(
            grid.save(broken, &types),
            Err(PersistenceError::NotLoaded(_))
        ));
        assert!(dir.path().join("broken[1,0].csv").is_dir());
    }

    #[test]
    fn test_goto_out_of_grid() {
        let types = TypeRegistry::with_builtins();
        let mut grid = SceneGrid::new("scenes", 2, 2);
        assert!(matches!(
            grid.goto(CellCoord::new(5, 0), &types),
            Err(PersistenceError::OutOfGrid(_))
        ));
        assert!(grid.current().is_none());
    }

    #[test]
    fn test_save_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let types = TypeRegistry::with_builtins();
        let mut grid = SceneGrid::new(dir.path().join("scenes"), 2, 2);
        let coord = CellCoord::new(1, 1);
        grid.goto(coord, &types).unwrap();
        assert!(matches!(
            grid.save(coord, &types),
            Err(PersistenceError::NothingToSave(_))
        ));
        assert!(matches!(
            grid.save(CellCoord::new(0, 0), &types),
            Err(PersistenceError::NotLoaded(_))
        ));

        grid.current_scene_mut()
            .unwrap()
            .state
            .registry
            .push(Entity::new("WhiteCube"));
        let report = grid.save(coord, &types).unwrap();
        assert_eq!(report.rows, 1);
        assert!(dir.path().join("scenes").join("untitled_scene[1,1].csv").exists());
        assert!(grid.cell(coord).unwrap().path.is_some());

        let mut fresh = SceneGrid::new(dir.path().join("scenes"), 2, 2);
        assert_eq!(fresh.discover().unwrap(), 1);
        let loaded = fresh.goto(coord, &types).unwrap().unwrap();
        assert_eq!(loaded.entities, 1);
    }

    #[test]
    fn test_neighbor_clamps() {
        let grid = SceneGrid::new("scenes", 3, 3);
        let edge = CellCoord::new(0, 2);
        assert_eq!(grid.neighbor(edge, -1, 0), edge);
        assert_eq!(grid.neighbor(edge, 1, 1), CellCoord::new(1, 2));
        assert_eq!(grid.neighbor(edge, 5, -5), CellCoord::new(2, 0));
    }
}
