// SPDX-License-Identifier: MIT OR Apache-2.0
//! Delimited-row scene files.
//!
//! One header row names the columns: the type discriminator first, then the
//! union of every field any entity stores. Each following row is one entity.
//! Only fields that differ from the type defaults are written; every other
//! cell is left empty. Cells hold [`Value`] literals.
//!
//! ```text
//! type;position;texture
//! WhiteCube;Vec3((1.0,0.0,0.0));
//! Rock;;Str("moss")
//! ```

use crate::entity::{EntityId, EntityRegistry};
use crate::types::{TypeRegistry, ERROR_TYPE, ORIGINAL_TYPE_KEY};
use crate::value::{split_row, AttributeMap, Value, ValueError};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Name of the type discriminator column.
pub const TYPE_COLUMN: &str = "type";

/// Column holding the row index of the parent entity.
pub const PARENT_COLUMN: &str = "parent";

/// Shader assigned to modelled entities that load without one.
pub const DEFAULT_SHADER: &str = "lit_with_shadows";

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing a file failed
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A value could not be encoded
    #[error("Failed to encode field `{field}`: {source}")]
    Encode {
        /// Field name
        field: String,
        /// Underlying error
        #[source]
        source: ValueError,
    },

    /// The cell has no file and nothing to write
    #[error("Cell {0} has no scene file and no entities to save")]
    NothingToSave(String),

    /// The cell has no file to load
    #[error("Cell {0} has no scene file")]
    NoScenePath(String),

    /// The cell is not loaded
    #[error("Cell {0} is not loaded")]
    NotLoaded(String),

    /// The coordinate lies outside the grid
    #[error("Cell {0} is outside the grid")]
    OutOfGrid(String),
}

impl PersistenceError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Summary of a completed load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Entities created
    pub entities: usize,
    /// Rows replaced by placeholders
    pub placeholders: usize,
    /// Cells kept as raw text
    pub raw_fields: usize,
    /// Wall time spent
    pub elapsed: Duration,
}

/// Summary of a completed save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    /// File written
    pub path: PathBuf,
    /// Rows written
    pub rows: usize,
    /// Columns written, including the type column
    pub columns: usize,
}

/// Render the persisted entities of `registry` as scene file text.
pub fn encode_scene(
    registry: &EntityRegistry,
    types: &TypeRegistry,
    delimiter: char,
) -> Result<(String, usize, usize), PersistenceError> {
    let persisted: Vec<_> = registry.iter().filter(|e| !e.editor_only).collect();
    let row_of: IndexMap<EntityId, usize> = persisted
        .iter()
        .enumerate()
        .map(|(row, e)| (e.id, row))
        .collect();

    let mut rows: Vec<(String, AttributeMap)> = Vec::with_capacity(persisted.len());
    let mut columns: Vec<String> = Vec::new();
    for entity in &persisted {
        let mut fields = types.changes_of(entity);
        let type_name = persisted_type_name(entity, &mut fields);
        fields.retain(|key, _| {
            let ok = !key.contains(delimiter)
                && !key.contains('\n')
                && key != TYPE_COLUMN
                && key != PARENT_COLUMN;
            if !ok {
                tracing::warn!("Skipping unwritable field name {:?} on {}", key, entity.id);
            }
            ok
        });
        if let Some(row) = entity.parent.and_then(|p| row_of.get(&p)) {
            fields.insert(PARENT_COLUMN.into(), Value::Int(*row as i64));
        }
        for key in fields.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        rows.push((type_name, fields));
    }

    let separator = delimiter.to_string();
    let mut text = String::new();
    let header: Vec<&str> = std::iter::once(TYPE_COLUMN)
        .chain(columns.iter().map(String::as_str))
        .collect();
    text.push_str(&header.join(&separator));
    text.push('\n');

    for (type_name, fields) in &rows {
        let mut cells = Vec::with_capacity(columns.len() + 1);
        cells.push(type_name.clone());
        for column in &columns {
            let cell = match fields.get(column) {
                Some(value) => value.encode().map_err(|source| PersistenceError::Encode {
                    field: column.clone(),
                    source,
                })?,
                None => String::new(),
            };
            cells.push(cell);
        }
        text.push_str(&cells.join(&separator));
        text.push('\n');
    }
    Ok((text, rows.len(), columns.len() + 1))
}

/// Placeholders are written back under the type they were loaded as.
fn persisted_type_name(entity: &crate::entity::Entity, fields: &mut AttributeMap) -> String {
    if entity.type_name == ERROR_TYPE {
        if let Some(Value::Str(original)) = fields.shift_remove(ORIGINAL_TYPE_KEY) {
            if !original.is_empty() {
                return original;
            }
        }
    }
    entity.type_name.clone()
}

/// Build a registry from scene file text.
///
/// Never fails: unreadable cells stay raw text and unbuildable rows become
/// placeholders.
pub fn decode_scene(
    text: &str,
    types: &TypeRegistry,
    delimiter: char,
) -> (EntityRegistry, LoadReport) {
    let started = Instant::now();
    let mut report = LoadReport::default();
    let mut registry = EntityRegistry::new();
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return (registry, report);
    };
    let header: Vec<String> = split_row(header_line, delimiter)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    if header.first().map(String::as_str) != Some(TYPE_COLUMN) {
        tracing::warn!("Scene header does not start with `{}`", TYPE_COLUMN);
    }

    let mut parent_rows: Vec<Option<usize>> = Vec::new();
    for (row, line) in lines.enumerate() {
        let cells = split_row(line, delimiter);
        if cells.len() > header.len() {
            tracing::debug!("Row {} has {} extra cells", row, cells.len() - header.len());
        }
        let type_name = cells.first().map(|c| c.trim()).unwrap_or_default();

        let mut fields = AttributeMap::new();
        let mut parent = None;
        for (key, raw) in header.iter().zip(&cells).skip(1) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (value, parsed) = Value::decode_or_raw(raw);
            if !parsed {
                report.raw_fields += 1;
            }
            if key == PARENT_COLUMN {
                parent = value.as_i64().and_then(|i| usize::try_from(i).ok());
                continue;
            }
            fields.insert(key.clone(), value);
        }
        parent_rows.push(parent);

        let entity = match types.resolve(type_name) {
            None => {
                tracing::warn!("Unknown entity type {:?} on row {}, using placeholder", type_name, row);
                report.placeholders += 1;
                types.placeholder(type_name, Some(fields))
            }
            Some(info) => match info.build(fields) {
                Ok(entity) => entity,
                Err(err) => {
                    tracing::warn!("Row {} failed to construct: {}", row, err);
                    report.placeholders += 1;
                    types.placeholder(type_name, None)
                }
            },
        };
        registry.push(entity);
    }

    let ids = registry.ids();
    for (row, parent) in parent_rows.into_iter().enumerate() {
        let Some(parent_row) = parent else {
            continue;
        };
        let linked = ids
            .get(parent_row)
            .is_some_and(|parent_id| registry.set_parent(&ids[row], *parent_id));
        if !linked {
            tracing::warn!("Row {} has an invalid parent row {}", row, parent_row);
        }
    }

    for id in &ids {
        if let Some(entity) = registry.get_mut(id) {
            apply_post_load_defaults(entity);
        }
    }

    report.entities = registry.len();
    report.elapsed = started.elapsed();
    (registry, report)
}

/// Defaults every loaded entity gets regardless of what the file says.
fn apply_post_load_defaults(entity: &mut crate::entity::Entity) {
    entity.selectable = true;
    let Some(model) = entity.model().map(str::to_string) else {
        return;
    };
    if !entity.attributes.contains_key("shader") {
        entity.attributes.insert("shader".into(), DEFAULT_SHADER.into());
    }
    if model == "cube" && entity.collider().is_none() {
        entity.attributes.insert("collider".into(), "box".into());
    }
}

/// Write `registry` to `path`, creating the folder if needed.
pub fn save_scene(
    registry: &EntityRegistry,
    types: &TypeRegistry,
    path: &Path,
    delimiter: char,
) -> Result<SaveReport, PersistenceError> {
    let (text, rows, columns) = encode_scene(registry, types, delimiter)?;
    write_text_atomic(path, &text).map_err(|e| PersistenceError::io(path, e))?;
    tracing::info!("Saved {} entities to {:?}", rows, path);
    Ok(SaveReport {
        path: path.to_path_buf(),
        rows,
        columns,
    })
}

/// Read a scene file.
///
/// Bytes that are not valid UTF-8 become U+FFFD and the affected cells go
/// through the usual per-field decoding.
pub fn load_scene(
    path: &Path,
    types: &TypeRegistry,
    delimiter: char,
) -> Result<(EntityRegistry, LoadReport), PersistenceError> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    if matches!(text, Cow::Owned(_)) {
        tracing::warn!("Scene file {:?} is not valid UTF-8; bad bytes replaced", path);
    }
    let (registry, report) = decode_scene(&text, types, delimiter);
    tracing::info!(
        "Loaded {} entities from {:?} in {:?} ({} placeholders, {} raw fields)",
        report.entities,
        path,
        report.elapsed,
        report.placeholders,
        report.raw_fields
    );
    Ok((registry, report))
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("scene");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}
