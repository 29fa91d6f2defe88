// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity type registry.
//!
//! Types are registered explicitly at startup. Each entry supplies its
//! default attributes (used to compute what a scene file has to store) and a
//! constructor that validates persisted fields.

use crate::entity::{ColliderKind, Entity};
use crate::math::Transform;
use crate::value::{hsv, AttributeMap, Value};
use glam::{Vec3, Vec4};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type name of the placeholder substituted for unresolvable rows.
pub const ERROR_TYPE: &str = "ErrorEntity";

/// Attribute holding the unresolved type name on a placeholder.
pub const ORIGINAL_TYPE_KEY: &str = "original_type";

/// Errors raised while constructing an entity from fields
#[derive(Debug, Error, PartialEq)]
pub enum ConstructError {
    /// No type with this name is registered
    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    /// A field has the wrong kind of value
    #[error("Field `{field}` of {type_name} expects {expected}")]
    InvalidField {
        /// Type being constructed
        type_name: String,
        /// Field name
        field: String,
        /// Human-readable expectation
        expected: &'static str,
    },
}

/// Registration entry for one entity type
#[derive(Debug, Clone)]
pub struct EntityTypeInfo {
    /// Persisted type discriminator
    pub type_name: &'static str,
    /// Description shown in spawn menus
    pub description: &'static str,
    /// Default attribute values, including `position`, `rotation` and `scale`
    pub defaults: fn() -> AttributeMap,
    /// Build an entity from persisted fields
    pub construct: fn(&EntityTypeInfo, AttributeMap) -> Result<Entity, ConstructError>,
}

impl EntityTypeInfo {
    /// Default attributes for this type
    pub fn default_fields(&self) -> AttributeMap {
        (self.defaults)()
    }

    /// Construct an entity of this type
    pub fn build(&self, fields: AttributeMap) -> Result<Entity, ConstructError> {
        (self.construct)(self, fields)
    }

    fn invalid(&self, field: &str, expected: &'static str) -> ConstructError {
        ConstructError::InvalidField {
            type_name: self.type_name.to_string(),
            field: field.to_string(),
            expected,
        }
    }
}

/// Type name plus the fields that differ from that type's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecipe {
    /// Registered type name
    pub type_name: String,
    /// Non-default fields
    pub fields: AttributeMap,
}

/// Fields every type starts from.
fn base_fields() -> AttributeMap {
    let mut fields = AttributeMap::new();
    fields.insert("position".into(), Value::Vec3(Vec3::ZERO));
    fields.insert("rotation".into(), Value::Vec3(Vec3::ZERO));
    fields.insert("scale".into(), Value::Vec3(Vec3::ONE));
    fields
}

fn entity_defaults() -> AttributeMap {
    base_fields()
}

fn white_cube_defaults() -> AttributeMap {
    let mut fields = base_fields();
    fields.insert("name".into(), "cube".into());
    fields.insert("model".into(), "cube".into());
    fields.insert("shader".into(), "lit_with_shadows".into());
    fields.insert("texture".into(), "white_cube".into());
    fields.insert("collider".into(), "box".into());
    fields
}

fn triplanar_cube_defaults() -> AttributeMap {
    let mut fields = white_cube_defaults();
    fields.insert("shader".into(), "triplanar".into());
    fields.insert("side_texture".into(), "brick".into());
    fields
}

fn pyramid_defaults() -> AttributeMap {
    let mut fields = base_fields();
    fields.insert("name".into(), "pyramid".into());
    fields.insert("model".into(), "pyramid".into());
    fields.insert("shader".into(), "lit_with_shadows".into());
    fields.insert("texture".into(), "brick".into());
    fields.insert("collider".into(), "mesh".into());
    fields
}

fn rock_defaults() -> AttributeMap {
    let mut fields = base_fields();
    fields.insert("name".into(), "rock".into());
    fields.insert("model".into(), "procedural_rock_0".into());
    fields.insert("shader".into(), "lit_with_shadows".into());
    fields.insert("collider".into(), "box".into());
    fields.insert("color".into(), Value::Color(hsv(20.0, 0.2, 0.45)));
    fields
}

fn class_spawner_defaults() -> AttributeMap {
    let mut fields = base_fields();
    fields.insert("name".into(), "ClassSpawner".into());
    fields.insert("model".into(), "wireframe_cube".into());
    fields.insert("shader".into(), "unlit".into());
    fields.insert("color".into(), Value::Color(Vec4::new(0.0, 0.0, 1.0, 1.0)));
    fields.insert("collider".into(), "box".into());
    fields.insert("class_to_spawn".into(), "".into());
    fields
}

fn error_defaults() -> AttributeMap {
    let mut fields = base_fields();
    fields.insert("model".into(), "wireframe_cube".into());
    fields.insert("shader".into(), "unlit".into());
    fields.insert("color".into(), Value::Color(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    fields.insert("collider".into(), "box".into());
    fields
}

/// Shared constructor: defaults overlaid with `fields`, core fields validated.
pub fn construct_standard(
    info: &EntityTypeInfo,
    fields: AttributeMap,
) -> Result<Entity, ConstructError> {
    let mut merged = info.default_fields();
    for (key, value) in fields {
        merged.insert(key, value);
    }

    let position = take_vec3(info, &mut merged, "position", Vec3::ZERO)?;
    let rotation = take_vec3(info, &mut merged, "rotation", Vec3::ZERO)?;
    let scale = take_vec3(info, &mut merged, "scale", Vec3::ONE)?;

    for key in ["name", "model", "texture", "shader"] {
        match merged.get(key) {
            None | Some(Value::None | Value::Str(_)) => {}
            Some(_) => return Err(info.invalid(key, "a string")),
        }
    }
    match merged.get("collider") {
        None | Some(Value::None) => {}
        Some(Value::Str(name)) if ColliderKind::parse(name).is_some() => {}
        Some(_) => return Err(info.invalid("collider", "one of box, sphere, mesh")),
    }
    match merged.get("color") {
        None | Some(Value::None | Value::Color(_)) => {}
        Some(_) => return Err(info.invalid("color", "a colour")),
    }
    let selectable = match merged.shift_remove("selectable") {
        None | Some(Value::None) => true,
        Some(value) => value
            .as_bool()
            .ok_or_else(|| info.invalid("selectable", "a boolean"))?,
    };

    let mut entity = Entity::new(info.type_name);
    entity.selectable = selectable;
    entity.transform = Transform::from_euler_degrees(position, rotation, scale);
    entity.attributes = merged
        .into_iter()
        .filter(|(_, value)| !value.is_none())
        .collect();
    Ok(entity)
}

fn take_vec3(
    info: &EntityTypeInfo,
    fields: &mut AttributeMap,
    key: &str,
    default: Vec3,
) -> Result<Vec3, ConstructError> {
    match fields.shift_remove(key) {
        None | Some(Value::None) => Ok(default),
        Some(value) => value.as_vec3().ok_or_else(|| info.invalid(key, "a vector")),
    }
}

fn construct_class_spawner(
    info: &EntityTypeInfo,
    fields: AttributeMap,
) -> Result<Entity, ConstructError> {
    match fields.get("class_to_spawn") {
        None | Some(Value::Str(_)) => construct_standard(info, fields),
        Some(_) => Err(info.invalid("class_to_spawn", "a type name string")),
    }
}

/// Registry of entity types by name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<&'static str, EntityTypeInfo>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in types
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(EntityTypeInfo {
            type_name: "Entity",
            description: "Plain scene object",
            defaults: entity_defaults,
            construct: construct_standard,
        });
        registry.register(EntityTypeInfo {
            type_name: "WhiteCube",
            description: "Lit white cube with a box collider",
            defaults: white_cube_defaults,
            construct: construct_standard,
        });
        registry.register(EntityTypeInfo {
            type_name: "TriplanarCube",
            description: "Cube with triplanar texturing",
            defaults: triplanar_cube_defaults,
            construct: construct_standard,
        });
        registry.register(EntityTypeInfo {
            type_name: "Pyramid",
            description: "Four-sided pyramid",
            defaults: pyramid_defaults,
            construct: construct_standard,
        });
        registry.register(EntityTypeInfo {
            type_name: "Rock",
            description: "Procedural rock",
            defaults: rock_defaults,
            construct: construct_standard,
        });
        registry.register(EntityTypeInfo {
            type_name: "ClassSpawner",
            description: "Marker that spawns another type at runtime",
            defaults: class_spawner_defaults,
            construct: construct_class_spawner,
        });
        registry.register(EntityTypeInfo {
            type_name: ERROR_TYPE,
            description: "Placeholder for rows that failed to load",
            defaults: error_defaults,
            construct: construct_standard,
        });
        registry
    }

    /// Register (or replace) a type
    pub fn register(&mut self, info: EntityTypeInfo) {
        tracing::debug!("Registered entity type {}", info.type_name);
        self.types.insert(info.type_name, info);
    }

    /// Look up a type by name
    pub fn resolve(&self, type_name: &str) -> Option<&EntityTypeInfo> {
        self.types.get(type_name)
    }

    /// Registered type names in registration order
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    /// Default fields of a type, or the base fields for unknown types
    pub fn defaults_for(&self, type_name: &str) -> AttributeMap {
        self.resolve(type_name)
            .map(EntityTypeInfo::default_fields)
            .unwrap_or_else(base_fields)
    }

    /// Build an entity from a recipe
    pub fn instantiate(&self, recipe: &EntityRecipe) -> Result<Entity, ConstructError> {
        let info = self
            .resolve(&recipe.type_name)
            .ok_or_else(|| ConstructError::UnknownType(recipe.type_name.clone()))?;
        info.build(recipe.fields.clone())
    }

    /// Persisted fields of an entity: transform components plus attributes
    pub fn fields_of(&self, entity: &Entity) -> AttributeMap {
        let mut fields = AttributeMap::new();
        fields.insert("position".into(), Value::Vec3(entity.transform.position));
        fields.insert("rotation".into(), Value::Vec3(entity.transform.euler_degrees()));
        fields.insert("scale".into(), Value::Vec3(entity.transform.scale));
        for (key, value) in &entity.attributes {
            fields.insert(key.clone(), value.clone());
        }
        fields
    }

    /// Fields of `entity` that differ from its type defaults
    pub fn changes_of(&self, entity: &Entity) -> AttributeMap {
        let defaults = self.defaults_for(&entity.type_name);
        self.fields_of(entity)
            .into_iter()
            .filter(|(key, value)| match defaults.get(key) {
                Some(default) => !default.approx_eq(value),
                None => !value.is_none(),
            })
            .collect()
    }

    /// Reconstruction recipe of an entity
    pub fn recipe_of(&self, entity: &Entity) -> EntityRecipe {
        EntityRecipe {
            type_name: entity.type_name.clone(),
            fields: self.changes_of(entity),
        }
    }

    /// Placeholder for a row whose type could not be built.
    ///
    /// When `fields` are given they are kept verbatim so the row survives a re-save.
    pub fn placeholder(&self, original_type: &str, fields: Option<AttributeMap>) -> Entity {
        let mut entity = Entity::new(ERROR_TYPE);
        if let Some(info) = self.resolve(ERROR_TYPE) {
            if let Ok(built) = info.build(AttributeMap::new()) {
                entity = built;
            }
        }
        if let Some(fields) = fields {
            let mut euler = Vec3::ZERO;
            for (key, value) in fields {
                match (key.as_str(), value.as_vec3()) {
                    ("position", Some(v)) => entity.transform.position = v,
                    ("rotation", Some(v)) => euler = v,
                    ("scale", Some(v)) => entity.transform.scale = v,
                    _ => {
                        entity.attributes.insert(key, value);
                    }
                }
            }
            entity.transform = Transform::from_euler_degrees(
                entity.transform.position,
                euler,
                entity.transform.scale,
            );
        }
        entity
            .attributes
            .insert(ORIGINAL_TYPE_KEY.into(), Value::Str(original_type.to_string()));
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let types = TypeRegistry::with_builtins();
        let names: Vec<_> = types.type_names().collect();
        assert_eq!(
            names,
            vec![
                "Entity",
                "WhiteCube",
                "TriplanarCube",
                "Pyramid",
                "Rock",
                "ClassSpawner",
                ERROR_TYPE
            ]
        );
    }

    #[test]
    fn test_construct_with_defaults() {
        let types = TypeRegistry::with_builtins();
        let mut fields = AttributeMap::new();
        fields.insert("position".into(), Value::Vec3(Vec3::new(1.0, 2.0, 3.0)));
        let cube = types
            .instantiate(&EntityRecipe {
                type_name: "WhiteCube".into(),
                fields,
            })
            .unwrap();
        assert_eq!(cube.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cube.model(), Some("cube"));
        assert_eq!(cube.collider(), Some(ColliderKind::Box));
        assert_eq!(cube.name(), "cube");
    }

    #[test]
    fn test_changes_only_non_default() {
        let types = TypeRegistry::with_builtins();
        let mut cube = types
            .instantiate(&EntityRecipe {
                type_name: "WhiteCube".into(),
                fields: AttributeMap::new(),
            })
            .unwrap();
        assert!(types.changes_of(&cube).is_empty());

        cube.transform.position = Vec3::new(0.0, 1.0, 0.0);
        cube.attributes.insert("texture".into(), "brick".into());
        let changes = types.changes_of(&cube);
        let keys: Vec<_> = changes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["position", "texture"]);

        let rebuilt = types.instantiate(&types.recipe_of(&cube)).unwrap();
        assert_eq!(rebuilt.transform.position, cube.transform.position);
        assert_eq!(rebuilt.attributes, cube.attributes);
    }

    #[test]
    fn test_invalid_field_is_rejected() {
        let types = TypeRegistry::with_builtins();
        let mut fields = AttributeMap::new();
        fields.insert("position".into(), Value::Str("up".into()));
        let err = types
            .instantiate(&EntityRecipe {
                type_name: "Rock".into(),
                fields,
            })
            .unwrap_err();
        assert!(matches!(err, ConstructError::InvalidField { ref field, .. } if field == "position"));

        let mut fields = AttributeMap::new();
        fields.insert("class_to_spawn".into(), Value::Int(4));
        assert!(types
            .instantiate(&EntityRecipe {
                type_name: "ClassSpawner".into(),
                fields,
            })
            .is_err());
    }

    #[test]
    fn test_unknown_type_and_placeholder() {
        let types = TypeRegistry::with_builtins();
        let recipe = EntityRecipe {
            type_name: "Dragon".into(),
            fields: AttributeMap::new(),
        };
        assert_eq!(
            types.instantiate(&recipe),
            Err(ConstructError::UnknownType("Dragon".into()))
        );

        let mut fields = AttributeMap::new();
        fields.insert("position".into(), Value::Vec3(Vec3::X));
        fields.insert("wings".into(), Value::Int(2));
        let placeholder = types.placeholder("Dragon", Some(fields));
        assert_eq!(placeholder.type_name, ERROR_TYPE);
        assert_eq!(placeholder.transform.position, Vec3::X);
        assert_eq!(placeholder.attribute("wings"), Some(&Value::Int(2)));
        assert_eq!(
            placeholder.attribute(ORIGINAL_TYPE_KEY),
            Some(&Value::Str("Dragon".into()))
        );
    }
}
