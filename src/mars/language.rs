//! The MARS language definition and Type registry (component C7's
//! backing store). A structured document (§1: "listing MARS keys, their
//! categories, allowed values, defaults, aliases, and multiplicity
//! rules") is parsed once into a [`TypeRegistry`] and shared read-only
//! thereafter.
//!
//! Grounded on `original_source/src/metkit/mars/ParamID.cc`'s
//! `pthread_once`-guarded `readTable()` loading `paramMatching.yaml` via
//! `eckit::YAMLParser` — translated to `std::sync::OnceLock`, per
//! spec.md §5/§9 ("lazily initialized once ... never mutated after
//! init").

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::MarsError;
use crate::mars::types::{TypeDef, TypeKind, TypeRef, WindFamily};

/// The embedded default language definition. Real deployments may load a
/// site-specific document instead via [`LanguageDefinition::from_yaml`].
const EMBEDDED_LANGUAGE_YAML: &str = include_str!("language.yaml");

#[derive(Debug, Deserialize)]
struct RawLanguage {
    #[serde(default)]
    types: HashMap<String, RawType>,
    /// Wind-family groupings shared by every `param`-kind type, mirroring
    /// `ParamID::getWindFamilies`'s document-level `wind` key.
    #[serde(default)]
    wind: Vec<[String; 4]>,
    /// GRIB table numbers to ignore when resolving `table.id` pairs,
    /// mirroring `ParamID::getDropTables`'s document-level `drop-tables`
    /// key.
    #[serde(default, rename = "drop-tables")]
    drop_tables: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    #[serde(default = "default_category")]
    category: String,
    kind: String,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    aliases: HashMap<String, String>,
    #[serde(default)]
    min: Option<i64>,
    #[serde(default)]
    max: Option<i64>,
    #[serde(default = "default_true")]
    flatten: bool,
    #[serde(default)]
    multiple: bool,
    #[serde(default)]
    duplicates: bool,
    #[serde(default)]
    defaults: Vec<String>,
    #[serde(default)]
    only: HashMap<String, Vec<String>>,
    #[serde(default)]
    never: HashMap<String, Vec<String>>,
}

fn default_category() -> String {
    "mars".to_string()
}

fn default_true() -> bool {
    true
}

/// A parsed language-definition document: every MARS key this deployment
/// knows about, prior to being built into a [`TypeRegistry`].
#[derive(Debug)]
pub struct LanguageDefinition {
    types: HashMap<String, TypeDef>,
}

impl LanguageDefinition {
    /// Parses a language-definition document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, MarsError> {
        let raw: RawLanguage = serde_yaml::from_str(text).map_err(|e| MarsError::Parse {
            message: format!("invalid language definition: {e}"),
            line: 0,
            column: 0,
        })?;

        let wind_families: Vec<WindFamily> = raw.wind.iter().map(WindFamily::from_entry).collect();

        let mut types = HashMap::new();
        for (name, raw_type) in raw.types {
            let kind = parse_kind(&name, &raw_type, &wind_families, &raw.drop_tables)?;
            types.insert(
                name.clone(),
                TypeDef {
                    name: name.clone(),
                    category: raw_type.category,
                    kind,
                    flatten: raw_type.flatten,
                    multiple: raw_type.multiple,
                    duplicates: raw_type.duplicates,
                    defaults: raw_type.defaults.clone(),
                    original_defaults: raw_type.defaults,
                    only: raw_type.only,
                    never: raw_type.never,
                },
            );
        }
        Ok(Self { types })
    }

    /// The language definition embedded in this crate.
    pub fn embedded() -> Result<Self, MarsError> {
        Self::from_yaml(EMBEDDED_LANGUAGE_YAML)
    }
}

fn parse_kind(
    name: &str,
    raw: &RawType,
    wind_families: &[WindFamily],
    drop_tables: &[i64],
) -> Result<TypeKind, MarsError> {
    match raw.kind.as_str() {
        "any" => Ok(TypeKind::Any),
        "enum" => Ok(TypeKind::Enum {
            values: raw.values.clone(),
            aliases: raw.aliases.clone(),
        }),
        "integer" => Ok(TypeKind::Integer {
            min: raw.min,
            max: raw.max,
        }),
        "integer_range" => Ok(TypeKind::IntegerRange {
            min: raw.min,
            max: raw.max,
        }),
        "float" => Ok(TypeKind::Float),
        "date" => Ok(TypeKind::Date),
        "time" => Ok(TypeKind::Time),
        "expver" => Ok(TypeKind::Expver),
        "param" => Ok(TypeKind::Param {
            wind_families: wind_families.to_vec(),
            drop_tables: drop_tables.to_vec(),
        }),
        "grid" => Ok(TypeKind::Grid),
        "range" => Ok(TypeKind::Range),
        other => {
            log::warn!("language definition key '{name}' has unknown kind '{other}', treating as 'any'");
            Ok(TypeKind::Any)
        }
    }
}

/// A built, read-only registry of [`TypeDef`]s indexed by key name
/// (case-insensitive). Constructed once from a [`LanguageDefinition`] and
/// shared by `Rc` with every `Parameter` that uses a given key.
#[derive(Debug)]
pub struct TypeRegistry {
    types: HashMap<String, TypeRef>,
}

impl TypeRegistry {
    pub fn from_definition(def: LanguageDefinition) -> Self {
        let types = def
            .types
            .into_iter()
            .map(|(name, ty)| (name.to_ascii_lowercase(), Rc::new(ty)))
            .collect();
        Self { types }
    }

    /// Looks up a key's Type, case-insensitively.
    pub fn get(&self, key: &str) -> Option<TypeRef> {
        self.types.get(&key.to_ascii_lowercase()).cloned()
    }

    /// Looks up a key's Type, falling back to `Any` (with a `warn!` log,
    /// per SPEC_FULL.md §C) for keys the registry does not recognize.
    pub fn get_or_any(&self, key: &str) -> TypeRef {
        self.get(key).unwrap_or_else(|| {
            log::warn!("unknown MARS key '{key}', falling back to the 'any' type");
            Rc::new(TypeDef::any(key))
        })
    }

    /// Every registered Type that carries configured defaults, for the
    /// expansion engine's default-injection step.
    pub fn with_defaults(&self) -> impl Iterator<Item = &TypeRef> {
        self.types.values().filter(|t| !t.defaults.is_empty())
    }
}

static DEFAULT_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// The process-wide default registry, built once from the embedded
/// language definition (spec.md §5: "a one-time initializer").
pub fn default_registry() -> &'static TypeRegistry {
    DEFAULT_REGISTRY.get_or_init(|| {
        TypeRegistry::from_definition(
            LanguageDefinition::embedded().expect("embedded language definition must parse"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_language_definition_parses() {
        let def = LanguageDefinition::embedded().unwrap();
        assert!(def.types.contains_key("class"));
        assert!(def.types.contains_key("step"));
    }

    #[test]
    fn registry_is_case_insensitive() {
        let registry = default_registry();
        assert!(registry.get("CLASS").is_some());
        assert!(registry.get("Step").is_some());
    }

    #[test]
    fn unknown_key_falls_back_to_any() {
        let registry = default_registry();
        let ty = registry.get_or_any("frobnicate");
        assert!(matches!(ty.kind, TypeKind::Any));
    }

    #[test]
    fn levelist_carries_an_only_constraint_on_levtype() {
        let registry = default_registry();
        let ty = registry.get("levelist").unwrap();
        assert_eq!(ty.only.get("levtype").unwrap(), &vec!["pl".to_string(), "ml".to_string()]);
    }

    #[test]
    fn default_registry_is_memoized() {
        let a = default_registry() as *const TypeRegistry;
        let b = default_registry() as *const TypeRegistry;
        assert_eq!(a, b);
    }
}
