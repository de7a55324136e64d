//! Dataset registry: name → [`DatasetSpec`].
//!
//! Built once at startup (built-ins plus any `[[datasets]]` from the config
//! file) and handed to the pipeline; nothing reads it as global state.

use crate::archive::ArchiveFormat;
use crate::checksum::{Checksum, ChecksumAlgorithm};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path};

/// Static description of one downloadable dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Registry key; also the cache entry directory name.
    pub name: String,
    pub source_url: String,
    pub archive_format: ArchiveFormat,
    pub expected_checksum: Checksum,
    /// Top-level directory the archive unpacks to.
    pub extracted_subdir_name: String,
    /// Top-level archive entries never extracted (e.g. `__MACOSX`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_entries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dataset {dataset}: {field} '{value}' must be a single plain path component")]
    NotAPathComponent {
        dataset: String,
        field: &'static str,
        value: String,
    },
}

fn is_single_component(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !value.contains(['/', '\\'])
}

impl DatasetSpec {
    /// Check that names used as directory names cannot point outside their parent.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let checks = [
            ("name", &self.name),
            ("extracted_subdir_name", &self.extracted_subdir_name),
        ];
        for (field, value) in checks {
            if !is_single_component(value) {
                return Err(RegistryError::NotAPathComponent {
                    dataset: self.name.clone(),
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

const MIRROR_BASE: &str = "https://github.com/yxlao/nerfmirror/releases/download/20220618";

fn builtin_specs() -> Vec<DatasetSpec> {
    let sha256 = |hex: &str| Checksum::from_trusted(ChecksumAlgorithm::Sha256, hex);
    vec![
        DatasetSpec {
            name: "nerf_synthetic".to_string(),
            source_url: format!("{MIRROR_BASE}/nerf_synthetic.zip"),
            archive_format: ArchiveFormat::Zip,
            expected_checksum: sha256(
                "f01fd1b4ab045b0d453917346f26f898657bb5bec4834b95fdad1f361826e45e",
            ),
            extracted_subdir_name: "nerf_synthetic".to_string(),
            skip_entries: vec!["__MACOSX".to_string()],
            description: Some(
                "Blender synthetic scenes: chair, drums, ficus, hotdog, lego, materials, mic, ship"
                    .to_string(),
            ),
        },
        DatasetSpec {
            name: "nerf_llff".to_string(),
            source_url: format!("{MIRROR_BASE}/nerf_llff_data.zip"),
            archive_format: ArchiveFormat::Zip,
            expected_checksum: sha256(
                "5794b432feaf4f25bcd603addc6ad0270cec588fed6a364b7952001f07466635",
            ),
            extracted_subdir_name: "nerf_llff_data".to_string(),
            skip_entries: Vec::new(),
            description: Some(
                "Real forward-facing scenes: fern, flower, fortress, horns, leaves, orchids, room, trex"
                    .to_string(),
            ),
        },
    ]
}

/// Immutable name → spec mapping.
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    specs: BTreeMap<String, DatasetSpec>,
}

impl DatasetRegistry {
    /// Registry holding only the given specs. Later duplicates replace earlier ones.
    pub fn from_specs<I>(specs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = DatasetSpec>,
    {
        Self::default().with_specs(specs)
    }

    /// The datasets shipped with datamirror.
    pub fn builtin() -> Self {
        let specs = builtin_specs()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        Self { specs }
    }

    /// Add `extra` specs, replacing any existing spec with the same name.
    pub fn with_specs<I>(mut self, extra: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = DatasetSpec>,
    {
        for spec in extra {
            spec.validate()?;
            if self.specs.contains_key(&spec.name) {
                tracing::debug!(dataset = %spec.name, "config overrides registered dataset");
            }
            self.specs.insert(spec.name.clone(), spec);
        }
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&DatasetSpec> {
        self.specs.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
