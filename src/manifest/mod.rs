//! `package.json` access: read, modify in memory, write back.
//!
//! Only the `scripts`, `dependencies` and `devDependencies` tables are
//! interpreted. Every other top-level field round-trips untouched, in its
//! original order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::runtime::Runtime;
use crate::verify::{DependencyKind, DependencySpec, FixMap};

pub const MANIFEST_FILE: &str = "package.json";

const SCRIPTS_KEY: &str = "scripts";

/// The manifest could not be loaded; nothing can proceed without it.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("No {MANIFEST_FILE} found in {}", .dir.display())]
    NotFound { dir: PathBuf },

    #[error("Failed to read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to parse {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// A parsed manifest and the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    data: Map<String, Value>,
}

impl Manifest {
    pub fn new(path: PathBuf, data: Map<String, Value>) -> Self {
        Self { path, data }
    }

    /// Parses manifest text. The top level must be a JSON object.
    pub fn parse(path: PathBuf, content: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(content).map_err(|e| ManifestError::Invalid {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        match value {
            Value::Object(data) => Ok(Self { path, data }),
            _ => Err(ManifestError::Invalid {
                path,
                reason: "top level is not an object".to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Pretty-printed with two-space indentation and a trailing newline.
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut text =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize manifest")?;
        text.push('\n');
        Ok(text)
    }

    // Scripts

    /// Script names and commands in declaration order.
    pub fn scripts(&self) -> Vec<(String, String)> {
        self.data
            .get(SCRIPTS_KEY)
            .and_then(Value::as_object)
            .map(|scripts| {
                scripts
                    .iter()
                    .map(|(name, command)| (name.clone(), display_value(command)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn script(&self, name: &str) -> Option<String> {
        self.scripts_table()
            .and_then(|scripts| scripts.get(name))
            .map(display_value)
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.script(name).is_some()
    }

    /// Adds or overwrites a script, creating the table when needed.
    pub fn set_script(&mut self, name: &str, command: &str) {
        let mut scripts = self.take_scripts();
        scripts.insert(name.to_string(), Value::String(command.to_string()));
        self.put_scripts(scripts);
    }

    /// Removes a script. Returns whether it existed.
    pub fn remove_script(&mut self, name: &str) -> bool {
        self.data
            .get_mut(SCRIPTS_KEY)
            .and_then(Value::as_object_mut)
            .is_some_and(|scripts| scripts.shift_remove(name).is_some())
    }

    /// Replaces `old_name` with `new_name` at the same position.
    ///
    /// An existing script already called `new_name` is dropped.
    pub fn rename_script(&mut self, old_name: &str, new_name: &str, command: &str) {
        let rebuilt: Map<String, Value> = self
            .take_scripts()
            .into_iter()
            .filter(|(name, _)| name == old_name || name != new_name)
            .map(|(name, value)| {
                if name == old_name {
                    (new_name.to_string(), Value::String(command.to_string()))
                } else {
                    (name, value)
                }
            })
            .collect();
        self.put_scripts(rebuilt);
    }

    fn scripts_table(&self) -> Option<&Map<String, Value>> {
        self.data.get(SCRIPTS_KEY).and_then(Value::as_object)
    }

    /// Empties the scripts table in place and returns its entries.
    fn take_scripts(&mut self) -> Map<String, Value> {
        match self.data.get_mut(SCRIPTS_KEY) {
            Some(Value::Object(scripts)) => std::mem::take(scripts),
            Some(_) => {
                warn!("Replacing non-object \"{}\" field", SCRIPTS_KEY);
                Map::new()
            }
            None => Map::new(),
        }
    }

    // An existing key keeps its position.
    fn put_scripts(&mut self, scripts: Map<String, Value>) {
        self.data
            .insert(SCRIPTS_KEY.to_string(), Value::Object(scripts));
    }

    // Dependencies

    /// Declared dependencies: regular first, then dev, each in file order.
    ///
    /// Entries whose range is not a string are skipped.
    pub fn dependencies(&self) -> Vec<DependencySpec> {
        [DependencyKind::Regular, DependencyKind::Dev]
            .into_iter()
            .flat_map(|kind| self.dependency_table(kind))
            .collect()
    }

    fn dependency_table(&self, kind: DependencyKind) -> Vec<DependencySpec> {
        let Some(table) = self.data.get(kind.manifest_key()).and_then(Value::as_object) else {
            return Vec::new();
        };

        table
            .iter()
            .filter_map(|(name, range)| match range.as_str() {
                Some(range) => Some(DependencySpec::new(name, range, kind)),
                None => {
                    warn!(
                        "Skipping {} in {}: range is not a string",
                        name,
                        kind.manifest_key()
                    );
                    None
                }
            })
            .collect()
    }

    /// Replaces both dependency tables with the fix map's contents.
    ///
    /// Fix entries line up with the table's string entries in order; string
    /// entries beyond the end of the fix map are dropped. Entries whose value is
    /// not a string are never checked and stay where they were. An empty table
    /// is removed rather than written as `{}`.
    pub fn replace_dependencies(&mut self, fix_map: &FixMap) {
        for kind in [DependencyKind::Regular, DependencyKind::Dev] {
            let key = kind.manifest_key();
            let original = self
                .data
                .get(key)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let object = merge_dependency_table(&original, fix_map.table(kind));

            if object.is_empty() {
                self.data.shift_remove(key);
            } else {
                self.data.insert(key.to_string(), Value::Object(object));
            }
        }
    }
}

fn merge_dependency_table(
    original: &Map<String, Value>,
    fixes: &IndexMap<String, String>,
) -> Map<String, Value> {
    let mut fixes = fixes.iter();
    let mut merged = Map::new();

    for (name, value) in original {
        if !value.is_string() {
            merged.insert(name.clone(), value.clone());
            continue;
        }
        let Some((fixed_name, range)) = fixes.next() else {
            continue;
        };
        if fixed_name != name
            && (original.contains_key(fixed_name) || merged.contains_key(fixed_name))
        {
            warn!(
                "Not renaming {} to {}: {} is already declared",
                name, fixed_name, fixed_name
            );
            merged.insert(name.clone(), value.clone());
        } else {
            merged.insert(fixed_name.clone(), Value::String(range.clone()));
        }
    }

    for (name, range) in fixes {
        if !merged.contains_key(name) {
            merged.insert(name.clone(), Value::String(range.clone()));
        }
    }
    merged
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loads `package.json` from `dir`.
#[tracing::instrument(skip(runtime))]
pub fn read_manifest<R: Runtime>(runtime: &R, dir: &Path) -> Result<Manifest, ManifestError> {
    let path = dir.join(MANIFEST_FILE);

    if !runtime.exists(&path) {
        return Err(ManifestError::NotFound {
            dir: dir.to_path_buf(),
        });
    }

    let content = runtime
        .read_to_string(&path)
        .map_err(|e| ManifestError::Unreadable {
            path: path.clone(),
            reason: format!("{:#}", e),
        })?;

    debug!("Read {} bytes from {:?}", content.len(), path);
    Manifest::parse(path, &content)
}

/// Writes the manifest back to the file it was read from.
#[tracing::instrument(skip(runtime, manifest), fields(path = ?manifest.path()))]
pub fn write_manifest<R: Runtime>(runtime: &R, manifest: &Manifest) -> Result<()> {
    let text = manifest.to_pretty_string()?;
    runtime.write(manifest.path(), text.as_bytes())?;
    debug!("Wrote {:?}", manifest.path());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;

    const SAMPLE: &str = r#"{
  "name": "demo",
  "version": "1.0.0",
  "scripts": {
    "build": "tsc",
    "test": "jest",
    "lint": "eslint ."
  },
  "dependencies": {
    "lodash": "^4.17.21",
    "left-pad": "99.0.0"
  },
  "devDependencies": {
    "jest": "~29.7.0"
  },
  "license": "MIT"
}
"#;

    fn sample() -> Manifest {
        Manifest::parse(PathBuf::from("/project/package.json"), SAMPLE).unwrap()
    }

    fn keys(manifest: &Manifest) -> Vec<&str> {
        manifest.data().keys().map(String::as_str).collect()
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        assert_eq!(sample().to_pretty_string().unwrap(), SAMPLE);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = Manifest::parse(PathBuf::from("package.json"), "[1, 2]").unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { .. }));

        let err = Manifest::parse(PathBuf::from("package.json"), "{ nope").unwrap_err();
        assert!(matches!(err, ManifestError::Invalid { .. }));
    }

    #[test]
    fn test_scripts_in_order() {
        let scripts = sample().scripts();
        let names: Vec<&str> = scripts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["build", "test", "lint"]);
        assert_eq!(sample().script("lint").as_deref(), Some("eslint ."));
        assert!(!sample().has_script("deploy"));
    }

    #[test]
    fn test_set_script_creates_table() {
        let mut manifest =
            Manifest::parse(PathBuf::from("package.json"), r#"{"name": "x"}"#).unwrap();
        manifest.set_script("start", "node index.js");
        assert_eq!(
            manifest.scripts(),
            vec![("start".to_string(), "node index.js".to_string())]
        );
    }

    #[test]
    fn test_remove_script_keeps_order() {
        let mut manifest = sample();
        assert!(manifest.remove_script("build"));
        assert!(!manifest.remove_script("build"));
        let names: Vec<String> = manifest.scripts().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["test", "lint"]);
    }

    #[test]
    fn test_rename_script_keeps_position() {
        let mut manifest = sample();
        manifest.rename_script("test", "unit", "vitest");
        assert_eq!(
            manifest.scripts(),
            vec![
                ("build".to_string(), "tsc".to_string()),
                ("unit".to_string(), "vitest".to_string()),
                ("lint".to_string(), "eslint .".to_string()),
            ]
        );
    }

    #[test]
    fn test_rename_script_onto_existing_name() {
        let mut manifest = sample();
        manifest.rename_script("build", "lint", "tsc --noEmit");
        assert_eq!(
            manifest.scripts(),
            vec![
                ("lint".to_string(), "tsc --noEmit".to_string()),
                ("test".to_string(), "jest".to_string()),
            ]
        );
    }

    #[test]
    fn test_dependencies_regular_then_dev() {
        assert_eq!(
            sample().dependencies(),
            vec![
                DependencySpec::new("lodash", "^4.17.21", DependencyKind::Regular),
                DependencySpec::new("left-pad", "99.0.0", DependencyKind::Regular),
                DependencySpec::new("jest", "~29.7.0", DependencyKind::Dev),
            ]
        );
    }

    #[test]
    fn test_dependencies_skip_non_string_ranges() {
        let manifest = Manifest::parse(
            PathBuf::from("package.json"),
            r#"{"dependencies": {"ok": "1.0.0", "odd": {"version": "1"}}}"#,
        )
        .unwrap();
        assert_eq!(
            manifest.dependencies(),
            vec![DependencySpec::new("ok", "1.0.0", DependencyKind::Regular)]
        );
    }

    #[test]
    fn test_replace_dependencies_keeps_field_order() {
        let mut manifest = sample();
        let mut fix_map = FixMap::default();
        fix_map
            .dependencies
            .insert("lodash".to_string(), "^4.17.21".to_string());
        fix_map
            .dependencies
            .insert("left-pad".to_string(), "1.3.0".to_string());
        fix_map
            .dev_dependencies
            .insert("jest".to_string(), "~29.7.0".to_string());

        manifest.replace_dependencies(&fix_map);

        assert_eq!(
            keys(&manifest),
            vec!["name", "version", "scripts", "dependencies", "devDependencies", "license"]
        );
        assert_eq!(manifest.data()["dependencies"]["left-pad"], "1.3.0");
    }

    #[test]
    fn test_replace_dependencies_drops_empty_tables() {
        let mut manifest = sample();
        let mut fix_map = FixMap::default();
        fix_map
            .dependencies
            .insert("lodash".to_string(), "^4.17.21".to_string());

        manifest.replace_dependencies(&fix_map);

        assert_eq!(
            keys(&manifest),
            vec!["name", "version", "scripts", "dependencies", "license"]
        );
    }

    #[test]
    fn test_replace_dependencies_keeps_non_string_entries() {
        let mut manifest = Manifest::parse(
            PathBuf::from("package.json"),
            r#"{"dependencies": {"left-pad": "99.0.0", "weird": {"version": "1.0.0"}, "lodahs": "^4.17.21"}}"#,
        )
        .unwrap();
        let mut fix_map = FixMap::default();
        fix_map
            .dependencies
            .insert("left-pad".to_string(), "1.3.0".to_string());
        fix_map
            .dependencies
            .insert("lodash".to_string(), "^4.17.21".to_string());

        manifest.replace_dependencies(&fix_map);

        let table = manifest.data()["dependencies"].as_object().unwrap();
        assert_eq!(
            table.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["left-pad", "weird", "lodash"]
        );
        assert_eq!(table["left-pad"], "1.3.0");
        assert_eq!(table["weird"]["version"], "1.0.0");
    }

    #[test]
    fn test_replace_dependencies_keeps_table_with_only_non_string_entries() {
        let mut manifest = Manifest::parse(
            PathBuf::from("package.json"),
            r#"{"dependencies": {"local": {"path": "../local"}}}"#,
        )
        .unwrap();

        manifest.replace_dependencies(&FixMap::default());

        assert_eq!(manifest.data()["dependencies"]["local"]["path"], "../local");
    }

    #[test]
    fn test_replace_dependencies_will_not_rename_onto_non_string_entry() {
        let mut manifest = Manifest::parse(
            PathBuf::from("package.json"),
            r#"{"dependencies": {"lodahs": "^4.17.21", "lodash": {"version": "4.17.21"}}}"#,
        )
        .unwrap();
        let mut fix_map = FixMap::default();
        fix_map
            .dependencies
            .insert("lodash".to_string(), "^4.17.21".to_string());

        manifest.replace_dependencies(&fix_map);

        let table = manifest.data()["dependencies"].as_object().unwrap();
        assert_eq!(table["lodahs"], "^4.17.21");
        assert_eq!(table["lodash"]["version"], "4.17.21");
    }

    #[test]
    fn test_read_manifest_missing_file() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/project/package.json")))
            .returning(|_| false);

        let err = read_manifest(&runtime, Path::new("/project")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
        assert_eq!(err.to_string(), "No package.json found in /project");
    }

    #[test]
    fn test_read_manifest_unreadable_file() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Err(anyhow::anyhow!("permission denied")));

        let err = read_manifest(&runtime, Path::new("/project")).unwrap_err();
        assert!(matches!(err, ManifestError::Unreadable { .. }));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_write_manifest_uses_manifest_path() {
        let manifest = sample();
        let mut runtime = MockRuntime::new();
        runtime
            .expect_write()
            .withf(|path, contents| {
                path == Path::new("/project/package.json") && contents == SAMPLE.as_bytes()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        write_manifest(&runtime, &manifest).unwrap();
    }

    #[test]
    fn test_read_and_write_real_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), SAMPLE).unwrap();
        let runtime = RealRuntime;

        let mut manifest = read_manifest(&runtime, dir.path()).unwrap();
        manifest.set_script("start", "node .");
        write_manifest(&runtime, &manifest).unwrap();

        let written = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(written.ends_with("}\n"));
        assert!(written.contains("\"start\": \"node .\""));
        assert!(written.contains("\"license\": \"MIT\""));
    }
}
