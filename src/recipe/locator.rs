// src/recipe/locator.rs

//! Recipe lookup: atom -> recipe file on disk

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::atom::{PackageAtom, LATEST_VERSION};
use crate::error::{Error, Result};
use crate::version::RecipeVersion;

/// Name of the optional pointer file naming a recipe's newest version
pub const LATEST_POINTER_FILE: &str = "latest";

/// How the `latest` version sentinel is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatestPolicy {
    /// Honour a `latest` pointer file, else pick the highest sibling recipe
    #[default]
    Scan,
    /// Require a recipe file literally named `<name>-latest.sh`
    Literal,
}

/// A located recipe
///
/// `atom` is the resolved atom: when `latest` was requested under
/// [`LatestPolicy::Scan`], its version is the concrete version selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipePath {
    pub atom: PackageAtom,
    pub path: PathBuf,
}

/// Directory holding every recipe version of an atom's package
pub fn recipe_dir(atom: &PackageAtom, sources_root: &Path) -> PathBuf {
    sources_root
        .join(&atom.channel)
        .join("recipes")
        .join(&atom.name)
}

/// Canonical recipe file for an atom
///
/// `<sources-root>/<channel>/recipes/<name>/<name>-<version>.sh`. Pure: the
/// filesystem is not consulted.
pub fn recipe_path(atom: &PackageAtom, sources_root: &Path) -> PathBuf {
    recipe_dir(atom, sources_root).join(format!("{}-{}.sh", atom.name, atom.version))
}

/// Locate the recipe for an atom under a single sources root
pub fn locate(atom: &PackageAtom, sources_root: &Path, policy: LatestPolicy) -> Result<RecipePath> {
    let resolved = if atom.is_latest() && policy == LatestPolicy::Scan {
        resolve_latest(atom, sources_root)?
    } else {
        Some(atom.clone())
    };

    if let Some(resolved) = resolved {
        let path = recipe_path(&resolved, sources_root);
        debug!("Checking for recipe {}", path.display());
        if path.is_file() {
            return Ok(RecipePath {
                atom: resolved,
                path,
            });
        }
    }

    Err(not_found(atom))
}

/// Locate the recipe for an atom, searching each sources root in order
///
/// The first root that holds the recipe wins. `latest` is resolved per
/// root, so a newer version in a later root does not shadow an earlier one.
pub fn locate_in(atom: &PackageAtom, sources_roots: &[PathBuf], policy: LatestPolicy) -> Result<RecipePath> {
    for root in sources_roots {
        debug!("Searching for {} in {}", atom, root.display());
        match locate(atom, root, policy) {
            Ok(found) => {
                info!("Found {} at {}", found.atom, found.path.display());
                return Ok(found);
            }
            Err(Error::PackageNotFound { .. }) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(not_found(atom))
}

/// Pick the concrete version `latest` stands for under one sources root
///
/// Returns None when the recipe directory holds no candidate at all.
fn resolve_latest(atom: &PackageAtom, sources_root: &Path) -> Result<Option<PackageAtom>> {
    let dir = recipe_dir(atom, sources_root);
    if !dir.is_dir() {
        return Ok(None);
    }

    let pointer = dir.join(LATEST_POINTER_FILE);
    if pointer.is_file() {
        let version = fs::read_to_string(&pointer)?.trim().to_string();
        if !version.is_empty() && version != LATEST_VERSION {
            debug!("{} points {} at version {}", pointer.display(), atom.name, version);
            return Ok(Some(atom.with_version(version)));
        }
    }

    let prefix = format!("{}-", atom.name);
    let mut newest: Option<(RecipeVersion, String)> = None;

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(version) = file_name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".sh"))
        else {
            continue;
        };
        let Some(parsed) = RecipeVersion::parse(version) else {
            continue;
        };
        if !entry.file_type()?.is_file() {
            continue;
        }

        if newest.as_ref().is_none_or(|(best, _)| parsed > *best) {
            newest = Some((parsed, version.to_string()));
        }
    }

    Ok(newest.map(|(_, version)| {
        info!("Resolved {}/{}@latest to {}", atom.channel, atom.name, version);
        atom.with_version(version)
    }))
}

fn not_found(atom: &PackageAtom) -> Error {
    Error::PackageNotFound {
        name: atom.name.clone(),
        version: atom.version.clone(),
        channel: atom.channel.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_recipe(root: &Path, channel: &str, name: &str, version: &str) -> PathBuf {
        let dir = root.join(channel).join("recipes").join(name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}-{}.sh", name, version));
        fs::write(&path, "handle_build() { :; }\n").unwrap();
        path
    }

    #[test]
    fn test_recipe_path_layout() {
        let atom = PackageAtom::new("core", "binutils", "2.44-1");
        assert_eq!(
            recipe_path(&atom, Path::new("/srv/sources")),
            PathBuf::from("/srv/sources/core/recipes/binutils/binutils-2.44-1.sh")
        );
    }

    #[test]
    fn test_recipe_path_is_deterministic() {
        let a = PackageAtom::parse("extra/zlib@1.3").unwrap();
        let b = PackageAtom::parse("extra/zlib@1.3").unwrap();
        let root = Path::new("/r");
        assert_eq!(recipe_path(&a, root), recipe_path(&b, root));
    }

    #[test]
    fn test_locate_existing_version() {
        let temp = TempDir::new().unwrap();
        let expected = add_recipe(temp.path(), "core", "binutils", "2.44-1");

        let atom = PackageAtom::parse("core/binutils@2.44-1").unwrap();
        let found = locate(&atom, temp.path(), LatestPolicy::Scan).unwrap();
        assert_eq!(found.path, expected);
        assert_eq!(found.atom, atom);
    }

    #[test]
    fn test_locate_missing_version_carries_request() {
        let temp = TempDir::new().unwrap();
        add_recipe(temp.path(), "core", "binutils", "2.44-1");

        let atom = PackageAtom::parse("core/binutils@9.99-1").unwrap();
        match locate(&atom, temp.path(), LatestPolicy::Scan) {
            Err(Error::PackageNotFound { name, version, channel }) => {
                assert_eq!(name, "binutils");
                assert_eq!(version, "9.99-1");
                assert_eq!(channel, "core");
            }
            other => panic!("expected PackageNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_locate_directory_is_not_a_recipe() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("core/recipes/gcc/gcc-14.2-1.sh");
        fs::create_dir_all(&dir).unwrap();

        let atom = PackageAtom::parse("core/gcc@14.2-1").unwrap();
        assert!(matches!(
            locate(&atom, temp.path(), LatestPolicy::Scan),
            Err(Error::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_latest_scan_picks_highest() {
        let temp = TempDir::new().unwrap();
        add_recipe(temp.path(), "core", "binutils", "2.9-3");
        add_recipe(temp.path(), "core", "binutils", "2.44-1");
        let newest = add_recipe(temp.path(), "core", "binutils", "2.44-2");
        add_recipe(temp.path(), "core", "binutils", "latest");

        let atom = PackageAtom::parse("core/binutils").unwrap();
        let found = locate(&atom, temp.path(), LatestPolicy::Scan).unwrap();
        assert_eq!(found.path, newest);
        assert_eq!(found.atom.version, "2.44-2");
    }

    #[test]
    fn test_latest_pointer_file_wins_over_scan() {
        let temp = TempDir::new().unwrap();
        let pinned = add_recipe(temp.path(), "core", "binutils", "2.43-1");
        add_recipe(temp.path(), "core", "binutils", "2.44-1");
        fs::write(
            temp.path().join("core/recipes/binutils").join(LATEST_POINTER_FILE),
            "2.43-1\n",
        )
        .unwrap();

        let atom = PackageAtom::parse("core/binutils").unwrap();
        let found = locate(&atom, temp.path(), LatestPolicy::Scan).unwrap();
        assert_eq!(found.path, pinned);
    }

    #[test]
    fn test_latest_scan_without_recipes() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("core/recipes/empty")).unwrap();

        let atom = PackageAtom::parse("core/empty").unwrap();
        match locate(&atom, temp.path(), LatestPolicy::Scan) {
            Err(Error::PackageNotFound { version, .. }) => assert_eq!(version, "latest"),
            other => panic!("expected PackageNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_latest_literal_policy() {
        let temp = TempDir::new().unwrap();
        add_recipe(temp.path(), "core", "binutils", "2.44-1");
        let atom = PackageAtom::parse("core/binutils").unwrap();

        assert!(locate(&atom, temp.path(), LatestPolicy::Literal).is_err());

        let literal = add_recipe(temp.path(), "core", "binutils", "latest");
        let found = locate(&atom, temp.path(), LatestPolicy::Literal).unwrap();
        assert_eq!(found.path, literal);
        assert_eq!(found.atom.version, "latest");
    }

    #[test]
    fn test_locate_in_searches_roots_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        add_recipe(second.path(), "core", "zlib", "1.3-1");
        let preferred = add_recipe(first.path(), "core", "zlib", "1.3-1");
        let only_second = add_recipe(second.path(), "extra", "curl", "8.11-1");

        let roots = vec![first.path().to_path_buf(), second.path().to_path_buf()];

        let atom = PackageAtom::parse("core/zlib@1.3-1").unwrap();
        assert_eq!(locate_in(&atom, &roots, LatestPolicy::Scan).unwrap().path, preferred);

        let atom = PackageAtom::parse("extra/curl").unwrap();
        assert_eq!(locate_in(&atom, &roots, LatestPolicy::Scan).unwrap().path, only_second);

        let atom = PackageAtom::parse("extra/missing").unwrap();
        assert!(matches!(
            locate_in(&atom, &roots, LatestPolicy::Scan),
            Err(Error::PackageNotFound { .. })
        ));
    }
}
