//! Shared-library consistency between the committed index and the stage

use std::collections::BTreeMap;
use std::sync::Arc;
use vpkg_errors::BrokenShlib;
use vpkg_types::PackageMeta;

type Entries = BTreeMap<String, Arc<PackageMeta>>;

/// Shared libraries that merging `stage` into `index` would leave without a
/// provider while some package still requires them.
///
/// Only libraries provided by an index entry that the stage replaces are
/// considered. A requirer is any index package, seen through its staged
/// replacement when there is one. A library stops being broken as soon as
/// an untouched index entry or any staged entry provides it.
#[must_use]
pub fn broken_shlibs(index: &Entries, stage: &Entries) -> Vec<BrokenShlib> {
    let mut old: BTreeMap<&str, &str> = BTreeMap::new();
    for name in stage.keys() {
        if let Some(replaced) = index.get(name) {
            for shlib in &replaced.shlib_provides {
                old.insert(shlib, name);
            }
        }
    }
    if old.is_empty() {
        return Vec::new();
    }

    let mut used: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, entry) in index {
        let current = stage.get(name).unwrap_or(entry);
        for shlib in &current.shlib_requires {
            if old.contains_key(shlib.as_str()) {
                used.entry(shlib).or_default().push(name);
            }
        }
    }

    let still_provided = index
        .iter()
        .filter(|(name, _)| !stage.contains_key(*name))
        .chain(stage.iter())
        .flat_map(|(_, entry)| entry.shlib_provides.iter());
    for shlib in still_provided {
        used.remove(shlib.as_str());
    }

    used.into_iter()
        .map(|(shlib, users)| BrokenShlib {
            shlib: shlib.to_string(),
            provider: old.get(shlib).copied().unwrap_or_default().to_string(),
            users: users.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pkg(pkgver: &str, provides: &[&str], requires: &[&str]) -> Arc<PackageMeta> {
        Arc::new(
            serde_json::from_value(json!({
                "pkgver": pkgver,
                "architecture": "x86_64",
                "shlib-provides": provides,
                "shlib-requires": requires,
            }))
            .unwrap(),
        )
    }

    fn entries(pkgs: &[(&str, Arc<PackageMeta>)]) -> Entries {
        pkgs.iter()
            .map(|(name, meta)| ((*name).to_string(), Arc::clone(meta)))
            .collect()
    }

    #[test]
    fn test_dropped_provider_is_reported() {
        let index = entries(&[
            ("a", pkg("a-1_1", &["libx.so.1"], &[])),
            ("b", pkg("b-1_1", &[], &["libx.so.1"])),
            ("c", pkg("c-1_1", &[], &["libx.so.1"])),
        ]);
        let stage = entries(&[("a", pkg("a-2_1", &["libx.so.2"], &[]))]);

        let broken = broken_shlibs(&index, &stage);
        assert_eq!(
            broken,
            vec![BrokenShlib {
                shlib: "libx.so.1".into(),
                provider: "a".into(),
                users: vec!["b".into(), "c".into()],
            }]
        );
        assert_eq!(
            broken[0].to_string(),
            "libx.so.1 (provided by: a; used by: b, c)"
        );
    }

    #[test]
    fn test_staged_consumer_update_resolves() {
        let index = entries(&[
            ("a", pkg("a-1_1", &["libx.so.1"], &[])),
            ("b", pkg("b-1_1", &[], &["libx.so.1"])),
        ]);
        let stage = entries(&[
            ("a", pkg("a-2_1", &["libx.so.2"], &[])),
            ("b", pkg("b-2_1", &[], &["libx.so.2"])),
        ]);
        assert!(broken_shlibs(&index, &stage).is_empty());
    }

    #[test]
    fn test_other_provider_keeps_library() {
        let index = entries(&[
            ("a", pkg("a-1_1", &["libx.so.1"], &[])),
            ("alt", pkg("alt-1_1", &["libx.so.1"], &[])),
            ("b", pkg("b-1_1", &[], &["libx.so.1"])),
        ]);
        let stage = entries(&[("a", pkg("a-2_1", &[], &[]))]);
        assert!(broken_shlibs(&index, &stage).is_empty());
    }

    #[test]
    fn test_new_packages_never_break() {
        let index = entries(&[("b", pkg("b-1_1", &[], &["libx.so.1"]))]);
        let stage = entries(&[("a", pkg("a-1_1", &[], &[]))]);
        assert!(broken_shlibs(&index, &stage).is_empty());
    }
}
