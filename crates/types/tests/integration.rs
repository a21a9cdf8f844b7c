//! Integration tests for types

#[cfg(test)]
mod tests {
    use vpkg_types::*;

    #[test]
    fn test_package_set_from_toml() {
        let set: PackageSet = toml::from_str(
            r#"
            [discord]
            url = "https://example.com/discord.deb"
            deps = "libatomic>=0 libnotify>=0"
            version = "0.0.40"

            [zoom]
            url = "https://example.com/zoom.deb"
            last_modified = 1700000000
            "#,
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        let discord = set.get("discord").unwrap();
        assert_eq!(discord.staleness(), Staleness::Version("0.0.40"));
        assert_eq!(
            discord.dep_patterns().collect::<Vec<_>>(),
            vec!["libatomic>=0", "libnotify>=0"]
        );
        assert_eq!(
            set.get("zoom").unwrap().staleness(),
            Staleness::LastModified(1_700_000_000)
        );
        assert!(!set.contains("slack"));
    }

    #[test]
    fn test_converted_tag() {
        let meta: PackageMeta = serde_json::from_value(serde_json::json!({
            "pkgver": "zoom-5.0_1",
            "architecture": "x86_64",
            "tags": CONVERTER_TAG,
        }))
        .unwrap();
        assert!(meta.is_converted());
    }

    #[test]
    fn test_installed_snapshot() {
        let installed: InstalledPackages = [
            ("zoom-5.0_1", Some(CONVERTER_TAG)),
            ("glibc-2.39_1", None),
        ]
        .into_iter()
        .map(|(pkgver, tags)| {
            serde_json::from_value::<PackageMeta>(serde_json::json!({
                "pkgver": pkgver,
                "architecture": "x86_64",
                "tags": tags,
            }))
            .unwrap()
        })
        .collect();

        assert_eq!(installed.len(), 2);
        assert!(installed.contains("glibc"));
        let converted: Vec<&str> = installed.converted().map(PackageMeta::name).collect();
        assert_eq!(converted, vec!["zoom"]);
    }
}
