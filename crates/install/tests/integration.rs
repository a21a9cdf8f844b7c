//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;
    use vpkg_convert::Converter;
    use vpkg_errors::UserFacingError;
    use vpkg_events::{AppEvent, EventReceiver, ProgressKind};
    use vpkg_install::*;
    use vpkg_net::{Fetcher, NetClient, NetConfig};
    use vpkg_repository::RepositoryIndex;
    use vpkg_types::{InstalledPackages, PackageMeta, PackageSet, PackageSpec, RevertPolicy};

    const CONVERTER: &str = r#"#!/bin/sh
for arg in "$@"; do
    case "$arg" in
        --name=*) name="${arg#--name=}" ;;
    esac
done
echo "$name" >> "$XDEB_BINPKGS/calls"
if [ -e "$XDEB_BINPKGS/$name.fail" ]; then
    cat "$XDEB_BINPKGS/$name.fail" >&2
    exit 1
fi
if [ -e "$XDEB_BINPKGS/$name.slow" ]; then
    sleep "$(cat "$XDEB_BINPKGS/$name.slow")"
fi
echo "$name" >> "$XDEB_BINPKGS/finished"
echo "$XDEB_BINPKGS/$name.xbps"
"#;

    struct Fixture {
        temp: TempDir,
        server: MockServer,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(temp.path().join("binpkgs")).unwrap();
            let script = temp.path().join("xdeb");
            std::fs::write(&script, CONVERTER).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            Self {
                temp,
                server: MockServer::start(),
            }
        }

        fn binpkgs(&self) -> PathBuf {
            self.temp.path().join("binpkgs")
        }

        /// Serve an artifact for `name` and prepare the archive the
        /// converter will report for it.
        fn package(&self, name: &str, run_depends: &[&str]) -> httpmock::Mock<'_> {
            write_archive(&self.binpkgs().join(format!("{name}.xbps")), name, run_depends);
            let path = format!("/{name}.deb");
            self.server.mock(|when, then| {
                when.method(GET).path(path);
                then.status(200).body(format!("deb for {name}"));
            })
        }

        fn fail_conversion(&self, name: &str, stderr: &str) {
            std::fs::write(self.binpkgs().join(format!("{name}.fail")), stderr).unwrap();
        }

        fn slow_conversion(&self, name: &str, seconds: u32) {
            std::fs::write(self.binpkgs().join(format!("{name}.slow")), seconds.to_string())
                .unwrap();
        }

        fn finished(&self) -> Vec<String> {
            std::fs::read_to_string(self.binpkgs().join("finished"))
                .unwrap_or_default()
                .lines()
                .map(ToString::to_string)
                .collect()
        }

        fn spec(&self, name: &str, deps: &str) -> (String, PackageSpec) {
            (
                name.to_string(),
                PackageSpec {
                    url: self.server.url(format!("/{name}.deb")),
                    deps: deps.to_string(),
                    version: Some("1.0".to_string()),
                    ..PackageSpec::default()
                },
            )
        }

        fn conversions(&self) -> Vec<String> {
            std::fs::read_to_string(self.binpkgs().join("calls"))
                .unwrap_or_default()
                .lines()
                .map(ToString::to_string)
                .collect()
        }

        fn scheduler(
            &self,
            workers: usize,
            packages: PackageSet,
            installed: InstalledPackages,
        ) -> (Scheduler, EventReceiver) {
            let (tx, rx) = vpkg_events::channel();
            let client = NetClient::new(NetConfig {
                retry_count: 0,
                retry_delay: Duration::from_millis(1),
                ..NetConfig::default()
            })
            .unwrap();
            let scheduler = Scheduler::new(
                SchedulerConfig {
                    workers,
                    work_dir: self.temp.path().join("work"),
                    architecture: "x86_64".to_string(),
                    revert_policy: RevertPolicy::default(),
                },
                Fetcher::new(client),
                Converter::new(self.temp.path().join("xdeb"), self.binpkgs())
                    .with_shlibs(self.temp.path().join("shlibs")),
                Arc::new(packages),
                Arc::new(installed),
            )
            .with_event_sender(tx);
            (scheduler, rx)
        }

        async fn index(&self) -> SharedIndex {
            Arc::new(Mutex::new(
                RepositoryIndex::open(self.binpkgs(), "x86_64").await.unwrap(),
            ))
        }
    }

    fn write_archive(path: &Path, name: &str, run_depends: &[&str]) {
        let depends: String = run_depends
            .iter()
            .map(|d| format!("<string>{}</string>", d.replace('>', "&gt;")))
            .collect();
        let props = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>architecture</key>
	<string>x86_64</string>
	<key>pkgver</key>
	<string>{name}-1.0_1</string>
	<key>run_depends</key>
	<array>{depends}</array>
	<key>tags</key>
	<string>xdeb</string>
</dict>
</plist>
"#
        );
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(props.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "props.plist", props.as_bytes())
            .unwrap();
        let tarball = builder.into_inner().unwrap();
        std::fs::write(path, zstd::encode_all(&tarball[..], 3).unwrap()).unwrap();
    }

    fn record(pkgver: &str) -> PackageMeta {
        serde_json::from_value(serde_json::json!({
            "pkgver": pkgver,
            "architecture": "x86_64",
            "tags": "xdeb",
        }))
        .unwrap()
    }

    /// A record installed from a regular repository, without the xdeb tag.
    fn foreign_record(pkgver: &str) -> PackageMeta {
        serde_json::from_value(serde_json::json!({
            "pkgver": pkgver,
            "architecture": "x86_64",
        }))
        .unwrap()
    }

    fn progress(rx: &mut EventReceiver) -> Vec<(String, ProgressKind)> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Progress(p) = event {
                seen.push((p.package, p.kind));
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_three_packages_two_workers() {
        let fixture = Fixture::new();
        let mocks: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|name| fixture.package(name, &[]))
            .collect();
        let packages: PackageSet = ["a", "b", "c"]
            .iter()
            .map(|name| fixture.spec(name, ""))
            .collect();

        let (scheduler, mut rx) = fixture.scheduler(2, packages, InstalledPackages::default());
        let index = fixture.index().await;
        let report = scheduler
            .run(vec!["a".into(), "b".into(), "c".into()], Arc::clone(&index))
            .await
            .unwrap();

        for mock in &mocks {
            mock.assert_hits(1);
        }
        assert_eq!(report.initial, 3);
        assert_eq!(report.built(), 3);
        assert_eq!(report.explicit().count(), 3);
        assert_eq!(index.lock().unwrap().staged_len(), 3);

        let events = progress(&mut rx);
        let inits = events
            .iter()
            .filter(|(_, k)| matches!(k, ProgressKind::Init))
            .count();
        let dones = events
            .iter()
            .filter(|(_, k)| matches!(k, ProgressKind::Done))
            .count();
        assert_eq!(inits, 3);
        assert_eq!(dones, 3);

        // Init precedes every other event of the same job
        for name in ["a", "b", "c"] {
            let kinds: Vec<_> = events.iter().filter(|(p, _)| p == name).collect();
            assert!(matches!(kinds.first(), Some((_, ProgressKind::Init))));
            assert!(matches!(kinds.last(), Some((_, ProgressKind::Done))));
        }
    }

    #[tokio::test]
    async fn test_cached_package_skips_fetch_and_convert() {
        let fixture = Fixture::new();
        let mock = fixture.package("a", &[]);
        let packages: PackageSet = [fixture.spec("a", "")].into_iter().collect();

        let index = fixture.index().await;
        index.lock().unwrap().stage(record("a-1.0_1"));

        let (scheduler, _rx) = fixture.scheduler(2, packages, InstalledPackages::default());
        let report = scheduler
            .run(vec!["a".into()], Arc::clone(&index))
            .await
            .unwrap();

        mock.assert_hits(0);
        assert!(fixture.conversions().is_empty());
        assert_eq!(report.cached(), 1);
        assert_eq!(report.results[0].meta.pkgver, "a-1.0_1");
        assert!(Arc::ptr_eq(
            &report.results[0].meta,
            &index.lock().unwrap().lookup("a").unwrap()
        ));
    }

    #[tokio::test]
    async fn test_conversion_failure_aborts_run() {
        let fixture = Fixture::new();
        for name in ["a", "b", "c"] {
            fixture.package(name, &[]);
        }
        fixture.fail_conversion("b", "missing tool\n");
        let packages: PackageSet = ["a", "b", "c"]
            .iter()
            .map(|name| fixture.spec(name, ""))
            .collect();

        let index = fixture.index().await;
        let index_path = index.lock().unwrap().index_path();

        let (scheduler, mut rx) = fixture.scheduler(2, packages, InstalledPackages::default());
        let error = scheduler
            .run(vec!["a".into(), "b".into(), "c".into()], index)
            .await
            .unwrap_err();

        assert_eq!(error.user_message(), "xdeb failed with 1:\nmissing tool");
        let errors: Vec<_> = progress(&mut rx)
            .into_iter()
            .filter_map(|(package, kind)| match kind {
                ProgressKind::Error { message } => Some((package, message)),
                _ => None,
            })
            .collect();
        assert_eq!(
            errors,
            vec![("b".to_string(), "xdeb failed with 1:\nmissing tool".to_string())]
        );
        assert!(!index_path.exists());
    }

    #[tokio::test]
    async fn test_failure_cancels_slow_conversion() {
        let fixture = Fixture::new();
        fixture.package("slow", &[]);
        fixture.package("bad", &[]);
        fixture.slow_conversion("slow", 30);
        fixture.fail_conversion("bad", "broken control file\n");
        let packages: PackageSet = [fixture.spec("slow", ""), fixture.spec("bad", "")]
            .into_iter()
            .collect();

        let (scheduler, mut rx) = fixture.scheduler(2, packages, InstalledPackages::default());
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            scheduler.run(vec!["slow".into(), "bad".into()], fixture.index().await),
        )
        .await
        .expect("run should stop once a conversion fails");

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(10));
        let done: Vec<String> = progress(&mut rx)
            .into_iter()
            .filter(|(_, k)| matches!(k, ProgressKind::Done))
            .map(|(p, _)| p)
            .collect();
        assert!(done.is_empty());

        // The killed converter must not get to report its archive
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!fixture.finished().contains(&"slow".to_string()));
    }

    #[tokio::test]
    async fn test_discovered_dependency_is_processed() {
        let fixture = Fixture::new();
        fixture.package("c", &["d>=1.0_1", "glibc>=2.32_1"]);
        let dep_mock = fixture.package("d", &[]);
        let packages: PackageSet = [fixture.spec("c", ""), fixture.spec("d", "")]
            .into_iter()
            .collect();

        let (scheduler, mut rx) = fixture.scheduler(2, packages, InstalledPackages::default());
        let report = scheduler
            .run(vec!["c".into()], fixture.index().await)
            .await
            .unwrap();

        dep_mock.assert_hits(1);
        assert_eq!(report.jobs, vec!["c".to_string(), "d".to_string()]);
        assert_eq!(report.initial, 1);
        let explicit: Vec<&str> = report.explicit().map(|r| r.name.as_str()).collect();
        assert_eq!(explicit, vec!["c"]);

        let done: Vec<String> = progress(&mut rx)
            .into_iter()
            .filter(|(_, k)| matches!(k, ProgressKind::Done))
            .map(|(p, _)| p)
            .collect();
        assert_eq!(done.len(), 2);
        assert!(done.contains(&"d".to_string()));
    }

    #[tokio::test]
    async fn test_declared_deps_skip_fresh_installed() {
        let fixture = Fixture::new();
        fixture.package("app", &[]);
        let lib_mock = fixture.package("lib", &[]);
        let packages: PackageSet = [fixture.spec("app", "lib>=0"), fixture.spec("lib", "")]
            .into_iter()
            .collect();
        let installed: InstalledPackages = [record("lib-1.0_1")].into_iter().collect();

        let (scheduler, _rx) = fixture.scheduler(1, packages, installed);
        let report = scheduler
            .run(vec!["app".into()], fixture.index().await)
            .await
            .unwrap();

        lib_mock.assert_hits(0);
        assert_eq!(report.jobs, vec!["app".to_string()]);
    }

    #[tokio::test]
    async fn test_discovery_leaves_foreign_dependency_alone() {
        let fixture = Fixture::new();
        fixture.package("a", &["d>=1.0_1"]);
        let dep_mock = fixture.package("d", &[]);
        let packages: PackageSet = [fixture.spec("a", ""), fixture.spec("d", "")]
            .into_iter()
            .collect();
        let installed: InstalledPackages = [foreign_record("d-0.5_1")].into_iter().collect();

        let (scheduler, _rx) = fixture.scheduler(2, packages, installed);
        let report = scheduler
            .run(vec!["a".into()], fixture.index().await)
            .await
            .unwrap();

        dep_mock.assert_hits(0);
        assert_eq!(report.jobs, vec!["a".to_string()]);
        assert_eq!(fixture.conversions(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_shared_dependency_queued_once() {
        let fixture = Fixture::new();
        fixture.package("x", &["z>=0"]);
        fixture.package("y", &["z>=0"]);
        let z_mock = fixture.package("z", &[]);
        let packages: PackageSet = [
            fixture.spec("x", "z>=0"),
            fixture.spec("y", "z>=0"),
            fixture.spec("z", ""),
        ]
        .into_iter()
        .collect();

        let (scheduler, _rx) = fixture.scheduler(3, packages, InstalledPackages::default());
        let report = scheduler
            .run(vec!["x".into(), "y".into()], fixture.index().await)
            .await
            .unwrap();

        z_mock.assert_hits(1);
        assert_eq!(report.jobs.len(), 3);
        assert_eq!(report.results.len(), 3);
    }
}
