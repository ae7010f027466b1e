//! End-to-end tests of the add pipeline against a mock registry.

#![cfg(unix)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cosmic_core::{
    AddError, ConflictPolicy, Context, Layout, NullReporter, Options, Registry, add,
};
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::{Mock, Server, ServerGuard};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    server: ServerGuard,
    mocks: Vec<Mock>,
    ctx: Context,
}

impl Fixture {
    async fn new(conflict: ConflictPolicy) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let server = Server::new_async().await;
        let registry = Registry::parse(&server.url()).expect("mock registry url");
        let layout = Layout::new(dir.path().join("Packages"), dir.path().join("tmp"));
        let options = Options {
            conflict,
            test_timeout: Some(Duration::from_secs(10)),
        };
        let ctx = Context::new(
            Context::build_client(None).unwrap(),
            registry,
            layout,
            Arc::new(NullReporter),
            options,
        );
        Self {
            _dir: dir,
            server,
            mocks: Vec::new(),
            ctx,
        }
    }

    async fn serve(&mut self, path: &str, status: usize, body: &[u8]) {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
    }

    async fn publish(&mut self, name: &str, manifest: &str, artifact_path: &str, body: &[u8]) {
        self.serve(&format!("/{name}.toml"), 200, manifest.as_bytes()).await;
        self.serve(artifact_path, 200, body).await;
    }

    fn packages(&self) -> PathBuf {
        self.ctx.layout.packages_dir.clone()
    }
}

fn tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, data.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn manifest(
    name: &str,
    url: &str,
    hash: &str,
    kind: &str,
    paths: &str,
    args: &str,
    bundle: bool,
) -> String {
    format!(
        r#"
name = "{name}"
url = "{url}"
version = "1.0.0"
hash = "{hash}"
type = "{kind}"
executablePaths = {paths}
testArgs = {args}
isBundle = {bundle}
"#
    )
}

const VERSION_SCRIPT: &str = "#!/bin/sh\n[ \"$1\" = \"version\" ]\n";

#[tokio::test]
async fn installs_archive_package() {
    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let archive = tar_gz(&[("k9s", VERSION_SCRIPT), ("README.md", "docs")]);
    let url = format!("{}/releases/k9s_Linux.tar.gz", fx.server.url());
    let m = manifest(
        "k9s",
        &url,
        &sha256(&archive),
        "Archive",
        r#"["/k9s"]"#,
        r#"["version"]"#,
        false,
    );
    fx.publish("k9s", &m, "/releases/k9s_Linux.tar.gz", &archive).await;

    let installed = add(&fx.ctx, "k9s").await.unwrap();

    let dest = fx.packages().join("k9s");
    assert_eq!(installed.entry_points, vec![dest.clone()]);
    assert_eq!(installed.package.version, "1.0.0");
    assert_eq!(fs::read_to_string(&dest).unwrap(), VERSION_SCRIPT);
    cosmic_core::install::verify_installed(&dest).unwrap();
    assert!(!fx.packages().join("README.md").exists());
}

#[tokio::test]
async fn installs_bundle_with_symlinks() {
    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let archive = tar_gz(&[
        ("tool-1.0/bin/a", "#!/bin/sh\nexit 0\n"),
        ("tool-1.0/bin/b", "#!/bin/sh\nexit 0\n"),
        ("tool-1.0/share/data", "data"),
    ]);
    let url = format!("{}/tool.tar.gz", fx.server.url());
    let m = manifest(
        "tool",
        &url,
        &sha256(&archive),
        "Archive",
        r#"["bin/a", "bin/b"]"#,
        "[]",
        true,
    );
    fx.publish("tool", &m, "/tool.tar.gz", &archive).await;

    let installed = add(&fx.ctx, "tool").await.unwrap();

    let packages = fx.packages();
    assert_eq!(installed.entry_points, vec![packages.join("a"), packages.join("b")]);
    assert!(packages.join("_tool/share/data").is_file());
    assert_eq!(
        fs::read_link(packages.join("a")).unwrap(),
        packages.join("_tool/bin/a")
    );
    assert_eq!(
        fs::read_link(packages.join("b")).unwrap(),
        packages.join("_tool/bin/b")
    );
}

#[tokio::test]
async fn installs_raw_binary() {
    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let body = b"#!/bin/sh\n[ \"$1\" = \"help\" ]\n";
    let url = format!("{}/dasel_linux_amd64", fx.server.url());
    let m = manifest("dasel", &url, &sha256(body), "Binary", r#"[""]"#, r#"["help"]"#, false);
    fx.publish("dasel", &m, "/dasel_linux_amd64", body).await;

    let installed = add(&fx.ctx, "dasel").await.unwrap();
    assert_eq!(installed.entry_points, vec![fx.packages().join("dasel")]);
    assert_eq!(fs::read(fx.packages().join("dasel")).unwrap(), body);
}

#[tokio::test]
async fn tampered_artifact_is_never_unpacked() {
    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let archive = tar_gz(&[("k9s", VERSION_SCRIPT)]);
    let mut tampered = archive.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xff;
    let url = format!("{}/k9s.tar.gz", fx.server.url());
    let m = manifest("k9s", &url, &sha256(&archive), "Archive", r#"["/k9s"]"#, "[]", false);
    fx.publish("k9s", &m, "/k9s.tar.gz", &tampered).await;

    let err = add(&fx.ctx, "k9s").await.unwrap_err();
    assert!(matches!(err, AddError::InvalidPackage { .. }), "{err}");
    assert!(!fx.ctx.layout.unpack_dir("k9s").exists());
    assert!(!fx.packages().join("k9s").exists());
}

#[tokio::test]
async fn zip_distribution_is_rejected() {
    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let body = b"PK\x03\x04";
    let url = format!("{}/k9s.zip", fx.server.url());
    let m = manifest("k9s", &url, &sha256(body), "Zip", r#"["/k9s"]"#, "[]", false);
    fx.publish("k9s", &m, "/k9s.zip", body).await;

    let err = add(&fx.ctx, "k9s").await.unwrap_err();
    assert!(matches!(err, AddError::InvalidPackage { .. }), "{err}");
    assert!(!fx.packages().join("k9s").exists());
}

#[tokio::test]
async fn failing_smoke_test_installs_nothing() {
    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let archive = tar_gz(&[("k9s", "#!/bin/sh\nexit 1\n")]);
    let url = format!("{}/k9s.tar.gz", fx.server.url());
    let m = manifest("k9s", &url, &sha256(&archive), "Archive", r#"["/k9s"]"#, "[]", false);
    fx.publish("k9s", &m, "/k9s.tar.gz", &archive).await;

    let err = add(&fx.ctx, "k9s").await.unwrap_err();
    assert!(matches!(err, AddError::ExecuteProcessFailed { .. }), "{err}");
    assert!(!fx.packages().join("k9s").exists());
}

#[tokio::test]
async fn missing_artifact_is_download_failure() {
    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let url = format!("{}/k9s_Darwin_arm64.rar", fx.server.url());
    let m = manifest("k9s", &url, &sha256(b""), "Archive", r#"["/k9s"]"#, "[]", false);
    fx.serve("/k9s.toml", 200, m.as_bytes()).await;
    fx.serve("/k9s_Darwin_arm64.rar", 404, b"").await;

    let err = add(&fx.ctx, "k9s").await.unwrap_err();
    assert!(matches!(err, AddError::DownloadFailed { .. }), "{err}");
}

#[tokio::test]
async fn reinstall_respects_conflict_policy() {
    let archive = tar_gz(&[("k9s", VERSION_SCRIPT)]);

    let mut fx = Fixture::new(ConflictPolicy::Refuse).await;
    let url = format!("{}/k9s.tar.gz", fx.server.url());
    let m = manifest(
        "k9s",
        &url,
        &sha256(&archive),
        "Archive",
        r#"["/k9s"]"#,
        r#"["version"]"#,
        false,
    );
    fx.publish("k9s", &m, "/k9s.tar.gz", &archive).await;

    add(&fx.ctx, "k9s").await.unwrap();
    let err = add(&fx.ctx, "k9s").await.unwrap_err();
    assert!(matches!(err, AddError::DestinationExists(_)), "{err}");

    fx.ctx.options.conflict = ConflictPolicy::Replace;
    add(&fx.ctx, "k9s").await.unwrap();
    assert!(fx.packages().join("k9s").is_file());
}
