//! Provisioning of the packaging tool binary
//!
//! Downloads the release archive, checks it against the published sha256
//! and installs the binary. Any integrity mismatch aborts the run.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;

use crate::command::ToolCommand;
use crate::error::{CoreError, Result};
use crate::runner::ToolRunner;
use crate::version::normalize_tag;

/// Tool release used when no version is requested
pub const DEFAULT_TOOL_VERSION: &str = "v3.14.4";

/// Name of the installed binary
pub const TOOL_BINARY: &str = "helm";

/// Default location of the installed binary
pub const DEFAULT_INSTALL_DIR: &str = "/usr/local/bin";

const DOWNLOAD_BASE_URL: &str = "https://get.helm.sh";
const PLATFORM: &str = "linux";
const USER_AGENT: &str = concat!("chartpack/", env!("CARGO_PKG_VERSION"));

/// Map a machine name to a release architecture
pub fn arch_for(machine: &str) -> Result<&'static str> {
    match machine.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" => Ok("amd64"),
        "aarch64" | "arm64" => Ok("arm64"),
        other => Err(CoreError::invalid_input(format!(
            "Unsupported CPU architecture for {} binary: {}",
            TOOL_BINARY, other
        ))),
    }
}

/// Release architecture of the running host
pub fn detect_arch() -> Result<&'static str> {
    arch_for(std::env::consts::ARCH)
}

/// Download coordinates of one release build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub filename: String,
    pub url: String,
    pub checksum_url: String,
    /// Path of the binary inside the archive
    pub member: String,
}

impl ReleaseAsset {
    pub fn new(base_url: &str, tag: &str, arch: &str) -> Self {
        let filename = format!("{}-{}-{}-{}.tar.gz", TOOL_BINARY, tag, PLATFORM, arch);
        let url = format!("{}/{}", base_url.trim_end_matches('/'), filename);
        Self {
            checksum_url: format!("{}.sha256", url),
            member: format!("{}-{}/{}", PLATFORM, arch, TOOL_BINARY),
            filename,
            url,
        }
    }
}

/// Parse a `.sha256` file: `<hash>` or `<hash>  <filename>`
pub fn parse_sha256(text: &str) -> Result<String> {
    let text = text.trim();
    let token = text.split_whitespace().next().ok_or_else(|| CoreError::Integrity {
        message: "empty sha256 file".to_string(),
    })?;

    if token.len() != 64 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        let preview: String = text.chars().take(120).collect();
        return Err(CoreError::Integrity {
            message: format!("invalid sha256 content: {}", preview),
        });
    }

    Ok(token.to_ascii_lowercase())
}

/// Lowercase hex sha256 of `data`
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check `archive` against `checksum_file` and pull out the tool binary
pub fn verify_and_extract(archive: &[u8], checksum_file: &str, asset: &ReleaseAsset) -> Result<Vec<u8>> {
    let expected = parse_sha256(checksum_file)?;
    let actual = sha256_hex(archive);
    if actual != expected {
        return Err(CoreError::Integrity {
            message: format!(
                "{} tarball sha256 mismatch. expected={} actual={} url={}",
                TOOL_BINARY, expected, actual, asset.url
            ),
        });
    }

    extract_member(archive, &asset.member)
}

fn extract_member(archive: &[u8], member: &str) -> Result<Vec<u8>> {
    let mut archive = Archive::new(GzDecoder::new(archive));

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.to_string_lossy() == member {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            return Ok(content);
        }
    }

    Err(CoreError::setup(format!("archive missing {}", member)))
}

/// Write `binary` as an executable into `dir`
pub fn write_binary(binary: &[u8], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(TOOL_BINARY);
    std::fs::write(&path, binary)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// Downloads and installs the packaging tool
#[derive(Debug)]
pub struct Installer {
    client: reqwest::blocking::Client,
    base_url: String,
    install_dir: PathBuf,
}

impl Installer {
    pub fn new(install_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CoreError::setup(format!("cannot create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DOWNLOAD_BASE_URL.to_string(),
            install_dir: install_dir.into(),
        })
    }

    /// Download from a mirror instead of the official release host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Install the requested release and check that it runs
    ///
    /// Returns the path of the installed binary.
    pub fn install(&self, version: &str, runner: &dyn ToolRunner) -> Result<PathBuf> {
        let tag = normalize_tag(version)?;
        let arch = detect_arch()?;
        let asset = ReleaseAsset::new(&self.base_url, &tag, arch);

        tracing::info!("Downloading {} {} ({}/{})...", TOOL_BINARY, tag, PLATFORM, arch);
        let archive = self.download(&asset.url)?;
        let checksum = self.download(&asset.checksum_url)?;
        let checksum = String::from_utf8_lossy(&checksum);

        tracing::info!("Extracting {}...", TOOL_BINARY);
        let binary = verify_and_extract(&archive, &checksum, &asset)?;
        let path = write_binary(&binary, &self.install_dir)?;

        let version_cmd = ToolCommand::new(
            path.display().to_string(),
            vec!["version".to_string(), "--short".to_string()],
        );
        let version = runner.run_checked(&version_cmd)?;
        tracing::info!("{}", version.output.trim());

        Ok(path)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| CoreError::setup(format!("download of {} failed: {}", url, e)))?;

        let body = response
            .bytes()
            .map_err(|e| CoreError::setup(format!("download of {} failed: {}", url, e)))?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolOutput;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    fn release_tarball(member: &str, content: &[u8]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = Builder::new(encoder);

        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, member, content).unwrap();

        builder.into_inner().unwrap().finish().unwrap()
    }

    struct VersionRunner;

    impl ToolRunner for VersionRunner {
        fn run(&self, _command: &ToolCommand) -> Result<ToolOutput> {
            Ok(ToolOutput {
                code: Some(0),
                output: "v3.14.4+g81c902a\n".to_string(),
            })
        }
    }

    #[test]
    fn test_arch_for() {
        assert_eq!(arch_for("x86_64").unwrap(), "amd64");
        assert_eq!(arch_for("AMD64").unwrap(), "amd64");
        assert_eq!(arch_for("aarch64").unwrap(), "arm64");
        assert_eq!(arch_for("arm64").unwrap(), "arm64");
        assert!(arch_for("riscv64").is_err());
    }

    #[test]
    fn test_release_asset() {
        let asset = ReleaseAsset::new("https://get.helm.sh/", "v3.14.4", "amd64");
        assert_eq!(asset.filename, "helm-v3.14.4-linux-amd64.tar.gz");
        assert_eq!(asset.url, "https://get.helm.sh/helm-v3.14.4-linux-amd64.tar.gz");
        assert_eq!(asset.checksum_url, "https://get.helm.sh/helm-v3.14.4-linux-amd64.tar.gz.sha256");
        assert_eq!(asset.member, "linux-amd64/helm");
    }

    #[test]
    fn test_parse_sha256_accepts_hash_only() {
        let hash = "a".repeat(64);
        assert_eq!(parse_sha256(&format!("{}\n", hash)).unwrap(), hash);
    }

    #[test]
    fn test_parse_sha256_accepts_hash_and_filename() {
        let hash = "B".repeat(64);
        let parsed = parse_sha256(&format!("{}  helm-v3.14.4-linux-amd64.tar.gz\n", hash)).unwrap();
        assert_eq!(parsed, "b".repeat(64));
    }

    #[test]
    fn test_parse_sha256_rejects_garbage() {
        assert!(matches!(parse_sha256("  \n"), Err(CoreError::Integrity { .. })));
        assert!(matches!(parse_sha256("not-a-hash file"), Err(CoreError::Integrity { .. })));
        assert!(matches!(parse_sha256(&"g".repeat(64)), Err(CoreError::Integrity { .. })));
    }

    #[test]
    fn test_verify_and_extract() {
        let asset = ReleaseAsset::new(DOWNLOAD_BASE_URL, "v3.14.4", "amd64");
        let tarball = release_tarball(&asset.member, b"#!/bin/sh\necho helm\n");
        let checksum = format!("{}  {}\n", sha256_hex(&tarball), asset.filename);

        let binary = verify_and_extract(&tarball, &checksum, &asset).unwrap();
        assert_eq!(binary, b"#!/bin/sh\necho helm\n");
    }

    #[test]
    fn test_verify_and_extract_rejects_mismatch() {
        let asset = ReleaseAsset::new(DOWNLOAD_BASE_URL, "v3.14.4", "amd64");
        let tarball = release_tarball(&asset.member, b"binary");

        let err = verify_and_extract(&tarball, &"0".repeat(64), &asset).unwrap_err();
        match err {
            CoreError::Integrity { message } => {
                assert!(message.contains("mismatch"));
                assert!(message.contains(&asset.url));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_verify_and_extract_missing_member() {
        let asset = ReleaseAsset::new(DOWNLOAD_BASE_URL, "v3.14.4", "arm64");
        let tarball = release_tarball("linux-amd64/helm", b"binary");
        let checksum = sha256_hex(&tarball);

        let err = verify_and_extract(&tarball, &checksum, &asset).unwrap_err();
        assert!(matches!(err, CoreError::Setup { .. }));
    }

    #[test]
    fn test_write_binary_is_executable() {
        let temp = TempDir::new().unwrap();
        let path = write_binary(b"binary", &temp.path().join("bin")).unwrap();

        assert_eq!(path, temp.path().join("bin").join(TOOL_BINARY));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_install_from_mirror() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let Ok(arch) = detect_arch() else { return };
        let server = MockServer::start().await;
        let asset = ReleaseAsset::new(&server.uri(), "v3.14.4", arch);
        let tarball = release_tarball(&asset.member, b"#!/bin/sh\n");
        let checksum = format!("{}  {}\n", sha256_hex(&tarball), asset.filename);

        Mock::given(method("GET"))
            .and(path(format!("/{}", asset.filename)))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(tarball))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}.sha256", asset.filename)))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(checksum))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let install_dir = temp.path().to_path_buf();
        let base_url = server.uri();
        let installed = tokio::task::spawn_blocking(move || {
            Installer::new(install_dir)?
                .with_base_url(base_url)
                .install("3.14.4", &VersionRunner)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(installed, temp.path().join(TOOL_BINARY));
        assert_eq!(std::fs::read(&installed).unwrap(), b"#!/bin/sh\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_install_fails_on_checksum_mismatch() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        if detect_arch().is_err() {
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("f".repeat(64)))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let install_dir = temp.path().to_path_buf();
        let base_url = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            Installer::new(install_dir)?
                .with_base_url(base_url)
                .install("v3.14.4", &VersionRunner)
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(CoreError::Integrity { .. })));
        assert!(!temp.path().join(TOOL_BINARY).exists());
    }
}
