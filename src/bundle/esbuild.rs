//! esbuild-backed compiler.
//!
//! # Modes
//! - Native: spawns the `esbuild` executable once per build, writing into a
//!   scratch output directory that is read back and discarded
//! - Sandboxed: posts the build to a remote build service as JSON
//!
//! # Design Decisions
//! - Remote `http(s)://` imports are left external; the browser fetches them
//! - Entry outputs are returned first, then shared chunks in name order
//! - Every build is bounded by a timeout; the subprocess is killed on drop

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use url::Url;

use crate::bundle::compiler::{
    BuildInput, BuildOptions, BuildOutput, BundleError, Compiler, EntryPoint, OutputFile,
};
use crate::bundle::gate::InitMode;

/// File name esbuild gives the output of a stdin entry.
const STDIN_OUTPUT: &str = "stdin.js";

/// Compiler that drives esbuild natively or through a build service.
pub struct EsbuildCompiler {
    executable: String,
    service_url: Option<Url>,
    options: BuildOptions,
    timeout: Duration,
    client: reqwest::Client,
    mode: OnceLock<InitMode>,
    resolved: OnceLock<PathBuf>,
}

impl EsbuildCompiler {
    pub fn new(executable: impl Into<String>, options: BuildOptions, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            service_url: None,
            options,
            timeout,
            client: reqwest::Client::new(),
            mode: OnceLock::new(),
            resolved: OnceLock::new(),
        }
    }

    /// Build service used in sandboxed mode.
    pub fn with_service(mut self, url: Url) -> Self {
        self.service_url = Some(url);
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    async fn init_native(&self) -> Result<(), BundleError> {
        let path = which::which(&self.executable)
            .map_err(|_| BundleError::ExecutableNotFound(self.executable.clone()))?;

        let mut cmd = Command::new(&path);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| BundleError::Timeout(self.timeout))?
            .map_err(BundleError::Spawn)?;

        if !output.status.success() {
            return Err(BundleError::BuildFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout);
        tracing::info!(
            executable = %path.display(),
            version = %version.trim(),
            "esbuild located"
        );
        let _ = self.resolved.set(path);
        Ok(())
    }

    async fn init_sandboxed(&self) -> Result<(), BundleError> {
        let base = self.service_url.as_ref().ok_or(BundleError::NoBuildService)?;
        let res = self
            .client
            .get(service_endpoint(base, "health"))
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(BundleError::ServiceStatus(res.status().as_u16()));
        }
        tracing::info!(service = %base, "Build service reachable");
        Ok(())
    }

    async fn build_native(&self, input: BuildInput) -> Result<BuildOutput, BundleError> {
        let executable = self.resolved.get().ok_or(BundleError::NotInitialized)?;
        let out_dir = tempfile::tempdir()?;

        let mut cmd = Command::new(executable);
        cmd.args(cli_args(&self.options, out_dir.path()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let (entry_files, stdin) = match input {
            BuildInput::EntryPoints {
                entries,
                working_dir,
            } => {
                let (args, names) = entry_args(&entries);
                cmd.current_dir(working_dir).stdin(Stdio::null()).args(args);
                (names, None)
            }
            BuildInput::Inline(source) => {
                cmd.current_dir(&source.resolve_dir)
                    .arg(format!("--sourcefile={}", source.sourcefile))
                    .arg(format!("--loader={}", source.loader.as_str()))
                    .stdin(Stdio::piped());
                (vec![STDIN_OUTPUT.to_string()], Some(source.contents))
            }
        };

        let mut child = cmd.spawn().map_err(BundleError::Spawn)?;
        if let (Some(contents), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(contents.as_bytes()).await?;
            // Dropping the pipe closes stdin so esbuild starts compiling.
            drop(pipe);
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| BundleError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(BundleError::BuildFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let output_files = collect_outputs(out_dir.path(), &entry_files).await?;
        tracing::debug!(outputs = output_files.len(), "esbuild finished");
        Ok(BuildOutput { output_files })
    }

    async fn build_remote(&self, input: BuildInput) -> Result<BuildOutput, BundleError> {
        let base = self.service_url.as_ref().ok_or(BundleError::NoBuildService)?;
        let request = RemoteBuildRequest {
            input: &input,
            options: &self.options,
        };

        let res = self
            .client
            .post(service_endpoint(base, "build"))
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(BundleError::ServiceStatus(res.status().as_u16()));
        }

        let body: RemoteBuildResponse = res.json().await?;
        Ok(BuildOutput {
            output_files: body
                .output_files
                .into_iter()
                .map(|f| OutputFile {
                    path: f.path,
                    contents: Bytes::from(f.contents),
                })
                .collect(),
        })
    }
}

#[async_trait]
impl Compiler for EsbuildCompiler {
    async fn initialize(&self, mode: InitMode) -> Result<(), BundleError> {
        match mode {
            InitMode::Native => self.init_native().await?,
            InitMode::Sandboxed => self.init_sandboxed().await?,
        }
        let _ = self.mode.set(mode);
        Ok(())
    }

    async fn build(&self, input: BuildInput) -> Result<BuildOutput, BundleError> {
        match self.mode.get() {
            Some(InitMode::Native) => self.build_native(input).await,
            Some(InitMode::Sandboxed) => self.build_remote(input).await,
            None => Err(BundleError::NotInitialized),
        }
    }
}

#[derive(Serialize)]
struct RemoteBuildRequest<'a> {
    input: &'a BuildInput,
    options: &'a BuildOptions,
}

#[derive(Deserialize)]
struct RemoteBuildResponse {
    output_files: Vec<RemoteOutputFile>,
}

#[derive(Deserialize)]
struct RemoteOutputFile {
    path: String,
    contents: String,
}

fn service_endpoint(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}

/// Command-line flags for the fixed build options.
pub fn cli_args(options: &BuildOptions, out_dir: &Path) -> Vec<String> {
    let mut args = Vec::new();
    if options.bundle {
        args.push("--bundle".to_string());
    }
    if options.minify {
        args.push("--minify".to_string());
    }
    if options.splitting {
        args.push("--splitting".to_string());
    }
    args.push(format!("--format={}", options.format));
    args.push(format!("--platform={}", options.platform));
    args.push(format!("--tree-shaking={}", options.tree_shaking));
    if !options.targets.is_empty() {
        args.push(format!("--target={}", options.targets.join(",")));
    }
    args.push("--external:https://*".to_string());
    args.push("--external:http://*".to_string());
    args.push(format!("--outdir={}", out_dir.display()));
    args
}

/// `NAME=location` arguments and the output path each entry is written to.
fn entry_args(entries: &[EntryPoint]) -> (Vec<String>, Vec<String>) {
    entries
        .iter()
        .map(|entry| {
            (
                format!("{}={}", entry.name, entry.location),
                format!("{}.js", entry.name),
            )
        })
        .unzip()
}

/// Read every emitted file, descending into subdirectories.
///
/// Paths are relative to `dir` and `/`-separated. `entries` (in order) come
/// first, the rest by path.
async fn collect_outputs(dir: &Path, entries: &[String]) -> Result<Vec<OutputFile>, BundleError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut reader = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(relative_name(dir, &entry.path()));
            }
        }
    }

    files.sort_by_key(|name| {
        let rank = entries.iter().position(|e| e == name).unwrap_or(entries.len());
        (rank, name.clone())
    });

    let mut outputs = Vec::with_capacity(files.len());
    for name in files {
        let contents = tokio::fs::read(dir.join(&name)).await?;
        outputs.push(OutputFile {
            path: name,
            contents: Bytes::from(contents),
        });
    }
    Ok(outputs)
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
