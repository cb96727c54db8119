//! Validator Adapters - External Tool with Structural Fallback
//!
//! Two implementations of one capability per platform, selected at
//! resolution time: an adapter around the platform's external validation
//! tool, and a built-in structural scan used whenever the tool is absent
//! or times out. Both normalize into the same result shape. Findings
//! never block delivery of the artifact.

use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::builders;
use crate::platform::Platform;

/// Upper bound on an external validator run. Past it the child is killed
/// and the built-in path runs instead.
pub const EXTERNAL_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARN",
            Self::Info => "INFO",
        }
    }
}

/// A single non-fatal (or structural) validator observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub check: String,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(check: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            severity,
            message: message.into(),
        }
    }
}

/// Normalized validation outcome. `failed` downgrades the build to
/// "succeeded with findings"; it never aborts the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeCheck {
    pub summary: String,
    pub failed: bool,
    pub findings: Vec<Finding>,
}

/// Validator capability. Implementations must always return a non-empty
/// summary, success included.
pub trait ThemeValidator: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, theme_dir: &Path) -> ThemeCheck;
}

/// Pick the validator for a platform: the external tool when it is on
/// PATH, the built-in structural scan otherwise.
pub fn resolve_validator(platform: Platform) -> Box<dyn ThemeValidator> {
    let (tool, fallback) = external_tool(platform);
    match find_in_path(tool) {
        Some(path) => {
            debug!(tool, path = %path.display(), "external validator resolved");
            Box::new(ExternalToolValidator {
                tool: path,
                fallback,
                timeout: EXTERNAL_TOOL_TIMEOUT,
            })
        }
        None => {
            debug!(tool, "external validator unavailable, using built-in checks");
            fallback
        }
    }
}

fn external_tool(platform: Platform) -> (&'static str, Box<dyn ThemeValidator>) {
    match platform {
        Platform::Ghost => ("gscan", Box::new(GhostStructuralValidator)),
        Platform::Wordpress => ("themecheck", Box::new(WordpressStructuralValidator)),
    }
}

fn find_in_path(tool: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(tool);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = candidate.with_extension("exe");
        if exe.is_file() {
            return Some(exe);
        }
    }
    None
}

/// Adapter around a platform's external validation tool. Captures combined
/// stdout/stderr verbatim as the summary; non-zero exit marks the check
/// failed. On spawn failure or timeout it degrades to the fallback.
pub struct ExternalToolValidator {
    tool: PathBuf,
    fallback: Box<dyn ThemeValidator>,
    timeout: Duration,
}

impl ExternalToolValidator {
    pub fn new(tool: PathBuf, fallback: Box<dyn ThemeValidator>, timeout: Duration) -> Self {
        Self {
            tool,
            fallback,
            timeout,
        }
    }

    fn run(&self, theme_dir: &Path) -> Option<ThemeCheck> {
        let mut child = match Command::new(&self.tool)
            .arg(theme_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(tool = %self.tool.display(), error = %e, "external validator failed to start");
                return None;
            }
        };

        // Drain pipes on threads so a chatty tool cannot deadlock the
        // try_wait loop.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_handle = thread::spawn(move || read_all(stdout));
        let err_handle = thread::spawn(move || read_all(stderr));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!(tool = %self.tool.display(), "external validator timed out");
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                Ok(None) => thread::sleep(Duration::from_millis(50)),
                Err(e) => {
                    warn!(tool = %self.tool.display(), error = %e, "external validator wait failed");
                    let _ = child.kill();
                    break None;
                }
            }
        };

        let mut output = out_handle.join().unwrap_or_default();
        let err_output = err_handle.join().unwrap_or_default();
        if !err_output.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&err_output);
        }

        let status = status?;
        let failed = !status.success();
        let summary = if output.trim().is_empty() {
            format!(
                "{} exited with {} and produced no output",
                self.tool.display(),
                status
            )
        } else {
            output
        };
        Some(ThemeCheck {
            summary,
            failed,
            findings: vec![],
        })
    }
}

fn read_all(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut buf);
    }
    buf
}

impl ThemeValidator for ExternalToolValidator {
    fn name(&self) -> &'static str {
        "external-tool"
    }

    fn validate(&self, theme_dir: &Path) -> ThemeCheck {
        match self.run(theme_dir) {
            Some(check) => check,
            None => {
                let mut check = self.fallback.validate(theme_dir);
                check.findings.insert(
                    0,
                    Finding::new(
                        "external-tool",
                        Severity::Warning,
                        format!(
                            "external validator {} unavailable or timed out, built-in checks used",
                            self.tool.display()
                        ),
                    ),
                );
                check
            }
        }
    }
}

// --- Built-in structural fallback ---

/// PHP constructs the generated code must never contain. Any hit is
/// fatal to the check; the missing access guard below is only a warning.
const BANNED_PHP: &[&str] = &[
    "eval(",
    "create_function(",
    "assert(",
    "system(",
    "exec(",
    "passthru(",
    "shell_exec(",
];

const ACCESS_GUARD: &str = "defined( 'ABSPATH' )";

fn missing_required_files(theme_dir: &Path, required: &[&str]) -> Vec<Finding> {
    required
        .iter()
        .filter(|rel| !theme_dir.join(rel).is_file())
        .map(|rel| {
            Finding::new(
                "required-files",
                Severity::Error,
                format!("required file missing: {rel}"),
            )
        })
        .collect()
}

fn summarize(findings: Vec<Finding>) -> ThemeCheck {
    let failed = findings.iter().any(|f| f.severity == Severity::Error);
    let mut lines = vec![if failed {
        "Basic validation failed — structural errors found".to_string()
    } else {
        "Basic validation passed — all required files present".to_string()
    }];
    lines.extend(
        findings
            .iter()
            .map(|f| format!("{}: {}", f.severity.label(), f.message)),
    );
    ThemeCheck {
        summary: lines.join("\n"),
        failed,
        findings,
    }
}

pub struct GhostStructuralValidator;

impl ThemeValidator for GhostStructuralValidator {
    fn name(&self) -> &'static str {
        "ghost-structural"
    }

    fn validate(&self, theme_dir: &Path) -> ThemeCheck {
        let mut findings = missing_required_files(theme_dir, builders::ghost::REQUIRED_FILES);

        // Manifest field checks are warnings, not failures.
        if let Ok(body) = fs::read_to_string(theme_dir.join("package.json")) {
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(manifest) => {
                    for field in ["name", "version"] {
                        if manifest.get(field).and_then(|v| v.as_str()).is_none() {
                            findings.push(Finding::new(
                                "manifest",
                                Severity::Warning,
                                format!("package.json missing field: {field}"),
                            ));
                        }
                    }
                }
                Err(e) => findings.push(Finding::new(
                    "manifest",
                    Severity::Warning,
                    format!("package.json is not valid JSON: {e}"),
                )),
            }
        }

        summarize(findings)
    }
}

pub struct WordpressStructuralValidator;

impl ThemeValidator for WordpressStructuralValidator {
    fn name(&self) -> &'static str {
        "wordpress-structural"
    }

    fn validate(&self, theme_dir: &Path) -> ThemeCheck {
        let mut findings = missing_required_files(theme_dir, builders::wordpress::REQUIRED_FILES);

        // Stylesheet header: missing mandatory fields are warnings.
        if let Ok(css) = fs::read_to_string(theme_dir.join("style.css")) {
            for field in ["Theme Name:", "Description:", "Author:", "Version:"] {
                if !css.contains(field) {
                    findings.push(Finding::new(
                        "style-header",
                        Severity::Warning,
                        format!("style.css header missing field: {}", field.trim_end_matches(':')),
                    ));
                }
            }
        }

        // Banned constructs are fatal; a missing access guard is only a
        // warning. The asymmetry is deliberate.
        for php in php_files(theme_dir) {
            let Ok(body) = fs::read_to_string(&php) else {
                continue;
            };
            let rel = php
                .strip_prefix(theme_dir)
                .unwrap_or(&php)
                .display()
                .to_string();
            for banned in BANNED_PHP {
                if body.contains(banned) {
                    findings.push(Finding::new(
                        "banned-construct",
                        Severity::Error,
                        format!("{rel} contains banned construct {banned}"),
                    ));
                }
            }
            if !body.contains(ACCESS_GUARD) {
                findings.push(Finding::new(
                    "access-guard",
                    Severity::Warning,
                    format!("{rel} lacks the direct-access guard"),
                ));
            }
        }

        if theme_dir.join("theme.json").is_file() {
            findings.push(Finding::new("block-editor", Severity::Info, "theme.json found"));
        }

        summarize(findings)
    }
}

// Whole-tree walk: banned constructs hidden in a subdirectory (inc/,
// template-parts/) count the same as top-level ones.
fn php_files(theme_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_php(theme_dir, &mut files);
    files.sort();
    files
}

fn collect_php(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_php(&path, out);
        } else if path.extension().is_some_and(|e| e == "php") {
            out.push(path);
        }
    }
}
