//! Generation Pipeline - Single Entry Point
//!
//! Stages: Validating → Generating → ValidatingOutput → Packaging →
//! Reporting → Done, with one absorbing Failed state. Validator findings
//! never fail a build; spec, generation and packaging errors do. Every
//! stage communicates only through the BuildContext.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::hashing::{hash_tree, spec_digest};
use crate::package::{self, BuildReport, PackagingError};
use crate::platform::{GenerationError, PlatformRegistry, UnsupportedPlatformError};
use crate::spec::{SpecError, SpecValidationError, ThemeSpec};
use crate::validate::ThemeCheck;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Spec(#[from] SpecValidationError),

    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatformError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The theme built and validated but could not be packaged. Distinct
    /// from a generation failure on purpose.
    #[error("Theme was generated but packaging failed: {0}")]
    Packaging(#[source] PackagingError),
}

impl From<SpecError> for BuildError {
    fn from(err: SpecError) -> Self {
        match err {
            SpecError::Validation(e) => Self::Spec(e),
            SpecError::UnsupportedPlatform(e) => Self::UnsupportedPlatform(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStage {
    Validating,
    Generating,
    ValidatingOutput,
    Packaging,
    Reporting,
    Done,
    Failed,
}

/// Per-request build state. Owned exclusively by the pipeline for the
/// request's lifetime; nothing persists beyond the files written under
/// the output root.
pub struct BuildContext {
    pub spec: ThemeSpec,
    pub slug: String,
    pub stage: BuildStage,
    pub staging_dir: PathBuf,
    pub check: Option<ThemeCheck>,
    pub archive_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
}

/// What the outer service layer gets back from `build_theme`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub slug: String,
    pub theme_path: PathBuf,
    pub archive_path: PathBuf,
    pub report_path: PathBuf,
    pub validator_summary: String,
    /// True when the validator reported failures; the artifacts are still
    /// delivered.
    pub failed: bool,
    pub generated_at: DateTime<Utc>,
}

/// The generation pipeline - single entry point for all theme builds.
pub struct ThemePipeline {
    registry: PlatformRegistry,
    output_root: PathBuf,
}

impl ThemePipeline {
    pub fn new(registry: PlatformRegistry, output_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            output_root: output_root.into(),
        }
    }

    /// Pipeline with every built-in platform registered.
    pub fn with_defaults(output_root: impl Into<PathBuf>) -> Self {
        Self::new(PlatformRegistry::with_builtin_platforms(), output_root)
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Build a theme from a raw spec document.
    ///
    /// Spec validation runs before anything touches the filesystem. The
    /// theme renders into a private staging directory, is validated there,
    /// and is only then atomically published under its slug.
    pub fn build_theme(&self, raw: Value) -> Result<BuildOutcome, BuildError> {
        // Stage: Validating. Pure; a rejected spec leaves no trace on disk.
        let digest = spec_digest(&raw).unwrap_or_default();
        let spec = ThemeSpec::from_value(raw).map_err(BuildError::from)?;
        let entry = self.registry.resolve(spec.platform)?;
        let slug = spec.slug();

        let staging_dir = self
            .staging_root()
            .join(format!("{slug}-{}", Uuid::new_v4()));
        let mut ctx = BuildContext {
            spec,
            slug,
            stage: BuildStage::Generating,
            staging_dir,
            check: None,
            archive_path: None,
            started_at: Utc::now(),
        };
        info!(slug = %ctx.slug, platform = %ctx.spec.platform, stage = ?ctx.stage, "generating theme");

        fs::create_dir_all(&ctx.staging_dir)
            .map_err(|e| GenerationError::io(&ctx.staging_dir, e))?;

        if let Err(e) = entry.builder.generate(&ctx.spec, &ctx.staging_dir) {
            // Partial staging output is discarded, never published.
            ctx.stage = BuildStage::Failed;
            let _ = fs::remove_dir_all(&ctx.staging_dir);
            error!(slug = %ctx.slug, error = %e, "generation failed, staging discarded");
            return Err(e.into());
        }

        // Stage: ValidatingOutput. Findings annotate; they never abort.
        ctx.stage = BuildStage::ValidatingOutput;
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);
        let check = entry.validator.validate(&ctx.staging_dir);
        info!(slug = %ctx.slug, failed = check.failed, "output validated");
        ctx.check = Some(check);

        // Publish only after validation has produced a result.
        let theme_path = self.output_root.join(&ctx.slug);
        self.publish(&ctx.staging_dir, &theme_path)?;

        // Stage: Packaging. Failure here is fatal even though the theme
        // directory already exists.
        ctx.stage = BuildStage::Packaging;
        let archive_path = self.output_root.join(format!("{}.zip", ctx.slug));
        package::archive_theme(&theme_path, &archive_path, &ctx.slug)
            .map_err(BuildError::Packaging)?;
        ctx.archive_path = Some(archive_path.clone());

        // Stage: Reporting.
        ctx.stage = BuildStage::Reporting;
        let check = ctx.check.take().unwrap_or_else(|| ThemeCheck {
            summary: "validation produced no result".into(),
            failed: false,
            findings: vec![],
        });
        let content_hash = hash_tree(&theme_path).unwrap_or_default();
        let report = BuildReport {
            project_name: ctx.spec.project_name.clone(),
            platform: ctx.spec.platform,
            slug: ctx.slug.clone(),
            version: ctx.spec.version.to_string(),
            generated_at: ctx.started_at,
            spec_digest: digest,
            content_hash,
            validator: check,
            theme_path: theme_path.clone(),
            archive_path: archive_path.clone(),
        };
        let report_path = self.output_root.join(format!("{}-report.md", ctx.slug));
        package::write_report(&report, &report_path).map_err(BuildError::Packaging)?;

        ctx.stage = BuildStage::Done;
        info!(slug = %ctx.slug, stage = ?ctx.stage, failed = report.validator.failed, "build complete");

        Ok(BuildOutcome {
            slug: ctx.slug,
            theme_path,
            archive_path,
            report_path,
            validator_summary: report.validator.summary,
            failed: report.validator.failed,
            generated_at: ctx.started_at,
        })
    }

    fn staging_root(&self) -> PathBuf {
        self.output_root.join(".staging")
    }

    /// Atomic publish: rename the staging tree into the slug's output
    /// path. An existing tree is swapped out through a grave rename so a
    /// concurrent reader never observes a partial directory. Every error
    /// branch discards the staging tree; nothing unpublished survives
    /// under `.staging/`.
    fn publish(&self, staging: &Path, theme_path: &Path) -> Result<(), GenerationError> {
        if theme_path.exists() {
            let grave = self.staging_root().join(format!(
                "{}-old-{}",
                theme_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                Uuid::new_v4()
            ));
            if let Err(e) = fs::rename(theme_path, &grave) {
                let _ = fs::remove_dir_all(staging);
                return Err(GenerationError::io(theme_path, e));
            }
            if let Err(e) = fs::rename(staging, theme_path) {
                // Put the previous tree back; the new build is lost.
                let _ = fs::rename(&grave, theme_path);
                let _ = fs::remove_dir_all(staging);
                return Err(GenerationError::io(staging, e));
            }
            let _ = fs::remove_dir_all(&grave);
        } else if let Err(e) = fs::rename(staging, theme_path) {
            let _ = fs::remove_dir_all(staging);
            return Err(GenerationError::io(staging, e));
        }
        Ok(())
    }
}
