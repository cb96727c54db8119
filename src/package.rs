//! Packager & Reporting
//!
//! Zips the published theme tree and writes the markdown build report.
//! Any failure here is fatal to the request regardless of the validator
//! outcome.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::platform::Platform;
use crate::validate::ThemeCheck;

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("Archive write failed at {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Archive encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Report write failed at {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything the build report records about one completed generation.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub project_name: String,
    pub platform: Platform,
    pub slug: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub spec_digest: String,
    pub content_hash: String,
    pub validator: ThemeCheck,
    pub theme_path: PathBuf,
    pub archive_path: PathBuf,
}

/// Compress the theme directory into a single archive. Entries are rooted
/// at `<root_name>/...` with forward slashes; no absolute paths, no parent
/// entries beyond the theme root. Walk order is sorted so the archive
/// layout is deterministic.
pub fn archive_theme(
    theme_dir: &Path,
    archive_path: &Path,
    root_name: &str,
) -> Result<(), PackagingError> {
    let file = File::create(archive_path).map_err(|e| PackagingError::Archive {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::new();
    collect_files(theme_dir, theme_dir, &mut files).map_err(|e| PackagingError::Archive {
        path: theme_dir.to_path_buf(),
        source: e,
    })?;
    files.sort();

    for rel in files {
        zip.start_file(format!("{root_name}/{rel}"), options)?;
        let full = theme_dir.join(&rel);
        let mut reader = File::open(&full).map_err(|e| PackagingError::Archive {
            path: full.clone(),
            source: e,
        })?;
        io::copy(&mut reader, &mut zip).map_err(|e| PackagingError::Archive {
            path: full,
            source: e,
        })?;
    }

    zip.finish()?;
    Ok(())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            out.push(rel);
        }
    }
    Ok(())
}

/// Write the markdown build report next to the archive.
pub fn write_report(report: &BuildReport, report_path: &Path) -> Result<(), PackagingError> {
    let body = render_report(report);
    fs::write(report_path, body).map_err(|e| PackagingError::Report {
        path: report_path.to_path_buf(),
        source: e,
    })
}

fn render_report(report: &BuildReport) -> String {
    let status = if report.validator.failed {
        "succeeded with findings"
    } else {
        "succeeded"
    };
    format!(
        "# Build Report: {name}\n\n\
         - Platform: {platform}\n\
         - Slug: {slug}\n\
         - Version: {version}\n\
         - Status: {status}\n\
         - Engine: {engine}\n\
         - Generated: {generated}\n\
         - Spec digest: {digest}\n\
         - Content hash: {hash}\n\n\
         ## Validation\n\n\
         {summary}\n\n\
         ## Artifacts\n\n\
         - Theme directory: {theme}\n\
         - Archive: {archive}\n",
        name = report.project_name,
        platform = report.platform,
        slug = report.slug,
        version = report.version,
        status = status,
        engine = crate::ENGINE_VERSION,
        generated = report.generated_at.to_rfc3339(),
        digest = report.spec_digest,
        hash = report.content_hash,
        summary = report.validator.summary,
        theme = report.theme_path.display(),
        archive = report.archive_path.display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn sample_report(theme: &Path, archive: &Path) -> BuildReport {
        BuildReport {
            project_name: "Clean Grid Blog".into(),
            platform: Platform::Ghost,
            slug: "clean-grid-blog".into(),
            version: "1.0.0".into(),
            generated_at: Utc::now(),
            spec_digest: "abc".into(),
            content_hash: "def".into(),
            validator: ThemeCheck {
                summary: "Basic validation passed — all required files present".into(),
                failed: false,
                findings: vec![],
            },
            theme_path: theme.to_path_buf(),
            archive_path: archive.to_path_buf(),
        }
    }

    #[test]
    fn test_archive_entries_rooted_at_slug() {
        let dir = tempdir().unwrap();
        let theme = dir.path().join("clean-grid-blog");
        fs::create_dir_all(theme.join("assets/css")).unwrap();
        fs::write(theme.join("package.json"), "{}").unwrap();
        fs::write(theme.join("assets/css/screen.css"), "body{}").unwrap();

        let archive = dir.path().join("clean-grid-blog.zip");
        archive_theme(&theme, &archive, "clean-grid-blog").unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"clean-grid-blog/package.json".to_string()));
        assert!(names.contains(&"clean-grid-blog/assets/css/screen.css".to_string()));
        for name in &names {
            assert!(!name.starts_with('/'), "absolute entry: {name}");
            assert!(!name.contains(".."), "parent traversal entry: {name}");
        }

        let mut body = String::new();
        zip.by_name("clean-grid-blog/package.json")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn test_report_lists_platform_and_summary() {
        let dir = tempdir().unwrap();
        let report = sample_report(
            &dir.path().join("clean-grid-blog"),
            &dir.path().join("clean-grid-blog.zip"),
        );
        let path = dir.path().join("clean-grid-blog-report.md");
        write_report(&report, &path).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains("Platform: ghost"));
        assert!(body.contains("Basic validation passed"));
        assert!(body.contains("clean-grid-blog.zip"));
    }

    #[test]
    fn test_archive_failure_on_bad_destination() {
        let dir = tempdir().unwrap();
        let theme = dir.path().join("theme");
        fs::create_dir_all(&theme).unwrap();
        let err = archive_theme(&theme, &dir.path().join("no/such/dir/x.zip"), "theme");
        assert!(matches!(err, Err(PackagingError::Archive { .. })));
    }
}
