//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable pipeline guarantees. Validators
//! are pinned to the built-in structural implementations so the results
//! do not depend on external tools being installed.

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::tempdir;

use themeforge_core::builders::{GhostBuilder, WordpressBuilder};
use themeforge_core::hashing::hash_tree;
use themeforge_core::validate::{GhostStructuralValidator, WordpressStructuralValidator};
use themeforge_core::{BuildError, PlatformRegistry, ThemePipeline};

fn offline_pipeline(output_root: &Path) -> ThemePipeline {
    let mut registry = PlatformRegistry::new();
    registry.register(Box::new(GhostBuilder), Box::new(GhostStructuralValidator));
    registry.register(
        Box::new(WordpressBuilder),
        Box::new(WordpressStructuralValidator),
    );
    ThemePipeline::new(registry, output_root)
}

fn ghost_spec() -> serde_json::Value {
    json!({
        "platform": "ghost",
        "projectName": "Clean Grid Blog",
        "colors": {"primary": "#1a1a1a"},
    })
}

#[test]
fn invariant_ghost_build_publishes_required_files() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());

    let outcome = pipeline.build_theme(ghost_spec()).unwrap();
    assert_eq!(outcome.slug, "clean-grid-blog");
    assert!(!outcome.failed);

    for rel in [
        "package.json",
        "default.hbs",
        "index.hbs",
        "post.hbs",
        "tag.hbs",
        "assets/css/screen.css",
    ] {
        assert!(
            outcome.theme_path.join(rel).is_file(),
            "missing required file {rel}"
        );
    }
    assert!(outcome.archive_path.is_file());
    assert!(outcome.archive_path.ends_with("clean-grid-blog.zip"));

    let report = fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("Platform: ghost"));
    assert!(report.contains("Slug: clean-grid-blog"));
}

#[test]
fn invariant_ghost_asset_references_are_relative() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());
    let outcome = pipeline.build_theme(ghost_spec()).unwrap();

    for rel in ["default.hbs", "index.hbs", "post.hbs", "tag.hbs"] {
        let body = fs::read_to_string(outcome.theme_path.join(rel)).unwrap();
        assert!(!body.contains("href=\"/"), "{rel} has an absolute reference");
        assert!(!body.contains("src=\"/"), "{rel} has an absolute reference");
    }
    let layout = fs::read_to_string(outcome.theme_path.join("default.hbs")).unwrap();
    assert!(layout.contains(r#"{{asset "css/screen.css"}}"#));
}

#[test]
fn invariant_wordpress_header_complete_and_no_eval() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());
    let outcome = pipeline
        .build_theme(json!({
            "platform": "wordpress",
            "projectName": "My WP Theme",
        }))
        .unwrap();

    let css = fs::read_to_string(outcome.theme_path.join("style.css")).unwrap();
    for field in ["Theme Name:", "Description:", "Author:", "Version:"] {
        assert!(css.contains(field), "style.css missing {field}");
    }

    for entry in fs::read_dir(&outcome.theme_path).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|e| e == "php") {
            let body = fs::read_to_string(&path).unwrap();
            assert!(!body.contains("eval("), "{} contains eval", path.display());
        }
    }

    assert!(!outcome.failed, "structural validation should pass");
    assert!(!outcome.validator_summary.is_empty());
}

#[test]
fn invariant_home_layout_variant_reaches_wordpress_index() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());
    let outcome = pipeline
        .build_theme(json!({
            "platform": "wordpress",
            "projectName": "Grid Home",
            "layout": {"home": "grid"},
        }))
        .unwrap();

    let body = fs::read_to_string(outcome.theme_path.join("index.php")).unwrap();
    assert!(body.contains("post-list post-list--grid"));
    assert!(!body.contains("post-list--list"));
}

#[cfg(unix)]
#[test]
fn invariant_failed_publish_discards_staging() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());

    // A dangling symlink at the slug path defeats the directory rename
    // without tripping the exists() pre-check.
    std::os::unix::fs::symlink(
        root.path().join("no-such-target"),
        root.path().join("clean-grid-blog"),
    )
    .unwrap();

    let err = pipeline.build_theme(ghost_spec()).unwrap_err();
    assert!(matches!(err, BuildError::Generation(_)));

    let staging = root.path().join(".staging");
    let leftovers: Vec<_> = fs::read_dir(&staging).unwrap().collect();
    assert!(leftovers.is_empty(), "staging left residue: {leftovers:?}");
}

#[test]
fn invariant_rebuild_is_byte_identical() {
    let spec = ghost_spec();

    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let a = offline_pipeline(first.path())
        .build_theme(spec.clone())
        .unwrap();
    let b = offline_pipeline(second.path()).build_theme(spec).unwrap();

    // The published trees carry no timestamps, so the content hashes of
    // two builds from an unchanged spec must match exactly.
    assert_eq!(
        hash_tree(&a.theme_path).unwrap(),
        hash_tree(&b.theme_path).unwrap()
    );
}

#[test]
fn invariant_missing_project_name_touches_nothing() {
    let root = tempdir().unwrap();
    let output_root = root.path().join("out");
    let pipeline = offline_pipeline(&output_root);

    let err = pipeline
        .build_theme(json!({"platform": "ghost"}))
        .unwrap_err();
    assert!(matches!(err, BuildError::Spec(_)));
    assert!(err.to_string().contains("projectName"));
    assert!(!output_root.exists(), "rejected spec must create nothing");
}

#[test]
fn invariant_unsupported_platform_rejected_before_io() {
    let root = tempdir().unwrap();
    let output_root = root.path().join("out");
    let pipeline = offline_pipeline(&output_root);

    let err = pipeline
        .build_theme(json!({"platform": "drupal", "projectName": "X"}))
        .unwrap_err();
    assert!(matches!(err, BuildError::UnsupportedPlatform(_)));
    assert!(!output_root.exists());
}

#[test]
fn invariant_fallback_validation_summary_nonempty() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());
    let outcome = pipeline.build_theme(ghost_spec()).unwrap();

    assert!(!outcome.failed);
    assert!(outcome
        .validator_summary
        .contains("Basic validation passed — all required files present"));
}

#[test]
fn invariant_theme_json_info_line_gated_on_flag() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());

    let with_flag = pipeline
        .build_theme(json!({
            "platform": "wordpress",
            "projectName": "Block Theme",
            "features": ["block-editor"],
        }))
        .unwrap();
    let report = fs::read_to_string(&with_flag.report_path).unwrap();
    assert!(report.contains("INFO: theme.json found"));

    let without_flag = pipeline
        .build_theme(json!({
            "platform": "wordpress",
            "projectName": "Classic Theme",
        }))
        .unwrap();
    let report = fs::read_to_string(&without_flag.report_path).unwrap();
    assert!(!report.contains("INFO: theme.json found"));
}

#[test]
fn invariant_republish_same_slug_replaces_atomically() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());

    let first = pipeline.build_theme(ghost_spec()).unwrap();
    let marker = first.theme_path.join("stale-file.txt");
    fs::write(&marker, "left over from a previous build").unwrap();

    let second = pipeline.build_theme(ghost_spec()).unwrap();
    assert_eq!(first.theme_path, second.theme_path);
    // The published tree is a complete replacement, not a merge.
    assert!(!marker.exists());
    assert!(second.theme_path.join("package.json").is_file());

    // No graves or staging trees survive the swap.
    let staging = root.path().join(".staging");
    let leftovers: Vec<_> = fs::read_dir(&staging).unwrap().collect();
    assert!(leftovers.is_empty(), "staging left residue: {leftovers:?}");
}

#[test]
fn invariant_unknown_feature_flags_ignored() {
    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());
    let outcome = pipeline
        .build_theme(json!({
            "platform": "ghost",
            "projectName": "Demo",
            "features": ["dark-mode", "quantum-entanglement"],
        }))
        .unwrap();
    assert!(!outcome.failed);
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_packaging_never_runs_without_validation() {
    use themeforge_core::pipeline::{get_validation_call_count, reset_validation_call_count};

    let root = tempdir().unwrap();
    let pipeline = offline_pipeline(root.path());

    reset_validation_call_count();
    pipeline.build_theme(ghost_spec()).unwrap();
    assert_eq!(get_validation_call_count(), 1);
}
