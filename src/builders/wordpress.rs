//! WordPress Theme Renderer
//!
//! Emits the classic theme contract: a stylesheet with the mandatory
//! header block, the template hierarchy files, and the functions file.
//! Security rules are baked into the templates themselves: every PHP
//! entry file opens with the ABSPATH guard, no generated body contains
//! dynamic evaluation, and the generator/version leak is removed from
//! `wp_head`. User-facing literals go through the i18n convention with
//! the theme slug as text domain.

use std::path::Path;

use serde_json::json;

use super::{css_custom_properties, fill, write_file};
use crate::platform::{GenerationError, Platform, ThemeBuilder};
use crate::spec::{LayoutRole, ThemeSpec};

pub struct WordpressBuilder;

pub const REQUIRED_FILES: &[&str] = &[
    "style.css",
    "index.php",
    "functions.php",
    "header.php",
    "footer.php",
    "single.php",
    "page.php",
    "archive.php",
    "search.php",
    "404.php",
];

impl ThemeBuilder for WordpressBuilder {
    fn platform(&self) -> Platform {
        Platform::Wordpress
    }

    fn required_files(&self) -> &'static [&'static str] {
        REQUIRED_FILES
    }

    fn generate(&self, spec: &ThemeSpec, staging: &Path) -> Result<(), GenerationError> {
        let slug = spec.slug();
        // PHP identifiers cannot start with a digit; slugs can.
        let mut fn_prefix = slug.replace('-', "_");
        if fn_prefix.starts_with(|c: char| c.is_ascii_digit()) {
            fn_prefix.insert_str(0, "theme_");
        }
        let vars: Vec<(&str, &str)> = vec![
            ("SLUG", slug.as_str()),
            ("FN", fn_prefix.as_str()),
            ("PROJECT", spec.project_name.as_str()),
        ];

        write_file(staging, "style.css", &stylesheet(spec))?;
        write_file(staging, "index.php", &index_php(spec, &vars))?;
        write_file(staging, "functions.php", &functions_php(spec, &vars))?;
        write_file(staging, "header.php", &header_php(spec, &vars))?;
        write_file(staging, "footer.php", &fill(FOOTER_PHP, &vars))?;
        write_file(staging, "single.php", &single_php(spec, &vars))?;
        write_file(staging, "page.php", &fill(PAGE_PHP, &vars))?;
        write_file(staging, "archive.php", &archive_php(spec, &vars))?;
        write_file(staging, "search.php", &fill(SEARCH_PHP, &vars))?;
        write_file(staging, "404.php", &fill(NOT_FOUND_PHP, &vars))?;

        if spec.has_feature("block-editor") {
            write_file(staging, "theme.json", &theme_json(spec)?)?;
        }
        Ok(())
    }
}

/// The four header fields the validator checks for: Theme Name,
/// Description, Author, Version.
const STYLE_HEADER: &str = r#"/*
Theme Name: __PROJECT__
Description: __DESCRIPTION__
Author: __AUTHOR__
Version: __VERSION__
Text Domain: __SLUG__
License: GNU General Public License v2 or later
*/
"#;

const STYLE_BODY: &str = r#"
:root {
__TOKENS__}

body {
    margin: 0;
    background: var(--color-background);
    color: var(--color-text);
    font-family: var(--font-body);
}

h1, h2, h3, h4 {
    font-family: var(--font-heading);
    color: var(--color-primary);
}

a {
    color: var(--color-accent);
}

.site-content {
    max-width: 1040px;
    margin: 0 auto;
    padding: 0 1.5rem;
}

.post-list--grid {
    display: grid;
    grid-template-columns: repeat(auto-fill, minmax(280px, 1fr));
    gap: 2rem;
}

.post-list--list article {
    border-bottom: 1px solid var(--color-accent);
    padding: 1.5rem 0;
}

.post-list--minimal article {
    padding: 0.5rem 0;
}
__DARK_MODE__"#;

const DARK_MODE_CSS: &str = r#"
@media (prefers-color-scheme: dark) {
    :root {
        --color-background: #15171a;
        --color-text: #f4f4f4;
        --color-primary: #f4f4f4;
    }
}
"#;

fn stylesheet(spec: &ThemeSpec) -> String {
    let version = spec.version.to_string();
    let slug = spec.slug();
    let header = fill(
        STYLE_HEADER,
        &[
            ("PROJECT", spec.project_name.as_str()),
            ("DESCRIPTION", spec.description.as_str()),
            ("AUTHOR", spec.author.as_str()),
            ("VERSION", &version),
            ("SLUG", &slug),
        ],
    );
    let dark = if spec.has_feature("dark-mode") {
        DARK_MODE_CSS
    } else {
        ""
    };
    header
        + &fill(
            STYLE_BODY,
            &[
                ("TOKENS", css_custom_properties(spec).as_str()),
                ("DARK_MODE", dark),
            ],
        )
}

// Every PHP template below opens with the ABSPATH sentinel so a direct
// request to the file exits before any side-effecting code runs.
const INDEX_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}

get_header();
?>

<div class="site-content">
<?php if ( have_posts() ) : ?>
    <div class="post-list post-list--__VARIANT__">
    <?php while ( have_posts() ) : the_post(); ?>
        <article id="post-<?php the_ID(); ?>" <?php post_class(); ?>>
            <h2><a href="<?php the_permalink(); ?>"><?php the_title(); ?></a></h2>
            <?php the_excerpt(); ?>
        </article>
    <?php endwhile; ?>
    </div>
    <?php the_posts_pagination(); ?>
<?php else : ?>
    <p><?php esc_html_e( 'Nothing found', '__SLUG__' ); ?></p>
<?php endif; ?>
</div>

<?php get_footer(); ?>
"#;

fn index_php(spec: &ThemeSpec, vars: &[(&str, &str)]) -> String {
    let mut all = vars.to_vec();
    all.push(("VARIANT", spec.variant(LayoutRole::Home).as_str()));
    fill(INDEX_PHP, &all)
}

const FUNCTIONS_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}

function __FN___setup() {
    add_theme_support( 'title-tag' );
    add_theme_support( 'post-thumbnails' );
    add_theme_support( 'html5', array( 'search-form', 'gallery', 'caption' ) );
    register_nav_menus(
        array(
            'primary' => esc_html__( 'Primary Menu', '__SLUG__' ),
        )
    );
}
add_action( 'after_setup_theme', '__FN___setup' );

function __FN___scripts() {
    wp_enqueue_style( '__SLUG__-style', get_stylesheet_uri(), array(), wp_get_theme()->get( 'Version' ) );
}
add_action( 'wp_enqueue_scripts', '__FN___scripts' );

// Do not advertise the platform version.
remove_action( 'wp_head', 'wp_generator' );
__NAV_FALLBACK____CUSTOMIZER__"#;

const CUSTOMIZER_PHP: &str = r#"
function __FN___customize_register( $wp_customize ) {
    $wp_customize->add_section(
        '__FN___colors',
        array(
            'title' => esc_html__( 'Theme Colors', '__SLUG__' ),
        )
    );
}
add_action( 'customize_register', '__FN___customize_register' );
"#;

fn functions_php(spec: &ThemeSpec, vars: &[(&str, &str)]) -> String {
    let customizer = if spec.has_feature("customizer") {
        fill(CUSTOMIZER_PHP, vars)
    } else {
        String::new()
    };
    let fallback = nav_fallback(spec, vars);
    let mut all = vars.to_vec();
    all.push(("NAV_FALLBACK", fallback.as_str()));
    all.push(("CUSTOMIZER", customizer.as_str()));
    fill(FUNCTIONS_PHP, &all)
}

const HEADER_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}
?><!DOCTYPE html>
<html <?php language_attributes(); ?>>
<head>
    <meta charset="<?php bloginfo( 'charset' ); ?>" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <?php wp_head(); ?>
</head>
<body <?php body_class(); ?>>
<?php wp_body_open(); ?>
<header class="site-header">
    <a class="site-title" href="<?php echo esc_url( home_url( '/' ) ); ?>"><?php bloginfo( 'name' ); ?></a>
    <nav class="site-nav">
        <?php
        wp_nav_menu(
            array(
                'theme_location' => 'primary',
                'fallback_cb'    => '__FN___nav_fallback',
            )
        );
        ?>
    </nav>
__SEARCH__</header>
"#;

const SEARCH_FORM: &str = "    <?php get_search_form(); ?>\n";

const NAV_FALLBACK_PHP: &str = r#"
function __FN___nav_fallback() {
    echo '<ul>';
__NAV_ITEMS__    echo '</ul>';
}
"#;

fn header_php(spec: &ThemeSpec, vars: &[(&str, &str)]) -> String {
    let search = if spec.has_feature("search") {
        SEARCH_FORM
    } else {
        ""
    };
    let mut all = vars.to_vec();
    all.push(("SEARCH", search));
    fill(HEADER_PHP, &all)
}

fn nav_fallback(spec: &ThemeSpec, vars: &[(&str, &str)]) -> String {
    let items: String = spec
        .navigation
        .iter()
        .map(|item| {
            format!(
                "    echo '<li><a href=\"{}\">{}</a></li>';\n",
                item.url.replace('\'', ""),
                item.label.replace('\'', "")
            )
        })
        .collect();
    let mut all = vars.to_vec();
    all.push(("NAV_ITEMS", items.as_str()));
    fill(NAV_FALLBACK_PHP, &all)
}

const FOOTER_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}
?>
<footer class="site-footer">
    <p>&copy; <?php echo esc_html( gmdate( 'Y' ) ); ?> <?php bloginfo( 'name' ); ?></p>
</footer>
<?php wp_footer(); ?>
</body>
</html>
"#;

const SINGLE_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}

get_header();
?>

<div class="site-content">
<?php while ( have_posts() ) : the_post(); ?>
    <article id="post-<?php the_ID(); ?>" <?php post_class( 'entry--__VARIANT__' ); ?>>
        <h1><?php the_title(); ?></h1>
        <time datetime="<?php echo esc_attr( get_the_date( 'c' ) ); ?>"><?php echo esc_html( get_the_date() ); ?></time>
        <?php if ( has_post_thumbnail() ) : the_post_thumbnail( 'large' ); endif; ?>
        <div class="entry-content"><?php the_content(); ?></div>
    </article>
<?php endwhile; ?>
</div>

<?php get_footer(); ?>
"#;

fn single_php(spec: &ThemeSpec, vars: &[(&str, &str)]) -> String {
    let mut all = vars.to_vec();
    all.push(("VARIANT", spec.variant(LayoutRole::Single).as_str()));
    fill(SINGLE_PHP, &all)
}

const PAGE_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}

get_header();
?>

<div class="site-content">
<?php while ( have_posts() ) : the_post(); ?>
    <article id="post-<?php the_ID(); ?>" <?php post_class(); ?>>
        <h1><?php the_title(); ?></h1>
        <div class="entry-content"><?php the_content(); ?></div>
    </article>
<?php endwhile; ?>
</div>

<?php get_footer(); ?>
"#;

const ARCHIVE_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}

get_header();
?>

<div class="site-content">
    <header class="archive-header">
        <h1><?php the_archive_title(); ?></h1>
        <?php the_archive_description( '<p>', '</p>' ); ?>
    </header>
<?php if ( have_posts() ) : ?>
    <div class="post-list post-list--__VARIANT__">
    <?php while ( have_posts() ) : the_post(); ?>
        <article id="post-<?php the_ID(); ?>" <?php post_class(); ?>>
            <h2><a href="<?php the_permalink(); ?>"><?php the_title(); ?></a></h2>
            <?php the_excerpt(); ?>
        </article>
    <?php endwhile; ?>
    </div>
    <?php the_posts_pagination(); ?>
<?php else : ?>
    <p><?php esc_html_e( 'Nothing found', '__SLUG__' ); ?></p>
<?php endif; ?>
</div>

<?php get_footer(); ?>
"#;

fn archive_php(spec: &ThemeSpec, vars: &[(&str, &str)]) -> String {
    let mut all = vars.to_vec();
    all.push(("VARIANT", spec.variant(LayoutRole::Archive).as_str()));
    fill(ARCHIVE_PHP, &all)
}

const SEARCH_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}

get_header();
?>

<div class="site-content">
    <h1><?php esc_html_e( 'Search results', '__SLUG__' ); ?></h1>
<?php if ( have_posts() ) : ?>
    <div class="post-list post-list--list">
    <?php while ( have_posts() ) : the_post(); ?>
        <article id="post-<?php the_ID(); ?>" <?php post_class(); ?>>
            <h2><a href="<?php the_permalink(); ?>"><?php the_title(); ?></a></h2>
            <?php the_excerpt(); ?>
        </article>
    <?php endwhile; ?>
    </div>
    <?php the_posts_pagination(); ?>
<?php else : ?>
    <p><?php esc_html_e( 'Nothing found', '__SLUG__' ); ?></p>
<?php endif; ?>
</div>

<?php get_footer(); ?>
"#;

const NOT_FOUND_PHP: &str = r#"<?php
if ( ! defined( 'ABSPATH' ) ) {
    exit;
}

get_header();
?>

<div class="site-content">
    <h1><?php esc_html_e( 'Page not found', '__SLUG__' ); ?></h1>
    <p><?php esc_html_e( 'The page you were looking for does not exist.', '__SLUG__' ); ?></p>
    <?php get_search_form(); ?>
</div>

<?php get_footer(); ?>
"#;

/// Block-editor configuration, emitted only when the `block-editor`
/// feature flag is set.
fn theme_json(spec: &ThemeSpec) -> Result<String, GenerationError> {
    let palette: Vec<_> = spec
        .colors
        .iter()
        .map(|(name, value)| {
            json!({
                "slug": name,
                "name": name,
                "color": value,
            })
        })
        .collect();
    let doc = json!({
        "$schema": "https://schemas.wp.org/trunk/theme.json",
        "version": 2,
        "settings": {
            "color": { "palette": palette },
            "typography": {
                "fontFamilies": spec.fonts.iter().map(|(name, value)| json!({
                    "slug": name,
                    "name": name,
                    "fontFamily": value,
                })).collect::<Vec<_>>(),
            },
        },
    });
    serde_json::to_string_pretty(&doc)
        .map(|s| s + "\n")
        .map_err(|e| GenerationError::Render(format!("theme.json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn spec(extra: serde_json::Value) -> ThemeSpec {
        let mut base = json!({
            "platform": "wordpress",
            "projectName": "My WP Theme",
        });
        if let (Some(b), Some(e)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in e {
                b.insert(k.clone(), v.clone());
            }
        }
        ThemeSpec::from_value(base).unwrap()
    }

    #[test]
    fn test_style_header_has_mandatory_fields() {
        let css = stylesheet(&spec(json!({})));
        for field in ["Theme Name:", "Description:", "Author:", "Version:"] {
            assert!(css.contains(field), "missing header field {field}");
        }
        assert!(css.contains("Text Domain: my-wp-theme"));
    }

    #[test]
    fn test_every_php_file_carries_access_guard() {
        let dir = tempdir().unwrap();
        WordpressBuilder
            .generate(&spec(json!({})), dir.path())
            .unwrap();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|e| e == "php") {
                let body = std::fs::read_to_string(&path).unwrap();
                assert!(
                    body.contains("defined( 'ABSPATH' )"),
                    "{} lacks the access guard",
                    path.display()
                );
            }
        }
    }

    #[test]
    fn test_no_dynamic_evaluation_in_output() {
        let dir = tempdir().unwrap();
        WordpressBuilder
            .generate(&spec(json!({"features": ["block-editor", "customizer"]})), dir.path())
            .unwrap();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            if path.is_file() {
                let body = std::fs::read_to_string(&path).unwrap();
                assert!(!body.contains("eval("), "{} contains eval", path.display());
            }
        }
    }

    #[test]
    fn test_home_variant_threads_into_index() {
        let dir = tempdir().unwrap();
        WordpressBuilder
            .generate(&spec(json!({"layout": {"home": "grid"}})), dir.path())
            .unwrap();
        let body = std::fs::read_to_string(dir.path().join("index.php")).unwrap();
        assert!(body.contains("post-list post-list--grid"));
        assert!(!body.contains("post-list--list"));
    }

    #[test]
    fn test_single_variant_threads_into_single() {
        let dir = tempdir().unwrap();
        WordpressBuilder
            .generate(&spec(json!({"layout": {"single": "minimal"}})), dir.path())
            .unwrap();
        let body = std::fs::read_to_string(dir.path().join("single.php")).unwrap();
        assert!(body.contains("post_class( 'entry--minimal' )"));
    }

    #[test]
    fn test_digit_leading_slug_gets_valid_php_prefix() {
        let dir = tempdir().unwrap();
        let spec = ThemeSpec::from_value(json!({
            "platform": "wordpress",
            "projectName": "2024 Blog",
        }))
        .unwrap();
        WordpressBuilder.generate(&spec, dir.path()).unwrap();
        let body = std::fs::read_to_string(dir.path().join("functions.php")).unwrap();
        assert!(body.contains("function theme_2024_blog_setup()"));
        assert!(!body.contains("function 2024_blog_setup()"));
        // The text domain stays the raw slug; only identifiers are guarded.
        assert!(body.contains("'2024-blog'"));
    }

    #[test]
    fn test_theme_json_gated_on_block_editor_flag() {
        let with = tempdir().unwrap();
        WordpressBuilder
            .generate(&spec(json!({"features": ["block-editor"]})), with.path())
            .unwrap();
        assert!(with.path().join("theme.json").exists());

        let without = tempdir().unwrap();
        WordpressBuilder
            .generate(&spec(json!({})), without.path())
            .unwrap();
        assert!(!without.path().join("theme.json").exists());
    }

    #[test]
    fn test_generator_leak_removed() {
        let body = functions_php(&spec(json!({})), &[("SLUG", "x"), ("FN", "x")]);
        assert!(body.contains("remove_action( 'wp_head', 'wp_generator' );"));
    }

    #[test]
    fn test_literals_are_translation_wrapped() {
        let out = fill(NOT_FOUND_PHP, &[("SLUG", "my-wp-theme")]);
        assert!(out.contains("esc_html_e( 'Page not found', 'my-wp-theme' )"));
    }
}
