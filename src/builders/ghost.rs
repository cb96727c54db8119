//! Ghost Theme Renderer
//!
//! Emits the minimal Handlebars theme contract: a package manifest, a base
//! layout, the primary/post/tag templates, and a stylesheet carrying the
//! spec's tokens as CSS custom properties. Asset references go through
//! `{{asset}}` so every path stays relative to the theme root.

use std::path::Path;

use serde_json::json;

use super::{css_custom_properties, fill, write_file};
use crate::platform::{GenerationError, Platform, ThemeBuilder};
use crate::spec::{LayoutRole, LayoutVariant, ThemeSpec};

pub struct GhostBuilder;

pub const REQUIRED_FILES: &[&str] = &[
    "package.json",
    "default.hbs",
    "index.hbs",
    "post.hbs",
    "tag.hbs",
    "assets/css/screen.css",
];

impl ThemeBuilder for GhostBuilder {
    fn platform(&self) -> Platform {
        Platform::Ghost
    }

    fn required_files(&self) -> &'static [&'static str] {
        REQUIRED_FILES
    }

    fn generate(&self, spec: &ThemeSpec, staging: &Path) -> Result<(), GenerationError> {
        write_file(staging, "package.json", &package_manifest(spec)?)?;
        write_file(staging, "default.hbs", &default_layout(spec))?;
        write_file(staging, "index.hbs", &feed_template(spec, LayoutRole::Home))?;
        write_file(staging, "post.hbs", &post_template(spec))?;
        write_file(staging, "tag.hbs", &tag_template(spec))?;
        write_file(staging, "assets/css/screen.css", &stylesheet(spec))?;
        Ok(())
    }
}

fn package_manifest(spec: &ThemeSpec) -> Result<String, GenerationError> {
    let manifest = json!({
        "name": spec.slug(),
        "description": spec.description,
        "version": spec.version.to_string(),
        "author": { "name": spec.author },
        "engines": { "ghost": ">=5.0.0" },
        "config": { "posts_per_page": 10 },
        "keywords": ["ghost-theme"],
    });
    serde_json::to_string_pretty(&manifest)
        .map(|s| s + "\n")
        .map_err(|e| GenerationError::Render(format!("package.json: {e}")))
}

const DEFAULT_HBS: &str = r#"<!DOCTYPE html>
<html lang="{{@site.locale}}">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{meta_title}}</title>
    <link rel="stylesheet" href="{{asset "css/screen.css"}}" />
    {{ghost_head}}
</head>
<body class="{{body_class}}">
    <header class="site-header">
        <a class="site-title" href="{{@site.url}}">{{@site.title}}</a>
        <nav class="site-nav">
            <ul>
__NAV_ITEMS__            </ul>
        </nav>
__SEARCH__    </header>

    <main class="site-main">
        {{{body}}}
    </main>

    <footer class="site-footer">
        <p>&copy; {{date format="YYYY"}} {{@site.title}}</p>
    </footer>

    {{ghost_foot}}
</body>
</html>
"#;

const SEARCH_TOGGLE: &str =
    "        <button class=\"search-toggle\" data-ghost-search aria-label=\"Search\">Search</button>\n";

fn default_layout(spec: &ThemeSpec) -> String {
    let nav: String = spec
        .navigation
        .iter()
        .map(|item| {
            format!(
                "                <li class=\"nav-item\"><a href=\"{}\">{}</a></li>\n",
                item.url, item.label
            )
        })
        .collect();
    let search = if spec.has_feature("search") {
        SEARCH_TOGGLE
    } else {
        ""
    };
    fill(DEFAULT_HBS, &[("NAV_ITEMS", &nav), ("SEARCH", search)])
}

const FEED_HBS: &str = r#"{{!< default}}

<div class="post-feed post-feed--__VARIANT__">
    {{#foreach posts}}
    <article class="post-card">
__CARD_BODY__    </article>
    {{/foreach}}
</div>

{{pagination}}
"#;

const CARD_FULL: &str = r#"        {{#if feature_image}}
        <img class="post-card-image" src="{{img_url feature_image size="m"}}" alt="{{title}}" />
        {{/if}}
        <h2 class="post-card-title"><a href="{{url}}">{{title}}</a></h2>
        <p class="post-card-excerpt">{{excerpt words="30"}}</p>
        <time class="post-card-date" datetime="{{date format="YYYY-MM-DD"}}">{{date}}</time>
"#;

const CARD_MINIMAL: &str = r#"        <h2 class="post-card-title"><a href="{{url}}">{{title}}</a></h2>
        <time class="post-card-date" datetime="{{date format="YYYY-MM-DD"}}">{{date}}</time>
"#;

fn feed_body(variant: LayoutVariant) -> &'static str {
    match variant {
        LayoutVariant::Minimal => CARD_MINIMAL,
        LayoutVariant::Grid | LayoutVariant::List => CARD_FULL,
    }
}

fn feed_template(spec: &ThemeSpec, role: LayoutRole) -> String {
    let variant = spec.variant(role);
    fill(
        FEED_HBS,
        &[
            ("VARIANT", variant.as_str()),
            ("CARD_BODY", feed_body(variant)),
        ],
    )
}

const POST_HBS: &str = r#"{{!< default}}

{{#post}}
<article class="post-full post-full--__VARIANT__">
    <header class="post-full-header">
        <h1 class="post-full-title">{{title}}</h1>
        <time class="post-full-date" datetime="{{date format="YYYY-MM-DD"}}">{{date}}</time>
    </header>

    {{#if feature_image}}
    <figure class="post-full-image">
        <img src="{{img_url feature_image size="l"}}" alt="{{title}}" />
    </figure>
    {{/if}}

    <section class="post-full-content">
        {{content}}
    </section>
</article>
{{/post}}
"#;

fn post_template(spec: &ThemeSpec) -> String {
    fill(
        POST_HBS,
        &[("VARIANT", spec.variant(LayoutRole::Single).as_str())],
    )
}

const TAG_HBS: &str = r#"{{!< default}}

{{#tag}}
<header class="tag-header">
    <h1 class="tag-title">{{name}}</h1>
    {{#if description}}<p class="tag-description">{{description}}</p>{{/if}}
</header>
{{/tag}}

<div class="post-feed post-feed--__VARIANT__">
    {{#foreach posts}}
    <article class="post-card">
        <h2 class="post-card-title"><a href="{{url}}">{{title}}</a></h2>
        <time class="post-card-date" datetime="{{date format="YYYY-MM-DD"}}">{{date}}</time>
    </article>
    {{/foreach}}
</div>

{{pagination}}
"#;

fn tag_template(spec: &ThemeSpec) -> String {
    fill(
        TAG_HBS,
        &[("VARIANT", spec.variant(LayoutRole::Archive).as_str())],
    )
}

const SCREEN_CSS: &str = r#"/* __PROJECT__ - generated stylesheet */

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

.site-header,
.site-footer,
.site-main {
    max-width: 1040px;
    margin: 0 auto;
    padding: 0 4vmin;
}

.post-feed--grid {
    display: grid;
    grid-template-columns: repeat(auto-fill, minmax(280px, 1fr));
    gap: 2rem;
}

.post-feed--list .post-card {
    border-bottom: 1px solid var(--color-accent);
    padding: 1.5rem 0;
}

.post-feed--minimal .post-card {
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
    let dark = if spec.has_feature("dark-mode") {
        DARK_MODE_CSS
    } else {
        ""
    };
    fill(
        SCREEN_CSS,
        &[
            ("PROJECT", &spec.project_name),
            ("TOKENS", &css_custom_properties(spec)),
            ("DARK_MODE", dark),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(extra: serde_json::Value) -> ThemeSpec {
        let mut base = json!({
            "platform": "ghost",
            "projectName": "Clean Grid Blog",
        });
        if let (Some(b), Some(e)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in e {
                b.insert(k.clone(), v.clone());
            }
        }
        ThemeSpec::from_value(base).unwrap()
    }

    #[test]
    fn test_manifest_carries_slug_and_version() {
        let manifest = package_manifest(&spec(json!({}))).unwrap();
        let v: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(v["name"], "clean-grid-blog");
        assert_eq!(v["version"], "1.0.0");
        assert_eq!(v["engines"]["ghost"], ">=5.0.0");
    }

    #[test]
    fn test_asset_references_are_relative() {
        let layout = default_layout(&spec(json!({})));
        assert!(layout.contains(r#"{{asset "css/screen.css"}}"#));
        assert!(!layout.contains("href=\"/assets"));
    }

    #[test]
    fn test_grid_variant_selected() {
        let t = feed_template(&spec(json!({"layout": {"home": "grid"}})), LayoutRole::Home);
        assert!(t.contains("post-feed--grid"));
        assert!(t.contains("post-card-excerpt"));
    }

    #[test]
    fn test_minimal_variant_drops_excerpt() {
        let t = feed_template(
            &spec(json!({"layout": {"home": "minimal"}})),
            LayoutRole::Home,
        );
        assert!(t.contains("post-feed--minimal"));
        assert!(!t.contains("post-card-excerpt"));
    }

    #[test]
    fn test_post_variant_threads_into_template() {
        let t = post_template(&spec(json!({"layout": {"post": "minimal"}})));
        assert!(t.contains("post-full post-full--minimal"));
        let default = post_template(&spec(json!({})));
        assert!(default.contains("post-full post-full--list"));
    }

    #[test]
    fn test_dark_mode_feature_gates_css_block() {
        assert!(stylesheet(&spec(json!({"features": ["dark-mode"]})))
            .contains("prefers-color-scheme"));
        assert!(!stylesheet(&spec(json!({}))).contains("prefers-color-scheme"));
    }

    #[test]
    fn test_tokens_injected_as_custom_properties() {
        let css = stylesheet(&spec(json!({"colors": {"primary": "#123456"}})));
        assert!(css.contains("--color-primary: #123456;"));
        assert!(css.contains("--font-body:"));
    }
}
