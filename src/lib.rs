//! ThemeForge Core - Declarative Theme Compiler
//!
//! # The Five Laws (Non-Negotiable)
//! 1. The Spec Is Truth
//! 2. Platform Contracts Are Enforced
//! 3. Findings Annotate, Never Block Delivery
//! 4. Staging Before Publish
//! 5. Deterministic Output

pub mod builders;
pub mod hashing;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod spec;
pub mod validate;

pub use package::{BuildReport, PackagingError};
pub use pipeline::{BuildError, BuildOutcome, BuildStage, ThemePipeline};
pub use platform::{
    GenerationError, Platform, PlatformRegistry, ThemeBuilder, UnsupportedPlatformError,
};
pub use spec::{slugify, SpecValidationError, ThemeSpec};
pub use validate::{Finding, Severity, ThemeCheck, ThemeValidator};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
