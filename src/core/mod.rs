//! Core types for KPM.
//!
//! This module holds the error vocabulary shared by every other part of the
//! crate. Engine functions return [`anyhow::Result`] whose root cause is a
//! [`KpmError`]; the command boundary turns any error into an [`ErrorContext`]
//! with [`user_friendly_error`] before printing it.
//!
//! # Error kinds
//!
//! | Kind | Variant(s) |
//! |------|------------|
//! | Validation | [`KpmError::Validation`] |
//! | Not found | [`KpmError::PackageNotFound`], [`KpmError::VersionNotFound`], [`KpmError::PackageMissing`] |
//! | Layout | [`KpmError::BadLayout`] |
//! | Manifest | [`KpmError::BadManifest`] |
//! | Dependency | [`KpmError::BadDependency`] |
//! | Template | [`KpmError::TemplateError`] |
//! | Cycle | [`KpmError::CycleDetected`] |
//! | Repository | [`KpmError::RepoError`], [`KpmError::UnknownRepository`] |
//! | Abort | [`KpmError::UserAbort`] |

pub mod error;

pub use error::{ErrorContext, IntoAnyhowWithContext, KpmError, user_friendly_error};
