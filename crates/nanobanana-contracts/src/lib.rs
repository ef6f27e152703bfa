//! Backend-agnostic types shared by the engine and the CLI.

pub mod config;
pub mod error;
pub mod mime;
pub mod output;
pub mod providers;
pub mod request;

pub use error::{GenerateError, Result};
pub use providers::{ProviderChoice, ProviderCredentials, ProviderKind};
pub use request::{AspectRatio, GenerationRequest, GenerationResult, ImageSize, ReferenceImage};
