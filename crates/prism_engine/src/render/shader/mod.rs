//! Shader-variant system
//!
//! Materials select a program by fingerprint. The pipeline is:
//!
//! 1. [`ProgramParameters::gather`] collects everything that changes the
//!    generated source (material shape, object features, lights, clipping,
//!    renderer settings) and [`ProgramParameters::cache_key`] fingerprints it
//! 2. [`ProgramCache::acquire`] returns the cached program for the key or
//!    builds one: prefix with `#version`, precision and defines, resolve
//!    `#include <chunk>` against the [`ShaderLibrary`], compile and link
//! 3. Compile and link failures become [`ProgramDiagnostics`] on the
//!    program rather than errors; the renderer decides what to do with them

pub mod chunks;
pub mod library;
pub mod parameters;
pub mod preprocess;
pub mod program;
pub mod program_cache;

pub use library::ShaderLibrary;
pub use parameters::{FogMode, ObjectTraits, ProgramParameters, ProgramSettings};
pub use preprocess::resolve_includes;
pub use program::{Program, ProgramDiagnostics, StageDiagnostics};
pub use program_cache::ProgramCache;

use thiserror::Error;

use crate::render::backend::ShaderStage;

/// Shader build failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// `#include <name>` named a chunk the library does not have
    #[error("Unresolved shader chunk <{0}>")]
    UnresolvedChunk(String),

    /// A chunk includes itself, directly or indirectly
    #[error("Shader chunk include cycle through <{0}>")]
    IncludeCycle(String),

    /// A stage failed to compile
    #[error("{stage} shader compile failed: {log}")]
    Compile {
        /// Failing stage
        stage: ShaderStage,
        /// Driver log
        log: String,
    },

    /// Stages compiled but did not link
    #[error("Program link failed: {log}")]
    Link {
        /// Driver log
        log: String,
    },
}

/// Result type for shader operations
pub type ShaderResult<T> = Result<T, ShaderError>;
