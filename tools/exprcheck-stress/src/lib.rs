//! Grammar-driven random C++ expression generation for differential
//! fuzzing of an expression evaluator.
//!
//! The generator draws every decision from a [`GeneratorRng`], so a seed or
//! a recorded choice sequence reproduces an expression exactly.

pub mod check;
pub mod config;
pub mod errors;
pub mod generator;
pub mod profile;
pub mod rng;
pub mod weights;

pub use config::GenConfig;
pub use errors::{ConfigError, GenError, ProfileError};
pub use generator::ExprGenerator;
pub use profile::{Profile, available_profiles, get_profile};
pub use rng::{Choice, DefaultGeneratorRng, GeneratorRng, RecordingRng, ScriptedRng};
pub use weights::{ExprKind, Kind, KindTable, TypeKind, WeightInfo, Weights};
