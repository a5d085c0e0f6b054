//! Generation profiles.
//!
//! A profile is a TOML file selecting a target architecture and a generator
//! configuration. The named profiles are embedded in the binary; fields a
//! file leaves out take the `Default` values.

use std::path::Path;

use exprcheck_sema::Arch;
use serde::{Deserialize, Serialize};

use crate::config::GenConfig;
use crate::errors::ProfileError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Architecture the type model evaluates for.
    pub target: Arch,
    pub generator: GenConfig,
}

static PROFILES: &[(&str, &str)] = &[
    ("default", include_str!("../profiles/default.toml")),
    ("arithmetic", include_str!("../profiles/arithmetic.toml")),
    ("deep", include_str!("../profiles/deep.toml")),
    ("pointers", include_str!("../profiles/pointers.toml")),
];

pub fn available_profiles() -> Vec<&'static str> {
    PROFILES.iter().map(|(name, _)| *name).collect()
}

fn parse_profile(origin: &str, text: &str) -> Result<Profile, ProfileError> {
    toml::from_str(text).map_err(|source| ProfileError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Looks up an embedded profile by name, or loads one from disk when
/// `name_or_path` contains `/` or ends in `.toml`.
pub fn get_profile(name_or_path: &str) -> Result<Profile, ProfileError> {
    if name_or_path.contains('/') || name_or_path.ends_with(".toml") {
        let path = Path::new(name_or_path);
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        return parse_profile(name_or_path, &text);
    }
    PROFILES
        .iter()
        .find(|(name, _)| *name == name_or_path)
        .map(|(name, text)| parse_profile(name, text))
        .unwrap_or_else(|| {
            Err(ProfileError::Unknown {
                name: name_or_path.to_string(),
                available: available_profiles(),
            })
        })
}
