//! The fixed registry of cached collections.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// One of the five named collections served through the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Settings,
    Experiences,
    Certifications,
    Projects,
    Posts,
}

impl Resource {
    pub const COUNT: usize = 5;

    /// Every registered resource, in preload order.
    pub const ALL: [Resource; Resource::COUNT] = [
        Resource::Settings,
        Resource::Experiences,
        Resource::Certifications,
        Resource::Projects,
        Resource::Posts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Settings => "settings",
            Resource::Experiences => "experiences",
            Resource::Certifications => "certifications",
            Resource::Projects => "projects",
            Resource::Posts => "posts",
        }
    }

    /// Slot of this resource inside fixed-size per-resource tables.
    pub fn index(self) -> usize {
        match self {
            Resource::Settings => 0,
            Resource::Experiences => 1,
            Resource::Certifications => 2,
            Resource::Projects => 3,
            Resource::Posts => 4,
        }
    }

    /// `settings` materializes as a key/value mapping; everything else is a record list.
    pub fn is_mapping(self) -> bool {
        matches!(self, Resource::Settings)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource `{0}` (expected one of settings, experiences, certifications, projects, posts)")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|resource| resource.as_str() == value)
            .ok_or_else(|| UnknownResource(value.to_string()))
    }
}
