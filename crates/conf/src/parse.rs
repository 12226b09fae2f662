// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration parsing (TOML and HCL)

use crate::def::ConfFile;
use thiserror::Error;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Hcl,
}

impl Format {
    /// Pick a format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "toml" | "conf" => Some(Format::Toml),
            "hcl" => Some(Format::Hcl),
            _ => None,
        }
    }
}

/// Errors that can occur during configuration parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HCL parse error: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("invalid job {name:?}: {message}")]
    InvalidJob { name: String, message: String },
}

/// Parse a configuration file in the given format.
///
/// Block labels are injected into each definition's `name` field, and
/// structural constraints that serde cannot express are checked here.
pub fn parse_conf(content: &str, format: Format) -> Result<ConfFile, ParseError> {
    // 1. Serde does the heavy lifting
    let mut conf: ConfFile = match format {
        Format::Toml => toml::from_str(content)?,
        Format::Hcl => hcl::from_str(content)?,
    };

    // 2. Name fixup — inject map keys into .name fields
    for (name, job) in &mut conf.jobs {
        job.name = name.clone();
    }

    // 3. Structural validation
    for (name, job) in &conf.jobs {
        if job.exec.is_some() && job.script.is_some() {
            return Err(ParseError::InvalidJob {
                name: name.clone(),
                message: "exec and script are mutually exclusive".into(),
            });
        }
        if job.expect.is_some() && job.exec.is_none() && job.script.is_none() {
            return Err(ParseError::InvalidJob {
                name: name.clone(),
                message: "expect requires a main process".into(),
            });
        }
        if name.is_empty() {
            return Err(ParseError::InvalidJob {
                name: name.clone(),
                message: "job name must not be empty".into(),
            });
        }
    }

    Ok(conf)
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
