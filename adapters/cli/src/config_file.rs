use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use gemfall_core::{Palette, RefillRule, Rgb};
use serde::Deserialize;

const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Refill strategy names accepted on the command line and in config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum RefillRuleArg {
    /// Only forbid colors that would complete a run.
    CompleteRuns,
    /// Forbid the color of every filled neighbor.
    AnyNeighbor,
}

impl From<RefillRuleArg> for RefillRule {
    fn from(value: RefillRuleArg) -> Self {
        match value {
            RefillRuleArg::CompleteRuns => RefillRule::CompleteRunsOnly,
            RefillRuleArg::AnyNeighbor => RefillRule::AnyNeighbor,
        }
    }
}

/// Grid settings loaded from a TOML file; every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    version: Option<u32>,
    pub(crate) columns: Option<u32>,
    pub(crate) rows: Option<u32>,
    pub(crate) seed: Option<u64>,
    pub(crate) strict_swaps: Option<bool>,
    pub(crate) refill_rule: Option<RefillRuleArg>,
    palette: Option<Vec<String>>,
}

impl ConfigFile {
    /// Reads and parses the configuration file at the provided path.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid config file at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse config toml contents")?;
        if let Some(version) = config.version {
            if version != SUPPORTED_CONFIG_VERSION {
                bail!(
                    "unsupported config version {version}; expected {SUPPORTED_CONFIG_VERSION}"
                );
            }
        }
        Ok(config)
    }

    /// Palette described by the file, if any.
    pub(crate) fn palette(&self) -> Result<Option<Palette>> {
        let Some(entries) = &self.palette else {
            return Ok(None);
        };

        let colors = entries
            .iter()
            .map(|entry| {
                parse_hex_color(entry).with_context(|| format!("invalid palette entry `{entry}`"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Palette::new(colors)))
    }
}

/// Parses `#rrggbb` or `rrggbb` into a color.
pub(crate) fn parse_hex_color(value: &str) -> Result<Rgb> {
    let digits = value.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        bail!("expected six hexadecimal digits");
    }

    let channel = |range: std::ops::Range<usize>| -> Result<u8> {
        u8::from_str_radix(&digits[range], 16).context("expected hexadecimal digits")
    };
    Ok(Rgb::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
