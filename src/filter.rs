// Copyright 2024 - 2026 The Gauntlet Authors

//! Filters that include or exclude files and mutants.

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::trace;

use crate::mutant::Mutant;

/// Include/exclude filtering of source paths by glob.
///
/// An empty examine list means every path is a candidate; exclusion wins
/// over inclusion.
#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    examine: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(examine: &[S], exclude: &[S]) -> Result<PathFilter> {
        Ok(PathFilter {
            examine: build_glob_set(examine)?,
            exclude: build_glob_set(exclude)?,
        })
    }

    pub fn allows(&self, path: &Utf8Path) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                trace!(%path, "excluded by glob");
                return false;
            }
        }
        match &self.examine {
            Some(examine) => examine.is_match(path),
            None => true,
        }
    }
}

/// Build a `GlobSet` from a list of patterns; `None` when the list is
/// empty.
///
/// Patterns containing a path separator match against the whole relative
/// path; bare patterns match anywhere, like gitignore.
pub fn build_glob_set<S: AsRef<str>>(patterns: &[S]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if pattern.contains('/') || pattern.contains("**") {
            builder.add(Glob::new(pattern).with_context(|| format!("invalid glob {pattern:?}"))?);
        } else {
            builder.add(
                Glob::new(&format!("**/{pattern}"))
                    .map_err(|err| anyhow!("invalid glob {pattern:?}: {err}"))?,
            );
        }
    }
    Ok(Some(builder.build()?))
}

/// Regex filter over mutant names, used for line-pattern denylists.
///
/// Patterns match against the full mutant name including file, line, and
/// description, like `src/calc.gx:12:5: replace + with - in add`.
#[derive(Clone, Debug, Default)]
pub struct NameFilter {
    patterns: Vec<Regex>,
}

impl NameFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<NameFilter> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).with_context(|| format!("invalid regex {:?}", p.as_ref()))
            })
            .collect::<Result<Vec<Regex>>>()?;
        Ok(NameFilter { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, mutant: &Mutant) -> bool {
        let name = mutant.name(true);
        self.patterns.iter().any(|p| p.is_match(&name))
    }
}
