//! Identifier allocation: class names and API method names.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::openapi::{EndpointInfo, HttpMethod};
use crate::utils::to_upper_camel_case;

static VERSION_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[vV](\d+)$").expect("valid version regex"));

const COLLISION_SUFFIX: &str = "Data";

/// Every class and enum name handed out during one run.
///
/// Names are unique across the whole run; a taken name gets `Data`
/// appended until it is free, so results depend on claim order.
#[derive(Debug, Default, Clone)]
pub struct NameArena {
    used: HashSet<String>,
}

impl NameArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `base` (or the first free `base` + `Data`...) and return it
    pub fn claim(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        while self.used.contains(&name) {
            name.push_str(COLLISION_SUFFIX);
        }
        self.used.insert(name.clone());
        name
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// API version number of the first `vN` path segment
pub fn path_version(path: &str) -> Option<u32> {
    path.split('/')
        .find_map(|seg| VERSION_SEGMENT.captures(seg))
        .and_then(|caps| caps[1].parse().ok())
}

/// Path reduced to the words that make up a method name: version segments,
/// braces and verbs glued to the front of segments are dropped
pub fn clean_path(path: &str) -> String {
    path.split('/')
        .filter(|seg| !seg.is_empty() && !VERSION_SEGMENT.is_match(seg))
        .map(|seg| seg.trim_matches(|c| c == '{' || c == '}'))
        .filter_map(strip_leading_verb)
        .collect::<Vec<_>>()
        .join("_")
}

fn strip_leading_verb(segment: &str) -> Option<&str> {
    let lower = segment.to_ascii_lowercase();
    for verb in HttpMethod::all().map(|m| m.as_str()) {
        if !lower.starts_with(verb) {
            continue;
        }
        let rest = &segment[verb.len()..];
        if rest.is_empty() {
            return None;
        }
        if rest.starts_with(['_', '-']) {
            let rest = rest.trim_start_matches(['_', '-']);
            return (!rest.is_empty()).then_some(rest);
        }
        if rest.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Some(rest);
        }
    }
    Some(segment)
}

/// `{verb}{PascalCase(cleanedPath)}`
pub fn method_name(method: HttpMethod, path: &str) -> String {
    format!("{}{}", method.as_str(), to_upper_camel_case(&clean_path(path)))
}

/// Method names for `endpoints`, index-aligned.
///
/// An endpoint under `/vN/` gets a `VN` suffix when the document has any
/// endpoint on the same cleaned path at a lower or absent version. Names
/// still clashing after that get a numeric suffix.
pub fn method_names(endpoints: &[EndpointInfo]) -> Vec<String> {
    let cleaned: Vec<String> = endpoints.iter().map(|e| clean_path(&e.path)).collect();

    let named: Vec<String> = endpoints
        .iter()
        .zip(&cleaned)
        .map(|(endpoint, path)| {
            let name = method_name(endpoint.method, &endpoint.path);
            let Some(version) = path_version(&endpoint.path) else {
                return name;
            };
            let has_older = endpoints.iter().zip(&cleaned).any(|(other, other_path)| {
                other_path == path && path_version(&other.path).map_or(true, |v| v < version)
            });
            if has_older {
                format!("{name}V{version}")
            } else {
                name
            }
        })
        .collect();

    let mut seen = HashSet::new();
    endpoints
        .iter()
        .zip(named)
        .map(|(endpoint, base)| {
            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.clone()) {
                name = format!("{base}{n}");
                n += 1;
            }
            if name != base {
                log::warn!(
                    "Method name '{}' for {} {} is already used, renamed to '{}'",
                    base,
                    endpoint.method,
                    endpoint.path,
                    name
                );
            }
            name
        })
        .collect()
}
