//! Target and company list parsing
//!
//! Target files hold IPs, domains and URLs, several per line if needed.
//! Company files hold one company name per line.

use crate::results::Target;
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{debug, info, warn};

static DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9\-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$")
        .expect("domain pattern is valid")
});

/// Top-level domains accepted in target files
const KNOWN_TLDS: &[&str] = &[
    "com", "net", "org", "edu", "gov", "cn", "jp", "uk", "ru", "de", "fr", "br", "in", "au",
    "info", "biz", "io", "co", "me", "tv",
];

/// Second-level suffixes that belong to the registry, not the registrant
const SPECIAL_SUFFIXES: &[&str] = &[
    "com.cn", "org.cn", "net.cn", "gov.cn", "edu.cn", "co.jp", "co.uk",
];

/// Text that never appears in a company name
const NON_COMPANY_MARKERS: &[&str] = &[
    "PK", ".xml", "<?xml", "[]", "{}", "<", ">", "@", "http", ".com", ".cn", ".jp", ".org",
    ".net",
];

const COMPANY_SUFFIXES: &[&str] = &[
    "公司",
    "集团",
    "有限",
    "股份",
    "企业",
    "工厂",
    "厂",
    "Corporation",
    "Corp",
    "Inc",
    "Ltd",
    "Limited",
    "LLC",
    "Co",
];

fn is_separator(c: char) -> bool {
    matches!(c, ',' | '，' | ';' | '；' | ' ' | '\t')
}

/// Strip scheme, `www.` and any path from a URL-ish token
fn clean_url(token: &str) -> &str {
    let token = token
        .strip_prefix("http://")
        .or_else(|| token.strip_prefix("https://"))
        .unwrap_or(token);
    let token = token.strip_prefix("www.").unwrap_or(token);
    match token.find('/') {
        Some(idx) => &token[..idx],
        None => token,
    }
}

/// Whether `value` looks like a domain under a known TLD
pub fn is_domain(value: &str) -> bool {
    if !DOMAIN_REGEX.is_match(value) || value.parse::<Ipv4Addr>().is_ok() {
        return false;
    }
    value
        .rsplit('.')
        .next()
        .map(|tld| KNOWN_TLDS.contains(&tld))
        .unwrap_or(false)
}

/// Reduce a host name to its registrable domain, keeping special
/// second-level suffixes such as `com.cn`
pub fn normalize_domain(domain: &str) -> String {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() <= 2 {
        return domain.to_string();
    }

    let last_two = parts[parts.len() - 2..].join(".");
    let keep = if SPECIAL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    parts[parts.len() - keep..].join(".")
}

/// Targets found on one line, in order of appearance
pub fn parse_line(line: &str) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();

    for token in line.split(is_separator) {
        let token = clean_url(token.trim());
        if token.is_empty() {
            continue;
        }

        if token.parse::<Ipv4Addr>().is_ok() {
            targets.push(Target::ip(token));
            continue;
        }

        let token = token.to_lowercase();
        if is_domain(&token) {
            let target = Target::domain(normalize_domain(&token));
            if !targets.contains(&target) {
                targets.push(target);
            }
        } else {
            debug!("Ignoring token {:?}", token);
        }
    }

    targets
}

/// Parse target-file text: skips blank lines and `#` comments and removes
/// duplicates, keeping the first occurrence
pub fn parse_targets(content: &str) -> Vec<Target> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(parse_line)
        .filter(|target| seen.insert(target.clone()))
        .collect()
}

/// Read a target file
pub fn read_targets<P: AsRef<Path>>(path: P) -> Result<Vec<Target>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        bail!("{} is empty", path.display());
    }

    let targets = parse_targets(&content);
    if targets.is_empty() {
        warn!("No valid targets found in {}", path.display());
    } else {
        info!("Read {} unique targets from {}", targets.len(), path.display());
    }
    Ok(targets)
}

/// Heuristic check that a line names a company
pub fn is_valid_company_name(name: &str) -> bool {
    if NON_COMPANY_MARKERS.iter().any(|m| name.contains(m)) {
        return false;
    }
    if name.chars().count() < 2 || !name.chars().any(char::is_alphabetic) {
        return false;
    }
    if COMPANY_SUFFIXES.iter().any(|s| name.contains(s)) {
        return true;
    }
    name.chars().filter(|c| is_han(*c)).count() >= 2
}

fn is_han(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{20000}'..='\u{2A6DF}'
        | '\u{F900}'..='\u{FAFF}')
}

/// Parse company-file text, one name per line, deduplicated in order
pub fn parse_companies(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| is_valid_company_name(line))
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Read a company file
pub fn read_companies<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let companies = parse_companies(&content);
    if companies.is_empty() {
        warn!("No valid company names found in {}", path.display());
    } else {
        info!("Read {} companies from {}", companies.len(), path.display());
    }
    Ok(companies)
}
