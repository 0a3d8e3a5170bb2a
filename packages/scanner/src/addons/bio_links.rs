//! Bio-link extraction: URLs, bare hostnames, and @handle tokens pulled
//! out of profile bios, reduced to registrable domains.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::probe::ProbeResult;

/// Tokens longer than this are ignored.
const MAX_TOKEN_LEN: usize = 256;

/// Suffixes where the registrable domain spans three labels.
const TWO_LEVEL_SUFFIXES: [&str; 12] = [
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.jp", "com.br",
    "co.in", "co.nz", "com.mx",
];

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?://)?(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?:/[^\s<>"']*)?"#)
            .expect("bio url pattern")
    })
}

fn handle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z0-9_][A-Za-z0-9_.]{1,63})").expect("handle pattern"))
}

/// Extracted link material from one bio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BioLinks {
    pub urls: Vec<String>,
    pub handles: Vec<String>,
    pub domains: Vec<String>,
}

/// Extract URLs, handles, and registrable domains from a bio string.
pub fn extract(bio: &str) -> BioLinks {
    let mut links = BioLinks::default();

    for m in url_pattern().find_iter(bio) {
        let token = m.as_str();
        if token.len() > MAX_TOKEN_LEN {
            continue;
        }
        // A dotted @handle also matches the hostname shape; skip it.
        // user@server forms (emails, fediverse addresses) still count.
        if m.start() > 0 && bio.as_bytes()[m.start() - 1] == b'@' {
            let standalone_handle = bio[..m.start() - 1]
                .chars()
                .next_back()
                .map(|c| !c.is_alphanumeric())
                .unwrap_or(true);
            if standalone_handle {
                continue;
            }
        }
        links.urls.push(token.to_string());
        if let Some(domain) = registrable_domain(token) {
            if !links.domains.contains(&domain) {
                links.domains.push(domain);
            }
        }
    }

    for cap in handle_pattern().captures_iter(bio) {
        let handle = cap[1].to_string();
        if handle.len() <= MAX_TOKEN_LEN && !links.handles.contains(&handle) {
            links.handles.push(handle);
        }
    }

    links
}

/// Reduce a URL or bare hostname to its lowercased eTLD+1.
///
/// Approximation over a short multi-label-suffix list rather than the
/// full public-suffix dataset.
pub fn registrable_domain(token: &str) -> Option<String> {
    let token = token.trim().to_ascii_lowercase();
    let without_scheme = token
        .strip_prefix("https://")
        .or_else(|| token.strip_prefix("http://"))
        .unwrap_or(&token);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()?
        .split('@')
        .next_back()?
        .split(':')
        .next()?;

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }
    // numeric hosts are not domains
    if labels.last()?.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let tail2 = labels[labels.len() - 2..].join(".");
    let take = if TWO_LEVEL_SUFFIXES.contains(&tail2.as_str()) && labels.len() >= 3 {
        3
    } else {
        2
    };
    Some(labels[labels.len() - take..].join("."))
}

/// Derive `bio_domains` for every result with a bio.
pub fn apply(results: &mut [ProbeResult]) {
    for result in results.iter_mut() {
        let Some(bio) = result.profile.bio.as_deref() else {
            continue;
        };
        let links = extract(bio);
        result.profile.bio_domains = links.domains;
    }
}
