//! Response classification: pattern rules plus HTTP-status heuristics.
//!
//! Patterns are compiled once at registry load; invalid regexes are a
//! config error there, never a scan-time failure. All matching is
//! case-insensitive over the first 512 KiB of the decoded body.

use regex::{Regex, RegexBuilder};

use crate::types::probe::ProbeStatus;

/// Pattern scans never look past this many bytes of body.
pub const SCAN_CAP: usize = 512 * 1024;

/// HTTP statuses that mean the probe was blocked.
const BLOCKED_STATUS: [u16; 4] = [401, 402, 403, 429];

/// HTTP statuses that mean the username does not exist.
const NOT_FOUND_STATUS: [u16; 2] = [404, 410];

/// Interstitial fingerprints shared by all providers. Providers extend
/// this set through their own `blocked_patterns`.
const BLOCKED_FINGERPRINTS: [&str; 5] = [
    "captcha",
    "cf-chl",
    "just a moment",
    "attention required",
    "access denied",
];

/// One compiled body pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Lowercased needle, matched against the lowercased body
    Substring(String),
    /// Case-insensitive regex
    Regex(Regex),
}

impl Pattern {
    pub fn compile(raw: &str, is_regex: bool) -> Result<Self, regex::Error> {
        if is_regex {
            Ok(Pattern::Regex(
                RegexBuilder::new(raw).case_insensitive(true).build()?,
            ))
        } else {
            Ok(Pattern::Substring(raw.to_lowercase()))
        }
    }

    fn matches(&self, body_lower: &str) -> bool {
        match self {
            Pattern::Substring(needle) => body_lower.contains(needle.as_str()),
            Pattern::Regex(re) => re.is_match(body_lower),
        }
    }
}

/// A provider's compiled pattern rules.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    pub success: Vec<Pattern>,
    pub error: Vec<Pattern>,
    pub blocked: Vec<Pattern>,
}

/// Non-body evidence the classifier folds in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evidence {
    /// A non-empty OpenGraph title was extracted
    pub og_title: bool,
    /// Any profile metadata was extracted (used with `metadata_presence`)
    pub profile_present: bool,
}

/// Classifier for one provider.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    pub patterns: PatternSet,
    /// Provider-declared heuristic: extracted metadata implies `found`
    pub metadata_presence: bool,
}

impl Classifier {
    /// Classify a completed HTTP exchange. Transport failures never reach
    /// this point; drivers map them to `error` directly.
    pub fn classify(&self, http_status: u16, body: &str, evidence: Evidence) -> ProbeStatus {
        let body_lower = truncate_to_cap(body).to_lowercase();

        if BLOCKED_STATUS.contains(&http_status)
            || self.patterns.blocked.iter().any(|p| p.matches(&body_lower))
            || BLOCKED_FINGERPRINTS.iter().any(|f| body_lower.contains(f))
        {
            return ProbeStatus::Blocked;
        }

        if NOT_FOUND_STATUS.contains(&http_status)
            || self.patterns.error.iter().any(|p| p.matches(&body_lower))
        {
            return ProbeStatus::NotFound;
        }

        if (200..300).contains(&http_status) {
            let success_pattern = self.patterns.success.iter().any(|p| p.matches(&body_lower));
            let presence = self.metadata_presence && evidence.profile_present;
            if success_pattern || evidence.og_title || presence {
                return ProbeStatus::Found;
            }
        }

        ProbeStatus::Unknown
    }
}

/// Truncate to the scan cap without splitting a UTF-8 sequence.
fn truncate_to_cap(body: &str) -> &str {
    if body.len() <= SCAN_CAP {
        return body;
    }
    let mut end = SCAN_CAP;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(success: &[&str], error: &[&str], blocked: &[&str]) -> Classifier {
        let compile = |raw: &[&str]| {
            raw.iter()
                .map(|p| Pattern::compile(p, false).unwrap())
                .collect()
        };
        Classifier {
            patterns: PatternSet {
                success: compile(success),
                error: compile(error),
                blocked: compile(blocked),
            },
            metadata_presence: false,
        }
    }

    #[test]
    fn test_found_via_success_pattern() {
        let c = classifier(&["profile", "followers"], &[], &[]);
        let body = "<html>PROFILE page with Followers</html>";
        assert_eq!(
            c.classify(200, body, Evidence::default()),
            ProbeStatus::Found
        );
    }

    #[test]
    fn test_not_found_via_status() {
        let c = classifier(&[], &[], &[]);
        assert_eq!(c.classify(404, "", Evidence::default()), ProbeStatus::NotFound);
        assert_eq!(c.classify(410, "", Evidence::default()), ProbeStatus::NotFound);
    }

    #[test]
    fn test_not_found_via_error_pattern() {
        let c = classifier(&[], &["user not found"], &[]);
        assert_eq!(
            c.classify(200, "Sorry, User Not Found here", Evidence::default()),
            ProbeStatus::NotFound
        );
    }

    #[test]
    fn test_blocked_via_status_and_fingerprints() {
        let c = classifier(&["profile"], &[], &[]);
        assert_eq!(c.classify(429, "", Evidence::default()), ProbeStatus::Blocked);
        assert_eq!(c.classify(403, "", Evidence::default()), ProbeStatus::Blocked);
        assert_eq!(
            c.classify(200, "Just a Moment...", Evidence::default()),
            ProbeStatus::Blocked
        );
    }

    #[test]
    fn test_blocked_wins_over_success() {
        // blocked is checked before success even on a 200
        let c = classifier(&["profile"], &[], &["verify you are human"]);
        let body = "profile page, please Verify You Are Human";
        assert_eq!(c.classify(200, body, Evidence::default()), ProbeStatus::Blocked);
    }

    #[test]
    fn test_unknown_without_evidence() {
        let c = classifier(&[], &[], &[]);
        let body = "<html><title>Hi</title></html>";
        assert_eq!(c.classify(200, body, Evidence::default()), ProbeStatus::Unknown);
    }

    #[test]
    fn test_og_title_implies_found() {
        let c = classifier(&[], &[], &[]);
        let evidence = Evidence {
            og_title: true,
            profile_present: true,
        };
        assert_eq!(c.classify(200, "", evidence), ProbeStatus::Found);
    }

    #[test]
    fn test_metadata_presence_heuristic() {
        let mut c = classifier(&[], &[], &[]);
        let evidence = Evidence {
            og_title: false,
            profile_present: true,
        };
        assert_eq!(c.classify(200, "", evidence), ProbeStatus::Unknown);

        c.metadata_presence = true;
        assert_eq!(c.classify(200, "", evidence), ProbeStatus::Found);
    }

    #[test]
    fn test_regex_patterns() {
        let pattern = Pattern::compile(r"user\s+\w+ exists", true).unwrap();
        let c = Classifier {
            patterns: PatternSet {
                success: vec![pattern],
                ..Default::default()
            },
            metadata_presence: false,
        };
        assert_eq!(
            c.classify(200, "User Alice Exists", Evidence::default()),
            ProbeStatus::Found
        );
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let c = classifier(&["profile"], &["gone"], &["captcha"]);
        let body = "a profile page";
        let first = c.classify(200, body, Evidence::default());
        for _ in 0..10 {
            assert_eq!(c.classify(200, body, Evidence::default()), first);
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let mut body = "x".repeat(SCAN_CAP - 1);
        body.push('é');
        body.push_str("needle");
        let c = classifier(&["needle"], &[], &[]);
        // needle lies past the cap, so it is not seen
        assert_eq!(c.classify(200, &body, Evidence::default()), ProbeStatus::Unknown);
    }
}
