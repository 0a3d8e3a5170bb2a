//! Profile extraction from HTML metadata and JSON payloads.
//!
//! Sources are attempted in order (JSON-LD `Person`, OpenGraph,
//! Twitter-Card) and unioned; later sources never overwrite earlier
//! non-empty values. Malformed markup yields an empty profile, never an
//! error.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::types::probe::Profile;

/// Extraction outcome plus the evidence bits the classifier wants.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub profile: Profile,
    /// A non-empty `og:title` was present
    pub og_title: bool,
}

/// Extract a profile from an HTML document.
pub fn from_html(body: &str) -> Extracted {
    let document = Html::parse_document(body);

    let mut profile = Profile::default();
    for fragment in json_ld_fragments(&document) {
        if let Some(person) = find_person(&fragment) {
            profile.merge(person_profile(person));
        }
    }

    let og_title = meta_content(&document, "meta[property=\"og:title\"]");
    let has_og_title = og_title.is_some();

    profile.merge(Profile {
        display_name: og_title,
        bio: meta_content(&document, "meta[property=\"og:description\"]"),
        avatar_url: meta_content(&document, "meta[property=\"og:image\"]"),
        ..Default::default()
    });

    profile.merge(Profile {
        display_name: meta_content(&document, "meta[name=\"twitter:title\"]"),
        bio: meta_content(&document, "meta[name=\"twitter:description\"]"),
        avatar_url: meta_content(&document, "meta[name=\"twitter:image\"]"),
        ..Default::default()
    });

    Extracted {
        profile,
        og_title: has_og_title,
    }
}

/// Extract a profile from a JSON payload using common field names.
pub fn from_json(value: &Value) -> Profile {
    Profile {
        display_name: first_string(value, &["display_name", "name", "full_name", "title"]),
        avatar_url: first_string(
            value,
            &["avatar_url", "avatar", "picture", "profile_image_url", "icon_img"],
        ),
        bio: first_string(value, &["bio", "description", "about", "public_description"]),
        followers: first_number(value, &["followers", "followers_count", "follower_count"]),
        following: first_number(value, &["following", "following_count", "friends_count"]),
        subscribers: first_number(value, &["subscribers", "subscriber_count"]),
        created_at: first_string(value, &["created_at", "created", "join_date"]),
        ..Default::default()
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn json_ld_fragments(document: &Html) -> Vec<Value> {
    let selector = match Selector::parse("script[type=\"application/ld+json\"]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter_map(|el| {
            let text: String = el.text().collect();
            serde_json::from_str(&text).ok()
        })
        .collect()
}

/// Find a `Person` object directly, inside an array, or under `@graph`.
fn find_person(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if map.get("@type").and_then(Value::as_str) == Some("Person") {
                return Some(value);
            }
            map.get("@graph").and_then(find_person)
        }
        Value::Array(items) => items.iter().find_map(find_person),
        _ => None,
    }
}

fn person_profile(person: &Value) -> Profile {
    let image = match person.get("image") {
        Some(Value::String(url)) => Some(url.clone()),
        Some(Value::Object(map)) => map
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    Profile {
        display_name: person
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        bio: person
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        avatar_url: image,
        ..Default::default()
    }
}

fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .filter_map(Value::as_str)
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn first_number(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().filter_map(|k| value.get(k)).find_map(|v| {
        v.as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opengraph_extraction() {
        let html = r#"<html><head>
            <meta property="og:title" content="Alice Doe" />
            <meta property="og:description" content="Photographer" />
            <meta property="og:image" content="https://cdn.example/alice.png" />
        </head></html>"#;

        let extracted = from_html(html);
        assert!(extracted.og_title);
        assert_eq!(extracted.profile.display_name.as_deref(), Some("Alice Doe"));
        assert_eq!(extracted.profile.bio.as_deref(), Some("Photographer"));
        assert_eq!(
            extracted.profile.avatar_url.as_deref(),
            Some("https://cdn.example/alice.png")
        );
    }

    #[test]
    fn test_json_ld_person_wins_over_opengraph() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Person",
             "name": "Alice From JsonLd", "image": "https://cdn.example/ld.png"}
            </script>
            <meta property="og:title" content="Alice From OG" />
        </head></html>"#;

        let extracted = from_html(html);
        assert_eq!(
            extracted.profile.display_name.as_deref(),
            Some("Alice From JsonLd")
        );
        // og:title still counts as evidence even when JSON-LD won the field
        assert!(extracted.og_title);
    }

    #[test]
    fn test_person_inside_graph() {
        let html = r#"<script type="application/ld+json">
            {"@graph": [{"@type": "WebSite"}, {"@type": "Person", "name": "Graph Alice"}]}
        </script>"#;
        let extracted = from_html(html);
        assert_eq!(extracted.profile.display_name.as_deref(), Some("Graph Alice"));
    }

    #[test]
    fn test_twitter_card_fallback() {
        let html = r#"<head>
            <meta name="twitter:title" content="Tw Alice" />
            <meta name="twitter:image" content="https://cdn.example/tw.png" />
        </head>"#;
        let extracted = from_html(html);
        assert!(!extracted.og_title);
        assert_eq!(extracted.profile.display_name.as_deref(), Some("Tw Alice"));
    }

    #[test]
    fn test_malformed_markup_does_not_raise() {
        let extracted = from_html("<html><meta property=og:title <<<>>> garbage");
        assert!(extracted.profile.is_empty());

        let extracted = from_html(r#"<script type="application/ld+json">{not json</script>"#);
        assert!(extracted.profile.is_empty());
    }

    #[test]
    fn test_empty_og_title_is_not_evidence() {
        let html = r#"<meta property="og:title" content="   " />"#;
        let extracted = from_html(html);
        assert!(!extracted.og_title);
    }

    #[test]
    fn test_json_extraction() {
        let value: Value = serde_json::from_str(
            r#"{"name": "Alice", "avatar_url": "https://cdn.example/a.png",
                "bio": "hi", "followers": 42, "following": 7,
                "created_at": "2015-03-01T00:00:00Z"}"#,
        )
        .unwrap();

        let profile = from_json(&value);
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(profile.followers, Some(42));
        assert_eq!(profile.following, Some(7));
        assert_eq!(profile.created_at.as_deref(), Some("2015-03-01T00:00:00Z"));
    }

    #[test]
    fn test_json_float_counts() {
        let value: Value = serde_json::from_str(r#"{"followers": 12.0}"#).unwrap();
        assert_eq!(from_json(&value).followers, Some(12));
    }
}
