use crate::api::{Endpoint, Site};
use serde_json::Value;

/// Derives the canonical post URL for an item returned by `endpoint`
///
/// Items carrying a `question_id` map to the question page, whatever the
/// endpoint. Comments without one map to the short answer link of their
/// `post_id`. Any other item without a `question_id` has no link.
pub fn derive_post_url(endpoint: Endpoint, site: &Site, item: &Value) -> Option<String> {
    let base = site.site_url.trim_end_matches('/');

    if let Some(question_id) = item.get("question_id").and_then(Value::as_u64) {
        return Some(format!("{}/questions/{}", base, question_id));
    }

    if endpoint == Endpoint::Comments {
        if let Some(post_id) = item.get("post_id").and_then(Value::as_u64) {
            return Some(format!("{}/a/{}", base, post_id));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stackoverflow() -> Site {
        Site {
            site_name: "Stack Overflow".to_string(),
            site_url: "https://stackoverflow.com".to_string(),
            api_site_parameter: Some("stackoverflow".to_string()),
        }
    }

    #[test]
    fn test_question_id_wins() {
        let item = json!({ "question_id": 42, "answer_id": 43 });
        assert_eq!(
            derive_post_url(Endpoint::Answers, &stackoverflow(), &item).as_deref(),
            Some("https://stackoverflow.com/questions/42")
        );
    }

    #[test]
    fn test_comment_links_to_post() {
        let item = json!({ "comment_id": 1, "post_id": 7 });
        assert_eq!(
            derive_post_url(Endpoint::Comments, &stackoverflow(), &item).as_deref(),
            Some("https://stackoverflow.com/a/7")
        );
    }

    #[test]
    fn test_post_id_ignored_outside_comments() {
        let item = json!({ "post_id": 7 });
        assert!(derive_post_url(Endpoint::Favorites, &stackoverflow(), &item).is_none());
    }

    #[test]
    fn test_mention_links_to_its_question() {
        let item = json!({ "comment_id": 2, "question_id": 42, "post_id": 7 });
        assert_eq!(
            derive_post_url(Endpoint::Mentioned, &stackoverflow(), &item).as_deref(),
            Some("https://stackoverflow.com/questions/42")
        );
    }

    #[test]
    fn test_mention_without_question_is_skipped() {
        let item = json!({ "comment_id": 2, "post_id": 7 });
        assert!(derive_post_url(Endpoint::Mentioned, &stackoverflow(), &item).is_none());
    }

    #[test]
    fn test_trailing_slash_on_site_url() {
        let mut site = stackoverflow();
        site.site_url = "https://math.stackexchange.com/".to_string();
        let item = json!({ "question_id": 5 });
        assert_eq!(
            derive_post_url(Endpoint::Questions, &site, &item).as_deref(),
            Some("https://math.stackexchange.com/questions/5")
        );
    }
}
