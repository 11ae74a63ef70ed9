//! Rendering mirrored messages as forge comments.

/// Label used when a message carries no usable display name.
const FALLBACK_AUTHOR: &str = "Somebody";

/// Stable public link to an archived message.
pub fn permalink(base: &str, message_id: &str) -> String {
    format!("{}/{}/", base.trim_end_matches('/'), message_id)
}

/// Render the comment body posted for one mirrored message: an attribution
/// line with the permalink and a "reply to this" hint, then the decoded body
/// fenced as a literal block. An empty body renders no block.
pub fn render_comment(permalink: &str, from_name: Option<&str>, body: &str) -> String {
    let author = from_name
        .map(strip_address)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_AUTHOR.to_string());

    let mut comment = format!(
        "[On the mailing list]({permalink}), {author} wrote ([reply to this]({permalink})):"
    );

    if !body.is_empty() {
        let fence = fence_for(body);
        comment.push_str("\n\n");
        comment.push_str(&fence);
        comment.push('\n');
        comment.push_str(body);
        if !body.ends_with('\n') {
            comment.push('\n');
        }
        comment.push_str(&fence);
    }

    comment
}

/// `"Jane Doe <jane@example.com>"` → `"Jane Doe"`.
fn strip_address(name: &str) -> String {
    match name.find('<') {
        Some(idx) => name[..idx].trim().to_string(),
        None => name.trim().to_string(),
    }
}

/// A fence one backtick longer than the longest run in the body, at least
/// three.
fn fence_for(body: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for ch in body.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permalink() {
        assert_eq!(
            permalink("https://lore.example.org/widgets", "mid@test"),
            "https://lore.example.org/widgets/mid@test/"
        );
        assert_eq!(
            permalink("https://lore.example.org/widgets/", "mid@test"),
            "https://lore.example.org/widgets/mid@test/"
        );
    }

    #[test]
    fn test_render_with_body() {
        let comment = render_comment("https://x/mid/", Some("Jane Doe"), "hello\nworld");
        assert_eq!(
            comment,
            "[On the mailing list](https://x/mid/), Jane Doe wrote \
             ([reply to this](https://x/mid/)):\n\n```\nhello\nworld\n```"
        );
    }

    #[test]
    fn test_render_empty_body_has_no_block() {
        let comment = render_comment("https://x/mid/", Some("Jane"), "");
        assert!(!comment.contains("```"));
        assert!(comment.ends_with(":"));
    }

    #[test]
    fn test_render_strips_address_and_falls_back() {
        let comment = render_comment("https://x/", Some("Jane <j@x>"), "b");
        assert!(comment.contains("Jane wrote"));

        let comment = render_comment("https://x/", None, "b");
        assert!(comment.contains("Somebody wrote"));

        let comment = render_comment("https://x/", Some("<j@x>"), "b");
        assert!(comment.contains("Somebody wrote"));
    }

    #[test]
    fn test_fence_grows_past_backtick_runs() {
        let comment = render_comment("https://x/", None, "code ```inline```");
        assert!(comment.contains("\n````\n"));
    }
}
