//! Mention stripping.
//!
//! One rule covers every Slack user mention: a `<@ID>` or `<@ID|label>` token
//! whose `ID` is ASCII alphanumeric is removed, the explicit token passed by
//! the caller is removed as well, and the remaining words are re-joined with
//! single spaces.

pub fn strip_mentions(raw: &str, mention_token: Option<&str>) -> String {
    let without_token = match mention_token.map(str::trim).filter(|token| !token.is_empty()) {
        Some(token) => raw.replace(token, " "),
        None => raw.to_owned(),
    };

    let mut output = String::with_capacity(without_token.len());
    let mut rest = without_token.as_str();
    while let Some(start) = rest.find("<@") {
        output.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match mention_len(candidate) {
            Some(len) => {
                output.push(' ');
                rest = &candidate[len..];
            }
            None => {
                output.push_str("<@");
                rest = &candidate[2..];
            }
        }
    }
    output.push_str(rest);

    output.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn mention_len(candidate: &str) -> Option<usize> {
    let end = candidate.find('>')?;
    let inner = &candidate[2..end];
    let id = inner.split_once('|').map_or(inner, |(id, _)| id);
    let valid = !id.is_empty() && id.bytes().all(|byte| byte.is_ascii_alphanumeric());
    valid.then_some(end + 1)
}
