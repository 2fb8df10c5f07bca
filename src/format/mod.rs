//! Plain text rendering of mirror lists.

/// The answer to every mirrorlist request that cannot be resolved.
pub const NO_MATCH: &str = "#no repositories match";

/// One line per entry, each terminated by `\n`.
pub fn render<S: AsRef<str>>(lines: &[S]) -> String {
    let mut body = String::with_capacity(lines.iter().map(|l| l.as_ref().len() + 1).sum());
    for l in lines {
        body.push_str(l.as_ref());
        body.push('\n');
    }
    body
}

/// A header line for hand built listings. Embedded line breaks are dropped.
pub fn comment(text: &str) -> String {
    let text: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    format!("# {}", text)
}
