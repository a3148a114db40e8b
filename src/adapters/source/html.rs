//! Small, forgiving helpers for pulling fields out of search-result markup.
//! They scan text; they do not build a DOM.

/// An opening tag found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag<'a> {
    pub name: String,
    pub raw: &'a str,
    /// Byte offset just past the closing `>`.
    pub end: usize,
}

impl Tag<'_> {
    pub fn attr(&self, name: &str) -> Option<String> {
        attr_value(self.raw, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// Splits `html` into one slice per occurrence of `marker`. Each slice starts at
/// the tag holding the marker and runs up to the next one.
pub fn result_blocks<'a>(html: &'a str, marker: &str) -> Vec<&'a str> {
    let mut starts: Vec<usize> = html
        .match_indices(marker)
        .filter_map(|(at, _)| html[..at].rfind('<'))
        .collect();
    starts.dedup();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(html.len());
            &html[start..end]
        })
        .collect()
}

pub fn open_tags(s: &str) -> Vec<Tag<'_>> {
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(rel) = s[pos..].find('<') {
        let start = pos + rel;
        let Some(close) = s[start..].find('>') else {
            break;
        };
        let end = start + close + 1;
        let raw = &s[start..end];
        let name: String = raw[1..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        // Closing tags, comments and doctypes have no name here.
        if !name.is_empty() {
            tags.push(Tag { name, raw, end });
        }
        pos = end;
    }
    tags
}

/// Text between `tag` and the first matching close tag, tags stripped.
pub fn inner_text(s: &str, tag: &Tag<'_>) -> Option<String> {
    let close = format!("</{}", tag.name);
    let rest = s.get(tag.end..)?;
    let rel = rest.to_ascii_lowercase().find(&close)?;
    let text = strip_tags(&rest[..rel]);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Text of the first element carrying any of `classes`, tried in order.
pub fn text_by_classes(s: &str, tags: &[Tag<'_>], classes: &[&str]) -> Option<String> {
    classes.iter().find_map(|class| {
        tags.iter()
            .filter(|tag| tag.has_class(class))
            .find_map(|tag| inner_text(s, tag))
    })
}

pub fn attr_value(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let needle = name.to_ascii_lowercase();
    let mut from = 0;

    while let Some(rel) = lower[from..].find(&needle) {
        let at = from + rel;
        from = at + needle.len();

        let preceded_by_space = lower[..at]
            .chars()
            .last()
            .map(char::is_whitespace)
            .unwrap_or(false);
        if !preceded_by_space {
            continue;
        }

        let after_name = &tag[from..];
        let Some(after_eq) = after_name.trim_start().strip_prefix('=') else {
            continue;
        };
        let value = after_eq.trim_start();

        return match value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &value[1..];
                let end = body.find(quote)?;
                Some(decode_entities(&body[..end]))
            }
            Some(_) => {
                let raw: String = value
                    .chars()
                    .take_while(|c| !c.is_whitespace() && *c != '>')
                    .collect();
                Some(decode_entities(raw.trim_end_matches('/')))
            }
            None => None,
        };
    }
    None
}

pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
