//! Purpose-built scanner for the XML shapes the writer emits
//!
//! This is not a general XML parser. It finds elements by name, splits out
//! their attribute text and body, and unescapes character references. Nested
//! elements with the *same* name are not supported, which never happens in
//! the parts this crate produces.

use std::borrow::Cow;

/// An element located by [`ElementScanner`]
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element<'a> {
    /// Raw text between the element name and the closing `>` / `/>`
    attrs: &'a str,
    /// Content between the start and end tags; `None` for `<x/>`
    pub body: Option<&'a str>,
}

impl<'a> Element<'a> {
    /// Unescaped value of attribute `name`.
    pub fn attr(&self, name: &str) -> Option<Cow<'a, str>> {
        self.raw_attr(name).map(unescape)
    }

    /// Attribute value as written, without unescaping.
    pub fn raw_attr(&self, name: &str) -> Option<&'a str> {
        Attributes::new(self.attrs).find(|(key, _)| *key == name).map(|(_, value)| value)
    }

    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        self.raw_attr(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn attr_u32(&self, name: &str) -> Option<u32> {
        self.raw_attr(name).and_then(|v| v.trim().parse().ok())
    }

    /// Boolean attribute: `1`/`true` are true, absence is `None`.
    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.raw_attr(name).map(|v| matches!(v, "1" | "true"))
    }

    pub fn body(&self) -> &'a str {
        self.body.unwrap_or("")
    }

    /// Unescaped text of the element body.
    pub fn text(&self) -> Cow<'a, str> {
        unescape(self.body())
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<Element<'a>> {
        ElementScanner::new(self.body(), name).next()
    }

    pub fn children<'n>(&self, name: &'n str) -> ElementScanner<'a, 'n> {
        ElementScanner::new(self.body(), name)
    }
}

/// Iterator over successive elements named `name`
pub(crate) struct ElementScanner<'a, 'n> {
    xml: &'a str,
    name: &'n str,
    pos: usize,
}

impl<'a, 'n> ElementScanner<'a, 'n> {
    pub fn new(xml: &'a str, name: &'n str) -> Self {
        ElementScanner { xml, name, pos: 0 }
    }

    fn find_start(&self) -> Option<usize> {
        let bytes = self.xml.as_bytes();
        let mut from = self.pos;
        while let Some(found) = self.xml[from..].find('<') {
            let start = from + found;
            let name_end = start + 1 + self.name.len();
            if self.xml[start + 1..].starts_with(self.name) {
                match bytes.get(name_end) {
                    Some(b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/') => return Some(start),
                    _ => {}
                }
            }
            from = start + 1;
        }
        None
    }
}

impl<'a> Iterator for ElementScanner<'a, '_> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.find_start()?;
        let attrs_start = start + 1 + self.name.len();
        let Some(tag_len) = self.xml[attrs_start..].find('>') else {
            self.pos = self.xml.len();
            return None;
        };
        let tag_end = attrs_start + tag_len;

        if self.xml[..tag_end].ends_with('/') {
            self.pos = tag_end + 1;
            return Some(Element {
                attrs: &self.xml[attrs_start..tag_end - 1],
                body: None,
            });
        }

        let body_start = tag_end + 1;
        let closing = format!("</{}>", self.name);
        match self.xml[body_start..].find(&closing) {
            Some(len) => {
                self.pos = body_start + len + closing.len();
                Some(Element {
                    attrs: &self.xml[attrs_start..tag_end],
                    body: Some(&self.xml[body_start..body_start + len]),
                })
            }
            None => {
                // unterminated element: treat the rest of the input as its body
                self.pos = self.xml.len();
                Some(Element {
                    attrs: &self.xml[attrs_start..tag_end],
                    body: Some(&self.xml[body_start..]),
                })
            }
        }
    }
}

/// `key="value"` pairs from a start tag's attribute text
struct Attributes<'a> {
    rest: &'a str,
}

impl<'a> Attributes<'a> {
    fn new(text: &'a str) -> Self {
        Attributes { rest: text }
    }
}

impl<'a> Iterator for Attributes<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest.trim_start();
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let value_end = after[1..].find(quote)?;
        let value = &after[1..1 + value_end];
        self.rest = &after[value_end + 2..];
        Some((key, value))
    }
}

/// Section body of the first `name` element, or `""` when absent.
pub(crate) fn section<'a>(xml: &'a str, name: &str) -> &'a str {
    ElementScanner::new(xml, name)
        .next()
        .map(|e| e.body())
        .unwrap_or("")
}

/// Replace the five named entities and numeric character references.
pub(crate) fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
