use std::sync::Arc;
use std::time::Duration;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use serde_json::{Map, Value};

use crate::content::MemoryContent;
use crate::definition::FetchDefinition;
use crate::error::{CompositionError, Result};
use crate::template::{StringFragment, MARKER_CLOSE, MARKER_OPEN};

pub const UIA_REMOVE: &str = "uia-remove";
pub const UIA_INCLUDE: &str = "uia-include";
pub const UIA_FRAGMENT: &str = "uia-fragment";
pub const UIA_TAIL: &str = "uia-tail";
pub const SCRIPT_TYPE_META: &str = "text/uia-meta";

/// Void elements per the HTML Living Standard; they never take an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone)]
struct Attr {
    name: String,
    value: String,
}

#[derive(Debug, Clone)]
enum HtmlToken {
    Start {
        name: String,
        attrs: Vec<Attr>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text {
        text: String,
        /// Raw-text payload (script/style): emitted without re-escaping.
        raw: bool,
    },
    Comment(String),
}

/// Collects owned tokens from the html5ever tokenizer, switching it into the
/// proper raw-text states so script and style payloads arrive undecoded.
#[derive(Default)]
struct TokenCollector {
    tokens: Vec<HtmlToken>,
    raw_until: Option<String>,
}

impl TokenCollector {
    fn push_text(&mut self, chunk: &str) {
        let raw = self.raw_until.is_some();
        if let Some(HtmlToken::Text { text, raw: prev }) = self.tokens.last_mut() {
            if *prev == raw {
                text.push_str(chunk);
                return;
            }
        }
        self.tokens.push(HtmlToken::Text {
            text: chunk.to_string(),
            raw,
        });
    }
}

impl TokenSink for TokenCollector {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => {
                let name = tag.name.to_string();
                match tag.kind {
                    TagKind::StartTag => {
                        let attrs = tag
                            .attrs
                            .iter()
                            .map(|a| Attr {
                                name: a.name.local.to_string(),
                                value: a.value.to_string(),
                            })
                            .collect();
                        self.tokens.push(HtmlToken::Start {
                            name: name.clone(),
                            attrs,
                            self_closing: tag.self_closing,
                        });
                        if !tag.self_closing {
                            match name.as_str() {
                                "script" => {
                                    self.raw_until = Some(name);
                                    return TokenSinkResult::RawData(RawKind::ScriptData);
                                }
                                "style" => {
                                    self.raw_until = Some(name);
                                    return TokenSinkResult::RawData(RawKind::Rawtext);
                                }
                                "title" | "textarea" => {
                                    return TokenSinkResult::RawData(RawKind::Rcdata);
                                }
                                _ => {}
                            }
                        }
                    }
                    TagKind::EndTag => {
                        if self.raw_until.as_deref() == Some(name.as_str()) {
                            self.raw_until = None;
                        }
                        self.tokens.push(HtmlToken::End { name });
                    }
                }
                TokenSinkResult::Continue
            }
            Token::CharacterTokens(chunk) => {
                self.push_text(&chunk);
                TokenSinkResult::Continue
            }
            Token::CommentToken(text) => {
                self.tokens.push(HtmlToken::Comment(text.to_string()));
                TokenSinkResult::Continue
            }
            // Recoverable tokenizer diagnostics and structure we re-emit
            // ourselves (doctype) are dropped here.
            Token::DoctypeToken(_)
            | Token::NullCharacterToken
            | Token::EOFToken
            | Token::ParseError(_) => TokenSinkResult::Continue,
        }
    }
}

fn tokenize(input: &str) -> Vec<HtmlToken> {
    let mut queue = BufferQueue::new();
    queue.push_back(StrTendril::from_slice(input));
    let mut tokenizer = Tokenizer::new(TokenCollector::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut queue);
    tokenizer.end();
    tokenizer.sink.tokens
}

type Tokens = std::vec::IntoIter<HtmlToken>;

/// Parses one upstream HTML response into a `MemoryContent`.
///
/// The pass dispatches on top-level `<head>` and `<body>`; everything
/// outside those elements (doctype, the html element itself) is dropped,
/// since the merger emits its own page skeleton.
pub fn parse_document(url: &str, input: &str) -> Result<MemoryContent> {
    let mut tokens = tokenize(input).into_iter();
    let mut content = MemoryContent::new(url);
    while let Some(token) = tokens.next() {
        if let HtmlToken::Start { name, attrs, .. } = token {
            match name.as_str() {
                "head" => parse_head(&mut tokens, &mut content)?,
                "body" => parse_body(&mut tokens, &attrs, &mut content)?,
                _ => {}
            }
        }
    }
    Ok(content)
}

fn parse_head(tokens: &mut Tokens, content: &mut MemoryContent) -> Result<()> {
    let mut buf = String::new();
    while let Some(token) = tokens.next() {
        match token {
            HtmlToken::Start {
                name,
                attrs,
                self_closing,
            } => {
                if has_attr(&attrs, UIA_REMOVE) {
                    skip_removed_subtree(tokens, &name, self_closing);
                    continue;
                }
                if name == "script" && attr_value(&attrs, "type") == Some(SCRIPT_TYPE_META) {
                    parse_meta_json(tokens, content)?;
                    continue;
                }
                write_start_tag(&mut buf, &name, &attrs, self_closing);
            }
            HtmlToken::End { name } => {
                if name == "head" {
                    break;
                }
                write_end_tag(&mut buf, &name);
            }
            HtmlToken::Text { text, raw } => write_text(&mut buf, &text, raw),
            HtmlToken::Comment(text) => write_comment(&mut buf, &text),
        }
    }

    let trimmed = buf.trim_matches(|c| c == ' ' || c == '\n');
    if !trimmed.is_empty() {
        content.set_head(Arc::new(StringFragment::new(trimmed)));
    }
    Ok(())
}

fn parse_body(tokens: &mut Tokens, body_attrs: &[Attr], content: &mut MemoryContent) -> Result<()> {
    if !body_attrs.is_empty() {
        let rendered = join_attrs(body_attrs);
        if !rendered.is_empty() {
            content.set_body_attributes(Arc::new(StringFragment::new(rendered)));
        }
    }

    let mut buf = String::new();
    while let Some(token) = tokens.next() {
        match token {
            HtmlToken::Start {
                name,
                attrs,
                self_closing,
            } => {
                if has_attr(&attrs, UIA_REMOVE) {
                    skip_removed_subtree(tokens, &name, self_closing);
                    continue;
                }
                match name.as_str() {
                    UIA_FRAGMENT => {
                        let (fragment, deps) = parse_fragment(tokens)?;
                        content.insert_body_fragment(fragment_name(&attrs), Arc::new(fragment));
                        for dep in deps {
                            content.add_required(dep);
                        }
                    }
                    UIA_TAIL => {
                        let (fragment, deps) = parse_fragment(tokens)?;
                        content.set_tail(Arc::new(fragment));
                        for dep in deps {
                            content.add_required(dep);
                        }
                    }
                    UIA_INCLUDE => {
                        let (fd, placeholder) = include_definition(&attrs)?;
                        content.add_required(fd);
                        buf.push_str(&placeholder);
                    }
                    _ => write_start_tag(&mut buf, &name, &attrs, self_closing),
                }
            }
            HtmlToken::End { name } => match name.as_str() {
                "body" => break,
                // The include element is void-style; tolerate a closing tag.
                UIA_INCLUDE => {}
                _ => write_end_tag(&mut buf, &name),
            },
            HtmlToken::Text { text, raw } => write_text(&mut buf, &text, raw),
            HtmlToken::Comment(text) => write_comment(&mut buf, &text),
        }
    }

    if !content.body.contains_key("") {
        let trimmed = buf.trim_matches(|c| c == ' ' || c == '\n');
        if !trimmed.is_empty() {
            content.insert_body_fragment("", Arc::new(StringFragment::new(trimmed)));
        }
    }
    Ok(())
}

/// Reads the contents of a `uia-fragment` or `uia-tail` element into a
/// fragment, collecting the includes declared inside it.
fn parse_fragment(tokens: &mut Tokens) -> Result<(StringFragment, Vec<FetchDefinition>)> {
    let mut buf = String::new();
    let mut deps = Vec::new();
    while let Some(token) = tokens.next() {
        match token {
            HtmlToken::Start {
                name,
                attrs,
                self_closing,
            } => {
                if has_attr(&attrs, UIA_REMOVE) {
                    skip_removed_subtree(tokens, &name, self_closing);
                    continue;
                }
                match name.as_str() {
                    UIA_INCLUDE => {
                        let (fd, placeholder) = include_definition(&attrs)?;
                        deps.push(fd);
                        buf.push_str(&placeholder);
                    }
                    UIA_FRAGMENT | UIA_TAIL => {
                        return Err(CompositionError::Parse(format!(
                            "misplaced <{name}> inside a fragment"
                        )));
                    }
                    _ => write_start_tag(&mut buf, &name, &attrs, self_closing),
                }
            }
            HtmlToken::End { name } => match name.as_str() {
                UIA_FRAGMENT | UIA_TAIL => break,
                UIA_INCLUDE => {}
                _ => write_end_tag(&mut buf, &name),
            },
            HtmlToken::Text { text, raw } => write_text(&mut buf, &text, raw),
            HtmlToken::Comment(text) => write_comment(&mut buf, &text),
        }
    }
    Ok((StringFragment::new(buf), deps))
}

/// Builds the fetch definition declared by a `uia-include` tag and the
/// placeholder replacing it, `§[> src]§`, which the template engine resolves
/// at render time.
fn include_definition(attrs: &[Attr]) -> Result<(FetchDefinition, String)> {
    let Some(src) = attr_value(attrs, "src") else {
        return Err(CompositionError::Parse(format!(
            "include definition without src {}",
            raw_tag(UIA_INCLUDE, attrs)
        )));
    };

    let mut fd = FetchDefinition::new(src);
    if let Some(timeout) = attr_value(attrs, "timeout") {
        let millis: u64 = timeout.parse().map_err(|e| {
            CompositionError::Parse(format!(
                "error parsing timeout in {}: {e}",
                raw_tag(UIA_INCLUDE, attrs)
            ))
        })?;
        fd = fd.with_timeout(Duration::from_millis(millis));
    }
    if let Some(required) = attr_value(attrs, "required") {
        let required: bool = required.parse().map_err(|e| {
            CompositionError::Parse(format!(
                "error parsing required in {}: {e}",
                raw_tag(UIA_INCLUDE, attrs)
            ))
        })?;
        fd = fd.with_required(required);
    }

    let placeholder = format!("{MARKER_OPEN}> {src}{MARKER_CLOSE}");
    Ok((fd, placeholder))
}

/// The element following `<script type="text/uia-meta">` must be a text node
/// holding a JSON object, closed by `</script>`; keys merge into the meta
/// map, later blocks winning.
fn parse_meta_json(tokens: &mut Tokens, content: &mut MemoryContent) -> Result<()> {
    let text = match tokens.next() {
        Some(HtmlToken::Text { text, .. }) => text,
        other => {
            return Err(CompositionError::Parse(format!(
                "expected text node for meta json, but found {other:?}"
            )));
        }
    };

    let parsed: Map<String, Value> = serde_json::from_str(text.trim()).map_err(|e| {
        CompositionError::Parse(format!(
            "error parsing meta json near {:?}: {e}",
            snippet(text.trim())
        ))
    })?;
    content.meta_mut().extend(parsed);

    match tokens.next() {
        Some(HtmlToken::End { name }) if name == "script" => Ok(()),
        other => Err(CompositionError::Parse(format!(
            "meta json script not properly ended, expected </script> but found {other:?}"
        ))),
    }
}

/// Drops the subtree of an element annotated with `uia-remove`. The start
/// tag is already consumed; void and self-closing elements have no subtree.
fn skip_removed_subtree(tokens: &mut Tokens, name: &str, self_closing: bool) {
    if self_closing || is_void(name) {
        return;
    }
    let mut depth: i32 = 0;
    for token in tokens.by_ref() {
        match token {
            HtmlToken::Start {
                name, self_closing, ..
            } => {
                if !self_closing && !is_void(&name) {
                    depth += 1;
                }
            }
            HtmlToken::End { .. } => {
                depth -= 1;
                if depth < 0 {
                    return;
                }
            }
            _ => {}
        }
    }
}

fn has_attr(attrs: &[Attr], name: &str) -> bool {
    attrs.iter().any(|a| a.name == name)
}

fn attr_value<'a>(attrs: &'a [Attr], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

fn fragment_name(attrs: &[Attr]) -> String {
    attr_value(attrs, "name").unwrap_or_default().to_string()
}

fn snippet(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(40)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

fn raw_tag(name: &str, attrs: &[Attr]) -> String {
    if attrs.is_empty() {
        format!("<{name}>")
    } else {
        format!("<{name} {}>", join_attrs(attrs))
    }
}

fn join_attrs(attrs: &[Attr]) -> String {
    let mut out = String::new();
    for attr in attrs {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&attr.name);
        out.push_str("=\"");
        escape_attr_into(&mut out, &attr.value);
        out.push('"');
    }
    out
}

fn write_start_tag(buf: &mut String, name: &str, attrs: &[Attr], self_closing: bool) {
    buf.push('<');
    buf.push_str(name);
    for attr in attrs {
        buf.push(' ');
        buf.push_str(&attr.name);
        buf.push_str("=\"");
        escape_attr_into(buf, &attr.value);
        buf.push('"');
    }
    buf.push_str(if self_closing { "/>" } else { ">" });
}

fn write_end_tag(buf: &mut String, name: &str) {
    buf.push_str("</");
    buf.push_str(name);
    buf.push('>');
}

fn write_text(buf: &mut String, text: &str, raw: bool) {
    if raw {
        buf.push_str(text);
        return;
    }
    for c in text.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            _ => buf.push(c),
        }
    }
}

fn write_comment(buf: &mut String, text: &str) {
    buf.push_str("<!--");
    buf.push_str(text);
    buf.push_str("-->");
}

fn escape_attr_into(buf: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '"' => buf.push_str("&quot;"),
            _ => buf.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use serde_json::json;
    use std::io::Write;

    fn render_fragment(content: &MemoryContent, name: &str) -> String {
        let fragment = content.body.get(name).expect("fragment present");
        let mut out = Vec::new();
        let mut resolve = |_: &mut dyn Write, _: &str| -> Result<()> { Ok(()) };
        fragment
            .execute(&mut out, &Map::new(), &mut resolve)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn removes_annotated_subtree_from_body() {
        let content = parse_document(
            "/page",
            "<body><div uia-remove><p>gone</p></div><span>kept</span></body>",
        )
        .unwrap();
        assert_eq!(render_fragment(&content, ""), "<span>kept</span>");
    }

    #[test]
    fn removes_void_and_self_closing_elements_without_eating_siblings() {
        let content = parse_document(
            "/page",
            "<body><img uia-remove src=\"x.png\"><span>kept</span><br uia-remove/>more</body>",
        )
        .unwrap();
        assert_eq!(render_fragment(&content, ""), "<span>kept</span>more");
    }

    #[test]
    fn removes_deeply_nested_subtrees() {
        let content = parse_document(
            "/page",
            "<body><div uia-remove><div><ul><li>a</li></ul></div><p>b</p></div>ok</body>",
        )
        .unwrap();
        assert_eq!(render_fragment(&content, ""), "ok");
    }

    #[test]
    fn removes_subtrees_from_head() {
        let content = parse_document(
            "/page",
            "<head><link rel=\"a\"><style uia-remove>body{}</style></head>",
        )
        .unwrap();
        let mut out = Vec::new();
        let mut resolve = |_: &mut dyn std::io::Write, _: &str| -> Result<()> { Ok(()) };
        content
            .head()
            .unwrap()
            .execute(&mut out, &Map::new(), &mut resolve)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<link rel=\"a\">");
    }

    #[test]
    fn include_becomes_placeholder_and_dependency() {
        let content = parse_document(
            "/page",
            "<body>before <uia-include src=\"/foo\" timeout=\"100\" required=\"false\"> after</body>",
        )
        .unwrap();

        assert_eq!(render_fragment(&content, ""), "before §[> /foo]§ after");

        let deps = content.required_content();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].url(), "/foo");
        assert_eq!(deps[0].timeout(), Duration::from_millis(100));
        assert!(!deps[0].required());
    }

    #[test]
    fn include_closing_tag_is_consumed() {
        let content = parse_document(
            "/page",
            "<body><uia-include src=\"/a\"></uia-include><p>x</p></body>",
        )
        .unwrap();
        assert_eq!(render_fragment(&content, ""), "§[> /a]§<p>x</p>");
    }

    #[test]
    fn named_fragment_with_nested_include() {
        let content = parse_document(
            "/page",
            concat!(
                "<body>",
                "<uia-fragment name=\"nav\"><ul><li>a</li></ul>",
                "<uia-include src=\"/teaser\"/></uia-fragment>",
                "main",
                "</body>",
            ),
        )
        .unwrap();

        assert_eq!(
            render_fragment(&content, "nav"),
            "<ul><li>a</li></ul>§[> /teaser]§"
        );
        assert_eq!(render_fragment(&content, ""), "main");
        let deps = content.required_content();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].url(), "/teaser");
    }

    #[test]
    fn explicit_default_fragment_wins_over_body_buffer() {
        let content = parse_document(
            "/page",
            "<body>loose text<uia-fragment>the default</uia-fragment></body>",
        )
        .unwrap();
        assert_eq!(render_fragment(&content, ""), "the default");
    }

    #[test]
    fn tail_is_extracted() {
        let content = parse_document(
            "/page",
            "<body>main<uia-tail><script src=\"analytics.js\"></script></uia-tail></body>",
        )
        .unwrap();

        let mut out = Vec::new();
        let mut resolve = |_: &mut dyn std::io::Write, _: &str| -> Result<()> { Ok(()) };
        content
            .tail()
            .unwrap()
            .execute(&mut out, &Map::new(), &mut resolve)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<script src=\"analytics.js\"></script>"
        );
        assert_eq!(render_fragment(&content, ""), "main");
    }

    #[test]
    fn head_content_is_collected_and_trimmed() {
        let content = parse_document(
            "/page",
            "<head>\n  <title>Page &amp; more</title>\n  <link href=\"app.css\">\n</head>",
        )
        .unwrap();

        let mut out = Vec::new();
        let mut resolve = |_: &mut dyn std::io::Write, _: &str| -> Result<()> { Ok(()) };
        content
            .head()
            .unwrap()
            .execute(&mut out, &Map::new(), &mut resolve)
            .unwrap();
        let head = String::from_utf8(out).unwrap();
        assert!(head.starts_with("<title>"));
        assert!(head.ends_with("<link href=\"app.css\">"));
        assert!(head.contains("Page &amp; more"));
    }

    #[test]
    fn meta_script_populates_meta_and_merges() {
        let content = parse_document(
            "/page",
            concat!(
                "<head>",
                "<script type=\"text/uia-meta\">{\"foo\": \"bar\", \"n\": 1}</script>",
                "<script type=\"text/uia-meta\">{\"foo\": \"override\"}</script>",
                "<title>t</title>",
                "</head>",
            ),
        )
        .unwrap();

        assert_eq!(content.meta().get("foo"), Some(&json!("override")));
        assert_eq!(content.meta().get("n"), Some(&json!(1)));

        // The meta scripts never leak into the head fragment.
        let mut out = Vec::new();
        let mut resolve = |_: &mut dyn std::io::Write, _: &str| -> Result<()> { Ok(()) };
        content
            .head()
            .unwrap()
            .execute(&mut out, &Map::new(), &mut resolve)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<title>t</title>");
    }

    #[test]
    fn body_attributes_are_captured() {
        let content =
            parse_document("/page", "<body class=\"dark\" data-page=\"home\">x</body>").unwrap();

        let mut out = Vec::new();
        let mut resolve = |_: &mut dyn std::io::Write, _: &str| -> Result<()> { Ok(()) };
        content
            .body_attributes()
            .unwrap()
            .execute(&mut out, &Map::new(), &mut resolve)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "class=\"dark\" data-page=\"home\""
        );
    }

    #[test]
    fn include_without_src_is_an_error() {
        let err = parse_document("/page", "<body><uia-include timeout=\"5\"></body>").unwrap_err();
        assert!(
            err.to_string().contains("include definition without src"),
            "got {err}"
        );
    }

    #[test]
    fn include_with_bad_timeout_is_an_error() {
        let err = parse_document(
            "/page",
            "<body><uia-include src=\"/a\" timeout=\"soon\"></body>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("error parsing timeout"), "got {err}");
    }

    #[test]
    fn include_with_bad_required_flag_is_an_error() {
        let err = parse_document(
            "/page",
            "<body><uia-include src=\"/a\" required=\"yep\"></body>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("error parsing required"), "got {err}");
    }

    #[test]
    fn nested_fragment_is_an_error() {
        let err = parse_document(
            "/page",
            "<body><uia-fragment name=\"a\"><uia-fragment name=\"b\">x</uia-fragment></uia-fragment></body>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("misplaced <uia-fragment>"), "got {err}");
    }

    #[test]
    fn malformed_meta_json_is_an_error() {
        let err = parse_document(
            "/page",
            "<head><script type=\"text/uia-meta\">{not json}</script></head>",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("error parsing meta json"), "got {msg}");
        assert!(msg.contains("{not json}"), "snippet missing in {msg}");
    }

    #[test]
    fn full_document() {
        let content = parse_document(
            "/page",
            concat!(
                "<!DOCTYPE html>\n<html>\n",
                "<head>\n",
                "  <script type=\"text/uia-meta\">{\"user\": {\"name\": \"pat\"}}</script>\n",
                "  <title>Shop</title>\n",
                "</head>\n",
                "<body data-theme=\"light\">\n",
                "  <uia-fragment name=\"headline\"><h1>Hi §[user.name]§</h1></uia-fragment>\n",
                "  welcome\n",
                "  <uia-include src=\"/footer\" required=\"false\">\n",
                "  <uia-tail><script src=\"t.js\"></script></uia-tail>\n",
                "</body>\n</html>",
            ),
        )
        .unwrap();

        assert_eq!(content.url(), "/page");
        assert_eq!(
            content.meta().get("user"),
            Some(&json!({"name": "pat"}))
        );
        assert!(content.head().is_some());
        assert!(content.tail().is_some());
        assert!(content.body_attributes().is_some());
        assert!(content.body().contains_key("headline"));

        let body = render_fragment(&content, "");
        assert!(body.contains("welcome"));
        assert!(body.contains("§[> /footer]§"));

        let deps = content.required_content();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].url(), "/footer");
        assert!(!deps[0].required());
    }
}
