//!
//! src/lyrics/html.rs
//!
//! Small document walking helpers on top of the scraper crate, covering
//! the few lookups css selectors can't express
//!

use scraper::{ElementRef, Html, Node, Selector};

use crate::errors::LyricsError;

pub fn selector(css: &str) -> Result<Selector, LyricsError> {
    Selector::parse(css).map_err(|e| LyricsError::new(format!("invalid selector {css}: {e:?}")))
}

pub fn select_first<'a>(doc: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>, LyricsError> {
    Ok( doc.select(&selector(css)?).next() )
}

/// Concatenated text of the element, trimmed
pub fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of the element with whole subtrees removed where `skip` holds
pub fn text_excluding(el: ElementRef, skip: &dyn Fn(ElementRef) -> bool) -> String {
    fn walk(el: ElementRef, skip: &dyn Fn(ElementRef) -> bool, out: &mut String) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        if !skip(child) {
                            walk(child, skip, out);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let mut out = String::new();
    walk(el, skip, &mut out);
    out.trim().to_string()
}

pub fn has_class(el: ElementRef, class: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Last `name` element that starts before `target` in document order
pub fn previous_in_document<'a>(doc: &'a Html, target: ElementRef<'a>, name: &str) ->
    Option<ElementRef<'a>> {
    let mut found = None;
    for node in doc.root_element().descendants() {
        if node.id() == target.id() {
            break;
        }
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == name {
                found = Some(el);
            }
        }
    }
    found
}

/// First `name` element that starts after `target` in document order,
/// descendants of `target` included
pub fn next_in_document<'a>(doc: &'a Html, target: ElementRef<'a>, name: &str) ->
    Option<ElementRef<'a>> {
    doc.root_element()
        .descendants()
        .skip_while(|node| node.id() != target.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == name)
}

/// Next sibling element with the given tag name
pub fn next_sibling_named<'a>(target: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    target
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <b>first</b>
        <div class="album">Album <b>inner</b></div>
        <div id="list"><a href="/lyrics/x.html">X</a></div>
        <div class="target">t</div>
        <p>gap</p>
        <div id="lyrics">line one<br>line two<script>ads()</script><ins>ad</ins></div>
    </body></html>"#;

    #[test]
    fn walks_document_order() -> Result<(), LyricsError> {
        let doc = Html::parse_document(PAGE);
        let target = select_first(&doc, ".target")?
            .ok_or_else(|| LyricsError::new("missing target"))?;
        let album = select_first(&doc, "div.album")?
            .ok_or_else(|| LyricsError::new("missing album"))?;

        let prev = previous_in_document(&doc, target, "b").map(text_of);
        assert_eq!(prev.as_deref(), Some("inner"));

        let next = next_in_document(&doc, album, "div").and_then(|d| d.value().attr("id"));
        assert_eq!(next, Some("list"));

        let sibling = next_sibling_named(target, "div").and_then(|d| d.value().attr("id"));
        assert_eq!(sibling, Some("lyrics"));
        Ok(())
    }

    #[test]
    fn excludes_skipped_subtrees() -> Result<(), LyricsError> {
        let doc = Html::parse_document(PAGE);
        let lyrics = select_first(&doc, "#lyrics")?
            .ok_or_else(|| LyricsError::new("missing lyrics"))?;
        let text = text_excluding(lyrics, &|el| matches!(el.value().name(), "script" | "ins"));
        assert_eq!(text, "line oneline two");
        assert!(!has_class(lyrics, "nope"));
        Ok(())
    }
}
