//! Rewrites server-rendered HTML into markup an AMP validator accepts.
//!
//! The document is parsed into a mutable DOM, rewritten by a fixed sequence
//! of passes and serialized back. Later passes rely on the earlier ones:
//! bindings are expanded before boolean attributes are normalized, and
//! inline styles are extracted only after `<img>` elements have been
//! replaced and the sidebar has been moved.
//!
//! All state (the collected CSS and the `mi<N>` class counter) lives in one
//! call, so concurrent calls never share class names.

use kuchiki::traits::TendrilSink;
use kuchiki::{ElementData, NodeDataRef, NodeRef};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static BIND_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*,\s*").expect("BIND_SEPARATOR regex"));

/// An embed element and the AMP component that replaces it.
struct Embed {
    tag: &'static str,
    amp_tag: &'static str,
    defaults: &'static [(&'static str, &'static str)],
    copied: &'static [&'static str],
}

const EMBEDS: &[Embed] = &[
    Embed {
        tag: "img",
        amp_tag: "amp-img",
        defaults: &[("layout", "intrinsic")],
        copied: &["src", "alt", "height", "width"],
    },
    Embed {
        tag: "iframe",
        amp_tag: "amp-iframe",
        defaults: &[
            ("layout", "responsive"),
            ("sandbox", "allow-scripts allow-same-origin"),
        ],
        copied: &["src", "height", "width", "frameborder"],
    },
];

pub fn sanitize_amp_html(html: &str) -> Result<String> {
    let document = kuchiki::parse_html().one(html);
    let mut styles = Vec::new();

    rewrite_bindings(&document)?;
    normalize_boolean_attributes(&document)?;
    collect_style_tags(&document, &mut styles)?;
    for embed in EMBEDS {
        replace_embeds(&document, embed)?;
    }
    strip_svg_attributes(&document)?;
    strip_direction(&document)?;
    relocate_sidebar(&document)?;
    extract_inline_styles(&document, &mut styles)?;
    emit_stylesheet(&document, &styles)?;

    let mut output = Vec::new();
    document.serialize(&mut output)?;
    Ok(String::from_utf8(output)?)
}

fn select(document: &NodeRef, selector: &'static str) -> Result<Vec<NodeDataRef<ElementData>>> {
    Ok(document
        .select(selector)
        .map_err(|()| Error::Selector(selector))?
        .collect())
}

/// Builds a detached element by letting the parser create it.
fn create_element(html: &str, selector: &'static str) -> Result<NodeRef> {
    let fragment = kuchiki::parse_html().one(html);
    let element = fragment
        .select_first(selector)
        .map_err(|()| Error::Selector(selector))?
        .as_node()
        .clone();
    element.detach();
    Ok(element)
}

/// `amp-bind="text=>state.name, hidden=>!state.open"` becomes
/// `[text]="state.name" [hidden]="!state.open"`.
fn rewrite_bindings(document: &NodeRef) -> Result<()> {
    for element in select(document, "[amp-bind]")? {
        let mut attrs = element.attributes.borrow_mut();
        let Some(bindings) = attrs.remove("amp-bind") else {
            continue;
        };

        for clause in BIND_SEPARATOR.split(bindings.value.trim()) {
            match clause.split_once("=>") {
                Some((name, expr)) if !name.trim().is_empty() => {
                    let name = format!("[{}]", name.trim());
                    attrs.insert(name.as_str(), expr.trim().to_string());
                }
                _ => debug!("skipping malformed amp-bind clause {:?}", clause),
            }
        }
    }
    Ok(())
}

/// `hidden="true"` becomes a present-but-empty `hidden`.
fn normalize_boolean_attributes(document: &NodeRef) -> Result<()> {
    for element in select(document, "*")? {
        let mut attrs = element.attributes.borrow_mut();
        for attr in attrs.map.values_mut() {
            if attr.value == "true" {
                attr.value.clear();
            }
        }
    }
    Ok(())
}

fn collect_style_tags(document: &NodeRef, styles: &mut Vec<String>) -> Result<()> {
    for style in select(document, "style:not([amp-boilerplate])")? {
        let css = style.as_node().text_contents().replace("!important", "");
        styles.push(css);
        style.as_node().detach();
    }
    Ok(())
}

fn replace_embeds(document: &NodeRef, embed: &Embed) -> Result<()> {
    let selector = embed.amp_tag;
    for element in select(document, embed.tag)? {
        let replacement = create_element(
            &format!("<body><{0}></{0}></body>", embed.amp_tag),
            selector,
        )?;

        if let Some(data) = replacement.as_element() {
            let source = element.attributes.borrow();
            let mut target = data.attributes.borrow_mut();

            for (name, value) in embed.defaults {
                target.insert(*name, value.to_string());
            }
            for name in embed.copied {
                let value = match *name {
                    "height" => source.get("data-height").or_else(|| source.get("height")),
                    "width" => source.get("data-width").or_else(|| source.get("width")),
                    other => source.get(other),
                };
                if let Some(value) = value {
                    target.insert(*name, value.to_string());
                }
            }
            for (name, attr) in source.map.iter() {
                match name.local.strip_prefix("data-amp-") {
                    Some(stripped) if !stripped.is_empty() => {
                        target.insert(stripped, attr.value.clone());
                    }
                    _ => (),
                }
            }
        }

        element.as_node().insert_before(replacement);
        element.as_node().detach();
    }
    Ok(())
}

fn strip_svg_attributes(document: &NodeRef) -> Result<()> {
    for svg in select(document, "svg")? {
        svg.attributes
            .borrow_mut()
            .map
            .retain(|name, _| !matches!(&*name.local, "focusable" | "xlink"));
    }
    Ok(())
}

/// Tab underlines render a stray `direction` attribute on their container.
fn strip_direction(document: &NodeRef) -> Result<()> {
    for div in select(document, "div[direction]")? {
        div.attributes.borrow_mut().remove("direction");
    }
    Ok(())
}

/// `<amp-sidebar>` must be a direct child of `<body>`.
fn relocate_sidebar(document: &NodeRef) -> Result<()> {
    let Some(sidebar) = select(document, "amp-sidebar")?.into_iter().next() else {
        return Ok(());
    };
    let body = document
        .select_first("body")
        .map_err(|()| Error::Selector("body"))?;

    let node = sidebar.as_node().clone();
    node.detach();
    body.as_node().append(node);
    Ok(())
}

fn extract_inline_styles(document: &NodeRef, styles: &mut Vec<String>) -> Result<()> {
    let mut next_id = 0usize;

    for element in select(document, "[style]")? {
        let mut attrs = element.attributes.borrow_mut();
        let Some(style) = attrs.remove("style") else {
            continue;
        };

        let class = format!("mi{}", next_id);
        next_id += 1;
        styles.push(format!(".{} {{{}}}", class, style.value));

        let classes = match attrs.get("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class,
        };
        attrs.insert("class", classes);
    }

    debug!("extracted {} inline style(s)", next_id);
    Ok(())
}

fn emit_stylesheet(document: &NodeRef, styles: &[String]) -> Result<()> {
    let head = document
        .select_first("head")
        .map_err(|()| Error::Selector("head"))?;
    let stylesheet = create_element(
        "<html><head><style amp-custom></style></head></html>",
        "style",
    )?;

    stylesheet.append(NodeRef::new_text(styles.join("\n")));
    head.as_node().append(stylesheet);
    Ok(())
}
