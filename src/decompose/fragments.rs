//! Structural fragments of a mirrored page

use scraper::{Html, Selector};

/// Tags extracted as shared components, in extraction order
pub const SHARED_TAGS: [&str; 3] = ["header", "footer", "nav"];

/// A page split into shared components and its own content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposedPage {
    /// `(component name, outer HTML)` in extraction order
    pub shared: Vec<(String, String)>,

    /// Outer HTML of `<body>` after the shared components were removed
    pub content: Option<String>,
}

/// Splits a document into `Header`, `Footer`, `Nav` and the remaining body
///
/// Only the first element of each tag is taken. Each one is removed from the
/// document before the next tag is searched, so a `nav` inside the header
/// ends up in `Header`, not in `Nav`.
pub fn decompose_html(html: &str) -> DecomposedPage {
    let mut document = Html::parse_document(html);
    let mut page = DecomposedPage::default();
    let root = document.tree.root().id();

    for tag in SHARED_TAGS {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        // Detached subtrees stay in the arena; only match attached elements
        let Some((id, outer)) = document
            .select(&selector)
            .find(|element| element.ancestors().any(|node| node.id() == root))
            .map(|element| (element.id(), element.html()))
        else {
            continue;
        };

        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
        page.shared.push((component_name(tag), outer));
    }

    if let Ok(body) = Selector::parse("body") {
        page.content = document.select(&body).next().map(|element| element.html());
    }
    page
}

/// Turns an arbitrary name into a PascalCase identifier
///
/// Characters outside `[A-Za-z0-9_]` separate words; each word is
/// capitalized and the rest of it lowercased.
///
/// # Examples
///
/// ```
/// use sumi_mirror::decompose::component_name;
///
/// assert_eq!(component_name("about-us"), "AboutUs");
/// assert_eq!(component_name("nav"), "Nav");
/// ```
pub fn component_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Page component for an HTML file stem
///
/// # Returns
///
/// `(component name, route)`: `index` maps to route `/`, anything else to
/// `/<stem>`; a stem with no usable characters becomes `HomePage`.
pub fn page_component(stem: &str) -> (String, String) {
    let base = component_name(stem);
    let name = if base.is_empty() {
        "HomePage".to_string()
    } else {
        format!("{}Page", base)
    };

    let route = if stem.eq_ignore_ascii_case("index") {
        "/".to_string()
    } else {
        format!("/{}", stem)
    };
    (name, route)
}
