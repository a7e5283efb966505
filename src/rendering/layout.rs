/// Block layout for lesson fragments

use crate::{Error, Result, Viewport};
use scraper::{ElementRef, Html, Selector};

/// Width and height of one glyph cell at scale 1
pub const GLYPH_CELL: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxModel {
    pub margin: u32,
    pub border: u32,
    pub padding: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub rect: Rect,
    pub box_model: BoxModel,
}

impl LayoutBox {
    pub fn content_width(&self) -> u32 {
        let total = self.box_model.border + self.box_model.padding;
        self.rect.width.saturating_sub(total * 2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Title,
    Heading,
    Paragraph,
    TableRow { header: bool },
    Image { src: String },
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub lb: LayoutBox,
    pub text: String,
    pub elem_type: ElementType,
    pub scale: u32,
    /// Inline `color:` if the element declares one
    pub color: Option<String>,
}

/// Result of laying out a fragment: nodes plus the total content height.
#[derive(Debug, Clone)]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub width: u32,
    pub height: u32,
}

const FLOW_SELECTOR: &str = "h1, h2, h3, p, li, tr, img";
const PAGE_PADDING: u32 = 8;

/// Stack the fragment's blocks vertically inside `viewport.width`.
/// Height grows with content; the viewport height is not a limit, but a
/// document taller than `i32::MAX` CSS pixels is a `RenderError`.
pub fn layout_fragment(document: &Html, viewport: Viewport) -> Result<Layout> {
    let page_width = viewport.width.max(PAGE_PADDING * 4);
    let mut y = PAGE_PADDING;
    let mut nodes = Vec::new();

    let sel = static_selector(FLOW_SELECTOR);
    for el in document.select(&sel) {
        let name = el.value().name();
        let (elem_type, scale, padding, border, margin) = match name {
            "h1" => (ElementType::Title, 2, 8, 0, 8),
            "h2" | "h3" => (ElementType::Heading, 2, 4, 0, 6),
            "tr" => {
                let header = el.select(&static_selector("th")).next().is_some();
                (ElementType::TableRow { header }, 1, 10, 1, 0)
            }
            "img" => {
                let src = el.value().attr("src").unwrap_or_default().trim().to_string();
                (ElementType::Image { src }, 1, 0, 0, 6)
            }
            _ => (ElementType::Paragraph, 1, 6, 0, 6),
        };

        let outer_w = page_width.saturating_sub(PAGE_PADDING * 2);
        if matches!(elem_type, ElementType::Image { .. }) {
            let w = attr_px(&el, "width").unwrap_or(160).min(outer_w);
            let h = attr_px(&el, "height").unwrap_or(120);
            push_node(&mut nodes, y, w, h, margin, border, padding, String::new(), elem_type, scale, None);
            y = advance(y, h, margin)?;
            continue;
        }

        let (text, box_h) = match elem_type {
            ElementType::TableRow { .. } => {
                let cells = el.select(&static_selector("th, td"))
                    .map(|c| normalize(&c.text().collect::<String>()))
                    .collect::<Vec<_>>()
                    .join(" | ");
                wrap_block(&cells, outer_w, padding + border, scale)
            }
            _ => wrap_block(&el.text().collect::<String>(), outer_w, padding + border, scale),
        };

        if text.is_empty() {
            continue;
        }
        let color = inline_color(&el);
        push_node(&mut nodes, y, outer_w, box_h, margin, border, padding, text, elem_type, scale, color);
        y = advance(y, box_h, margin)?;
    }

    let height = advance(y, PAGE_PADDING, 0)?;
    Ok(Layout { nodes, width: page_width, height })
}

/// Move the flow cursor past a block. Rect coordinates are `i32`, so the
/// cursor must stay within that range.
fn advance(y: u32, height: u32, margin: u32) -> Result<u32> {
    y.checked_add(height)
        .and_then(|v| v.checked_add(margin))
        .filter(|v| *v <= i32::MAX as u32)
        .ok_or_else(|| Error::RenderError(format!("layout overflow: block of height {} at y={}", height, y)))
}

#[allow(clippy::too_many_arguments)]
fn push_node(
    nodes: &mut Vec<LayoutNode>,
    y: u32,
    width: u32,
    height: u32,
    margin: u32,
    border: u32,
    padding: u32,
    text: String,
    elem_type: ElementType,
    scale: u32,
    color: Option<String>,
) {
    nodes.push(LayoutNode {
        lb: LayoutBox {
            rect: Rect { x: PAGE_PADDING as i32, y: y as i32, width, height },
            box_model: BoxModel { margin, border, padding },
        },
        text,
        elem_type,
        scale,
        color,
    });
}

/// Greedy word wrap on a fixed glyph grid. Returns the wrapped text and the
/// box height including padding.
fn wrap_block(raw: &str, outer_w: u32, inset: u32, scale: u32) -> (String, u32) {
    let cell = GLYPH_CELL * scale;
    let content_w = outer_w.saturating_sub(inset * 2);
    let chars_per_line = if content_w >= cell { (content_w / cell) as usize } else { 1 };

    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in raw.split_whitespace() {
        let cur_len = cur.chars().count();
        if cur_len + word.chars().count() + 1 > chars_per_line && !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    let line_count = (lines.len() as u32).max(1);
    (lines.join("\n"), line_count.saturating_mul(cell).saturating_add(inset * 2))
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn static_selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

fn attr_px(el: &ElementRef<'_>, name: &str) -> Option<u32> {
    el.value()
        .attr(name)
        .map(|v| v.trim().trim_end_matches("px"))
        .and_then(|v| v.parse::<u32>().ok())
}

fn inline_color(el: &ElementRef<'_>) -> Option<String> {
    let style = el.value().attr("style")?;
    style.split(';').find_map(|decl| {
        let (k, v) = decl.split_once(':')?;
        if k.trim().eq_ignore_ascii_case("color") {
            Some(v.trim().to_string())
        } else {
            None
        }
    })
}
