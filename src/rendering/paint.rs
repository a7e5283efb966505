/// Paint commands lowered from a layout

use crate::rendering::layout::{ElementType, Layout};

pub type Rgba = (u8, u8, u8, u8);

pub const DEFAULT_TEXT: Rgba = (0x11, 0x18, 0x27, 255);
const HEADER_FILL: Rgba = (0xf3, 0xf4, 0xf6, 255);
const CELL_BORDER: Rgba = (0xd1, 0xd5, 0xdb, 255);
const IMAGE_PLACEHOLDER: Rgba = (0xe5, 0xe7, 0xeb, 255);

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    StrokeRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        scale: u32,
        rgba: Rgba,
    },
}

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, or `transparent`.
pub fn parse_color(value: &str) -> Option<Rgba> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("transparent") {
        return Some((0, 0, 0, 0));
    }
    let hex = v.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut it = hex.chars().map(|c| channel(&format!("{c}{c}")));
            Some((it.next()??, it.next()??, it.next()??, 255))
        }
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255)),
        8 => Some((
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

/// Lower a layout to paint commands. `draw_image` decides per source whether
/// an image placeholder is painted (cross-origin policy lives in the backend).
pub fn paint_layout<F>(layout: &Layout, background: Rgba, mut draw_image: F) -> Vec<PaintCommand>
where
    F: FnMut(&str) -> bool,
{
    let mut cmds = vec![PaintCommand::SolidRect {
        x: 0,
        y: 0,
        width: layout.width,
        height: layout.height,
        rgba: background,
    }];

    for node in &layout.nodes {
        let r = &node.lb.rect;
        let inset = (node.lb.box_model.padding + node.lb.box_model.border) as i32;
        let text_rgba = node.color.as_deref().and_then(parse_color).unwrap_or(DEFAULT_TEXT);

        match &node.elem_type {
            ElementType::Image { src } => {
                if draw_image(src) {
                    cmds.push(PaintCommand::SolidRect {
                        x: r.x,
                        y: r.y,
                        width: r.width,
                        height: r.height,
                        rgba: IMAGE_PLACEHOLDER,
                    });
                }
                continue;
            }
            ElementType::TableRow { header } => {
                if *header {
                    cmds.push(PaintCommand::SolidRect {
                        x: r.x,
                        y: r.y,
                        width: r.width,
                        height: r.height,
                        rgba: HEADER_FILL,
                    });
                }
                cmds.push(PaintCommand::StrokeRect {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    rgba: CELL_BORDER,
                });
            }
            _ => {}
        }

        cmds.push(PaintCommand::Text {
            x: r.x.saturating_add(inset),
            y: r.y.saturating_add(inset),
            text: node.text.clone(),
            scale: node.scale,
            rgba: text_rgba,
        });
    }
    cmds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::layout_fragment;
    use scraper::Html;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_color("#ffffff"), Some((255, 255, 255, 255)));
        assert_eq!(parse_color("#fff"), Some((255, 255, 255, 255)));
        assert_eq!(parse_color("#11182780"), Some((0x11, 0x18, 0x27, 0x80)));
        assert_eq!(parse_color("transparent"), Some((0, 0, 0, 0)));
        assert_eq!(parse_color("white"), None);
        assert_eq!(parse_color("#12345"), None);
    }

    #[test]
    fn background_is_painted_first() {
        let layout = layout_fragment(&Html::parse_fragment("<p style='color: #374151'>Hi</p>"), crate::Viewport::default()).unwrap();
        let cmds = paint_layout(&layout, (255, 255, 255, 255), |_| true);
        match &cmds[0] {
            PaintCommand::SolidRect { rgba, .. } => assert_eq!(*rgba, (255, 255, 255, 255)),
            other => panic!("unexpected first command {:?}", other),
        }
        assert!(cmds.iter().any(|c| matches!(c, PaintCommand::Text { rgba: (0x37, 0x41, 0x51, 255), .. })));
    }

    #[test]
    fn rejected_images_are_not_painted() {
        let layout = layout_fragment(&Html::parse_fragment(r#"<img src="https://cdn.example/x.png">"#), crate::Viewport::default()).unwrap();
        let cmds = paint_layout(&layout, (255, 255, 255, 255), |_| false);
        assert_eq!(cmds.len(), 1);
    }
}
