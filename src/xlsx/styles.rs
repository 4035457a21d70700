//! `xl/styles.xml`: the fixed stylesheet written with every workbook, and
//! the parser and resolver used by the styled read path.

use log::warn;

use super::xml::{section, Element, ElementScanner};
use crate::style::{
    Alignment, BorderSide, BorderStyle, CellStyle, CellXf, FillStyle, FontStyle, ParsedStyles,
};

/// Minimal stylesheet: one font, the two fills Excel requires, one border
/// and a single `cellXfs` entry (index 0).
pub(crate) const STYLES_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
    "<fonts count=\"1\"><font><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font></fonts>",
    "<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>",
    "<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>",
    "<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
    "<cellXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/></cellXfs>",
    "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
    "</styleSheet>"
);

/// Parse the style tables out of a `styles.xml` document.
///
/// Unknown or malformed records still occupy their slot so that ids keep
/// lining up with the tables.
pub fn parse_styles(xml: &str) -> ParsedStyles {
    let num_fmts = ElementScanner::new(section(xml, "numFmts"), "numFmt")
        .filter_map(|fmt| {
            let id = fmt.attr_u32("numFmtId")?;
            let code = fmt.attr("formatCode")?;
            Some((id, code.into_owned()))
        })
        .collect();

    ParsedStyles {
        fonts: ElementScanner::new(section(xml, "fonts"), "font")
            .map(parse_font)
            .collect(),
        fills: ElementScanner::new(section(xml, "fills"), "fill")
            .map(parse_fill)
            .collect(),
        borders: ElementScanner::new(section(xml, "borders"), "border")
            .map(parse_border)
            .collect(),
        cell_xfs: ElementScanner::new(section(xml, "cellXfs"), "xf")
            .map(parse_xf)
            .collect(),
        num_fmts,
    }
}

/// `<b/>` and `<b val="1"/>` are on, `<b val="0"/>` is off.
fn flag(el: &Element<'_>, name: &str) -> bool {
    el.child(name)
        .map(|child| child.attr_bool("val").unwrap_or(true))
        .unwrap_or(false)
}

fn parse_font(font: Element<'_>) -> FontStyle {
    FontStyle {
        bold: flag(&font, "b"),
        italic: flag(&font, "i"),
        size: font.child("sz").and_then(|sz| sz.attr_f64("val")),
        color: font.child("color").and_then(parse_color),
    }
}

fn parse_fill(fill: Element<'_>) -> FillStyle {
    match fill.child("patternFill") {
        Some(pattern) => FillStyle {
            pattern: pattern.attr("patternType").map(|p| p.into_owned()),
            color: pattern.child("fgColor").and_then(parse_color),
        },
        None => FillStyle::default(),
    }
}

fn parse_border(border: Element<'_>) -> BorderStyle {
    let side = |name: &str| {
        let el = border.child(name)?;
        let style = el.attr("style").filter(|s| s != "none")?;
        Some(BorderSide {
            style: style.into_owned(),
            color: el.child("color").and_then(parse_color),
        })
    };
    BorderStyle {
        top: side("top"),
        bottom: side("bottom"),
        left: side("left"),
        right: side("right"),
    }
}

fn parse_xf(xf: Element<'_>) -> CellXf {
    CellXf {
        font_id: xf.attr_u32("fontId"),
        fill_id: xf.attr_u32("fillId"),
        border_id: xf.attr_u32("borderId"),
        num_fmt_id: xf.attr_u32("numFmtId"),
        apply_font: xf.attr_bool("applyFont").unwrap_or(false),
        apply_fill: xf.attr_bool("applyFill").unwrap_or(false),
        apply_border: xf.attr_bool("applyBorder").unwrap_or(false),
        apply_alignment: xf.attr_bool("applyAlignment").unwrap_or(false),
        alignment: xf.child("alignment").map(|a| Alignment {
            horizontal: a.attr("horizontal").map(|h| h.into_owned()),
            vertical: a.attr("vertical").map(|v| v.into_owned()),
            wrap_text: a.attr_bool("wrapText").unwrap_or(false),
        }),
    }
}

/// `rgb="FF0000FF"` (ARGB) or `rgb="0000FF"` as `#0000FF`. Theme and
/// indexed colours are not resolved.
fn parse_color(el: Element<'_>) -> Option<String> {
    let rgb = el.raw_attr("rgb")?;
    if !rgb.bytes().all(|b| b.is_ascii_hexdigit()) {
        warn!("Invalid RGB color format: {}", rgb);
        return None;
    }
    let hex = match rgb.len() {
        8 => &rgb[2..],
        6 => rgb,
        _ => {
            warn!("Invalid RGB color format: {}", rgb);
            return None;
        }
    };
    Some(format!("#{}", hex.to_ascii_uppercase()))
}

/// Resolve `cellXfs[index]` into a [`CellStyle`].
///
/// Ids that point outside their table leave the field out. Returns `None`
/// when nothing resolves.
pub fn resolve_style(index: u32, styles: &ParsedStyles) -> Option<CellStyle> {
    let xf = styles.cell_xfs.get(index as usize)?;

    let font = xf
        .font_id
        .and_then(|id| styles.fonts.get(id as usize))
        .filter(|font| !font.is_default())
        .cloned();

    let fill = xf
        .fill_id
        .and_then(|id| styles.fills.get(id as usize))
        .filter(|fill| fill.color.is_some() && fill.pattern.as_deref() != Some("none"))
        .cloned();

    let border = xf
        .border_id
        .and_then(|id| styles.borders.get(id as usize))
        .filter(|border| border.has_any_side())
        .cloned();

    let number_format = xf
        .num_fmt_id
        .and_then(|id| styles.num_fmts.get(&id))
        .cloned();

    let style = CellStyle {
        font,
        fill,
        border,
        alignment: xf.alignment.clone(),
        number_format,
    };

    (!style.is_empty()).then_some(style)
}
