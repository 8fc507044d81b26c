//! UNO constants and structs used for Writer automation, export filter
//! selection and file URLs.
//!
//! Property values sent through `XPropertySet::setPropertyValue` travel as
//! `any`, so the helpers in [`value`] return values already wrapped.

use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use libreoffice_urp::types::{Type, UnoValue};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use writer_protocol::{Alignment, DocType};

pub mod service {
    pub const TEXT_TABLE: &str = "com.sun.star.text.TextTable";
    pub const TEXT_GRAPHIC_OBJECT: &str = "com.sun.star.text.TextGraphicObject";
    pub const PARAGRAPH_STYLE: &str = "com.sun.star.style.ParagraphStyle";
    pub const TEXT_DOCUMENT: &str = "com.sun.star.text.TextDocument";
    pub const SPREADSHEET_DOCUMENT: &str = "com.sun.star.sheet.SpreadsheetDocument";
    pub const PRESENTATION_DOCUMENT: &str = "com.sun.star.presentation.PresentationDocument";
}

pub mod enum_type {
    pub const FONT_SLANT: &str = "com.sun.star.awt.FontSlant";
    pub const PARAGRAPH_ADJUST: &str = "com.sun.star.style.ParagraphAdjust";
    pub const BREAK_TYPE: &str = "com.sun.star.style.BreakType";
    pub const ANCHOR_TYPE: &str = "com.sun.star.text.TextContentAnchorType";
}

pub mod struct_type {
    pub const SIZE: &str = "com.sun.star.awt.Size";
    pub const TABLE_BORDER2: &str = "com.sun.star.table.TableBorder2";
}

/// `com.sun.star.awt.FontWeight`, sent as float.
pub mod font_weight {
    pub const NORMAL: f32 = 100.0;
    pub const BOLD: f32 = 150.0;
}

/// `com.sun.star.awt.FontSlant` ordinals.
pub mod font_slant {
    pub const NONE: i32 = 0;
    pub const ITALIC: i32 = 2;
}

pub mod font_underline {
    pub const NONE: i16 = 0;
    pub const SINGLE: i16 = 1;
}

/// `com.sun.star.text.ControlCharacter`.
pub const PARAGRAPH_BREAK: i16 = 0;

/// `com.sun.star.style.BreakType::PAGE_BEFORE`.
pub const PAGE_BEFORE: i32 = 4;

/// `com.sun.star.text.TextContentAnchorType::AS_CHARACTER`.
pub const AS_CHARACTER: i32 = 1;

/// `com.sun.star.table.BorderLineStyle::SOLID`.
pub const SOLID: i16 = 0;

pub const HEADER_GRAY: i32 = 0xCC_CCCC;
pub const WHITE: i32 = 0xFF_FFFF;

/// `com.sun.star.style.ParagraphAdjust` ordinal.
pub fn paragraph_adjust(alignment: Alignment) -> i32 {
    match alignment {
        Alignment::Left => 0,
        Alignment::Right => 1,
        Alignment::Justify => 2,
        Alignment::Center => 3,
    }
}

/// `com.sun.star.table.BorderLine2`.
///
/// Wire format: Struct(Long color, Short innerLineWidth, Short outerLineWidth,
/// Short lineDistance, Short lineStyle, Long lineWidth)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderLine2 {
    pub color: i32,
    pub line_style: i16,
    pub line_width: i32,
}

impl BorderLine2 {
    pub fn solid(line_width: i32) -> Self {
        Self {
            color: 0,
            line_style: SOLID,
            line_width,
        }
    }

    pub fn to_uno(&self) -> UnoValue {
        UnoValue::Struct(vec![
            UnoValue::Long(self.color),
            UnoValue::Short(0),
            UnoValue::Short(0),
            UnoValue::Short(0),
            UnoValue::Short(self.line_style),
            UnoValue::Long(self.line_width),
        ])
    }
}

/// `com.sun.star.table.TableBorder2` with the same line on every edge and
/// inner line, distance left invalid.
pub fn table_border(line: BorderLine2) -> UnoValue {
    let mut members = Vec::with_capacity(14);
    // Top, Bottom, Left, Right, Horizontal, Vertical
    for _ in 0..6 {
        members.push(line.to_uno());
        members.push(UnoValue::Bool(true));
    }
    members.push(UnoValue::Short(0));
    members.push(UnoValue::Bool(false));
    UnoValue::Struct(members)
}

/// Values ready for `setPropertyValue`.
pub mod value {
    use super::*;

    pub fn float(v: f32) -> UnoValue {
        UnoValue::any(Type::float(), UnoValue::Float(v))
    }

    pub fn long(v: i32) -> UnoValue {
        UnoValue::any(Type::long(), UnoValue::Long(v))
    }

    pub fn short(v: i16) -> UnoValue {
        UnoValue::any(Type::short(), UnoValue::Short(v))
    }

    pub fn boolean(v: bool) -> UnoValue {
        UnoValue::any(Type::boolean(), UnoValue::Bool(v))
    }

    pub fn string(v: &str) -> UnoValue {
        UnoValue::any(Type::string(), UnoValue::from(v))
    }

    pub fn enumeration(type_name: &str, ordinal: i32) -> UnoValue {
        UnoValue::any(Type::enumeration(type_name), UnoValue::Enum(ordinal))
    }

    pub fn size(width: i32, height: i32) -> UnoValue {
        UnoValue::any(
            Type::structure(struct_type::SIZE),
            UnoValue::Struct(vec![UnoValue::Long(width), UnoValue::Long(height)]),
        )
    }

    pub fn border(line: BorderLine2) -> UnoValue {
        UnoValue::any(Type::structure(struct_type::TABLE_BORDER2), table_border(line))
    }

    pub fn interface(interface: &str, oid: &str) -> UnoValue {
        UnoValue::any(Type::interface(interface), UnoValue::Interface(oid.to_owned()))
    }
}

/// URL handed to `loadComponentFromURL` for a new document.
pub fn factory_url(doc_type: DocType) -> &'static str {
    match doc_type {
        DocType::Text => "private:factory/swriter",
        DocType::Calc => "private:factory/scalc",
        DocType::Impress => "private:factory/simpress",
    }
}

/// Export filter for a file extension and document kind. `None` stores in
/// the native format.
pub fn export_filter(path: &Path, doc_type: DocType) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match (doc_type, ext.as_str()) {
        (DocType::Text, "odt") => "writer8",
        (DocType::Text, "docx") => "MS Word 2007 XML",
        (DocType::Text, "doc") => "MS Word 97",
        (DocType::Text, "rtf") => "Rich Text Format",
        (DocType::Text, "txt") => "Text",
        (DocType::Text, "html" | "htm") => "HTML (StarWriter)",
        (DocType::Text, "pdf") => "writer_pdf_Export",
        (DocType::Calc, "ods") => "calc8",
        (DocType::Calc, "xlsx") => "Calc MS Excel 2007 XML",
        (DocType::Calc, "xls") => "MS Excel 97",
        (DocType::Calc, "csv") => "Text - txt - csv (StarCalc)",
        (DocType::Calc, "pdf") => "calc_pdf_Export",
        (DocType::Impress, "odp") => "impress8",
        (DocType::Impress, "pptx") => "Impress MS PowerPoint 2007 XML",
        (DocType::Impress, "ppt") => "MS PowerPoint 97",
        (DocType::Impress, "pdf") => "impress_pdf_Export",
        _ => return None,
    })
}

/// Characters escaped in the path of a `file://` URL.
const PATH_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// `file://` URL for an absolute path.
pub fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("file://{}", utf8_percent_encode(&raw, PATH_SET))
}

/// RFC 3339 text for a `com.sun.star.util.DateTime`; `None` for the zero
/// date LibreOffice uses when a property was never set.
pub fn date_time_rfc3339(value: &UnoValue) -> Option<String> {
    let m = value.members()?;
    if m.len() != 8 {
        return None;
    }
    let field = |i: usize| m[i].as_i64();
    let nanos = u32::try_from(field(0)?).ok()?;
    let (sec, min, hour) = (field(1)? as u32, field(2)? as u32, field(3)? as u32);
    let (day, month, year) = (field(4)? as u32, field(5)? as u32, field(6)? as i32);
    let is_utc = m[7].as_bool().unwrap_or(false);
    if year == 0 {
        return None;
    }
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_nano_opt(hour, min, sec, nanos)?;
    Some(if is_utc {
        Utc.from_utc_datetime(&naive).to_rfc3339()
    } else {
        Local.from_local_datetime(&naive).earliest()?.to_rfc3339()
    })
}
