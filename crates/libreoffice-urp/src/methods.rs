//! Method tables for the UNO interfaces used to drive Writer.
//!
//! URP addresses a method by its index in the flattened interface, counting
//! inherited members first. `XInterface` takes 0..=2, so a direct subinterface
//! starts at 3. Attributes contribute a getter and, unless read-only, a setter.

use crate::types::{Type, TypeClass};

/// Parameter and return type shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Void,
    Bool,
    Short,
    Long,
    String,
    Type,
    Any,
    Interface(&'static str),
    Struct(&'static str),
    Sequence(&'static str),
}

impl Param {
    pub fn to_type(self) -> Type {
        match self {
            Param::Void => Type::void(),
            Param::Bool => Type::boolean(),
            Param::Short => Type::short(),
            Param::Long => Type::long(),
            Param::String => Type::string(),
            Param::Type => Type::meta(),
            Param::Any => Type::any(),
            Param::Interface(name) => Type::named(TypeClass::Interface, name),
            Param::Struct(name) => Type::structure(name),
            Param::Sequence(element) => Type::sequence_of(element),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Method {
    pub name: &'static str,
    pub index: u16,
    pub params: &'static [Param],
    pub returns: Param,
}

const fn method(
    name: &'static str,
    index: u16,
    params: &'static [Param],
    returns: Param,
) -> Method {
    Method {
        name,
        index,
        params,
        returns,
    }
}

pub mod names {
    pub const X_INTERFACE: &str = "com.sun.star.uno.XInterface";
    pub const X_PROTOCOL_PROPERTIES: &str = "com.sun.star.bridge.XProtocolProperties";
    pub const X_COMPONENT_CONTEXT: &str = "com.sun.star.uno.XComponentContext";
    pub const X_MULTI_COMPONENT_FACTORY: &str = "com.sun.star.lang.XMultiComponentFactory";
    pub const X_COMPONENT_LOADER: &str = "com.sun.star.frame.XComponentLoader";
    pub const X_COMPONENT: &str = "com.sun.star.lang.XComponent";
    pub const X_STORABLE: &str = "com.sun.star.frame.XStorable";
    pub const X_CLOSEABLE: &str = "com.sun.star.util.XCloseable";
    pub const X_SERVICE_INFO: &str = "com.sun.star.lang.XServiceInfo";
    pub const X_TEXT_DOCUMENT: &str = "com.sun.star.text.XTextDocument";
    pub const X_TEXT: &str = "com.sun.star.text.XText";
    pub const X_TEXT_RANGE: &str = "com.sun.star.text.XTextRange";
    pub const X_TEXT_CURSOR: &str = "com.sun.star.text.XTextCursor";
    pub const X_PARAGRAPH_CURSOR: &str = "com.sun.star.text.XParagraphCursor";
    pub const X_TEXT_CONTENT: &str = "com.sun.star.text.XTextContent";
    pub const X_TEXT_TABLE: &str = "com.sun.star.text.XTextTable";
    pub const X_TEXT_TABLES_SUPPLIER: &str = "com.sun.star.text.XTextTablesSupplier";
    pub const X_CELL_RANGE: &str = "com.sun.star.table.XCellRange";
    pub const X_PROPERTY_SET: &str = "com.sun.star.beans.XPropertySet";
    pub const X_MULTI_SERVICE_FACTORY: &str = "com.sun.star.lang.XMultiServiceFactory";
    pub const X_INDEX_ACCESS: &str = "com.sun.star.container.XIndexAccess";
    pub const X_NAME_ACCESS: &str = "com.sun.star.container.XNameAccess";
    pub const X_NAME_CONTAINER: &str = "com.sun.star.container.XNameContainer";
    pub const X_ENUMERATION_ACCESS: &str = "com.sun.star.container.XEnumerationAccess";
    pub const X_ENUMERATION: &str = "com.sun.star.container.XEnumeration";
    pub const X_REPLACEABLE: &str = "com.sun.star.util.XReplaceable";
    pub const X_SEARCH_DESCRIPTOR: &str = "com.sun.star.util.XSearchDescriptor";
    pub const X_REPLACE_DESCRIPTOR: &str = "com.sun.star.util.XReplaceDescriptor";
    pub const X_DOCUMENT_PROPERTIES_SUPPLIER: &str =
        "com.sun.star.document.XDocumentPropertiesSupplier";
    pub const X_DOCUMENT_PROPERTIES: &str = "com.sun.star.document.XDocumentProperties";
    pub const X_STYLE_FAMILIES_SUPPLIER: &str = "com.sun.star.style.XStyleFamiliesSupplier";
    pub const X_STYLE: &str = "com.sun.star.style.XStyle";

    pub const PROPERTY_VALUE: &str = "com.sun.star.beans.PropertyValue";
    pub const PROTOCOL_PROPERTY: &str = "com.sun.star.bridge.ProtocolProperty";
    pub const DATE_TIME: &str = "com.sun.star.util.DateTime";
}

use names::*;

pub mod x_interface {
    use super::*;
    pub const QUERY_INTERFACE: Method = method("queryInterface", 0, &[Param::Type], Param::Any);
}

/// Only reachable on the special `UrpProtocolProperties` object.
pub mod x_protocol_properties {
    use super::*;
    pub const REQUEST_CHANGE: Method = method("requestChange", 4, &[Param::Long], Param::Long);
    pub const COMMIT_CHANGE: Method = method(
        "commitChange",
        5,
        &[Param::Sequence(PROTOCOL_PROPERTY)],
        Param::Void,
    );
}

pub mod x_component_context {
    use super::*;
    pub const GET_SERVICE_MANAGER: Method = method(
        "getServiceManager",
        4,
        &[],
        Param::Interface(X_MULTI_COMPONENT_FACTORY),
    );
}

pub mod x_multi_component_factory {
    use super::*;
    pub const CREATE_INSTANCE_WITH_CONTEXT: Method = method(
        "createInstanceWithContext",
        3,
        &[Param::String, Param::Interface(X_COMPONENT_CONTEXT)],
        Param::Interface(X_INTERFACE),
    );
}

pub mod x_component_loader {
    use super::*;
    pub const LOAD_COMPONENT_FROM_URL: Method = method(
        "loadComponentFromURL",
        3,
        &[
            Param::String,
            Param::String,
            Param::Long,
            Param::Sequence(PROPERTY_VALUE),
        ],
        Param::Interface(X_COMPONENT),
    );
}

pub mod x_service_info {
    use super::*;
    pub const SUPPORTS_SERVICE: Method =
        method("supportsService", 4, &[Param::String], Param::Bool);
}

// XStorable: hasLocation 3, getLocation 4, isReadonly 5, store 6, storeAsURL 7, storeToURL 8
pub mod x_storable {
    use super::*;
    pub const STORE: Method = method("store", 6, &[], Param::Void);
    pub const STORE_AS_URL: Method = method(
        "storeAsURL",
        7,
        &[Param::String, Param::Sequence(PROPERTY_VALUE)],
        Param::Void,
    );
    pub const STORE_TO_URL: Method = method(
        "storeToURL",
        8,
        &[Param::String, Param::Sequence(PROPERTY_VALUE)],
        Param::Void,
    );
}

// XCloseable extends XCloseBroadcaster (add/removeCloseListener 3, 4)
pub mod x_closeable {
    use super::*;
    pub const CLOSE: Method = method("close", 5, &[Param::Bool], Param::Void);
}

// XTextDocument extends frame::XModel, which adds 11 methods after XComponent's 3..=5.
pub mod x_text_document {
    use super::*;
    pub const GET_TEXT: Method = method("getText", 17, &[], Param::Interface(X_TEXT));
}

pub mod x_text_range {
    use super::*;
    pub const GET_START: Method = method("getStart", 4, &[], Param::Interface(X_TEXT_RANGE));
    pub const GET_END: Method = method("getEnd", 5, &[], Param::Interface(X_TEXT_RANGE));
    pub const GET_STRING: Method = method("getString", 6, &[], Param::String);
    pub const SET_STRING: Method = method("setString", 7, &[Param::String], Param::Void);
}

// XText extends XSimpleText extends XTextRange (3..=7).
pub mod x_text {
    use super::*;
    pub const CREATE_TEXT_CURSOR: Method =
        method("createTextCursor", 8, &[], Param::Interface(X_TEXT_CURSOR));
    pub const CREATE_TEXT_CURSOR_BY_RANGE: Method = method(
        "createTextCursorByRange",
        9,
        &[Param::Interface(X_TEXT_RANGE)],
        Param::Interface(X_TEXT_CURSOR),
    );
    pub const INSERT_STRING: Method = method(
        "insertString",
        10,
        &[Param::Interface(X_TEXT_RANGE), Param::String, Param::Bool],
        Param::Void,
    );
    pub const INSERT_CONTROL_CHARACTER: Method = method(
        "insertControlCharacter",
        11,
        &[Param::Interface(X_TEXT_RANGE), Param::Short, Param::Bool],
        Param::Void,
    );
    pub const INSERT_TEXT_CONTENT: Method = method(
        "insertTextContent",
        12,
        &[
            Param::Interface(X_TEXT_RANGE),
            Param::Interface(X_TEXT_CONTENT),
            Param::Bool,
        ],
        Param::Void,
    );
    pub const REMOVE_TEXT_CONTENT: Method = method(
        "removeTextContent",
        13,
        &[Param::Interface(X_TEXT_CONTENT)],
        Param::Void,
    );
}

// XTextCursor extends XTextRange (3..=7).
pub mod x_text_cursor {
    use super::*;
    pub const GOTO_START: Method = method("gotoStart", 13, &[Param::Bool], Param::Void);
    pub const GOTO_END: Method = method("gotoEnd", 14, &[Param::Bool], Param::Void);
}

// XParagraphCursor extends XTextCursor (3..=15).
pub mod x_paragraph_cursor {
    use super::*;
    pub const GOTO_START_OF_PARAGRAPH: Method =
        method("gotoStartOfParagraph", 18, &[Param::Bool], Param::Bool);
    pub const GOTO_NEXT_PARAGRAPH: Method =
        method("gotoNextParagraph", 20, &[Param::Bool], Param::Bool);
}

pub mod x_property_set {
    use super::*;
    pub const SET_PROPERTY_VALUE: Method = method(
        "setPropertyValue",
        4,
        &[Param::String, Param::Any],
        Param::Void,
    );
    pub const GET_PROPERTY_VALUE: Method =
        method("getPropertyValue", 5, &[Param::String], Param::Any);
}

pub mod x_multi_service_factory {
    use super::*;
    pub const CREATE_INSTANCE: Method = method(
        "createInstance",
        3,
        &[Param::String],
        Param::Interface(X_INTERFACE),
    );
}

// XIndexAccess extends XElementAccess (getElementType 3, hasElements 4).
pub mod x_index_access {
    use super::*;
    pub const GET_COUNT: Method = method("getCount", 5, &[], Param::Long);
    pub const GET_BY_INDEX: Method = method("getByIndex", 6, &[Param::Long], Param::Any);
}

pub mod x_name_access {
    use super::*;
    pub const GET_BY_NAME: Method = method("getByName", 5, &[Param::String], Param::Any);
    pub const HAS_BY_NAME: Method = method("hasByName", 7, &[Param::String], Param::Bool);
}

// XNameContainer extends XNameReplace (replaceByName 8).
pub mod x_name_container {
    use super::*;
    pub const INSERT_BY_NAME: Method = method(
        "insertByName",
        9,
        &[Param::String, Param::Any],
        Param::Void,
    );
}

pub mod x_enumeration_access {
    use super::*;
    pub const CREATE_ENUMERATION: Method =
        method("createEnumeration", 5, &[], Param::Interface(X_ENUMERATION));
}

pub mod x_enumeration {
    use super::*;
    pub const HAS_MORE_ELEMENTS: Method = method("hasMoreElements", 3, &[], Param::Bool);
    pub const NEXT_ELEMENT: Method = method("nextElement", 4, &[], Param::Any);
}

pub mod x_text_tables_supplier {
    use super::*;
    pub const GET_TEXT_TABLES: Method =
        method("getTextTables", 3, &[], Param::Interface(X_NAME_ACCESS));
}

// XTextTable extends XTextContent (attach 6, getAnchor 7) extends XComponent (3..=5).
pub mod x_text_table {
    use super::*;
    pub const INITIALIZE: Method =
        method("initialize", 8, &[Param::Long, Param::Long], Param::Void);
    pub const GET_ROWS: Method = method(
        "getRows",
        9,
        &[],
        Param::Interface("com.sun.star.table.XTableRows"),
    );
    pub const GET_COLUMNS: Method = method(
        "getColumns",
        10,
        &[],
        Param::Interface("com.sun.star.table.XTableColumns"),
    );
}

pub mod x_cell_range {
    use super::*;
    pub const GET_CELL_BY_POSITION: Method = method(
        "getCellByPosition",
        3,
        &[Param::Long, Param::Long],
        Param::Interface("com.sun.star.table.XCell"),
    );
}

// XReplaceable extends XSearchable (createSearchDescriptor 3, findAll 4,
// findFirst 5, findNext 6).
pub mod x_replaceable {
    use super::*;
    pub const FIND_ALL: Method = method(
        "findAll",
        4,
        &[Param::Interface(X_SEARCH_DESCRIPTOR)],
        Param::Interface(X_INDEX_ACCESS),
    );
    pub const FIND_FIRST: Method = method(
        "findFirst",
        5,
        &[Param::Interface(X_SEARCH_DESCRIPTOR)],
        Param::Interface(X_INTERFACE),
    );
    pub const CREATE_REPLACE_DESCRIPTOR: Method = method(
        "createReplaceDescriptor",
        7,
        &[],
        Param::Interface(X_REPLACE_DESCRIPTOR),
    );
    pub const REPLACE_ALL: Method = method(
        "replaceAll",
        8,
        &[Param::Interface(X_SEARCH_DESCRIPTOR)],
        Param::Long,
    );
}

// XSearchDescriptor extends XPropertySet (3..=9).
pub mod x_search_descriptor {
    use super::*;
    pub const SET_SEARCH_STRING: Method =
        method("setSearchString", 11, &[Param::String], Param::Void);
}

pub mod x_replace_descriptor {
    use super::*;
    pub const SET_REPLACE_STRING: Method =
        method("setReplaceString", 13, &[Param::String], Param::Void);
}

pub mod x_document_properties_supplier {
    use super::*;
    pub const GET_DOCUMENT_PROPERTIES: Method = method(
        "getDocumentProperties",
        3,
        &[],
        Param::Interface(X_DOCUMENT_PROPERTIES),
    );
}

/// Attribute accessors, in IDL order: Author, Generator, CreationDate,
/// Title, Subject, Description, Keywords, Language, ModifiedBy,
/// ModificationDate.
pub mod x_document_properties {
    use super::*;
    pub const GET_AUTHOR: Method = method("getAuthor", 3, &[], Param::String);
    pub const SET_AUTHOR: Method = method("setAuthor", 4, &[Param::String], Param::Void);
    pub const GET_CREATION_DATE: Method = method("getCreationDate", 7, &[], Param::Struct(DATE_TIME));
    pub const GET_TITLE: Method = method("getTitle", 9, &[], Param::String);
    pub const SET_TITLE: Method = method("setTitle", 10, &[Param::String], Param::Void);
    pub const GET_SUBJECT: Method = method("getSubject", 11, &[], Param::String);
    pub const SET_SUBJECT: Method = method("setSubject", 12, &[Param::String], Param::Void);
    pub const GET_DESCRIPTION: Method = method("getDescription", 13, &[], Param::String);
    pub const SET_DESCRIPTION: Method =
        method("setDescription", 14, &[Param::String], Param::Void);
    pub const GET_KEYWORDS: Method = method("getKeywords", 15, &[], Param::Sequence("string"));
    pub const SET_KEYWORDS: Method =
        method("setKeywords", 16, &[Param::Sequence("string")], Param::Void);
    pub const GET_MODIFIED_BY: Method = method("getModifiedBy", 19, &[], Param::String);
    pub const GET_MODIFICATION_DATE: Method =
        method("getModificationDate", 21, &[], Param::Struct(DATE_TIME));
}

pub mod x_style_families_supplier {
    use super::*;
    pub const GET_STYLE_FAMILIES: Method =
        method("getStyleFamilies", 3, &[], Param::Interface(X_NAME_ACCESS));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_params_name_their_element() {
        let ty = x_storable::STORE_TO_URL.params[1].to_type();
        assert_eq!(ty.class, TypeClass::Sequence);
        assert_eq!(ty.name, "[]com.sun.star.beans.PropertyValue");
    }

    #[test]
    fn inherited_indices_follow_the_base_interfaces() {
        assert!(x_text::CREATE_TEXT_CURSOR.index > x_text_range::SET_STRING.index);
        assert!(x_search_descriptor::SET_SEARCH_STRING.index > x_property_set::GET_PROPERTY_VALUE.index);
        assert_eq!(
            x_replace_descriptor::SET_REPLACE_STRING.index,
            x_search_descriptor::SET_SEARCH_STRING.index + 2
        );
    }
}
