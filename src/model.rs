// ABOUTME: Serde data models for Notion API objects
// ABOUTME: Tolerant parsing with optional fields; unknown tags map to explicit variants

use serde::{Deserialize, Deserializer};

/// One span of text with uniform inline styling and an optional link target.
#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub code: bool,
}

/// File and media payloads carry their URL under a tag-dependent key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileSource {
    External { external: FileUrl },
    File { file: FileUrl },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileUrl {
    pub url: String,
}

impl FileSource {
    pub fn url(&self) -> &str {
        match self {
            FileSource::External { external } => &external.url,
            FileSource::File { file } => &file.url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    Emoji { emoji: String },
    #[serde(other)]
    Other,
}

// ──────────────────────────────────────────────
// Blocks
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToDoContent {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalloutContent {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeContent {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EquationContent {
    pub expression: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub caption: Vec<RichText>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub source: FileSource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkContent {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildRefContent {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableContent {
    #[serde(default)]
    pub has_column_header: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRowContent {
    #[serde(default)]
    pub cells: Vec<Vec<RichText>>,
}

/// Closed set of block tags. The wire format keys each payload by its tag
/// name (`{"type": "paragraph", "paragraph": {...}}`); unrecognized tags land
/// on `Unknown` so new upstream block types degrade to "renders nothing"
/// instead of failing the whole page.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph {
        paragraph: TextContent,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        heading_1: TextContent,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        heading_2: TextContent,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        heading_3: TextContent,
    },
    BulletedListItem {
        bulleted_list_item: TextContent,
    },
    NumberedListItem {
        numbered_list_item: TextContent,
    },
    ToDo {
        to_do: ToDoContent,
    },
    Toggle {
        toggle: TextContent,
    },
    Quote {
        quote: TextContent,
    },
    Callout {
        callout: CalloutContent,
    },
    Code {
        code: CodeContent,
    },
    Divider,
    Equation {
        equation: EquationContent,
    },
    Image {
        image: MediaContent,
    },
    Video {
        video: MediaContent,
    },
    File {
        file: MediaContent,
    },
    Pdf {
        pdf: MediaContent,
    },
    Bookmark {
        bookmark: LinkContent,
    },
    Embed {
        embed: LinkContent,
    },
    LinkPreview {
        link_preview: LinkContent,
    },
    ChildPage {
        child_page: ChildRefContent,
    },
    ChildDatabase {
        child_database: ChildRefContent,
    },
    Table {
        table: TableContent,
    },
    TableRow {
        table_row: TableRowContent,
    },
    ColumnList,
    Column,
    SyncedBlock,
    Breadcrumb,
    TableOfContents,
    Template,
    LinkToPage,
    Unsupported,
    #[serde(other)]
    Unknown,
}

/// One block as it comes off the wire, children not yet attached.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub id: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub kind: BlockKind,
}

/// One node of the fetched content tree. Children are fetched before the
/// node is constructed, so a `Block` is always complete.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub children: Vec<Block>,
}

// ──────────────────────────────────────────────
// Page properties
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileRef {
    External { external: FileUrl },
    File { file: FileUrl },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaValue {
    String { string: Option<String> },
    Number { number: Option<f64> },
    Boolean { boolean: Option<bool> },
    Date { date: Option<DateValue> },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollupValue {
    Number { number: Option<f64> },
    Date { date: Option<DateValue> },
    Array { array: Vec<PropertyValue> },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniqueId {
    #[serde(default)]
    pub prefix: Option<String>,
    pub number: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub state: Option<String>,
}

/// Closed set of property tags. Serialization is total: every variant maps
/// to a value, `Unknown` maps to null, never an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    Select { select: Option<SelectOption> },
    Status { status: Option<SelectOption> },
    MultiSelect { multi_select: Vec<SelectOption> },
    Date { date: Option<DateValue> },
    Checkbox { checkbox: bool },
    Number { number: Option<f64> },
    People { people: Vec<User> },
    Relation { relation: Vec<RelationRef> },
    Files { files: Vec<FileRef> },
    Url { url: Option<String> },
    Email { email: Option<String> },
    PhoneNumber { phone_number: Option<String> },
    Formula { formula: FormulaValue },
    Rollup { rollup: RollupValue },
    CreatedTime { created_time: String },
    LastEditedTime { last_edited_time: String },
    CreatedBy { created_by: User },
    LastEditedBy { last_edited_by: User },
    UniqueId { unique_id: UniqueId },
    Verification { verification: Option<Verification> },
    #[serde(other)]
    Unknown,
}

/// Property name → value, in display order.
pub type Properties = Vec<(String, PropertyValue)>;

/// A remote page: id, canonical URL, modification stamp, and typed
/// properties in display order.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: String,
    pub last_edited_time: String,
    #[serde(default, deserialize_with = "ordered_properties")]
    pub properties: Properties,
}

// JSON objects lose insertion order through map types; collect entries as
// they arrive instead.
fn ordered_properties<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    struct PropertiesVisitor;

    impl<'de> serde::de::Visitor<'de> for PropertiesVisitor {
        type Value = Properties;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a map of property values")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, PropertyValue>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(PropertiesVisitor)
}

/// A database as returned by search.
#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_block_deserialize_paragraph() {
        let json = r#"{
            "id": "b1",
            "type": "paragraph",
            "has_children": false,
            "paragraph": {
                "rich_text": [
                    {"plain_text": "Hello", "annotations": {"bold": true}, "href": null}
                ]
            }
        }"#;
        let block: RawBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.id, "b1");
        assert!(!block.has_children);
        match block.kind {
            BlockKind::Paragraph { paragraph } => {
                assert_eq!(paragraph.rich_text[0].plain_text, "Hello");
                assert!(paragraph.rich_text[0].annotations.bold);
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_block_unknown_type() {
        let json = r#"{"id": "b2", "type": "ai_block", "ai_block": {}}"#;
        let block: RawBlock = serde_json::from_str(json).unwrap();
        assert!(matches!(block.kind, BlockKind::Unknown));
    }

    #[test]
    fn test_heading_tags_roundtrip() {
        let json = r#"{"id": "b3", "type": "heading_2", "heading_2": {"rich_text": []}}"#;
        let block: RawBlock = serde_json::from_str(json).unwrap();
        assert!(matches!(block.kind, BlockKind::Heading2 { .. }));
    }

    #[test]
    fn test_media_source_variants() {
        let external = r#"{
            "id": "b4", "type": "image",
            "image": {"type": "external", "external": {"url": "https://example.com/a.png"}, "caption": []}
        }"#;
        let block: RawBlock = serde_json::from_str(external).unwrap();
        match block.kind {
            BlockKind::Image { image } => assert_eq!(image.source.url(), "https://example.com/a.png"),
            other => panic!("expected image, got {:?}", other),
        }

        let hosted = r#"{
            "id": "b5", "type": "file",
            "file": {"type": "file", "file": {"url": "https://files.example.com/x"}, "name": "x.csv"}
        }"#;
        let block: RawBlock = serde_json::from_str(hosted).unwrap();
        match block.kind {
            BlockKind::File { file } => {
                assert_eq!(file.source.url(), "https://files.example.com/x");
                assert_eq!(file.name.as_deref(), Some("x.csv"));
            }
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[test]
    fn test_property_unknown_type() {
        let json = r#"{"type": "ai_summary", "ai_summary": {}}"#;
        let prop: PropertyValue = serde_json::from_str(json).unwrap();
        assert!(matches!(prop, PropertyValue::Unknown));
    }

    #[test]
    fn test_page_properties_preserve_order() {
        let json = r#"{
            "id": "p1",
            "url": "https://notion.so/p1",
            "last_edited_time": "2024-01-15T10:30:00.000Z",
            "properties": {
                "Zeta": {"type": "checkbox", "checkbox": true},
                "Alpha": {"type": "number", "number": 3},
                "Name": {"type": "title", "title": []}
            }
        }"#;
        let page: Page = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = page.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Name"]);
    }

    #[test]
    fn test_page_minimal() {
        let json = r#"{"id": "p2", "last_edited_time": "2024-01-01T00:00:00.000Z"}"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.id, "p2");
        assert!(page.url.is_empty());
        assert!(page.properties.is_empty());
    }

    #[test]
    fn test_rollup_recursion() {
        let json = r#"{
            "type": "rollup",
            "rollup": {
                "type": "array",
                "array": [
                    {"type": "number", "number": 7},
                    {"type": "select", "select": {"name": "Done"}}
                ]
            }
        }"#;
        let prop: PropertyValue = serde_json::from_str(json).unwrap();
        match prop {
            PropertyValue::Rollup {
                rollup: RollupValue::Array { array },
            } => assert_eq!(array.len(), 2),
            other => panic!("expected rollup array, got {:?}", other),
        }
    }
}
