// ABOUTME: Maps typed page property values to plain JSON scalars/arrays
// ABOUTME: Total serialization; unknown variants become null, never an error

use crate::model::{
    DateValue, FileRef, FormulaValue, Properties, PropertyValue, RichText, RollupValue, User,
};
use serde_json::{json, Value};

/// Concatenate the plain text of a run sequence, styling ignored.
pub fn plain_text(runs: &[RichText]) -> String {
    runs.iter().map(|run| run.plain_text.as_str()).collect()
}

fn display_name(user: &User) -> String {
    user.name.clone().unwrap_or_else(|| user.id.clone())
}

fn date_value(date: &Option<DateValue>) -> Value {
    match date {
        None => Value::Null,
        Some(d) => match &d.end {
            Some(end) => json!({ "start": d.start, "end": end }),
            None => json!(d.start),
        },
    }
}

/// Serialize one property value to a plain JSON value.
pub fn serialize_property(prop: &PropertyValue) -> Value {
    match prop {
        PropertyValue::Title { title } => json!(plain_text(title)),
        PropertyValue::RichText { rich_text } => json!(plain_text(rich_text)),
        PropertyValue::Select { select } => match select {
            Some(option) => json!(option.name),
            None => Value::Null,
        },
        PropertyValue::Status { status } => match status {
            Some(option) => json!(option.name),
            None => Value::Null,
        },
        PropertyValue::MultiSelect { multi_select } => {
            json!(multi_select.iter().map(|o| o.name.clone()).collect::<Vec<_>>())
        }
        PropertyValue::Date { date } => date_value(date),
        PropertyValue::Checkbox { checkbox } => json!(checkbox),
        PropertyValue::Number { number } => json!(number),
        PropertyValue::People { people } => {
            json!(people.iter().map(display_name).collect::<Vec<_>>())
        }
        PropertyValue::Relation { relation } => {
            json!(relation.iter().map(|r| r.id.clone()).collect::<Vec<_>>())
        }
        PropertyValue::Files { files } => {
            let urls: Vec<String> = files
                .iter()
                .filter_map(|f| match f {
                    FileRef::External { external } => Some(external.url.clone()),
                    FileRef::File { file } => Some(file.url.clone()),
                    FileRef::Unknown => None,
                })
                .collect();
            json!(urls)
        }
        PropertyValue::Url { url } => json!(url),
        PropertyValue::Email { email } => json!(email),
        PropertyValue::PhoneNumber { phone_number } => json!(phone_number),
        PropertyValue::Formula { formula } => serialize_formula(formula),
        PropertyValue::Rollup { rollup } => serialize_rollup(rollup),
        PropertyValue::CreatedTime { created_time } => json!(created_time),
        PropertyValue::LastEditedTime { last_edited_time } => json!(last_edited_time),
        PropertyValue::CreatedBy { created_by } => json!(display_name(created_by)),
        PropertyValue::LastEditedBy { last_edited_by } => json!(display_name(last_edited_by)),
        PropertyValue::UniqueId { unique_id } => match &unique_id.prefix {
            Some(prefix) => json!(format!("{}-{}", prefix, unique_id.number)),
            None => json!(unique_id.number),
        },
        PropertyValue::Verification { verification } => match verification {
            Some(v) => json!(v.state),
            None => Value::Null,
        },
        PropertyValue::Unknown => Value::Null,
    }
}

fn serialize_formula(formula: &FormulaValue) -> Value {
    match formula {
        FormulaValue::String { string } => json!(string),
        FormulaValue::Number { number } => json!(number),
        FormulaValue::Boolean { boolean } => json!(boolean),
        FormulaValue::Date { date } => match date {
            Some(d) => json!(d.start),
            None => Value::Null,
        },
        FormulaValue::Unknown => Value::Null,
    }
}

fn serialize_rollup(rollup: &RollupValue) -> Value {
    match rollup {
        RollupValue::Number { number } => json!(number),
        RollupValue::Date { date } => match date {
            Some(d) => json!(d.start),
            None => Value::Null,
        },
        RollupValue::Array { array } => {
            json!(array.iter().map(serialize_property).collect::<Vec<_>>())
        }
        RollupValue::Unknown => Value::Null,
    }
}

/// Find the title-typed property, concatenate its runs and trim. Empty
/// string when no title property exists.
pub fn extract_title(properties: &Properties) -> String {
    for (_, prop) in properties {
        if let PropertyValue::Title { title } = prop {
            return plain_text(title).trim().to_string();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Annotations, SelectOption, UniqueId};

    fn run(text: &str) -> RichText {
        RichText {
            plain_text: text.into(),
            annotations: Annotations::default(),
            href: None,
        }
    }

    fn parse(json: &str) -> PropertyValue {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_serialize_text_properties() {
        let title = PropertyValue::Title {
            title: vec![run("My "), run("Page")],
        };
        assert_eq!(serialize_property(&title), json!("My Page"));

        let rich = parse(r#"{"type": "rich_text", "rich_text": [{"plain_text": "note"}]}"#);
        assert_eq!(serialize_property(&rich), json!("note"));
    }

    #[test]
    fn test_serialize_select_and_status() {
        let select = PropertyValue::Select {
            select: Some(SelectOption { name: "High".into() }),
        };
        assert_eq!(serialize_property(&select), json!("High"));

        let empty = PropertyValue::Select { select: None };
        assert_eq!(serialize_property(&empty), Value::Null);

        let status = parse(r#"{"type": "status", "status": {"name": "In progress"}}"#);
        assert_eq!(serialize_property(&status), json!("In progress"));
    }

    #[test]
    fn test_serialize_multi_select() {
        let prop = parse(
            r#"{"type": "multi_select", "multi_select": [{"name": "a"}, {"name": "b"}]}"#,
        );
        assert_eq!(serialize_property(&prop), json!(["a", "b"]));
    }

    #[test]
    fn test_serialize_date_variants() {
        let start_only = parse(r#"{"type": "date", "date": {"start": "2024-01-01"}}"#);
        assert_eq!(serialize_property(&start_only), json!("2024-01-01"));

        let range = parse(
            r#"{"type": "date", "date": {"start": "2024-01-01", "end": "2024-01-05"}}"#,
        );
        assert_eq!(
            serialize_property(&range),
            json!({"start": "2024-01-01", "end": "2024-01-05"})
        );

        let empty = parse(r#"{"type": "date", "date": null}"#);
        assert_eq!(serialize_property(&empty), Value::Null);
    }

    #[test]
    fn test_serialize_scalars() {
        assert_eq!(
            serialize_property(&parse(r#"{"type": "checkbox", "checkbox": true}"#)),
            json!(true)
        );
        assert_eq!(
            serialize_property(&parse(r#"{"type": "number", "number": 42.5}"#)),
            json!(42.5)
        );
        assert_eq!(
            serialize_property(&parse(r#"{"type": "number", "number": null}"#)),
            Value::Null
        );
        assert_eq!(
            serialize_property(&parse(r#"{"type": "url", "url": "https://example.com"}"#)),
            json!("https://example.com")
        );
        assert_eq!(
            serialize_property(&parse(r#"{"type": "email", "email": null}"#)),
            Value::Null
        );
    }

    #[test]
    fn test_serialize_people_prefers_name() {
        let prop = parse(
            r#"{"type": "people", "people": [{"id": "u1", "name": "Alice"}, {"id": "u2"}]}"#,
        );
        assert_eq!(serialize_property(&prop), json!(["Alice", "u2"]));
    }

    #[test]
    fn test_serialize_created_by_falls_back_to_id() {
        let prop = parse(r#"{"type": "created_by", "created_by": {"id": "u3"}}"#);
        assert_eq!(serialize_property(&prop), json!("u3"));
    }

    #[test]
    fn test_serialize_files_drops_unresolvable() {
        let prop = parse(
            r#"{"type": "files", "files": [
                {"type": "external", "external": {"url": "https://a"}},
                {"type": "file", "file": {"url": "https://b"}},
                {"type": "whatever"}
            ]}"#,
        );
        assert_eq!(serialize_property(&prop), json!(["https://a", "https://b"]));
    }

    #[test]
    fn test_serialize_formula_recursion() {
        let number = parse(r#"{"type": "formula", "formula": {"type": "number", "number": 9}}"#);
        assert_eq!(serialize_property(&number), json!(9.0));

        let date = parse(
            r#"{"type": "formula", "formula": {"type": "date", "date": {"start": "2024-02-02"}}}"#,
        );
        assert_eq!(serialize_property(&date), json!("2024-02-02"));

        let unknown = parse(r#"{"type": "formula", "formula": {"type": "mystery"}}"#);
        assert_eq!(serialize_property(&unknown), Value::Null);
    }

    #[test]
    fn test_serialize_rollup_array_recursion() {
        let prop = parse(
            r#"{"type": "rollup", "rollup": {"type": "array", "array": [
                {"type": "number", "number": 1},
                {"type": "select", "select": {"name": "x"}}
            ]}}"#,
        );
        assert_eq!(serialize_property(&prop), json!([1.0, "x"]));
    }

    #[test]
    fn test_serialize_unique_id() {
        let with_prefix = PropertyValue::UniqueId {
            unique_id: UniqueId {
                prefix: Some("TASK".into()),
                number: 12,
            },
        };
        assert_eq!(serialize_property(&with_prefix), json!("TASK-12"));

        let bare = PropertyValue::UniqueId {
            unique_id: UniqueId {
                prefix: None,
                number: 12,
            },
        };
        assert_eq!(serialize_property(&bare), json!(12));
    }

    #[test]
    fn test_serialize_unknown_is_null() {
        assert_eq!(serialize_property(&PropertyValue::Unknown), Value::Null);
    }

    #[test]
    fn test_extract_title() {
        let properties: Properties = vec![
            (
                "Status".into(),
                parse(r#"{"type": "status", "status": {"name": "Done"}}"#),
            ),
            (
                "Name".into(),
                PropertyValue::Title {
                    title: vec![run("  Hello "), run("World  ")],
                },
            ),
        ];
        assert_eq!(extract_title(&properties), "Hello World");
    }

    #[test]
    fn test_extract_title_missing() {
        let properties: Properties = vec![(
            "Done".into(),
            parse(r#"{"type": "checkbox", "checkbox": false}"#),
        )];
        assert_eq!(extract_title(&properties), "");
    }
}
