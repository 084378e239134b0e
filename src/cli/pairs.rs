//! `key=value` arguments that declare or modify report content.
//!
//! Declarations add a new entry under `report` (or `report.$query`).
//! Modifiers edit an entry that an earlier declaration or a configuration
//! file already created.

use serde_json::{Map, Value, json};

use crate::report::{IDENTITY_KEYS, QUERY_KEY};

/// Note used when truncation is first requested without one.
const DEFAULT_TRUNC_NOTE: &str = "(trimmed)";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PairError {
    #[error("malformed pair `{0}`: should be \"<name>=<value>\"")]
    BadPair(String),

    #[error("content `{0}` is specified more than once")]
    Redeclared(String),

    #[error("content `{0}` was not declared first")]
    Undeclared(String),

    #[error("`{flag}` does not apply to content `{name}`")]
    NotApplicable { flag: &'static str, name: String },

    #[error("malformed size `{0}`: should be an unsigned integer")]
    BadSize(String),
}

/// What a declaration creates.
#[derive(Debug, Clone, Copy)]
pub enum Declare {
    Arg,
    QueryArg,
    TextFile,
    BinaryFile,
    Field,
    MultilineField,
}

/// What a modifier changes.
#[derive(Debug, Clone, Copy)]
pub enum Modify {
    TruncBegin,
    TruncEnd,
    TruncNote,
    FieldDefault,
    FieldHint,
    FieldWarning,
}

impl Modify {
    fn flag(self) -> &'static str {
        match self {
            Self::TruncBegin => "--trunc-begin",
            Self::TruncEnd => "--trunc-end",
            Self::TruncNote => "--trunc-note",
            Self::FieldDefault => "--field-default",
            Self::FieldHint => "--field-hint",
            Self::FieldWarning => "--field-warning",
        }
    }
}

/// Split `name=value` at the first `=`. The name must be non-empty.
pub fn split_pair(arg: &str) -> Result<(&str, &str), PairError> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => Err(PairError::BadPair(arg.to_string())),
    }
}

/// Add a new content entry to `report`.
pub fn declare(report: &mut Map<String, Value>, what: Declare, arg: &str) -> Result<(), PairError> {
    let (name, value) = split_pair(arg)?;
    if name.starts_with('$') || IDENTITY_KEYS.contains(&name) {
        return Err(PairError::BadPair(arg.to_string()));
    }
    let in_query = report
        .get(QUERY_KEY)
        .and_then(Value::as_object)
        .is_some_and(|query| query.contains_key(name));
    if report.contains_key(name) || in_query {
        return Err(PairError::Redeclared(name.to_string()));
    }

    let entry = match what {
        Declare::Arg | Declare::QueryArg => Value::from(value),
        Declare::TextFile => json!({ "path": value, "content-type": "text/plain" }),
        Declare::BinaryFile => {
            json!({ "path": value, "content-type": "application/octet-stream" })
        }
        Declare::Field => json!({ "input": "text", "label": value }),
        Declare::MultilineField => json!({ "input": "multiline", "label": value }),
    };

    if matches!(what, Declare::QueryArg) {
        query_node(report)[name] = entry;
    } else {
        report.insert(name.to_string(), entry);
    }
    Ok(())
}

/// Edit an existing content entry in `report`.
pub fn modify(report: &mut Map<String, Value>, what: Modify, arg: &str) -> Result<(), PairError> {
    let (name, value) = split_pair(arg)?;
    let content = existing(report, what.flag(), name)?;

    match what {
        Modify::TruncBegin | Modify::TruncEnd | Modify::TruncNote => {
            if !content.contains_key("path") {
                return Err(not_applicable(what.flag(), name));
            }
            let truncate = truncate_node(content);
            match what {
                Modify::TruncBegin => truncate[0] = Value::from(size(value)?),
                Modify::TruncEnd => truncate[1] = Value::from(size(value)?),
                _ => truncate[2] = Value::from(value),
            }
        }
        Modify::FieldDefault | Modify::FieldHint | Modify::FieldWarning => {
            let input = content.get("input").and_then(Value::as_str);
            let applies = match what {
                Modify::FieldHint => input == Some("text"),
                _ => input.is_some(),
            };
            if !applies {
                return Err(not_applicable(what.flag(), name));
            }
            let key = match what {
                Modify::FieldDefault => "value",
                Modify::FieldHint => "placeholder",
                _ => "input_warning",
            };
            content.insert(key.to_string(), Value::from(value));
        }
    }
    Ok(())
}

/// Flag a field for save and restore.
pub fn store_field(report: &mut Map<String, Value>, name: &str) -> Result<(), PairError> {
    let content = existing(report, "--field-store", name)?;
    if !content.contains_key("input") {
        return Err(not_applicable("--field-store", name));
    }
    content.insert("persist".to_string(), Value::Bool(true));
    Ok(())
}

/// The declared entry `name`. Plain string content has nothing to modify.
fn existing<'r>(
    report: &'r mut Map<String, Value>,
    flag: &'static str,
    name: &str,
) -> Result<&'r mut Map<String, Value>, PairError> {
    match report.get_mut(name) {
        Some(Value::Object(content)) => Ok(content),
        Some(_) => Err(not_applicable(flag, name)),
        None => Err(PairError::Undeclared(name.to_string())),
    }
}

/// The `$query` object, created on first use.
fn query_node(report: &mut Map<String, Value>) -> &mut Value {
    let node = report
        .entry(QUERY_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node
}

/// The `[begin, end, note]` array, created with defaults on first use.
fn truncate_node(content: &mut Map<String, Value>) -> &mut Value {
    let node = content.entry("truncate").or_insert(Value::Null);
    if !node.as_array().is_some_and(|a| a.len() == 3) {
        *node = json!([0, 0, DEFAULT_TRUNC_NOTE]);
    }
    node
}

fn size(value: &str) -> Result<u64, PairError> {
    value
        .trim()
        .parse()
        .map_err(|_| PairError::BadSize(value.to_string()))
}

fn not_applicable(flag: &'static str, name: &str) -> PairError {
    PairError::NotApplicable {
        flag,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Map<String, Value> {
        Map::new()
    }

    // ── Declarations ──

    #[test]
    fn split_at_first_equals() {
        assert_eq!(split_pair("a=b=c"), Ok(("a", "b=c")));
        assert_eq!(split_pair("a="), Ok(("a", "")));
        assert!(matches!(split_pair("=b"), Err(PairError::BadPair(_))));
        assert!(matches!(split_pair("ab"), Err(PairError::BadPair(_))));
    }

    #[test]
    fn declares_each_kind() {
        let mut r = report();
        declare(&mut r, Declare::Arg, "os=linux").unwrap();
        declare(&mut r, Declare::QueryArg, "version=1.0").unwrap();
        declare(&mut r, Declare::TextFile, "log=/tmp/app.log").unwrap();
        declare(&mut r, Declare::BinaryFile, "dump=/tmp/core").unwrap();
        declare(&mut r, Declare::Field, "email=E-mail").unwrap();
        declare(&mut r, Declare::MultilineField, "desc=What happened?").unwrap();

        assert_eq!(
            Value::Object(r),
            json!({
                "os": "linux",
                "$query": { "version": "1.0" },
                "log": { "path": "/tmp/app.log", "content-type": "text/plain" },
                "dump": { "path": "/tmp/core", "content-type": "application/octet-stream" },
                "email": { "input": "text", "label": "E-mail" },
                "desc": { "input": "multiline", "label": "What happened?" }
            })
        );
    }

    #[test]
    fn reserved_names_are_malformed() {
        let mut r = report();
        assert!(matches!(
            declare(&mut r, Declare::Arg, "$query=x"),
            Err(PairError::BadPair(_))
        ));
        assert!(matches!(
            declare(&mut r, Declare::Arg, "type=crash"),
            Err(PairError::BadPair(_))
        ));
    }

    #[test]
    fn redeclaring_is_an_error() {
        let mut r = report();
        declare(&mut r, Declare::QueryArg, "version=1.0").unwrap();

        let err = declare(&mut r, Declare::Arg, "version=2.0").unwrap_err();
        assert_eq!(err, PairError::Redeclared("version".into()));

        declare(&mut r, Declare::Field, "email=E-mail").unwrap();
        let err = declare(&mut r, Declare::TextFile, "email=/tmp/x").unwrap_err();
        assert_eq!(err, PairError::Redeclared("email".into()));
    }

    // ── Modifiers ──

    #[test]
    fn truncation_defaults_on_first_use() {
        let mut r = report();
        declare(&mut r, Declare::TextFile, "log=/tmp/app.log").unwrap();

        modify(&mut r, Modify::TruncEnd, "log=4096").unwrap();
        assert_eq!(r["log"]["truncate"], json!([0, 4096, "(trimmed)"]));

        modify(&mut r, Modify::TruncBegin, "log=100").unwrap();
        modify(&mut r, Modify::TruncNote, "log=...snip...").unwrap();
        assert_eq!(r["log"]["truncate"], json!([100, 4096, "...snip..."]));
    }

    #[test]
    fn bad_size() {
        let mut r = report();
        declare(&mut r, Declare::TextFile, "log=/tmp/app.log").unwrap();

        let err = modify(&mut r, Modify::TruncBegin, "log=-5").unwrap_err();
        assert_eq!(err, PairError::BadSize("-5".into()));
    }

    #[test]
    fn field_modifiers() {
        let mut r = report();
        declare(&mut r, Declare::Field, "email=E-mail").unwrap();
        declare(&mut r, Declare::MultilineField, "desc=Description").unwrap();

        modify(&mut r, Modify::FieldDefault, "email=me@example.com").unwrap();
        modify(&mut r, Modify::FieldHint, "email=you@example.com").unwrap();
        modify(&mut r, Modify::FieldWarning, "desc=Please describe it.").unwrap();
        store_field(&mut r, "email").unwrap();

        assert_eq!(
            r["email"],
            json!({
                "input": "text",
                "label": "E-mail",
                "value": "me@example.com",
                "placeholder": "you@example.com",
                "persist": true
            })
        );
        assert_eq!(r["desc"]["input_warning"], "Please describe it.");
    }

    #[test]
    fn hint_needs_single_line_field() {
        let mut r = report();
        declare(&mut r, Declare::MultilineField, "desc=Description").unwrap();

        let err = modify(&mut r, Modify::FieldHint, "desc=type here").unwrap_err();
        assert!(matches!(err, PairError::NotApplicable { flag: "--field-hint", .. }));
    }

    #[test]
    fn modifier_kind_mismatch() {
        let mut r = report();
        declare(&mut r, Declare::Field, "email=E-mail").unwrap();
        declare(&mut r, Declare::TextFile, "log=/tmp/app.log").unwrap();

        assert!(matches!(
            modify(&mut r, Modify::TruncBegin, "email=10"),
            Err(PairError::NotApplicable { .. })
        ));
        assert!(matches!(
            store_field(&mut r, "log"),
            Err(PairError::NotApplicable { .. })
        ));
    }

    #[test]
    fn modifying_undeclared_content() {
        let mut r = report();
        declare(&mut r, Declare::Arg, "os=linux").unwrap();

        assert_eq!(
            modify(&mut r, Modify::FieldDefault, "email=x").unwrap_err(),
            PairError::Undeclared("email".into())
        );
    }

    #[test]
    fn string_content_has_nothing_to_modify() {
        let mut r = report();
        declare(&mut r, Declare::Arg, "os=linux").unwrap();

        assert_eq!(
            store_field(&mut r, "os").unwrap_err(),
            PairError::NotApplicable {
                flag: "--field-store",
                name: "os".into()
            }
        );
        assert_eq!(
            modify(&mut r, Modify::TruncBegin, "os=10").unwrap_err(),
            PairError::NotApplicable {
                flag: "--trunc-begin",
                name: "os".into()
            }
        );
    }
}
