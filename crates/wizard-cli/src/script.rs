//! Line-oriented session commands, shared by the interactive shell and
//! script replay.
//!
//! ```text
//! set company_name Kola Foods Ltd
//! add stakeholders {"full_name": "Ada Obi"}
//! update stakeholders 0 role DIRECTOR
//! toggle wealth_sources 003 on
//! next
//! submit
//! ```
//!
//! Values are read as JSON when they parse, otherwise as plain text.

use serde_json::Value;
use thiserror::Error;
use wizard_spec::Item;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set { field: String, value: Value },
    Unpin { field: String },
    Add { collection: String, values: Item },
    Remove { collection: String, index: usize },
    Update {
        collection: String,
        index: usize,
        field: String,
        value: Value,
    },
    Toggle {
        collection: String,
        key: String,
        on: bool,
    },
    Next,
    Back,
    Goto(usize),
    Show,
    Lookup(String),
    Submit,
    Cancel,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown action '{action}'")]
    UnknownAction { line: usize, action: String },
    #[error("line {line}: usage: {usage}")]
    Usage { line: usize, usage: &'static str },
    #[error("line {line}: {message}")]
    Value { line: usize, message: String },
}

pub const HELP: &str = "\
actions:
  set <field> <value>            write a field
  unpin <field>                  drop a manual override of a derived field
  add <collection> [json]        append an item
  remove <collection> <index>    remove an item
  update <collection> <index> <field> <value>
  toggle <collection> <key> on|off
  next | back | goto <step> | show
  lookup <key>                   prefill from the record registry
  submit | cancel | quit";

/// JSON when it parses, plain text otherwise.
pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_index(line: usize, raw: &str) -> Result<usize, ScriptError> {
    raw.parse().map_err(|_| ScriptError::Value {
        line,
        message: format!("'{}' is not an item index", raw),
    })
}

/// Parses one line; blank lines and `#` comments yield `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Action>, ScriptError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = text
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((text, ""));
    let usage = |form: &'static str| ScriptError::Usage { line, usage: form };

    let action = match verb.to_ascii_lowercase().as_str() {
        "set" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| usage("set <field> <value>"))?;
            Action::Set {
                field: field.to_string(),
                value: parse_value(value),
            }
        }
        "unpin" if !rest.is_empty() => Action::Unpin {
            field: rest.to_string(),
        },
        "unpin" => return Err(usage("unpin <field>")),
        "add" => {
            let (collection, values) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            if collection.is_empty() {
                return Err(usage("add <collection> [json]"));
            }
            let values = match parse_value(values) {
                Value::Object(map) => map.into_iter().collect(),
                Value::String(text) if text.is_empty() => Item::new(),
                _ => {
                    return Err(ScriptError::Value {
                        line,
                        message: "item values must be a JSON object".into(),
                    });
                }
            };
            Action::Add {
                collection: collection.to_string(),
                values,
            }
        }
        "remove" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [collection, index] = parts.as_slice() else {
                return Err(usage("remove <collection> <index>"));
            };
            Action::Remove {
                collection: collection.to_string(),
                index: parse_index(line, index)?,
            }
        }
        "update" => {
            let mut parts = rest.splitn(4, char::is_whitespace);
            let (Some(collection), Some(index), Some(field), Some(value)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(usage("update <collection> <index> <field> <value>"));
            };
            Action::Update {
                collection: collection.to_string(),
                index: parse_index(line, index)?,
                field: field.to_string(),
                value: parse_value(value),
            }
        }
        "toggle" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [collection, key, state] = parts.as_slice() else {
                return Err(usage("toggle <collection> <key> on|off"));
            };
            let on = match state.to_ascii_lowercase().as_str() {
                "on" | "yes" | "true" => true,
                "off" | "no" | "false" => false,
                _ => return Err(usage("toggle <collection> <key> on|off")),
            };
            Action::Toggle {
                collection: collection.to_string(),
                key: key.to_string(),
                on,
            }
        }
        "next" => Action::Next,
        "back" => Action::Back,
        "goto" => Action::Goto(rest.parse().map_err(|_| usage("goto <step>"))?),
        "show" => Action::Show,
        "lookup" if !rest.is_empty() => Action::Lookup(rest.to_string()),
        "lookup" => return Err(usage("lookup <key>")),
        "submit" => Action::Submit,
        "cancel" => Action::Cancel,
        "quit" | "exit" => Action::Quit,
        other => {
            return Err(ScriptError::UnknownAction {
                line,
                action: other.to_string(),
            });
        }
    };
    Ok(Some(action))
}

/// Parses a whole script, stopping at the first bad line.
pub fn parse_script(text: &str) -> Result<Vec<Action>, ScriptError> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| parse_line(index + 1, line).transpose())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_fall_back_to_text() {
        assert_eq!(parse_value("12"), json!(12));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("Kola Foods Ltd"), json!("Kola Foods Ltd"));
        assert_eq!(parse_value("\"007\""), json!("007"));
    }

    #[test]
    fn set_keeps_spaces_in_the_value() {
        let action = parse_line(1, "set company_name  Kola Foods Ltd").expect("parse");
        assert_eq!(
            action,
            Some(Action::Set {
                field: "company_name".into(),
                value: json!("Kola Foods Ltd"),
            })
        );
    }

    #[test]
    fn update_and_add_parse_items() {
        let script = "\
# stakeholders
add stakeholders {\"full_name\": \"Ada\"}
update stakeholders 1 role DIRECTOR

toggle wealth_sources 003 on
";
        let actions = parse_script(script).expect("parse");
        assert_eq!(actions.len(), 3);
        assert_eq!(
            actions[1],
            Action::Update {
                collection: "stakeholders".into(),
                index: 1,
                field: "role".into(),
                value: json!("DIRECTOR"),
            }
        );
        assert!(matches!(
            &actions[0],
            Action::Add { values, .. } if values.get("full_name") == Some(&json!("Ada"))
        ));
    }

    #[test]
    fn bad_lines_report_their_number() {
        assert_eq!(
            parse_script("next\nfly away"),
            Err(ScriptError::UnknownAction {
                line: 2,
                action: "fly".into()
            })
        );
        assert!(matches!(
            parse_line(3, "remove contacts first"),
            Err(ScriptError::Value { line: 3, .. })
        ));
        assert!(matches!(
            parse_line(4, "toggle wealth_sources 001"),
            Err(ScriptError::Usage { line: 4, .. })
        ));
    }
}
