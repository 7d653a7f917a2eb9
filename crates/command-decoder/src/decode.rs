use crate::{Command, DecodeError, DecodeResult};
use serde_json::{Map, Value};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse and validate a raw payload. Pure: touches nothing but `bytes`.
pub fn decode(bytes: &[u8]) -> DecodeResult<Command> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut document = match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(map) => map,
        other => {
            return Err(DecodeError::NotAnObject {
                found: json_type(&other),
            })
        }
    };

    let action = match document.remove("action") {
        None | Some(Value::Null) => return Err(DecodeError::MissingAction),
        Some(Value::String(action)) if action.trim().is_empty() => {
            return Err(DecodeError::MissingAction)
        }
        Some(Value::String(action)) => action,
        Some(other) => {
            return Err(DecodeError::InvalidField {
                field: "action",
                expected: "a string",
                found: json_type(&other),
            })
        }
    };

    Ok(Command {
        action,
        params: take_object(&mut document, "params")?,
        target: take_object(&mut document, "target")?,
    })
}

fn take_object(
    document: &mut Map<String, Value>,
    field: &'static str,
) -> DecodeResult<Map<String, Value>> {
    match document.remove(field) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(DecodeError::InvalidField {
            field,
            expected: "an object",
            found: json_type(&other),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_value(value: Value) -> DecodeResult<Command> {
        decode(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn decodes_full_payload() {
        let command =
            decode(br#"{"action":"add_funds","params":{"amount":100},"target":{"sim_id":7}}"#)
                .unwrap();

        assert_eq!(command.action, "add_funds");
        assert_eq!(command.params["amount"], json!(100));
        assert_eq!(command.target["sim_id"], json!(7));
    }

    #[test]
    fn params_and_target_default_to_empty() {
        let command = decode_value(json!({ "action": "noop" })).unwrap();
        assert!(command.params.is_empty());
        assert!(command.target.is_empty());

        let command = decode_value(json!({ "action": "noop", "params": null, "target": null }))
            .unwrap();
        assert_eq!(command, Command::new("noop"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let command = decode_value(json!({ "action": "noop", "id": "abc", "ts": 1 })).unwrap();
        assert_eq!(command, Command::new("noop"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(decode(b"{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b""), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn rejects_non_object_documents() {
        for value in [json!([1, 2]), json!("noop"), json!(42), json!(null)] {
            assert!(matches!(
                decode_value(value),
                Err(DecodeError::NotAnObject { .. })
            ));
        }
    }

    #[test]
    fn rejects_missing_null_or_blank_action() {
        for value in [
            json!({}),
            json!({ "params": { "amount": 1 } }),
            json!({ "action": null }),
            json!({ "action": "" }),
            json!({ "action": "   " }),
        ] {
            assert!(matches!(decode_value(value), Err(DecodeError::MissingAction)));
        }
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        let err = decode_value(json!({ "action": 5 })).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidField { field: "action", found: "a number", .. }
        ));

        let err = decode_value(json!({ "action": "noop", "params": [1] })).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "params", .. }));

        let err = decode_value(json!({ "action": "noop", "target": "sim" })).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "target", .. }));
        assert_eq!(
            err.to_string(),
            "field `target` must be an object, found a string"
        );
    }

    #[test]
    fn tolerates_utf8_bom() {
        let mut payload = UTF8_BOM.to_vec();
        payload.extend_from_slice(br#"{"action":"noop"}"#);
        assert_eq!(decode(&payload).unwrap().action, "noop");
    }

    #[test]
    fn builder_payload_decodes_back() {
        let command = Command::new("add_buff")
            .with_param("buff", "Buff_Happy")
            .with_target("sim_id", 12);
        assert_eq!(decode(&command.to_payload()).unwrap(), command);
    }
}
