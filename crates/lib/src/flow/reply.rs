//! Pull the assistant's reply out of a flow response.

use serde_json::Value;

/// Returned whenever the reply path cannot be resolved.
pub const NO_MESSAGE_FALLBACK: &str = "No valid message found in response.";

enum Step {
    Key(&'static str),
    Index(usize),
}

/// `outputs[0].outputs[0].results.message.text`
const MESSAGE_PATH: [Step; 6] = [
    Step::Key("outputs"),
    Step::Index(0),
    Step::Key("outputs"),
    Step::Index(0),
    Step::Key("results"),
    Step::Key("message"),
];

/// Reply text at `outputs[0].outputs[0].results.message.text`, or [`NO_MESSAGE_FALLBACK`].
///
/// Keys only resolve on objects and indexes only on arrays. A non-string leaf is returned as
/// its JSON text.
pub fn extract_message(response: &Value) -> String {
    let message = MESSAGE_PATH
        .iter()
        .try_fold(response, |node, step| match step {
            Step::Key(key) => node.as_object()?.get(*key),
            Step::Index(i) => node.as_array()?.get(*i),
        })
        .and_then(|message| message.as_object()?.get("text"));
    match message {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => {
            log::error!("no valid message found in flow response");
            NO_MESSAGE_FALLBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_text() {
        let res = json!({"outputs":[{"outputs":[{"results":{"message":{"text":"Hello"}}}]}]});
        assert_eq!(extract_message(&res), "Hello");
    }

    #[test]
    fn empty_object_falls_back() {
        assert_eq!(extract_message(&json!({})), NO_MESSAGE_FALLBACK);
    }

    #[test]
    fn empty_outputs_falls_back() {
        assert_eq!(extract_message(&json!({"outputs": []})), NO_MESSAGE_FALLBACK);
    }

    #[test]
    fn wrong_container_types_fall_back() {
        for res in [
            json!(null),
            json!("text"),
            json!([1, 2]),
            json!({"outputs": {"0": {}}}),
            json!({"outputs": [{"outputs": "nope"}]}),
            json!({"outputs": [{"outputs": [{"results": []}]}]}),
            json!({"outputs": [{"outputs": [{"results": {"message": "plain"}}]}]}),
            json!({"outputs": [{"outputs": [{"results": {"message": {}}}]}]}),
        ] {
            assert_eq!(extract_message(&res), NO_MESSAGE_FALLBACK, "input: {}", res);
        }
    }

    #[test]
    fn only_first_entries_are_read() {
        let res = json!({"outputs":[
            {"outputs":[{"results":{"message":{"text":"first"}}}, {"results":{"message":{"text":"second"}}}]},
            {"outputs":[{"results":{"message":{"text":"other"}}}]}
        ]});
        assert_eq!(extract_message(&res), "first");
    }

    #[test]
    fn non_string_leaf_is_rendered_as_json() {
        let res = json!({"outputs":[{"outputs":[{"results":{"message":{"text":42}}}]}]});
        assert_eq!(extract_message(&res), "42");
    }

    #[test]
    fn error_body_without_path_falls_back() {
        let res = json!({"detail": "Flow not found"});
        assert_eq!(extract_message(&res), NO_MESSAGE_FALLBACK);
    }

    #[test]
    fn extraction_is_idempotent() {
        for res in [
            json!({"outputs":[{"outputs":[{"results":{"message":{"text":"Hi"}}}]}]}),
            json!({}),
        ] {
            assert_eq!(extract_message(&res), extract_message(&res));
        }
    }
}
