//! Extraction and decoding of embedded function-call directives.
//!
//! The model embeds calls in its draft text as bracket-delimited
//! directives: `[FUNC_CALL:name=get_balance, limit=5]`. The directive
//! body grammar is `name=<identifier>(,<key>=<value>)*`, where a value
//! runs until the next `, key=` boundary or the end of the body. Commas
//! and equals signs inside a value are safe as long as the value never
//! contains a `, identifier=` sequence; that residual ambiguity is
//! accepted as-is rather than requiring quoting.
//!
//! Everything here is a pure function of the input text.

use regex::Regex;
use serde_json::{Map, Value};

use suroo_domain::{Error, Result};

/// One decoded directive.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Map<String, Value>,
}

/// Compiled directive grammar. Built once at startup and shared
/// read-only across requests.
pub struct DirectiveParser {
    call: Regex,
    arg_boundary: Regex,
    int_lit: Regex,
    float_lit: Regex,
}

impl Default for DirectiveParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveParser {
    pub fn new() -> Self {
        // Static patterns; compilation cannot fail.
        Self {
            call: Regex::new(r"(?s)\[FUNC_CALL:(.*?)\]").expect("static regex"),
            arg_boundary: Regex::new(r",\s*\w+\s*=").expect("static regex"),
            int_lit: Regex::new(r"^[+-]?\d+$").expect("static regex"),
            float_lit: Regex::new(r"^[+-]?\d+\.\d+$").expect("static regex"),
        }
    }

    /// All directive bodies in `text`, in order of occurrence, trimmed.
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.call
            .captures_iter(text)
            .map(|c| c[1].trim().to_string())
            .collect()
    }

    /// Decode one directive body into a [`FunctionCall`].
    ///
    /// A body that does not start with `name=<identifier>` fails; bad
    /// key/value fragments after a valid name are skipped best-effort.
    pub fn parse(&self, body: &str) -> Result<FunctionCall> {
        let s = body.trim();
        let rest = s
            .strip_prefix("name=")
            .ok_or_else(|| Error::Directive(format!("bad directive format: {body}")))?;

        let (name, arg_text) = match rest.find(',') {
            Some(pos) => (rest[..pos].trim(), &rest[pos + 1..]),
            None => (rest.trim(), ""),
        };
        if name.is_empty() {
            return Err(Error::Directive(format!("empty function name: {body}")));
        }

        Ok(FunctionCall {
            name: name.to_string(),
            args: self.parse_args(arg_text),
        })
    }

    /// Split `k1=v1, k2=v2, ...` at every `, key=` boundary and decode
    /// each pair. A value keeps any comma or equals sign that does not
    /// open the next pair.
    fn parse_args(&self, arg_text: &str) -> Map<String, Value> {
        let mut args = Map::new();

        let mut starts: Vec<usize> = vec![0];
        for m in self.arg_boundary.find_iter(arg_text) {
            starts.push(m.start());
        }
        starts.push(arg_text.len());

        for window in starts.windows(2) {
            let segment = arg_text[window[0]..window[1]].trim_start_matches(',');
            let Some(eq) = segment.find('=') else {
                continue;
            };
            let key = segment[..eq].trim();
            if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
                continue;
            }
            let value = strip_quotes(segment[eq + 1..].trim());
            args.insert(key.to_string(), self.coerce(value));
        }

        args
    }

    /// Decode a textual value: boolean and null literals, integers,
    /// decimals, JSON objects/arrays, and finally plain strings.
    fn coerce(&self, raw: &str) -> Value {
        let s = raw.trim();

        match s.to_ascii_lowercase().as_str() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            "null" | "none" => return Value::Null,
            _ => {}
        }

        if self.int_lit.is_match(s) {
            if let Ok(n) = s.parse::<i64>() {
                return Value::from(n);
            }
        }

        if self.float_lit.is_match(s) {
            if let Ok(f) = s.parse::<f64>() {
                if let Some(n) = serde_json::Number::from_f64(f) {
                    return Value::Number(n);
                }
            }
        }

        if (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']')) {
            if let Ok(v) = serde_json::from_str(s) {
                return v;
            }
        }

        Value::String(s.to_string())
    }
}

/// Strip one layer of matching quotes, if present.
fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        let (first, last) = (bytes[0], bytes[s.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DirectiveParser {
        DirectiveParser::new()
    }

    #[test]
    fn extract_none_from_plain_text() {
        assert!(parser().extract("Саламатсызбы! Кандай жардам керек?").is_empty());
    }

    #[test]
    fn extract_is_idempotent() {
        let p = parser();
        let text = "x [FUNC_CALL:name=get_balance] y";
        assert_eq!(p.extract(text), p.extract(text));
    }

    #[test]
    fn extract_single_directive() {
        let calls = parser().extract("...[FUNC_CALL:name=get_balance]...");
        assert_eq!(calls, vec!["name=get_balance"]);
    }

    #[test]
    fn extract_multiple_in_order() {
        let text = "[FUNC_CALL:name=a][FUNC_CALL:name=b, x=1]";
        let calls = parser().extract(text);
        assert_eq!(calls, vec!["name=a", "name=b, x=1"]);
    }

    #[test]
    fn extract_spans_newlines() {
        let text = "[FUNC_CALL:name=compare_cards,\ncard_names=Visa Gold, Elcard]";
        assert_eq!(parser().extract(text).len(), 1);
    }

    #[test]
    fn parse_name_only() {
        let call = parser().parse("name=get_balance").unwrap();
        assert_eq!(call.name, "get_balance");
        assert!(call.args.is_empty());
    }

    #[test]
    fn parse_typed_arguments() {
        let call = parser()
            .parse("name=transfer_money, to_account_number=KG12345, amount=1000")
            .unwrap();
        assert_eq!(call.name, "transfer_money");
        assert_eq!(call.args["to_account_number"], Value::String("KG12345".into()));
        assert_eq!(call.args["amount"], Value::from(1000));
    }

    #[test]
    fn parse_value_keeps_commas_without_key_boundary() {
        // "Visa Gold, Elcard" has a comma not followed by `key=`, so it
        // stays inside the single value.
        let call = parser()
            .parse("name=compare_cards, card_names=Visa Gold, Elcard, lang=ru")
            .unwrap();
        assert_eq!(call.args["card_names"], Value::String("Visa Gold, Elcard".into()));
        assert_eq!(call.args["lang"], Value::String("ru".into()));
    }

    #[test]
    fn parse_strips_one_quote_layer() {
        let call = parser().parse("name=t, a=\"hello, world\"").unwrap();
        assert_eq!(call.args["a"], Value::String("hello, world".into()));
    }

    #[test]
    fn parse_bool_null_literals() {
        let call = parser().parse("name=t, a=TRUE, b=false, c=None, d=null").unwrap();
        assert_eq!(call.args["a"], Value::Bool(true));
        assert_eq!(call.args["b"], Value::Bool(false));
        assert_eq!(call.args["c"], Value::Null);
        assert_eq!(call.args["d"], Value::Null);
    }

    #[test]
    fn parse_numeric_literals() {
        let call = parser().parse("name=t, a=-5, b=+3, c=2.75").unwrap();
        assert_eq!(call.args["a"], Value::from(-5));
        assert_eq!(call.args["b"], Value::from(3));
        assert_eq!(call.args["c"], Value::from(2.75));
    }

    #[test]
    fn parse_json_values() {
        let call = parser()
            .parse(r#"name=t, a={"k": 1}, b=[1, 2]"#)
            .unwrap();
        assert_eq!(call.args["a"]["k"], Value::from(1));
        assert_eq!(call.args["b"], serde_json::json!([1, 2]));
    }

    #[test]
    fn malformed_json_falls_back_to_string() {
        let call = parser().parse("name=t, a={not json}").unwrap();
        assert_eq!(call.args["a"], Value::String("{not json}".into()));
    }

    #[test]
    fn account_numbers_stay_strings() {
        let call = parser().parse("name=t, acc=KG12345").unwrap();
        assert_eq!(call.args["acc"], Value::String("KG12345".into()));
    }

    #[test]
    fn missing_name_prefix_is_an_error() {
        let err = parser().parse("get_balance").unwrap_err();
        assert!(matches!(err, Error::Directive(_)));
    }

    #[test]
    fn empty_name_is_an_error() {
        assert!(parser().parse("name=, x=1").is_err());
        assert!(parser().parse("name=").is_err());
    }

    #[test]
    fn garbage_arg_fragments_are_skipped() {
        let call = parser().parse("name=t, ???, x=1").unwrap();
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.args["x"], Value::from(1));
    }
}
