//! The authorization gate.
//!
//! Some tools read or move real account data and must never execute for
//! an anonymous caller. The gate runs after directive parsing and
//! strictly before any dispatch, so a denied request produces zero tool
//! side effects.

use std::collections::HashSet;

use suroo_domain::auth::AuthContext;

use crate::directive::FunctionCall;

/// Process-wide set of tool names requiring authentication. Built once
/// from config at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct RestrictedToolSet {
    names: HashSet<String>,
}

impl RestrictedToolSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.names.contains(tool)
    }

    /// The name of the first requested tool that is restricted while the
    /// caller is unauthenticated; `None` when the request may proceed.
    ///
    /// First match wins — the scan stops at the first hit, it does not
    /// look for a "most severe" one.
    pub fn first_denied<'a>(
        &self,
        calls: &'a [FunctionCall],
        auth: &AuthContext,
    ) -> Option<&'a str> {
        if auth.is_authenticated() {
            return None;
        }
        calls
            .iter()
            .map(|call| call.name.as_str())
            .find(|name| self.contains(name))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use suroo_domain::config::AssistantConfig;

    fn call(name: &str) -> FunctionCall {
        FunctionCall {
            name: name.into(),
            args: Map::new(),
        }
    }

    fn gate() -> RestrictedToolSet {
        RestrictedToolSet::new(AssistantConfig::default().restricted_tools)
    }

    #[test]
    fn anonymous_restricted_call_is_denied() {
        let calls = vec![call("get_balance")];
        let denied = gate().first_denied(&calls, &AuthContext::anonymous());
        assert_eq!(denied, Some("get_balance"));
    }

    #[test]
    fn first_match_wins() {
        let calls = vec![call("get_balance"), call("transfer_money")];
        let denied = gate().first_denied(&calls, &AuthContext::anonymous());
        assert_eq!(denied, Some("get_balance"));
    }

    #[test]
    fn unrestricted_before_restricted_still_reports_restricted() {
        let calls = vec![call("get_balance"), call("list_all_card_names")];
        let denied = gate().first_denied(&calls, &AuthContext::anonymous());
        assert_eq!(denied, Some("get_balance"));

        let calls = vec![call("list_all_card_names"), call("get_balance")];
        let denied = gate().first_denied(&calls, &AuthContext::anonymous());
        assert_eq!(denied, Some("get_balance"));
    }

    #[test]
    fn knowledge_tools_pass_for_anonymous() {
        let calls = vec![call("list_all_card_names"), call("get_faq_by_category")];
        assert_eq!(gate().first_denied(&calls, &AuthContext::anonymous()), None);
    }

    #[test]
    fn authenticated_caller_is_never_denied() {
        let calls = vec![call("get_balance"), call("transfer_money")];
        let auth = AuthContext::authenticated(1, "Aigul");
        assert_eq!(gate().first_denied(&calls, &auth), None);
    }

    #[test]
    fn no_calls_no_denial() {
        assert_eq!(gate().first_denied(&[], &AuthContext::anonymous()), None);
    }
}
