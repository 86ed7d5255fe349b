use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A proposed call to a named external operation, attached to an assistant
/// message by the planning step.
///
/// The arguments are structured JSON so the approval protocol can replace
/// them wholesale (`update` decisions) without re-parsing free text.
///
/// # Examples
///
/// ```
/// use selvage::message::OperationCall;
/// use serde_json::json;
///
/// let call = OperationCall::new("call-1", "executeQuery", json!({"sql_query": "SELECT 1"}))
///     .with_description("sanity check");
/// assert_eq!(call.name, "executeQuery");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationCall {
    /// Stable identifier correlating the call with its result record.
    pub id: String,
    /// Name of the operation to invoke (e.g. `executeQuery`).
    pub name: String,
    /// Structured arguments passed verbatim to the operation.
    pub args: Value,
    /// Optional human-readable description for review prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OperationCall {
    #[must_use]
    pub fn new(id: &str, name: &str, args: Value) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            args,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Same call with its arguments replaced (the `update` decision path).
    #[must_use]
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }
}

/// A message in a workflow conversation: a role, text content, and optionally
/// a proposed operation call (assistant messages) or the id of the call a
/// result record answers (tool messages).
///
/// # Examples
///
/// ```
/// use selvage::message::Message;
///
/// let user_msg = Message::user("List all filings");
/// let reply = Message::assistant("Here you go");
/// assert!(user_msg.has_role(Message::USER));
/// assert!(reply.op_call.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (e.g. "user", "assistant", "tool").
    pub role: String,
    /// The text content of the message.
    pub content: String,
    /// Operation proposed by this message, if any (assistant messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_call: Option<OperationCall>,
    /// For tool / feedback records: the id of the call being answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// AI assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt or instruction message role.
    pub const SYSTEM: &'static str = "system";
    /// Operation result / feedback record role.
    pub const TOOL: &'static str = "tool";

    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            op_call: None,
            call_id: None,
        }
    }

    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Creates an assistant message carrying a proposed operation call.
    #[must_use]
    pub fn assistant_with_call(content: &str, call: OperationCall) -> Self {
        Self {
            op_call: Some(call),
            ..Self::assistant(content)
        }
    }

    /// Creates a tool record answering the given call (result, rejection, or
    /// reviewer feedback).
    #[must_use]
    pub fn tool_result(call: &OperationCall, content: &str) -> Self {
        Self {
            call_id: Some(call.id.clone()),
            ..Self::new(Self::TOOL, content)
        }
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convenience_constructors() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, Message::USER);
        assert_eq!(user_msg.content, "Hello");
        assert!(user_msg.op_call.is_none());

        let system_msg = Message::system("You are helpful");
        assert_eq!(system_msg.role, Message::SYSTEM);
    }

    #[test]
    fn test_assistant_with_call() {
        let call = OperationCall::new("c1", "executeQuery", json!({"sql_query": "SELECT 1"}));
        let msg = Message::assistant_with_call("running a query", call.clone());
        assert_eq!(msg.role, Message::ASSISTANT);
        assert_eq!(msg.op_call, Some(call));
    }

    #[test]
    fn test_tool_result_links_call() {
        let call = OperationCall::new("c2", "executeQuery", json!({}));
        let record = Message::tool_result(&call, "rejected by reviewer");
        assert_eq!(record.role, Message::TOOL);
        assert_eq!(record.call_id.as_deref(), Some("c2"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let call = OperationCall::new("c3", "assignTask", json!({"user": 7}))
            .with_description("assign to user 7");
        let original = Message::assistant_with_call("assigning", call);
        let encoded = serde_json::to_string(&original).expect("serialize");
        let decoded: Message = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_plain_message_omits_call_fields() {
        let encoded = serde_json::to_string(&Message::user("hi")).expect("serialize");
        assert!(!encoded.contains("op_call"));
        assert!(!encoded.contains("call_id"));
    }
}
