//! The fixed classification instruction sent with every free-text message.
//!
//! The catalogue below is the entire contract with the model: nine numbered
//! actions, their parameter shapes, and worked examples. The reply format is
//! deliberately rigid (a bare 2-element JSON array) because everything the
//! model returns is re-validated before use.

use crate::llm::CompletionRequest;

pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You convert one chat message from the user of a personal-CRM assistant into exactly one action.

Reply with ONLY a JSON array of two elements: [action_id, parameters]. No prose, no code fences.

Actions:
1 search people. parameters: array of search terms (strings).
2 add a task. parameters: object with required "text"; optional "assignee", "due_date" (YYYY-MM-DD), "label", "priority" (low|medium|high), "status" (pending|in_progress|done).
3 remove a task. parameters: {"task_id": <number>}.
4 add an alert to a task. parameters: {"task_id": <number>}.
5 list tasks. parameters: object with optional "filter" ({"priority"|"status"|"assignee": <value>}) and optional "period" (daily|weekly|monthly|all).
6 add a person from pasted details. parameters: array of "Key: value" strings using keys full name, email, company, categories, status, linkedin.
7 list meetings. parameters: null.
8 update one field of a task. parameters: {"task_id": <number>, "field": "text"|"assign_to"|"due_date"|"status"|"label"|"priority", "new_value": <string>}.
9 update a person. parameters: {"identifier": <name or email fragment>, "updates": {<field>: <value>, ...}} with fields from: full_name, email, company, categories, status, linkedin_profile, poc, warm_intro, notes.

Examples:
"find a VC who invests in fintech" -> [1, ["VC", "fintech"]]
"add task: call Sam about the term sheet by 2026-03-05, high priority" -> [2, {"text": "call Sam about the term sheet", "due_date": "2026-03-05", "priority": "high"}]
"delete task 12" -> [3, {"task_id": 12}]
"remind me about task 7" -> [4, {"task_id": 7}]
"what's on my plate this week?" -> [5, {"period": "weekly"}]
"new contact: Full Name: Jane Doe, Email: jane@acme.com, Company: Acme" -> [6, ["Full Name: Jane Doe", "Email: jane@acme.com", "Company: Acme"]]
"show my meetings" -> [7, null]
"reassign task 3 to sam" -> [8, {"task_id": 3, "field": "assign_to", "new_value": "sam"}]
"change email of a@x.com to b@y.com" -> [9, {"identifier": "a@x.com", "updates": {"email": "b@y.com"}}]

If the message fits none of the actions, reply [0, null]."#;

pub fn classification_request(
    text: &str,
    temperature: f64,
    max_tokens: u32,
) -> CompletionRequest {
    CompletionRequest {
        system: CLASSIFIER_SYSTEM_PROMPT.to_string(),
        user: text.to_string(),
        temperature,
        max_tokens,
    }
}
