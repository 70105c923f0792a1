//! Reply texts. The chat surface renders a minimal Markdown subset, so
//! formatting stays at backticks and asterisks.

use rolobot_core::domain::person::Person;
use rolobot_core::domain::task::Task;

pub fn welcome(first_name: &str) -> String {
    format!(
        "Welcome back, {first_name}! Tell me what you need: search contacts, track tasks, \
         or just describe it in your own words. Try /help for the full tour."
    )
}

pub fn secret_prompt() -> &'static str {
    "This bot is private. Please enter the passphrase to continue."
}

pub fn auth_success(first_name: &str) -> String {
    format!("You're in, {first_name}! Send /help to see what I can do.")
}

pub fn auth_retry() -> &'static str {
    "That passphrase didn't match. Try again."
}

pub fn help_text() -> &'static str {
    "Here's what I can do:\n\
     /search — search your contacts\n\
     /add — add a contact step by step\n\
     /cancel — abort the current flow\n\
     `?query` — quick contact search\n\n\
     Or just tell me things like:\n\
     • \"find a VC who invests in fintech\"\n\
     • \"add task: call Sam tomorrow, high priority\"\n\
     • \"what's on my plate this week?\"\n\
     • \"change email of a@x.com to b@y.com\""
}

pub fn search_prompt() -> &'static str {
    "What should I search for?"
}

pub fn cancelled() -> &'static str {
    "Cancelled. Send /help if you need a reminder of what I can do."
}

pub fn not_understood() -> &'static str {
    "Sorry, I couldn't work out what you'd like me to do. Try rephrasing, or send /help."
}

pub fn meetings_coming_soon() -> &'static str {
    "Meeting listings are coming soon; they aren't wired up yet."
}

pub fn no_results(query: &str) -> String {
    format!("No contacts matched `{query}`.")
}

pub fn person_list(people: &[Person]) -> String {
    let mut reply = format!("Found {}:\n", plural(people.len(), "contact"));
    for (index, person) in people.iter().enumerate() {
        reply.push_str(&format!("{}. {}\n", index + 1, person.summary_line()));
    }
    reply.trim_end().to_string()
}

pub fn person_added(person: &Person) -> String {
    let mut reply = format!("Added *{}*", person.full_name);
    let mut extras = Vec::new();
    if let Some(email) = person.email.as_deref() {
        extras.push(email.to_string());
    }
    if let Some(company) = person.company.as_deref() {
        extras.push(company.to_string());
    }
    if let Some(categories) = person.categories.as_deref() {
        extras.push(categories.to_string());
    }
    if let Some(status) = person.status.as_deref() {
        extras.push(format!("status: {status}"));
    }
    if let Some(linkedin) = person.linkedin_profile.as_deref() {
        extras.push(linkedin.to_string());
    }
    if !extras.is_empty() {
        reply.push_str(&format!(" ({})", extras.join(", ")));
    }
    reply.push('.');
    reply
}

pub fn person_updated(full_name: &str, changed_fields: &[&str]) -> String {
    format!("Updated {} for *{}*.", changed_fields.join(", "), full_name)
}

pub fn task_added(task: &Task) -> String {
    let mut reply = format!("Task #{} added: {}", task.id, task.text);
    reply.push_str(&format!(
        " [{} priority, {}]",
        task.priority.label(),
        task.status.label()
    ));
    if let Some(assignee) = task.assignee.as_deref() {
        reply.push_str(&format!(", assigned to {assignee}"));
    }
    if let Some(due) = task.due_date {
        reply.push_str(&format!(", due {}", due.format("%Y-%m-%d")));
    }
    if let Some(label) = task.label.as_deref() {
        reply.push_str(&format!(", label {label}"));
    }
    reply
}

pub fn task_removed(task_id: i64) -> String {
    format!("Task #{task_id} removed.")
}

pub fn task_alert_ack(task_id: i64) -> String {
    // The alert action is an acknowledged stub: no reminder is scheduled.
    format!(
        "Noted an alert request for task #{task_id}. Heads up: reminders aren't implemented \
         yet, so nothing will fire."
    )
}

pub fn task_updated(task_id: i64, field_label: &str) -> String {
    format!("Task #{task_id}: {field_label} updated.")
}

pub fn no_tasks() -> &'static str {
    "No tasks matched."
}

pub fn task_list(tasks: &[Task]) -> String {
    let mut reply = format!("{}:\n", plural(tasks.len(), "task"));
    for task in tasks {
        reply.push_str(&format!(
            "#{} [{}] ({}) {}",
            task.id,
            task.status.label(),
            task.priority.label(),
            task.text
        ));
        if let Some(assignee) = task.assignee.as_deref() {
            reply.push_str(&format!(" @{assignee}"));
        }
        if let Some(due) = task.due_date {
            reply.push_str(&format!(", due {}", due.format("%Y-%m-%d")));
        }
        reply.push('\n');
    }
    reply.trim_end().to_string()
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
