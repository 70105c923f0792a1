//! The conversation engine: one inbound message in, one reply cycle out.
//!
//! Slash commands are tested before any state-specific handling; free text
//! is interpreted by the current conversation state. Every failure is
//! converted into a single reply at this boundary, and the session row is
//! written exactly once per processed message through a compare-and-swap,
//! so two racing messages from the same user can never interleave their
//! conversation writes.

use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use rolobot_agent::IntentClassifier;
use rolobot_core::domain::person::draft_from_pending;
use rolobot_core::domain::session::{AddPersonStep, ConversationState, Profile, Session};
use rolobot_core::CommandError;
use rolobot_db::repositories::{PersonRepository, SessionRepository, TaskRepository};
use rolobot_telegram::api::ChatApi;
use rolobot_telegram::commands::{command_menu, quick_search_query, SlashCommand};
use rolobot_telegram::poller::UpdateHandler;
use rolobot_telegram::update::{Update, User};

use crate::executors::{store_error, ActionExecutors};
use crate::replies;

/// Credential check behind a trait so per-user credentials can replace the
/// shared secret without touching any call site.
#[async_trait]
pub trait AuthPolicy: Send + Sync {
    async fn verify(&self, user_id: i64, supplied: &str) -> bool;
}

pub struct SharedSecretPolicy {
    secret: SecretString,
}

impl SharedSecretPolicy {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl AuthPolicy for SharedSecretPolicy {
    async fn verify(&self, _user_id: i64, supplied: &str) -> bool {
        !supplied.is_empty() && supplied == self.secret.expose_secret()
    }
}

pub struct CommandEngine {
    sessions: Arc<dyn SessionRepository>,
    chat: Arc<dyn ChatApi>,
    classifier: Arc<dyn IntentClassifier>,
    auth: Arc<dyn AuthPolicy>,
    executors: ActionExecutors,
}

impl CommandEngine {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        people: Arc<dyn PersonRepository>,
        tasks: Arc<dyn TaskRepository>,
        chat: Arc<dyn ChatApi>,
        classifier: Arc<dyn IntentClassifier>,
        auth: Arc<dyn AuthPolicy>,
    ) -> Self {
        Self { sessions, chat, classifier, auth, executors: ActionExecutors::new(people, tasks) }
    }

    async fn process_message(
        &self,
        from: &User,
        chat_id: i64,
        text: &str,
    ) -> Result<(), CommandError> {
        let mut session = self.sessions.get_or_create(from.id).await.map_err(store_error)?;

        let reply = match self.dispatch(text, &mut session, from).await {
            Ok(reply) => reply,
            Err(error) => {
                info!(user_id = from.id, error = %error, "command failed; replying with notice");
                error.reply_text()
            }
        };

        self.chat
            .send_message(chat_id, &reply)
            .await
            .map_err(|err| CommandError::Transport(err.to_string()))?;

        // One conversation upsert per processed message. A compare-and-swap
        // miss here means a second message for the same user won the race;
        // its state stands and this one reports busy.
        self.sessions.save_conversation(&session).await.map_err(store_error)?;
        Ok(())
    }

    async fn dispatch(
        &self,
        text: &str,
        session: &mut Session,
        from: &User,
    ) -> Result<String, CommandError> {
        if let Some(command) = SlashCommand::parse(text) {
            return self.handle_command(command, session, from).await;
        }

        match session.state {
            ConversationState::Authenticating => self.handle_secret(text, session, from).await,
            ConversationState::Searching => {
                let reply = self.executors.search(text).await?;
                session.state = ConversationState::Idle;
                Ok(reply)
            }
            ConversationState::AddingPerson(step) => {
                self.handle_wizard_step(step, text, session).await
            }
            ConversationState::Idle if session.authenticated => self.handle_idle_text(text).await,
            ConversationState::Idle => Err(CommandError::AuthRequired),
        }
    }

    async fn handle_command(
        &self,
        command: SlashCommand,
        session: &mut Session,
        from: &User,
    ) -> Result<String, CommandError> {
        match command {
            SlashCommand::Start => {
                session.reset_conversation();
                if session.authenticated {
                    self.register_command_menu(session.user_id).await;
                    Ok(replies::welcome(&from.first_name))
                } else {
                    session.state = ConversationState::Authenticating;
                    Ok(replies::secret_prompt().to_string())
                }
            }
            SlashCommand::Help => {
                if !session.authenticated {
                    return Err(CommandError::AuthRequired);
                }
                Ok(replies::help_text().to_string())
            }
            SlashCommand::Search => {
                if !session.authenticated {
                    return Err(CommandError::AuthRequired);
                }
                session.reset_conversation();
                session.state = ConversationState::Searching;
                Ok(replies::search_prompt().to_string())
            }
            SlashCommand::Add => {
                if !session.authenticated {
                    return Err(CommandError::AuthRequired);
                }
                session.reset_conversation();
                session.state = ConversationState::AddingPerson(AddPersonStep::FIRST);
                Ok(AddPersonStep::FIRST.prompt().to_string())
            }
            SlashCommand::Cancel => {
                session.reset_conversation();
                Ok(replies::cancelled().to_string())
            }
        }
    }

    async fn handle_secret(
        &self,
        supplied: &str,
        session: &mut Session,
        from: &User,
    ) -> Result<String, CommandError> {
        if !self.auth.verify(from.id, supplied).await {
            info!(user_id = from.id, "authentication attempt rejected");
            return Ok(replies::auth_retry().to_string());
        }

        let profile = Profile {
            username: from.username.clone(),
            first_name: Some(from.first_name.clone()),
        };
        let now = Utc::now();
        self.sessions
            .mark_authenticated(from.id, &profile, now)
            .await
            .map_err(store_error)?;

        session.authenticated = true;
        session.authenticated_at = Some(now);
        session.username = profile.username;
        session.first_name = profile.first_name;
        session.state = ConversationState::Idle;

        info!(user_id = from.id, "user authenticated");
        self.register_command_menu(session.user_id).await;
        Ok(replies::auth_success(&from.first_name))
    }

    async fn handle_wizard_step(
        &self,
        step: AddPersonStep,
        text: &str,
        session: &mut Session,
    ) -> Result<String, CommandError> {
        let answer = text.trim();
        if !answer.eq_ignore_ascii_case("skip") {
            session
                .pending
                .insert(step.field().column_name().to_string(), answer.to_string());
        }

        if let Some(next) = step.next() {
            session.state = ConversationState::AddingPerson(next);
            return Ok(next.prompt().to_string());
        }

        // Final step: the wizard's only store write. Whatever happens next,
        // the accumulated answers are consumed now.
        let draft = draft_from_pending(&session.pending);
        session.reset_conversation();

        let Some(draft) = draft else {
            return Err(CommandError::Validation { field: "full name".to_string() });
        };
        let person = self.executors.insert_person(draft).await?;
        Ok(replies::person_added(&person))
    }

    async fn handle_idle_text(&self, text: &str) -> Result<String, CommandError> {
        if let Some(query) = quick_search_query(text) {
            if query.is_empty() {
                return Ok(replies::search_prompt().to_string());
            }
            return self.executors.search(query).await;
        }

        let decision = self
            .classifier
            .classify(text)
            .await
            .map_err(|err| CommandError::Transport(err.to_string()))?;
        self.executors.execute(decision).await
    }

    /// Registers the visible command menu. Best effort: a failed
    /// registration is logged and must not fail the message.
    async fn register_command_menu(&self, user_id: i64) {
        if let Err(error) = self.chat.set_command_menu(&command_menu()).await {
            warn!(user_id, error = %error, "command menu registration failed");
        }
    }
}

#[async_trait]
impl UpdateHandler for CommandEngine {
    async fn handle_update(&self, update: &Update) -> anyhow::Result<()> {
        let Some((from, chat, text)) = update.text_message() else {
            debug!(update_id = update.update_id, "ignoring update without text");
            return Ok(());
        };

        let correlation_id = Uuid::new_v4();
        debug!(
            update_id = update.update_id,
            user_id = from.id,
            correlation_id = %correlation_id,
            "processing message"
        );

        if let Err(error) = self.process_message(from, chat.id, text).await {
            warn!(
                update_id = update.update_id,
                user_id = from.id,
                correlation_id = %correlation_id,
                error = %error,
                "message processing failed"
            );
            self.chat
                .send_message(chat.id, &error.reply_text())
                .await
                .map_err(|send_error| anyhow!("failed to deliver error reply: {send_error}"))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use secrecy::SecretString;

    use rolobot_agent::{IntentRouter, ScriptedLlmClient};
    use rolobot_core::domain::session::{AddPersonStep, ConversationState, Profile, Session};
    use rolobot_db::repositories::{
        InMemoryPersonRepository, InMemorySessionRepository, InMemoryTaskRepository,
        PersonRepository, RepositoryError, SessionRepository, TaskRepository,
    };
    use rolobot_telegram::api::RecordingChatApi;
    use rolobot_telegram::poller::UpdateHandler;
    use rolobot_telegram::update::{Chat, Message, Update, User};

    use super::{CommandEngine, SharedSecretPolicy};

    const SECRET: &str = "sesame";

    struct Fixture {
        engine: CommandEngine,
        sessions: Arc<InMemorySessionRepository>,
        people: Arc<InMemoryPersonRepository>,
        tasks: Arc<InMemoryTaskRepository>,
        chat: Arc<RecordingChatApi>,
        llm: Arc<ScriptedLlmClient>,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(InMemorySessionRepository::default());
        let people = Arc::new(InMemoryPersonRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let chat = Arc::new(RecordingChatApi::default());
        let llm = Arc::new(ScriptedLlmClient::default());

        let engine = CommandEngine::new(
            sessions.clone(),
            people.clone(),
            tasks.clone(),
            chat.clone(),
            Arc::new(IntentRouter::new(llm.clone(), 0.1, 128)),
            Arc::new(SharedSecretPolicy::new(SecretString::from(SECRET.to_string()))),
        );

        Fixture { engine, sessions, people, tasks, chat, llm }
    }

    fn update(update_id: i64, user_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                id: update_id,
                from: Some(User {
                    id: user_id,
                    first_name: "Jane".to_string(),
                    username: Some("jane_d".to_string()),
                }),
                chat: Chat { id: user_id, kind: "private".to_string() },
                text: Some(text.to_string()),
            }),
        }
    }

    async fn send(fixture: &Fixture, user_id: i64, text: &str) {
        fixture.engine.handle_update(&update(1, user_id, text)).await.expect("handle");
    }

    async fn authenticate(fixture: &Fixture, user_id: i64) {
        send(fixture, user_id, "/start").await;
        send(fixture, user_id, SECRET).await;
    }

    async fn last_reply(fixture: &Fixture) -> String {
        fixture.chat.sent_texts().await.last().cloned().expect("at least one reply")
    }

    #[tokio::test]
    async fn scenario_new_user_start_creates_authenticating_session() {
        let fixture = fixture();

        send(&fixture, 42, "/start").await;

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Authenticating);
        assert!(!session.authenticated);
        assert!(last_reply(&fixture).await.contains("passphrase"));
    }

    #[tokio::test]
    async fn correct_secret_authenticates_and_registers_menu() {
        let fixture = fixture();

        authenticate(&fixture, 42).await;

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert!(session.authenticated);
        assert!(session.authenticated_at.is_some());
        assert_eq!(session.username.as_deref(), Some("jane_d"));
        assert_eq!(session.state, ConversationState::Idle);
        assert_eq!(fixture.chat.menu_registrations(), 1);
        assert!(last_reply(&fixture).await.contains("You're in"));
    }

    #[tokio::test]
    async fn wrong_secret_keeps_authenticating_without_session_mutation() {
        let fixture = fixture();

        send(&fixture, 42, "/start").await;
        send(&fixture, 42, "open please").await;

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert!(!session.authenticated);
        assert_eq!(session.state, ConversationState::Authenticating);
        assert!(last_reply(&fixture).await.contains("didn't match"));
    }

    #[tokio::test]
    async fn protected_commands_prompt_for_authentication() {
        let fixture = fixture();

        for text in ["/help", "/search", "/add", "just some words"] {
            send(&fixture, 42, text).await;
            assert!(
                last_reply(&fixture).await.contains("authenticate"),
                "`{text}` should be auth-gated"
            );
        }

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Idle);
    }

    #[tokio::test]
    async fn authentication_is_monotonic_across_conversation_turns() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        fixture.llm.push_ok("[7, null]");
        for text in ["/search", "jane", "/add", "/cancel", "show meetings", "/help"] {
            send(&fixture, 42, text).await;
            let session = fixture.sessions.get_or_create(42).await.expect("session");
            assert!(session.authenticated, "auth must survive `{text}`");
        }
    }

    #[tokio::test]
    async fn scenario_free_text_search_via_classifier() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        fixture
            .people
            .insert(rolobot_core::PersonDraft {
                full_name: "Vera Capital".to_string(),
                categories: Some("VC fintech investor".to_string()),
                ..rolobot_core::PersonDraft::default()
            })
            .await
            .expect("seed");

        fixture.llm.push_ok(r#"[1, ["VC", "fintech"]]"#);
        send(&fixture, 42, "find a VC who invests in fintech").await;

        let reply = last_reply(&fixture).await;
        assert!(reply.contains("1. Vera Capital"), "numbered list expected, got: {reply}");
    }

    #[tokio::test]
    async fn malformed_classifier_output_yields_one_reply_and_no_mutation() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;
        let replies_before = fixture.chat.sent_texts().await.len();

        fixture.llm.push_ok("I think the user wants action 2 maybe");
        send(&fixture, 42, "do something clever").await;

        let sent = fixture.chat.sent_texts().await;
        assert_eq!(sent.len(), replies_before + 1, "exactly one reply");
        assert!(sent.last().expect("reply").contains("couldn't work out"));
        assert!(fixture.tasks.find_by_id(1).await.expect("find").is_none());
        assert!(fixture.people.find_by_identifier("").await.expect("find").is_empty());
    }

    #[tokio::test]
    async fn classifier_transport_failure_yields_generic_error_reply() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        // scripted client exhausted -> transport error from the router
        send(&fixture, 42, "find people").await;

        assert!(last_reply(&fixture).await.contains("Something went wrong"));
    }

    #[tokio::test]
    async fn scenario_wizard_commits_once_with_skipped_fields_absent() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        send(&fixture, 42, "/add").await;
        send(&fixture, 42, "Jane Doe").await;
        for _ in 0..7 {
            send(&fixture, 42, "skip").await;
            assert!(
                fixture.people.find_by_identifier("jane").await.expect("find").is_empty(),
                "no insert may happen before the final step"
            );
        }
        send(&fixture, 42, "skip").await;

        let people = fixture.people.find_by_identifier("jane").await.expect("find");
        assert_eq!(people.len(), 1, "exactly one record committed");
        assert_eq!(people[0].full_name, "Jane Doe");
        assert_eq!(people[0].email, None);
        assert_eq!(people[0].notes, None);

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Idle);
        assert!(session.pending.is_empty());
    }

    #[tokio::test]
    async fn wizard_mixed_answers_land_in_their_fields() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        send(&fixture, 42, "/add").await;
        send(&fixture, 42, "Ada Lovelace").await; // name
        send(&fixture, 42, "ada@engines.io").await; // email
        send(&fixture, 42, "Analytical Engines").await; // company
        for _ in 0..6 {
            send(&fixture, 42, "skip").await;
        }

        let people = fixture.people.find_by_identifier("ada").await.expect("find");
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].email.as_deref(), Some("ada@engines.io"));
        assert_eq!(people[0].company.as_deref(), Some("Analytical Engines"));
    }

    #[tokio::test]
    async fn cancel_resets_cleanly_and_next_wizard_is_unaffected() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        send(&fixture, 42, "/add").await;
        send(&fixture, 42, "Leftover Name").await;
        send(&fixture, 42, "/cancel").await;

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Idle);
        assert!(session.pending.is_empty());

        // a fresh wizard must not see the cancelled wizard's data
        send(&fixture, 42, "/add").await;
        send(&fixture, 42, "Jane Doe").await;
        for _ in 0..8 {
            send(&fixture, 42, "skip").await;
        }

        let leftovers = fixture.people.find_by_identifier("Leftover").await.expect("find");
        assert!(leftovers.is_empty());
        let people = fixture.people.find_by_identifier("jane").await.expect("find");
        assert_eq!(people.len(), 1);
    }

    #[tokio::test]
    async fn search_state_consumes_next_message_then_returns_to_idle() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;
        fixture
            .people
            .insert(rolobot_core::PersonDraft {
                full_name: "Jane Doe".to_string(),
                ..rolobot_core::PersonDraft::default()
            })
            .await
            .expect("seed");

        send(&fixture, 42, "/search").await;
        assert!(last_reply(&fixture).await.contains("search for"));

        send(&fixture, 42, "jane").await;
        assert!(last_reply(&fixture).await.contains("Jane Doe"));

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Idle);
    }

    #[tokio::test]
    async fn quick_search_prefix_bypasses_the_classifier() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;
        fixture
            .people
            .insert(rolobot_core::PersonDraft {
                full_name: "Jane Doe".to_string(),
                ..rolobot_core::PersonDraft::default()
            })
            .await
            .expect("seed");

        // no scripted LLM output: touching the classifier would error
        send(&fixture, 42, "?jane").await;
        assert!(last_reply(&fixture).await.contains("Jane Doe"));
        assert!(fixture.llm.seen_requests().is_empty());

        send(&fixture, 42, "?").await;
        assert!(last_reply(&fixture).await.contains("search for"));
    }

    #[tokio::test]
    async fn scenario_update_person_single_match_changes_only_email() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;
        fixture
            .people
            .insert(rolobot_core::PersonDraft {
                full_name: "Jane Doe".to_string(),
                email: Some("a@x.com".to_string()),
                company: Some("Acme".to_string()),
                ..rolobot_core::PersonDraft::default()
            })
            .await
            .expect("seed");

        fixture
            .llm
            .push_ok(r#"[9, {"identifier": "a@x.com", "updates": {"email": "b@y.com"}}]"#);
        send(&fixture, 42, "change email of a@x.com to b@y.com").await;

        let updated = fixture.people.find_by_identifier("b@y.com").await.expect("find");
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].company.as_deref(), Some("Acme"), "only email changed");
        assert!(last_reply(&fixture).await.contains("email"));
    }

    #[tokio::test]
    async fn ambiguous_update_lists_candidates_and_mutates_nothing() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;
        for (name, email) in [("Jane Doe", "a@x.com"), ("Jane Smith", "jane@smith.dev")] {
            fixture
                .people
                .insert(rolobot_core::PersonDraft {
                    full_name: name.to_string(),
                    email: Some(email.to_string()),
                    ..rolobot_core::PersonDraft::default()
                })
                .await
                .expect("seed");
        }

        fixture
            .llm
            .push_ok(r#"[9, {"identifier": "jane", "updates": {"company": "NewCo"}}]"#);
        send(&fixture, 42, "set jane's company to NewCo").await;

        let reply = last_reply(&fixture).await;
        assert!(reply.contains("more than one"));
        assert!(reply.contains("Jane Doe"));
        assert!(reply.contains("Jane Smith"));

        for person in fixture.people.find_by_identifier("jane").await.expect("find") {
            assert_eq!(person.company, None, "no mutation on ambiguity");
        }
    }

    #[tokio::test]
    async fn losing_concurrent_save_reports_busy_and_loses_no_state() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        // Wrap the session repo so the next conversation save observes a
        // stale version, as a racing message would.
        struct StaleOnSave {
            inner: Arc<InMemorySessionRepository>,
            stale_once: tokio::sync::Mutex<bool>,
        }

        #[async_trait]
        impl SessionRepository for StaleOnSave {
            async fn get_or_create(&self, user_id: i64) -> Result<Session, RepositoryError> {
                self.inner.get_or_create(user_id).await
            }

            async fn save_conversation(&self, session: &Session) -> Result<(), RepositoryError> {
                let mut stale = self.stale_once.lock().await;
                if *stale {
                    *stale = false;
                    let mut raced = session.clone();
                    raced.version -= 1;
                    return self.inner.save_conversation(&raced).await;
                }
                self.inner.save_conversation(session).await
            }

            async fn mark_authenticated(
                &self,
                user_id: i64,
                profile: &Profile,
                at: DateTime<Utc>,
            ) -> Result<(), RepositoryError> {
                self.inner.mark_authenticated(user_id, profile, at).await
            }
        }

        let racing_engine = CommandEngine::new(
            Arc::new(StaleOnSave {
                inner: fixture.sessions.clone(),
                stale_once: tokio::sync::Mutex::new(true),
            }),
            fixture.people.clone(),
            fixture.tasks.clone(),
            fixture.chat.clone(),
            Arc::new(IntentRouter::new(fixture.llm.clone(), 0.1, 128)),
            Arc::new(SharedSecretPolicy::new(SecretString::from(SECRET.to_string()))),
        );

        racing_engine.handle_update(&update(9, 42, "/search")).await.expect("handle");

        assert!(last_reply(&fixture).await.contains("previous message"));
        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Idle, "losing write must not land");
    }

    #[tokio::test]
    async fn wizard_skipping_the_name_fails_without_insert() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        send(&fixture, 42, "/add").await;
        for _ in 0..9 {
            send(&fixture, 42, "skip").await;
        }

        assert!(last_reply(&fixture).await.contains("full name"));
        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Idle);
        assert!(
            fixture.people.find_by_identifier("").await.expect("find").is_empty(),
            "nothing may be inserted without a name"
        );
    }

    #[tokio::test]
    async fn updates_without_text_are_ignored_silently() {
        let fixture = fixture();

        let bare = Update { update_id: 1, message: None };
        fixture.engine.handle_update(&bare).await.expect("handle");

        assert!(fixture.chat.sent_texts().await.is_empty());
    }

    #[tokio::test]
    async fn start_when_already_authenticated_goes_idle_with_welcome() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;
        let registrations = fixture.chat.menu_registrations();

        send(&fixture, 42, "/start").await;

        let session = fixture.sessions.get_or_create(42).await.expect("session");
        assert_eq!(session.state, ConversationState::Idle);
        assert!(last_reply(&fixture).await.contains("Welcome back"));
        assert_eq!(fixture.chat.menu_registrations(), registrations + 1);
    }

    #[tokio::test]
    async fn wizard_steps_prompt_in_fixed_order() {
        let fixture = fixture();
        authenticate(&fixture, 42).await;

        send(&fixture, 42, "/add").await;
        assert_eq!(last_reply(&fixture).await, AddPersonStep::Name.prompt());
        send(&fixture, 42, "Jane Doe").await;
        assert_eq!(last_reply(&fixture).await, AddPersonStep::Email.prompt());
        send(&fixture, 42, "skip").await;
        assert_eq!(last_reply(&fixture).await, AddPersonStep::Company.prompt());
    }
}
