use super::*;
use crate::core::config::data::Settings;
use crate::core::config::io::AppPaths;
use crate::core::app::AppInit;
use crate::utils::test_utils::FakeGateway;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn started_app(dir: &Path) -> App {
    let gateway = Arc::new(FakeGateway::default());
    let mut app = App::open(
        gateway,
        AppInit {
            paths: AppPaths::under(dir),
            settings: Settings::default(),
            env_api_key: Some("sk-test".to_string()),
        },
    );
    app.start().await.expect("startup");
    app
}

fn output(result: CommandResult) -> String {
    match result {
        CommandResult::Output(text) => text,
        _ => panic!("expected output"),
    }
}

fn reload(result: CommandResult) -> String {
    match result {
        CommandResult::Reload(text) => text,
        _ => panic!("expected reload"),
    }
}

#[tokio::test]
async fn plain_text_is_sent_as_a_message() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    match process_input(&mut app, "hello there") {
        CommandResult::ProcessAsMessage(text) => assert_eq!(text, "hello there"),
        _ => panic!("expected message"),
    }
    assert!(matches!(
        process_input(&mut app, "/"),
        CommandResult::ProcessAsMessage(_)
    ));
}

#[tokio::test]
async fn help_lists_every_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    let help = output(process_input(&mut app, "/help"));
    for command in all_commands() {
        assert!(help.contains(command.usage), "missing {}", command.usage);
    }
}

#[tokio::test]
async fn unknown_commands_are_not_sent() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    assert_eq!(
        output(process_input(&mut app, "/frobnicate now")),
        "Unknown command /frobnicate. Type /help for the list."
    );
}

#[tokio::test]
async fn command_names_ignore_case() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    assert!(matches!(process_input(&mut app, "/QUIT"), CommandResult::Quit));
    assert!(matches!(
        process_input(&mut app, "/refresh"),
        CommandResult::RefreshModels
    ));
}

#[tokio::test]
async fn model_switch_saves_the_previous_chat_and_reloads() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    app.send("first").await.expect("turn");

    assert_eq!(
        output(process_input(&mut app, "/model acme/writer")),
        "Already using acme/writer."
    );
    let note = reload(process_input(&mut app, "/model acme/vision"));
    assert!(note.starts_with("Saved the acme/writer chat"), "{note}");
    assert!(note.ends_with("Switched to acme/vision."));
    assert_eq!(app.session.selected_model, "acme/vision");
    assert!(app.session.messages.is_empty());

    assert_eq!(
        output(process_input(&mut app, "/model nope/missing")),
        "Unknown model 'nope/missing'"
    );
}

#[tokio::test]
async fn models_and_info_describe_the_catalog() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    let listing = output(process_input(&mut app, "/models"));
    assert!(listing.contains("acme/vision"));
    assert!(listing.contains("acme/free"));

    let info = output(process_input(&mut app, "/info"));
    assert!(info.contains("acme/writer"));
    assert_eq!(
        output(process_input(&mut app, "/info nope/missing")),
        "Unknown model 'nope/missing'"
    );
}

#[tokio::test]
async fn set_validates_parameters() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;

    assert_eq!(
        output(process_input(&mut app, "/set temperature 0.5")),
        "temperature = 0.5"
    );
    assert_eq!(
        output(process_input(&mut app, "/set temperature 7")),
        "temperature = 1.0 ('7' rejected, expected number in [0, 2]; using the default)"
    );
    assert!(output(process_input(&mut app, "/set max_tokens 100000"))
        .ends_with("(limited to the model's context window)"));
    assert_eq!(app.session.params.max_tokens, 8192);

    assert!(output(process_input(&mut app, "/set verbosity 3"))
        .starts_with("Unknown parameter 'verbosity'"));
    assert_eq!(
        output(process_input(&mut app, "/set temperature")),
        "Usage: /set <param> <value>"
    );
}

#[tokio::test]
async fn system_prompt_can_be_set_shown_and_cleared() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;

    assert_eq!(output(process_input(&mut app, "/system")), "No system prompt set.");
    process_input(&mut app, "/system  Answer in French. ");
    assert_eq!(app.session.system_prompt, "Answer in French.");
    assert_eq!(
        output(process_input(&mut app, "/system")),
        "System prompt: Answer in French."
    );
    process_input(&mut app, "/system -");
    assert!(app.session.system_prompt.is_empty());
}

#[tokio::test]
async fn history_commands_work_on_saved_chats() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    assert_eq!(
        output(process_input(&mut app, "/history")),
        "No chat history available."
    );

    app.send("remember me").await.expect("turn");
    let listing = output(process_input(&mut app, "/history"));
    assert!(listing.contains("(acme/writer)"), "{listing}");

    let id = app.history()[0].id.to_string();
    reload(process_input(&mut app, "/new"));
    assert!(app.session.messages.is_empty());

    let note = reload(process_input(&mut app, &format!("/load {id}")));
    assert_eq!(note, format!("Loaded {id} (2 messages)."));
    assert_eq!(app.session.messages.len(), 2);

    assert_eq!(
        output(process_input(&mut app, "/load 1999-01-01_00-00-00")),
        "No saved chat named '1999-01-01_00-00-00'"
    );
    assert_eq!(output(process_input(&mut app, "/load")), "Usage: /load <id>");

    assert_eq!(
        reload(process_input(&mut app, "/clear-history")),
        "Removed 1 saved chats."
    );
    assert!(app.history().is_empty());
}

#[tokio::test]
async fn stats_report_tokens_and_cost() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;
    app.send("one two three").await.expect("turn");
    let stats = output(process_input(&mut app, "/stats"));
    assert!(stats.contains("of 8192 context"), "{stats}");
    assert!(stats.contains("Total cost:    $"));
}

#[tokio::test]
async fn attach_reports_missing_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;

    let notes = temp_dir.path().join("notes.txt");
    std::fs::write(&notes, "meeting at noon").unwrap();
    let reply = output(process_input(&mut app, &format!("/attach {}", notes.display())));
    assert!(reply.starts_with("Attached notes.txt (1 pending)"), "{reply}");

    let missing = output(process_input(&mut app, "/attach /nonexistent/file.txt"));
    assert!(!missing.starts_with("Attached"));
    assert_eq!(app.session.attachments.len(), 1);
}

#[tokio::test]
async fn key_and_forget_update_the_saved_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut app = started_app(temp_dir.path()).await;

    assert_eq!(output(process_input(&mut app, "/key sk-new")), "API key saved.");
    assert_eq!(app.session.api_key, "sk-new");
    assert_eq!(app.config.api_key, "sk-new");

    assert_eq!(
        output(process_input(&mut app, "/forget acme/free")),
        "Removed acme/free from the saved catalog."
    );
    assert_eq!(
        output(process_input(&mut app, "/forget acme/free")),
        "acme/free is not in the saved catalog."
    );
}
