//! Full sessions driven through the framed transport
use std::io::Cursor;

use kvlang_language_server::config::Config;
use kvlang_language_server::lsp::transport::read_message;
use kvlang_language_server::lsp::{Server, ServerError, ServerState};
use serde_json::{Value, json};

fn frame(message: &Value) -> String {
    let body = message.to_string();
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
}

struct Session {
    outcome: Result<i32, ServerError>,
    state: ServerState,
    replies: Vec<Value>,
}

fn run_session(config: Config, messages: &[Value]) -> Session {
    let input: String = messages.iter().map(frame).collect();
    let mut reader = Cursor::new(input.into_bytes());
    let mut output = Vec::new();

    let mut server = Server::new(config);
    let outcome = server.run(&mut reader, &mut output);

    let mut replies = Vec::new();
    let mut reader = Cursor::new(output);
    while let Ok(value) = read_message(&mut reader) {
        replies.push(value);
    }
    Session {
        outcome,
        state: server.state(),
        replies,
    }
}

fn initialize() -> Value {
    json!({"jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {"processId": 9484, "rootPath": "path_root"}})
}

fn initialized() -> Value {
    json!({"jsonrpc": "2.0", "method": "initialized", "params": {}})
}

fn shutdown() -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "method": "shutdown"})
}

fn exit() -> Value {
    json!({"jsonrpc": "2.0", "method": "exit"})
}

fn did_open(uri: &str, language_id: &str, text: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didOpen",
        "params": {"textDocument": {"uri": uri, "languageId": language_id, "version": 1, "text": text}}
    })
}

#[test]
fn test_shutdown_then_exit_exits_cleanly() {
    let session = run_session(Config::default(), &[initialize(), shutdown(), exit()]);
    assert_eq!(session.outcome.unwrap(), 0);
    assert_eq!(session.state, ServerState::ExitSuccess);
    assert_eq!(session.replies.len(), 2);
    assert_eq!(session.replies[1], json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
}

#[test]
fn test_exit_without_shutdown_is_an_error() {
    let session = run_session(Config::default(), &[initialize(), exit()]);
    assert_eq!(session.outcome.unwrap(), 1);
    assert_eq!(session.state, ServerState::ExitError);
}

#[test]
fn test_stream_ending_without_exit() {
    let session = run_session(Config::default(), &[initialize()]);
    assert!(session.outcome.is_err());
    assert_eq!(session.state, ServerState::ExitError);
    assert_eq!(session.replies.len(), 1);
}

#[test]
fn test_unknown_request_keeps_its_id() {
    let session = run_session(
        Config::default(),
        &[
            json!({"jsonrpc": "2.0", "id": "req-9", "method": "textDocument/formatting", "params": {}}),
            shutdown(),
            exit(),
        ],
    );
    let error = &session.replies[0];
    assert_eq!(error["id"], "req-9");
    assert_eq!(error["error"]["code"], -32601);
    assert_eq!(
        error["error"]["message"],
        "Server does not support request with method='textDocument/formatting'"
    );
}

#[test]
fn test_open_and_close_publish_diagnostics() {
    let session = run_session(
        Config::default(),
        &[
            initialize(),
            initialized(),
            did_open("file:///main.py", "python", "X=1\n#<KvLang>\n<A\n#</KvLang>\n"),
            json!({"jsonrpc": "2.0", "method": "textDocument/didClose", "params": {"textDocument": {"uri": "file:///main.py"}}}),
            shutdown(),
            exit(),
        ],
    );
    assert_eq!(session.outcome.unwrap(), 0);

    let published: Vec<_> = session
        .replies
        .iter()
        .filter(|reply| reply["method"] == "textDocument/publishDiagnostics")
        .collect();
    assert_eq!(published.len(), 2);

    let opened = &published[0]["params"];
    assert_eq!(opened["uri"], "file:///main.py");
    assert_eq!(
        opened["diagnostics"],
        json!([{
            "range": {"start": {"line": 2, "character": 0}, "end": {"line": 2, "character": 0}},
            "severity": 1,
            "code": "KvLang100",
            "source": "kvlint",
            "message": "Invalid rule (must be inside <>)"
        }])
    );
    assert_eq!(
        published[1]["params"],
        json!({"uri": "file:///main.py", "diagnostics": []})
    );
}

#[test]
fn test_save_of_unknown_document_is_ignored() {
    let session = run_session(
        Config::default(),
        &[
            json!({"jsonrpc": "2.0", "method": "textDocument/didSave", "params": {"textDocument": {"uri": "file:///never.kv"}, "text": "<A\n"}}),
            shutdown(),
            exit(),
        ],
    );
    assert_eq!(session.outcome.unwrap(), 0);
    assert_eq!(session.replies.len(), 1);
}

#[test]
fn test_disabled_syntax_check_is_announced() {
    let config = Config {
        syntax_check: false,
        ..Config::default()
    };
    let session = run_session(
        config,
        &[
            initialize(),
            initialized(),
            did_open("file:///a.kv", "kv", "<A\n"),
            shutdown(),
            exit(),
        ],
    );
    let notice = &session.replies[1];
    assert_eq!(notice["method"], "window/logMessage");
    assert_eq!(notice["params"]["type"], 3);

    let published = &session.replies[2];
    assert_eq!(published["method"], "textDocument/publishDiagnostics");
    assert_eq!(published["params"]["diagnostics"], json!([]));
}

#[test]
fn test_notifications_never_get_an_answer() {
    let session = run_session(
        Config::default(),
        &[
            initialized(),
            json!({"jsonrpc": "2.0", "method": "textDocument/didChange", "params": {"textDocument": {"uri": "a.kv", "version": 2}, "contentChanges": []}}),
            json!({"jsonrpc": "2.0", "method": "$/cancelRequest", "params": {"id": 4}}),
            shutdown(),
            exit(),
        ],
    );
    assert_eq!(session.replies.len(), 1);
    assert_eq!(session.replies[0]["id"], 1);
}
