//! Request and notification handlers.
//!
//! Routing is a pair of static tables; a method appears in at most one of
//! them.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_lsp::jsonrpc::{Error as RpcError, ErrorCode};
use tower_lsp::lsp_types::{
    ClientInfo, CompletionList, InitializeResult, LogMessageParams, MessageType, SaveOptions,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
};

use crate::core::diagnostics::PublishDiagnosticsParams;
use crate::core::document::{DocumentError, LanguageId};
use crate::lsp::message::{Notification, Request, rpc_error};
use crate::lsp::server::{Server, ServerState};

pub const SERVER_NAME: &str = "kvls";

pub type RequestHandler = fn(&mut Server, &Request) -> Result<Value, RpcError>;
pub type NotificationHandler = fn(&mut Server, &Notification) -> Option<Notification>;

pub static REQUEST_HANDLERS: &[(&str, RequestHandler)] = &[
    ("initialize", initialize),
    ("textDocument/completion", completion),
    ("completionItem/resolve", completion_resolve),
    ("shutdown", shutdown),
];

pub static NOTIFICATION_HANDLERS: &[(&str, NotificationHandler)] = &[
    ("initialized", initialized),
    ("textDocument/didOpen", did_open),
    ("textDocument/didSave", did_save),
    ("textDocument/didClose", did_close),
    ("textDocument/didChange", did_change),
    ("exit", exit),
];

pub fn request_handler(method: &str) -> Option<RequestHandler> {
    REQUEST_HANDLERS
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, handler)| *handler)
}

pub fn notification_handler(method: &str) -> Option<NotificationHandler> {
    NOTIFICATION_HANDLERS
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, handler)| *handler)
}

impl From<DocumentError> for RpcError {
    fn from(error: DocumentError) -> Self {
        rpc_error(ErrorCode::InternalError, error.to_string())
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| rpc_error(ErrorCode::InternalError, e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenedDocument {
    uri: String,
    language_id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct DocumentIdentifier {
    uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidOpenParams {
    text_document: OpenedDocument,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidSaveParams {
    text_document: DocumentIdentifier,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidCloseParams {
    text_document: DocumentIdentifier,
}

/// The parts of `initialize` params the server reads; the rest is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InitializeParams {
    process_id: Option<u32>,
    root_uri: Option<String>,
    client_info: Option<ClientInfo>,
}

fn notify<T: Serialize>(method: &str, params: &T) -> Option<Notification> {
    Notification::with_params(method, params)
        .inspect_err(|e| log::error!("cannot serialize '{method}' params: {e}"))
        .ok()
}

fn publish(params: PublishDiagnosticsParams) -> Option<Notification> {
    log::debug!(
        "publishing {} diagnostic(s) for {}",
        params.diagnostics.len(),
        params.uri
    );
    notify("textDocument/publishDiagnostics", &params)
}

fn initialize(_server: &mut Server, request: &Request) -> Result<Value, RpcError> {
    let params: InitializeParams = match request.params {
        Value::Null => InitializeParams::default(),
        _ => request.params()?,
    };
    if let Some(client) = &params.client_info {
        log::info!(
            "initialize from {} {}",
            client.name,
            client.version.as_deref().unwrap_or("")
        );
    }
    log::debug!(
        "client process {:?}, root {:?}",
        params.process_id,
        params.root_uri
    );

    let sync = TextDocumentSyncOptions {
        open_close: Some(true),
        change: Some(TextDocumentSyncKind::NONE),
        will_save: Some(false),
        will_save_wait_until: Some(false),
        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
            include_text: Some(true),
        })),
    };
    to_result(InitializeResult {
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(sync)),
            ..ServerCapabilities::default()
        },
        server_info: Some(ServerInfo {
            name: SERVER_NAME.to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
        ..InitializeResult::default()
    })
}

fn completion(_server: &mut Server, _request: &Request) -> Result<Value, RpcError> {
    to_result(CompletionList {
        is_incomplete: false,
        items: Vec::new(),
    })
}

fn completion_resolve(server: &mut Server, request: &Request) -> Result<Value, RpcError> {
    completion(server, request)
}

fn shutdown(server: &mut Server, _request: &Request) -> Result<Value, RpcError> {
    log::info!("shutdown requested");
    server.state = ServerState::Shutdown;
    Ok(json!({}))
}

fn initialized(server: &mut Server, _notification: &Notification) -> Option<Notification> {
    let reason = server.engine.parser().unavailable_reason()?;
    if server.parser_notice_sent {
        return None;
    }
    server.parser_notice_sent = true;
    log::warn!("kv syntax checking unavailable: {reason}");
    notify(
        "window/logMessage",
        &LogMessageParams {
            typ: MessageType::INFO,
            message: format!("kvls: syntax errors will not be reported ({reason})"),
        },
    )
}

fn did_open(server: &mut Server, notification: &Notification) -> Option<Notification> {
    let params: DidOpenParams = notification
        .params()
        .inspect_err(|e| log::warn!("{}", e.message))
        .ok()?;
    let document = params.text_document;
    log::info!("opened {} ({})", document.uri, document.language_id);

    let diagnostics = server.documents.open(
        &document.uri,
        LanguageId::from(document.language_id.as_str()),
        document.text,
        &server.engine,
    );
    publish(PublishDiagnosticsParams::new(document.uri, diagnostics))
}

fn did_save(server: &mut Server, notification: &Notification) -> Option<Notification> {
    let params: DidSaveParams = notification
        .params()
        .inspect_err(|e| log::warn!("{}", e.message))
        .ok()?;
    let uri = params.text_document.uri;

    match server.documents.save(&uri, params.text, &server.engine) {
        Ok(diagnostics) => publish(PublishDiagnosticsParams::new(uri, diagnostics)),
        Err(error) => {
            log::warn!("ignoring save: {error}");
            None
        }
    }
}

fn did_close(server: &mut Server, notification: &Notification) -> Option<Notification> {
    let params: DidCloseParams = notification
        .params()
        .inspect_err(|e| log::warn!("{}", e.message))
        .ok()?;
    log::info!("closed {}", params.text_document.uri);
    publish(server.documents.close(&params.text_document.uri))
}

/// Documents are only linted on open and save.
fn did_change(_server: &mut Server, _notification: &Notification) -> Option<Notification> {
    None
}

fn exit(server: &mut Server, _notification: &Notification) -> Option<Notification> {
    server.state = if server.state == ServerState::Shutdown {
        ServerState::ExitSuccess
    } else {
        log::warn!("exit received without shutdown");
        ServerState::ExitError
    };
    None
}
