//! Blocking stdio server loop and lifecycle state.
//!
//! One message is read, handled and answered at a time. The loop ends when
//! the client sends `exit` or the stream fails.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tower_lsp::jsonrpc::{ErrorCode, Id};

use crate::config::Config;
use crate::core::document::TextDocumentStore;
use crate::lsp::handlers;
use crate::lsp::message::{
    Message, MessageError, Notification, Request, Response, method_not_found, rpc_error,
};
use crate::lsp::transport::{self, TransportError};
use crate::validation::LintEngine;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Lifecycle of the server process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Offline,
    Running,
    /// `shutdown` was answered; only `exit` is expected now
    Shutdown,
    ExitSuccess,
    ExitError,
}

impl ServerState {
    /// Process exit code, once the server has stopped
    pub fn exit_code(self) -> Option<i32> {
        match self {
            ServerState::ExitSuccess => Some(0),
            ServerState::ExitError => Some(1),
            _ => None,
        }
    }
}

/// Anything the server writes to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    Response(Response),
    Notification(Notification),
}

#[derive(Debug)]
pub struct Server {
    pub(super) state: ServerState,
    pub(super) documents: TextDocumentStore,
    pub(super) engine: LintEngine,
    pub(super) config: Config,
    /// Whether the client was already told the parser is unavailable
    pub(super) parser_notice_sent: bool,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let engine = LintEngine::from_config(&config);
        Self::with_engine(config, engine)
    }

    pub fn with_engine(config: Config, engine: LintEngine) -> Self {
        Self {
            state: ServerState::Offline,
            documents: TextDocumentStore::new(),
            engine,
            config,
            parser_notice_sent: false,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn documents(&self) -> &TextDocumentStore {
        &self.documents
    }

    pub fn engine(&self) -> &LintEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serve until `exit`, returning the process exit code.
    ///
    /// Framing failures other than an unparsable JSON payload end the loop
    /// with an error.
    pub fn run<R: BufRead, W: Write>(&mut self, reader: &mut R, writer: &mut W) -> ServerResult<i32> {
        self.state = ServerState::Running;
        log::info!("kvls {} running", env!("CARGO_PKG_VERSION"));

        loop {
            let outgoing = match transport::read_message(reader) {
                Ok(value) => self.handle_value(value),
                Err(error) if error.is_recoverable() => {
                    log::warn!("dropping unparsable message: {error}");
                    Some(Outgoing::Response(Response::failure(
                        Id::Null,
                        rpc_error(ErrorCode::ParseError, error.to_string()),
                    )))
                }
                Err(error) => {
                    log::error!("reading from client failed: {error}");
                    self.state = ServerState::ExitError;
                    return Err(error.into());
                }
            };

            if let Some(outgoing) = outgoing
                && let Err(error) = transport::write_message(writer, &outgoing)
            {
                log::error!("writing to client failed: {error}");
                self.state = ServerState::ExitError;
                return Err(error.into());
            }

            if let Some(code) = self.state.exit_code() {
                log::info!("exiting with code {code}");
                return Ok(code);
            }
        }
    }

    /// Classify one decoded payload and handle it.
    pub fn handle_value(&mut self, value: Value) -> Option<Outgoing> {
        match Message::from_value(value) {
            Ok(message) => self.handle_message(message),
            Err(MessageError::Unclassified { id: Some(id) }) => {
                log::warn!("invalid message with id {id}");
                Some(Outgoing::Response(Response::failure(
                    id,
                    rpc_error(ErrorCode::InvalidRequest, "Invalid request"),
                )))
            }
            Err(error) => {
                log::warn!("dropping message: {error}");
                None
            }
        }
    }

    pub fn handle_message(&mut self, message: Message) -> Option<Outgoing> {
        match message {
            Message::Request(request) => Some(Outgoing::Response(self.handle_request(request))),
            Message::Notification(notification) => self
                .handle_notification(notification)
                .map(Outgoing::Notification),
            Message::Response(response) => {
                log::debug!("ignoring response to request {}", response.id);
                None
            }
        }
    }

    fn handle_request(&mut self, request: Request) -> Response {
        log::debug!("request {} '{}'", request.id, request.method);

        if self.state == ServerState::Shutdown {
            return Response::failure(
                request.id,
                rpc_error(
                    ErrorCode::InvalidRequest,
                    format!("'{}' received after shutdown", request.method),
                ),
            );
        }

        let outcome = match handlers::request_handler(&request.method) {
            Some(handler) => handler(self, &request),
            None => {
                log::warn!("unsupported request '{}'", request.method);
                Err(method_not_found(&request.method))
            }
        };
        if let Err(error) = &outcome {
            log::warn!("request '{}' failed: {}", request.method, error.message);
        }
        Response::from_result(request.id, outcome)
    }

    fn handle_notification(&mut self, notification: Notification) -> Option<Notification> {
        let Some(handler) = handlers::notification_handler(&notification.method) else {
            if notification.method.starts_with("$/") {
                log::debug!("ignoring notification '{}'", notification.method);
            } else {
                log::info!("unsupported notification '{}'", notification.method);
            }
            return None;
        };

        if self.state == ServerState::Shutdown && notification.method != "exit" {
            log::debug!("ignoring '{}' after shutdown", notification.method);
            return None;
        }
        handler(self, &notification)
    }
}
