//! Request and notification dispatch.
//!
//! One handler per LSP method, tried in sequence with `cast_request` /
//! `cast_notification`. Every request is answered: a handler that finds
//! nothing answers `null` (or an empty array), never an error over the wire.

use crate::core::DocumentManager;
use crate::features::{DefinitionProvider, ReferencesProvider, SymbolsProvider};
use anyhow::Result;
use lsp_server::{Notification, Request, RequestId, Response};
use lsp_types::notification::{
    Cancel, DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument,
};
use lsp_types::request::{DocumentSymbolRequest, GotoDefinition, References};
use lsp_types::DocumentSymbolResponse;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Outbound half of the LSP connection.
///
/// Responses are the only messages this server originates (it publishes no
/// diagnostics or progress), so the seam is a single method. Tests implement
/// it with a recording sink instead of a real stdio transport.
pub trait LspConnection {
    fn send_response(&self, response: Response) -> Result<()>;
}

/// Dispatches LSP messages to the feature providers.
pub struct MessageHandler {
    symbols_provider: SymbolsProvider,
    definition_provider: DefinitionProvider,
    references_provider: ReferencesProvider,
}

impl MessageHandler {
    pub fn new() -> Self {
        Self {
            symbols_provider: SymbolsProvider::new(),
            definition_provider: DefinitionProvider::new(),
            references_provider: ReferencesProvider::new(),
        }
    }

    pub fn handle_request<C: LspConnection>(
        &mut self,
        connection: &C,
        req: Request,
        document_manager: &DocumentManager,
    ) -> Result<()> {
        match Self::cast_request::<DocumentSymbolRequest>(req.clone()) {
            Ok((id, params)) => {
                let uri = &params.text_document.uri;
                let result = self
                    .symbols_provider
                    .provide(uri, document_manager)
                    .map(DocumentSymbolResponse::Nested);

                let response = Response::new_ok(id, result);
                connection.send_response(response)?;
                return Ok(());
            }
            Err(req) => req,
        };

        match Self::cast_request::<GotoDefinition>(req.clone()) {
            Ok((id, params)) => {
                let uri = &params.text_document_position_params.text_document.uri;
                let position = params.text_document_position_params.position;

                let result = self
                    .definition_provider
                    .provide(uri, position, document_manager);

                let response = Response::new_ok(id, result);
                connection.send_response(response)?;
                return Ok(());
            }
            Err(req) => req,
        };

        match Self::cast_request::<References>(req.clone()) {
            Ok((id, params)) => {
                let uri = &params.text_document_position.text_document.uri;
                let position = params.text_document_position.position;
                let include_declaration = params.context.include_declaration;

                let result = self.references_provider.provide(
                    uri,
                    position,
                    include_declaration,
                    document_manager,
                );

                let response = Response::new_ok(id, result);
                connection.send_response(response)?;
                return Ok(());
            }
            Err(req) => {
                // Unknown request: answer null so the client is not left waiting.
                debug!(method = req.method.as_str(), "unhandled request");
                let response = Response::new_ok(req.id, serde_json::Value::Null);
                connection.send_response(response)?;
            }
        };

        Ok(())
    }

    pub fn handle_notification(
        &mut self,
        not: Notification,
        document_manager: &mut DocumentManager,
    ) -> Result<()> {
        match Self::cast_notification::<DidOpenTextDocument>(not.clone()) {
            Ok(params) => {
                document_manager.open(params);
                return Ok(());
            }
            Err(not) => not,
        };

        match Self::cast_notification::<DidChangeTextDocument>(not.clone()) {
            Ok(params) => {
                document_manager.change(params);
                return Ok(());
            }
            Err(not) => not,
        };

        match Self::cast_notification::<DidCloseTextDocument>(not.clone()) {
            Ok(params) => {
                document_manager.close(params);
                return Ok(());
            }
            Err(not) => not,
        };

        match Self::cast_notification::<Cancel>(not.clone()) {
            Ok(_params) => {
                // Requests are handled synchronously in receive order, so a
                // cancellation can never arrive before its request completes.
                return Ok(());
            }
            Err(_not) => {
                // Unknown notification, ignore
            }
        };

        Ok(())
    }

    fn cast_request<R>(req: Request) -> std::result::Result<(RequestId, R::Params), Request>
    where
        R: lsp_types::request::Request,
        R::Params: DeserializeOwned,
    {
        match req.extract(R::METHOD) {
            Ok(params) => Ok(params),
            Err(lsp_server::ExtractError::MethodMismatch(req)) => Err(req),
            Err(lsp_server::ExtractError::JsonError { method, error }) => {
                error!("Failed to deserialize request {}: {}", method, error);
                Err(Request::new(
                    RequestId::from(0),
                    method.to_string(),
                    serde_json::Value::Null,
                ))
            }
        }
    }

    fn cast_notification<N>(not: Notification) -> std::result::Result<N::Params, Notification>
    where
        N: lsp_types::notification::Notification,
        N::Params: DeserializeOwned,
    {
        match not.extract(N::METHOD) {
            Ok(params) => Ok(params),
            Err(lsp_server::ExtractError::MethodMismatch(not)) => Err(not),
            Err(lsp_server::ExtractError::JsonError { method, error }) => {
                error!("Failed to deserialize notification {}: {}", method, error);
                Err(Notification::new(
                    method.to_string(),
                    serde_json::Value::Null,
                ))
            }
        }
    }
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::new()
    }
}
