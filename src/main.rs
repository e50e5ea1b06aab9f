use anyhow::Result;
use lsp_server::{Connection, Message, Response};
use lsp_types::{
    InitializeParams, InitializeResult, OneOf, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vbscript_lsp::config::{Cli, ServerConfig};
use vbscript_lsp::core::DocumentManager;
use vbscript_lsp::message_handler::{LspConnection, MessageHandler};

// Implement LspConnection for the real lsp_server::Connection
struct ConnectionWrapper<'a>(&'a Connection);

impl LspConnection for ConnectionWrapper<'_> {
    fn send_response(&self, response: Response) -> Result<()> {
        self.0.sender.send(Message::Response(response))?;
        Ok(())
    }
}

fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
        document_symbol_provider: Some(OneOf::Left(true)),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        ..Default::default()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let (connection, io_threads) = Connection::stdio();

    let (initialize_id, initialize_params) = connection.initialize_start()?;
    let params: InitializeParams = serde_json::from_value(initialize_params)?;

    #[allow(deprecated)]
    let workspace_root = cli
        .workspace_root
        .or_else(|| {
            params
                .root_uri
                .as_ref()
                .and_then(|uri| uri.as_str().strip_prefix("file://").map(PathBuf::from))
        })
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Unrecoverable startup failures (missing root, bad encoding label) exit
    // non-zero before the handshake completes.
    let config = ServerConfig::new(workspace_root, cli.encoding.as_deref())?;
    tracing::info!(root = %config.workspace_root.display(), "LSP workspace root");

    let initialize_result = InitializeResult {
        capabilities: server_capabilities(),
        server_info: Some(ServerInfo {
            name: "vbscript-lsp".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    };
    connection.initialize_finish(initialize_id, serde_json::to_value(initialize_result)?)?;

    let mut document_manager = DocumentManager::new(config);

    // The scan is synchronous: it finishes before the first request is read.
    document_manager.scan_workspace();

    main_loop(connection, document_manager)?;

    io_threads.join()?;

    Ok(())
}

fn main_loop(connection: Connection, mut document_manager: DocumentManager) -> Result<()> {
    let mut message_handler = MessageHandler::new();
    let connection_wrapper = ConnectionWrapper(&connection);

    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    return Ok(());
                }
                message_handler.handle_request(&connection_wrapper, req, &document_manager)?;
            }
            Message::Notification(not) => {
                message_handler.handle_notification(not, &mut document_manager)?;
            }
            Message::Response(_resp) => {}
        }
    }

    Ok(())
}
