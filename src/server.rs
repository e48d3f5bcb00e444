use std::sync::Arc;

use log::{debug, warn};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::session::Session;
use crate::{FALLBACK_LANG, resolve_video_id};

pub const SERVER_NAME: &str = "Youtube Transcript";
pub const GET_TRANSCRIPT: &str = "get_transcript";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTranscriptInput {
    /// The URL of the YouTube video
    pub url: String,
    /// The preferred language for the transcript
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    FALLBACK_LANG.to_string()
}

/// MCP handler exposing the `get_transcript` tool over a shared session
#[derive(Clone)]
pub struct TranscriptServer {
    session: Arc<Session>,
}

impl TranscriptServer {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn tools() -> Result<Vec<Tool>, ErrorData> {
        let schema = serde_json::to_value(schemars::schema_for!(GetTranscriptInput))
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        let Value::Object(schema) = schema else {
            return Err(ErrorData::internal_error("tool schema is not an object", None));
        };

        Ok(vec![Tool::new(
            GET_TRANSCRIPT,
            "Retrieves the transcript of a YouTube video.",
            Arc::new(schema),
        )])
    }

    /// Resolve the URL and fetch its transcript; failures become tool errors, not protocol errors
    pub async fn get_transcript(&self, input: GetTranscriptInput) -> CallToolResult {
        let result = match resolve_video_id(&input.url) {
            Ok(video) => self.session.fetch(&video, &input.lang).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => {
                warn!("get_transcript failed for {}: {e}", input.url);
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }

    /// Dispatch a tool call by name
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> Result<CallToolResult, ErrorData> {
        debug!("Tool call: {name}");
        match name {
            GET_TRANSCRIPT => {
                let arguments = Value::Object(arguments.unwrap_or_default());
                let input: GetTranscriptInput = serde_json::from_value(arguments)
                    .map_err(|e| ErrorData::invalid_params(e.to_string(), None))?;
                Ok(self.get_transcript(input).await)
            }
            other => Err(ErrorData::invalid_params(format!("unknown tool: {other}"), None)),
        }
    }
}

impl ServerHandler for TranscriptServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some("Use get_transcript to read the transcript of a YouTube video.".to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(Self::tools()?))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.call(&request.name, request.arguments).await
    }
}
