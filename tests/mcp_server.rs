use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chart_mcp::mcp::{LineReader, LineWriter, McpServer};
use chart_mcp::{ChartService, RendererConfig};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_secs(30);

struct Client {
    input: DuplexStream,
    output: BufReader<DuplexStream>,
    server: JoinHandle<std::io::Result<()>>,
}

impl Client {
    fn start(config: RendererConfig) -> Self {
        let (input, server_in) = tokio::io::duplex(1 << 20);
        let (server_out, output) = tokio::io::duplex(1 << 20);

        let service = ChartService::new(chart_mcp::new_renderer(config));
        let server = tokio::spawn(async move {
            McpServer::new(service)
                .serve(
                    LineReader::new(BufReader::new(server_in)),
                    LineWriter::new(server_out),
                    std::future::pending(),
                )
                .await
        });

        Self {
            input,
            output: BufReader::new(output),
            server,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.input.write_all(line.as_bytes()).await.unwrap();
        self.input.write_all(b"\n").await.unwrap();
    }

    async fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string()).await;
    }

    async fn recv(&mut self) -> Value {
        let mut line = String::new();
        let read = tokio::time::timeout(TIMEOUT, self.output.read_line(&mut line))
            .await
            .expect("server response timed out")
            .unwrap();
        assert!(read > 0, "server closed its output");
        serde_json::from_str(&line).unwrap()
    }

    async fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await;
        let response = self.recv().await;
        assert_eq!(response["id"], json!(id), "{response}");
        response
    }

    async fn initialize(&mut self) {
        let response = self
            .request(
                0,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "test", "version": "1" }
                }),
            )
            .await;
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "chart-mcp");
        self.send(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .await;
    }

    async fn call(&mut self, id: i64, arguments: Value) -> Value {
        let response = self
            .request(id, "tools/call", json!({ "name": "generateChart", "arguments": arguments }))
            .await;
        response["result"].clone()
    }

    async fn finish(self) {
        let Client { input, output, server } = self;
        drop(input);
        let result = tokio::time::timeout(TIMEOUT, server)
            .await
            .expect("server did not shut down")
            .unwrap();
        assert!(result.is_ok(), "{result:?}");
        drop(output);
    }
}

fn bar() -> Value {
    json!({ "type": "bar", "data": { "labels": ["A", "B"], "datasets": [{ "label": "x", "data": [1, 2] }] } })
}

fn text_of(result: &Value) -> &str {
    assert_eq!(result["content"][0]["type"], "text", "{result}");
    result["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn requests_before_initialisation_are_rejected() {
    let mut client = Client::start(RendererConfig::default());
    let response = client.request(1, "tools/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32600);

    let response = client.request(2, "tools/call", json!({ "name": "generateChart" })).await;
    assert_eq!(response["error"]["code"], -32600);

    // ping is always allowed
    let response = client.request(3, "ping", json!({})).await;
    assert_eq!(response["result"], json!({}));
    client.finish().await;
}

#[tokio::test]
async fn lists_the_generate_chart_tool() {
    let mut client = Client::start(RendererConfig::default());
    client.initialize().await;

    let response = client.request(1, "tools/list", json!({})).await;
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "generateChart");
    assert_eq!(
        tools[0]["inputSchema"]["properties"]["outputFormat"]["enum"],
        json!(["raster", "markup"])
    );
    client.finish().await;
}

#[tokio::test]
async fn raster_call_returns_inline_png() {
    let mut client = Client::start(RendererConfig::default());
    client.initialize().await;

    let result = client.call(1, json!({ "chartConfig": bar() })).await;
    assert!(result.get("isError").is_none(), "{result}");
    let block = &result["content"][0];
    assert_eq!(block["type"], "image");
    assert_eq!(block["mimeType"], "image/png");
    let png = BASE64.decode(block["data"].as_str().unwrap()).unwrap();
    assert_eq!(png[..4], [0x89, 0x50, 0x4E, 0x47]);
    client.finish().await;
}

#[tokio::test]
async fn markup_and_saved_calls_return_text() {
    let tmp = tempfile::tempdir().unwrap();
    let mut client = Client::start(RendererConfig {
        output_dir: tmp.path().to_path_buf(),
        ..Default::default()
    });
    client.initialize().await;

    let result = client
        .call(1, json!({ "chartConfig": bar(), "outputFormat": "markup" }))
        .await;
    assert!(text_of(&result).contains("<canvas"));

    let result = client
        .call(2, json!({ "chartConfig": bar(), "outputFormat": "html" }))
        .await;
    assert!(text_of(&result).contains("<canvas"));

    let result = client
        .call(3, json!({ "chartConfig": bar(), "saveToFile": true }))
        .await;
    let uri = text_of(&result);
    assert!(uri.starts_with("file://") && uri.ends_with(".png"), "{uri}");
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    client.finish().await;
}

#[tokio::test]
async fn failures_are_tool_errors_with_a_hint() {
    let mut client = Client::start(RendererConfig::default());
    client.initialize().await;

    let result = client
        .call(1, json!({ "chartConfig": { "type": "bar", "data": { "datasets": [] } } }))
        .await;
    assert_eq!(result["isError"], true);
    let text = text_of(&result);
    assert!(text.starts_with("Error generating chart: "), "{text}");
    assert!(text.contains("at least one dataset"));
    assert!(text.contains("Chart.js v4"));

    // missing chartConfig reaches the validator as null
    let result = client.call(2, json!({})).await;
    assert_eq!(result["isError"], true);
    assert!(text_of(&result).contains("non-null object"));

    // bad arguments are a tool error, not a protocol error
    let result = client
        .call(3, json!({ "chartConfig": bar(), "outputFormat": "svg" }))
        .await;
    assert_eq!(result["isError"], true);

    let response = client
        .request(4, "tools/call", json!({ "name": "drawPicture", "arguments": {} }))
        .await;
    assert_eq!(response["result"]["isError"], true);
    assert!(text_of(&response["result"]).contains("Unknown tool"));
    client.finish().await;
}

#[tokio::test]
async fn protocol_errors() {
    let mut client = Client::start(RendererConfig::default());
    client.initialize().await;

    let response = client.request(1, "resources/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);

    client.send_raw("this is not json").await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);

    let response = client.request(2, "initialize", json!({ "protocolVersion": "2024-11-05" })).await;
    assert_eq!(response["error"]["code"], -32600);

    // blank lines are ignored and the session keeps going
    client.send_raw("").await;
    let response = client.request(3, "ping", json!({})).await;
    assert_eq!(response["result"], json!({}));
    client.finish().await;
}

#[tokio::test]
async fn pending_calls_complete_after_input_closes() {
    let mut client = Client::start(RendererConfig::default());
    client.initialize().await;

    for id in 1..=4 {
        client
            .send(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": { "name": "generateChart", "arguments": { "chartConfig": bar() } }
            }))
            .await;
    }
    client.input.shutdown().await.unwrap();

    let mut ids = Vec::new();
    for _ in 0..4 {
        let response = client.recv().await;
        assert_eq!(response["result"]["content"][0]["type"], "image");
        ids.push(response["id"].as_i64().unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    client.finish().await;
}

#[tokio::test]
async fn a_line_split_across_writes_survives_call_completion() {
    let mut client = Client::start(RendererConfig::default());
    client.initialize().await;

    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "generateChart", "arguments": { "chartConfig": bar() } }
        }))
        .await;

    // half a request is on the wire while the tool call finishes
    let ping = json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" }).to_string();
    let (head, tail) = ping.split_at(ping.len() / 2);
    client.input.write_all(head.as_bytes()).await.unwrap();
    client.input.flush().await.unwrap();

    let response = client.recv().await;
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["content"][0]["type"], "image");

    client.send_raw(tail).await;
    let response = client.recv().await;
    assert_eq!(response["id"], 2, "{response}");
    assert_eq!(response["result"], json!({}));
    client.finish().await;
}
