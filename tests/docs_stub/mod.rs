//! In-process stand-in for the document and drive HTTP APIs. Each document is
//! one paragraph of plain text starting at index 1; batch updates are applied
//! to that text literally and recorded for inspection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const TOKEN: &str = "test-token";

#[derive(Debug, Default)]
pub struct StubState {
    pub documents: HashMap<String, String>,
    /// `(document id, requests)` per batch update, in arrival order.
    pub batches: Vec<(String, Vec<Value>)>,
    pub copies: Vec<(String, String)>,
}

pub struct DocsStub {
    pub base_url: String,
    pub state: Arc<Mutex<StubState>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DocsStub {
    pub fn spawn(documents: &[(&str, &str)]) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start docs stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let state = Arc::new(Mutex::new(StubState {
            documents: documents
                .iter()
                .map(|(id, text)| ((*id).to_owned(), (*text).to_owned()))
                .collect(),
            ..StubState::default()
        }));
        let server_state = Arc::clone(&state);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let authorized = request.headers().iter().any(|header| {
                    header.field.equiv("Authorization")
                        && header.value.as_str() == format!("Bearer {TOKEN}")
                });
                if !authorized {
                    let _ = request.respond(json_response(401, error_body(401, "unauthorized")));
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(json_response(400, error_body(400, "bad body")));
                    continue;
                }

                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url).to_owned();
                let method = request.method().clone();
                let mut state = server_state.lock().expect("stub state");
                let (status, response) = route(&mut state, &method, &path, &url, &body);
                drop(state);
                let _ = request.respond(json_response(status, response));
            }
        });

        Self {
            base_url,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn text(&self, document_id: &str) -> Option<String> {
        self.state
            .lock()
            .expect("stub state")
            .documents
            .get(document_id)
            .cloned()
    }

    pub fn batches(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().expect("stub state").batches.clone()
    }
}

impl Drop for DocsStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn route(
    state: &mut StubState,
    method: &tiny_http::Method,
    path: &str,
    url: &str,
    body: &str,
) -> (u16, Value) {
    if let Some(rest) = path.strip_prefix("/v1/documents/") {
        if let Some(id) = rest.strip_suffix(":batchUpdate") {
            if method != &tiny_http::Method::Post {
                return (405, error_body(405, "method not allowed"));
            }
            return batch_update(state, id, body);
        }
        if method != &tiny_http::Method::Get {
            return (405, error_body(405, "method not allowed"));
        }
        return match state.documents.get(rest) {
            Some(text) => (200, document_json(rest, text)),
            None => (404, error_body(404, "Requested entity was not found.")),
        };
    }

    if let Some(rest) = path.strip_prefix("/drive/v3/files/")
        && let Some(template_id) = rest.strip_suffix("/copy")
    {
        if !url.contains("fields=id%2CwebViewLink") && !url.contains("fields=id,webViewLink") {
            return (400, error_body(400, "missing fields"));
        }
        let Some(text) = state.documents.get(template_id).cloned() else {
            return (404, error_body(404, "File not found."));
        };
        let title = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("name").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_default();
        let new_id = format!("copy-{}", state.copies.len() + 1);
        state.documents.insert(new_id.clone(), text);
        state.copies.push((template_id.to_owned(), title));
        return (
            200,
            json!({
                "id": new_id,
                "webViewLink": format!("https://docs.google.com/document/d/{new_id}/edit"),
            }),
        );
    }

    (404, error_body(404, "not found"))
}

fn batch_update(state: &mut StubState, id: &str, body: &str) -> (u16, Value) {
    let Some(text) = state.documents.get(id).cloned() else {
        return (404, error_body(404, "Requested entity was not found."));
    };
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return (400, error_body(400, "invalid json")),
    };
    let requests = parsed
        .get("requests")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut units: Vec<u16> = text.encode_utf16().collect();
    let mut replies = Vec::new();
    for request in &requests {
        match apply(&mut units, request) {
            Ok(reply) => replies.push(reply),
            Err(message) => return (400, error_body(400, &message)),
        }
    }

    let text = String::from_utf16(&units).expect("utf16 text");
    state.documents.insert(id.to_owned(), text);
    state.batches.push((id.to_owned(), requests));
    (200, json!({ "documentId": id, "replies": replies }))
}

fn apply(units: &mut Vec<u16>, request: &Value) -> Result<Value, String> {
    if let Some(replace) = request.get("replaceAllText") {
        let find = replace
            .pointer("/containsText/text")
            .and_then(Value::as_str)
            .ok_or("missing containsText")?;
        let with = replace
            .get("replaceText")
            .and_then(Value::as_str)
            .unwrap_or("");
        let text = String::from_utf16(units).map_err(|err| err.to_string())?;
        let count = text.matches(find).count();
        *units = text.replace(find, with).encode_utf16().collect();
        return Ok(json!({ "replaceAllText": { "occurrencesChanged": count } }));
    }

    if let Some(delete) = request.get("deleteContentRange") {
        let (start, end) = range(delete)?;
        if end > units.len() + 1 {
            return Err(format!("delete range {start}..{end} out of bounds"));
        }
        units.drain(start - 1..end - 1);
        return Ok(json!({}));
    }

    if let Some(insert) = request.get("insertText") {
        let index = insert
            .pointer("/location/index")
            .and_then(Value::as_u64)
            .ok_or("missing location")? as usize;
        if index < 1 || index > units.len() + 1 {
            return Err(format!("insert index {index} out of bounds"));
        }
        let text = insert.get("text").and_then(Value::as_str).unwrap_or("");
        units.splice(index - 1..index - 1, text.encode_utf16());
        return Ok(json!({}));
    }

    if let Some(update) = request.get("updateTextStyle") {
        let (start, end) = range(update)?;
        if end > units.len() + 1 || start == end {
            return Err(format!("style range {start}..{end} invalid"));
        }
        return Ok(json!({}));
    }

    Err(format!("unsupported request: {request}"))
}

fn range(request: &Value) -> Result<(usize, usize), String> {
    let start = request
        .pointer("/range/startIndex")
        .and_then(Value::as_u64)
        .ok_or("missing startIndex")? as usize;
    let end = request
        .pointer("/range/endIndex")
        .and_then(Value::as_u64)
        .ok_or("missing endIndex")? as usize;
    if start < 1 || end < start {
        return Err(format!("range {start}..{end} invalid"));
    }
    Ok((start, end))
}

fn document_json(id: &str, text: &str) -> Value {
    json!({
        "documentId": id,
        "title": id,
        "body": { "content": [
            { "startIndex": 1, "paragraph": { "elements": [
                { "startIndex": 1, "textRun": { "content": text } }
            ] } }
        ] }
    })
}

fn error_body(code: u16, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}

fn json_response(status: u16, body: Value) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header)
}
