#![forbid(unsafe_code)]
#![allow(dead_code)]

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub(crate) struct Server {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Server {
    pub(crate) fn start_in_memory() -> Self {
        Self::start_with_args(&["--in-memory"])
    }

    pub(crate) fn start_with_storage_dir(storage_dir: &Path) -> Self {
        Self::start_with_args(&[
            "--storage-dir",
            storage_dir.to_str().expect("utf8 storage dir"),
        ])
    }

    pub(crate) fn start_with_args(args: &[&str]) -> Self {
        Self::start_with_env(args, &[])
    }

    /// `CENSUS_STORAGE_DIR` is cleared unless `envs` sets it.
    pub(crate) fn start_with_env(args: &[&str], envs: &[(&str, &Path)]) -> Self {
        let mut command = Command::new(env!("CARGO_BIN_EXE_census_server"));
        command
            .args(args)
            .env("CENSUS_LOG", "warn")
            .env_remove("CENSUS_STORAGE_DIR");
        for (key, value) in envs {
            command.env(key, value);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn census_server");

        let stdin = child.stdin.take().expect("stdin");
        let stdout = BufReader::new(child.stdout.take().expect("stdout"));

        Self {
            child,
            stdin,
            stdout,
        }
    }

    pub(crate) fn send(&mut self, req: Value) {
        writeln!(self.stdin, "{req}").expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub(crate) fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{line}").expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub(crate) fn recv(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read response");
        assert!(!line.trim().is_empty(), "empty response line");
        serde_json::from_str(&line).expect("parse response json")
    }

    pub(crate) fn request(&mut self, req: Value) -> Value {
        self.send(req);
        self.recv()
    }

    pub(crate) fn initialize_default(&mut self) {
        let _ = self.request(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": { "name": "test", "version": "0" } }
        }));
        self.send(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
            "params": {}
        }));
    }

    pub(crate) fn start_initialized() -> Self {
        let mut server = Self::start_in_memory();
        server.initialize_default();
        server
    }

    pub(crate) fn call(&mut self, id: u64, name: &str, arguments: Value) -> Value {
        let resp = self.request(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }));
        extract_tool_text(&resp)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub(crate) fn extract_tool_text(resp: &Value) -> Value {
    let text = resp
        .get("result")
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("text"))
        .and_then(|v| v.as_str())
        .expect("result.content[0].text");
    serde_json::from_str(text).expect("tool text is json")
}

pub(crate) fn registrant_payload(ci: &str, crops: &[&str]) -> Value {
    json!({
        "name": "Julia",
        "lastName": "Cedeno",
        "ci": ci,
        "dateOfBirth": "1985-09-12",
        "hasRuc": false,
        "gender": "other",
        "hasFarm": !crops.is_empty(),
        "farmHa": 8,
        "farmName": "Las Palmas",
        "crops": crops,
        "hasWorkers": true,
        "totalWorkers": 4,
        "menWorkers": 2,
        "womanWorkers": 2,
        "over18Workers": 2,
        "under18Workers": 2,
        "minorWorkersOccupation": "harvest support",
        "hasPregnantWorkers": false,
        "family": [
            { "name": "Ines", "lastName": "Cedeno", "ci": "1300000001" }
        ]
    })
}
