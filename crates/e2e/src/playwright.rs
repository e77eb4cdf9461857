//! Playwright browser automation
//!
//! A long-lived `node` process runs an embedded bridge script and executes
//! one JSON request per line on stdin, answering with one JSON line on
//! stdout. Bridge diagnostics go to stderr and are forwarded to `tracing`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::driver::{ElementRef, PageDriver, SessionFactory};
use crate::error::{E2eError, E2eResult};

const BRIDGE_SCRIPT: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

const config = JSON.parse(process.env.TASKBOARD_BRIDGE_CONFIG);
const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const browser = await playwright[config.browser].launch({ headless: config.headless });
  const context = await browser.newContext({
    viewport: { width: config.viewportWidth, height: config.viewportHeight },
    baseURL: config.baseUrl,
  });
  const page = await context.newPage();
  page.setDefaultTimeout(config.actionTimeoutMs);

  const handles = new Map();
  let nextHandle = 1;
  const register = (locator) => { const id = nextHandle++; handles.set(id, locator); return id; };
  const lookup = (id) => {
    const locator = handles.get(id);
    if (!locator) throw new Error(`stale handle ${id}`);
    return locator;
  };

  const ops = {
    goto: async ({ path }) => { await page.goto(path); return null; },
    findFirstByText: async ({ text }) => {
      const locator = page.getByText(text, { exact: true }).first();
      return (await locator.count()) > 0 ? register(locator) : null;
    },
    findFirst: async ({ selector }) => {
      const locator = page.locator(selector).first();
      return (await locator.count()) > 0 ? register(locator) : null;
    },
    findAll: async ({ selector }) => {
      const all = page.locator(selector);
      const count = await all.count();
      const ids = [];
      for (let i = 0; i < count; i++) ids.push(register(all.nth(i)));
      return ids;
    },
    containerOf: async ({ handle }) => register(lookup(handle).locator('xpath=..')),
    textOf: async ({ handle }) => (await lookup(handle).textContent()) || '',
    isVisible: async ({ handle }) => lookup(handle).isVisible(),
    click: async ({ handle }) => { await lookup(handle).click(); return null; },
    fill: async ({ handle, value }) => { await lookup(handle).fill(value); return null; },
    waitUntilIdle: async () => { await page.waitForLoadState('networkidle'); return null; },
    screenshot: async ({ path }) => { await page.screenshot({ path, fullPage: true }); return null; },
    close: async () => { await browser.close(); return null; },
  };

  reply({ ready: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let req;
    try {
      req = JSON.parse(line);
    } catch (error) {
      console.error(`unparsable request: ${line}`);
      continue;
    }
    const op = ops[req.op];
    try {
      if (!op) throw new Error(`unknown op ${req.op}`);
      const result = await op(req.args || {});
      reply({ id: req.id, ok: true, result: result === undefined ? null : result });
    } catch (error) {
      reply({ id: req.id, ok: false, error: error.message });
    }
    if (req.op === 'close') break;
  }
  process.exit(0);
})().catch((error) => {
  console.error(error.stack || error.message);
  reply({ ready: false, error: error.message });
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Playwright(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    /// Directory containing the `playwright` package, exported as `NODE_PATH`
    pub node_modules_dir: Option<PathBuf>,
    /// Upper bound for browser launch
    pub launch_timeout: Duration,
    /// Upper bound for one bridge round-trip
    pub command_timeout: Duration,
    /// Playwright's own per-action timeout
    pub action_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5173".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            node_modules_dir: None,
            launch_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(45),
            action_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    child: Child,
}

/// One browser session driven through the node bridge
pub struct PlaywrightDriver {
    io: Mutex<BridgeIo>,
    next_id: AtomicU64,
    command_timeout: Duration,
    // Holds the bridge script on disk for the lifetime of the process.
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Spawn the bridge and wait for the browser to be ready
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let bridge_config = json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "viewportWidth": config.viewport_width,
            "viewportHeight": config.viewport_height,
            "baseUrl": config.base_url,
            "actionTimeoutMs": config.action_timeout.as_millis() as u64,
        });

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .env("TASKBOARD_BRIDGE_CONFIG", bridge_config.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.node_modules_dir {
            cmd.env("NODE_PATH", dir);
        }

        let mut child = cmd.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright_bridge", "{}", line);
                }
            });
        }

        let mut io = BridgeIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
            child,
        };

        let ready = tokio::time::timeout(config.launch_timeout, read_reply(&mut io.stdout))
            .await
            .map_err(|_| E2eError::Timeout(format!("{} launch", config.browser.as_str())))??;
        if ready.ready != Some(true) {
            return Err(E2eError::Playwright(
                ready.error.unwrap_or_else(|| "browser failed to launch".into()),
            ));
        }

        info!(
            "Launched {} ({}x{}) against {}",
            config.browser.as_str(),
            config.viewport_width,
            config.viewport_height,
            config.base_url
        );

        Ok(Self {
            io: Mutex::new(io),
            next_id: AtomicU64::new(1),
            command_timeout: config.command_timeout,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn request(&self, op: &str, args: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = json!({ "id": id, "op": op, "args": args }).to_string();

        let mut io = self.io.lock().await;
        debug!("bridge -> {}", line);
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        let reply = tokio::time::timeout(self.command_timeout, async {
            loop {
                let reply = read_reply(&mut io.stdout).await?;
                match reply.id {
                    Some(reply_id) if reply_id == id => return Ok::<_, E2eError>(reply),
                    other => warn!("Discarding bridge reply for {:?} while awaiting {}", other, id),
                }
            }
        })
        .await
        .map_err(|_| E2eError::Timeout(format!("bridge op '{}'", op)))??;

        if reply.ok {
            Ok(reply.result)
        } else {
            let message = reply.error.unwrap_or_else(|| "unknown bridge error".into());
            if message.starts_with("stale handle") {
                Err(E2eError::StaleElement(args_handle(&args)))
            } else {
                Err(E2eError::Playwright(format!("{}: {}", op, message)))
            }
        }
    }

    async fn request_handle(&self, op: &str, args: Value) -> E2eResult<Option<ElementRef>> {
        let value = self.request(op, args).await?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_u64()
            .map(|id| Some(ElementRef(id)))
            .ok_or_else(|| E2eError::Bridge(format!("{} returned {}", op, value)))
    }
}

async fn read_reply(stdout: &mut Lines<BufReader<ChildStdout>>) -> E2eResult<BridgeReply> {
    loop {
        let line = stdout
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Bridge("bridge exited".into()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<BridgeReply>(trimmed) {
            Ok(reply) => return Ok(reply),
            Err(_) => debug!(target: "playwright_bridge", "stdout: {}", trimmed),
        }
    }
}

fn args_handle(args: &Value) -> u64 {
    args.get("handle").and_then(Value::as_u64).unwrap_or_default()
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn goto(&self, path: &str) -> E2eResult<()> {
        self.request("goto", json!({ "path": path })).await.map(drop)
    }

    async fn find_first_by_text(&self, text: &str) -> E2eResult<Option<ElementRef>> {
        self.request_handle("findFirstByText", json!({ "text": text })).await
    }

    async fn find_first(&self, selector: &str) -> E2eResult<Option<ElementRef>> {
        self.request_handle("findFirst", json!({ "selector": selector })).await
    }

    async fn find_all(&self, selector: &str) -> E2eResult<Vec<ElementRef>> {
        let value = self.request("findAll", json!({ "selector": selector })).await?;
        let ids: Vec<u64> = serde_json::from_value(value)?;
        Ok(ids.into_iter().map(ElementRef).collect())
    }

    async fn container_of(&self, element: ElementRef) -> E2eResult<ElementRef> {
        self.request_handle("containerOf", json!({ "handle": element.0 }))
            .await?
            .ok_or_else(|| E2eError::Bridge(format!("no container for {}", element)))
    }

    async fn text_of(&self, element: ElementRef) -> E2eResult<String> {
        let value = self.request("textOf", json!({ "handle": element.0 })).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_visible(&self, element: ElementRef) -> E2eResult<bool> {
        let value = self.request("isVisible", json!({ "handle": element.0 })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: ElementRef) -> E2eResult<()> {
        self.request("click", json!({ "handle": element.0 })).await.map(drop)
    }

    async fn fill(&self, element: ElementRef, value: &str) -> E2eResult<()> {
        self.request("fill", json!({ "handle": element.0, "value": value }))
            .await
            .map(drop)
    }

    async fn wait_until_idle(&self) -> E2eResult<()> {
        self.request("waitUntilIdle", Value::Null).await.map(drop)
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.request("screenshot", json!({ "path": path.to_string_lossy() }))
            .await
            .map(drop)
    }

    async fn close(&self) -> E2eResult<()> {
        self.request("close", Value::Null).await?;
        let mut io = self.io.lock().await;
        let status = tokio::time::timeout(Duration::from_secs(5), io.child.wait()).await;
        if status.is_err() {
            warn!("Bridge did not exit after close; killing it");
            io.child.kill().await?;
        }
        Ok(())
    }
}

/// Opens a fresh browser per session
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightLauncher {
    async fn open(&self) -> E2eResult<Box<dyn PageDriver>> {
        let driver = PlaywrightDriver::launch(&self.config).await?;
        Ok(Box::new(driver))
    }
}
