//! Dashboard dev server management
//!
//! With a serve command the suite owns the server process; without one it
//! only waits for an already running dashboard to answer.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{E2eError, E2eResult};

/// The dashboard under test, spawned or already running
pub struct AppServer {
    child: Option<Child>,
    base_url: String,
}

impl AppServer {
    pub async fn start(config: &AppConfig) -> E2eResult<Self> {
        let startup_timeout = Duration::from_secs(config.startup_timeout_secs);

        let Some(command) = &config.serve_command else {
            wait_until_reachable(&config.base_url, startup_timeout).await?;
            info!("Using running app at {}", config.base_url);
            return Ok(Self {
                child: None,
                base_url: config.base_url.clone(),
            });
        };

        let (program, args) = command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("serve command is empty".to_string()))?;

        info!("Spawning app server: {}", command.join(" "));
        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e)))?;

        let mut server = Self {
            child: Some(child),
            base_url: config.base_url.clone(),
        };

        if let Err(e) = wait_until_reachable(&server.base_url, startup_timeout).await {
            if let Some(status) = server.exit_status() {
                return Err(E2eError::ServerStartup(format!(
                    "{} exited with {}",
                    program, status
                )));
            }
            return Err(e);
        }

        info!("App server is up at {}", server.base_url);
        Ok(server)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the suite spawned the server process
    pub fn is_managed(&self) -> bool {
        self.child.is_some()
    }

    fn exit_status(&mut self) -> Option<std::process::ExitStatus> {
        self.child.as_mut().and_then(|c| c.try_wait().ok().flatten())
    }

    /// Stop a spawned server; a no-op for one the suite did not start
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        info!("Stopping app server (pid: {})", child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = child.kill();
        child.wait()?;
        Ok(())
    }
}

impl Drop for AppServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Poll `base_url` until it answers with a success or redirect.
///
/// Returns the number of attempts it took.
pub async fn wait_until_reachable(base_url: &str, timeout_duration: Duration) -> E2eResult<u32> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                debug!("{} answered after {} attempt(s)", base_url, attempts);
                return Ok(attempts);
            }
            Ok(resp) => {
                warn!("{} returned {}", base_url, resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", base_url);
                }
                if !e.is_connect() {
                    warn!("Reachability check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(200)).await;
    }

    Err(E2eError::AppUnreachable(base_url.to_string()))
}
