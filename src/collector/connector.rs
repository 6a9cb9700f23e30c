//! jmxterm 프로세스 커넥터
//!
//! Owns one external jmxterm-like process per connector and speaks its
//! line protocol over stdin/stdout: every command is a single line and the
//! process answers with free text terminated by the `$>` prompt.
//!
//! ```text
//! <program> <args...> -l host:port [-u user -p password]
//! ```

use std::fmt;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use super::dump::Dump;
use crate::error::ConnectorError;

/// jmxterm ready 프롬프트
pub const PROMPT: &str = "$>";

static NEXT_CONNECTOR_ID: AtomicU64 = AtomicU64::new(1);

/// JMX 엔드포인트 (host, port)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    /// 호스트
    pub host: String,
    /// JMX 포트
    pub port: u16,
}

impl Endpoint {
    /// 새 엔드포인트 생성
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// JMX 인증 정보
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// 외부 프로세스 실행 방법
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    /// 실행 파일 (예: "java")
    pub program: String,
    /// 엔드포인트 인자 앞에 붙는 고정 인자 (예: ["-jar", "jmxterm-uber.jar"])
    pub args: Vec<String>,
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            args: vec!["-jar".to_string(), "jmxterm-uber.jar".to_string()],
        }
    }
}

impl Launcher {
    /// 프로세스 인자 목록 생성
    pub fn argv(&self, endpoint: &Endpoint, credentials: Option<&Credentials>) -> Vec<String> {
        let mut argv = self.args.clone();
        argv.push("-l".to_string());
        argv.push(endpoint.to_string());
        if let Some(creds) = credentials {
            argv.extend([
                "-u".to_string(),
                creds.user.clone(),
                "-p".to_string(),
                creds.password.clone(),
            ]);
        }
        argv
    }
}

/// connect 옵션
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub endpoint: Endpoint,
    pub credentials: Option<Credentials>,
    /// ready 프롬프트 대기 한도
    pub timeout: Duration,
}

/// 커넥터 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// 한 번도 프로세스를 띄우지 않음
    Unconnected,
    /// 프로세스가 살아 있음
    Connected,
    /// 프로세스가 종료되었거나 정리됨
    Dead,
}

/// 프롬프트 대기 실패 원인
#[derive(Debug)]
enum WaitError {
    TimedOut,
    Closed,
    Io(std::io::Error),
}

/// 프롬프트가 나올 때까지 읽고, 프롬프트 앞의 텍스트를 반환
///
/// The prompt only counts at the start of a line and as the last
/// non-whitespace output. JSON strings cannot hold a raw newline, so a bean
/// value ending in `$>` never ends the response, wherever the read splits it.
async fn read_until_prompt<R>(reader: &mut R, deadline: Instant) -> Result<String, WaitError>
where
    R: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = match timeout_at(deadline, reader.read(&mut chunk)).await {
            Err(_) => return Err(WaitError::TimedOut),
            Ok(Err(e)) => return Err(WaitError::Io(e)),
            Ok(Ok(0)) => return Err(WaitError::Closed),
            Ok(Ok(n)) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        if let Some(len) = prompt_start(&buf) {
            buf.truncate(len);
            return Ok(String::from_utf8_lossy(&buf).into_owned());
        }
    }
}

/// 버퍼가 프롬프트로 끝나면 프롬프트 앞 텍스트의 길이
fn prompt_start(buf: &[u8]) -> Option<usize> {
    let end = buf
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |p| p + 1);
    let text = &buf[..end];
    if !text.ends_with(PROMPT.as_bytes()) {
        return None;
    }
    let start = end - PROMPT.len();
    let line_start = text[..start]
        .iter()
        .rposition(|b| !b.is_ascii_whitespace() || *b == b'\n')
        .map_or(true, |p| text[p] == b'\n');
    line_start.then_some(start)
}

/// 살아 있는 jmxterm 프로세스 하나
struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    endpoint: Endpoint,
}

impl Session {
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn send(&mut self, command: &str) -> std::io::Result<()> {
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }

    async fn read_until_prompt(&mut self, deadline: Instant) -> Result<String, WaitError> {
        read_until_prompt(&mut self.stdout, deadline).await
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(endpoint = %self.endpoint, error = %e, "jmxterm process already gone");
        }
    }
}

/// jmxterm 세션 하나를 소유하는 커넥터
///
/// The connector never reconnects on its own; callers decide when a dead
/// connector gets replaced.
pub struct JmxConnector {
    id: u64,
    launcher: Launcher,
    dump_timeout: Duration,
    session: Option<Session>,
    spawned: bool,
}

impl fmt::Debug for JmxConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JmxConnector")
            .field("id", &self.id)
            .field("launcher", &self.launcher)
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

impl JmxConnector {
    /// 새 커넥터 생성 (프로세스는 connect 시점에 실행)
    pub fn new(launcher: Launcher, dump_timeout: Duration) -> Self {
        Self {
            id: NEXT_CONNECTOR_ID.fetch_add(1, Ordering::Relaxed),
            launcher,
            dump_timeout,
            session: None,
            spawned: false,
        }
    }

    /// 프로세스 전역에서 유일한 커넥터 ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 현재 세션의 엔드포인트
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.session.as_ref().map(|s| &s.endpoint)
    }

    /// 현재 프로세스 ID
    pub fn pid(&self) -> Option<u32> {
        self.session.as_ref().and_then(|s| s.child.id())
    }

    /// 프로세스 liveness 확인 (프로토콜 수준 health check 아님)
    pub fn connected(&mut self) -> bool {
        self.session.as_mut().is_some_and(Session::is_alive)
    }

    /// 현재 상태
    pub fn state(&mut self) -> ConnectorState {
        if self.connected() {
            ConnectorState::Connected
        } else if self.spawned {
            ConnectorState::Dead
        } else {
            ConnectorState::Unconnected
        }
    }

    /// 새 jmxterm 세션 시작
    ///
    /// A live previous session is closed with `close` and then killed before
    /// the new process is spawned. On timeout the new process is killed and
    /// the connector is left without a session.
    #[instrument(skip(self, options), fields(endpoint = %options.endpoint, session = self.id))]
    pub async fn connect(&mut self, options: &ConnectOptions) -> Result<(), ConnectorError> {
        let deadline = Instant::now() + options.timeout;

        if let Some(mut previous) = self.session.take() {
            if previous.is_alive() {
                let closed = match previous.send("close").await {
                    Ok(()) => previous.read_until_prompt(deadline).await.map(|_| ()),
                    Err(e) => Err(WaitError::Io(e)),
                };
                if let Err(e) = closed {
                    warn!(endpoint = %previous.endpoint, error = ?e, "Previous session did not close cleanly");
                }
            }
            previous.kill().await;
        }

        let argv = self
            .launcher
            .argv(&options.endpoint, options.credentials.as_ref());
        debug!(program = %self.launcher.program, "Spawning jmxterm");

        let mut child = Command::new(&self.launcher.program)
            .args(&argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConnectorError::Spawn {
                command: self.launcher.program.clone(),
                source,
            })?;
        self.spawned = true;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "jmxterm process already gone");
                }
                return Err(ConnectorError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "jmxterm stdio not captured",
                )));
            }
        };

        let mut session = Session {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            endpoint: options.endpoint.clone(),
        };

        match session.read_until_prompt(deadline).await {
            Ok(banner) => {
                debug!(banner = %banner.trim(), "jmxterm ready");
                info!(pid = ?session.child.id(), "JMX session opened");
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                session.kill().await;
                Err(match e {
                    WaitError::TimedOut => ConnectorError::ConnectTimeout {
                        endpoint: options.endpoint.to_string(),
                        timeout_ms: options.timeout.as_millis() as u64,
                    },
                    WaitError::Closed => ConnectorError::ProcessExited {
                        endpoint: options.endpoint.to_string(),
                    },
                    WaitError::Io(e) => ConnectorError::Io(e),
                })
            }
        }
    }

    /// 모든 bean과 속성 dump
    ///
    /// Sends `dump`, waits for the prompt within the dump deadline, strips the
    /// command echo and decodes the rest. A timeout or broken pipe kills the
    /// session, since its output stream can no longer be trusted; a malformed
    /// payload leaves it in place.
    #[instrument(skip(self), fields(session = self.id))]
    pub async fn dump(&mut self) -> Result<Dump, ConnectorError> {
        let timeout = self.dump_timeout;
        let session = self.session.as_mut().ok_or(ConnectorError::NotConnected)?;
        let endpoint = session.endpoint.to_string();
        let deadline = Instant::now() + timeout;

        let output = match session.send("dump").await {
            Ok(()) => session.read_until_prompt(deadline).await,
            Err(e) => Err(WaitError::Io(e)),
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                session.kill().await;
                self.session = None;
                return Err(match e {
                    WaitError::TimedOut => ConnectorError::DumpTimeout {
                        endpoint,
                        timeout_ms: timeout.as_millis() as u64,
                    },
                    WaitError::Closed => ConnectorError::ProcessExited { endpoint },
                    WaitError::Io(e) => ConnectorError::Io(e),
                });
            }
        };

        let payload = strip_echo(&output, "dump");
        let dump = Dump::parse(payload)
            .map_err(|source| ConnectorError::Protocol { endpoint, source })?;
        debug!(beans = dump.len(), "Dump decoded");
        Ok(dump)
    }

    /// 세션 종료 (`bye` 전송 후 프로세스 kill)
    pub async fn terminate(&mut self) {
        if let Some(mut session) = self.session.take() {
            if session.is_alive() {
                if let Err(e) = session.send("bye").await {
                    debug!(endpoint = %session.endpoint, error = %e, "Failed to send bye");
                }
            }
            session.kill().await;
            info!(endpoint = %session.endpoint, session = self.id, "JMX session terminated");
        }
    }
}

/// 응답 앞부분의 명령 echo 제거
fn strip_echo<'a>(output: &'a str, command: &str) -> &'a str {
    let trimmed = output.trim();
    trimmed.strip_prefix(command).unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("localhost", 7199).to_string(), "localhost:7199");
    }

    #[test]
    fn test_launcher_argv_without_credentials() {
        let launcher = Launcher::default();
        let argv = launcher.argv(&Endpoint::new("db1", 7199), None);
        assert_eq!(argv, vec!["-jar", "jmxterm-uber.jar", "-l", "db1:7199"]);
    }

    #[test]
    fn test_launcher_argv_with_credentials() {
        let launcher = Launcher {
            program: "sh".to_string(),
            args: vec!["fake.sh".to_string()],
        };
        let creds = Credentials {
            user: "admin".to_string(),
            password: "secret".to_string(),
        };
        let argv = launcher.argv(&Endpoint::new("db1", 7199), Some(&creds));
        assert_eq!(
            argv,
            vec!["fake.sh", "-l", "db1:7199", "-u", "admin", "-p", "secret"]
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            user: "admin".to_string(),
            password: "secret".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_strip_echo() {
        assert_eq!(strip_echo("dump\r\n{\"a\": 1}\r\n", "dump"), "{\"a\": 1}");
        assert_eq!(strip_echo("{\"a\": 1}", "dump"), "{\"a\": 1}");
        // only the leading echo goes, bean names mentioning the word survive
        assert_eq!(
            strip_echo("dump\n{\"x:type=dumper\": {}}", "dump"),
            "{\"x:type=dumper\": {}}"
        );
    }

    #[test]
    fn test_prompt_start() {
        assert_eq!(prompt_start(b"$>"), Some(0));
        assert_eq!(prompt_start(b"  $> "), Some(2));
        assert_eq!(prompt_start(b"Welcome\n$>"), Some(8));
        assert_eq!(prompt_start(b"dump\r\n{}\r\n$>"), Some(10));
        assert_eq!(prompt_start(b"{\"v\": \"x$>"), None);
        assert_eq!(prompt_start(b"{\"v\": \"$>"), None);
        assert_eq!(prompt_start(b"dump\n{}"), None);
        assert_eq!(prompt_start(b""), None);
    }

    #[tokio::test]
    async fn test_prompt_like_value_at_read_boundary() {
        let head = "dump\n{\"com.example:type=Shell\": {\"Prompt\": \"";
        let value = format!("{}$>", "x".repeat(8192 - head.len() - PROMPT.len()));
        let stream = format!("{}{}\"}}}}\n$>", head, value);
        assert!(stream.as_bytes()[..8192].ends_with(PROMPT.as_bytes()));

        let mut reader: &[u8] = stream.as_bytes();
        let deadline = Instant::now() + Duration::from_secs(1);
        let output = read_until_prompt(&mut reader, deadline).await.unwrap();

        let dump = Dump::parse(strip_echo(&output, "dump")).unwrap();
        let attributes = dump.get("com.example:type=Shell").unwrap();
        assert_eq!(attributes.len(), 1);
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_read_until_prompt_reports_closed_stream() {
        let mut reader: &[u8] = b"dump\n{\"a\": ";
        let deadline = Instant::now() + Duration::from_secs(1);
        assert!(matches!(
            read_until_prompt(&mut reader, deadline).await,
            Err(WaitError::Closed)
        ));
    }

    #[test]
    fn test_new_connector_is_unconnected() {
        let mut connector = JmxConnector::new(Launcher::default(), Duration::from_secs(1));
        assert!(!connector.connected());
        assert_eq!(connector.state(), ConnectorState::Unconnected);
        assert!(connector.endpoint().is_none());
    }

    #[test]
    fn test_connector_ids_are_unique() {
        let a = JmxConnector::new(Launcher::default(), Duration::from_secs(1));
        let b = JmxConnector::new(Launcher::default(), Duration::from_secs(1));
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_dump_without_session_fails() {
        let mut connector = JmxConnector::new(Launcher::default(), Duration::from_secs(1));
        assert!(matches!(
            connector.dump().await,
            Err(ConnectorError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let launcher = Launcher {
            program: "/nonexistent/rjmx-bridge-jmxterm".to_string(),
            args: vec![],
        };
        let mut connector = JmxConnector::new(launcher, Duration::from_secs(1));
        let options = ConnectOptions {
            endpoint: Endpoint::new("localhost", 7199),
            credentials: None,
            timeout: Duration::from_secs(1),
        };
        let err = connector.connect(&options).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Spawn { .. }));
        assert_eq!(connector.state(), ConnectorState::Unconnected);
    }
}
