//! 테스트용 가짜 jmxterm
//!
//! A `/bin/sh` script that speaks the jmxterm prompt protocol and answers
//! `dump` with the contents of a file.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use rjmx_bridge::collector::Launcher;
use rjmx_bridge::config::LauncherConfig;
use serde_json::Value;
use tempfile::TempDir;

const SCRIPT: &str = r#"
dump_file="$1"
mode="$2"
case "$mode" in
  silent) sleep 30; exit 0 ;;
  exit) exit 0 ;;
esac
printf 'Welcome to JMX terminal. Type "help" for available commands.\n$>'
while IFS= read -r line; do
  case "$line" in
    dump)
      if [ "$mode" = "hang" ]; then sleep 30; fi
      printf 'dump\n'
      cat "$dump_file"
      printf '\n$>'
      if [ "$mode" = "die-after-dump" ]; then exit 0; fi
      ;;
    close) printf '$>' ;;
    bye) exit 0 ;;
    *) printf '$>' ;;
  esac
done
"#;

/// 가짜 jmxterm 동작 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 정상 응답
    Normal,
    /// 프롬프트를 출력하지 않음
    Silent,
    /// 시작하자마자 종료
    Exit,
    /// dump에 응답하지 않음
    Hang,
    /// 첫 dump 후 종료
    DieAfterDump,
}

impl Mode {
    fn as_arg(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Silent => "silent",
            Mode::Exit => "exit",
            Mode::Hang => "hang",
            Mode::DieAfterDump => "die-after-dump",
        }
    }
}

/// 임시 디렉터리에 스크립트와 dump 파일을 둔 가짜 jmxterm
pub struct FakeJmxterm {
    dir: TempDir,
    mode: Mode,
}

impl FakeJmxterm {
    pub fn new(dump: &Value, mode: Mode) -> Self {
        Self::with_payload(&dump.to_string(), mode)
    }

    pub fn with_payload(payload: &str, mode: Mode) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("jmxterm.sh"), SCRIPT).expect("Failed to write script");
        std::fs::write(dir.path().join("dump.json"), payload).expect("Failed to write dump");
        Self { dir, mode }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn launcher(&self) -> Launcher {
        Launcher {
            program: "/bin/sh".to_string(),
            args: vec![
                self.path("jmxterm.sh").display().to_string(),
                self.path("dump.json").display().to_string(),
                self.mode.as_arg().to_string(),
            ],
        }
    }

    pub fn launcher_config(&self) -> LauncherConfig {
        let launcher = self.launcher();
        LauncherConfig {
            program: launcher.program,
            args: launcher.args,
            connect_timeout_ms: 5_000,
            dump_timeout_ms: 2_000,
        }
    }
}

pub const SHORT: Duration = Duration::from_millis(500);

/// 표준 JVM bean이 모두 있는 dump
pub fn jvm_beans() -> Value {
    serde_json::json!({
        "java.lang:type=Threading": {"ThreadCount": 42, "PeakThreadCount": 50},
        "java.lang:type=Memory": {
            "HeapMemoryUsage": {"used": 1048576, "max": 4194304},
            "NonHeapMemoryUsage": {"used": 524288, "max": -1}
        },
        "java.lang:type=GarbageCollector,name=ParNew": {
            "CollectionCount": 10,
            "CollectionTime": 120,
            "Valid": true
        },
        "java.lang:type=GarbageCollector,name=ConcurrentMarkSweep": {
            "CollectionCount": 2,
            "CollectionTime": 300,
            "Valid": true
        }
    })
}

/// JVM bean에 다른 bean을 더한 dump
pub fn with_jvm(extra: Value) -> Value {
    let mut dump = jvm_beans();
    if let (Some(base), Value::Object(extra)) = (dump.as_object_mut(), extra) {
        base.extend(extra);
    }
    dump
}
