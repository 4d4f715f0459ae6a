//! 런타임 명령 채널.
//!
//! 보조 스레드가 입력(기본은 stdin)을 한 줄씩 읽어 채널로 넘기고, 컨트롤 루프는
//! 틱마다 쌓인 줄을 꺼내 [`RendererCommand`]로 파싱한다.

use std::io::{self, BufRead, BufReader};
use std::thread;

use crossbeam::channel::{self, Receiver};
use glasspane_core::error::CoreError;
use glasspane_core::models::command::RendererCommand;
use tracing::debug;

/// 줄 단위 명령 수신기
pub struct CommandChannel {
    rx: Receiver<String>,
}

impl CommandChannel {
    /// stdin 리더 스레드 시작
    pub fn stdin() -> io::Result<Self> {
        Self::spawn(BufReader::new(io::stdin()))
    }

    /// 임의 리더에서 줄을 읽는 스레드 시작. EOF나 읽기 에러에서 스레드가 끝난다.
    pub fn spawn<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = channel::unbounded();
        thread::Builder::new()
            .name("glasspane-commands".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                debug!("명령 입력 종료");
            })?;
        Ok(Self { rx })
    }

    /// 쌓인 명령을 모두 꺼낸다 (논블로킹). 빈 줄은 건너뛴다.
    pub fn pending(&self) -> Vec<Result<RendererCommand, CoreError>> {
        self.rx
            .try_iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.parse::<RendererCommand>())
            .collect()
    }
}
