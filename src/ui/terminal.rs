use async_trait::async_trait;
use colored::Colorize;
use crossterm::{
    cursor, execute,
    terminal::{self, ClearType},
};
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use crate::config::UiConfig;
use crate::error::{AppError, Result};
use crate::observability::ComponentSpan;
use crate::ui::ConversationUi;
use crate::ui::art::{EXIT_TEXT, IDLE_FRAMES, LOADING_TEXT, center};
use crate::ui::keys::{KeyStream, RawMode, is_exit_key};

/// 终端界面
///
/// 输出带打字机效果；输入在 raw 模式下逐键编辑，Ctrl-C 或空行 Ctrl-D 结束程序。
/// 待机画面与加载画面结束后会丢弃期间的按键。
pub struct TerminalUi {
    config: UiConfig,
    keys: OnceCell<Mutex<KeyStream>>,
    log: ComponentSpan,
}

impl TerminalUi {
    pub fn new(config: UiConfig, log: ComponentSpan) -> Self {
        Self {
            config,
            keys: OnceCell::new(),
            log,
        }
    }

    /// 按键流在第一次需要输入时才启动
    async fn keys(&self) -> Result<MutexGuard<'_, KeyStream>> {
        let keys = self
            .keys
            .get_or_try_init(|| async { KeyStream::spawn().map(Mutex::new) })
            .await
            .map_err(|e| AppError::Ui(e.to_string()))?;
        Ok(keys.lock().await)
    }

    fn discard_pending(&self, keys: &mut KeyStream, screen: &str) {
        let dropped = keys.drain();
        if dropped > 0 {
            let _span = self.log.enter();
            tracing::debug!(dropped, screen, "Discarded buffered keys");
        }
    }

    fn clear_screen() -> io::Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )
    }
}

fn draw_frame(stdout: &mut io::Stdout, art: &str, width: usize) -> io::Result<()> {
    // raw 模式下需要显式回车
    let centered = center(art, width).replace('\n', "\r\n");
    write!(stdout, "{}\r\n", centered.green().bold())?;
    stdout.flush()
}

#[async_trait]
impl ConversationUi for TerminalUi {
    async fn display_message(&self, message: &str) -> Result<()> {
        let delay = Duration::from_millis(self.config.typewriter_delay_ms);
        let mut stdout = io::stdout();

        if delay.is_zero() {
            writeln!(stdout, "{}", message.cyan())?;
            stdout.flush()?;
            return Ok(());
        }

        for ch in message.chars() {
            write!(stdout, "{}", ch.to_string().cyan())?;
            stdout.flush()?;
            tokio::time::sleep(delay).await;
        }
        writeln!(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    async fn get_user_input(&self, prompt: &str) -> Result<Option<String>> {
        let mut keys = self.keys().await?;
        let mut stdout = io::stdout();
        write!(stdout, "{} ", prompt.white().bold())?;
        stdout.flush()?;

        let _raw = RawMode::enable()?;
        match keys.read_line(&mut stdout).await {
            Ok(line) => {
                let trimmed = line.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Err(AppError::InputClosed) => {
                let _span = self.log.enter();
                tracing::info!("Input stream closed");
                Err(AppError::InputClosed)
            }
            Err(e) => Err(e),
        }
    }

    async fn display_idle_screen(&self) -> Result<()> {
        let mut keys = self.keys().await?;
        self.discard_pending(&mut keys, "idle");

        let mut stdout = io::stdout();
        let (width, _) = terminal::size().unwrap_or((80, 24));
        let _raw = RawMode::enable()?;
        execute!(
            stdout,
            cursor::Hide,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;

        let mut frames = IDLE_FRAMES.iter().cycle();
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.idle_frame_ms));
        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(art) = frames.next() {
                        if let Err(e) = draw_frame(&mut stdout, art, width as usize) {
                            break Err(AppError::Ui(e.to_string()));
                        }
                    }
                }
                key = keys.next_key() => {
                    break match key {
                        Ok(key) if is_exit_key(&key) => Err(AppError::InputClosed),
                        Ok(_) => Ok(()),
                        Err(e) => Err(e),
                    };
                }
            }
        };

        execute!(stdout, cursor::Show)?;
        self.discard_pending(&mut keys, "idle");
        outcome
    }

    async fn display_loading_screen(&self) -> Result<()> {
        Self::clear_screen().map_err(|e| AppError::Ui(e.to_string()))?;
        println!("{}", LOADING_TEXT.red().bold());
        tokio::time::sleep(Duration::from_millis(self.config.loading_delay_ms)).await;
        Self::clear_screen().map_err(|e| AppError::Ui(e.to_string()))?;

        let mut keys = self.keys().await?;
        self.discard_pending(&mut keys, "loading");
        Ok(())
    }

    async fn display_exit_message(&self) -> Result<()> {
        println!();
        println!("{}", EXIT_TEXT.bright_magenta().bold());
        Ok(())
    }
}
