//! 终端按键输入
//!
//! 整个进程只有一个线程从终端读取按键，读到的事件经 channel 交给界面。
//! 被取消的读取不会遗留一个仍在阻塞的 read，待机画面与输入行看到的是同一条按键流。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};

/// 按键流
pub struct KeyStream {
    rx: mpsc::UnboundedReceiver<io::Result<KeyEvent>>,
}

impl KeyStream {
    pub fn from_receiver(rx: mpsc::UnboundedReceiver<io::Result<KeyEvent>>) -> Self {
        Self { rx }
    }

    /// 启动读取线程
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("sentient-keys".into())
            .spawn(move || {
                loop {
                    match event::read() {
                        Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                            if tx.send(Ok(key)).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e));
                            break;
                        }
                    }
                }
            })?;
        Ok(Self::from_receiver(rx))
    }

    /// 丢弃已经缓冲的按键，返回丢弃的数量
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    /// 等待下一个按键；读取线程退出视为输入流关闭
    pub async fn next_key(&mut self) -> Result<KeyEvent> {
        match self.rx.recv().await {
            Some(Ok(key)) => Ok(key),
            Some(Err(e)) => Err(AppError::Ui(e.to_string())),
            None => Err(AppError::InputClosed),
        }
    }

    /// 读取一行，按键回显到 `echo`
    ///
    /// Ctrl-C 或空行上的 Ctrl-D 关闭输入流。
    pub async fn read_line(&mut self, echo: &mut impl Write) -> Result<String> {
        let mut line = String::new();
        loop {
            let key = self.next_key().await?;
            match edit_line(&mut line, &key) {
                LineEdit::Echo(text) => echo.write_all(text.as_bytes())?,
                LineEdit::Ignore => continue,
                LineEdit::Submit => {
                    echo.write_all(b"\r\n")?;
                    echo.flush()?;
                    return Ok(line);
                }
                LineEdit::Close => return Err(AppError::InputClosed),
            }
            echo.flush()?;
        }
    }
}

/// 一次按键对输入行的作用
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineEdit {
    Echo(String),
    Ignore,
    Submit,
    Close,
}

fn edit_line(line: &mut String, key: &KeyEvent) -> LineEdit {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => LineEdit::Submit,
        KeyCode::Char('c') if ctrl => LineEdit::Close,
        KeyCode::Char('d') if ctrl && line.is_empty() => LineEdit::Close,
        KeyCode::Char(_) if ctrl => LineEdit::Ignore,
        KeyCode::Char(c) => {
            line.push(c);
            LineEdit::Echo(c.to_string())
        }
        KeyCode::Backspace => match line.pop() {
            Some(_) => LineEdit::Echo("\x08 \x08".to_string()),
            None => LineEdit::Ignore,
        },
        _ => LineEdit::Ignore,
    }
}

/// 是否是退出键（Ctrl-C / Ctrl-D）
pub fn is_exit_key(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
}

/// raw 模式守卫，drop 时恢复
pub struct RawMode;

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
