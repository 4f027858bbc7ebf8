//! 可观测性模块
//!
//! 结构化日志初始化，以及注入到各组件的日志上下文。

use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

// ===== Component Logging =====

/// 组件日志上下文
///
/// 在构造时注入每个组件，组件的所有事件都记录在该 span 内。
#[derive(Debug, Clone)]
pub struct ComponentSpan {
    name: &'static str,
    span: Span,
}

impl ComponentSpan {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            span: tracing::info_span!("component", component = name),
        }
    }

    /// 不输出任何内容的上下文（测试与默认构造用）
    pub fn disabled(name: &'static str) -> Self {
        Self {
            name,
            span: Span::none(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 进入组件 span，返回的 guard 生命周期内产生的事件都归属于该组件
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// 为一次会话创建 span
pub fn session_span(session_id: &str) -> Span {
    tracing::info_span!("session", session_id)
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// 终端界面占用 stdout，因此日志只写入文件；未配置日志目录时写 stderr。
/// 返回的 guard 必须在进程生命周期内持有，否则缓冲日志会丢失。
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(service_name, config));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let registry = tracing_subscriber::registry().with(env_filter);
            if config.structured {
                registry
                    .with(fmt::layer().json().with_writer(writer).with_target(true))
                    .init();
            } else {
                registry
                    .with(
                        fmt::layer()
                            .with_writer(writer)
                            .with_ansi(false)
                            .with_target(true)
                            .with_line_number(true),
                    )
                    .init();
            }
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .init();
            None
        }
    }
}

/// 未设置 `RUST_LOG` 时的过滤规则：本服务与依赖都按配置的级别输出
fn default_filter(service_name: &str, config: &LoggingConfig) -> EnvFilter {
    EnvFilter::new(format!(
        "{level},{service}={level}",
        level = config.level,
        service = service_name
    ))
}
