// 日志工具模块
//
// 封装 flexi_logger 的初始化和关闭操作，确保异步日志正确 flush

use crate::config::LogConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use std::sync::Mutex;

/// 全局日志句柄，用于程序退出时 flush
static LOGGER_HANDLE: Mutex<Option<LoggerHandle>> = Mutex::new(None);

/// 初始化日志系统
///
/// `dir` 为空时输出到标准错误，否则按大小轮转写入 `dir/file`。
/// `log` 全局日志器每个进程只能设置一次，再次初始化会返回错误。
///
/// # Examples
/// ```no_run
/// use cypher_builder::config::LogConfig;
/// use cypher_builder::utils::logging;
///
/// logging::init(&LogConfig::default()).expect("日志初始化失败");
/// ```
pub fn init(config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let logger = Logger::try_with_str(&config.level)?;
    let handle = if config.dir.is_empty() {
        logger.log_to_stderr().start()?
    } else {
        logger
            .log_to_file(
                FileSpec::default()
                    .basename(&config.file)
                    .directory(&config.dir),
            )
            .rotate(
                Criterion::Size(config.max_file_size),
                Naming::Numbers,
                Cleanup::KeepLogFiles(config.max_files),
            )
            .write_mode(WriteMode::Async)
            .append()
            .start()?
    };

    if let Ok(mut guard) = LOGGER_HANDLE.lock() {
        *guard = Some(handle);
    }

    log::debug!("日志系统初始化完成: 级别 {}, 目录 '{}'", config.level, config.dir);
    Ok(())
}

/// 刷新并关闭日志系统
///
/// 在程序退出前调用，确保所有异步日志都已写入文件
pub fn shutdown() {
    if let Ok(mut guard) = LOGGER_HANDLE.lock() {
        if let Some(handle) = guard.take() {
            handle.flush();
            // handle 在这里被 drop，会等待异步线程完成
        }
    }
}

pub fn is_initialized() -> bool {
    LOGGER_HANDLE
        .lock()
        .map(|guard| guard.is_some())
        .unwrap_or(false)
}
