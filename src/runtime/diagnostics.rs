//! 诊断输出
//!
//! 托管侧通过运行时函数槽位回调原生代码上报异常和日志。消息写入 `tracing`，
//! Warning 及以上同时推送一条屏幕消息。屏幕消息的去向由线程内安装的
//! [`OnScreenSink`] 决定，默认写入 `on_screen` 日志目标。
//!
//! Fatal 日志不在回调内部修改桥接状态，只置位线程内的标记；
//! [`Bridge`](crate::runtime::Bridge) 在每次分发返回后读取并降级状态。

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::ffi::{c_char, CStr};
use std::time::Duration;

/// 托管侧日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum LogLevel {
    Display = 0,
    Warning = 1,
    Error = 2,
    Fatal = 3,
}

impl LogLevel {
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Display),
            1 => Some(Self::Warning),
            2 => Some(Self::Error),
            3 => Some(Self::Fatal),
            _ => None,
        }
    }
}

/// BGRA 颜色，与托管侧 `Color` 布局一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { b, g, r, a: 255 }
    }
}

/// 异常消息的显示时长
pub const EXCEPTION_DISPLAY_TIME: Duration = Duration::from_secs(10);
/// Warning/Error/Fatal 消息的显示时长
pub const LOG_DISPLAY_TIME: Duration = Duration::from_secs(60);

/// 一条屏幕消息
#[derive(Debug, Clone, PartialEq)]
pub struct OnScreenMessage {
    /// 相同 key 的消息会替换旧消息；`None` 总是新增
    pub key: Option<i32>,
    pub duration: Duration,
    pub color: Color,
    pub text: String,
}

impl OnScreenMessage {
    pub fn new(duration: Duration, color: Color, text: impl Into<String>) -> Self {
        Self {
            key: None,
            duration,
            color,
            text: text.into(),
        }
    }
}

/// 屏幕消息接收端
pub trait OnScreenSink {
    fn add_message(&mut self, message: OnScreenMessage);
    fn clear(&mut self);
}

/// 默认实现：写入 `on_screen` 日志目标
#[derive(Debug, Default)]
pub struct TracingSink;

impl OnScreenSink for TracingSink {
    fn add_message(&mut self, message: OnScreenMessage) {
        tracing::info!(
            target: "on_screen",
            key = ?message.key,
            seconds = message.duration.as_secs_f32(),
            "{}",
            message.text
        );
    }

    fn clear(&mut self) {
        tracing::debug!(target: "on_screen", "Cleared on-screen messages");
    }
}

// Fatal 标记是线程局部的，只有桥接线程上的上报会在分发返回后被读取。
// 托管侧在其他线程调用日志回调时，该线程的标记永远不会被取出，
// 状态也不会降级，因此在那里记录一条警告。
thread_local! {
    static SINK: RefCell<Box<dyn OnScreenSink>> = RefCell::new(Box::new(TracingSink));
    static FATAL_REPORTED: Cell<bool> = const { Cell::new(false) };
    static BRIDGE_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// 把当前线程标记为桥接线程
pub fn bind_bridge_thread() {
    BRIDGE_THREAD.with(|bound| bound.set(true));
}

/// 当前线程是否持有桥接上下文
pub fn is_bridge_thread() -> bool {
    BRIDGE_THREAD.with(Cell::get)
}

/// 为当前线程安装屏幕消息接收端，返回之前的接收端
pub fn install_on_screen_sink(sink: Box<dyn OnScreenSink>) -> Box<dyn OnScreenSink> {
    SINK.with(|current| std::mem::replace(&mut *current.borrow_mut(), sink))
}

/// 推送一条屏幕消息
pub fn add_on_screen_message(message: OnScreenMessage) {
    SINK.with(|sink| sink.borrow_mut().add_message(message));
}

/// 清空屏幕消息
pub fn clear_on_screen_messages() {
    SINK.with(|sink| sink.borrow_mut().clear());
}

/// 取出并复位 Fatal 标记
pub fn take_fatal_report() -> bool {
    FATAL_REPORTED.with(|flag| flag.replace(false))
}

/// 异常消息写入日志前压成单行
pub fn normalize_exception_message(message: &str) -> String {
    message
        .replace(['\n', '\r'], " ")
        .replace("     ", " ")
}

/// 处理托管侧上报的异常
pub fn managed_exception(message: &str) {
    tracing::error!(target: "managed", "{}", normalize_exception_message(message));
    add_on_screen_message(OnScreenMessage::new(
        EXCEPTION_DISPLAY_TIME,
        Color::RED,
        message,
    ));
}

/// 处理托管侧上报的日志
///
/// Fatal 额外置位标记，由桥接层在分发返回后降级状态。
pub fn managed_log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Display => {
            tracing::info!(target: "managed", "{}", message);
        }
        LogLevel::Warning => {
            tracing::warn!(target: "managed", "{}", message);
            add_on_screen_message(OnScreenMessage::new(LOG_DISPLAY_TIME, Color::YELLOW, message));
        }
        LogLevel::Error => {
            tracing::error!(target: "managed", "{}", message);
            add_on_screen_message(OnScreenMessage::new(LOG_DISPLAY_TIME, Color::RED, message));
        }
        LogLevel::Fatal => {
            tracing::error!(target: "managed", "{}", message);
            add_on_screen_message(OnScreenMessage::new(LOG_DISPLAY_TIME, Color::RED, message));
            if !is_bridge_thread() {
                tracing::warn!(
                    target: "runtime",
                    "Fatal log reported off the bridge thread ({:?}), status is not demoted",
                    std::thread::current().id()
                );
            }
            FATAL_REPORTED.with(|flag| flag.set(true));
        }
    }
}

unsafe fn read_message(message: *const c_char) -> String {
    if message.is_null() {
        String::new()
    } else {
        CStr::from_ptr(message).to_string_lossy().into_owned()
    }
}

/// 运行时函数槽位 0：异常上报
pub unsafe extern "C" fn runtime_exception(message: *const c_char) {
    managed_exception(&read_message(message));
}

/// 运行时函数槽位 1：日志上报
pub unsafe extern "C" fn runtime_log(level: i32, message: *const c_char) {
    match LogLevel::from_raw(level) {
        Some(level) => managed_log(level, &read_message(message)),
        None => tracing::debug!(target: "managed", "Ignored log with unknown level {}", level),
    }
}
