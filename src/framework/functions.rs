//! 暴露给托管侧的引擎 API 叶子函数
//!
//! 字符串参数是 NUL 结尾的 UTF-8。输出缓冲由托管侧分配，足够容纳结果。

use std::ffi::{c_char, CStr};
use std::time::Duration;

use super::state::with_state;
use crate::runtime::diagnostics::{self, Color, LogLevel, OnScreenMessage};

unsafe fn read(message: *const c_char) -> String {
    if message.is_null() {
        String::new()
    } else {
        CStr::from_ptr(message).to_string_lossy().into_owned()
    }
}

/// 复制字符串到调用方缓冲并以 NUL 结尾，遇到内部 NUL 即截断
///
/// # Safety
/// `destination` 必须为空或可写入 `source.len() + 1` 字节。
pub unsafe fn copy_c_string(destination: *mut c_char, source: &str) -> usize {
    if destination.is_null() {
        return 0;
    }
    let bytes = source.as_bytes();
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, destination, len);
    *destination.add(len) = 0;
    len
}

fn as_flag(value: bool) -> u8 {
    value as u8
}

pub mod assert {
    use super::*;

    pub unsafe extern "C" fn output_message(message: *const c_char) {
        let message = read(message);
        tracing::error!(target: "framework", "Assert: {}", message);
        diagnostics::add_on_screen_message(OnScreenMessage::new(
            diagnostics::LOG_DISPLAY_TIME,
            Color::RED,
            message,
        ));
    }
}

pub mod command_line {
    use super::*;

    pub unsafe extern "C" fn get(arguments: *mut c_char) {
        let command_line = with_state(|state| state.command_line.clone());
        copy_c_string(arguments, &command_line);
    }

    pub unsafe extern "C" fn set(arguments: *const c_char) {
        let arguments = read(arguments);
        with_state(|state| state.command_line = arguments);
    }

    pub unsafe extern "C" fn append(arguments: *const c_char) {
        let arguments = read(arguments);
        with_state(|state| state.command_line.push_str(&arguments));
    }
}

pub mod debug {
    use super::*;

    /// 叶子日志函数：与运行时日志回调不同，Fatal 不影响桥接状态
    pub unsafe extern "C" fn log(level: i32, message: *const c_char) {
        let message = read(message);
        match LogLevel::from_raw(level) {
            Some(LogLevel::Display) => tracing::info!(target: "framework", "{}", message),
            Some(LogLevel::Warning) => tracing::warn!(target: "framework", "{}", message),
            Some(LogLevel::Error) | Some(LogLevel::Fatal) => {
                tracing::error!(target: "framework", "{}", message)
            }
            None => {}
        }
    }

    pub unsafe extern "C" fn exception(message: *const c_char) {
        diagnostics::add_on_screen_message(OnScreenMessage::new(
            diagnostics::EXCEPTION_DISPLAY_TIME,
            Color::RED,
            read(message),
        ));
    }

    pub unsafe extern "C" fn add_on_screen_message(
        key: i32,
        time_to_display: f32,
        display_color: Color,
        message: *const c_char,
    ) {
        diagnostics::add_on_screen_message(OnScreenMessage {
            key: (key != -1).then_some(key),
            duration: Duration::try_from_secs_f32(time_to_display.max(0.0)).unwrap_or_default(),
            color: display_color,
            text: read(message),
        });
    }

    pub extern "C" fn clear_on_screen_messages() {
        diagnostics::clear_on_screen_messages();
    }
}

pub mod application {
    use super::*;

    pub extern "C" fn is_can_ever_render() -> u8 {
        as_flag(with_state(|state| state.can_ever_render))
    }

    pub extern "C" fn is_packaged_for_distribution() -> u8 {
        as_flag(with_state(|state| state.packaged_for_distribution))
    }

    pub extern "C" fn is_packaged_for_shipping() -> u8 {
        as_flag(!cfg!(debug_assertions))
    }

    pub unsafe extern "C" fn get_project_directory(directory: *mut c_char) {
        let project_dir = with_state(|state| {
            let mut dir = state.project_dir.to_string_lossy().into_owned();
            if !dir.ends_with('/') {
                dir.push('/');
            }
            dir
        });
        copy_c_string(directory, &project_dir);
    }

    pub unsafe extern "C" fn get_default_language(language: *mut c_char) {
        let default_language = with_state(|state| state.default_language.clone());
        copy_c_string(language, &default_language);
    }

    pub unsafe extern "C" fn get_project_name(project_name: *mut c_char) {
        let name = with_state(|state| state.project_name.clone());
        copy_c_string(project_name, &name);
    }

    pub extern "C" fn get_volume_multiplier() -> f32 {
        with_state(|state| state.volume_multiplier)
    }

    pub unsafe extern "C" fn set_project_name(project_name: *const c_char) {
        let name = read(project_name);
        with_state(|state| state.project_name = name);
    }

    pub extern "C" fn set_volume_multiplier(value: f32) {
        with_state(|state| state.volume_multiplier = value);
    }

    pub extern "C" fn request_exit(force: u8) {
        tracing::info!(target: "framework", "Exit requested (force: {})", force != 0);
        with_state(|state| state.exit_requested = Some(force != 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_copy_c_string_terminates() {
        let mut buffer = [0x7f as c_char; 8];
        let written = unsafe { copy_c_string(buffer.as_mut_ptr(), "abc") };
        assert_eq!(written, 3);
        let read_back = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        assert_eq!(read_back.to_str().unwrap(), "abc");
    }

    #[test]
    fn test_copy_c_string_stops_at_interior_nul() {
        let mut buffer = [0x7f as c_char; 8];
        let written = unsafe { copy_c_string(buffer.as_mut_ptr(), "ab\0cd") };
        assert_eq!(written, 2);
        assert_eq!(buffer[2], 0);
    }

    #[test]
    fn test_command_line_set_append_get() {
        let set = CString::new("-game").unwrap();
        let append = CString::new(" -log").unwrap();
        let mut buffer = [0 as c_char; 64];

        unsafe {
            command_line::set(set.as_ptr());
            command_line::append(append.as_ptr());
            command_line::get(buffer.as_mut_ptr());
        }

        let value = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        assert_eq!(value.to_str().unwrap(), "-game -log");
    }

    #[test]
    fn test_volume_multiplier_round_trip() {
        application::set_volume_multiplier(0.25);
        assert_eq!(application::get_volume_multiplier(), 0.25);
        application::set_volume_multiplier(1.0);
    }
}
