//! 引擎 API 函数表内容
//!
//! 分组顺序与每组槽位顺序是与托管侧的线路约定：
//! Assert(1)、CommandLine(3)、Debug(4)、Application(10)，校验和 0x16。

pub mod functions;
pub mod state;

use crate::function_group;
use crate::interop::FunctionGroup;

use functions::{application, assert, command_line, debug};

pub use state::{configure_project, exit_requested, with_state, ApplicationState};

/// 按线路顺序返回全部分组
pub fn function_groups() -> Vec<FunctionGroup> {
    vec![
        function_group!("Assert" {
            "OutputMessage" => assert::output_message,
        }),
        function_group!("CommandLine" {
            "Get" => command_line::get,
            "Set" => command_line::set,
            "Append" => command_line::append,
        }),
        function_group!("Debug" {
            "Log" => debug::log,
            "Exception" => debug::exception,
            "AddOnScreenMessage" => debug::add_on_screen_message,
            "ClearOnScreenMessages" => debug::clear_on_screen_messages,
        }),
        function_group!("Application" {
            "IsCanEverRender" => application::is_can_ever_render,
            "IsPackagedForDistribution" => application::is_packaged_for_distribution,
            "IsPackagedForShipping" => application::is_packaged_for_shipping,
            "GetProjectDirectory" => application::get_project_directory,
            "GetDefaultLanguage" => application::get_default_language,
            "GetProjectName" => application::get_project_name,
            "GetVolumeMultiplier" => application::get_volume_multiplier,
            "SetProjectName" => application::set_project_name,
            "SetVolumeMultiplier" => application::set_volume_multiplier,
            "RequestExit" => application::request_exit,
        }),
    ]
}
