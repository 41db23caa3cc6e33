//! 叶子函数共享的应用状态

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// 托管侧可见的应用信息
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationState {
    pub command_line: String,
    pub project_name: String,
    pub project_dir: PathBuf,
    pub default_language: String,
    pub volume_multiplier: f32,
    pub can_ever_render: bool,
    pub packaged_for_distribution: bool,
    /// `Some(force)` 表示托管侧请求退出
    pub exit_requested: Option<bool>,
}

impl ApplicationState {
    fn from_environment() -> Self {
        let project_dir = env::current_dir().unwrap_or_default();
        Self {
            command_line: env::args().skip(1).collect::<Vec<_>>().join(" "),
            project_name: project_name_of(&project_dir),
            project_dir,
            default_language: default_language(),
            volume_multiplier: 1.0,
            can_ever_render: false,
            packaged_for_distribution: false,
            exit_requested: None,
        }
    }
}

fn project_name_of(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 由 `LANG` 推断默认语言，例如 `en_US.UTF-8` → `en-US`
fn default_language() -> String {
    env::var("LANG")
        .ok()
        .and_then(|lang| parse_language(&lang))
        .unwrap_or_else(|| "en".to_string())
}

pub(crate) fn parse_language(lang: &str) -> Option<String> {
    let tag = lang.split(['.', '@']).next()?.replace('_', "-");
    match tag.as_str() {
        "" | "C" | "POSIX" => None,
        _ => Some(tag),
    }
}

static STATE: OnceLock<Mutex<ApplicationState>> = OnceLock::new();

/// 访问应用状态
pub fn with_state<R>(f: impl FnOnce(&mut ApplicationState) -> R) -> R {
    let state = STATE.get_or_init(|| Mutex::new(ApplicationState::from_environment()));
    let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

/// 以项目根目录更新应用信息，在托管侧启动前调用
pub fn configure_project(project_dir: &Path) {
    with_state(|state| {
        state.project_dir = project_dir.to_path_buf();
        state.project_name = project_name_of(project_dir);
    });
}

/// 托管侧是否请求了退出，返回是否强制
pub fn exit_requested() -> Option<bool> {
    with_state(|state| state.exit_requested)
}
