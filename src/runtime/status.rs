//! 运行状态与 tick 状态

/// 进程级运行状态
///
/// `Stopped` → `Idle`：宿主加载、函数表构建和初始化命令都成功。
/// `Idle` → `Running`：第一次游戏世界初始化。
/// `Running` → `Idle`：世界清理，或托管侧上报 Fatal 日志。
/// 宿主加载失败后 `Stopped` 是终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusType {
    #[default]
    Stopped,
    Idle,
    Running,
}

/// 当前游戏世界的 tick 注册状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickState {
    /// 未注册
    #[default]
    Stopped,
    /// 已注册，尚未观察到第一次 pre-physics tick
    Registered,
    /// 正在 tick
    Started,
}
