//! 世界生命周期协作方传入的数据

/// 世界标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(pub u64);

/// 世界类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldKind {
    /// 独立运行的游戏
    Game,
    /// 编辑器内运行
    PlayInEditor,
    /// 编辑器场景
    Editor,
    /// 编辑器预览
    EditorPreview,
    /// 游戏内预览
    GamePreview,
    /// 未激活
    Inactive,
}

impl WorldKind {
    /// 是否是实时模拟的游戏世界
    pub fn is_game_world(&self) -> bool {
        matches!(self, WorldKind::Game | WorldKind::PlayInEditor)
    }
}

/// 世界初始化/清理事件中的世界信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldContext {
    pub id: WorldId,
    pub kind: WorldKind,
}

impl WorldContext {
    pub fn new(id: WorldId, kind: WorldKind) -> Self {
        Self { id, kind }
    }

    pub fn is_game_world(&self) -> bool {
        self.kind.is_game_world()
    }
}

/// 世界清理标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldCleanup {
    pub session_ended: bool,
    pub cleanup_resources: bool,
}
