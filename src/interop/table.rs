//! 函数表注册
//!
//! 原生能力按分组写入固定顺序的指针数组，顶层数组再按分组顺序引用各分组。
//! 该顺序就是与托管侧的线路约定：托管侧按同样的顺序逐个读取地址。
//!
//! 校验和 = 各分组大小之和 + 分组数。它只是一个廉价的结构一致性检查：
//! 两个不同的形状可能得到相同的和，这是已知并接受的限制。

use sha2::{Digest, Sha256};
use std::ffi::c_void;
use std::fmt;

/// 一个具名的函数槽位
#[derive(Debug, Clone, Copy)]
pub struct FunctionSlot {
    name: &'static str,
    address: *mut c_void,
}

impl FunctionSlot {
    pub fn new(name: &'static str, address: *mut c_void) -> Self {
        Self { name, address }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn address(&self) -> *mut c_void {
        self.address
    }
}

/// 原生能力分组
#[derive(Debug, Clone)]
pub struct FunctionGroup {
    name: &'static str,
    slots: Vec<FunctionSlot>,
}

impl FunctionGroup {
    pub fn new(name: &'static str, slots: Vec<FunctionSlot>) -> Self {
        Self { name, slots }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slots(&self) -> &[FunctionSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// 函数表结构校验和
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(i32);

impl Checksum {
    /// 由各分组大小计算校验和
    pub fn from_group_sizes(sizes: &[usize]) -> Self {
        let slots: usize = sizes.iter().sum();
        Self((slots + sizes.len()) as i32)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// 构建完成的函数表
///
/// 各分组的指针数组与顶层数组都在堆上分配，移动 `FunctionTable`
/// 不会改变交给托管侧的地址。构建后不可变。
pub struct FunctionTable {
    groups: Vec<FunctionGroup>,
    arrays: Vec<Box<[*mut c_void]>>,
    buffer: Box<[*mut c_void]>,
}

impl FunctionTable {
    /// 按声明顺序写入各分组地址，同时累加校验和
    pub fn build(groups: Vec<FunctionGroup>) -> (Self, Checksum) {
        let mut checksum = 0i32;
        let mut arrays = Vec::with_capacity(groups.len());

        for group in &groups {
            let array: Box<[*mut c_void]> = group.slots.iter().map(|slot| slot.address).collect();
            checksum += array.len() as i32;
            arrays.push(array);
        }

        let buffer: Box<[*mut c_void]> = arrays
            .iter()
            .map(|array| array.as_ptr() as *mut c_void)
            .collect();
        checksum += buffer.len() as i32;

        tracing::debug!(
            target: "interop",
            "Function table built: {} groups, checksum {:#x}",
            buffer.len(),
            checksum
        );

        (
            Self {
                groups,
                arrays,
                buffer,
            },
            Checksum(checksum),
        )
    }

    /// 顶层指针数组地址
    pub fn as_ptr(&self) -> *mut c_void {
        self.buffer.as_ptr() as *mut c_void
    }

    pub fn groups(&self) -> &[FunctionGroup] {
        &self.groups
    }

    pub fn group_sizes(&self) -> Vec<usize> {
        self.arrays.iter().map(|array| array.len()).collect()
    }

    /// 读取某个分组中某个槽位的地址
    pub fn address(&self, group: usize, slot: usize) -> Option<*mut c_void> {
        self.arrays.get(group).and_then(|array| array.get(slot)).copied()
    }

    /// 结构指纹：SHA-256(分组名、槽位名、数量)
    ///
    /// 仅用于诊断，不参与握手；握手仍然只交换弱校验和。
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for group in &self.groups {
            hasher.update(group.name.as_bytes());
            hasher.update((group.slots.len() as u32).to_le_bytes());
            for slot in &group.slots {
                hasher.update(slot.name.as_bytes());
                hasher.update([0u8]);
            }
        }
        hasher.update((self.groups.len() as u32).to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("groups", &self.groups.iter().map(|g| g.name).collect::<Vec<_>>())
            .field("sizes", &self.group_sizes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn group(name: &'static str, size: usize) -> FunctionGroup {
        let slots = (0..size)
            .map(|i| FunctionSlot::new("slot", (0x1000 + i * 8) as *mut c_void))
            .collect();
        FunctionGroup::new(name, slots)
    }

    #[test]
    fn test_checksum_for_framework_shape() {
        let (_, checksum) = FunctionTable::build(vec![
            group("Assert", 1),
            group("CommandLine", 3),
            group("Debug", 4),
            group("Application", 10),
        ]);
        assert_eq!(checksum.value(), 22);
        assert_eq!(checksum, Checksum::from_group_sizes(&[1, 3, 4, 10]));
        assert_eq!(checksum.to_string(), "0x16");
    }

    #[test]
    fn test_buffer_references_group_arrays() {
        let (table, _) = FunctionTable::build(vec![group("A", 2), group("B", 1)]);

        let buffer = table.as_ptr() as *const *const *mut c_void;
        unsafe {
            let second_group = *buffer.add(1);
            assert_eq!(*second_group, 0x1000 as *mut c_void);
            let first_group = *buffer;
            assert_eq!(*first_group.add(1), 0x1008 as *mut c_void);
        }
        assert_eq!(table.address(0, 1), Some(0x1008 as *mut c_void));
        assert_eq!(table.address(2, 0), None);
    }

    #[test]
    fn test_checksum_collision_is_accepted() {
        // 形状不同但和相同：校验和相等是必要条件而非充分条件
        let (left, a) = FunctionTable::build(vec![group("A", 1), group("B", 3)]);
        let (right, b) = FunctionTable::build(vec![group("A", 2), group("B", 2)]);
        assert_eq!(a, b);
        assert_ne!(left.group_sizes(), right.group_sizes());
        assert_ne!(left.fingerprint(), right.fingerprint());
    }

    #[test]
    fn test_fingerprint_tracks_slot_names() {
        let a = FunctionGroup::new(
            "G",
            vec![
                FunctionSlot::new("Get", std::ptr::null_mut()),
                FunctionSlot::new("Set", std::ptr::null_mut()),
            ],
        );
        let b = FunctionGroup::new(
            "G",
            vec![
                FunctionSlot::new("Set", std::ptr::null_mut()),
                FunctionSlot::new("Get", std::ptr::null_mut()),
            ],
        );

        let (ta, ca) = FunctionTable::build(vec![a]);
        let (tb, cb) = FunctionTable::build(vec![b]);
        assert_eq!(ca, cb);
        assert_ne!(ta.fingerprint(), tb.fingerprint());
    }

    proptest! {
        #[test]
        fn checksum_is_sum_plus_count(sizes in prop::collection::vec(0usize..32, 0..12)) {
            let groups = sizes.iter().map(|&size| group("G", size)).collect();
            let (table, checksum) = FunctionTable::build(groups);
            let expected = sizes.iter().sum::<usize>() + sizes.len();
            prop_assert_eq!(checksum.value() as usize, expected);
            prop_assert_eq!(table.group_sizes(), sizes);
        }

        #[test]
        fn checksum_ignores_group_order(mut sizes in prop::collection::vec(0usize..32, 1..12)) {
            let before = Checksum::from_group_sizes(&sizes);
            sizes.reverse();
            prop_assert_eq!(before, Checksum::from_group_sizes(&sizes));
        }
    }
}
