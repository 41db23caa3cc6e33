//! 核心宏定义
//!
//! 提供统一的宏来减少代码重复

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use clr_bridge::impl_default;
///
/// struct MyStruct {
///     field1: u32,
///     field2: String,
/// }
///
/// impl_default!(MyStruct {
///     field1: 0,
///     field2: String::new(),
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

/// 按声明顺序构建一个函数分组
///
/// 槽位顺序即是与托管侧约定的线路顺序，不要随意调整。
///
/// ```ignore
/// let group = function_group!("Assert" {
///     "OutputMessage" => assert::output_message,
/// });
/// ```
#[macro_export]
macro_rules! function_group {
    ($group:literal { $($slot:literal => $function:path),* $(,)? }) => {
        $crate::interop::FunctionGroup::new(
            $group,
            vec![$($crate::interop::FunctionSlot::new(
                $slot,
                $function as *const () as *mut ::std::ffi::c_void,
            )),*],
        )
    };
}
